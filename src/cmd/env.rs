#[derive(clap::Args)]
pub struct EnvArgs {
    #[clap(flatten)]
    chain: super::ChainArgs,

    /// Prefix each line with `export` so the output can be passed to `eval`
    #[clap(long, action = clap::ArgAction::SetTrue)]
    export: bool,
}

#[tokio::main]
pub async fn run(args: &EnvArgs) -> Result<(), anyhow::Error> {
    let config = args.chain.config();
    let credentials = super::resolve_credentials(&config).await?;

    let envlist = crate::environment::EnvironmentList::from(&credentials);
    if args.export {
        print!("{}", envlist.exports());
    } else {
        print!("{envlist}");
    }
    Ok(())
}
