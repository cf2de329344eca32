use clap::Parser;

/// Assume a hub IAM role, then a spoke IAM role through it, and hand the spoke credentials to a
/// command
#[derive(clap::Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Increase log verbosity; can be stacked up to -vvv. $RUST_LOG takes precedence
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Assume roles and run a command with the spoke credentials in its environment
    Run(assume_spoke_role::cmd::run::RunArgs),
    /// Assume roles and print the spoke credentials as environment variables
    Env(assume_spoke_role::cmd::env::EnvArgs),
    /// Assume roles and print the spoke credentials for the AWS SDK credential_process setting
    CredentialProcess(assume_spoke_role::cmd::credential_process::CredentialProcessArgs),
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("assume_spoke_role={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Run(args) => {
            let code = assume_spoke_role::cmd::run::run(args)?;
            std::process::exit(code);
        }
        Commands::Env(args) => assume_spoke_role::cmd::env::run(args),
        Commands::CredentialProcess(args) => {
            assume_spoke_role::cmd::credential_process::run(args)
        }
    }
}
