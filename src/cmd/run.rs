#[derive(clap::Args)]
pub struct RunArgs {
    #[clap(flatten)]
    chain: super::ChainArgs,

    /// The command to run with the spoke credentials, given after `--`
    #[clap(value_parser, required = true, last = true)]
    command: Vec<String>,
}

/// Returns the exit code to terminate with
#[tokio::main]
pub async fn run(args: &RunArgs) -> Result<i32, anyhow::Error> {
    let config = args.chain.config();
    let credentials = super::resolve_credentials(&config).await?;

    let status = run_command(&credentials, &args.command).await?;
    tracing::debug!(message = "Command exited", command = ?args.command, status = ?status);
    Ok(exit_code(status))
}

/// Run `command` with `credentials` exported on top of the current environment, inheriting stdio.
pub async fn run_command(
    credentials: &crate::client::Credentials,
    command: &[String],
) -> Result<std::process::ExitStatus, crate::error::Error> {
    let (program, args) = command.split_first().ok_or_else(|| {
        crate::error::Error::ConfigError("no command given to run".to_string())
    })?;

    let envlist = crate::environment::EnvironmentList::from(credentials);
    let mut child = tokio::process::Command::new(program)
        .args(args)
        .envs(envlist.iter().map(|(k, v)| (*k, v.as_str())))
        .spawn()
        .map_err(|e| {
            crate::error::Error::StdIoError(std::io::Error::new(
                e.kind(),
                format!("failed to run {program}: {e}"),
            ))
        })?;
    Ok(child.wait().await?)
}

/// The child's exit code, or 128 + signal number when it was killed by a signal
pub fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}
