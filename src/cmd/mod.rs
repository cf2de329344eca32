pub mod credential_process;
pub mod env;
pub mod run;

/// Options shared by every subcommand. Flags take precedence over environment variables.
#[derive(clap::Args, Debug, Clone)]
pub struct ChainArgs {
    /// The 12-digit AWS account ID containing the HUB role
    #[clap(long, env = "ASSUME_ROLE_HUB_ACCOUNT")]
    hub_account: Option<String>,
    /// The 12-digit AWS account ID containing the SPOKE role
    #[clap(short, long, env = "ASSUME_ROLE_SPOKE_ACCOUNT")]
    spoke_account: Option<String>,
    /// The name of the IAM role to assume in the HUB account
    #[clap(short = 'H', long, env = "ASSUME_ROLE_HUB_ROLE")]
    hub_role: Option<String>,
    /// The name of the IAM role to assume in the SPOKE account
    #[clap(short = 'S', long, env = "ASSUME_ROLE_SPOKE_ROLE")]
    spoke_role: Option<String>,
    /// The external ID required by the hub and spoke trust policies, if any
    #[clap(short, long, env = "ASSUME_ROLE_EXTERNAL_ID")]
    external_id: Option<String>,
    /// Session name for both hops; a random 32-character identifier is generated when omitted
    ///
    /// The spoke session is named `{spoke-account}-{session-name}`.
    #[clap(long, env = "ASSUME_ROLE_SESSION_NAME")]
    session_name: Option<String>,
    /// Duration of the spoke session in seconds
    ///
    /// Subject to the spoke role's maximum session duration; a chained session cannot exceed
    /// 3600 seconds.
    #[clap(long)]
    duration_seconds: Option<u32>,
    /// The maximum number of retries for a throttled or failed STS request
    #[clap(short, long, default_value_t = crate::client::DEFAULT_RETRIES)]
    retries: u32,
    /// AWS region of the STS endpoint
    #[clap(long)]
    region: Option<String>,
    /// Custom STS endpoint URL
    #[clap(long, env = "AWS_ENDPOINT_URL_STS")]
    endpoint_url: Option<String>,
    /// Profile in the shared credentials file holding the starting credentials
    #[clap(long, env = "AWS_PROFILE")]
    profile: Option<String>,
}

impl ChainArgs {
    pub fn config(&self) -> crate::config::Config {
        crate::config::Config::new(crate::config::ConfigData {
            hub_account: self.hub_account.clone(),
            spoke_account: self.spoke_account.clone(),
            hub_role: self.hub_role.clone(),
            spoke_role: self.spoke_role.clone(),
            external_id: self.external_id.clone(),
            session_name: self.session_name.clone(),
            duration_seconds: self.duration_seconds,
            retries: Some(self.retries),
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            profile: self.profile.clone(),
        })
    }
}

/// Assume the hub role then the spoke role. Ctrl-C while waiting on STS cancels the chain.
pub(crate) async fn resolve_credentials(
    config: &crate::config::Config,
) -> Result<crate::client::Credentials, anyhow::Error> {
    use anyhow::Context as _;

    let request = config.chain_request()?;
    let identity = config
        .ambient_identity()
        .await
        .context("could not load AWS credentials to start from")?;
    let resolver = crate::chain::Resolver::new(config.client()?);

    let cancel = tokio_util::sync::CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted; cancelling");
                cancel.cancel();
            }
        })
    };

    tracing::info!(message = "Assuming roles", hub_role_arn = %request.hub, spoke_role_arn = %request.spoke, access_key_id = %identity.access_key_id, external_id_given = request.external_id.is_some());
    let result = resolver.resolve(&identity, &request, &cancel).await;
    watcher.abort();

    let credentials = result
        .context("could not generate valid AWS credentials for the 'spoke' account")?;
    tracing::info!(message = "Obtained spoke credentials", access_key_id = %credentials.access_key_id, expiration = %credentials.expiration);
    Ok(credentials)
}
