#[derive(clap::Args)]
pub struct CredentialProcessArgs {
    #[clap(flatten)]
    chain: super::ChainArgs,
}

/// https://docs.aws.amazon.com/sdkref/latest/guide/feature-process-credentials.html
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CredentialProcessResponse {
    pub version: i64,
    pub access_key_id: String,
    pub secret_access_key: crate::client::SensitiveString,
    pub session_token: crate::client::SensitiveString,
    pub expiration: chrono::DateTime<chrono::Utc>,
}

impl From<crate::client::Credentials> for CredentialProcessResponse {
    fn from(credentials: crate::client::Credentials) -> Self {
        Self {
            version: 1,
            access_key_id: credentials.access_key_id,
            secret_access_key: credentials.secret_access_key,
            session_token: credentials.session_token,
            expiration: credentials.expiration,
        }
    }
}

#[tokio::main]
pub async fn run(args: &CredentialProcessArgs) -> Result<(), anyhow::Error> {
    let config = args.chain.config();
    let credentials = super::resolve_credentials(&config).await?;

    let result = CredentialProcessResponse::from(credentials);
    serde_json::to_writer(std::io::stdout(), &result)?;
    Ok(())
}
