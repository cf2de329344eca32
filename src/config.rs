#[derive(Debug, Clone, Default)]
pub struct Config {
    inner: ConfigData,
}

impl Config {
    pub fn new(inner: ConfigData) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> ConfigData {
        self.inner
    }
}

impl std::ops::Deref for Config {
    type Target = ConfigData;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Plain values, already resolved from flags and environment variables
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ConfigData {
    pub hub_account: Option<String>,
    pub spoke_account: Option<String>,
    pub hub_role: Option<String>,
    pub spoke_role: Option<String>,
    pub external_id: Option<String>,
    pub session_name: Option<String>,
    pub duration_seconds: Option<u32>,
    pub retries: Option<u32>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub profile: Option<String>,
}

fn required<'a>(
    value: &'a Option<String>,
    what: &str,
    flag: &str,
    env: &str,
) -> Result<&'a str, crate::error::Error> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(crate::error::Error::ConfigError(format!(
            "{what} is missing; use {flag} or ${env}"
        ))),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Config {
    pub fn hub(&self) -> Result<crate::role::RoleDescriptor, crate::error::Error> {
        Ok(crate::role::RoleDescriptor::new(
            required(
                &self.hub_account,
                "hub account ID",
                "--hub-account",
                "ASSUME_ROLE_HUB_ACCOUNT",
            )?,
            required(
                &self.hub_role,
                "hub role name",
                "--hub-role",
                "ASSUME_ROLE_HUB_ROLE",
            )?,
        ))
    }

    pub fn spoke(&self) -> Result<crate::role::RoleDescriptor, crate::error::Error> {
        Ok(crate::role::RoleDescriptor::new(
            required(
                &self.spoke_account,
                "spoke account ID",
                "--spoke-account",
                "ASSUME_ROLE_SPOKE_ACCOUNT",
            )?,
            required(
                &self.spoke_role,
                "spoke role name",
                "--spoke-role",
                "ASSUME_ROLE_SPOKE_ROLE",
            )?,
        ))
    }

    pub fn chain_request(&self) -> Result<crate::chain::ChainRequest, crate::error::Error> {
        let mut request = crate::chain::ChainRequest::new(self.hub()?, self.spoke()?);
        request.external_id = self.external_id.clone();
        request.session_label = non_empty(&self.session_name).map(|v| v.to_owned());
        request.duration_seconds = self.duration_seconds;
        Ok(request)
    }

    pub fn client(&self) -> Result<crate::client::Client, crate::error::Error> {
        let client =
            crate::client::Client::new(non_empty(&self.region), non_empty(&self.endpoint_url))?;
        Ok(client.with_max_retries(self.retries.unwrap_or(crate::client::DEFAULT_RETRIES)))
    }

    pub async fn ambient_identity(
        &self,
    ) -> Result<crate::identity::AmbientIdentity, crate::error::Error> {
        crate::identity::AmbientIdentity::load(non_empty(&self.profile)).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn make_test_config() -> Config {
        Config::new(ConfigData {
            hub_account: Some("111111111111".to_string()),
            spoke_account: Some("222222222222".to_string()),
            hub_role: Some("HubRole".to_string()),
            spoke_role: Some("SpokeRole".to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_chain_request() {
        let request = make_test_config().chain_request().unwrap();
        assert_eq!(
            request.hub.role_arn(),
            "arn:aws:iam::111111111111:role/HubRole"
        );
        assert_eq!(
            request.spoke.role_arn(),
            "arn:aws:iam::222222222222:role/SpokeRole"
        );
        assert_eq!(request.external_id, None);
        assert_eq!(request.session_label, None);
    }

    #[test]
    fn test_chain_request_options() {
        let mut data = make_test_config().into_inner();
        data.external_id = Some("ext".to_string());
        data.session_name = Some("".to_string());
        data.duration_seconds = Some(900);
        let request = Config::new(data).chain_request().unwrap();
        assert_eq!(request.external_id.as_deref(), Some("ext"));
        assert_eq!(request.session_label, None);
        assert_eq!(request.duration_seconds, Some(900));
    }

    #[test]
    fn test_chain_request_missing() {
        let mut data = make_test_config().into_inner();
        data.spoke_account = Some("".to_string());
        let e = Config::new(data).chain_request().unwrap_err();
        assert_eq!(
            e.to_string(),
            "Config error: spoke account ID is missing; use --spoke-account or $ASSUME_ROLE_SPOKE_ACCOUNT"
        );

        let mut data = make_test_config().into_inner();
        data.hub_role = None;
        assert!(matches!(
            Config::new(data).chain_request(),
            Err(crate::error::Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_client() {
        let mut data = make_test_config().into_inner();
        data.region = Some("eu-west-1".to_string());
        let client = Config::new(data).client().unwrap();
        assert_eq!(client.region(), "eu-west-1");

        let mut data = make_test_config().into_inner();
        data.region = Some("us-west-2".to_string());
        data.endpoint_url = Some("http://localhost:4566".to_string());
        let client = Config::new(data).client().unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:4566/");
    }
}
