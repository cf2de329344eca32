//! sts:AssumeRole API client

pub const DEFAULT_RETRIES: u32 = 3;

const SERVICE_NAME: &str = "sts";
const API_VERSION: &str = "2011-06-15";
const DEFAULT_REGION: &str = "us-east-1";

/// String holding secret material. `Debug` never prints the value.
pub struct SensitiveString(secrecy::SecretString);

impl SensitiveString {
    pub fn new(value: String) -> Self {
        Self(secrecy::SecretString::new(value))
    }
}

impl secrecy::ExposeSecret<String> for SensitiveString {
    fn expose_secret(&self) -> &String {
        self.0.expose_secret()
    }
}

impl Clone for SensitiveString {
    fn clone(&self) -> Self {
        use secrecy::ExposeSecret;
        Self::new(self.0.expose_secret().clone())
    }
}

impl PartialEq for SensitiveString {
    fn eq(&self, other: &Self) -> bool {
        use secrecy::ExposeSecret;
        self.0.expose_secret() == other.0.expose_secret()
    }
}

impl Eq for SensitiveString {}

impl std::fmt::Debug for SensitiveString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SensitiveString([REDACTED])")
    }
}

impl serde::Serialize for SensitiveString {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use secrecy::ExposeSecret;
        serializer.serialize_str(self.0.expose_secret())
    }
}

/// https://docs.aws.amazon.com/STS/latest/APIReference/API_AssumeRole.html
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub role_session_name: String,
    /// Forwarded as given; an empty value is not sent on the wire.
    pub external_id: String,
    pub duration_seconds: Option<u32>,
}

impl AssumeRoleRequest {
    fn form_body(&self) -> String {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        form.append_pair("Action", "AssumeRole")
            .append_pair("Version", API_VERSION)
            .append_pair("RoleArn", &self.role_arn)
            .append_pair("RoleSessionName", &self.role_session_name);
        if !self.external_id.is_empty() {
            form.append_pair("ExternalId", &self.external_id);
        }
        if let Some(d) = self.duration_seconds {
            form.append_pair("DurationSeconds", &d.to_string());
        }
        form.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleResponse {
    pub assumed_role_user: AssumedRoleUser,
    pub credentials: Credentials,
    pub packed_policy_size: Option<i64>,
    pub source_identity: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumedRoleUser {
    pub arn: String,
    pub assumed_role_id: String,
}

/// Temporary credentials issued by STS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: SensitiveString,
    pub session_token: SensitiveString,
    pub expiration: chrono::DateTime<chrono::Utc>,
}

/// Anything able to exchange an identity for a role's temporary credentials.
#[async_trait::async_trait]
pub trait AssumeRoleProvider: Send + Sync {
    async fn assume_role(
        &self,
        identity: &crate::identity::AmbientIdentity,
        request: &AssumeRoleRequest,
    ) -> Result<AssumeRoleResponse, crate::error::Error>;
}

pub struct Client {
    http_client: reqwest::Client,
    region: String,
    endpoint: url::Url,
    max_retries: u32,
    backoff_base: std::time::Duration,
    backoff_max: std::time::Duration,
}

/// `$AWS_REGION`, then `$AWS_DEFAULT_REGION`, then us-east-1. `lookup` yields non-empty values only.
fn default_region_with<F>(lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("AWS_REGION")
        .or_else(|| lookup("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

fn regional_endpoint(region: &str) -> String {
    if region.starts_with("cn-") {
        format!("https://sts.{region}.amazonaws.com.cn/")
    } else {
        format!("https://sts.{region}.amazonaws.com/")
    }
}

impl Client {
    pub fn new(region: Option<&str>, endpoint: Option<&str>) -> Result<Self, crate::error::Error> {
        Self::new_with_env(region, endpoint, |k| std::env::var(k).ok())
    }

    /// Like [`Self::new`], reading `AWS_REGION`, `AWS_DEFAULT_REGION` and `AWS_ENDPOINT_URL`
    /// through `lookup`; empty values count as unset.
    pub fn new_with_env<F>(
        region: Option<&str>,
        endpoint: Option<&str>,
        lookup: F,
    ) -> Result<Self, crate::error::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |k: &str| lookup(k).filter(|v| !v.is_empty());
        // because sigv4 requires to switch to `:authority` header when using http2
        let http_client = reqwest::ClientBuilder::new()
            .http1_only()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let region = match region {
            Some(s) => s.to_owned(),
            None => default_region_with(&lookup),
        };
        let endpoint = match endpoint
            .map(|v| v.to_owned())
            .or_else(|| lookup("AWS_ENDPOINT_URL"))
        {
            Some(e) => e,
            None => regional_endpoint(&region),
        };
        let endpoint = url::Url::parse(&endpoint).map_err(|_| {
            crate::error::Error::ConfigError(format!(
                "STS endpoint (--endpoint-url) is malformed: {endpoint}"
            ))
        })?;
        if endpoint.cannot_be_a_base() || endpoint.query().is_some() {
            return Err(crate::error::Error::ConfigError(format!(
                "STS endpoint (--endpoint-url) must be a plain http(s) URL: {endpoint}"
            )));
        }

        Ok(Self {
            http_client,
            region,
            endpoint,
            max_retries: DEFAULT_RETRIES,
            backoff_base: std::time::Duration::from_millis(100),
            backoff_max: std::time::Duration::from_secs(20),
        })
    }

    /// Number of additional attempts made for retryable failures
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, base: std::time::Duration, max: std::time::Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    /// Full jitter: uniformly random in `[0, min(max, base * 2^attempt)]`
    fn backoff(&self, attempt: u32) -> std::time::Duration {
        use rand::Rng;
        let cap = self
            .backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.backoff_max);
        let millis = cap.as_millis() as u64;
        std::time::Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
    }

    pub async fn assume_role(
        &self,
        identity: &crate::identity::AmbientIdentity,
        request: &AssumeRoleRequest,
    ) -> Result<AssumeRoleResponse, crate::error::Error> {
        let body = bytes::Bytes::from(request.form_body());
        let mut attempt = 0;
        loop {
            match self.send(identity, body.clone()).await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    tracing::debug!(message = "Retrying AssumeRole", role_arn = %request.role_arn, attempt = attempt, delay = ?delay, error = %e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send(
        &self,
        identity: &crate::identity::AmbientIdentity,
        body: bytes::Bytes,
    ) -> Result<AssumeRoleResponse, crate::error::Error> {
        // Use http::Request for signer
        let mut req = http::Request::builder()
            .uri(self.endpoint.as_str())
            .method(http::Method::POST)
            .header(
                http::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded; charset=utf-8",
            )
            .body(body)?;

        let auth_headers = crate::sign::calculate_signing_headers(
            &crate::sign::SignableRequest::from(&req),
            &crate::sign::SigningParams {
                region: &self.region,
                service_name: SERVICE_NAME,
                time: chrono::Utc::now(),
                identity,
            },
        )?;

        for (k, v) in auth_headers.iter() {
            req.headers_mut().append(k, v.to_owned());
        }

        let resp = self
            .http_client
            .execute(reqwest::Request::try_from(req)?)
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if status.is_success() {
            parse_assume_role_response(&body)
        } else {
            Err(parse_error_response(status, &body))
        }
    }
}

#[async_trait::async_trait]
impl AssumeRoleProvider for Client {
    async fn assume_role(
        &self,
        identity: &crate::identity::AmbientIdentity,
        request: &AssumeRoleRequest,
    ) -> Result<AssumeRoleResponse, crate::error::Error> {
        Client::assume_role(self, identity, request).await
    }
}

fn child<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text(node: roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name).map(|n| n.text().unwrap_or_default().trim().to_owned())
}

fn required_text(node: roxmltree::Node<'_, '_>, name: &str) -> Result<String, crate::error::Error> {
    child_text(node, name).ok_or_else(|| {
        crate::error::Error::MalformedResponse(format!(
            "{} is missing {name}",
            node.tag_name().name()
        ))
    })
}

fn parse_assume_role_response(body: &str) -> Result<AssumeRoleResponse, crate::error::Error> {
    let doc = roxmltree::Document::parse(body)?;
    let root = doc.root_element();
    if root.tag_name().name() != "AssumeRoleResponse" {
        return Err(crate::error::Error::MalformedResponse(format!(
            "unexpected root element {}",
            root.tag_name().name()
        )));
    }
    let result = child(root, "AssumeRoleResult").ok_or_else(|| {
        crate::error::Error::MalformedResponse("AssumeRoleResult is missing".to_string())
    })?;

    let creds = child(result, "Credentials").ok_or_else(|| {
        crate::error::Error::MalformedResponse("Credentials is missing".to_string())
    })?;
    let expiration = required_text(creds, "Expiration")?;
    let expiration = chrono::DateTime::parse_from_rfc3339(&expiration)
        .map_err(|e| {
            crate::error::Error::MalformedResponse(format!("invalid Expiration {expiration}: {e}"))
        })?
        .with_timezone(&chrono::Utc);
    let credentials = Credentials {
        access_key_id: required_text(creds, "AccessKeyId")?,
        secret_access_key: SensitiveString::new(required_text(creds, "SecretAccessKey")?),
        session_token: SensitiveString::new(required_text(creds, "SessionToken")?),
        expiration,
    };

    let user = child(result, "AssumedRoleUser").ok_or_else(|| {
        crate::error::Error::MalformedResponse("AssumedRoleUser is missing".to_string())
    })?;
    let assumed_role_user = AssumedRoleUser {
        arn: required_text(user, "Arn")?,
        assumed_role_id: required_text(user, "AssumedRoleId")?,
    };

    let packed_policy_size = match child_text(result, "PackedPolicySize") {
        Some(v) => Some(v.parse::<i64>().map_err(|_| {
            crate::error::Error::MalformedResponse(format!("invalid PackedPolicySize {v}"))
        })?),
        None => None,
    };

    Ok(AssumeRoleResponse {
        assumed_role_user,
        credentials,
        packed_policy_size,
        source_identity: child_text(result, "SourceIdentity"),
        request_id: child(root, "ResponseMetadata").and_then(|m| child_text(m, "RequestId")),
    })
}

fn parse_error_response(status: reqwest::StatusCode, body: &str) -> crate::error::Error {
    let fallback = || crate::error::Error::ApiError {
        status,
        code: status.canonical_reason().unwrap_or("Unknown").to_string(),
        message: body.trim().to_string(),
        request_id: None,
    };

    let doc = match roxmltree::Document::parse(body) {
        Ok(d) => d,
        Err(_) => return fallback(),
    };
    let root = doc.root_element();
    let error = match child(root, "Error") {
        Some(e) => e,
        None => return fallback(),
    };
    crate::error::Error::ApiError {
        status,
        code: child_text(error, "Code").unwrap_or_else(|| "Unknown".to_string()),
        message: child_text(error, "Message").unwrap_or_default(),
        request_id: child_text(root, "RequestId"),
    }
}
