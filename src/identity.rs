//! Ambient identity: credentials used to sign a request

const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
const AWS_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";
const DEFAULT_PROFILE: &str = "default";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AmbientIdentity {
    pub access_key_id: String,
    pub secret_access_key: crate::client::SensitiveString,
    pub session_token: Option<crate::client::SensitiveString>,
}

impl AmbientIdentity {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: crate::client::SensitiveString::new(secret_access_key.into()),
            session_token: session_token.map(crate::client::SensitiveString::new),
        }
    }

    /// Load the caller's starting identity: environment variables first, then a profile in the
    /// shared credentials file.
    pub async fn load(profile: Option<&str>) -> Result<Self, crate::error::Error> {
        if let Some(identity) = Self::from_env_with(|k| std::env::var(k).ok()) {
            tracing::debug!(message = "Using credentials from environment variables", access_key_id = %identity.access_key_id);
            return Ok(identity);
        }

        let path = shared_credentials_file_path()?;
        let profile = profile.unwrap_or(DEFAULT_PROFILE);
        let identity = Self::from_shared_credentials_file(&path, profile).await?;
        tracing::debug!(message = "Using credentials from shared credentials file", path = ?path, profile = %profile, access_key_id = %identity.access_key_id);
        Ok(identity)
    }

    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN` through `lookup`.
    /// Returns None unless both keys are present and non-empty.
    pub fn from_env_with<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |k: &str| lookup(k).filter(|v| !v.is_empty());
        let access_key_id = non_empty(AWS_ACCESS_KEY_ID)?;
        let secret_access_key = non_empty(AWS_SECRET_ACCESS_KEY)?;
        Some(Self::new(
            access_key_id,
            secret_access_key,
            non_empty(AWS_SESSION_TOKEN),
        ))
    }

    pub async fn from_shared_credentials_file(
        path: &std::path::Path,
        profile: &str,
    ) -> Result<Self, crate::error::Error> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(crate::error::Error::ConfigError(format!(
                    "no credentials found; set {AWS_ACCESS_KEY_ID} and {AWS_SECRET_ACCESS_KEY} or create {}",
                    path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        parse_shared_credentials(&contents, profile)
    }
}

impl From<&crate::client::Credentials> for AmbientIdentity {
    fn from(credentials: &crate::client::Credentials) -> Self {
        Self {
            access_key_id: credentials.access_key_id.clone(),
            secret_access_key: credentials.secret_access_key.clone(),
            session_token: Some(credentials.session_token.clone()),
        }
    }
}

fn shared_credentials_file_path() -> Result<std::path::PathBuf, crate::error::Error> {
    if let Ok(p) = std::env::var(AWS_SHARED_CREDENTIALS_FILE) {
        return Ok(p.into());
    }
    let home = std::env::var("HOME").map_err(|_| {
        crate::error::Error::ConfigError(format!(
            "cannot locate shared credentials file; set $HOME or ${AWS_SHARED_CREDENTIALS_FILE}"
        ))
    })?;
    Ok(std::path::PathBuf::from(home)
        .join(".aws")
        .join("credentials"))
}

/// Parse a profile out of an INI formatted `~/.aws/credentials`.
fn parse_shared_credentials(
    contents: &str,
    profile: &str,
) -> Result<AmbientIdentity, crate::error::Error> {
    let mut in_profile = false;
    let mut found = false;
    let mut access_key_id = None;
    let mut secret_access_key = None;
    let mut session_token = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_profile = section.trim() == profile;
            found |= in_profile;
            continue;
        }
        if !in_profile {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            let v = v.trim().to_owned();
            match k.trim() {
                "aws_access_key_id" => access_key_id = Some(v),
                "aws_secret_access_key" => secret_access_key = Some(v),
                "aws_session_token" => session_token = Some(v),
                _ => {}
            }
        }
    }

    if !found {
        return Err(crate::error::Error::ConfigError(format!(
            "profile '{profile}' not found in shared credentials file"
        )));
    }
    match (access_key_id, secret_access_key) {
        (Some(a), Some(s)) if !a.is_empty() && !s.is_empty() => Ok(AmbientIdentity::new(
            a,
            s,
            session_token.filter(|v| !v.is_empty()),
        )),
        _ => Err(crate::error::Error::ConfigError(format!(
            "profile '{profile}' lacks aws_access_key_id or aws_secret_access_key"
        ))),
    }
}
