//! Credentials rendered as environment variables

pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
/// Legacy name still read by boto2 and some older SDKs
pub const AWS_SECURITY_TOKEN: &str = "AWS_SECURITY_TOKEN";
pub const AWS_CREDENTIAL_EXPIRATION: &str = "AWS_CREDENTIAL_EXPIRATION";

type EnvironmentListInner = Vec<(&'static str, String)>;

pub struct EnvironmentList {
    inner: EnvironmentListInner,
}

impl EnvironmentList {
    /// `export NAME='value'` lines for `eval`
    pub fn exports(&self) -> String {
        self.inner
            .iter()
            .map(|(k, v)| format!("export {k}={}\n", shell_quote(v)))
            .collect()
    }
}

/// Single-quote `value` for POSIX shells; embedded `'` becomes `'\''`
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

impl std::fmt::Display for EnvironmentList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        for (k, v) in self.inner.iter() {
            writeln!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

impl std::ops::Deref for EnvironmentList {
    type Target = EnvironmentListInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<EnvironmentListInner> for EnvironmentList {
    fn from(mut inner: Vec<(&'static str, String)>) -> Self {
        inner.sort_by_key(|k| k.0);
        Self { inner }
    }
}

impl From<&crate::client::Credentials> for EnvironmentList {
    fn from(credentials: &crate::client::Credentials) -> Self {
        use secrecy::ExposeSecret;
        let token = credentials.session_token.expose_secret();
        vec![
            (AWS_ACCESS_KEY_ID, credentials.access_key_id.clone()),
            (
                AWS_SECRET_ACCESS_KEY,
                credentials.secret_access_key.expose_secret().clone(),
            ),
            (AWS_SESSION_TOKEN, token.clone()),
            (AWS_SECURITY_TOKEN, token.clone()),
            (
                AWS_CREDENTIAL_EXPIRATION,
                credentials
                    .expiration
                    .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            ),
        ]
        .into()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rendering_envlist() {
        let envlist = EnvironmentList::from(vec![
            ("TEST_ENV_C", "ccc".to_string()),
            ("TEST_ENV_A", "aaa".to_string()),
            ("TEST_ENV_B", "bbb".to_string()),
        ]);
        assert_eq!(
            envlist.to_string(),
            indoc::indoc! {"
                TEST_ENV_A=aaa
                TEST_ENV_B=bbb
                TEST_ENV_C=ccc
            "}
        );
    }

    #[test]
    fn test_rendering_credentials() {
        let credentials = crate::dev::make_test_credentials("ASIASPOKE");
        let envlist = EnvironmentList::from(&credentials);
        assert_eq!(
            envlist.to_string(),
            indoc::indoc! {"
                AWS_ACCESS_KEY_ID=ASIASPOKE
                AWS_CREDENTIAL_EXPIRATION=2022-10-01T12:00:00Z
                AWS_SECRET_ACCESS_KEY=ASIASPOKE-secret
                AWS_SECURITY_TOKEN=ASIASPOKE-token
                AWS_SESSION_TOKEN=ASIASPOKE-token
            "}
        );
    }

    #[test]
    fn test_rendering_exports() {
        let envlist = EnvironmentList::from(vec![
            ("TEST_ENV_B", "bbb".to_string()),
            ("TEST_ENV_A", "aaa".to_string()),
        ]);
        assert_eq!(
            envlist.exports(),
            "export TEST_ENV_A='aaa'\nexport TEST_ENV_B='bbb'\n"
        );
    }

    #[test]
    fn test_rendering_exports_quoting() {
        let envlist = EnvironmentList::from(vec![
            ("TEST_ENV_A", "it's $HOME; `x`".to_string()),
            ("TEST_ENV_B", "a+b/c==".to_string()),
        ]);
        assert_eq!(
            envlist.exports(),
            indoc::indoc! {r#"
                export TEST_ENV_A='it'\''s $HOME; `x`'
                export TEST_ENV_B='a+b/c=='
            "#}
        );
    }
}
