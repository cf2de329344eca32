//! IAM role descriptors

/// A role to assume, identified by its account and name.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RoleDescriptor {
    account_id: String,
    role_name: String,
}

impl RoleDescriptor {
    pub fn new(account_id: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            role_name: role_name.into(),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// `arn:aws:iam::{account_id}:role/{role_name}`; values are substituted as-is.
    pub fn role_arn(&self) -> String {
        format!("arn:aws:iam::{}:role/{}", self.account_id, self.role_name)
    }

    /// `label` names the descriptor in error messages (e.g. "hub", "spoke")
    pub(crate) fn validate(&self, label: &str) -> Result<(), crate::error::Error> {
        if self.account_id.is_empty() {
            return Err(crate::error::Error::ConfigError(format!(
                "{label} account ID cannot be empty"
            )));
        }
        if self.role_name.is_empty() {
            return Err(crate::error::Error::ConfigError(format!(
                "{label} role name cannot be empty"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for RoleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.role_arn())
    }
}
