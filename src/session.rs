//! Role session names

pub const SESSION_IDENTIFIER_LENGTH: usize = 32;

/// Label attached to both hops of a credential chain so that
/// CloudTrail entries of the hub and spoke sessions can be correlated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentifier(String);

impl SessionIdentifier {
    /// 32 characters drawn uniformly from `[A-Za-z0-9]`
    pub fn generate<R: rand::Rng + ?Sized>(rng: &mut R) -> Self {
        let value = (0..SESSION_IDENTIFIER_LENGTH)
            .map(|_| char::from(rng.sample(rand::distributions::Alphanumeric)))
            .collect();
        Self(value)
    }

    /// Use `label` verbatim when given and non-empty, otherwise generate one.
    pub fn from_label_or_generate<R: rand::Rng + ?Sized>(label: Option<&str>, rng: &mut R) -> Self {
        match label {
            Some(l) if !l.is_empty() => Self(l.to_owned()),
            _ => Self::generate(rng),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Session name used for the spoke hop: `{spoke_account_id}-{identifier}`
    pub fn spoke_session_name(&self, spoke_account_id: &str) -> String {
        format!("{}-{}", spoke_account_id, self.0)
    }
}

impl std::fmt::Display for SessionIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_generate() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let id = SessionIdentifier::generate(&mut rng);
            assert_eq!(id.as_str().len(), SESSION_IDENTIFIER_LENGTH);
            assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_generate_differs() {
        let mut rng = rand::thread_rng();
        let a = SessionIdentifier::generate(&mut rng);
        let b = SessionIdentifier::generate(&mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_seeded_is_deterministic() {
        let a = SessionIdentifier::generate(&mut rand::rngs::StdRng::seed_from_u64(42));
        let b = SessionIdentifier::generate(&mut rand::rngs::StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_label() {
        let mut rng = rand::thread_rng();
        let id = SessionIdentifier::from_label_or_generate(Some("my-session"), &mut rng);
        assert_eq!(id.as_str(), "my-session");

        let id = SessionIdentifier::from_label_or_generate(Some(""), &mut rng);
        assert_eq!(id.as_str().len(), SESSION_IDENTIFIER_LENGTH);

        let id = SessionIdentifier::from_label_or_generate(None, &mut rng);
        assert_eq!(id.as_str().len(), SESSION_IDENTIFIER_LENGTH);
    }

    #[test]
    fn test_spoke_session_name() {
        let id = SessionIdentifier("abc".to_string());
        assert_eq!(id.spoke_session_name("222222222222"), "222222222222-abc");
    }
}
