//! Configuration for the default authentication system.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for [`DefaultAuthenticationSystem`](crate::DefaultAuthenticationSystem).
///
/// A TTL of 0 makes the corresponding credential expire immediately,
/// which is mostly useful in tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// How long a session key stays valid after it was issued or last
    /// refreshed through the token flow.
    pub session_key_ttl_secs: u64,

    /// How long a verification token can be redeemed after issue.
    pub verification_token_ttl_secs: u64,

    /// Maximum age of the `issued_at` stamp inside combo-token data.
    pub combo_data_max_age_secs: u64,

    /// Create an account on first password login instead of answering
    /// `NotFound`.
    pub auto_create_accounts: bool,

    /// Value reported as `combo_id` in combo-token results.
    pub combo_id: String,
}

impl AuthConfig {
    pub fn session_key_ttl(&self) -> Duration {
        Duration::from_secs(self.session_key_ttl_secs)
    }

    pub fn verification_token_ttl(&self) -> Duration {
        Duration::from_secs(self.verification_token_ttl_secs)
    }

    pub fn combo_data_max_age(&self) -> Duration {
        Duration::from_secs(self.combo_data_max_age_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_key_ttl_secs: 7 * 24 * 60 * 60,
            verification_token_ttl_secs: 15 * 60,
            combo_data_max_age_secs: 24 * 60 * 60,
            auto_create_accounts: false,
            combo_id: "157795300".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert_eq!(config.session_key_ttl(), Duration::from_secs(604_800));
        assert_eq!(config.verification_token_ttl(), Duration::from_secs(900));
        assert_eq!(config.combo_data_max_age(), Duration::from_secs(86_400));
        assert!(!config.auto_create_accounts);
        assert_eq!(config.combo_id, "157795300");
    }
}
