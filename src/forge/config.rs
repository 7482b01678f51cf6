//! Configuration for GitHub API connections.
use secrecy::SecretString;
use std::env;

use crate::error::{AdvisorError, Result};

/// Default GitHub API endpoint.
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
/// Environment variable consulted when no token is passed explicitly.
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Connection configuration for the GitHub API.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// API base URL (override for GitHub Enterprise).
    pub base_uri: String,
    /// Access token for authentication.
    pub token: SecretString,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            base_uri: DEFAULT_GITHUB_API.to_string(),
            token: SecretString::from("".to_string()),
        }
    }
}

impl GithubConfig {
    /// Build a configuration from an explicit token, falling back to the
    /// `GITHUB_TOKEN` environment variable.
    pub fn from_token(token: &str) -> Result<Self> {
        let mut token = token.to_string();

        if token.is_empty()
            && let Ok(env_var_token) = env::var(GITHUB_TOKEN_VAR)
        {
            token = env_var_token;
        }

        if token.is_empty() {
            return Err(AdvisorError::InvalidArgs(
                "must set github token".to_string(),
            ));
        }

        Ok(Self {
            token: SecretString::from(token),
            ..Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn explicit_token_wins() {
        temp_env::with_var(GITHUB_TOKEN_VAR, Some("from-env"), || {
            let config = GithubConfig::from_token("explicit").unwrap();
            assert_eq!(config.token.expose_secret(), "explicit");
            assert_eq!(config.base_uri, DEFAULT_GITHUB_API);
        });
    }

    #[test]
    fn falls_back_to_environment() {
        temp_env::with_var(GITHUB_TOKEN_VAR, Some("from-env"), || {
            let config = GithubConfig::from_token("").unwrap();
            assert_eq!(config.token.expose_secret(), "from-env");
        });
    }

    #[test]
    fn missing_token_is_an_error() {
        temp_env::with_var_unset(GITHUB_TOKEN_VAR, || {
            let result = GithubConfig::from_token("");
            assert!(matches!(result, Err(AdvisorError::InvalidArgs(_))));
        });
    }
}
