//! Startup configuration: the provider credential.
//!
//! A single bearer token is read from the environment. A missing, empty, or
//! placeholder token is fatal to startup: the program reports a diagnostic
//! and returns without doing any work.

use std::fmt;

use thiserror::Error;

/// Environment variable holding the team-scoped access token.
pub const TOKEN_ENV_VAR: &str = "DROPBOX_ACCESS_TOKEN";

/// Placeholder value shipped in sample configs; treated the same as unset.
const PLACEHOLDER_TOKEN: &str = "your_access_token_here";

/// Errors produced while loading startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The token variable is unset or empty.
    #[error("{var} is not set; export it with your team access token")]
    MissingToken {
        /// The environment variable that was consulted.
        var: &'static str,
    },

    /// The token variable still holds the sample placeholder.
    #[error("{var} still holds the placeholder value; replace it with a real token")]
    PlaceholderToken {
        /// The environment variable that was consulted.
        var: &'static str,
    },
}

/// A validated bearer token for the provider API.
///
/// `Debug` is redacted so the token can never leak through logs that
/// format surrounding structs.
#[derive(Clone)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Loads the credential from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] if the variable is unset or
    /// empty, and [`ConfigError::PlaceholderToken`] if it still holds the
    /// sample value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(std::env::var(TOKEN_ENV_VAR).ok())
    }

    /// Validates a raw lookup result. Split out so tests don't need to
    /// mutate process-wide environment state.
    fn from_lookup(value: Option<String>) -> Result<Self, ConfigError> {
        let token = value.map(|v| v.trim().to_string()).unwrap_or_default();
        if token.is_empty() {
            return Err(ConfigError::MissingToken { var: TOKEN_ENV_VAR });
        }
        if token == PLACEHOLDER_TOKEN {
            return Err(ConfigError::PlaceholderToken { var: TOKEN_ENV_VAR });
        }
        Ok(Self { token })
    }

    /// Returns the raw bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .finish()
    }
}
