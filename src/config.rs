//! Run configuration: repository connection settings, identifier
//! validation, and CLI datetime parsing.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} contains disallowed character {found:?}")]
    BadCharacter { field: &'static str, found: char },

    #[error("invalid datetime {value:?}; expected YYYY-MM-DDTHH:MM")]
    BadDatetime { value: String },
}

/// Connection settings for the remote content repository.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub auth_token: String,
}

impl RepositoryConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Validate a caller-supplied identifier before it is embedded in logical
/// paths. Allowed characters are ASCII alphanumerics plus `_`, `-` and `.`.
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Empty { field });
    }
    let disallowed = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')));
    if let Some(found) = disallowed {
        return Err(ConfigError::BadCharacter { field, found });
    }
    Ok(())
}

/// Parse the CLI datetime format `YYYY-MM-DDTHH:MM`, interpreted as UTC.
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, ConfigError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .map(|naive| naive.and_utc())
        .map_err(|_| ConfigError::BadDatetime {
            value: value.to_string(),
        })
}
