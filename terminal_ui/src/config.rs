use std::env;
use std::path::PathBuf;

use sahabat_shared::User;
use thiserror::Error;
use url::Url;

const STORE_URL_VAR: &str = "SAHABAT_STORE_URL";
const DEFAULT_STORE_URL: &str = "http://localhost:3000/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not a valid url: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Settings read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_url: Url,
    /// Signed-in user, if the environment names one.
    pub user: Option<User>,
    /// Where log output goes. Logging is off when unset, since the
    /// terminal is owned by the board.
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup(STORE_URL_VAR).unwrap_or_else(|| DEFAULT_STORE_URL.to_string());
        let store_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidUrl {
            key: STORE_URL_VAR,
            source,
        })?;

        let display_name = lookup("SAHABAT_USER_NAME");
        let email = lookup("SAHABAT_USER_EMAIL");
        let user = (display_name.is_some() || email.is_some()).then(|| User {
            display_name,
            email,
            photo_url: lookup("SAHABAT_USER_PHOTO"),
        });

        Ok(Self {
            store_url,
            user,
            log_file: lookup("SAHABAT_LOG_FILE").map(PathBuf::from),
        })
    }
}
