use crate::error::PullError;
use chrono_tz::Tz;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_OUTPUT_PATH: &str = "assets/users.json";
pub const DEFAULT_LOOKBACK_MONTHS: u32 = 14;
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

pub const PROPERTY_ID_VAR: &str = "GA4_PROPERTY_ID";
pub const SERVICE_ACCOUNT_VAR: &str = "GA4_SA_JSON";
pub const OUTPUT_PATH_VAR: &str = "USERS_JSON_PATH";
pub const LOOKBACK_MONTHS_VAR: &str = "LOOKBACK_MONTHS";
pub const TIMEZONE_VAR: &str = "REPORT_TIMEZONE";

/// The fields of a service-account key file needed to mint access tokens.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

// Keeps the private key out of logs.
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, PullError> {
        let key: ServiceAccountKey = serde_json::from_str(json).map_err(|e| {
            PullError::Configuration(format!("{} is not a valid service account key: {}", SERVICE_ACCOUNT_VAR, e))
        })?;
        if key.client_email.trim().is_empty() || key.private_key.trim().is_empty() {
            return Err(PullError::Configuration(format!(
                "{} must contain client_email and private_key",
                SERVICE_ACCOUNT_VAR
            )));
        }
        Ok(key)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub property_id: String,
    pub credentials: ServiceAccountKey,
    pub output_path: PathBuf,
    pub lookback_months: u32,
    pub timezone: Tz
}

impl Config {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, PullError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load settings through `lookup`, which returns the value of a named variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PullError>
    where
        F: Fn(&str) -> Option<String>
    {
        let property_id = match lookup(PROPERTY_ID_VAR) {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => {
                return Err(PullError::Configuration(format!(
                    "{} environment variable not found",
                    PROPERTY_ID_VAR
                )))
            }
        };

        let credentials = match lookup(SERVICE_ACCOUNT_VAR) {
            Some(json) => ServiceAccountKey::from_json(&json)?,
            None => {
                return Err(PullError::Configuration(format!(
                    "{} environment variable not found",
                    SERVICE_ACCOUNT_VAR
                )))
            }
        };

        let output_path = lookup(OUTPUT_PATH_VAR)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH));

        let lookback_months = match lookup(LOOKBACK_MONTHS_VAR) {
            None => DEFAULT_LOOKBACK_MONTHS,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(PullError::Configuration(format!(
                        "{} must be a whole number of months >= 1, got '{}'",
                        LOOKBACK_MONTHS_VAR, raw
                    )))
                }
            }
        };

        let timezone = match lookup(TIMEZONE_VAR) {
            None => Tz::UTC,
            Some(name) => name.trim().parse::<Tz>().map_err(|_| {
                PullError::Configuration(format!("{} names an unknown time zone: '{}'", TIMEZONE_VAR, name))
            })?
        };

        Ok(Config {
            property_id,
            credentials,
            output_path,
            lookback_months,
            timezone
        })
    }
}
