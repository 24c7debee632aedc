//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::registration::Role;
use crate::store::draft_keys;

/// Service configuration, read from `SIGNUP_*` environment variables.
#[derive(Debug, Clone)]
pub struct SignupConfig {
    /// Account-creation endpoint the composed request is POSTed to.
    pub service_url: String,
    /// Bearer key for the account service, if it wants one.
    pub service_api_key: Option<SecretString>,
    /// Multipart upload endpoint. Image uploads are disabled when unset.
    pub image_host_url: Option<String>,
    pub db_path: PathBuf,
    pub port: u16,
    /// Scope for draft-store rows (one per device/session).
    pub session_id: String,
    /// Role chosen by a role-specific entry point; skips role selection.
    pub preselected_role: Option<Role>,
    /// Transport timeout for the account service call.
    pub request_timeout: Duration,
}

impl Default for SignupConfig {
    fn default() -> Self {
        Self {
            service_url: String::new(),
            service_api_key: None,
            image_host_url: None,
            db_path: PathBuf::from("./data/role-signup.db"),
            port: 8080,
            session_id: draft_keys::DEFAULT_SESSION.to_string(),
            preselected_role: None,
            request_timeout: Duration::from_secs(30), // transport concern only
        }
    }
}

impl SignupConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let service_url = get("SIGNUP_SERVICE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("SIGNUP_SERVICE_URL".to_string()))?;

        let port = match get("SIGNUP_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "SIGNUP_PORT".to_string(),
                message: e.to_string(),
            })?,
            None => defaults.port,
        };

        let request_timeout = match get("SIGNUP_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue {
                    key: "SIGNUP_REQUEST_TIMEOUT_SECS".to_string(),
                    message: e.to_string(),
                }
            })?),
            None => defaults.request_timeout,
        };

        let preselected_role = get("SIGNUP_PRESELECTED_ROLE")
            .map(|raw| {
                raw.parse::<Role>().map_err(|message| ConfigError::InvalidValue {
                    key: "SIGNUP_PRESELECTED_ROLE".to_string(),
                    message,
                })
            })
            .transpose()?;

        Ok(Self {
            service_url,
            service_api_key: get("SIGNUP_SERVICE_API_KEY").map(SecretString::from),
            image_host_url: get("SIGNUP_IMAGE_HOST_URL"),
            db_path: get("SIGNUP_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            port,
            session_id: get("SIGNUP_SESSION_ID").unwrap_or(defaults.session_id),
            preselected_role,
            request_timeout,
        })
    }
}
