//! Configuration module for the EstimAÍ client.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ClientError;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the EstimAÍ backend
    pub api_url: String,
    /// API key sent with every request, if the backend requires one
    pub api_key: Option<String>,
    /// Identity of the local user joining sessions
    pub user_id: Option<String>,
    /// Name shown to other participants
    pub display_name: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Per-request timeout for REST calls
    pub request_timeout: Duration,
    /// Delay between push channel reconnect attempts
    pub reconnect_delay: Duration,
    /// Reconnect attempts before a session gives up
    pub reconnect_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080".to_string(),
            api_key: None,
            user_id: None,
            display_name: None,
            log_level: "info".to_string(),
            request_timeout: Duration::from_secs(30),
            reconnect_delay: Duration::from_millis(1000),
            reconnect_attempts: 5,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let api_url = env::var("ESTIMAI_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);

        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "ESTIMAI_API_URL must be an http(s) URL, got {api_url}"
            )));
        }

        let api_key = env::var("ESTIMAI_API_KEY").ok().filter(|k| !k.is_empty());
        let user_id = env::var("ESTIMAI_USER_ID").ok().filter(|u| !u.is_empty());
        let display_name = env::var("ESTIMAI_DISPLAY_NAME")
            .ok()
            .filter(|n| !n.is_empty());

        let log_level = env::var("ESTIMAI_LOG_LEVEL").unwrap_or(defaults.log_level);

        let request_timeout = parse_var("ESTIMAI_REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let reconnect_delay = parse_var("ESTIMAI_RECONNECT_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.reconnect_delay);

        let reconnect_attempts =
            parse_var::<u32>("ESTIMAI_RECONNECT_ATTEMPTS")?.unwrap_or(defaults.reconnect_attempts);

        Ok(Self {
            api_url,
            api_key,
            user_id,
            display_name,
            log_level,
            request_timeout,
            reconnect_delay,
            reconnect_attempts,
        })
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, ClientError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| {
            ClientError::Config(format!("{name} must be a non-negative integer in range"))
        }),
        Err(_) => Ok(None),
    }
}
