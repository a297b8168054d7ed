//! Configuration module for environment variable parsing.
//!
//! Every option has a default; malformed values fall back to the default with a
//! warning. Cross-field rules are enforced by [`Config::validate`], which the
//! binary treats as fatal.

use std::env;
use std::str::FromStr;

use tracing::warn;
use url::Url;

/// Default value reported by the health check as the component name.
pub const DEFAULT_PLUGIN_NAME: &str = "daily_stock_analysis_adapter";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host the webhook listener binds to
    pub webhook_host: String,

    /// Port the webhook listener binds to
    pub webhook_port: u16,

    /// Base path for the health check and webhook routes
    pub webhook_path: String,

    /// Shared HMAC secret used to verify inbound webhooks
    pub secret_key: Option<String>,

    /// Whether inbound webhooks must carry a valid signature
    pub enable_signature_verification: bool,

    /// Maximum accepted distance between `X-Timestamp` and now, in seconds.
    /// `None` only requires the header to be present.
    pub signature_max_age_secs: Option<u64>,

    /// Ordered list of recipient identifiers the report is broadcast to
    pub target_groups: Vec<String>,

    /// Pause after each successful delivery, in milliseconds
    pub broadcast_delay_ms: u64,

    /// Keep broadcasting to the remaining recipients when one delivery fails
    pub broadcast_continue_on_error: bool,

    /// Base URL of the HTML-to-image rendering service
    pub render_service_url: String,

    /// Base URL of the messaging platform HTTP API
    pub messaging_api_url: String,

    /// Bearer token for the messaging platform HTTP API
    pub messaging_access_token: Option<String>,

    /// Timeout applied to every call to the renderer and the messaging API
    pub request_timeout_ms: u64,

    /// Log full inbound webhook bodies at info level
    pub log_webhook_body: bool,

    /// Name reported by the health check
    pub plugin_name: String,
}

/// Configuration that cannot be used to start the service.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("signature verification is enabled but SECRET_KEY is not configured")]
    MissingSecret,

    #[error("WEBHOOK_PATH must start with '/', got {0:?}")]
    InvalidPath(String),

    #[error("WEBHOOK_PATH must be a literal path without ':' or '*', got {0:?}")]
    RoutePattern(String),

    #[error("{name} is not a valid URL: {value}")]
    InvalidUrl { name: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            webhook_host: "0.0.0.0".to_string(),
            webhook_port: 8080,
            webhook_path: "/stock-analysis".to_string(),
            secret_key: None,
            enable_signature_verification: false,
            signature_max_age_secs: None,
            target_groups: Vec::new(),
            broadcast_delay_ms: 1000,
            broadcast_continue_on_error: false,
            render_service_url: "http://127.0.0.1:8999".to_string(),
            messaging_api_url: "http://127.0.0.1:5700".to_string(),
            messaging_access_token: None,
            request_timeout_ms: 30_000,
            log_webhook_body: true,
            plugin_name: DEFAULT_PLUGIN_NAME.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            webhook_host: env::var("WEBHOOK_HOST").unwrap_or(defaults.webhook_host),

            webhook_port: parse_or("WEBHOOK_PORT", defaults.webhook_port),

            webhook_path: env::var("WEBHOOK_PATH").unwrap_or(defaults.webhook_path),

            secret_key: env::var("SECRET_KEY").ok(),

            enable_signature_verification: parse_bool(
                "ENABLE_SIGNATURE_VERIFICATION",
                defaults.enable_signature_verification,
            ),

            signature_max_age_secs: env::var("SIGNATURE_MAX_AGE_SECS")
                .ok()
                .and_then(|v| match v.trim().parse() {
                    Ok(secs) => Some(secs),
                    Err(_) => {
                        warn!(env_var = "SIGNATURE_MAX_AGE_SECS", value = %v, "Invalid number, freshness window disabled");
                        None
                    }
                }),

            target_groups: parse_csv("TARGET_GROUPS").unwrap_or_default(),

            broadcast_delay_ms: parse_or("BROADCAST_DELAY_MS", defaults.broadcast_delay_ms),

            broadcast_continue_on_error: parse_bool(
                "BROADCAST_CONTINUE_ON_ERROR",
                defaults.broadcast_continue_on_error,
            ),

            render_service_url: env::var("RENDER_SERVICE_URL")
                .unwrap_or(defaults.render_service_url),

            messaging_api_url: env::var("MESSAGING_API_URL").unwrap_or(defaults.messaging_api_url),

            messaging_access_token: env::var("MESSAGING_ACCESS_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms),

            log_webhook_body: parse_bool("LOG_WEBHOOK_BODY", defaults.log_webhook_body),

            plugin_name: env::var("PLUGIN_NAME").unwrap_or(defaults.plugin_name),
        }
    }

    /// Check cross-field rules. A failure here must prevent startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enable_signature_verification && !self.has_secret() {
            return Err(ConfigError::MissingSecret);
        }

        if !self.webhook_path.starts_with('/') {
            return Err(ConfigError::InvalidPath(self.webhook_path.clone()));
        }

        // The path is mounted as an axum route; these would be read as captures.
        if self.webhook_path.contains(&[':', '*'][..]) {
            return Err(ConfigError::RoutePattern(self.webhook_path.clone()));
        }

        for (name, value) in [
            ("RENDER_SERVICE_URL", &self.render_service_url),
            ("MESSAGING_API_URL", &self.messaging_api_url),
        ] {
            if Url::parse(value).is_err() {
                return Err(ConfigError::InvalidUrl {
                    name,
                    value: value.clone(),
                });
            }
        }

        Ok(())
    }

    /// Whether a non-empty secret is configured.
    pub fn has_secret(&self) -> bool {
        self.secret_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Parse a value with `FromStr`, warning and falling back on malformed input.
fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Parse a boolean flag. Accepts true/false, 1/0, yes/no, on/off.
fn parse_bool(name: &str, default: bool) -> bool {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid boolean, using default");
            default
        }
    }
}

/// Parse a comma-separated list of strings.
fn parse_csv(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
