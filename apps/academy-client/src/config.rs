use std::path::PathBuf;
use std::time::Duration;

use crate::gateway::backoff::ReconnectPolicy;
use crate::models::session::Role;

/// Client configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend origin (e.g. `http://localhost:5000`). REST paths live under `/api`.
    pub api_url: String,
    /// WebSocket endpoint for live notifications.
    pub channel_url: String,
    /// Directory backing the local auth-status flags.
    pub storage_dir: PathBuf,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
    /// Reconnection schedule for the notification channel.
    pub reconnect: ReconnectPolicy,
    /// Credentials used by the terminal front end, if any.
    pub login: Option<LoginConfig>,
}

#[derive(Debug, Clone)]
pub struct LoginConfig {
    pub email: String,
    pub password: String,
    pub portal: Role,
}

impl Config {
    /// Defaults for everything except the backend origin.
    pub fn new(api_url: &str) -> Self {
        let api_url = api_url.trim_end_matches('/').to_string();
        Self {
            channel_url: channel_url_for(&api_url),
            api_url,
            storage_dir: PathBuf::from(".academy"),
            http_timeout: Duration::from_secs(15),
            reconnect: ReconnectPolicy::default(),
            login: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        let mut config = Self::new(&required_var("API_URL"));

        if let Some(url) = optional_var("CHANNEL_URL") {
            config.channel_url = url;
        }
        if let Some(dir) = optional_var("ACADEMY_STORAGE_DIR") {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Some(secs) = parsed_var::<u64>("HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parsed_var::<u64>("CHANNEL_RECONNECT_BASE_MS") {
            config.reconnect.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parsed_var::<u64>("CHANNEL_RECONNECT_MAX_DELAY_MS") {
            config.reconnect.max_delay = Duration::from_millis(ms);
        }
        if let Some(attempts) = parsed_var::<u32>("CHANNEL_RECONNECT_MAX_ATTEMPTS") {
            config.reconnect.max_attempts = attempts;
        }
        if let Some(ms) = parsed_var::<u64>("CHANNEL_STABLE_AFTER_MS") {
            config.reconnect.stable_after = Duration::from_millis(ms);
        }

        config.login = match (optional_var("ACADEMY_EMAIL"), optional_var("ACADEMY_PASSWORD")) {
            (Some(email), Some(password)) => Some(LoginConfig {
                email,
                password,
                portal: optional_var("ACADEMY_PORTAL")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(Role::Student),
            }),
            _ => None,
        };

        config
    }

    /// Absolute URL for a REST path such as `auth/verify`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.api_url, path.trim_start_matches('/'))
    }
}

/// Derive the WebSocket endpoint from the REST origin.
fn channel_url_for(api_url: &str) -> String {
    let ws = if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        api_url.to_string()
    };
    format!("{ws}/gateway")
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    optional_var(name).and_then(|v| v.parse().ok())
}
