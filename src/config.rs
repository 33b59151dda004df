//! Client configuration.
//!
//! Resolution order is explicit override, then environment (with `.env`
//! support via dotenvy), then defaults suitable for local development.

use std::time::Duration;

use crate::realtime::ChannelConfig;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws/general";

/// Settings for the API client and the realtime channel.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub ws_endpoint: String,
    pub auth_token: Option<String>,
    pub reconnect_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            ws_endpoint: DEFAULT_WS_URL.to_string(),
            auth_token: None,
            reconnect_delay: ChannelConfig::DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl Config {
    /// Resolve configuration from the environment.
    ///
    /// Reads `RUNBOARD_API_URL`, `RUNBOARD_WS_URL`, `RUNBOARD_AUTH_TOKEN`,
    /// and `RUNBOARD_RECONNECT_DELAY_MS`; anything unset falls back to the
    /// defaults above.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            api_base_url: std::env::var("RUNBOARD_API_URL")
                .unwrap_or(defaults.api_base_url),
            ws_endpoint: std::env::var("RUNBOARD_WS_URL").unwrap_or(defaults.ws_endpoint),
            auth_token: std::env::var("RUNBOARD_AUTH_TOKEN").ok(),
            reconnect_delay: std::env::var("RUNBOARD_RECONNECT_DELAY_MS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_delay),
        }
    }

    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_ws_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.ws_endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Derive the realtime channel's transport configuration.
    #[must_use]
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig::new(self.ws_endpoint.clone()).with_reconnect_delay(self.reconnect_delay)
    }
}
