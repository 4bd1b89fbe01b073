//! Harness configuration
//!
//! Base URLs and timeouts are externally supplied; nothing here is baked
//! into scenario or client logic.

use serde::{Deserialize, Serialize};

/// Configuration shared by the API client, the scenario runner, and the
/// browser driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Base URL of the backend API (e.g. `http://localhost:8081/api`)
    pub api_base_url: String,

    /// Base URL of the rendered UI (e.g. `http://localhost:4100`)
    pub ui_base_url: String,

    /// Default bounded wait for a step, in milliseconds
    pub default_timeout_ms: u64,

    /// Interval between condition polls, in milliseconds
    pub poll_interval_ms: u64,

    /// Run the browser headless
    pub headless: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8081/api".to_string(),
            ui_base_url: "http://localhost:4100".to_string(),
            default_timeout_ms: 10_000,
            poll_interval_ms: 250,
            headless: true,
        }
    }
}

impl HarnessConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// Recognized: `CONDUIT_API_URL`, `CONDUIT_UI_URL`,
    /// `CONDUIT_STEP_TIMEOUT_MS`, `CONDUIT_POLL_INTERVAL_MS`,
    /// `CONDUIT_HEADLESS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("CONDUIT_API_URL") {
            config.api_base_url = url;
        }
        if let Ok(url) = std::env::var("CONDUIT_UI_URL") {
            config.ui_base_url = url;
        }
        if let Some(ms) = env_u64("CONDUIT_STEP_TIMEOUT_MS") {
            config.default_timeout_ms = ms;
        }
        if let Some(ms) = env_u64("CONDUIT_POLL_INTERVAL_MS") {
            config.poll_interval_ms = ms;
        }
        if let Ok(v) = std::env::var("CONDUIT_HEADLESS") {
            config.headless = v != "0" && !v.eq_ignore_ascii_case("false");
        }

        config
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
