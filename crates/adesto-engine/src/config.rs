//! Engine configuration loaded from environment variables.
//!
//! All settings have defaults so a view can open with zero configuration.

use adesto_shared::constants::{DAYS_WINDOW, MESSAGE_PAGE_LIMIT};

/// Tunables for mounted views.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Length of the visible date window in days.
    /// Env: `ADESTO_WINDOW_DAYS`
    /// Default: `7`
    pub window_days: u32,

    /// Messages fetched on the initial chat load.
    /// Env: `ADESTO_MESSAGE_LIMIT`
    /// Default: `50`
    pub message_page_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_days: DAYS_WINDOW,
            message_page_limit: MESSAGE_PAGE_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Read configuration from the environment, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            window_days: env_parse("ADESTO_WINDOW_DAYS").unwrap_or(defaults.window_days),
            message_page_limit: env_parse("ADESTO_MESSAGE_LIMIT")
                .unwrap_or(defaults.message_page_limit),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.window_days, 7);
        assert_eq!(config.message_page_limit, 50);
    }
}
