//! Configuration management for the schedule proxy Lambda.

use std::env;

use crate::{Error, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://secure.rocket-rez.com/RocketAPI/v1";
pub const DEFAULT_SITE_ID: &str = "2";
pub const DEFAULT_USER_AGENT: &str = "RocketRez-Schedule-Proxy/1.0";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the RocketRez API, without trailing slash
    pub api_base_url: String,
    /// Site used when the caller omits `siteId`
    pub default_site_id: String,
    /// User-Agent sent upstream
    pub user_agent: String,
    /// Whether success responses carry `debugInfo`
    pub include_debug_info: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            default_site_id: DEFAULT_SITE_ID.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            include_debug_info: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let api_base_url = env::var("ROCKETREZ_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = api_base_url.trim().trim_end_matches('/').to_string();
        if api_base_url.is_empty() {
            return Err(Error::Config("ROCKETREZ_API_BASE_URL is empty".to_string()));
        }

        Ok(Self {
            api_base_url,
            default_site_id: env::var("DEFAULT_SITE_ID")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SITE_ID.to_string()),
            user_agent: env::var("ROCKETREZ_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
            include_debug_info: env::var("INCLUDE_DEBUG_INFO")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(" OFF "));
        assert!(!parse_flag("0"));
    }
}
