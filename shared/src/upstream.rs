//! RocketRez API client.

use base64::Engine;
use serde_json::Value;
use tracing::{info, warn};

use crate::{Config, Error, Result};

/// Longest upstream error body echoed back to the caller.
pub const MAX_ERROR_DETAILS_CHARS: usize = 300;

/// Parameters of one tour schedule lookup.
#[derive(Debug, Clone)]
pub struct ScheduleQuery {
    pub site_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub username: String,
    pub password: String,
}

impl ScheduleQuery {
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/tourschedules?SiteId={}&SelectedDate={}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(&self.site_id),
            urlencoding::encode(&self.date)
        )
    }

    /// `Authorization` header value.
    pub fn authorization(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes())
        )
    }
}

pub struct RocketRezClient {
    http_client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl RocketRezClient {
    pub fn new(config: &Config) -> Self {
        Self::with_http_client(reqwest::Client::new(), config)
    }

    pub fn with_http_client(http_client: reqwest::Client, config: &Config) -> Self {
        Self {
            http_client,
            base_url: config.api_base_url.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Fetch the raw schedule payload. One attempt, no retries.
    pub async fn fetch_schedules(&self, query: &ScheduleQuery) -> Result<Value> {
        let url = query.url(&self.base_url);

        info!(site_id = %query.site_id, date = %query.date, "Fetching tour schedules");

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", query.authorization())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "RocketRez API returned an error");
            let body = response.text().await?;
            return Err(Error::Upstream {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| status.to_string()),
                details: body.chars().take(MAX_ERROR_DETAILS_CHARS).collect(),
                url,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
