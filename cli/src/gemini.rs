use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;

use fitlog_core::insights::{GenerateRequest, GenerateResponse, InsightProvider};

use crate::config::InsightSettings;

/// Generative-text client for the insights endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(settings: &InsightSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "fitlog-cli/{} (weight tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl InsightProvider for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let Some(key) = &self.api_key else {
            bail!("No insights API key configured (set insights.api_key or FITLOG_INSIGHTS__API_KEY)");
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .query(&[("key", key.as_str())])
            .json(request)
            .send()
            .await
            .context("Failed to reach insights API")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("Insights API returned {status}");
        }

        resp.json()
            .await
            .context("Failed to parse insights API response")
    }
}
