//! Completion client for the Anthropic Messages API.
//!
//! The model only produces prose; prompt assembly, quota and persistence stay
//! in the service. A single prompt goes out as one user message and the text
//! blocks of the reply come back joined.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::CoachingConfig;

/// Maximum number of characters from an HTTP error body kept in error messages
const MAX_ERROR_BODY_LEN: usize = 200;

/// Text-in, text-out language model seam
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// HTTP client for the Anthropic Messages API
pub struct ClaudeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    anthropic_version: String,
}

impl ClaudeClient {
    pub fn new(config: &CoachingConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            anthropic_version: config.anthropic_version.clone(),
        })
    }

    fn build_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": prompt
            }],
        })
    }

    /// Concatenate the text blocks of a Messages API reply
    fn parse_response(json: &Value) -> Result<String> {
        let blocks = json
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Response has no content array"))?;

        let text_parts: Vec<&str> = blocks
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect();

        if text_parts.is_empty() {
            bail!("Response contained no text blocks");
        }

        Ok(text_parts.join("\n"))
    }
}

#[async_trait]
impl CompletionClient for ClaudeClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.anthropic_version)
            .header("content-type", "application/json")
            .json(&self.build_body(prompt))
            .send()
            .await
            .context("Completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "(unreadable body)".to_string());
            return Err(map_http_error(status.as_u16(), &body));
        }

        let json: Value = response.json().await.context("Completion response was not JSON")?;
        Self::parse_response(&json)
    }
}

fn map_http_error(status: u16, body: &str) -> anyhow::Error {
    // char-based so a multi-byte boundary never panics
    let safe_body = if body.chars().count() > MAX_ERROR_BODY_LEN {
        let truncated: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
        format!("{truncated}…[truncated]")
    } else {
        body.to_string()
    };

    match status {
        401 => anyhow!("Unauthorized: check ANTHROPIC_API_KEY"),
        429 => anyhow!("Rate limited by completion API"),
        s if s >= 500 => anyhow!("Completion server error {s}: {safe_body}"),
        s => anyhow!("HTTP {s}: {safe_body}"),
    }
}
