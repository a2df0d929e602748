use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, ProviderResponse};
use super::configs::AnthropicProviderConfig;
use super::utils::{anthropic_response_to_message, messages_to_anthropic_spec, tools_to_anthropic_spec};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let mut request = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        if let Some(beta) = &self.config.beta {
            request = request.header("anthropic-beta", beta);
        }

        let response = request.json(&payload).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            status => {
                let error_text = response.text().await?;
                let detail = serde_json::from_str::<Value>(&error_text)
                    .ok()
                    .and_then(|body| body["error"]["message"].as_str().map(String::from))
                    .unwrap_or(error_text);
                Err(anyhow!("Request failed: {} - {}", status, detail))
            }
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<ProviderResponse> {
        let mut payload = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": messages_to_anthropic_spec(messages),
        });

        if !system.is_empty() {
            payload["system"] = json!(system);
        }
        if !tools.is_empty() {
            payload["tools"] = json!(tools_to_anthropic_spec(tools)?);
        }
        if let Some(temp) = self.config.temperature {
            payload["temperature"] = json!(temp);
        }

        tracing::debug!(
            model = %self.config.model,
            message_count = messages.len(),
            tool_count = tools.len(),
            "Sending messages request"
        );

        let response = self.post(payload).await?;
        let completion = anthropic_response_to_message(&response)?;

        tracing::debug!(
            stop_reason = %completion.stop_reason,
            input_tokens = ?completion.usage.input_tokens,
            output_tokens = ?completion.usage.output_tokens,
            "Received messages response"
        );

        Ok(completion)
    }
}
