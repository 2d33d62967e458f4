//! OpenAI-compatible chat completion client.

use anyhow::anyhow;

use crate::config::{ConfigError, LlmConfig};

/// Thin client over a `/chat/completions` endpoint. One instance per
/// participant; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ChatClient {
    /// Build a client from the LLM configuration.
    ///
    /// Fails when no API key is configured.
    pub fn new(config: &LlmConfig) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?.to_string();
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::Invalid {
                detail: format!("http client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: None,
        })
    }

    /// Cap completion length for participants with bounded output.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One completion round trip. `messages` are (role, content) pairs
    /// appended after the system prompt.
    pub async fn complete(
        &self,
        system: &str,
        messages: &[(String, String)],
    ) -> anyhow::Result<String> {
        let mut chat: Vec<serde_json::Value> = Vec::with_capacity(messages.len() + 1);
        chat.push(serde_json::json!({ "role": "system", "content": system }));
        for (role, content) in messages {
            chat.push(serde_json::json!({ "role": role, "content": content }));
        }

        let mut request_body = serde_json::json!({
            "model": self.model,
            "messages": chat,
            "temperature": self.temperature,
        });
        if let Some(max_tokens) = self.max_tokens {
            request_body["max_tokens"] = serde_json::json!(max_tokens);
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("chat API error ({}): {}", status, body));
        }

        let resp_json: serde_json::Value = response.json().await?;
        let content = resp_json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();
        Ok(content)
    }
}
