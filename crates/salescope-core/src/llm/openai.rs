use crate::errors::PipelineError;
use crate::llm::CompletionClient;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: "https://api.openai.com/v1".to_string(),
            model,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn build_request_body(&self, system: &str, user: &str) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        if let Some(temp) = self.temperature {
            body["temperature"] = temp.into();
        }

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = max_tokens.into();
        }

        body
    }

    /// Extract the completion text from a chat-completions response.
    ///
    /// The response shape is owned by the collaborator and versioned outside
    /// this crate, so each level is checked explicitly; any mismatch is a
    /// generation failure rather than a panic deep in the call chain.
    fn parse_response(&self, response: Value) -> Result<String, PipelineError> {
        let choices = response["choices"]
            .as_array()
            .ok_or_else(|| PipelineError::Generation("No choices in response".to_string()))?;

        if choices.is_empty() {
            return Err(PipelineError::Generation("Empty choices array".to_string()));
        }

        let content = choices[0]["message"]["content"].as_str().ok_or_else(|| {
            PipelineError::Generation("Response message has no content".to_string())
        })?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, PipelineError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request_body(system, user);

        log::debug!("Completion request to {} with model {}", url, self.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Generation(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| PipelineError::Generation(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(PipelineError::Generation(format!(
                "API request failed with status {}: {}",
                status, response_text
            )));
        }

        let response_json: Value = serde_json::from_str(&response_text)
            .map_err(|e| PipelineError::Generation(format!("Invalid JSON response: {}", e)))?;

        self.parse_response(response_json)
    }
}
