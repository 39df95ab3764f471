use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use crate::prompt;
use crate::retry::RetryPolicy;
use crate::schema::ResultShape;
use crate::ExtractionClient;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*(.*?)\s*```\s*$").expect("code fence pattern is valid")
});

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
    retry: RetryPolicy,
    json_attempts: usize,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    format: String, // "json" for structured output
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new("http://localhost:11434".to_string(), "llama3".to_string())
    }
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
            json_attempts: 3,
        }
    }

    /// Bound every request; a timed out call surfaces as an ordinary failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(self)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            format: "json".to_string(),
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama request failed: {}", response.status());
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(ollama_response.response)
    }

    async fn generate_with_backoff(&self, prompt: &str) -> Result<String> {
        self.retry.retry("ollama_generate", || self.generate(prompt)).await
    }

    /// Generate, asking the model to repair its own output when it is not JSON
    pub async fn generate_json_with_retry(
        &self,
        prompt: &str,
        max_attempts: usize,
    ) -> Result<serde_json::Value> {
        let mut response = self.generate_with_backoff(prompt).await?;

        for attempt in 1..=max_attempts {
            match parse_json_response(&response) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Model returned invalid JSON");
                    if attempt == max_attempts {
                        break;
                    }
                    let retry_prompt = prompt::build_retry_prompt(&response);
                    response = self.generate_with_backoff(&retry_prompt).await?;
                }
            }
        }

        anyhow::bail!("Failed to get valid JSON after {} attempts", max_attempts)
    }
}

#[async_trait]
impl ExtractionClient for OllamaClient {
    async fn extract(&self, instruction: &str, shape: ResultShape) -> Result<serde_json::Value> {
        let prompt = prompt::with_output_schema(instruction, shape);
        debug!(shape = shape.name(), model = %self.model, "Sending extraction request");

        self.generate_json_with_retry(&prompt, self.json_attempts)
            .await
            .with_context(|| format!("{} extraction failed", shape.name()))
    }
}

/// Parse a model reply, tolerating a markdown code fence around the JSON.
fn parse_json_response(response: &str) -> Result<serde_json::Value> {
    let body = match CODE_FENCE.captures(response) {
        Some(caps) => caps.get(1).map_or(response, |m| m.as_str()),
        None => response,
    };
    serde_json::from_str(body.trim()).context("Response is not valid JSON")
}
