use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Sampling options forwarded to the backend with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerateOptions {
    pub temperature: f64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self { temperature: 0.1 }
    }
}

/// A text-generation backend: prompt in, raw text out.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: Option<&str>,
        options: &GenerateOptions,
    ) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    #[serde(default)]
    name: String,
}

/// Minimal client for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    host: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Creates a client for `host` (e.g. `http://127.0.0.1:11434`).
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            host: host.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns true if the server answers `/api/tags` successfully.
    pub async fn is_alive(&self) -> bool {
        match self
            .http
            .get(format!("{}/api/tags", self.host))
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("Ollama health check failed: {}", e);
                false
            }
        }
    }

    /// Returns true if `name` is among the locally available models.
    pub async fn has_model(&self, name: &str) -> bool {
        match self.list_models().await {
            Ok(models) => models.iter().any(|m| m == name),
            Err(e) => {
                debug!("Could not list Ollama models: {}", e);
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let tags: TagsResponse = self
            .http
            .get(format!("{}/api/tags", self.host))
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Pulls `name` unless it is already present.
    pub async fn ensure_model(&self, name: &str) -> Result<()> {
        if self.has_model(name).await {
            return Ok(());
        }

        info!("Model '{}' not found locally; pulling...", name);
        let pull_timeout = self.timeout.max(Duration::from_secs(300));
        let resp = self
            .http
            .post(format!("{}/api/pull", self.host))
            .json(&json!({ "name": name, "stream": false }))
            .timeout(pull_timeout)
            .send()
            .await
            .map_err(|e| pull_failed(name, &e.to_string()))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(pull_failed(name, &body));
        }
        Ok(())
    }
}

fn pull_failed(name: &str, reason: &str) -> Error {
    Error::Generation(format!(
        "Model '{}' not available and pull failed: {}\nRun: ollama pull {} (and ensure ollama serve is running).",
        name, reason, name
    ))
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: Option<&str>,
        options: &GenerateOptions,
    ) -> Result<String> {
        let prompt = match system {
            Some(sys) => format!("<SYS>\n{}\n</SYS>\n{}", sys, prompt),
            None => prompt.to_string(),
        };
        let body = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": options,
        });

        let resp = self
            .http
            .post(format!("{}/api/generate", self.host))
            .json(&body)
            .timeout(self.timeout.max(Duration::from_secs(120)))
            .send()
            .await
            .map_err(|e| Error::Generation(format!("Request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("API error {}: {}", status, text)));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| Error::Generation(format!("Malformed response: {}", e)))?;
        Ok(parsed.response)
    }
}
