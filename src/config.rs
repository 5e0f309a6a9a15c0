//! Run configuration: a plain value object handed to the pipeline.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::chunker;
use crate::error::{Error, Result};
use crate::points::DEFAULT_FALLBACK_K;

/// Everything a run needs, resolved up front by the caller.
#[derive(Debug, Clone)]
pub struct SummariserConfig {
    /// Ollama server base URL.
    pub ollama_host: String,
    /// Model identifier passed to the backend.
    pub model: String,
    /// Soft character budget per chunk.
    pub max_chars: usize,
    /// Characters carried from one chunk into the next.
    pub overlap: usize,
    pub temperature: f64,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
    /// Prompt template with `{{TEXT}}`, `{{START_PAGE}}`, `{{END_PAGE}}`.
    pub prompt_path: PathBuf,
    /// Where to look for the newest PDF when none is given.
    pub reports_dir: PathBuf,
    pub points_dir: PathBuf,
    pub ranked_dir: PathBuf,
    /// Sentences kept per chunk when the model output has no bullets.
    pub fallback_k: usize,
}

impl Default for SummariserConfig {
    fn default() -> Self {
        Self {
            ollama_host: "http://127.0.0.1:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            max_chars: 3000,
            overlap: 200,
            temperature: 0.1,
            timeout_secs: 60,
            prompt_path: PathBuf::from("prompts").join("points_prompt.txt"),
            reports_dir: PathBuf::from("reports"),
            points_dir: PathBuf::from("points_output"),
            ranked_dir: PathBuf::from("ranker_output"),
            fallback_k: DEFAULT_FALLBACK_K,
        }
    }
}

impl SummariserConfig {
    /// Built-in defaults overlaid with `OLLAMA_HOST`, `MODEL`, `MAX_CHARS`,
    /// `OVERLAP`, `TEMPERATURE`, `TIMEOUT` and `POINTS_PROMPT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("OLLAMA_HOST") {
            config.ollama_host = host;
        }
        if let Some(model) = lookup("MODEL") {
            config.model = model;
        }
        if let Some(v) = lookup("MAX_CHARS") {
            config.max_chars = parse_var("MAX_CHARS", &v)?;
        }
        if let Some(v) = lookup("OVERLAP") {
            config.overlap = parse_var("OVERLAP", &v)?;
        }
        if let Some(v) = lookup("TEMPERATURE") {
            config.temperature = parse_var("TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("TIMEOUT") {
            config.timeout_secs = parse_var("TIMEOUT", &v)?;
        }
        if let Some(path) = lookup("POINTS_PROMPT") {
            config.prompt_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Rejects parameters the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure_min("max-chars", self.max_chars, chunker::MIN_MAX_CHARS)?;
        ensure_min("timeout", self.timeout_secs as usize, 1)?;
        ensure_min("fallback-k", self.fallback_k, 1)?;
        chunker::validate_budget(self.max_chars, self.overlap)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Fails with a configuration error when `value < min`.
pub fn ensure_min(name: &str, value: usize, min: usize) -> Result<usize> {
    if value < min {
        return Err(Error::Config(format!("{} must be >= {}", name, min)));
    }
    Ok(value)
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} is not a valid number: {:?}", name, raw)))
}
