use std::path::Path;

use tracing::{debug, info, warn};

use crate::chunker::Chunk;
use crate::config::SummariserConfig;
use crate::error::{Error, Result};
use crate::llm::{GenerateOptions, Generator};
use crate::points;

/// Loads a prompt template from disk.
pub fn load_prompt(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::Prompt(format!(
            "Prompt file not found: {}",
            path.display()
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Fills the `{{TEXT}}`, `{{START_PAGE}}` and `{{END_PAGE}}` placeholders by
/// literal substitution.
pub fn format_prompt(template: &str, text: &str, start_page: u32, end_page: u32) -> String {
    template
        .replace("{{TEXT}}", text)
        .replace("{{START_PAGE}}", &start_page.to_string())
        .replace("{{END_PAGE}}", &end_page.to_string())
}

/// Drives one generation call per chunk and collects the extracted points.
pub struct Summariser {
    model: String,
    template: String,
    options: GenerateOptions,
    fallback_k: usize,
}

impl Summariser {
    pub fn new(config: &SummariserConfig, template: String) -> Self {
        Self {
            model: config.model.clone(),
            template,
            options: GenerateOptions {
                temperature: config.temperature,
            },
            fallback_k: config.fallback_k,
        }
    }

    /// Summarises `chunks` strictly in order, one backend call at a time.
    ///
    /// A failed call is treated as empty output, which sends that chunk
    /// through the sentence fallback. Chunks with no text are skipped.
    pub async fn summarise_chunks(&self, generator: &dyn Generator, chunks: &[Chunk]) -> Vec<String> {
        let mut bullets = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx + 1;
            let text_in = chunk.text.trim();
            if text_in.is_empty() {
                debug!("Chunk {} is empty; skipping.", idx);
                continue;
            }

            let prompt = format_prompt(&self.template, text_in, chunk.start_page, chunk.end_page);
            let raw = match generator
                .generate(&self.model, &prompt, None, &self.options)
                .await
            {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Generation failed on chunk {} (pages {}): {}", idx, chunk.page_range(), e);
                    String::new()
                }
            };
            debug!("Chunk {} raw length: {}", idx, raw.len());

            let pts = points::extract_points(&raw, chunk, self.fallback_k);
            info!("Chunk {} (pages {}): +{} point(s)", idx, chunk.page_range(), pts.len());
            bullets.extend(pts);
        }

        bullets
    }
}
