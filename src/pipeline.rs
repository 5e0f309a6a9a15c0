use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::chunker::{self, Page};
use crate::config::SummariserConfig;
use crate::error::{Error, Result};
use crate::llm::{Generator, OllamaClient};
use crate::pdf;
use crate::ranker;
use crate::summariser::{self, Summariser};

static NON_WORD_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\-]+").unwrap());

/// Per-run switches that are not part of the pipeline configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Input PDF; the newest PDF in the reports directory when `None`.
    pub pdf: Option<PathBuf>,
    /// Print the page range of every chunk.
    pub show_chunks: bool,
    /// Stop after chunking, without calling the backend.
    pub dry_run: bool,
    /// Pull the model from the backend if it is missing.
    pub pull_model: bool,
}

/// What a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub pages: usize,
    pub chunks: usize,
    pub points: usize,
    pub points_path: Option<PathBuf>,
    pub ranked_path: Option<PathBuf>,
}

/// Full run against a PDF on disk and the configured Ollama server.
///
/// Pipeline: Extract pages → Chunk → Generate per chunk → Extract points →
/// Write points file → Rank.
pub async fn run(config: &SummariserConfig, opts: &RunOptions) -> Result<RunSummary> {
    config.validate()?;

    let pdf_path = match &opts.pdf {
        Some(path) => path.clone(),
        None => pdf::find_latest_pdf(&config.reports_dir)?,
    };
    let pdf_path = pdf::ensure_pdf(&pdf_path)?;

    println!("\n=== Extracting PDF Pages ===");
    let pages = pdf::extract_pages(&pdf_path)?;
    println!("Pages extracted: {}", pages.len());

    let client = OllamaClient::new(&config.ollama_host, config.timeout())?;
    if !opts.dry_run {
        preflight(&client, &config.model, opts.pull_model).await?;
    }

    run_pages(config, &client, &pages, &company_slug(&pdf_path), opts).await
}

/// Warns when the backend is down; pulls the model when asked to.
async fn preflight(client: &OllamaClient, model: &str, pull_model: bool) -> Result<()> {
    if !client.is_alive().await {
        warn!(
            "Ollama is not reachable at {}; every chunk will use sentence fallback",
            client.host()
        );
        return Ok(());
    }
    if pull_model {
        client.ensure_model(model).await?;
    } else if !client.has_model(model).await {
        warn!("Model '{}' is not available locally (use --pull-model)", model);
    }
    Ok(())
}

/// Runs everything after page extraction against any generation backend.
pub async fn run_pages(
    config: &SummariserConfig,
    generator: &dyn Generator,
    pages: &[Page],
    company: &str,
    opts: &RunOptions,
) -> Result<RunSummary> {
    if pages.is_empty() {
        return Err(Error::Extraction("No pages to summarise".to_string()));
    }

    let chunks = chunker::chunk_pages(pages, config.max_chars, config.overlap)?;
    println!(
        "Chunks created: {} (max_chars={}, overlap={})",
        chunks.len(),
        config.max_chars,
        config.overlap
    );

    let mut summary = RunSummary {
        pages: pages.len(),
        chunks: chunks.len(),
        ..RunSummary::default()
    };

    if opts.show_chunks || opts.dry_run {
        for (i, chunk) in chunks.iter().enumerate() {
            println!("  - Chunk {}: pages {}", i + 1, chunk.page_range());
        }
        if opts.dry_run {
            println!("Dry run complete. No generation performed.");
            return Ok(summary);
        }
    }

    println!("\n=== Summarising Points ===");
    let template = summariser::load_prompt(&config.prompt_path)?;
    let summariser = Summariser::new(config, template);
    let points = summariser.summarise_chunks(generator, &chunks).await;
    summary.points = points.len();

    let stamp = chrono::Local::now();
    let points_name = format!("{}_POINTS_{}", company, stamp.format("%Y%m%d_%H%M%S"));
    let points_path = write_points(&points, &config.points_dir, &points_name)?;
    println!("Saved points summary: {}", points_path.display());
    summary.points_path = Some(points_path.clone());

    println!("\n=== Ranking Points (Value Only) ===");
    let rank_stamp = stamp.format("%Y%m%d-%H%M%S").to_string();
    match ranker::rank_points_file(&points_path, &config.ranked_dir, &rank_stamp) {
        Ok(path) => {
            println!("Ranked points saved to: {}", path.display());
            summary.ranked_path = Some(path);
        }
        Err(e) => warn!("Ranking step failed ({})", e),
    }

    info!(
        "Run complete: {} pages, {} chunks, {} points",
        summary.pages, summary.chunks, summary.points
    );
    Ok(summary)
}

/// Ranks an existing points file, or the newest one in the points directory.
pub fn rank_existing(config: &SummariserConfig, points: Option<&Path>) -> Result<PathBuf> {
    let points_path = match points {
        Some(path) => path.to_path_buf(),
        None => ranker::find_latest_points(&config.points_dir)?,
    };
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    ranker::rank_points_file(&points_path, &config.ranked_dir, &stamp)
}

/// Writes one point per line to `{dir}/{name}.txt`.
pub fn write_points(points: &[String], dir: &Path, name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.txt", name));
    let mut body = points.join("\n");
    if !points.is_empty() {
        body.push('\n');
    }
    std::fs::write(&path, body)?;
    Ok(path)
}

/// File-name-safe company label derived from the PDF's stem.
pub fn company_slug(pdf_path: &Path) -> String {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let slug = NON_WORD_RUN.replace_all(&stem, "_");
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "report".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerateOptions;
    use async_trait::async_trait;

    struct Offline;

    #[async_trait]
    impl Generator for Offline {
        async fn generate(
            &self,
            _model: &str,
            _prompt: &str,
            _system: Option<&str>,
            _options: &GenerateOptions,
        ) -> Result<String> {
            Err(Error::Generation("connection refused".into()))
        }
    }

    fn config_in(dir: &Path) -> SummariserConfig {
        let prompt_path = dir.join("prompt.txt");
        std::fs::write(&prompt_path, "Summarise pages {{START_PAGE}}-{{END_PAGE}}:\n{{TEXT}}").unwrap();
        SummariserConfig {
            overlap: 0,
            prompt_path,
            points_dir: dir.join("points"),
            ranked_dir: dir.join("ranked"),
            ..SummariserConfig::default()
        }
    }

    #[test]
    fn test_company_slug() {
        assert_eq!(company_slug(Path::new("reports/Acme Corp (Q3).pdf")), "Acme_Corp_Q3");
        assert_eq!(company_slug(Path::new("brand-health_2025.pdf")), "brand-health_2025");
        assert_eq!(company_slug(Path::new("???.pdf")), "report");
    }

    #[test]
    fn test_write_points_format() {
        let dir = tempfile::tempdir().unwrap();
        let points = vec!["- a [p.1]".to_string(), "- b [p.2]".to_string()];
        let path = write_points(&points, dir.path(), "Acme_POINTS_x").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "- a [p.1]\n- b [p.2]\n");

        let empty = write_points(&[], dir.path(), "empty").unwrap();
        assert_eq!(std::fs::read_to_string(empty).unwrap(), "");
    }

    #[tokio::test]
    async fn test_dry_run_stops_before_generation() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let pages = vec![Page::new(1, "Revenue up 10% to $50M")];
        let opts = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };

        let summary = run_pages(&config, &Offline, &pages, "Acme", &opts).await.unwrap();
        assert_eq!(summary.chunks, 1);
        assert!(summary.points_path.is_none());
        assert!(!config.points_dir.exists());
    }

    #[tokio::test]
    async fn test_no_pages_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let err = run_pages(&config, &Offline, &[], "Acme", &RunOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[tokio::test]
    async fn test_bad_budget_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = SummariserConfig {
            max_chars: 10,
            ..config_in(dir.path())
        };
        let pages = vec![Page::new(1, "text")];
        let err = run_pages(&config, &Offline, &pages, "Acme", &RunOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_prompt_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = SummariserConfig {
            prompt_path: dir.path().join("missing.txt"),
            ..config_in(dir.path())
        };
        let pages = vec![Page::new(1, "text")];
        let err = run_pages(&config, &Offline, &pages, "Acme", &RunOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Prompt(_)));
    }

    #[test]
    fn test_rank_existing_without_points_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        assert!(matches!(rank_existing(&config, None), Err(Error::Ranking(_))));
    }
}
