//! Error taxonomy for the talking-points pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid chunking or runtime parameters. Fatal, raised before any work.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The PDF could not be opened or produced no pages. Fatal.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// A single backend call failed. Absorbed per chunk by the summariser.
    #[error("Generation error: {0}")]
    Generation(String),

    /// The ranking stage could not read or write its artifacts. Logged only.
    #[error("Ranking warning: {0}")]
    Ranking(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
