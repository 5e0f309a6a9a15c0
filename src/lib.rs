//! Talking Points — compress long PDF reports into ranked, page-tagged bullets.
//!
//! Pages are packed into bounded chunks, each chunk is summarised by a local
//! LLM, the output is parsed into points (with a sentence-selection fallback
//! when the model ignores the format), and the points are ranked by a
//! deterministic value heuristic.

pub mod chunker;
pub mod config;
pub mod error;
pub mod llm;
pub mod pdf;
pub mod pipeline;
pub mod points;
pub mod ranker;
pub mod summariser;

pub use chunker::{chunk_pages, Chunk, Page};
pub use config::SummariserConfig;
pub use error::{Error, Result};
pub use points::extract_points;
pub use ranker::{rank, score_value, ScoredPoint};
