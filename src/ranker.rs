//! Value ranking for extracted points.
//!
//! Scores are a fixed textual heuristic over numbers, percentages, currency
//! amounts and KPI vocabulary:
//!   score = 5 × min(#digit runs, 5) + 10 × #(N% | +Npp | -Npp) + 15 × [has $N] + 5 × #KPI terms
//!
//! The score says how "talkable" a point looks, not whether it is true.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static PERCENT_OR_PP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+%|\+\d+pp|-\d+pp").unwrap());
static CURRENCY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\d+").unwrap());

const KPI_TERMS: &[&str] = &[
    "revenue",
    "market share",
    "retention",
    "awareness",
    "guidance",
    "customers",
    "growth",
    "qoq",
    "yoy",
];

const TABLE_TITLE: &str = "Ranked Points (Value Only)";

/// A point paired with its value score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub point: String,
    pub score: f64,
}

/// Value score of one point, rounded to one decimal.
pub fn score_value(point: &str) -> f64 {
    let lower = point.to_lowercase();
    let mut score = 0.0;

    score += DIGIT_RUN.find_iter(point).count().min(5) as f64 * 5.0;
    score += PERCENT_OR_PP.find_iter(point).count() as f64 * 10.0;
    if CURRENCY.is_match(point) {
        score += 15.0;
    }
    score += KPI_TERMS.iter().filter(|k| lower.contains(*k)).count() as f64 * 5.0;

    (score * 10.0).round() / 10.0
}

/// Scores every point and sorts by score, highest first.
///
/// Points with equal scores keep their input order.
pub fn rank(points: &[String]) -> Vec<ScoredPoint> {
    let mut scored: Vec<ScoredPoint> = points
        .par_iter()
        .map(|p| ScoredPoint {
            point: p.clone(),
            score: score_value(p),
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// Renders the fixed-width ranking table.
pub fn render_table(ranked: &[ScoredPoint]) -> String {
    let mut out = String::new();
    out.push_str(TABLE_TITLE);
    out.push('\n');
    out.push_str(&"=".repeat(35));
    out.push_str("\n\n");
    out.push_str("Rank  Value  Point\n");
    out.push_str(&"-".repeat(35));
    out.push('\n');
    for (i, sp) in ranked.iter().enumerate() {
        out.push_str(&format!("{:>3}   {:>5.1}  {}\n", i + 1, sp.score, sp.point));
    }
    out
}

/// Reads the non-empty lines of a points file.
pub fn read_points(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::Ranking(format!("Cannot read points file {}: {}", path.display(), e))
    })?;

    let points: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if points.is_empty() {
        return Err(Error::Ranking(format!(
            "Points file {} contains no points",
            path.display()
        )));
    }
    Ok(points)
}

/// Returns the most recently modified `*.txt` in `dir`.
pub fn find_latest_points(dir: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::Ranking(format!("Cannot list points directory {}: {}", dir.display(), e))
    })?;

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .filter_map(|path| {
            let modified = path.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, path))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, path)| path)
        .ok_or_else(|| Error::Ranking(format!("No points file found in {}", dir.display())))
}

/// Ranks a points file and writes `Ranked_Points_{stamp}.txt` into `out_dir`.
pub fn rank_points_file(points_path: &Path, out_dir: &Path, stamp: &str) -> Result<PathBuf> {
    let points = read_points(points_path)?;
    let ranked = rank(&points);
    debug!("Ranked {} points from {}", ranked.len(), points_path.display());

    std::fs::create_dir_all(out_dir).map_err(|e| {
        Error::Ranking(format!("Cannot create {}: {}", out_dir.display(), e))
    })?;
    let out_path = out_dir.join(format!("Ranked_Points_{}.txt", stamp));
    std::fs::write(&out_path, render_table(&ranked)).map_err(|e| {
        Error::Ranking(format!("Cannot write {}: {}", out_path.display(), e))
    })?;

    Ok(out_path)
}
