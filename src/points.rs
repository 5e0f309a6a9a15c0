//! Turns raw generated text into normalized, page-tagged talking points.
//!
//! Model output is scanned for bullet lines first. When it contains none (the
//! backend failed, or the model ignored the requested format), the chunk's own
//! text is split into sentences and the most signal-dense ones are kept.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::chunker::Chunk;

/// Default number of sentences kept by the fallback selector.
pub const DEFAULT_FALLBACK_K: usize = 6;

/// Any `[p.N]` or `[p.N-M]` tag.
static PAGE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[p\.\d+(?:-\d+)?\]").unwrap());

/// A line consisting only of a chunker page marker, or the tail end of one
/// left at the start of a chunk by the overlap cut (`p.12]`, `2]`).
static PAGE_MARKER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\[?p)?\.?\d*\]$").unwrap());

static PERCENT_SIGNAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d%\b|\bpp\b|%\b").unwrap());
static CURRENCY_SIGNAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\s*\d").unwrap());
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").unwrap());

const FALLBACK_KEYWORDS: &[&str] = &[
    "yoy",
    "qoq",
    "guidance",
    "revenue",
    "retention",
    "market share",
    "pricing",
    "margin",
];

/// A leading symbol that marks a line as a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BulletMarker {
    /// A single glyph such as `-` or `•`.
    Glyph(char),
    /// One to three digits followed by the given terminator, e.g. `12.` or `3)`.
    Numbered(char),
}

const BULLET_MARKERS: &[BulletMarker] = &[
    BulletMarker::Glyph('-'),
    BulletMarker::Glyph('–'),
    BulletMarker::Glyph('—'),
    BulletMarker::Glyph('•'),
    BulletMarker::Glyph('*'),
    BulletMarker::Numbered('.'),
    BulletMarker::Numbered(')'),
];

impl BulletMarker {
    /// Returns the text after the marker if `line` starts with this marker
    /// followed by whitespace.
    fn strip<'a>(&self, line: &'a str) -> Option<&'a str> {
        let rest = match *self {
            BulletMarker::Glyph(glyph) => line.strip_prefix(glyph)?,
            BulletMarker::Numbered(terminator) => {
                let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
                if !(1..=3).contains(&digits) {
                    return None;
                }
                line[digits..].strip_prefix(terminator)?
            }
        };
        rest.starts_with(char::is_whitespace).then_some(rest)
    }
}

/// Extracts the points for one chunk from the backend's raw output.
///
/// Falls back to sentence selection over `chunk.text` when `raw` has no bullet
/// lines. Every returned point starts with `- ` and ends with a page tag.
pub fn extract_points(raw: &str, chunk: &Chunk, fallback_k: usize) -> Vec<String> {
    let mut points = extract_bullets(raw);
    if points.is_empty() {
        debug!(
            "No bullets in model output for pages {}; selecting sentences",
            chunk.page_range()
        );
        points = top_sentences(&chunk.text, fallback_k);
    }

    points
        .into_iter()
        .map(|p| ensure_page_tag(&p, chunk.start_page, chunk.end_page))
        .collect()
}

/// Collects bullet-like lines as `- `-prefixed, whitespace-collapsed points.
pub fn extract_bullets(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(|line| {
            let line = line.trim_start();
            BULLET_MARKERS.iter().find_map(|marker| marker.strip(line))
        })
        .map(collapse_whitespace)
        .filter(|content| !content.is_empty())
        .map(|content| format!("- {}", content))
        .collect()
}

/// Appends `[p.N]` / `[p.N-M]` unless the point already carries a page tag.
pub fn ensure_page_tag(point: &str, start_page: u32, end_page: u32) -> String {
    if PAGE_TAG.is_match(point) {
        return point.to_string();
    }
    let range = if start_page == end_page {
        start_page.to_string()
    } else {
        format!("{}-{}", start_page, end_page)
    };
    format!("{} [p.{}]", point.trim_end_matches('.'), range)
}

/// Picks up to `k` decision-useful sentences from chunk text.
///
/// Ordering is score descending, then sentence text ascending, then position,
/// so the result is fully determined by the input.
pub fn top_sentences(text: &str, k: usize) -> Vec<String> {
    let mut scored: Vec<(f64, usize, &str)> = candidate_sentences(text)
        .into_iter()
        .enumerate()
        .map(|(idx, s)| (sentence_signal(s), idx, s))
        .collect();

    scored.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then_with(|| a.2.cmp(b.2))
            .then_with(|| a.1.cmp(&b.1))
    });

    scored
        .into_iter()
        .take(k)
        .map(|(_, _, s)| format!("- {}", collapse_whitespace(s)))
        .collect()
}

/// Sentence candidates from every non-marker line of the chunk.
fn candidate_sentences(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !PAGE_MARKER_LINE.is_match(line))
        .flat_map(split_sentences)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Splits on whitespace that follows `.`, `?` or `!`, except after
/// abbreviations like `e.g.`, `U.S.` or `Mr.`.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut out = Vec::new();
    let mut start = 0;

    for i in 1..chars.len() {
        let (byte, ch) = chars[i];
        if !ch.is_whitespace() || !matches!(chars[i - 1].1, '.' | '?' | '!') {
            continue;
        }
        if ends_with_abbreviation(&chars[..i]) {
            continue;
        }
        out.push(&text[start..byte]);
        start = byte + ch.len_utf8();
    }
    out.push(&text[start..]);
    out
}

fn ends_with_abbreviation(before: &[(usize, char)]) -> bool {
    let n = before.len();
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    // "e.g." / "U.S."
    if n >= 4 {
        let w = &before[n - 4..];
        if is_word(w[0].1) && w[1].1 == '.' && is_word(w[2].1) {
            return true;
        }
    }
    // "Mr." / "Co."
    if n >= 3 {
        let w = &before[n - 3..];
        if w[0].1.is_ascii_uppercase() && w[1].1.is_ascii_lowercase() && w[2].1 == '.' {
            return true;
        }
    }
    false
}

/// Local signal score used only to choose fallback sentences.
fn sentence_signal(sentence: &str) -> f64 {
    let lower = sentence.to_lowercase();
    let mut score = 0.0;

    if PERCENT_SIGNAL.is_match(sentence) {
        score += 3.0;
    }
    if CURRENCY_SIGNAL.is_match(sentence) {
        score += 2.0;
    }
    if FALLBACK_KEYWORDS.iter().any(|k| lower.contains(k)) {
        score += 2.0;
    }
    let digits = DIGIT.find_iter(sentence).count().min(5);
    score + digits as f64 * 0.3
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
