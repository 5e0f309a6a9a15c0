use crate::error::{Error, Result};

/// Smallest `max_chars` budget the chunker accepts.
pub const MIN_MAX_CHARS: usize = 1000;

/// One page of extracted text. Page numbers are ascending but not
/// necessarily consecutive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub text: String,
}

impl Page {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }

    /// Page text wrapped in its `[p.N]` marker, as it appears inside a chunk.
    pub fn tagged(&self) -> String {
        format!("\n[p.{}]\n{}\n", self.number, self.text)
    }
}

/// A window of consecutive tagged pages submitted to the backend as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub start_page: u32,
    pub end_page: u32,
}

impl Chunk {
    /// `"3"` for a single-page chunk, `"3-5"` otherwise.
    pub fn page_range(&self) -> String {
        if self.start_page == self.end_page {
            self.start_page.to_string()
        } else {
            format!("{}-{}", self.start_page, self.end_page)
        }
    }
}

/// Checks the chunking budget without touching any pages.
pub fn validate_budget(max_chars: usize, overlap: usize) -> Result<()> {
    if max_chars < MIN_MAX_CHARS {
        return Err(Error::Config(format!(
            "max_chars must be >= {} (got {}); recommend >= 3000",
            MIN_MAX_CHARS, max_chars
        )));
    }
    if overlap >= max_chars {
        return Err(Error::Config(format!(
            "overlap must be >= 0 and < max_chars (got overlap={}, max_chars={})",
            overlap, max_chars
        )));
    }
    Ok(())
}

/// Greedily packs tagged pages into chunks of at most `max_chars` characters.
///
/// - `max_chars`: soft character budget per chunk; a single page larger than
///   the budget still gets a chunk of its own and is never split
/// - `overlap`: number of trailing characters of a closed chunk that seed the
///   next one
///
/// When an overlap tail seeds a new chunk, that chunk's `start_page` is the
/// last page of the chunk the tail came from.
pub fn chunk_pages(pages: &[Page], max_chars: usize, overlap: usize) -> Result<Vec<Chunk>> {
    validate_budget(max_chars, overlap)?;

    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut size = 0usize;
    let mut start_page = 0u32;
    let mut end_page = 0u32;

    for page in pages {
        let part = page.tagged();
        let part_len = part.chars().count();

        if buf.is_empty() {
            start_page = page.number;
        }

        if size + part_len > max_chars && !buf.is_empty() {
            let closed = std::mem::take(&mut buf);
            let tail = char_tail(&closed, overlap).to_string();
            chunks.push(Chunk {
                text: closed,
                start_page,
                end_page,
            });

            size = tail.chars().count();
            if tail.is_empty() {
                start_page = page.number;
            } else {
                start_page = end_page;
                buf = tail;
            }
        }

        buf.push_str(&part);
        size += part_len;
        end_page = page.number;
    }

    if !buf.is_empty() {
        chunks.push(Chunk {
            text: buf,
            start_page,
            end_page,
        });
    }

    Ok(chunks)
}

/// Returns the last `n` characters of `text` (all of it if shorter).
fn char_tail(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let total = text.chars().count();
    if n >= total {
        return text;
    }
    match text.char_indices().nth(total - n) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}
