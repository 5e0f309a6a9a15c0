use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use crate::chunker::Page;
use crate::error::{Error, Result};

/// Checks that `path` exists and has a `.pdf` extension.
pub fn ensure_pdf(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(Error::Extraction(format!("File not found: {}", path.display())));
    }

    if path
        .extension()
        .map_or(true, |ext| ext.to_ascii_lowercase() != "pdf")
    {
        return Err(Error::Extraction(format!(
            "Input must be a .pdf file: {}",
            path.display()
        )));
    }

    Ok(path.to_path_buf())
}

/// Returns the most recently modified `*.pdf` in `dir`.
pub fn find_latest_pdf(dir: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::Extraction(format!("No PDF found in {}: {}", dir.display(), e)))?;

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.to_ascii_lowercase() == "pdf")
        })
        .filter_map(|path| {
            let modified = path.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, path))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, path)| path)
        .ok_or_else(|| Error::Extraction(format!("No PDF found in {}", dir.display())))
}

/// Extracts the text of every page of a PDF, in page order.
///
/// The file is memory-mapped rather than read into a buffer.
pub fn extract_pages(path: &Path) -> Result<Vec<Page>> {
    let file = File::open(path)
        .map_err(|e| Error::Extraction(format!("Failed to open PDF {}: {}", path.display(), e)))?;

    // SAFETY: the mapping is read-only and dropped before this function returns.
    let mmap = unsafe { Mmap::map(&file) }
        .map_err(|e| Error::Extraction(format!("Failed to map PDF {}: {}", path.display(), e)))?;

    let texts = pdf_extract::extract_text_from_mem_by_pages(&mmap)
        .map_err(|e| Error::Extraction(format!("Failed to open PDF: {}", e)))?;

    let pages = number_pages(texts);
    debug!("Extracted {} non-empty pages from {}", pages.len(), path.display());

    if pages.is_empty() {
        return Err(Error::Extraction(format!(
            "PDF has no extractable text. It may be image-based or encrypted: {}",
            path.display()
        )));
    }
    Ok(pages)
}

/// Numbers per-page texts from 1 by position, collapsing whitespace.
///
/// Blank pages are dropped without renumbering the rest.
pub fn number_pages<I, S>(texts: I) -> Vec<Page>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    texts
        .into_iter()
        .enumerate()
        .map(|(i, raw)| Page::new(i as u32 + 1, collapse(raw.as_ref())))
        .filter(|page| !page.text.is_empty())
        .collect()
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a minimal PDF with one Helvetica text line per page.
    fn build_pdf(page_texts: &[&str]) -> Vec<u8> {
        let kids: Vec<String> = (0..page_texts.len())
            .map(|i| format!("{} 0 R", 4 + 2 * i))
            .collect();

        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                page_texts.len()
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];
        for (i, text) in page_texts.iter().enumerate() {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                5 + 2 * i
            ));
            let stream = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                stream.len(),
                stream
            ));
        }

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }

        let xref = out.len();
        out.extend_from_slice(
            format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes(),
        );
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref
            )
            .as_bytes(),
        );
        out
    }

    #[test]
    fn test_extract_pages_keeps_page_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(
            &path,
            build_pdf(&["Revenue up 10% to $50M", "Guidance raised for FY25"]),
        )
        .unwrap();

        let pages = extract_pages(&path).unwrap();
        assert_eq!(
            pages,
            vec![
                Page::new(1, "Revenue up 10% to $50M"),
                Page::new(2, "Guidance raised for FY25"),
            ]
        );
    }

    #[test]
    fn test_extract_pages_skips_blank_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gappy.pdf");
        std::fs::write(&path, build_pdf(&["First page", " ", "Third page"])).unwrap();

        let pages = extract_pages(&path).unwrap();
        let numbers: Vec<u32> = pages.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(pages[1].text, "Third page");
    }

    #[test]
    fn test_number_pages_collapses_and_drops_blanks() {
        let pages = number_pages(vec!["Page one\n  text", " \n ", "Page   three"]);
        assert_eq!(
            pages,
            vec![Page::new(1, "Page one text"), Page::new(3, "Page three")]
        );
    }

    #[test]
    fn test_number_pages_all_blank() {
        assert!(number_pages(vec!["", "  \t "]).is_empty());
    }

    #[test]
    fn test_ensure_pdf_missing() {
        let err = ensure_pdf(Path::new("/nonexistent/report.pdf")).unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[test]
    fn test_ensure_pdf_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        assert!(ensure_pdf(&path).is_err());

        let pdf = dir.path().join("Report.PDF");
        std::fs::write(&pdf, "%PDF-1.4").unwrap();
        assert_eq!(ensure_pdf(&pdf).unwrap(), pdf);
    }

    #[test]
    fn test_find_latest_pdf() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_latest_pdf(dir.path()).is_err());

        let old = dir.path().join("old.pdf");
        let new = dir.path().join("new.pdf");
        std::fs::write(&old, "%PDF").unwrap();
        std::fs::write(dir.path().join("ignore.txt"), "x").unwrap();
        std::fs::write(&new, "%PDF").unwrap();

        let past = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        assert_eq!(find_latest_pdf(dir.path()).unwrap(), new);
    }

    #[test]
    fn test_extract_pages_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, "this is not a pdf").unwrap();

        let err = extract_pages(&path).unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}
