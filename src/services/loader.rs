//! PDF document loading with page-level tracking for source attribution.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::LoaderError;
use crate::models::{PageContent, PdfDocument};

/// Result of scanning a directory: the documents that loaded plus the
/// per-file failures that were skipped. A single unreadable PDF never aborts
/// the batch.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<PdfDocument>,
    pub failures: Vec<LoaderError>,
}

impl LoadOutcome {
    pub fn total_pages(&self) -> usize {
        self.documents.iter().map(PdfDocument::page_count).sum()
    }
}

/// Loads PDF files from a directory in deterministic order.
#[derive(Debug, Default)]
pub struct PdfLoader;

impl PdfLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load every PDF in `dir` (non-recursive, lexicographic filename order).
    ///
    /// A missing directory is fatal; extraction failures for individual files
    /// are collected into the outcome and the scan continues.
    pub fn load_directory(&self, dir: &Path) -> Result<LoadOutcome, LoaderError> {
        if !dir.is_dir() {
            return Err(LoaderError::DirectoryNotFound(dir.to_path_buf()));
        }

        let mut outcome = LoadOutcome::default();
        for path in collect_pdf_files(dir)? {
            match extract_document(&path) {
                Ok(document) => outcome.documents.push(document),
                Err(error) => outcome.failures.push(error),
            }
        }

        Ok(outcome)
    }
}

/// List the PDF files directly under `dir`, sorted by filename.
pub(crate) fn collect_pdf_files(dir: &Path) -> Result<Vec<PathBuf>, LoaderError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| LoaderError::WalkError(e.to_string()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Extract per-page text from one PDF, dropping pages that are empty after
/// stripping. Pages keep their 1-based physical numbers so citations stay
/// accurate even when blank pages are skipped.
fn extract_document(path: &Path) -> Result<PdfDocument, LoaderError> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());

    let raw_pages =
        pdf_extract::extract_text_by_pages(path).map_err(|e| LoaderError::ExtractionError {
            file: filename.clone(),
            message: e.to_string(),
        })?;

    let pages: Vec<PageContent> = raw_pages
        .into_iter()
        .enumerate()
        .filter_map(|(idx, text)| {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(PageContent {
                filename: filename.clone(),
                page_number: idx as u32 + 1,
                text: text.to_string(),
            })
        })
        .collect();

    Ok(PdfDocument { filename, pages })
}
