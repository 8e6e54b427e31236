// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document ingestion: extraction, splitting, and corpus scanning.

pub mod chunker;

use std::path::Path;
use thiserror::Error;
use tracing::warn;

pub use chunker::{extract_and_split, is_supported_extension, split_text, DocumentChunk};

#[derive(Error, Debug)]
pub enum IngestError {
    /// Input is not a format this node can extract text from.
    #[error("Unsupported format: {filename}")]
    UnsupportedFormat { filename: String },

    /// Input claimed a supported format but could not be read.
    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    /// Corpus directory could not be walked.
    #[error("Corpus scan failed: {0}")]
    ScanFailed(#[from] std::io::Error),
}

impl IngestError {
    pub fn error_code(&self) -> &'static str {
        match self {
            IngestError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            IngestError::ExtractionError(_) => "EXTRACTION_ERROR",
            IngestError::ScanFailed(_) => "SCAN_FAILED",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            IngestError::UnsupportedFormat { filename } => {
                format!("Cannot extract text from '{filename}': unsupported format")
            }
            _ => self.to_string(),
        }
    }
}

/// Load and chunk every supported document under `dir`, recursively.
///
/// Files that fail extraction are skipped with a warning rather than
/// aborting the scan; the rebuild path should index everything it can.
/// Returns chunks in deterministic (path-sorted) order.
pub fn scan_corpus(
    dir: &Path,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<DocumentChunk>, IngestError> {
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    let mut chunks = Vec::new();
    for path in files {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if !is_supported_extension(&filename) {
            continue;
        }

        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable corpus file");
                continue;
            }
        };

        match extract_and_split(&raw, &filename, chunk_size, chunk_overlap) {
            Ok(file_chunks) => chunks.extend(file_chunks),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unextractable corpus file");
            }
        }
    }

    Ok(chunks)
}

fn collect_files(dir: &Path, out: &mut Vec<std::path::PathBuf>) -> Result<(), IngestError> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let chunks = scan_corpus(&missing, 500, 100).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_scan_reads_supported_files_and_skips_others() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "alpha beta gamma").unwrap();
        std::fs::write(dir.path().join("image.png"), [0xffu8, 0x00]).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/more.md"), "delta epsilon").unwrap();

        let chunks = scan_corpus(dir.path(), 500, 100).unwrap();
        assert_eq!(chunks.len(), 2);
        let sources: Vec<&str> = chunks
            .iter()
            .map(|c| c.metadata["source_file"].as_str().unwrap())
            .collect();
        assert!(sources.contains(&"notes.txt"));
        assert!(sources.contains(&"more.md"));
    }
}
