// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document extraction and splitting.
//!
//! `extract_and_split` is a pure function from raw upload bytes to an
//! ordered sequence of text fragments: decode, then split recursively on
//! paragraph, line, and word boundaries down to a bounded chunk size with
//! overlap between neighbors.

use serde_json::json;

use super::IngestError;

/// Separators tried in order when a piece exceeds the chunk size.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// One extracted fragment plus its provenance metadata.
///
/// Metadata always carries `source_file`; the caller layers on store
/// ownership fields (`is_temporary`, `doc_index`) when indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub text: String,
    pub metadata: serde_json::Value,
}

/// Extensions accepted as UTF-8 text documents.
const TEXT_EXTENSIONS: [&str; 6] = ["txt", "md", "markdown", "text", "rst", "csv"];

pub fn is_supported_extension(filename: &str) -> bool {
    filename
        .rsplit('.')
        .next()
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode `raw` and split it into overlapping chunks.
///
/// Returns an empty Vec for a document with no extractable content; the
/// caller decides whether that is an `EmptyDocument` rejection. Unknown or
/// non-UTF-8 input fails with `UnsupportedFormat`.
pub fn extract_and_split(
    raw: &[u8],
    filename: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<DocumentChunk>, IngestError> {
    if !is_supported_extension(filename) {
        return Err(IngestError::UnsupportedFormat {
            filename: filename.to_string(),
        });
    }

    let text = std::str::from_utf8(raw).map_err(|_| IngestError::UnsupportedFormat {
        filename: filename.to_string(),
    })?;

    if chunk_size == 0 {
        return Err(IngestError::ExtractionError(
            "chunk_size must be greater than 0".to_string(),
        ));
    }

    let pieces = split_text(text, chunk_size, chunk_overlap.min(chunk_size / 2));

    Ok(pieces
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| DocumentChunk {
            text: p,
            metadata: json!({ "source_file": filename }),
        })
        .collect())
}

/// Recursive-separator split with overlap.
///
/// Splits on the coarsest separator that brings every piece under
/// `chunk_size`, falling back to a character split, then re-joins adjacent
/// small pieces and carries `overlap` characters of trailing context into
/// each following chunk.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.chars().count() <= chunk_size {
        return vec![trimmed.to_string()];
    }

    let atoms = atomize(trimmed, chunk_size, 0);

    // Greedily pack atoms into chunks, seeding each chunk after the first
    // with the tail of its predecessor.
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    for atom in atoms {
        let candidate_len = if current.is_empty() {
            atom.chars().count()
        } else {
            current.chars().count() + 1 + atom.chars().count()
        };

        if candidate_len > chunk_size && !current.is_empty() {
            let tail = char_tail(&current, overlap);
            chunks.push(std::mem::take(&mut current));
            current = tail;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&atom);
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }

    chunks.into_iter().map(|c| c.trim().to_string()).collect()
}

/// Break text into pieces no longer than `chunk_size`, preferring coarse
/// separators.
fn atomize(text: &str, chunk_size: usize, separator_level: usize) -> Vec<String> {
    if text.chars().count() <= chunk_size {
        return vec![text.to_string()];
    }

    if separator_level >= SEPARATORS.len() {
        // Character-level fallback for a single oversized token.
        let chars: Vec<char> = text.chars().collect();
        return chars
            .chunks(chunk_size)
            .map(|c| c.iter().collect())
            .collect();
    }

    let separator = SEPARATORS[separator_level];
    let mut atoms = Vec::new();
    for piece in text.split(separator) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        if piece.chars().count() > chunk_size {
            atoms.extend(atomize(piece, chunk_size, separator_level + 1));
        } else {
            atoms.push(piece.to_string());
        }
    }
    atoms
}

fn char_tail(s: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let chars: Vec<char> = s.chars().collect();
    let start = chars.len().saturating_sub(n);
    // Back up to a word boundary so overlap text stays readable.
    let tail: String = chars[start..].iter().collect();
    match tail.find(' ') {
        Some(pos) => tail[pos + 1..].to_string(),
        None => tail,
    }
}
