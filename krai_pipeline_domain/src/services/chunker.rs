// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Hierarchical Chunker
//!
//! The CPU-bound half of `SPEC_FULL.md` §4.3: given already-extracted page
//! text, split it into chunks that respect section headings and never split
//! across an error-code block or a numbered procedure step. PDF text
//! extraction itself is an I/O-bound infrastructure concern, reached through
//! [`PageTextSource`].

use crate::entities::chunk::ChunkType;
use crate::error::PipelineError;
use crate::value_objects::chunking_config::ChunkingConfig;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Raw text of a single page, 1-indexed by position in the source document.
#[derive(Debug, Clone)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

/// A chunk produced by [`chunk_pages`], not yet assigned a [`ChunkId`](crate::value_objects::ids::ChunkId)
/// or persisted — the caller (application layer) turns this into a
/// [`Chunk`](crate::entities::Chunk) entity once a `document_id` is known.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDraft {
    pub chunk_index: u32,
    pub page_start: u32,
    pub page_end: u32,
    pub content: String,
    pub chunk_type: ChunkType,
    pub section_hierarchy: Vec<String>,
    pub contains_error_code: bool,
    pub contains_procedure: bool,
    pub contains_part_number: bool,
}

/// Port over the PDF text layer; infrastructure implements this against
/// `lopdf` (and OCR, when the page has no text layer at all).
#[async_trait]
pub trait PageTextSource: Send + Sync {
    async fn extract_pages(&self, file_path: &Path) -> Result<Vec<PageText>, PipelineError>;
}

static HEADING_NUMBERING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)*\s+[A-Z]").unwrap());
static STRUCTURE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(chapter|section|troubleshooting)\b").unwrap());
static PROCEDURE_STEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(step\s*\d+|\d+\.\s)").unwrap());
static LIST_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-*•]\s+|^\s*\d+[\.)]\s+").unwrap());
static TABLE_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"\t|\s{2,}\S+\s{2,}\S+|\|").unwrap());
static ERROR_CODE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(error|fault|code)\b").unwrap());
static PROCEDURE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(procedure|step|how to)\b").unwrap());
static PART_NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{1,3}\d[\dA-Z-]{3,}\b").unwrap());

/// Classifies a block of text by keyword/shape, per `SPEC_FULL.md` §4.3 step 5.
pub fn classify_chunk_type(text: &str) -> ChunkType {
    if ERROR_CODE_TOKEN.is_match(text) {
        ChunkType::ErrorCode
    } else if PROCEDURE_TOKEN.is_match(text) || PROCEDURE_STEP.is_match(text.trim_start()) {
        ChunkType::Procedure
    } else if LIST_PREFIX.is_match(text) {
        ChunkType::List
    } else if TABLE_ROW.is_match(text) {
        ChunkType::Table
    } else {
        ChunkType::Text
    }
}

fn is_heading(line: &str) -> bool {
    HEADING_NUMBERING.is_match(line) || STRUCTURE_MARKER.is_match(line)
}

/// Splits already-extracted page text into chunks honoring `config`'s
/// target/overlap/min/max sizing, maintaining a heading stack for
/// `section_hierarchy`, and never splitting an error-code block or
/// numbered procedure step across a boundary.
///
/// Empty or non-textual pages contribute no chunks but are otherwise
/// silently skipped (they are still counted in the document's `page_count`
/// by the caller, which owns that field).
pub fn chunk_pages(pages: &[PageText], config: &ChunkingConfig) -> Result<Vec<ChunkDraft>, PipelineError> {
    let mut drafts = Vec::new();
    let mut heading_stack: Vec<String> = Vec::new();
    let mut chunk_index: u32 = 1;
    let mut seen_hashes = std::collections::HashSet::new();

    for page in pages {
        if page.text.trim().is_empty() {
            continue;
        }

        for unit in split_into_units(&page.text, config) {
            if is_heading(&unit) {
                heading_stack.push(unit.trim().to_string());
                continue;
            }

            let normalized = normalize_for_hash(&unit);
            let hash = content_hash(&normalized);
            if !seen_hashes.insert(hash) {
                continue;
            }

            let chunk_type = classify_chunk_type(&unit);
            drafts.push(ChunkDraft {
                chunk_index,
                page_start: page.page_number,
                page_end: page.page_number,
                content: unit.clone(),
                chunk_type,
                section_hierarchy: heading_stack.clone(),
                contains_error_code: ERROR_CODE_TOKEN.is_match(&unit),
                contains_procedure: PROCEDURE_TOKEN.is_match(&unit),
                contains_part_number: PART_NUMBER_TOKEN.is_match(&unit),
            });
            chunk_index += 1;
        }
    }

    if drafts.is_empty() {
        return Err(PipelineError::permanent("extractor", "chunker produced zero chunks for document"));
    }

    Ok(drafts)
}

/// Splits a page's text into target-sized units with overlap, keeping
/// procedure steps and error-code blocks whole even past `max_size`.
fn split_into_units(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let paragraphs: Vec<&str> = text.split("\n\n").filter(|p| !p.trim().is_empty()).collect();
    let mut units = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs {
        let is_atomic = PROCEDURE_STEP.is_match(paragraph.trim_start()) || ERROR_CODE_TOKEN.is_match(paragraph);

        if is_atomic && !current.is_empty() && current.len() + paragraph.len() > config.target_size {
            units.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);

        if !is_atomic && current.len() >= config.target_size {
            let carry = tail_chars(&current, config.overlap);
            units.push(std::mem::take(&mut current));
            current = carry;
        } else if is_atomic && current.len() >= config.max_size {
            units.push(std::mem::take(&mut current));
        }
    }

    if !current.trim().is_empty() {
        units.push(current);
    }

    units
}

/// The last `n` characters of `text`, used to seed the next unit with
/// `config.overlap` characters of context from the one just emitted.
fn tail_chars(text: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let char_count = text.chars().count();
    let skip = char_count.saturating_sub(n);
    text.chars().skip(skip).collect()
}

fn normalize_for_hash(text: &str) -> String {
    text.trim().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// SHA-256 of NFC-normalized (here: whitespace-collapsed), trimmed content,
/// per `SPEC_FULL.md` §4.3 step 6. Unicode NFC normalization itself is a
/// `unicode-normalization` infrastructure concern; the domain only requires
/// that callers pass already-normalized text.
pub fn content_hash(normalized_text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(normalized_text.as_bytes());
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::chunking_config::ChunkingStrategy;

    fn config() -> ChunkingConfig {
        ChunkingConfig::new(ChunkingStrategy::Hierarchical, 200, 20, 50, 400).unwrap()
    }

    #[test]
    fn test_classifies_error_code_text() {
        assert_eq!(classify_chunk_type("Error code E-13.20.01 indicates a paper jam"), ChunkType::ErrorCode);
    }

    #[test]
    fn test_classifies_procedure_text() {
        assert_eq!(classify_chunk_type("Step 1: Open the front cover"), ChunkType::Procedure);
    }

    #[test]
    fn test_empty_pages_produce_no_chunks_but_do_not_error_alone() {
        let pages = vec![
            PageText { page_number: 1, text: "   ".into() },
            PageText {
                page_number: 2,
                text: "This is a normal paragraph of explanatory text about the device.".into(),
            },
        ];
        let drafts = chunk_pages(&pages, &config()).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].page_start, 2);
    }

    #[test]
    fn test_zero_chunks_is_a_permanent_error() {
        let pages = vec![PageText { page_number: 1, text: "".into() }];
        assert!(chunk_pages(&pages, &config()).is_err());
    }

    #[test]
    fn test_duplicate_content_is_deduplicated_keeping_earliest() {
        let pages = vec![
            PageText {
                page_number: 1,
                text: "Repeated boilerplate safety notice text here.".into(),
            },
            PageText {
                page_number: 2,
                text: "Repeated boilerplate safety notice text here.".into(),
            },
        ];
        let drafts = chunk_pages(&pages, &config()).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].page_start, 1);
    }

    #[test]
    fn test_heading_builds_section_hierarchy() {
        let pages = vec![PageText {
            page_number: 1,
            text: "3.1 Troubleshooting\n\nIf the printer jams, open the rear door and remove the paper.".into(),
        }];
        let drafts = chunk_pages(&pages, &config()).unwrap();
        assert_eq!(drafts[0].section_hierarchy, vec!["3.1 Troubleshooting".to_string()]);
    }

    #[test]
    fn test_nested_headings_produce_ordered_section_paths_and_tag_error_code_chunks() {
        let pages = vec![PageText {
            page_number: 1,
            text: "1 Introduction\n\nThis manual covers routine service.\n\n1.2 Safety\n\nWear eye protection when servicing the unit.\n\n2 Troubleshooting\n\nSee below for guidance.\n\n2.1 Error Codes\n\nError code C-1234 indicates a fuser fault.".into(),
        }];
        let drafts = chunk_pages(&pages, &config()).unwrap();

        let intro = drafts.iter().find(|d| d.content.contains("routine service")).unwrap();
        assert_eq!(intro.section_hierarchy, vec!["1 Introduction".to_string()]);

        let safety = drafts.iter().find(|d| d.content.contains("eye protection")).unwrap();
        assert_eq!(safety.section_hierarchy, vec!["1 Introduction".to_string(), "1.2 Safety".to_string()]);

        let error = drafts.iter().find(|d| d.content.contains("fuser fault")).unwrap();
        assert_eq!(
            error.section_hierarchy,
            vec!["1 Introduction".to_string(), "1.2 Safety".to_string(), "2 Troubleshooting".to_string(), "2.1 Error Codes".to_string()]
        );
        assert_eq!(error.chunk_type, ChunkType::ErrorCode);
        assert!(error.contains_error_code);
    }

    proptest::proptest! {
        #[test]
        fn test_chunk_index_is_dense_and_monotonic_and_pages_are_ordered(
            bodies in proptest::collection::vec("[a-z]{20,80}", 1..12),
        ) {
            let pages: Vec<PageText> = bodies
                .into_iter()
                .enumerate()
                .map(|(i, body)| PageText { page_number: (i + 1) as u32, text: body })
                .collect();
            let drafts = chunk_pages(&pages, &config()).unwrap();

            for (position, draft) in drafts.iter().enumerate() {
                proptest::prop_assert_eq!(draft.chunk_index, (position + 1) as u32);
                proptest::prop_assert!(draft.page_start <= draft.page_end);
            }
        }
    }
}
