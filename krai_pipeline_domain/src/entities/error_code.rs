// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Error Code Entity
//!
//! An error/fault code extracted from a service manual by the Classification
//! & Entity Resolution stage, via regex, an LLM pass, or a vendor pattern
//! table (see `extraction_method`).

use crate::error::PipelineError;
use crate::value_objects::ids::{ChunkId, DocumentId, ErrorCodeId, ManufacturerId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Regex,
    Llm,
    PatternTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// A single occurrence of an error code on a page of a document.
///
/// Named `ErrorCodeRecord` (not `ErrorCode`) to avoid colliding with
/// [`PipelineError`], which is the crate's unrelated Rust error type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorCodeRecord {
    pub id: ErrorCodeId,
    pub document_id: DocumentId,
    pub manufacturer_id: ManufacturerId,
    pub error_code: String,
    pub error_description: String,
    pub solution_text: Option<String>,
    pub page_number: u32,
    pub confidence: f32,
    pub severity: Option<Severity>,
    pub extraction_method: ExtractionMethod,
    pub chunk_id: Option<ChunkId>,
}

impl ErrorCodeRecord {
    pub fn new(
        document_id: DocumentId,
        manufacturer_id: ManufacturerId,
        error_code: String,
        error_description: String,
        page_number: u32,
        confidence: f32,
        extraction_method: ExtractionMethod,
    ) -> Result<Self, PipelineError> {
        if error_code.trim().is_empty() {
            return Err(PipelineError::validation("error_code must not be empty"));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(PipelineError::validation(format!("confidence must be in [0, 1], got {confidence}")));
        }

        Ok(Self {
            id: ErrorCodeId::new(),
            document_id,
            manufacturer_id,
            error_code,
            error_description,
            solution_text: None,
            page_number,
            confidence,
            severity: None,
            extraction_method,
            chunk_id: None,
        })
    }

    /// Associates this error code occurrence with the chunk it was extracted
    /// from. Callers are responsible for checking the chunk belongs to the
    /// same `document_id`; entities cannot see other aggregates to enforce
    /// this themselves.
    pub fn with_chunk(mut self, chunk_id: ChunkId) -> Self {
        self.chunk_id = Some(chunk_id);
        self
    }

    pub fn with_solution(mut self, solution_text: String, severity: Severity) -> Self {
        self.solution_text = Some(solution_text);
        self.severity = Some(severity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make() -> ErrorCodeRecord {
        ErrorCodeRecord::new(
            DocumentId::new(),
            ManufacturerId::new(),
            "13.20.01".into(),
            "Paper jam in fuser".into(),
            42,
            0.92,
            ExtractionMethod::Regex,
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_empty_code() {
        let result = ErrorCodeRecord::new(
            DocumentId::new(),
            ManufacturerId::new(),
            "".into(),
            "desc".into(),
            1,
            0.5,
            ExtractionMethod::Llm,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_out_of_range_confidence() {
        let result = ErrorCodeRecord::new(
            DocumentId::new(),
            ManufacturerId::new(),
            "E01".into(),
            "desc".into(),
            1,
            1.1,
            ExtractionMethod::Llm,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_starts_without_chunk_or_solution() {
        let ec = make();
        assert!(ec.chunk_id.is_none());
        assert!(ec.solution_text.is_none());
        let ec = ec.with_chunk(ChunkId::new()).with_solution("Replace fuser".into(), Severity::Critical);
        assert!(ec.chunk_id.is_some());
        assert_eq!(ec.severity, Some(Severity::Critical));
    }
}
