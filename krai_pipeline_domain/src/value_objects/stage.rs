// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Name, State and Status
//!
//! The eight-stage document pipeline is a closed, ordered list
//! (`StageName::ALL`). `StageStatus` is a tagged record stored as JSON per
//! stage on the `Document`; `merge_stage_status` lets the orchestrator update
//! one stage's record without clobbering the others or dropping unknown keys
//! written by a newer version of this program.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The eight stages of the document ingestion pipeline, in their canonical order.
///
/// Error-code extraction happens exclusively inside `Classification` — it is
/// not a separate stage (see design note in `SPEC_FULL.md` §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Upload,
    TextExtraction,
    TableExtraction,
    ImageProcessing,
    Classification,
    PartsExtraction,
    SeriesDetection,
    EmbeddingAndSearch,
}

impl StageName {
    /// The canonical, fixed processing order.
    pub const ALL: [StageName; 8] = [
        StageName::Upload,
        StageName::TextExtraction,
        StageName::TableExtraction,
        StageName::ImageProcessing,
        StageName::Classification,
        StageName::PartsExtraction,
        StageName::SeriesDetection,
        StageName::EmbeddingAndSearch,
    ];

    /// Position in the canonical order (`Upload` is 0), used to reject a
    /// scheduler request to run a stage whose predecessor hasn't completed.
    pub fn ordinal(self) -> usize {
        Self::ALL.iter().position(|&s| s == self).expect("StageName::ALL is exhaustive")
    }

    pub fn next(self) -> Option<StageName> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageName::Upload => "upload",
            StageName::TextExtraction => "text_extraction",
            StageName::TableExtraction => "table_extraction",
            StageName::ImageProcessing => "image_processing",
            StageName::Classification => "classification",
            StageName::PartsExtraction => "parts_extraction",
            StageName::SeriesDetection => "series_detection",
            StageName::EmbeddingAndSearch => "embedding_and_search",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The lifecycle of a single stage's work on a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A single stage's status record, as stored under `documents.stage_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageStatus {
    pub status: StageState,
    /// 0-100
    pub progress: u8,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl StageStatus {
    pub fn pending() -> Self {
        Self {
            status: StageState::Pending,
            progress: 0,
            started_at: None,
            completed_at: None,
            error: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn started(now: DateTime<Utc>) -> Self {
        Self {
            status: StageState::Processing,
            progress: 0,
            started_at: Some(now),
            completed_at: None,
            error: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn completed(started_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Self {
            status: StageState::Completed,
            progress: 100,
            started_at,
            completed_at: Some(now),
            error: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn failed(started_at: Option<DateTime<Utc>>, now: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            status: StageState::Failed,
            progress: 0,
            started_at,
            completed_at: Some(now),
            error: Some(error.into()),
            metadata: serde_json::Map::new(),
        }
    }
}

/// The full per-document stage status map, keyed by stage name.
pub type StageStatusMap = HashMap<StageName, StageStatus>;

/// Merges a single stage's new status into the document's full status map,
/// leaving every other stage (including stages this build of the program
/// doesn't recognize, decoded into `metadata`) untouched.
pub fn merge_stage_status(existing: &mut StageStatusMap, stage: StageName, new_status: StageStatus) {
    existing.insert(stage, new_status);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_starts_with_upload_ends_with_embedding() {
        assert_eq!(StageName::ALL[0], StageName::Upload);
        assert_eq!(StageName::ALL[7], StageName::EmbeddingAndSearch);
    }

    #[test]
    fn test_next_stage_chain_is_total_and_terminates() {
        let mut current = StageName::Upload;
        let mut count = 1;
        while let Some(next) = current.next() {
            current = next;
            count += 1;
        }
        assert_eq!(count, 8);
        assert_eq!(current, StageName::EmbeddingAndSearch);
    }

    #[test]
    fn test_merge_preserves_other_stages() {
        let mut map = StageStatusMap::new();
        map.insert(StageName::Upload, StageStatus::completed(None, Utc::now()));
        merge_stage_status(&mut map, StageName::TextExtraction, StageStatus::started(Utc::now()));

        assert_eq!(map[&StageName::Upload].status, StageState::Completed);
        assert_eq!(map[&StageName::TextExtraction].status, StageState::Processing);
    }
}
