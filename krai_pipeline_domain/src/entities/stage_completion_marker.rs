// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Completion Marker Entity
//!
//! The idempotency fence every stage write goes through: before starting,
//! the orchestrator checks for a marker keyed by `(document_id, stage_name)`
//! whose `data_hash` matches the current inputs, and skips re-execution if so.

use crate::value_objects::ids::DocumentId;
use crate::value_objects::stage::StageName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageCompletionMarker {
    pub document_id: DocumentId,
    pub stage_name: StageName,
    pub completed_at: DateTime<Utc>,
    /// Deterministic hash of the inputs the stage consumed; a later marker
    /// check with a different hash means upstream data changed and the stage
    /// must reprocess rather than skip.
    pub data_hash: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl StageCompletionMarker {
    pub fn new(document_id: DocumentId, stage_name: StageName, data_hash: String) -> Self {
        Self {
            document_id,
            stage_name,
            completed_at: Utc::now(),
            data_hash,
            metadata: serde_json::Map::new(),
        }
    }

    /// Whether a stage re-run can be skipped given the marker already on
    /// file and the hash of the inputs about to be consumed.
    pub fn is_fresh_for(&self, current_data_hash: &str) -> bool {
        self.data_hash == current_data_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_marker_matches_same_hash() {
        let marker = StageCompletionMarker::new(DocumentId::new(), StageName::TextExtraction, "abc123".into());
        assert!(marker.is_fresh_for("abc123"));
    }

    #[test]
    fn test_stale_marker_detected_on_hash_change() {
        let marker = StageCompletionMarker::new(DocumentId::new(), StageName::TextExtraction, "abc123".into());
        assert!(!marker.is_fresh_for("def456"));
    }
}
