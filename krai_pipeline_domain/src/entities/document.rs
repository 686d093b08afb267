// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Document Entity
//!
//! The root entity of the pipeline: one row per ingested file, created by the
//! Upload stage and mutated (never deleted) by every later stage.

use crate::error::PipelineError;
use crate::value_objects::ids::{DocumentId, ManufacturerId};
use crate::value_objects::stage::{StageName, StageState, StageStatusMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    ServiceManual,
    PartsCatalog,
    TroubleshootingGuide,
    UserManual,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A single ingested document and its processing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// Lowercase hex SHA-256 of the raw file bytes; unique, used for idempotent upload.
    pub file_hash: String,
    pub filename: String,
    pub file_size: u64,
    pub page_count: u32,
    pub document_type: DocumentType,
    pub manufacturer_id: Option<ManufacturerId>,
    pub series: Option<String>,
    pub models: BTreeSet<String>,
    pub language: Option<String>,
    pub processing_status: ProcessingStatus,
    pub stage_status: StageStatusMap,
    pub error_message: Option<String>,
}

impl Document {
    /// Creates a new document in `Pending` state with every stage `Pending`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ValidationError`] if `file_hash` is not a
    /// 64-character lowercase hex string (SHA-256).
    pub fn new(file_hash: String, filename: String, file_size: u64, page_count: u32) -> Result<Self, PipelineError> {
        if file_hash.len() != 64 || !file_hash.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
            return Err(PipelineError::validation(format!(
                "file_hash must be a 64-character lowercase hex SHA-256 digest, got '{file_hash}'"
            )));
        }

        let mut stage_status = StageStatusMap::new();
        for stage in StageName::ALL {
            stage_status.insert(stage, crate::value_objects::stage::StageStatus::pending());
        }

        Ok(Self {
            id: DocumentId::new(),
            file_hash,
            filename,
            file_size,
            page_count,
            document_type: DocumentType::Other,
            manufacturer_id: None,
            series: None,
            models: BTreeSet::new(),
            language: None,
            processing_status: ProcessingStatus::Pending,
            stage_status,
            error_message: None,
        })
    }

    /// Whether every stage in the canonical order has completed.
    ///
    /// `processing_status == Completed` must hold exactly when this is true
    /// (`SPEC_FULL.md` §3 invariant); the orchestrator is responsible for
    /// keeping the two in sync, this is the read-side check.
    pub fn all_stages_completed(&self) -> bool {
        StageName::ALL
            .iter()
            .all(|stage| matches!(self.stage_status.get(stage), Some(s) if s.status == StageState::Completed))
    }

    pub fn any_stage_failed(&self) -> bool {
        self.stage_status.values().any(|s| s.status == StageState::Failed)
    }
}
