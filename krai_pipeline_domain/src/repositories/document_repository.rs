// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Document Repository Port

use crate::entities::document::{Document, DocumentType};
use crate::error::PipelineError;
use crate::value_objects::ids::{DocumentId, ManufacturerId};
use crate::value_objects::stage::{StageName, StageStatus};
use async_trait::async_trait;
use std::collections::BTreeSet;

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Idempotent create: if a document with the same `file_hash` already
    /// exists, returns its existing id rather than inserting a new row.
    async fn upsert(&self, document: &Document) -> Result<DocumentId, PipelineError>;

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, PipelineError>;

    async fn find_by_file_hash(&self, file_hash: &str) -> Result<Option<Document>, PipelineError>;

    /// Merges a single stage's status into the document's `stage_status`
    /// map without touching other stages (`merge_stage_status` semantics).
    async fn update_stage_status(&self, id: DocumentId, stage: StageName, status: StageStatus) -> Result<(), PipelineError>;

    /// Persists the Classification stage's findings onto the document row.
    #[allow(clippy::too_many_arguments)]
    async fn update_classification(
        &self,
        id: DocumentId,
        document_type: DocumentType,
        manufacturer_id: Option<ManufacturerId>,
        series: Option<String>,
        models: BTreeSet<String>,
    ) -> Result<(), PipelineError>;

    async fn mark_failed(&self, id: DocumentId, error_message: String) -> Result<(), PipelineError>;

    /// Documents whose `processing_status` is not yet `completed` or
    /// `failed`, for resumption after a crash or restart.
    async fn find_incomplete(&self) -> Result<Vec<Document>, PipelineError>;
}
