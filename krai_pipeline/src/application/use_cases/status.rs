// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Status Use Case
//!
//! Backs the `status` CLI command: a read-only lookup of one document's
//! processing state and per-stage progress.

use std::sync::Arc;

use krai_pipeline_domain::entities::document::{Document, ProcessingStatus};
use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::repositories::document_repository::DocumentRepository;
use krai_pipeline_domain::value_objects::ids::DocumentId;
use krai_pipeline_domain::value_objects::stage::StageStatusMap;

/// The subset of `Document` the CLI's `status` command reports.
#[derive(Debug, Clone)]
pub struct DocumentStatusReport {
    pub document_id: DocumentId,
    pub filename: String,
    pub processing_status: ProcessingStatus,
    pub stage_status: StageStatusMap,
    pub error_message: Option<String>,
}

impl From<Document> for DocumentStatusReport {
    fn from(document: Document) -> Self {
        Self {
            document_id: document.id,
            filename: document.filename,
            processing_status: document.processing_status,
            stage_status: document.stage_status,
            error_message: document.error_message,
        }
    }
}

pub struct StatusUseCase {
    documents: Arc<dyn DocumentRepository>,
}

impl StatusUseCase {
    pub fn new(documents: Arc<dyn DocumentRepository>) -> Self {
        Self { documents }
    }

    pub async fn execute(&self, document_id: DocumentId) -> Result<Option<DocumentStatusReport>, PipelineError> {
        Ok(self.documents.find_by_id(document_id).await?.map(DocumentStatusReport::from))
    }
}
