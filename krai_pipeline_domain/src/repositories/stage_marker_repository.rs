// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Completion Marker Repository Port

use crate::entities::stage_completion_marker::StageCompletionMarker;
use crate::error::PipelineError;
use crate::value_objects::ids::DocumentId;
use crate::value_objects::stage::StageName;
use async_trait::async_trait;

#[async_trait]
pub trait StageMarkerRepository: Send + Sync {
    async fn upsert(&self, marker: StageCompletionMarker) -> Result<(), PipelineError>;

    async fn find(&self, document_id: DocumentId, stage_name: StageName) -> Result<Option<StageCompletionMarker>, PipelineError>;
}
