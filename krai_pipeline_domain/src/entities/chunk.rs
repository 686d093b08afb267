// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Entity
//!
//! A unit of extracted, normalized text produced by the hierarchical
//! chunker. Immutable once created, except that the Embedding stage later
//! attaches a vector via the separate [`Embedding`](crate::entities::Embedding) entity.

use crate::error::PipelineError;
use crate::value_objects::ids::{ChunkId, DocumentId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Text,
    Procedure,
    ErrorCode,
    List,
    Table,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Confidence in `[0, 1]` that `chunk_type` was classified correctly.
    pub confidence: f32,
    pub contains_error_code: bool,
    pub contains_procedure: bool,
    pub contains_part_number: bool,
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub document_id: DocumentId,
    pub chunk_index: u32,
    pub page_start: u32,
    pub page_end: u32,
    pub content: String,
    /// SHA-256 of the normalized `content`, unique within the document.
    pub content_hash: String,
    pub chunk_type: ChunkType,
    pub section_hierarchy: Vec<String>,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(
        document_id: DocumentId,
        chunk_index: u32,
        page_start: u32,
        page_end: u32,
        content: String,
        content_hash: String,
        chunk_type: ChunkType,
        section_hierarchy: Vec<String>,
    ) -> Result<Self, PipelineError> {
        if page_start > page_end {
            return Err(PipelineError::validation(format!(
                "chunk page_start ({page_start}) must be <= page_end ({page_end})"
            )));
        }
        if content.trim().is_empty() {
            return Err(PipelineError::validation("chunk content must not be empty"));
        }

        Ok(Self {
            id: ChunkId::new(),
            document_id,
            chunk_index,
            page_start,
            page_end,
            content,
            content_hash,
            chunk_type,
            section_hierarchy,
            metadata: ChunkMetadata::default(),
        })
    }

    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Result<Self, PipelineError> {
        if !(0.0..=1.0).contains(&metadata.confidence) {
            return Err(PipelineError::validation(format!(
                "chunk confidence must be in [0, 1], got {}",
                metadata.confidence
            )));
        }
        self.metadata = metadata;
        Ok(self)
    }
}
