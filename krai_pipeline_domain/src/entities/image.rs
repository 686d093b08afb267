// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Image Entity
//!
//! Created by Image Processing; `ai_description` and `chunk_id` are filled
//! in later by the same stage (vision call) or by Embedding (nearest-chunk
//! association).

use crate::error::PipelineError;
use crate::value_objects::ids::{ChunkId, DocumentId, ImageId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    Diagram,
    Photo,
    VectorGraphic,
    PngConversion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub document_id: DocumentId,
    pub page_number: u32,
    pub image_index: u32,
    /// SHA-256 of the canonical PNG bytes; globally unique (dedupes identical
    /// images across different documents).
    pub file_hash: String,
    pub storage_path: String,
    pub width_px: u32,
    pub height_px: u32,
    pub image_format: String,
    pub image_type: ImageType,
    pub ai_description: Option<String>,
    pub ai_confidence: Option<f32>,
    pub ocr_text: Option<String>,
    pub chunk_id: Option<ChunkId>,
}

impl Image {
    pub fn new(
        document_id: DocumentId,
        page_number: u32,
        image_index: u32,
        file_hash: String,
        storage_path: String,
        width_px: u32,
        height_px: u32,
        image_format: String,
        image_type: ImageType,
    ) -> Self {
        Self {
            id: ImageId::new(),
            document_id,
            page_number,
            image_index,
            file_hash,
            storage_path,
            width_px,
            height_px,
            image_format,
            image_type,
            ai_description: None,
            ai_confidence: None,
            ocr_text: None,
            chunk_id: None,
        }
    }

    pub fn with_vision_result(mut self, description: String, confidence: f32) -> Result<Self, PipelineError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(PipelineError::validation(format!(
                "ai_confidence must be in [0, 1], got {confidence}"
            )));
        }
        self.ai_description = Some(description);
        self.ai_confidence = Some(confidence);
        Ok(self)
    }
}
