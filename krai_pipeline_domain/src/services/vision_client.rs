// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Vision & OCR Client Ports
//!
//! `SPEC_FULL.md` §4.4 step 5: "Invoke Vision Client to produce
//! `ai_description` + `ai_confidence`; invoke OCR (optional, config-gated)
//! to produce `ocr_text`." Two ports because OCR is config-gated
//! independently of captioning.

use crate::error::PipelineError;
use async_trait::async_trait;

/// A vision model's caption for one image, with its confidence.
pub struct VisionDescription {
    pub description: String,
    pub confidence: f32,
}

#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn describe_image(&self, png_bytes: &[u8]) -> Result<VisionDescription, PipelineError>;
}

#[async_trait]
pub trait OcrClient: Send + Sync {
    /// Returns `None` when the image contains no recognizable text, which
    /// is not an error.
    async fn extract_text(&self, png_bytes: &[u8]) -> Result<Option<String>, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubVision;

    #[async_trait]
    impl VisionClient for StubVision {
        async fn describe_image(&self, _png_bytes: &[u8]) -> Result<VisionDescription, PipelineError> {
            Ok(VisionDescription {
                description: "a fuser assembly diagram".into(),
                confidence: 0.87,
            })
        }
    }

    #[test]
    fn test_describe_image_returns_confidence_in_range() {
        futures::executor::block_on(async {
            let result = StubVision.describe_image(&[]).await.unwrap();
            assert!((0.0..=1.0).contains(&result.confidence));
        });
    }
}
