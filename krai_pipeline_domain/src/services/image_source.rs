// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # PDF Image Source Port
//!
//! The image-extraction half of `SPEC_FULL.md` §4.4, split from
//! [`PageTextSource`](crate::services::chunker::PageTextSource) the same way
//! text extraction and image processing are separate pipeline stages: a
//! document with no extractable images still proceeds through the rest of
//! the pipeline.

use crate::error::PipelineError;
use async_trait::async_trait;
use std::path::Path;

/// A raster image found on (or rendered from) one page, already PNG-encoded.
pub struct PageImage {
    pub page_number: u32,
    pub image_index: u32,
    pub png_bytes: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

#[async_trait]
pub trait PdfImageSource: Send + Sync {
    /// Images already embedded in the PDF's page content streams.
    async fn extract_images(&self, file_path: &Path) -> Result<Vec<PageImage>, PipelineError>;

    /// Rasterizes each page to a PNG at `dpi`, for documents whose content
    /// is vector graphics with no embedded raster images.
    async fn render_pages(&self, file_path: &Path, dpi: u32) -> Result<Vec<PageImage>, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptySource;

    #[async_trait]
    impl PdfImageSource for EmptySource {
        async fn extract_images(&self, _file_path: &Path) -> Result<Vec<PageImage>, PipelineError> {
            Ok(Vec::new())
        }

        async fn render_pages(&self, _file_path: &Path, _dpi: u32) -> Result<Vec<PageImage>, PipelineError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_empty_source_has_no_images() {
        let images = EmptySource.extract_images(Path::new("x.pdf")).await.unwrap();
        assert!(images.is_empty());
    }
}
