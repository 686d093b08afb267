// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Video Entity
//!
//! A video reference found in a document (e.g. a linked repair walkthrough),
//! document-scoped and deduplicated by its canonicalized URL.

use crate::error::PipelineError;
use crate::value_objects::ids::{DocumentId, VideoId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
    pub document_id: DocumentId,
    /// Canonicalized URL, the dedup key within a document.
    pub canonical_url: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Canonicalizes a video URL for dedup purposes: lowercases the host,
/// strips a trailing slash, and drops the fragment.
pub fn canonicalize_url(raw: &str) -> String {
    let without_fragment = raw.split('#').next().unwrap_or(raw);
    without_fragment.trim_end_matches('/').to_lowercase()
}

impl Video {
    pub fn new(document_id: DocumentId, url: &str) -> Result<Self, PipelineError> {
        if url.trim().is_empty() {
            return Err(PipelineError::validation("video url must not be empty"));
        }
        Ok(Self {
            id: VideoId::new(),
            document_id,
            canonical_url: canonicalize_url(url),
            title: None,
            description: None,
        })
    }

    pub fn with_title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_url() {
        assert!(Video::new(DocumentId::new(), "").is_err());
    }

    #[test]
    fn test_canonicalize_strips_fragment_and_case() {
        assert_eq!(
            canonicalize_url("HTTPS://Example.com/watch/#t=30"),
            "https://example.com/watch"
        );
    }

    #[test]
    fn test_same_url_up_to_case_produces_same_canonical_form() {
        let a = Video::new(DocumentId::new(), "https://example.com/v1").unwrap();
        let b = Video::new(DocumentId::new(), "HTTPS://EXAMPLE.COM/v1/").unwrap();
        assert_eq!(a.canonical_url, b.canonical_url);
    }
}
