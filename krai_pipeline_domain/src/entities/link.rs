// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Link Enrichment Entity
//!
//! A URL found in a document, plus the record of scraping it for enrichment
//! content. Scraping is best-effort: `scrape_status` tracks it independently
//! of document-level `processing_status`.

use crate::error::PipelineError;
use crate::value_objects::ids::{DocumentId, LinkId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapedMetadata {
    pub backend: Option<String>,
    pub retry_count: u32,
    pub timestamps: BTreeMap<String, DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEnrichment {
    pub id: LinkId,
    pub document_id: DocumentId,
    pub url: String,
    pub scrape_status: ScrapeStatus,
    pub scraped_content: Option<String>,
    pub content_hash: Option<String>,
    pub scraped_metadata: ScrapedMetadata,
    pub scraped_at: Option<DateTime<Utc>>,
}

impl LinkEnrichment {
    pub fn new(document_id: DocumentId, url: String) -> Result<Self, PipelineError> {
        if url.trim().is_empty() {
            return Err(PipelineError::validation("link url must not be empty"));
        }
        Ok(Self {
            id: LinkId::new(),
            document_id,
            url,
            scrape_status: ScrapeStatus::Pending,
            scraped_content: None,
            content_hash: None,
            scraped_metadata: ScrapedMetadata::default(),
            scraped_at: None,
        })
    }

    pub fn mark_succeeded(&mut self, content: String, content_hash: String, backend: &str) {
        self.scraped_content = Some(content);
        self.content_hash = Some(content_hash);
        self.scraped_metadata.backend = Some(backend.to_string());
        self.scrape_status = ScrapeStatus::Success;
        self.scraped_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, backend: &str) {
        self.scraped_metadata.retry_count += 1;
        self.scraped_metadata.backend = Some(backend.to_string());
        self.scrape_status = ScrapeStatus::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_url() {
        assert!(LinkEnrichment::new(DocumentId::new(), "".into()).is_err());
    }

    #[test]
    fn test_starts_pending() {
        let link = LinkEnrichment::new(DocumentId::new(), "https://example.com/faq".into()).unwrap();
        assert_eq!(link.scrape_status, ScrapeStatus::Pending);
        assert!(link.scraped_at.is_none());
    }

    #[test]
    fn test_mark_failed_increments_retry_count() {
        let mut link = LinkEnrichment::new(DocumentId::new(), "https://example.com".into()).unwrap();
        link.mark_failed("playwright");
        link.mark_failed("playwright");
        assert_eq!(link.scrape_status, ScrapeStatus::Failed);
        assert_eq!(link.scraped_metadata.retry_count, 2);
    }
}
