// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Scrape Client Port
//!
//! Backs [`LinkEnrichment`](crate::entities::LinkEnrichment): fetches a
//! document-referenced URL's content for search enrichment. `backend`
//! identifies which scraping implementation served the request (plain
//! HTTP fetch vs. a headless-browser fallback), carried through to
//! `scraped_metadata.backend`.

use crate::error::PipelineError;
use async_trait::async_trait;

pub struct ScrapedPage {
    pub content: String,
    pub content_hash: String,
    pub backend: &'static str,
}

#[async_trait]
pub trait ScrapeClient: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, PipelineError>;
}
