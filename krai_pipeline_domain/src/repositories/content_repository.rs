// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Content Repository Ports
//!
//! Covers the per-document content entities whose write contract is
//! "create once, read many": chunks, images, embeddings, links, videos and
//! parts. Grouped into one file because every port here is small and
//! shares the same `(document_id, ...)` scoping shape.

use crate::entities::chunk::Chunk;
use crate::entities::embedding::Embedding;
use crate::entities::image::Image;
use crate::entities::link::LinkEnrichment;
use crate::entities::part::Part;
use crate::entities::video::Video;
use crate::error::PipelineError;
use crate::value_objects::ids::{ChunkId, DocumentId, ImageId, LinkId, PartId, VideoId};
use async_trait::async_trait;

#[async_trait]
pub trait ChunkRepository: Send + Sync {
    async fn insert_all(&self, chunks: &[Chunk]) -> Result<(), PipelineError>;
    async fn find_by_document(&self, document_id: DocumentId) -> Result<Vec<Chunk>, PipelineError>;
    async fn find_by_id(&self, id: ChunkId) -> Result<Option<Chunk>, PipelineError>;
}

#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Upsert keyed by `file_hash`; a per-document row is only created when
    /// `(document_id, image_index)` is new (`SPEC_FULL.md` §4.4).
    async fn upsert(&self, image: &Image) -> Result<ImageId, PipelineError>;
    async fn find_by_document(&self, document_id: DocumentId) -> Result<Vec<Image>, PipelineError>;
    async fn find_by_hash(&self, file_hash: &str) -> Result<Option<Image>, PipelineError>;
}

#[async_trait]
pub trait EmbeddingRepository: Send + Sync {
    /// Upsert keyed by `chunk_id` (one embedding per chunk).
    async fn upsert(&self, embedding: &Embedding) -> Result<(), PipelineError>;

    /// Top-K nearest neighbors by cosine similarity within the given
    /// embedding model, for the multimodal search assembly in §4.7.
    async fn search(&self, query_vector: &[f32], model_name: &str, top_k: usize) -> Result<Vec<(ChunkId, f32)>, PipelineError>;
}

#[async_trait]
pub trait LinkRepository: Send + Sync {
    async fn upsert(&self, link: &LinkEnrichment) -> Result<LinkId, PipelineError>;
    async fn find_pending(&self, document_id: DocumentId) -> Result<Vec<LinkEnrichment>, PipelineError>;
}

#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn upsert(&self, video: &Video) -> Result<VideoId, PipelineError>;
    async fn find_by_document(&self, document_id: DocumentId) -> Result<Vec<Video>, PipelineError>;
}

#[async_trait]
pub trait PartRepository: Send + Sync {
    async fn upsert(&self, part: &Part) -> Result<PartId, PipelineError>;
    async fn find_by_document(&self, document_id: DocumentId) -> Result<Vec<Part>, PipelineError>;
}
