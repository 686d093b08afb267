// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Dedup Index Port
//!
//! `SPEC_FULL.md` §4.4: "Consult the Dedup Index: if an image with the same
//! hash already exists, reuse its `storage_path` and row." The index is the
//! single authority callers defer to before ever inserting a row or blob —
//! stages never assume an insert will succeed as a fresh row.

use crate::error::PipelineError;
use crate::value_objects::ids::{ChunkId, DocumentId, ImageId};
use async_trait::async_trait;

#[async_trait]
pub trait DedupIndex: Send + Sync {
    /// Looks up an existing image row by the content hash of its canonical
    /// PNG bytes; the hash is globally unique, not scoped to a document.
    async fn find_image_by_hash(&self, file_hash: &str) -> Result<Option<ImageId>, PipelineError>;

    /// Looks up an existing chunk by its normalized-content hash, scoped to
    /// one document (`content_hash` is unique per-document, not globally).
    async fn find_chunk_by_hash(&self, document_id: DocumentId, content_hash: &str) -> Result<Option<ChunkId>, PipelineError>;

    /// Looks up an existing document by the hash of its raw bytes, the
    /// idempotent-upload key (`SPEC_FULL.md` §3 Document invariants).
    async fn find_document_by_hash(&self, file_hash: &str) -> Result<Option<DocumentId>, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryDedupIndex {
        images: Mutex<HashMap<String, ImageId>>,
    }

    #[async_trait]
    impl DedupIndex for InMemoryDedupIndex {
        async fn find_image_by_hash(&self, file_hash: &str) -> Result<Option<ImageId>, PipelineError> {
            Ok(self.images.lock().unwrap().get(file_hash).copied())
        }

        async fn find_chunk_by_hash(&self, _document_id: DocumentId, _content_hash: &str) -> Result<Option<ChunkId>, PipelineError> {
            Ok(None)
        }

        async fn find_document_by_hash(&self, _file_hash: &str) -> Result<Option<DocumentId>, PipelineError> {
            Ok(None)
        }
    }

    #[test]
    fn test_miss_then_hit_after_insert() {
        futures::executor::block_on(async {
            let index = InMemoryDedupIndex::default();
            assert!(index.find_image_by_hash("abc").await.unwrap().is_none());
            let id = ImageId::new();
            index.images.lock().unwrap().insert("abc".to_string(), id);
            assert_eq!(index.find_image_by_hash("abc").await.unwrap(), Some(id));
        });
    }
}
