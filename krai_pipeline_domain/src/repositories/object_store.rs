// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Object Store Port
//!
//! Content-addressed blob storage for page images, per `SPEC_FULL.md` §4.4:
//! `images/<first2>/<hash>.png`. Writes are idempotent because the path is
//! a pure function of the hash.

use crate::error::PipelineError;
use async_trait::async_trait;

/// The content-addressed path for an image's canonical PNG bytes.
pub fn image_storage_path(file_hash: &str) -> String {
    let prefix = &file_hash[..file_hash.len().min(2)];
    format!("images/{prefix}/{file_hash}.png")
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `bytes` at `path` if not already present; a second write of
    /// identical bytes at the same path is a no-op, not an error.
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), PipelineError>;

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, PipelineError>;

    async fn exists(&self, path: &str) -> Result<bool, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_path_is_content_addressed() {
        let path = image_storage_path("deadbeef00112233");
        assert_eq!(path, "images/de/deadbeef00112233.png");
    }

    #[test]
    fn test_short_hash_does_not_panic() {
        let path = image_storage_path("a");
        assert_eq!(path, "images/a/a.png");
    }
}
