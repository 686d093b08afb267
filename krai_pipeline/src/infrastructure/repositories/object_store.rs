// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Filesystem Object Store
//!
//! Backs [`ObjectStore`] with a plain directory tree rooted at `base_dir`;
//! `path` (e.g. `images/de/deadbeef....png`, from
//! [`image_storage_path`](krai_pipeline_domain::repositories::object_store::image_storage_path))
//! is joined onto it verbatim.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::ErrorKind;

use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::repositories::object_store::ObjectStore;

pub struct FilesystemObjectStore {
    base_dir: PathBuf,
}

impl FilesystemObjectStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }

    #[cfg(test)]
    fn base_dir_for_test(&self) -> &Path {
        &self.base_dir
    }
}

fn io_err(e: std::io::Error) -> PipelineError {
    PipelineError::transient("object_store", e.to_string())
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), PipelineError> {
        let full_path = self.resolve(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        if fs::metadata(&full_path).await.is_ok() {
            return Ok(());
        }

        fs::write(&full_path, bytes).await.map_err(io_err)
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, PipelineError> {
        match fs::read(self.resolve(path)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(e)),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, PipelineError> {
        Ok(fs::metadata(self.resolve(path)).await.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krai_pipeline_domain::repositories::object_store::image_storage_path;

    fn store() -> (FilesystemObjectStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (FilesystemObjectStore::new(dir.path()), dir)
    }

    #[tokio::test]
    async fn test_put_then_get_roundtrips() {
        let (store, _dir) = store();
        let path = image_storage_path(&"a".repeat(64));
        store.put(&path, b"png-bytes".to_vec()).await.unwrap();

        let bytes = store.get(&path).await.unwrap().unwrap();
        assert_eq!(bytes, b"png-bytes");
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (store, _dir) = store();
        assert!(store.get("images/zz/missing.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_put_of_same_path_is_a_noop() {
        let (store, _dir) = store();
        let path = image_storage_path(&"b".repeat(64));
        store.put(&path, b"first".to_vec()).await.unwrap();
        store.put(&path, b"second".to_vec()).await.unwrap();

        let bytes = store.get(&path).await.unwrap().unwrap();
        assert_eq!(bytes, b"first");
    }

    #[tokio::test]
    async fn test_exists_reflects_put() {
        let (store, _dir) = store();
        let path = image_storage_path(&"c".repeat(64));
        assert!(!store.exists(&path).await.unwrap());
        store.put(&path, b"data".to_vec()).await.unwrap();
        assert!(store.exists(&path).await.unwrap());
    }

    #[test]
    fn test_base_dir_is_stored_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemObjectStore::new(dir.path());
        assert_eq!(store.base_dir_for_test(), dir.path());
    }
}
