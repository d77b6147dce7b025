//! Upload storage abstraction.
//!
//! Import jobs carry an opaque `source_location` handle; the storage
//! collaborator that wrote the upload is external to this worker, which only
//! needs to read the bytes back. `LocalFileStore` resolves handles against a
//! shared directory in production, `InMemoryFileStore` backs tests.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

/// Read-only access to uploaded files by opaque handle.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn open(&self, location: &str) -> Result<Vec<u8>>;
}

// =============================================================================
// LocalFileStore — shared directory on disk
// =============================================================================

pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn open(&self, location: &str) -> Result<Vec<u8>> {
        let relative = Path::new(location);
        // Handles come from our own upload path, but refuse traversal anyway.
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            bail!("invalid source location '{}'", location);
        }

        let path = self.root.join(relative);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("cannot read upload '{}'", location))
    }
}

// =============================================================================
// InMemoryFileStore — tests
// =============================================================================

/// Holds uploads in a map for tests.
#[derive(Default)]
pub struct InMemoryFileStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, location: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.lock().unwrap().insert(location.into(), bytes.into());
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn open(&self, location: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(location)
            .cloned()
            .with_context(|| format!("cannot read upload '{}'", location))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemoryFileStore::new();
        store.put("imports/a.csv", b"name,cpf\n".to_vec());
        let bytes = store.open("imports/a.csv").await.unwrap();
        assert_eq!(bytes, b"name,cpf\n");
    }

    #[tokio::test]
    async fn in_memory_store_errors_on_missing_handle() {
        let store = InMemoryFileStore::new();
        assert!(store.open("imports/missing.csv").await.is_err());
    }

    #[tokio::test]
    async fn local_store_rejects_traversal() {
        let store = LocalFileStore::new("/tmp/rosterline-test");
        assert!(store.open("../etc/passwd").await.is_err());
        assert!(store.open("/etc/passwd").await.is_err());
    }
}
