//! In-memory adapter for deterministic tests.
//!
//! Behaves like a flat directory of text files and counts every operation,
//! so tests can assert how stores touch storage (e.g. first/last never fall
//! back to a whole-file read).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};

use super::adapter::StorageAdapter;

// =============================================================================
// Operation Counters
// =============================================================================

/// Counts of adapter operations since construction.
#[derive(Debug, Default)]
pub struct MemoryAdapterStats {
    /// Whole-file reads
    pub reads: AtomicUsize,
    /// Bounded head probes
    pub heads: AtomicUsize,
    /// Bounded tail probes
    pub tails: AtomicUsize,
    /// Appends
    pub appends: AtomicUsize,
    /// Replacing writes
    pub writes: AtomicUsize,
}

// =============================================================================
// MemoryAdapter
// =============================================================================

/// Storage adapter over an in-memory map of path to contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    files: Arc<RwLock<BTreeMap<String, String>>>,
    stats: Arc<MemoryAdapterStats>,
}

impl MemoryAdapter {
    /// Create an empty adapter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Operation counters.
    #[must_use]
    pub fn stats(&self) -> &MemoryAdapterStats {
        &self.stats
    }

    /// Snapshot of all file names, lexicographically ordered.
    #[must_use]
    pub fn file_names(&self) -> Vec<String> {
        self.files.read().unwrap().keys().cloned().collect()
    }

    /// Direct look at one file's contents, for assertions.
    #[must_use]
    pub fn contents(&self, path: &str) -> Option<String> {
        self.files.read().unwrap().get(path).cloned()
    }

    fn get(&self, path: &str) -> StoreResult<String> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::storage(format!("no such file {path:?}")))
    }
}

/// First `n` newline-terminated lines of `text`, terminators included.
fn take_head(text: &str, n: usize) -> &str {
    let mut seen = 0usize;
    for (i, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            seen += 1;
            if seen == n {
                return &text[..=i];
            }
        }
    }
    text
}

/// Last `n` newline-terminated lines of `text`, terminators included.
fn take_tail(text: &str, n: usize) -> &str {
    let bytes = text.as_bytes();
    let mut seen = 0usize;
    for i in (0..bytes.len()).rev() {
        if bytes[i] == b'\n' && i != bytes.len() - 1 {
            seen += 1;
            if seen == n {
                return &text[i + 1..];
            }
        }
    }
    text
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    async fn collection(&self, extension: &str) -> StoreResult<Vec<String>> {
        let files = self.files.read().unwrap();
        Ok(files
            .keys()
            .filter(|name| !name.starts_with('.'))
            .filter(|name| {
                extension == "*"
                    || Path::new(name)
                        .extension()
                        .is_some_and(|e| e == extension)
            })
            .cloned()
            .collect())
    }

    async fn exists(&self, path: &str) -> StoreResult<bool> {
        Ok(self.files.read().unwrap().contains_key(path))
    }

    async fn size(&self, path: &str) -> StoreResult<u64> {
        Ok(self.get(path)?.len() as u64)
    }

    async fn read(&self, path: &str) -> StoreResult<String> {
        self.stats.reads.fetch_add(1, Ordering::Relaxed);
        self.get(path)
    }

    async fn head(&self, path: &str, n: usize) -> StoreResult<String> {
        self.stats.heads.fetch_add(1, Ordering::Relaxed);
        Ok(take_head(&self.get(path)?, n).to_string())
    }

    async fn tail(&self, path: &str, n: usize) -> StoreResult<String> {
        self.stats.tails.fetch_add(1, Ordering::Relaxed);
        Ok(take_tail(&self.get(path)?, n).to_string())
    }

    async fn append(&self, path: &str, data: &str) -> StoreResult<()> {
        self.stats.appends.fetch_add(1, Ordering::Relaxed);
        let mut files = self.files.write().unwrap();
        files.entry(path.to_string()).or_default().push_str(data);
        Ok(())
    }

    async fn write(&self, path: &str, data: &str) -> StoreResult<()> {
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        let mut files = self.files.write().unwrap();
        files.insert(path.to_string(), data.to_string());
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
