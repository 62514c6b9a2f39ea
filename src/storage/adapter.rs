//! Storage adapter trait.

use async_trait::async_trait;

use crate::error::StoreResult;

/// An opaque file-like namespace.
///
/// Paths are relative to an adapter-defined root. All operations are async
/// and return explicit errors; implementations are not required to be
/// thread-safe for distinct paths beyond what the underlying medium
/// guarantees.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// List relative paths under the root.
    ///
    /// `extension` is either `"*"` for any extension or a specific one
    /// without the dot. Hidden/dot entries are excluded; results are
    /// lexicographically ordered.
    async fn collection(&self, extension: &str) -> StoreResult<Vec<String>>;

    /// Whether a file exists at the path.
    async fn exists(&self, path: &str) -> StoreResult<bool>;

    /// Size of the file in bytes.
    async fn size(&self, path: &str) -> StoreResult<u64>;

    /// Whole contents of the file as UTF-8 text.
    async fn read(&self, path: &str) -> StoreResult<String>;

    /// The first `n` newline-terminated lines, terminators included, or
    /// the whole file if it has fewer than `n` lines.
    ///
    /// Implementations must not read the whole file for bounded `n`: they
    /// read forward from the head in small chunks until `n` newlines have
    /// been observed.
    async fn head(&self, path: &str, n: usize) -> StoreResult<String>;

    /// The last `n` newline-terminated lines, terminators included, or the
    /// whole file if it has fewer than `n` lines.
    ///
    /// Dual of [`head`](Self::head): probe the file size and read backward
    /// from the tail in small chunks. Terminators are preserved so that
    /// `head(path, 1) + tail(path, 1)` parses as two complete lines.
    async fn tail(&self, path: &str, n: usize) -> StoreResult<String>;

    /// Extend the file, creating it if missing.
    async fn append(&self, path: &str, data: &str) -> StoreResult<()>;

    /// Replace the file contents atomically at per-file granularity,
    /// creating parent directories as needed.
    async fn write(&self, path: &str, data: &str) -> StoreResult<()>;
}
