//! Local directory adapter.
//!
//! Reference [`StorageAdapter`] over a directory tree. Probes seek and read
//! fixed-size chunks from the relevant end of the file; writes go through a
//! sibling temp file and rename so a replace is atomic at the per-file
//! level.

use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::constants::ADAPTER_PROBE_CHUNK_BYTES;
use crate::error::{StoreError, StoreResult};

use super::adapter::StorageAdapter;

// =============================================================================
// LocalDirAdapter
// =============================================================================

/// Storage adapter over a local directory.
#[derive(Debug, Clone)]
pub struct LocalDirAdapter {
    root: PathBuf,
}

impl LocalDirAdapter {
    /// Create an adapter rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// [`StoreError::Storage`] when the root cannot be created.
    pub async fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::storage(format!("create root {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    /// The adapter root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path under the root, rejecting escapes.
    fn resolve(&self, path: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if path.is_empty() || escapes {
            return Err(StoreError::storage(format!(
                "path {path:?} is not relative to the root"
            )));
        }
        Ok(self.root.join(relative))
    }
}

fn io_err(op: &str, path: &str, e: &std::io::Error) -> StoreError {
    StoreError::storage(format!("{op} {path:?}: {e}"))
}

fn utf8(path: &str, bytes: Vec<u8>) -> StoreResult<String> {
    String::from_utf8(bytes)
        .map_err(|e| StoreError::storage(format!("file {path:?} is not UTF-8: {e}")))
}

#[async_trait]
impl StorageAdapter for LocalDirAdapter {
    async fn collection(&self, extension: &str) -> StoreResult<Vec<String>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err("list", ".", &e)),
        };

        let mut names = Vec::new();
        while let Some(item) = dir.next_entry().await.map_err(|e| io_err("list", ".", &e))? {
            let file_type = item
                .file_type()
                .await
                .map_err(|e| io_err("stat", ".", &e))?;
            if !file_type.is_file() {
                continue;
            }
            let Ok(name) = item.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let matches_ext = extension == "*"
                || Path::new(&name)
                    .extension()
                    .is_some_and(|e| e == extension);
            if matches_ext {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn exists(&self, path: &str) -> StoreResult<bool> {
        let full = self.resolve(path)?;
        fs::try_exists(&full)
            .await
            .map_err(|e| io_err("probe", path, &e))
    }

    async fn size(&self, path: &str) -> StoreResult<u64> {
        let full = self.resolve(path)?;
        let meta = fs::metadata(&full)
            .await
            .map_err(|e| io_err("stat", path, &e))?;
        Ok(meta.len())
    }

    async fn read(&self, path: &str) -> StoreResult<String> {
        let full = self.resolve(path)?;
        let bytes = fs::read(&full)
            .await
            .map_err(|e| io_err("read", path, &e))?;
        utf8(path, bytes)
    }

    async fn head(&self, path: &str, n: usize) -> StoreResult<String> {
        let full = self.resolve(path)?;
        let mut file = fs::File::open(&full)
            .await
            .map_err(|e| io_err("open", path, &e))?;

        let mut out: Vec<u8> = Vec::new();
        let mut chunk = vec![0u8; ADAPTER_PROBE_CHUNK_BYTES];
        let mut seen = 0usize;

        loop {
            let read = file
                .read(&mut chunk)
                .await
                .map_err(|e| io_err("read", path, &e))?;
            if read == 0 {
                break;
            }
            let mut taken = read;
            for (i, byte) in chunk[..read].iter().enumerate() {
                if *byte == b'\n' {
                    seen += 1;
                    if seen == n {
                        taken = i + 1;
                        break;
                    }
                }
            }
            out.extend_from_slice(&chunk[..taken]);
            if seen == n {
                break;
            }
        }
        utf8(path, out)
    }

    async fn tail(&self, path: &str, n: usize) -> StoreResult<String> {
        let full = self.resolve(path)?;
        let mut file = fs::File::open(&full)
            .await
            .map_err(|e| io_err("open", path, &e))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| io_err("stat", path, &e))?
            .len();

        // Walk backward counting newlines; the terminator of the final line
        // does not open a new line, so the very last byte never counts.
        let mut pos = size;
        let mut start = 0u64;
        let mut seen = 0usize;
        let mut chunk = vec![0u8; ADAPTER_PROBE_CHUNK_BYTES];

        'scan: while pos > 0 {
            let len = std::cmp::min(ADAPTER_PROBE_CHUNK_BYTES as u64, pos);
            pos -= len;
            file.seek(SeekFrom::Start(pos))
                .await
                .map_err(|e| io_err("seek", path, &e))?;
            #[allow(clippy::cast_possible_truncation)]
            let len = len as usize;
            file.read_exact(&mut chunk[..len])
                .await
                .map_err(|e| io_err("read", path, &e))?;

            for i in (0..len).rev() {
                let global = pos + i as u64;
                if chunk[i] == b'\n' && global != size - 1 {
                    seen += 1;
                    if seen == n {
                        start = global + 1;
                        break 'scan;
                    }
                }
            }
        }

        file.seek(SeekFrom::Start(start))
            .await
            .map_err(|e| io_err("seek", path, &e))?;
        let mut out = Vec::new();
        file.read_to_end(&mut out)
            .await
            .map_err(|e| io_err("read", path, &e))?;
        utf8(path, out)
    }

    async fn append(&self, path: &str, data: &str) -> StoreResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err("create parent of", path, &e))?;
        }
        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&full)
            .await
            .map_err(|e| io_err("open", path, &e))?;
        file.write_all(data.as_bytes())
            .await
            .map_err(|e| io_err("append", path, &e))?;
        file.flush().await.map_err(|e| io_err("flush", path, &e))
    }

    async fn write(&self, path: &str, data: &str) -> StoreResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err("create parent of", path, &e))?;
        }
        let mut tmp = full.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, data.as_bytes())
            .await
            .map_err(|e| io_err("write", path, &e))?;
        fs::rename(&tmp, &full)
            .await
            .map_err(|e| io_err("replace", path, &e))
    }
}

// =============================================================================
// Tests
// =============================================================================
