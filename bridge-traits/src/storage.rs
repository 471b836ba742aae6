//! File System Abstraction
//!
//! Offline audio and thumbnails are written through this trait so that mobile hosts
//! can route them into their sandboxed directories.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWrite;

use crate::error::{BridgeError, Result};

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn continue_download(fs: &dyn FileSystemAccess, path: &Path, offset: u64) -> Result<()> {
///     let mut writer = fs.open_resumable_write(path, offset).await?;
///     writer.write_all(b"...").await?;
///     writer.shutdown().await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Directory for files the system may evict under storage pressure.
    async fn get_cache_directory(&self) -> Result<PathBuf>;

    /// Directory for persistent application data (offline audio lives here).
    async fn get_data_directory(&self) -> Result<PathBuf>;

    async fn exists(&self, path: &Path) -> Result<bool>;

    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, replacing any previous contents
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Open a file for writing starting at `offset`.
    ///
    /// The file is created when missing and truncated to `offset` bytes, so an
    /// offset of zero overwrites from scratch and any other offset continues a
    /// partial file. Fails when the file is shorter than `offset`.
    async fn open_resumable_write(
        &self,
        path: &Path,
        offset: u64,
    ) -> Result<Box<dyn AsyncWrite + Send + Unpin>>;

    /// Size of a regular file, or `None` when it does not exist.
    async fn file_size(&self, path: &Path) -> Result<Option<u64>> {
        if !self.exists(path).await? {
            return Ok(None);
        }
        let metadata = self.metadata(path).await?;
        if metadata.is_directory {
            return Err(BridgeError::OperationFailed(format!(
                "{} is a directory",
                path.display()
            )));
        }
        Ok(Some(metadata.size))
    }

    /// Delete a file, treating a missing file as success.
    async fn delete_if_exists(&self, path: &Path) -> Result<bool> {
        if self.exists(path).await? {
            self.delete_file(path).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_metadata() {
        let metadata = FileMetadata {
            size: 4_194_304,
            modified_at: Some(1_700_000_000),
            is_directory: false,
        };

        assert_eq!(metadata.size, 4_194_304);
        assert!(!metadata.is_directory);
    }
}
