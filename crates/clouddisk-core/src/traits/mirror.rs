//! Filesystem mirror trait for the physical side of the catalog.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// A byte stream type used for reading and writing file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Wrap an in-memory buffer as a single-chunk [`ByteStream`].
pub fn bytes_stream(data: impl Into<Bytes>) -> ByteStream {
    let chunk: Bytes = data.into();
    Box::pin(futures::stream::once(async move { Ok(chunk) }))
}

/// Kind of a physical entry found at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

/// Physical directory tree mirroring catalog paths.
///
/// Every `path` argument is a catalog path (`/`, `/docs`, `/docs/a.txt`)
/// resolved against one storage root. The trait is defined here in
/// `clouddisk-core` and implemented in `clouddisk-storage`.
#[async_trait]
pub trait FilesystemMirror: Send + Sync + std::fmt::Debug + 'static {
    /// Check whether the storage root is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Create a directory (and any missing parents).
    async fn create_dir(&self, path: &str) -> AppResult<()>;

    /// Stream bytes into a file, returning the number of bytes written.
    ///
    /// The parent directory must already exist.
    async fn write_stream(&self, path: &str, stream: ByteStream) -> AppResult<u64>;

    /// Open a file for streaming reads.
    async fn read(&self, path: &str) -> AppResult<ByteStream>;

    /// Rename a file or directory.
    async fn rename(&self, from: &str, to: &str) -> AppResult<()>;

    /// Remove a file. A missing file is not an error.
    async fn remove_file(&self, path: &str) -> AppResult<()>;

    /// Remove a directory and everything below it. A missing path is not
    /// an error.
    async fn remove_tree(&self, path: &str) -> AppResult<()>;

    /// Kind of the entry at `path`, or `None` if nothing is there.
    async fn entry_kind(&self, path: &str) -> AppResult<Option<EntryKind>>;

    /// Whether anything exists at `path`.
    async fn exists(&self, path: &str) -> AppResult<bool> {
        Ok(self.entry_kind(path).await?.is_some())
    }
}
