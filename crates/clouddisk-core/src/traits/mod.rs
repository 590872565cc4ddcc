//! Core traits defined in `clouddisk-core` and implemented by other crates.

pub mod mirror;

pub use mirror::{ByteStream, EntryKind, FilesystemMirror, bytes_stream};
