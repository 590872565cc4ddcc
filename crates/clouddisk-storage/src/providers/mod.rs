//! Filesystem mirror implementations.

pub mod local;

pub use local::LocalFilesystem;
