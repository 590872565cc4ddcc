//! # clouddisk-storage
//!
//! Filesystem mirror implementation for CloudDisk. The physical tree under
//! the configured storage root follows catalog paths one-to-one.

pub mod mime;
pub mod providers;

pub use mime::content_type_for;
pub use providers::LocalFilesystem;
