//! # clouddisk-service
//!
//! Consistency coordinator for CloudDisk. Every mutating operation touches
//! both the catalog and the filesystem mirror; the services here sequence
//! those effects under a per-path lock and undo the earlier effect when a
//! later one fails.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod compensation;
pub mod file;
pub mod folder;
pub mod guard;
pub mod lock;
pub mod path;

mod orphan;

#[cfg(test)]
pub(crate) mod testing;

pub use file::{CreateFileParams, FileService, UploadService};
pub use folder::FolderService;
pub use guard::ExistenceGuard;
pub use lock::{PathGuard, PathLocks};
pub use path::PathResolver;
