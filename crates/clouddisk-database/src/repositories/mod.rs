//! Repository implementations for the catalog tables.

pub mod file;
pub mod folder;

pub use file::FileRepository;
pub use folder::FolderRepository;
