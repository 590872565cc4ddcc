//! File operations: rename, delete, query, download and upload.

pub mod service;
pub mod upload;

pub use service::FileService;
pub use upload::{CreateFileParams, UploadService};
