//! Core type definitions used across the CloudDisk workspace.

pub mod id;
pub mod namespace;

pub use id::*;
pub use namespace::Namespace;
