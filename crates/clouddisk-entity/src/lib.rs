//! # clouddisk-entity
//!
//! Catalog entity models for CloudDisk. Every struct in this crate
//! represents a catalog table row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and table rows
//! additionally derive `sqlx::FromRow`.

pub mod file;
pub mod folder;
