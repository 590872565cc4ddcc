//! # clouddisk-database
//!
//! SQLite catalog connection management and the folder and file
//! repositories.

pub mod connection;
mod error;
pub mod migration;
pub mod repositories;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::DatabasePool;
pub use migration::run_migrations;
pub use repositories::{FileRepository, FolderRepository};
