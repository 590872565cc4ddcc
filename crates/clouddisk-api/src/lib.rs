//! # clouddisk-api
//!
//! HTTP API layer for CloudDisk built on Axum.
//!
//! Provides the folder and file endpoints, middleware (CORS, request
//! logging), extractors, DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_state;
pub use router::build_router;
pub use state::AppState;
