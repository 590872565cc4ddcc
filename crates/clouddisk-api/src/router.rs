//! Route definitions for the CloudDisk HTTP API.
//!
//! All routes are mounted under `/api`. The router receives `AppState`
//! and passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Headroom over the upload limit for multipart framing and text fields.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_body = usize::try_from(state.config.storage.max_upload_size_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let api_routes = Router::new()
        .merge(folder_routes())
        .merge(file_routes())
        .merge(health_routes());

    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Folder CRUD and listing
fn folder_routes() -> Router<AppState> {
    Router::new()
        .route("/folders", post(handlers::folder::create_folder))
        .route(
            "/folders/{id}",
            get(handlers::folder::get_folder)
                .put(handlers::folder::rename_folder)
                .delete(handlers::folder::delete_folder),
        )
        .route("/folders/{id}/content", get(handlers::folder::list_content))
        .route("/folders/{id}/path", get(handlers::folder::get_path))
}

/// File upload, download, rename and delete
fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files/upload", post(handlers::file::upload_file))
        .route(
            "/files/{id}",
            get(handlers::file::get_file)
                .put(handlers::file::rename_file)
                .delete(handlers::file::delete_file),
        )
        .route("/files/{id}/path", get(handlers::file::get_path))
        .route("/files/{id}/download", get(handlers::file::download_file))
}

/// Health check
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health_check))
}
