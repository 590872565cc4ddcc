//! Folder CRUD handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use clouddisk_core::types::FolderId;
use clouddisk_entity::folder::{Folder, FolderContent};

use crate::dto::request::{CreateFolderRequest, RenameRequest};
use crate::dto::response::{ApiResponse, MessageResponse, PathResponse};
use crate::error::ApiResult;
use crate::extractors::{ValidatedJson, parse_id};
use crate::state::AppState;

/// POST /api/folders
pub async fn create_folder(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Folder>>)> {
    let folder = state
        .folder_service
        .create_folder(&req.name, req.parent_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(folder))))
}

/// GET /api/folders/{id}
pub async fn get_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Folder>>> {
    let id: FolderId = parse_id(&id)?;
    let folder = state.folder_service.get_folder(id).await?;
    Ok(Json(ApiResponse::ok(folder)))
}

/// GET /api/folders/{id}/content
pub async fn list_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<FolderContent>>> {
    let id: FolderId = parse_id(&id)?;
    let content = state.folder_service.list_content(id).await?;
    Ok(Json(ApiResponse::ok(content)))
}

/// GET /api/folders/{id}/path
pub async fn get_path(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<PathResponse>>> {
    let id: FolderId = parse_id(&id)?;
    let path = state.folder_service.query_path(id).await?;
    Ok(Json(ApiResponse::ok(PathResponse { id: id.get(), path })))
}

/// PUT /api/folders/{id}
pub async fn rename_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<RenameRequest>,
) -> ApiResult<Json<ApiResponse<Folder>>> {
    let id: FolderId = parse_id(&id)?;
    let folder = state.folder_service.rename_folder(id, &req.name).await?;
    Ok(Json(ApiResponse::ok(folder)))
}

/// DELETE /api/folders/{id}
pub async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    let id: FolderId = parse_id(&id)?;
    state.folder_service.delete_folder(id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Folder deleted"))))
}
