//! File upload, download, rename and delete handlers.

use std::io;

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use futures::SinkExt;
use futures::channel::mpsc;

use clouddisk_core::error::AppError;
use clouddisk_core::traits::mirror::bytes_stream;
use clouddisk_core::types::{FileId, FolderId};
use clouddisk_entity::file::File;
use clouddisk_service::CreateFileParams;
use clouddisk_storage::content_type_for;

use crate::dto::request::RenameRequest;
use crate::dto::response::{ApiResponse, MessageResponse, PathResponse};
use crate::error::ApiResult;
use crate::extractors::{ValidatedJson, parse_id};
use crate::state::AppState;

/// Chunks buffered between the multipart reader and the storage writer.
const UPLOAD_CHANNEL_CHUNKS: usize = 8;

/// POST /api/files/upload
///
/// Multipart fields: `parent_id`, `size`, `file`, and an optional `name`
/// overriding the uploaded file name. When `parent_id` and `size` precede
/// `file`, the body is streamed straight to storage. Otherwise it is
/// buffered, and a missing `size` defaults to the received length.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ApiResponse<File>>)> {
    let mut parent_id: Option<FolderId> = None;
    let mut size: Option<i64> = None;
    let mut name: Option<String> = None;
    let mut buffered: Option<(Option<String>, Bytes)> = None;
    let mut stored: Option<File> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "parent_id" => {
                let text = read_text(field).await?;
                parent_id = Some(parse_id(text.trim())?);
            }
            "size" => {
                let text = read_text(field).await?;
                size = Some(
                    text.trim()
                        .parse::<i64>()
                        .map_err(|_| AppError::validation(format!("Invalid size: {text}")))?,
                );
            }
            "name" => {
                name = Some(read_text(field).await?);
            }
            "file" if stored.is_some() || buffered.is_some() => {
                return Err(AppError::validation("Only one file per upload").into());
            }
            "file" => {
                let file_name = field.file_name().map(String::from);
                match (parent_id, size) {
                    (Some(parent_id), Some(size)) => {
                        let name = name
                            .clone()
                            .or(file_name)
                            .ok_or_else(|| AppError::validation("File name is required"))?;
                        stored = Some(stream_upload(&state, field, name, parent_id, size).await?);
                    }
                    _ => {
                        let data = field
                            .bytes()
                            .await
                            .map_err(|e| AppError::validation(format!("Read error: {e}")))?;
                        buffered = Some((file_name, data));
                    }
                }
            }
            _ => {}
        }
    }

    let file = match (stored, buffered) {
        (Some(file), _) => file,
        (None, Some((file_name, data))) => {
            let parent_id =
                parent_id.ok_or_else(|| AppError::validation("parent_id is required"))?;
            let name = name
                .or(file_name)
                .ok_or_else(|| AppError::validation("File name is required"))?;
            let size = size.unwrap_or(data.len() as i64);
            state
                .upload_service
                .create_file(CreateFileParams::new(name, parent_id, size, bytes_stream(data)))
                .await?
        }
        (None, None) => return Err(AppError::validation("file is required").into()),
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(file))))
}

/// Feed a multipart field to the upload service chunk by chunk.
///
/// The field borrows the request, so it is pumped into a bounded channel
/// on this task while the service drains the other end.
async fn stream_upload(
    state: &AppState,
    mut field: Field<'_>,
    name: String,
    parent_id: FolderId,
    size: i64,
) -> Result<File, AppError> {
    let (mut tx, rx) = mpsc::channel::<Result<Bytes, io::Error>>(UPLOAD_CHANNEL_CHUNKS);

    let pump = async move {
        loop {
            let next = match field.chunk().await {
                Ok(Some(chunk)) => Ok(chunk),
                Ok(None) => break,
                Err(e) => Err(io::Error::other(e.to_string())),
            };
            let failed = next.is_err();
            if tx.send(next).await.is_err() || failed {
                break;
            }
        }
    };

    let params = CreateFileParams::new(name, parent_id, size, Box::pin(rx));
    let ((), result) = tokio::join!(pump, state.upload_service.create_file(params));
    result
}

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::validation(format!("Read error: {e}")))
}

/// GET /api/files/{id}
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<File>>> {
    let id: FileId = parse_id(&id)?;
    let file = state.file_service.get_file(id).await?;
    Ok(Json(ApiResponse::ok(file)))
}

/// GET /api/files/{id}/path
pub async fn get_path(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<PathResponse>>> {
    let id: FileId = parse_id(&id)?;
    let path = state.file_service.query_path(id).await?;
    Ok(Json(ApiResponse::ok(PathResponse { id: id.get(), path })))
}

/// GET /api/files/{id}/download
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id: FileId = parse_id(&id)?;
    let (file, stream) = state.file_service.open_file(id).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&file.name))
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.name.replace('"', "")),
        )
        .header(header::CONTENT_LENGTH, file.size)
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;

    Ok(response)
}

/// PUT /api/files/{id}
pub async fn rename_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<RenameRequest>,
) -> ApiResult<Json<ApiResponse<File>>> {
    let id: FileId = parse_id(&id)?;
    let file = state.file_service.rename_file(id, &req.name).await?;
    Ok(Json(ApiResponse::ok(file)))
}

/// DELETE /api/files/{id}
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    let id: FileId = parse_id(&id)?;
    state.file_service.delete_file(id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("File deleted"))))
}
