use crate::AppState;
use crate::api::error::AppError;
use crate::models::{FileActionResponse, FileSummary};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::Response,
};
use futures::TryStreamExt;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tokio_util::io::{ReaderStream, StreamReader};

fn multipart_error(e: MultipartError) -> AppError {
    let err_msg = e.to_string();
    if err_msg.contains("length limit exceeded") {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(err_msg)
    }
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = Object, description = "Multipart form with a `file` field", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File uploaded successfully", body = FileActionResponse),
        (status = 400, description = "No file selected"),
        (status = 413, description = "File too large")
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FileActionResponse>, AppError> {
    let result = async {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            if field.name() != Some("file") {
                continue;
            }

            let filename = field.file_name().unwrap_or_default().to_string();
            if filename.is_empty() {
                return Err(AppError::BadRequest("No file selected".to_string()));
            }

            let reader = StreamReader::new(field.map_err(std::io::Error::other));
            tokio::pin!(reader);

            let record = state.files.upload(&filename, reader).await?;
            return Ok(Json(FileActionResponse {
                message: "File uploaded successfully".to_string(),
                file_id: record.id,
            }));
        }

        Err(AppError::BadRequest("No file selected".to_string()))
    }
    .await;

    if let Err(e) = &result {
        // Read the rest of the body so the client gets the error instead of a reset
        tracing::warn!("Upload rejected: {}. Consuming remaining stream...", e);
        while let Ok(Some(mut field)) = multipart.next_field().await {
            while let Ok(Some(_)) = field.chunk().await {}
        }
    }

    result
}

#[utoipa::path(
    get,
    path = "/files",
    responses(
        (status = 200, description = "Uploaded files, newest first", body = Vec<FileSummary>)
    ),
    tag = "files"
)]
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileSummary>>, AppError> {
    Ok(Json(state.files.list().await?))
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let ascii_filename = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .take(64)
        .collect::<String>();
    let fallback_filename = if ascii_filename.is_empty() {
        "file"
    } else {
        &ascii_filename
    };
    let encoded_filename = utf8_percent_encode(filename, NON_ALPHANUMERIC);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_filename, encoded_filename
    )
}

#[utoipa::path(
    get,
    path = "/download/{id}",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "File not found")
    ),
    tag = "files"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response, AppError> {
    let (file, record) = state.files.download(&file_id).await?;
    let length = file.metadata().await?.len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.as_ref())
        .header(header::CONTENT_LENGTH, length)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&record.original_name),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[utoipa::path(
    delete,
    path = "/delete/{id}",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File deleted successfully", body = FileActionResponse),
        (status = 404, description = "File not found")
    ),
    tag = "files"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<FileActionResponse>, AppError> {
    state.files.delete(&file_id).await?;
    Ok(Json(FileActionResponse {
        message: "File deleted successfully".to_string(),
        file_id,
    }))
}
