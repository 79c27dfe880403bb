use crate::AppState;
use crate::api::error::AppError;
use crate::models::{SessionConfig, SessionMode};
use axum::{
    Json,
    extract::{Path, State},
};

#[utoipa::path(
    get,
    path = "/editor-config/{id}",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Editable DocEditor configuration", body = SessionConfig),
        (status = 404, description = "File not found")
    ),
    tag = "sessions"
)]
pub async fn editor_config(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<SessionConfig>, AppError> {
    Ok(Json(state.sessions.build(&file_id, SessionMode::Edit).await?))
}

#[utoipa::path(
    get,
    path = "/preview-config/{id}",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Read-only embedded DocEditor configuration", body = SessionConfig),
        (status = 404, description = "File not found")
    ),
    tag = "sessions"
)]
pub async fn preview_config(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<SessionConfig>, AppError> {
    Ok(Json(
        state.sessions.build(&file_id, SessionMode::Preview).await?,
    ))
}
