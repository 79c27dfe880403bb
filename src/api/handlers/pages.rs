use crate::AppState;
use crate::api::error::AppError;
use axum::{extract::State, response::Html};
use tracing::error;

async fn render_page(state: &AppState, name: &str) -> Result<Html<String>, AppError> {
    let path = state.config.static_directory().join(name);
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            error!("❌ Failed to read page {}: {}", path.display(), e);
            Err(AppError::Internal(format!("Page {} is unavailable", name)))
        }
    }
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "File manager page", content_type = "text/html")
    ),
    tag = "pages"
)]
pub async fn index_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    render_page(&state, "index.html").await
}

#[utoipa::path(
    get,
    path = "/editor",
    responses(
        (status = 200, description = "Editor page", content_type = "text/html")
    ),
    tag = "pages"
)]
pub async fn editor_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    render_page(&state, "editor.html").await
}

#[utoipa::path(
    get,
    path = "/preview",
    responses(
        (status = 200, description = "Preview page", content_type = "text/html")
    ),
    tag = "pages"
)]
pub async fn preview_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    render_page(&state, "preview.html").await
}
