use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
    pub document_server: String,
    pub jwt: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_status = match tokio::fs::metadata(state.files.root()).await {
        Ok(meta) if meta.is_dir() => "available",
        _ => "unavailable",
    };

    let jwt_status = if state.config.signing_secret().is_some() {
        "enabled"
    } else {
        "disabled"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        storage: storage_status.to_string(),
        document_server: state.config.onlyoffice_server_url(),
        jwt: jwt_status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
