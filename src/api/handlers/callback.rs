use crate::AppState;
use crate::models::{CallbackPayload, CallbackResponse};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use tracing::warn;

/// Document server save hook. Always answers 200 with the `{error}` envelope.
#[utoipa::path(
    post,
    path = "/callback/{id}",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    request_body = CallbackPayload,
    responses(
        (status = 200, description = "Callback processed", body = CallbackResponse)
    ),
    tag = "callback"
)]
pub async fn document_callback(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    body: Bytes,
) -> Json<CallbackResponse> {
    let payload = match serde_json::from_slice::<CallbackPayload>(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("⚠️  Unreadable callback body for {}: {}", file_id, e);
            return Json(CallbackResponse::failure(format!("Invalid callback body: {}", e)));
        }
    };

    Json(state.callbacks.handle(&file_id, payload).await)
}
