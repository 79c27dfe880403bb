use crate::AppState;
use crate::models::{ClientConfig, ClientOnlyOffice, ClientServer, ClientStorage, ClientUi};
use axum::{Json, extract::State};

#[utoipa::path(
    get,
    path = "/config",
    responses(
        (status = 200, description = "Client-facing configuration subset", body = ClientConfig)
    ),
    tag = "system"
)]
pub async fn client_config(State(state): State<AppState>) -> Json<ClientConfig> {
    let config = &state.config;
    Json(ClientConfig {
        server: ClientServer {
            url: config.server_url(),
        },
        onlyoffice: ClientOnlyOffice {
            api_js_url: config.onlyoffice_api_js_url(),
        },
        ui: ClientUi {
            title: config.ui_title(),
            subtitle: config.ui_subtitle(),
            language: config.ui_language(),
        },
        storage: ClientStorage {
            allowed_extensions: config.allowed_extensions(),
            max_file_size: config.max_file_size(),
        },
    })
}
