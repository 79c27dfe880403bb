pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::ConfigStore;
use crate::services::callback::CallbackService;
use crate::services::fetcher::DocumentFetcher;
use crate::services::file_store::FileStore;
use crate::services::session_config::SessionConfigService;
use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::{Request, Response},
    middleware::from_fn,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{Span, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::pages::index_page,
        api::handlers::pages::editor_page,
        api::handlers::pages::preview_page,
        api::handlers::client_config::client_config,
        api::handlers::health::health_check,
        api::handlers::files::upload_file,
        api::handlers::files::list_files,
        api::handlers::files::download_file,
        api::handlers::files::delete_file,
        api::handlers::sessions::editor_config,
        api::handlers::sessions::preview_config,
        api::handlers::callback::document_callback,
    ),
    components(
        schemas(
            models::FileRecord,
            models::FileSummary,
            models::FileActionResponse,
            models::CallbackPayload,
            models::CallbackResponse,
            models::ClientConfig,
            models::ClientServer,
            models::ClientOnlyOffice,
            models::ClientUi,
            models::ClientStorage,
            models::SessionConfig,
            models::DocumentType,
            models::DocumentInfo,
            models::Permissions,
            models::EditorConfig,
            models::EditorUser,
            models::Customization,
            models::CoEditing,
            models::Embedded,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "files", description = "Upload, list, download and delete documents"),
        (name = "sessions", description = "Document editor configurations"),
        (name = "callback", description = "Document server save notifications"),
        (name = "pages", description = "Static front-end pages"),
        (name = "system", description = "Health and client configuration")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigStore>,
    pub files: Arc<FileStore>,
    pub sessions: Arc<SessionConfigService>,
    pub callbacks: Arc<CallbackService>,
}

impl AppState {
    pub fn new(config: Arc<ConfigStore>, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        let files = Arc::new(FileStore::from_config(&config));
        let sessions = Arc::new(SessionConfigService::new(config.clone(), files.clone()));
        let callbacks = Arc::new(CallbackService::new(
            config.clone(),
            files.clone(),
            fetcher,
        ));

        Self {
            config,
            files,
            sessions,
            callbacks,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let static_dir = ServeDir::new(state.config.static_directory());
    let cors = api::middleware::cors::cors_layer(&state.config);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(&api::middleware::request_id::REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &Response<Body>, latency: std::time::Duration, _span: &Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(api::handlers::pages::index_page))
        .route("/editor", get(api::handlers::pages::editor_page))
        .route("/preview", get(api::handlers::pages::preview_page))
        .route("/config", get(api::handlers::client_config::client_config))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/upload",
            post(api::handlers::files::upload_file).layer(DefaultBodyLimit::max(
                state.config.max_file_size() + 10 * 1024 * 1024, // multipart overhead
            )),
        )
        .route("/files", get(api::handlers::files::list_files))
        .route("/download/:id", get(api::handlers::files::download_file))
        .route("/delete/:id", delete(api::handlers::files::delete_file))
        .route(
            "/editor-config/:id",
            get(api::handlers::sessions::editor_config),
        )
        .route(
            "/preview-config/:id",
            get(api::handlers::sessions::preview_config),
        )
        .route(
            "/callback/:id",
            post(api::handlers::callback::document_callback),
        )
        .nest_service("/static", static_dir)
        .layer(trace_layer)
        // Outside the trace layer so the span sees a minted id
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}
