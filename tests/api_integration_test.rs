use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use onlyoffice_bridge::api::error::AppError;
use onlyoffice_bridge::config::{ConfigStore, EnvSource, defaults};
use onlyoffice_bridge::services::fetcher::DocumentFetcher;
use onlyoffice_bridge::utils::auth::{sign_payload, verify_token};
use onlyoffice_bridge::{AppState, create_app};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "----bridgetestboundary";
const SECRET: &str = "integration-secret";

/// Serves a fixed body and records requested urls.
struct MockFetcher {
    body: Bytes,
    requested: Mutex<Vec<String>>,
}

impl MockFetcher {
    fn new(body: &'static [u8]) -> Self {
        Self {
            body: Bytes::from_static(body),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentFetcher for MockFetcher {
    async fn fetch(&self, url: &str, _max_bytes: usize) -> Result<Bytes, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        Ok(self.body.clone())
    }
}

struct TestApp {
    app: Router,
    fetcher: Arc<MockFetcher>,
    dir: TempDir,
}

fn test_app(patch: impl FnOnce(&mut Value)) -> TestApp {
    let dir = TempDir::new().unwrap();
    let static_dir = dir.path().join("static");
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(static_dir.join("index.html"), "<h1>files</h1>").unwrap();

    let mut tree = defaults::default_tree();
    tree["server"]["host"] = json!("bridge.test");
    tree["server"]["port"] = json!(8000);
    tree["server"]["static_directory"] = json!(static_dir.to_string_lossy());
    tree["storage"]["upload_directory"] = json!(dir.path().join("uploads").to_string_lossy());
    tree["onlyoffice"]["secret"] = json!(SECRET);
    patch(&mut tree);

    let env: Arc<dyn EnvSource> = Arc::new(HashMap::<String, String>::new());
    let config = Arc::new(ConfigStore::from_tree(
        dir.path().join("config.json"),
        tree,
        env,
    ));
    let fetcher = Arc::new(MockFetcher::new(b"edited by the document server"));
    let state = AppState::new(config, fetcher.clone());

    TestApp {
        app: create_app(state),
        fetcher,
        dir,
    }
}

fn multipart_body(filename: &str, content: &[u8]) -> Body {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn upload(app: &Router, filename: &str, content: &[u8]) -> String {
    let (status, body) = send_json(
        app,
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart_body(filename, content))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "upload failed: {body}");
    assert_eq!(body["message"], "File uploaded successfully");
    body["file_id"].as_str().unwrap().to_string()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn callback(id: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/callback/{id}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_full_file_lifecycle() {
    let t = test_app(|_| {});

    let first = upload(&t.app, "report.docx", b"first document").await;
    let second = upload(&t.app, "budget.xlsx", b"second").await;

    let (status, files) = send_json(&t.app, get("/files")).await;
    assert_eq!(status, StatusCode::OK);
    let files = files.as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["id"], second.as_str());
    assert_eq!(files[1]["name"], "report.docx");
    assert_eq!(files[1]["size"], 14);

    let response = t
        .app
        .clone()
        .oneshot(get(&format!("/download/{first}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("filename=\"report.docx\""));
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"first document");

    let (status, body) = send_json(
        &t.app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/delete/{first}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "File deleted successfully");
    assert_eq!(body["file_id"], first.as_str());

    let (status, body) = send_json(&t.app, get(&format!("/download/{first}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "File not found");

    let (status, _) = send(
        &t.app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/delete/{first}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_without_filename_is_rejected() {
    let t = test_app(|_| {});

    let (status, body) = send_json(
        &t.app,
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart_body("", b"orphan bytes"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file selected");

    let (_, files) = send_json(&t.app, get("/files")).await;
    assert!(files.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_over_size_limit() {
    let t = test_app(|tree| tree["storage"]["max_file_size"] = json!(8));

    let (status, _) = send(
        &t.app,
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart_body("big.txt", b"more than eight bytes"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let leftovers = std::fs::read_dir(t.dir.path().join("uploads")).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_editor_config_is_signed() {
    let t = test_app(|_| {});
    let id = upload(&t.app, "budget.xlsx", b"cells").await;

    let (status, config) = send_json(&t.app, get(&format!("/editor-config/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["documentType"], "cell");
    assert_eq!(config["document"]["fileType"], "xlsx");
    assert_eq!(config["document"]["title"], "budget.xlsx");
    assert_eq!(
        config["document"]["url"],
        format!("http://bridge.test:8000/download/{id}")
    );
    assert_eq!(config["editorConfig"]["mode"], "edit");
    assert_eq!(
        config["editorConfig"]["callbackUrl"],
        format!("http://bridge.test:8000/callback/{id}")
    );
    assert!(
        config["document"]["key"]
            .as_str()
            .unwrap()
            .starts_with(&format!("edit_{id}_"))
    );

    let token = config["token"].as_str().unwrap();
    let claims = verify_token(token, SECRET).unwrap();
    let mut unsigned = config.clone();
    unsigned.as_object_mut().unwrap().remove("token");
    assert_eq!(claims, unsigned);
}

#[tokio::test]
async fn test_preview_config_without_jwt() {
    let t = test_app(|tree| tree["onlyoffice"]["jwt_enabled"] = json!(false));
    let id = upload(&t.app, "notes.txt", b"words").await;

    let (status, config) = send_json(&t.app, get(&format!("/preview-config/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["documentType"], "word");
    assert_eq!(config["editorConfig"]["mode"], "view");
    assert!(config["editorConfig"].get("callbackUrl").is_none());
    assert!(config.get("token").is_none());
    assert!(
        config["document"]["key"]
            .as_str()
            .unwrap()
            .starts_with("preview_")
    );

    let (status, _) = send(
        &t.app,
        get("/preview-config/00000000-0000-4000-8000-000000000000"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_callback_save_overwrites_document() {
    let t = test_app(|_| {});
    let id = upload(&t.app, "report.docx", b"original").await;

    let claims = json!({
        "key": format!("edit_{id}_1"),
        "status": 2,
        "url": "http://documentserver/cache/saved.docx",
    });
    let token = sign_payload(&claims, SECRET).unwrap();

    let (status, body) = send_json(&t.app, callback(&id, json!({"status": 2, "token": token}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": 0}));
    assert_eq!(
        t.fetcher.requested(),
        vec!["http://documentserver/cache/saved.docx".to_string()]
    );

    let (_, content) = send(&t.app, get(&format!("/download/{id}"))).await;
    assert_eq!(&content[..], b"edited by the document server");

    let (_, files) = send_json(&t.app, get("/files")).await;
    assert_eq!(files[0]["size"], 29);
}

#[tokio::test]
async fn test_callback_non_save_status_is_acknowledged() {
    let t = test_app(|tree| tree["onlyoffice"]["jwt_enabled"] = json!(false));
    let id = upload(&t.app, "report.docx", b"original").await;

    let (status, body) = send_json(
        &t.app,
        callback(&id, json!({"status": 6, "url": "http://documentserver/x"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], 0);
    assert!(t.fetcher.requested().is_empty());

    let (_, content) = send(&t.app, get(&format!("/download/{id}"))).await;
    assert_eq!(&content[..], b"original");
}

#[tokio::test]
async fn test_callback_invalid_token() {
    let t = test_app(|_| {});
    let id = upload(&t.app, "report.docx", b"original").await;

    let forged = sign_payload(&json!({"status": 2, "url": "http://evil/x"}), "wrong").unwrap();
    let (status, body) = send_json(
        &t.app,
        callback(&id, json!({"status": 2, "url": "http://evil/x", "token": forged})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": 1, "message": "Invalid token"}));
    assert!(t.fetcher.requested().is_empty());
}

#[tokio::test]
async fn test_callback_unreadable_body() {
    let t = test_app(|_| {});

    let (status, body) = send_json(
        &t.app,
        Request::builder()
            .method("POST")
            .uri("/callback/whatever")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], 1);
}

#[tokio::test]
async fn test_client_config_and_pages() {
    let t = test_app(|tree| tree["ui"]["title"] = json!("Team Docs"));

    let (status, config) = send_json(&t.app, get("/config")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["server"]["url"], "http://bridge.test:8000");
    assert_eq!(config["ui"]["title"], "Team Docs");
    assert_eq!(config["storage"]["max_file_size"], defaults::MAX_FILE_SIZE);
    assert!(config.get("onlyoffice").unwrap().get("secret").is_none());

    let (status, page) = send(&t.app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&page[..], b"<h1>files</h1>");

    let (status, _) = send(&t.app, get("/editor")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_health_and_request_id() {
    let t = test_app(|_| {});

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["jwt"], "enabled");
}

#[tokio::test]
async fn test_rejected_upload_over_tcp_returns_json_error() {
    let t = test_app(|tree| tree["storage"]["max_file_size"] = json!(8));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = t.app.clone();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"big.docx\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&vec![b'x'; 2 * 1024 * 1024]);
    body.extend_from_slice(
        format!(
            "\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\ntrailing field\r\n--{BOUNDARY}--\r\n"
        )
        .as_bytes(),
    );

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/upload"))
        .header(
            reqwest::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);
    let error: Value = response.json().await.unwrap();
    assert!(error["error"].as_str().unwrap().contains("maximum allowed size"));

    let leftovers = std::fs::read_dir(t.dir.path().join("uploads")).unwrap().count();
    assert_eq!(leftovers, 0);
}

/// Records the `request_id` field of every `http_request` span.
struct SpanRequestIds(Arc<Mutex<Vec<String>>>);

struct RequestIdVisitor<'a>(&'a mut Option<String>);

impl tracing::field::Visit for RequestIdVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "request_id" {
            *self.0 = Some(format!("{:?}", value));
        }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for SpanRequestIds {
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if attrs.metadata().name() != "http_request" {
            return;
        }
        let mut request_id = None;
        attrs.record(&mut RequestIdVisitor(&mut request_id));
        if let Some(request_id) = request_id {
            self.0.lock().unwrap().push(request_id);
        }
    }
}

#[tokio::test]
async fn test_trace_span_logs_minted_request_id() {
    use tracing_subscriber::layer::SubscriberExt;

    let recorded = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(SpanRequestIds(recorded.clone()));
    let _guard = tracing::subscriber::set_default(subscriber);

    let t = test_app(|_| {});
    let response = t.app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let minted = response.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&minted).is_ok());
    assert_eq!(*recorded.lock().unwrap(), vec![minted]);
}
