use serde_json::{Value, json};

pub const SERVER_HOST: &str = "127.0.0.1";
pub const SERVER_PORT: u16 = 8000;
pub const STATIC_DIRECTORY: &str = "static";

pub const ONLYOFFICE_SERVER_URL: &str = "http://127.0.0.1:8080";
/// Development fallback; deployments are expected to override it.
pub const ONLYOFFICE_SECRET: &str = "secret";
pub const ONLYOFFICE_API_JS_PATH: &str = "/web-apps/apps/api/documents/api.js";

pub const UPLOAD_DIRECTORY: &str = "uploads";
pub const MAX_FILE_SIZE: usize = 100 * 1024 * 1024; // 100 MB
pub const ALLOWED_EXTENSIONS: [&str; 8] = [
    ".docx", ".xlsx", ".pptx", ".doc", ".xls", ".ppt", ".txt", ".pdf",
];

pub const UI_LANGUAGE: &str = "en";
pub const UI_TITLE: &str = "OnlyOffice Document Editor";
pub const UI_SUBTITLE: &str = "Online document editing and collaboration";

pub const EDITOR_USER_ID: &str = "user1";
pub const EDITOR_USER_NAME: &str = "User";

pub const NETWORK_TIMEOUT_SECS: u64 = 30;

/// Keys that must resolve for the server to be usable.
pub const REQUIRED_KEYS: [&str; 5] = [
    "server.host",
    "server.port",
    "onlyoffice.server_url",
    "onlyoffice.secret",
    "storage.upload_directory",
];

/// The tree written to disk when no configuration file exists yet.
pub fn default_tree() -> Value {
    json!({
        "server": {
            "host": SERVER_HOST,
            "port": SERVER_PORT,
            "debug": false,
            "static_directory": STATIC_DIRECTORY
        },
        "onlyoffice": {
            "server_url": ONLYOFFICE_SERVER_URL,
            "secret": ONLYOFFICE_SECRET,
            "api_js_url": format!("{ONLYOFFICE_SERVER_URL}{ONLYOFFICE_API_JS_PATH}"),
            "jwt_enabled": true
        },
        "storage": {
            "upload_directory": UPLOAD_DIRECTORY,
            "max_file_size": MAX_FILE_SIZE,
            "allowed_extensions": ALLOWED_EXTENSIONS
        },
        "security": {
            "cors_origins": ["*"],
            "cors_credentials": true,
            "cors_methods": ["*"],
            "cors_headers": ["*"]
        },
        "ui": {
            "language": UI_LANGUAGE,
            "title": UI_TITLE,
            "subtitle": UI_SUBTITLE,
            "theme": "default"
        },
        "editor": {
            "default_user_id": EDITOR_USER_ID,
            "default_user_name": EDITOR_USER_NAME,
            "auto_save": true,
            "collaborative": true,
            "comments": true,
            "download": true,
            "print": true
        },
        "network": {
            "timeout": NETWORK_TIMEOUT_SECS,
            "retry_attempts": 3,
            "connection_check_interval": 5000
        }
    })
}
