pub mod defaults;
pub mod env;

pub use env::{EnvSource, EnvValue, ProcessEnv};

use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Layered configuration: a JSON tree persisted on disk, shadowed key by key
/// by environment variables (`server.host` -> `SERVER_HOST`).
///
/// Overrides are consulted on every read but never written back; `set` and
/// `save` only touch the file-backed tree.
pub struct ConfigStore {
    path: PathBuf,
    tree: Value,
    env: Arc<dyn EnvSource>,
}

impl ConfigStore {
    /// Load from `path`, reading overrides from the process environment.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        Self::load_with_env(path, Arc::new(ProcessEnv))
    }

    pub fn load_with_env(path: impl Into<PathBuf>, env: Arc<dyn EnvSource>) -> Self {
        let mut store = Self {
            path: path.into(),
            tree: defaults::default_tree(),
            env,
        };
        store.reload();
        store
    }

    /// Build a store around an in-memory tree without touching disk.
    pub fn from_tree(path: impl Into<PathBuf>, tree: Value, env: Arc<dyn EnvSource>) -> Self {
        Self {
            path: path.into(),
            tree,
            env,
        }
    }

    /// Re-read the configuration file. Never fails: an unreadable or corrupt
    /// file leaves the default tree in place, a missing one is created.
    pub fn reload(&mut self) {
        match fs::read_to_string(&self.path) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(tree @ Value::Object(_)) => {
                    self.tree = tree;
                    info!("✅ Configuration loaded from {}", self.path.display());
                }
                Ok(_) => {
                    error!(
                        "❌ Configuration file {} is not a JSON object, using defaults",
                        self.path.display()
                    );
                    self.tree = defaults::default_tree();
                }
                Err(e) => {
                    error!(
                        "❌ Failed to parse configuration file {}: {}",
                        self.path.display(),
                        e
                    );
                    self.tree = defaults::default_tree();
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "⚠️  Configuration file {} not found, writing defaults",
                    self.path.display()
                );
                self.tree = defaults::default_tree();
                self.save();
            }
            Err(e) => {
                error!(
                    "❌ Failed to read configuration file {}: {}",
                    self.path.display(),
                    e
                );
                self.tree = defaults::default_tree();
            }
        }
    }

    /// Persist the file-backed tree. Returns whether the write succeeded;
    /// failures are logged and otherwise ignored.
    pub fn save(&self) -> bool {
        match self.try_save() {
            Ok(()) => {
                info!("✅ Configuration saved to {}", self.path.display());
                true
            }
            Err(e) => {
                error!(
                    "❌ Failed to save configuration to {}: {}",
                    self.path.display(),
                    e
                );
                false
            }
        }
    }

    fn try_save(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.tree)?;
        fs::write(&self.path, text)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file-backed tree, without environment overrides applied.
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// Resolve `dotted_key`, override first, then the tree.
    pub fn get(&self, dotted_key: &str, default: Value) -> Value {
        self.lookup(dotted_key).unwrap_or(default)
    }

    pub fn lookup(&self, dotted_key: &str) -> Option<Value> {
        if let Some(raw) = self.env.var(&env::env_key(dotted_key)) {
            return Some(EnvValue::parse(&raw).into_json());
        }
        self.file_value(dotted_key).cloned()
    }

    /// Walk the tree only. Stops at the first missing segment or non-object
    /// intermediate.
    pub fn file_value(&self, dotted_key: &str) -> Option<&Value> {
        dotted_key
            .split('.')
            .try_fold(&self.tree, |node, segment| node.as_object()?.get(segment))
    }

    /// Assign `value` at `dotted_key`, creating intermediate objects as
    /// needed. A scalar sitting where an object is required gets replaced.
    pub fn set(&mut self, dotted_key: &str, value: Value) {
        let mut segments: Vec<&str> = dotted_key.split('.').collect();
        let Some(leaf) = segments.pop() else {
            return;
        };

        let mut node = &mut self.tree;
        for segment in segments {
            node = ensure_object(node)
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        ensure_object(node).insert(leaf.to_string(), value);
    }

    /// String-valued key. Overrides are taken verbatim so that a numeric
    /// looking secret is not reformatted.
    pub fn get_str(&self, dotted_key: &str, default: &str) -> String {
        if let Some(raw) = self.env.var(&env::env_key(dotted_key)) {
            return raw;
        }
        match self.file_value(dotted_key) {
            Some(Value::String(s)) => s.clone(),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
            _ => default.to_string(),
        }
    }

    pub fn get_bool(&self, dotted_key: &str, default: bool) -> bool {
        match self.lookup(dotted_key) {
            Some(Value::Bool(b)) => b,
            Some(other) => {
                debug!("{} is not a boolean ({}), using {}", dotted_key, other, default);
                default
            }
            None => default,
        }
    }

    pub fn get_u64(&self, dotted_key: &str, default: u64) -> u64 {
        self.lookup(dotted_key)
            .and_then(|v| v.as_u64())
            .unwrap_or(default)
    }

    pub fn get_string_list(&self, dotted_key: &str, default: &[&str]) -> Vec<String> {
        match self.lookup(dotted_key) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => default.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn server_host(&self) -> String {
        self.get_str("server.host", defaults::SERVER_HOST)
    }

    pub fn server_port(&self) -> u16 {
        u16::try_from(self.get_u64("server.port", u64::from(defaults::SERVER_PORT)))
            .unwrap_or(defaults::SERVER_PORT)
    }

    /// Base URL the document server uses to reach this backend.
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host(), self.server_port())
    }

    pub fn static_directory(&self) -> PathBuf {
        PathBuf::from(self.get_str("server.static_directory", defaults::STATIC_DIRECTORY))
    }

    pub fn onlyoffice_server_url(&self) -> String {
        self.get_str("onlyoffice.server_url", defaults::ONLYOFFICE_SERVER_URL)
    }

    pub fn onlyoffice_secret(&self) -> String {
        self.get_str("onlyoffice.secret", defaults::ONLYOFFICE_SECRET)
    }

    pub fn onlyoffice_api_js_url(&self) -> String {
        let fallback = format!(
            "{}{}",
            self.onlyoffice_server_url().trim_end_matches('/'),
            defaults::ONLYOFFICE_API_JS_PATH
        );
        self.get_str("onlyoffice.api_js_url", &fallback)
    }

    pub fn jwt_enabled(&self) -> bool {
        self.get_bool("onlyoffice.jwt_enabled", true)
    }

    /// The secret to sign outgoing configs with, when signing applies.
    pub fn signing_secret(&self) -> Option<String> {
        let secret = self.onlyoffice_secret();
        (self.jwt_enabled() && !secret.is_empty()).then_some(secret)
    }

    pub fn upload_directory(&self) -> PathBuf {
        PathBuf::from(self.get_str("storage.upload_directory", defaults::UPLOAD_DIRECTORY))
    }

    pub fn allowed_extensions(&self) -> Vec<String> {
        self.get_string_list("storage.allowed_extensions", &defaults::ALLOWED_EXTENSIONS)
    }

    pub fn max_file_size(&self) -> usize {
        usize::try_from(self.get_u64("storage.max_file_size", defaults::MAX_FILE_SIZE as u64))
            .unwrap_or(defaults::MAX_FILE_SIZE)
    }

    pub fn ui_title(&self) -> String {
        self.get_str("ui.title", defaults::UI_TITLE)
    }

    pub fn ui_subtitle(&self) -> String {
        self.get_str("ui.subtitle", defaults::UI_SUBTITLE)
    }

    pub fn ui_language(&self) -> String {
        self.get_str("ui.language", defaults::UI_LANGUAGE)
    }

    pub fn editor_user_id(&self) -> String {
        self.get_str("editor.default_user_id", defaults::EDITOR_USER_ID)
    }

    pub fn editor_user_name(&self) -> String {
        self.get_str("editor.default_user_name", defaults::EDITOR_USER_NAME)
    }

    /// Boolean switch under `editor.*`, e.g. `auto_save` or `comments`.
    pub fn editor_flag(&self, name: &str, default: bool) -> bool {
        self.get_bool(&format!("editor.{name}"), default)
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64("network.timeout", defaults::NETWORK_TIMEOUT_SECS))
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.get_string_list("security.cors_origins", &["*"])
    }

    pub fn cors_methods(&self) -> Vec<String> {
        self.get_string_list("security.cors_methods", &["*"])
    }

    pub fn cors_headers(&self) -> Vec<String> {
        self.get_string_list("security.cors_headers", &["*"])
    }

    pub fn cors_credentials(&self) -> bool {
        self.get_bool("security.cors_credentials", true)
    }

    /// Required keys that resolve to nothing.
    pub fn missing_required_keys(&self) -> Vec<&'static str> {
        defaults::REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| matches!(self.lookup(key), None | Some(Value::Null)))
            .collect()
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}
