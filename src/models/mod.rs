pub mod session;

pub use session::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Metadata sidecar stored next to every uploaded binary as `{id}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileRecord {
    pub id: String,
    pub original_name: String,
    pub stored_name: String,
    pub upload_time: DateTime<Utc>,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Lowercased extension of the original name including the dot, or "".
    pub fn extension(&self) -> String {
        crate::utils::validation::extension_of(&self.original_name).to_lowercase()
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            id: self.id.clone(),
            name: self.original_name.clone(),
            upload_time: self.upload_time,
            size: self.size,
        }
    }
}

/// Entry of `GET /files`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileSummary {
    pub id: String,
    pub name: String,
    pub upload_time: DateTime<Utc>,
    pub size: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileActionResponse {
    pub message: String,
    pub file_id: String,
}

/// Body posted by the document server to `/callback/{id}`.
///
/// Only the fields this backend acts on are modelled; anything else the
/// document server sends is ignored.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CallbackPayload {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub users: Vec<String>,
}

impl CallbackPayload {
    /// Document is ready for saving.
    pub const STATUS_READY_FOR_SAVE: i64 = 2;
}

/// Envelope the document server expects back from a callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CallbackResponse {
    pub error: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CallbackResponse {
    pub fn ok() -> Self {
        Self {
            error: 0,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: 1,
            message: Some(message.into()),
        }
    }
}

/// Client-facing subset of the configuration served at `GET /config`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClientConfig {
    pub server: ClientServer,
    pub onlyoffice: ClientOnlyOffice,
    pub ui: ClientUi,
    pub storage: ClientStorage,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClientServer {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClientOnlyOffice {
    pub api_js_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClientUi {
    pub title: String,
    pub subtitle: String,
    pub language: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClientStorage {
    pub allowed_extensions: Vec<String>,
    pub max_file_size: usize,
}
