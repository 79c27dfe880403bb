use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which editor profile a session config is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Edit,
    Preview,
}

impl SessionMode {
    pub fn key_prefix(self) -> &'static str {
        match self {
            SessionMode::Edit => "edit",
            SessionMode::Preview => "preview",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Word,
    Cell,
    Slide,
}

impl DocumentType {
    /// `ext` is the lowercased extension with its leading dot.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            ".xlsx" | ".xls" => DocumentType::Cell,
            ".pptx" | ".ppt" => DocumentType::Slide,
            _ => DocumentType::Word,
        }
    }
}

/// Configuration object handed to the document server's `DocEditor`.
///
/// When signing is active the whole object, minus `token`, is the JWT
/// payload and the token is embedded back into the same object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub document: DocumentInfo,
    pub document_type: DocumentType,
    pub editor_config: EditorConfig,
    pub width: String,
    pub height: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub file_type: String,
    pub key: String,
    pub title: String,
    pub url: String,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Permissions {
    pub edit: bool,
    pub download: bool,
    pub print: bool,
    pub comment: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub lang: String,
    pub user: EditorUser,
    pub customization: Customization,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co_editing: Option<CoEditing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded: Option<Embedded>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EditorUser {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customization {
    pub autosave: bool,
    pub comments: bool,
    pub chat: bool,
    pub compact_toolbar: bool,
    pub toolbar_no_tabs: bool,
    pub help: bool,
    pub hide_right_menu: bool,
    pub hide_rulers: bool,
    pub plugins: bool,
    pub macros: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goback: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CoEditing {
    pub mode: String,
    pub change: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Embedded {
    pub save_url: String,
    pub embed_url: String,
    pub share_url: String,
    pub toolbar_docked: String,
}
