use crate::api::error::AppError;
use crate::config::ConfigStore;
use crate::models::{
    CoEditing, Customization, DocumentInfo, DocumentType, EditorConfig, EditorUser, Embedded,
    FileRecord, Permissions, SessionConfig, SessionMode,
};
use crate::services::file_store::FileStore;
use crate::utils::auth::sign_payload;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Hands out epoch-second stamps that never repeat: each stamp is at least
/// the current second and strictly above the previous one.
#[derive(Debug, Default)]
pub struct SessionKeyIssuer {
    last: AtomicU64,
}

impl SessionKeyIssuer {
    pub fn next_stamp(&self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                Some(now.max(prev + 1))
            })
            .unwrap_or_else(|prev| prev);
        now.max(previous + 1)
    }
}

/// Builds the `DocEditor` configuration for an uploaded file.
pub struct SessionConfigService {
    config: Arc<ConfigStore>,
    files: Arc<FileStore>,
    keys: SessionKeyIssuer,
}

impl SessionConfigService {
    pub fn new(config: Arc<ConfigStore>, files: Arc<FileStore>) -> Self {
        Self {
            config,
            files,
            keys: SessionKeyIssuer::default(),
        }
    }

    pub async fn build(&self, file_id: &str, mode: SessionMode) -> Result<SessionConfig, AppError> {
        let record = self.files.get(file_id).await?;
        let mut session = self.assemble(&record, mode);

        match self.config.signing_secret() {
            Some(secret) => {
                // token is still None here, so it is not part of the payload
                let token = sign_payload(&session, &secret).map_err(|e| {
                    AppError::Internal(format!("Failed to sign session config: {}", e))
                })?;
                session.token = Some(token);
                debug!("🔏 Signed {} config for {}", mode.key_prefix(), file_id);
            }
            None => {
                debug!(
                    "Unsigned {} config for {} (jwt_enabled={}, secret set={})",
                    mode.key_prefix(),
                    file_id,
                    self.config.jwt_enabled(),
                    !self.config.onlyoffice_secret().is_empty()
                );
            }
        }

        Ok(session)
    }

    fn assemble(&self, record: &FileRecord, mode: SessionMode) -> SessionConfig {
        let extension = record.extension();
        let server_url = self.config.server_url();

        let document = DocumentInfo {
            file_type: extension.trim_start_matches('.').to_string(),
            key: format!(
                "{}_{}_{}",
                mode.key_prefix(),
                record.id,
                self.keys.next_stamp()
            ),
            title: record.original_name.clone(),
            url: format!("{}/download/{}", server_url, record.id),
            permissions: self.permissions(mode),
        };

        let editor_config = match mode {
            SessionMode::Edit => self.edit_profile(&server_url, &record.id),
            SessionMode::Preview => self.preview_profile(),
        };

        SessionConfig {
            document,
            document_type: DocumentType::from_extension(&extension),
            editor_config,
            width: "100%".to_string(),
            height: "600px".to_string(),
            token: None,
        }
    }

    fn user(&self) -> EditorUser {
        EditorUser {
            id: self.config.editor_user_id(),
            name: self.config.editor_user_name(),
        }
    }

    fn permissions(&self, mode: SessionMode) -> Permissions {
        let editing = mode == SessionMode::Edit;
        Permissions {
            edit: editing,
            download: self.config.editor_flag("download", true),
            print: self.config.editor_flag("print", true),
            comment: editing && self.config.editor_flag("comments", true),
        }
    }

    fn edit_profile(&self, server_url: &str, file_id: &str) -> EditorConfig {
        let collaborative = self.config.editor_flag("collaborative", true);

        EditorConfig {
            mode: "edit".to_string(),
            callback_url: Some(format!("{}/callback/{}", server_url, file_id)),
            lang: self.config.ui_language(),
            user: self.user(),
            customization: Customization {
                autosave: self.config.editor_flag("auto_save", true),
                comments: self.config.editor_flag("comments", true),
                chat: collaborative,
                compact_toolbar: false,
                toolbar_no_tabs: false,
                help: true,
                hide_right_menu: false,
                hide_rulers: false,
                plugins: true,
                macros: true,
                integration_mode: None,
                zoom: None,
                goback: None,
            },
            co_editing: Some(CoEditing {
                mode: if collaborative { "fast" } else { "strict" }.to_string(),
                change: true,
            }),
            embedded: None,
        }
    }

    /// Read-only profile; not influenced by `editor.*` switches.
    fn preview_profile(&self) -> EditorConfig {
        EditorConfig {
            mode: "view".to_string(),
            callback_url: None,
            lang: self.config.ui_language(),
            user: self.user(),
            customization: Customization {
                autosave: false,
                comments: false,
                chat: false,
                compact_toolbar: true,
                toolbar_no_tabs: true,
                help: false,
                hide_right_menu: true,
                hide_rulers: true,
                plugins: false,
                macros: false,
                integration_mode: Some("embed".to_string()),
                zoom: Some(100),
                goback: Some(false),
            },
            co_editing: None,
            embedded: Some(Embedded {
                save_url: String::new(),
                embed_url: String::new(),
                share_url: String::new(),
                toolbar_docked: "top".to_string(),
            }),
        }
    }
}
