use crate::api::error::AppError;
use crate::config::ConfigStore;
use crate::models::{CallbackPayload, CallbackResponse};
use crate::services::fetcher::DocumentFetcher;
use crate::services::file_store::FileStore;
use crate::utils::auth::verify_token;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Processes save notifications from the document server.
pub struct CallbackService {
    config: Arc<ConfigStore>,
    files: Arc<FileStore>,
    fetcher: Arc<dyn DocumentFetcher>,
}

impl CallbackService {
    pub fn new(
        config: Arc<ConfigStore>,
        files: Arc<FileStore>,
        fetcher: Arc<dyn DocumentFetcher>,
    ) -> Self {
        Self {
            config,
            files,
            fetcher,
        }
    }

    /// Always produces the document server's envelope; errors never escape.
    pub async fn handle(&self, file_id: &str, payload: CallbackPayload) -> CallbackResponse {
        match self.process(file_id, payload).await {
            Ok(()) => CallbackResponse::ok(),
            Err(AppError::InvalidToken(e)) => {
                warn!("🚫 Callback token for {} rejected: {}", file_id, e);
                CallbackResponse::failure("Invalid token")
            }
            Err(e) => {
                error!("❌ Callback for {} failed: {}", file_id, e);
                CallbackResponse::failure(e.to_string())
            }
        }
    }

    async fn process(&self, file_id: &str, payload: CallbackPayload) -> Result<(), AppError> {
        info!(
            "📨 Callback for {}: status={} key={:?} users={:?}",
            file_id, payload.status, payload.key, payload.users
        );

        let payload = self.authenticate(payload)?;

        if payload.status != CallbackPayload::STATUS_READY_FOR_SAVE {
            debug!("Status {} for {} needs no action", payload.status, file_id);
            return Ok(());
        }

        let Some(url) = payload.url.as_deref().filter(|u| !u.is_empty()) else {
            warn!("⚠️  Save callback for {} carried no url", file_id);
            return Ok(());
        };

        match self.files.get(file_id).await {
            Ok(_) => {}
            Err(AppError::NotFound(_)) => {
                warn!("⚠️  Save callback for unknown file {}, ignoring", file_id);
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        info!("⬇️  Downloading saved document for {} from {}", file_id, url);
        let limit = self.files.max_file_size();
        let content = match self.fetcher.fetch(url, limit).await {
            Ok(content) if content.len() <= limit => content,
            Ok(content) => {
                warn!(
                    "⚠️  Saved document for {} is {} bytes, over the {} byte limit",
                    file_id,
                    content.len(),
                    limit
                );
                return Ok(());
            }
            Err(e) => {
                // The document server retries the callback later
                warn!("⚠️  Could not fetch saved document for {}: {}", file_id, e);
                return Ok(());
            }
        };

        self.files.touch_modified(file_id, &content).await?;
        Ok(())
    }

    /// Verify the body token when JWT is enabled. Once a token verifies only
    /// its claims are used; the unsigned body fields are ignored.
    fn authenticate(&self, mut payload: CallbackPayload) -> Result<CallbackPayload, AppError> {
        if !self.config.jwt_enabled() {
            return Ok(payload);
        }
        let Some(token) = payload.token.take() else {
            return Ok(payload);
        };

        let claims = verify_token(&token, &self.config.onlyoffice_secret())?;
        debug!("JWT token verified");

        serde_json::from_value::<CallbackPayload>(claims)
            .map_err(|e| AppError::BadRequest(format!("Malformed token claims: {}", e)))
    }
}
