use crate::api::error::AppError;
use crate::config::ConfigStore;
use crate::models::{FileRecord, FileSummary};
use crate::utils::validation::{extension_of, is_valid_file_id, sanitize_filename};
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};
use uuid::Uuid;

const SIDECAR_EXTENSION: &str = "json";

/// Uploaded binaries plus one JSON sidecar each, all in a single directory.
///
/// Layout: `{root}/{id}{ext}` holds the bytes, `{root}/{id}.json` the
/// [`FileRecord`]. The binary is always written before its sidecar and removed
/// before it, so a sidecar never outlives a successful delete.
pub struct FileStore {
    root: PathBuf,
    max_file_size: usize,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, max_file_size: usize) -> Self {
        Self {
            root: root.into(),
            max_file_size,
        }
    }

    pub fn from_config(config: &ConfigStore) -> Self {
        Self::new(config.upload_directory(), config.max_file_size())
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn sidecar_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.{SIDECAR_EXTENSION}"))
    }

    fn binary_path(&self, record: &FileRecord) -> PathBuf {
        // Only the final component of a sidecar-provided name is trusted
        let name = Path::new(&record.stored_name)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        self.root.join(name)
    }

    /// Store a new upload streamed from `reader`.
    pub async fn upload<R>(&self, filename: &str, reader: R) -> Result<FileRecord, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let original_name = sanitize_filename(filename)?;
        let extension = extension_of(&original_name);
        if extension.eq_ignore_ascii_case(".json") {
            return Err(AppError::BadRequest(
                "JSON files cannot be uploaded".to_string(),
            ));
        }

        self.ensure_root().await?;

        let id = Uuid::new_v4().to_string();
        let stored_name = format!("{id}{extension}");
        let binary_path = self.root.join(&stored_name);

        let size = match self.write_binary(&binary_path, reader).await {
            Ok(size) => size,
            Err(e) => {
                let _ = fs::remove_file(&binary_path).await;
                return Err(e);
            }
        };

        let record = FileRecord {
            id,
            original_name,
            stored_name,
            upload_time: Utc::now(),
            size,
            last_modified: None,
        };

        if let Err(e) = self.write_sidecar(&record).await {
            warn!("⚠️  Sidecar write failed for {}, removing binary", record.id);
            let _ = fs::remove_file(&binary_path).await;
            return Err(e);
        }

        info!(
            "📄 Stored '{}' as {} ({} bytes)",
            record.original_name, record.stored_name, record.size
        );
        Ok(record)
    }

    async fn write_binary<R>(&self, path: &Path, reader: R) -> Result<u64, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let limit = self.max_file_size as u64;
        let mut file = fs::File::create(path).await?;
        let mut limited = reader.take(limit + 1);
        let written = tokio::io::copy(&mut limited, &mut file).await?;

        if written > limit {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds the maximum allowed size of {} bytes",
                limit
            )));
        }

        file.flush().await?;
        Ok(written)
    }

    async fn write_sidecar(&self, record: &FileRecord) -> Result<(), AppError> {
        let body = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.sidecar_path(&record.id), &body).await
    }

    /// Summaries of every readable sidecar, newest upload first. Sidecars that
    /// fail to read or parse are logged and left out.
    pub async fn list(&self) -> Result<Vec<FileSummary>, AppError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SIDECAR_EXTENSION) {
                continue;
            }

            match read_record(&path).await {
                Ok(record) => files.push(record.summary()),
                Err(e) => warn!("⚠️  Skipping unreadable sidecar {}: {}", path.display(), e),
            }
        }

        files.sort_by(|a, b| b.upload_time.cmp(&a.upload_time));
        Ok(files)
    }

    pub async fn get(&self, id: &str) -> Result<FileRecord, AppError> {
        if !is_valid_file_id(id) {
            return Err(AppError::file_not_found());
        }

        match read_record(&self.sidecar_path(id)).await {
            Err(AppError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                Err(AppError::file_not_found())
            }
            other => other,
        }
    }

    /// Open the stored binary for streaming.
    pub async fn download(&self, id: &str) -> Result<(fs::File, FileRecord), AppError> {
        let record = self.get(id).await?;
        match fs::File::open(self.binary_path(&record)).await {
            Ok(file) => Ok((file, record)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("⚠️  Sidecar {} has no binary {}", id, record.stored_name);
                Err(AppError::file_not_found())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the binary (if still there) and then the sidecar.
    pub async fn delete(&self, id: &str) -> Result<FileRecord, AppError> {
        let record = self.get(id).await?;

        match fs::remove_file(self.binary_path(&record)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("⚠️  Binary {} already missing on delete", record.stored_name);
            }
            Err(e) => return Err(e.into()),
        }

        match fs::remove_file(self.sidecar_path(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(AppError::file_not_found()),
            Err(e) => return Err(e.into()),
        }

        info!("🗑️  Deleted '{}' ({})", record.original_name, id);
        Ok(record)
    }

    /// Replace the stored bytes after an editor save and stamp `last_modified`.
    pub async fn touch_modified(&self, id: &str, content: &[u8]) -> Result<FileRecord, AppError> {
        let mut record = self.get(id).await?;
        if content.len() > self.max_file_size {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds the maximum allowed size of {} bytes",
                self.max_file_size
            )));
        }

        write_atomic(&self.binary_path(&record), content).await?;

        record.size = content.len() as u64;
        record.last_modified = Some(Utc::now());
        self.write_sidecar(&record).await?;

        info!(
            "💾 Saved new revision of '{}' ({} bytes)",
            record.original_name, record.size
        );
        Ok(record)
    }
}

async fn read_record(path: &Path) -> Result<FileRecord, AppError> {
    let bytes = fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Write via a sibling temp file and rename, so readers never see a
/// half-written file.
async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), AppError> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    if let Err(e) = fs::write(&tmp, content).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    fs::rename(&tmp, path).await?;
    Ok(())
}
