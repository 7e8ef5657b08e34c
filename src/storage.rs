use crate::collection::Collection;
use crate::error::AppError;
use crate::models::{BinaryPayload, UploadContent, UploadInput, UploadRecord};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

const UPLOADS_FILE: &str = "uploads.json";

/// Public URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

pub struct UploadStorage {
    records: Collection<UploadRecord>,
    upload_dir: PathBuf,
}

impl UploadStorage {
    pub fn new(data_dir: &Path, upload_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(upload_dir)
            .with_context(|| format!("Failed to create {}", upload_dir.display()))?;

        Ok(Self {
            records: Collection::open(data_dir.join(UPLOADS_FILE))?,
            upload_dir: upload_dir.to_path_buf(),
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub async fn submit(&self, input: UploadInput) -> Result<UploadRecord, AppError> {
        let content = if let Some(file) = input.file {
            self.store_binary(file).await?
        } else if let Some(text) = input.text.filter(|t| !t.is_empty()) {
            UploadContent::Text { text }
        } else {
            return Err(AppError::NoContent);
        };

        let record = UploadRecord::new(content, input.uploaded_by);

        let mut records = self.records.write().await;
        self.records.push_and_save(&mut records, record.clone()).await?;

        tracing::info!(
            id = %record.id,
            kind = ?record.kind(),
            uploaded_by = %record.uploaded_by,
            "Stored upload"
        );
        Ok(record)
    }

    /// Every record, newest first. Records with equal timestamps keep the
    /// later insertion first.
    pub async fn list_all(&self) -> Vec<UploadRecord> {
        let records = self.records.read().await;
        let mut all: Vec<UploadRecord> = records.iter().rev().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    async fn store_binary(&self, file: BinaryPayload) -> Result<UploadContent> {
        let stored_name = stored_file_name(Utc::now().timestamp_millis(), &file.original_name);
        let path = self.upload_dir.join(&stored_name);

        tokio::fs::write(&path, &file.data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::debug!(path = %path.display(), bytes = file.data.len(), "Wrote upload to disk");

        Ok(UploadContent::stored(
            &file.content_type,
            file.original_name,
            format!("{}/{}", PUBLIC_PREFIX, stored_name),
        ))
    }
}

/// `<millis>-<name>`, keeping only the last path component of the client name.
pub fn stored_file_name(millis: i64, original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty() && *part != "." && *part != "..")
        .unwrap_or("upload");
    format!("{}-{}", millis, base)
}
