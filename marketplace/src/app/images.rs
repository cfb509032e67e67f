//! Offer photo storage.
//!
//! Image hosting is an external concern; the marketplace only needs a URL
//! back for an uploaded file.

use crate::error::{MarketError, MarketResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use uuid::Uuid;

/// An uploaded image.
#[derive(Clone, Debug)]
pub struct ImageUpload {
    /// MIME type sent by the client
    pub content_type: Option<String>,
    /// File contents
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// File extension for the upload's MIME type.
    ///
    /// # Errors
    ///
    /// [`MarketError::Validation`] for empty files and non-image types.
    pub fn extension(&self) -> MarketResult<&'static str> {
        if self.bytes.is_empty() {
            return Err(MarketError::Validation("Book image is empty".to_string()));
        }
        match self.content_type.as_deref() {
            Some("image/jpeg" | "image/jpg") => Ok("jpg"),
            Some("image/png") => Ok("png"),
            Some("image/webp") => Ok("webp"),
            Some("image/gif") => Ok("gif"),
            other => Err(MarketError::Validation(format!(
                "Unsupported image type: {}",
                other.unwrap_or("unknown")
            ))),
        }
    }
}

/// Stores uploads and returns their public URL.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `upload` and return where it can be fetched
    async fn store(&self, upload: ImageUpload) -> MarketResult<String>;
}

/// Writes uploads to a directory served under `public_base`.
#[derive(Clone, Debug)]
pub struct LocalImageStore {
    dir: PathBuf,
    public_base: String,
}

impl LocalImageStore {
    /// Creates a new `LocalImageStore`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, upload: ImageUpload) -> MarketResult<String> {
        let file_name = format!("{}.{}", Uuid::new_v4(), upload.extension()?);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MarketError::Storage(format!("cannot create upload dir: {e}")))?;
        tokio::fs::write(self.dir.join(&file_name), &upload.bytes)
            .await
            .map_err(|e| MarketError::Storage(format!("cannot write upload: {e}")))?;

        tracing::debug!(file = %file_name, bytes = upload.bytes.len(), "Offer image stored");
        Ok(format!("{}/{file_name}", self.public_base))
    }
}

/// Keeps uploads in memory. For tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryImageStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryImageStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored files
    pub async fn file_count(&self) -> usize {
        self.files.read().await.len()
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn store(&self, upload: ImageUpload) -> MarketResult<String> {
        let file_name = format!("{}.{}", Uuid::new_v4(), upload.extension()?);
        self.files.write().await.insert(file_name.clone(), upload.bytes);
        Ok(format!("memory://{file_name}"))
    }
}
