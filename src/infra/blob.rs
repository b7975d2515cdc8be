//! Upload storage behind a trait so the HTTP layer never touches the filesystem directly.

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub name: String,
    pub url: String,
    pub size: usize,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, filename: &str, bytes: &[u8]) -> AppResult<StoredBlob>;
}

/// Writes uploads into a local directory that the router also serves under `/uploads`.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Keeps the final path component only, restricted to `[A-Za-z0-9._-]`.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let base = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, filename: &str, bytes: &[u8]) -> AppResult<StoredBlob> {
        let clean = sanitize_filename(filename)
            .ok_or_else(|| AppError::validation("filename must not be empty"))?;
        let prefix: [u8; 8] = rand::random();
        let name = format!("{}-{}", hex::encode(prefix), clean);

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Internal(format!("create upload dir: {}", e)))?;
        tokio::fs::write(self.root.join(&name), bytes)
            .await
            .map_err(|e| AppError::Internal(format!("write upload: {}", e)))?;

        tracing::info!(file = %name, size = bytes.len(), "stored upload");
        Ok(StoredBlob {
            url: format!("{}/uploads/{}", self.public_base_url, name),
            name,
            size: bytes.len(),
        })
    }
}
