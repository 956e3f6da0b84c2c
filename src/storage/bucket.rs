use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::BufReader;

#[derive(Debug, Error)]
pub enum BlobStorageError {
    #[error("blob not found")]
    NotFound,
    #[error("invalid blob name")]
    InvalidName,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobStorageError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

/// A bucket entry as reported by a listing: the blob's name plus the
/// server-supplied metadata readers copy onto document records.
#[derive(Debug, Clone, Serialize)]
pub struct BlobEntry {
    pub name: String,
    pub size: i64,
    pub content_type: String,
    pub modified_at: DateTime<Utc>,
}

/// Flat, name-keyed blob storage over a bucket directory. Files land in the
/// bucket out-of-band; this type only lists and reads them.
pub struct BlobStorage {
    bucket_path: PathBuf,
}

impl BlobStorage {
    pub fn new(data_dir: &Path, bucket: &str) -> Self {
        Self {
            bucket_path: data_dir.join("storage").join(bucket),
        }
    }

    #[must_use]
    pub fn bucket_path(&self) -> &Path {
        &self.bucket_path
    }

    fn blob_path(&self, name: &str) -> Result<PathBuf, BlobStorageError> {
        validate_blob_name(name)?;
        Ok(self.bucket_path.join(name))
    }

    /// Lists up to `limit` blobs sorted by name ascending. Hidden entries
    /// (leading dot) and subdirectories are filtered out.
    pub async fn list(&self, limit: usize) -> Result<Vec<BlobEntry>, BlobStorageError> {
        let mut dir = match fs::read_dir(&self.bucket_path).await {
            Ok(dir) => dir,
            // An absent bucket directory is an empty bucket, not an error.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BlobStorageError::Io(e)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if name.starts_with('.') {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let modified_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            entries.push(BlobEntry {
                content_type: guess_content_type(&name),
                size: metadata.len() as i64,
                name,
                modified_at,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.truncate(limit);
        Ok(entries)
    }

    /// Returns metadata for a single blob.
    pub async fn stat(&self, name: &str) -> Result<BlobEntry, BlobStorageError> {
        let path = self.blob_path(name)?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(BlobStorageError::from_io)?;

        if !metadata.is_file() {
            return Err(BlobStorageError::NotFound);
        }

        let modified_at = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(BlobEntry {
            name: name.to_string(),
            size: metadata.len() as i64,
            content_type: guess_content_type(name),
            modified_at,
        })
    }

    pub async fn exists(&self, name: &str) -> Result<bool, BlobStorageError> {
        let path = self.blob_path(name)?;
        Ok(path.is_file())
    }

    /// Opens a blob for streaming.
    pub async fn open(&self, name: &str) -> Result<(BufReader<File>, i64), BlobStorageError> {
        let path = self.blob_path(name)?;
        let file = File::open(&path).await.map_err(BlobStorageError::from_io)?;

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(BlobStorageError::NotFound);
        }
        let size = metadata.len() as i64;

        Ok((BufReader::new(file), size))
    }
}

fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Blob names are flat: no separators, no traversal, no hidden entries.
fn validate_blob_name(name: &str) -> Result<(), BlobStorageError> {
    if name.is_empty() || name.len() > 255 {
        return Err(BlobStorageError::InvalidName);
    }
    if name.starts_with('.') {
        return Err(BlobStorageError::InvalidName);
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(BlobStorageError::InvalidName);
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(BlobStorageError::InvalidName);
    }
    Ok(())
}

#[must_use]
pub fn is_valid_blob_name(name: &str) -> bool {
    validate_blob_name(name).is_ok()
}
