//! Local-disk blob store for profile photos and product images.
//!
//! The store is opaque to callers: `put` returns a reference string that is
//! also the public URL path (served by `ServeDir` under `/media`), and
//! `delete` accepts that same reference. Delete is idempotent on missing
//! files.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

/// URL prefix under which stored files are served.
const PUBLIC_PREFIX: &str = "/media/";

/// Errors that can occur in the media store.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reference does not point into the store.
    #[error("invalid media reference: {0}")]
    InvalidReference(String),
}

/// Filesystem-backed blob store.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory this store writes into.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `bytes` under a fresh name in `folder` and return its
    /// reference (e.g. `/media/customers/3f2e….jpg`).
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the directory or file cannot be written.
    pub async fn put(&self, folder: &str, ext: &str, bytes: &[u8]) -> Result<String, MediaError> {
        let name = format!("{}.{ext}", Uuid::new_v4());
        let dir = self.root.join(folder);
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(&name), bytes).await?;

        Ok(format!("{PUBLIC_PREFIX}{folder}/{name}"))
    }

    /// Delete the file behind `reference`. Missing files are not an error.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::InvalidReference` if the reference is not one of
    /// ours (wrong prefix or path traversal), `MediaError::Io` for other
    /// filesystem errors.
    pub async fn delete(&self, reference: &str) -> Result<(), MediaError> {
        let relative = reference
            .strip_prefix(PUBLIC_PREFIX)
            .ok_or_else(|| MediaError::InvalidReference(reference.to_owned()))?;

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(MediaError::InvalidReference(reference.to_owned()));
        }

        match fs::remove_file(self.root.join(relative)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::Io(e)),
        }
    }
}

/// Map an image content type to the stored file extension.
///
/// Only the formats the API accepts for uploads.
#[must_use]
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_store() -> MediaStore {
        let dir = std::env::temp_dir().join(format!("sugarloaf-media-{}", Uuid::new_v4()));
        MediaStore::new(dir)
    }

    #[tokio::test]
    async fn test_put_then_delete() {
        let store = temp_store();

        let reference = store.put("customers", "jpg", b"fake-jpeg").await.unwrap();
        assert!(reference.starts_with("/media/customers/"));
        assert!(reference.ends_with(".jpg"));

        let on_disk = store
            .root()
            .join(reference.strip_prefix("/media/").unwrap());
        assert_eq!(fs::read(&on_disk).await.unwrap(), b"fake-jpeg");

        store.delete(&reference).await.unwrap();
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = temp_store();
        store
            .delete("/media/customers/does-not-exist.jpg")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_rejects_foreign_references() {
        let store = temp_store();
        assert!(matches!(
            store.delete("/etc/passwd").await,
            Err(MediaError::InvalidReference(_))
        ));
        assert!(matches!(
            store.delete("/media/../secrets.txt").await,
            Err(MediaError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("image/gif"), None);
    }
}
