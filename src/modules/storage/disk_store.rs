//! Disk-backed blob store for uploaded files.
//!
//! Blobs live in a single flat directory keyed by filename. Name collisions
//! are resolved by probing `"name copy1.ext"`, `"name copy2.ext"`, ... with
//! an exclusive create, so two concurrent writers can never claim the same
//! name or overwrite each other.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::core::config::StorageConfig;
use crate::core::error::{AppError, Result};
use crate::shared::validation::{is_safe_filename, sanitize_filename};

/// Upper bound on collision probes for one desired name.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// A successfully written blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Final (possibly disambiguated) filename the blob was stored under
    pub name: String,
    /// Bytes written
    pub size: i64,
}

/// Derive the Nth collision candidate for a filename: `" copy{N}"` is
/// inserted before the extension, so `report.pdf` probes `report copy1.pdf`.
fn candidate_name(base: &str, attempt: u32) -> String {
    let path = Path::new(base);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{} copy{}.{}",
            stem.to_string_lossy(),
            attempt,
            ext.to_string_lossy()
        ),
        _ => format!("{} copy{}", base, attempt),
    }
}

pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open the store, creating the upload directory if absent.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let root = PathBuf::from(&config.upload_dir);
        fs::create_dir_all(&root).await?;

        info!("Upload directory ready: {}", root.display());

        Ok(Self { root })
    }

    /// Write a blob under `desired_name`, disambiguating on collision.
    ///
    /// The final name is claimed with an exclusive create and the probe
    /// retries on `AlreadyExists`, so the claim itself is atomic. All bytes
    /// are written and flushed before the blob is considered stored.
    pub async fn write(&self, desired_name: &str, data: &[u8]) -> Result<StoredBlob> {
        let base = sanitize_filename(desired_name);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                base.clone()
            } else {
                candidate_name(&base, attempt)
            };

            let target = self.root.join(&candidate);
            let open = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .await;

            match open {
                Ok(mut file) => {
                    file.write_all(data).await?;
                    file.flush().await?;

                    debug!("Blob written: {} ({} bytes)", candidate, data.len());

                    return Ok(StoredBlob {
                        name: candidate,
                        size: data.len() as i64,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal(format!(
            "Could not find a free filename for '{}' after {} attempts",
            base, MAX_NAME_ATTEMPTS
        )))
    }

    /// Best-effort blob removal: a blob already missing from disk is fine,
    /// the caller's job is to converge disk and metadata to "absent".
    pub async fn remove(&self, name: &str) -> Result<()> {
        if !is_safe_filename(name) {
            return Ok(());
        }

        match fs::remove_file(self.root.join(name)).await {
            Ok(()) => {
                debug!("Blob removed: {}", name);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Blob already absent: {}", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a public lookup name to its on-disk path. Unsafe names
    /// (traversal attempts, control characters) resolve to nothing.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if !is_safe_filename(name) {
            return None;
        }
        Some(self.root.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn temp_store() -> (DiskStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("filedock-test-{}", Uuid::new_v4()));
        let store = DiskStore::new(&StorageConfig {
            upload_dir: dir.to_string_lossy().into_owned(),
        })
        .await
        .unwrap();
        (store, dir)
    }

    #[test]
    fn test_candidate_name() {
        assert_eq!(candidate_name("report.pdf", 1), "report copy1.pdf");
        assert_eq!(candidate_name("report.pdf", 2), "report copy2.pdf");
        assert_eq!(candidate_name("archive.tar.gz", 1), "archive.tar copy1.gz");
        assert_eq!(candidate_name("README", 1), "README copy1");
    }

    #[tokio::test]
    async fn test_write_and_collision_suffixes() {
        let (store, dir) = temp_store().await;

        let first = store.write("report.pdf", b"one").await.unwrap();
        assert_eq!(first.name, "report.pdf");
        assert_eq!(first.size, 3);

        let second = store.write("report.pdf", b"two").await.unwrap();
        assert_eq!(second.name, "report copy1.pdf");

        let third = store.write("report.pdf", b"three").await.unwrap();
        assert_eq!(third.name, "report copy2.pdf");

        // earlier blobs are never overwritten
        assert_eq!(fs::read(dir.join("report.pdf")).await.unwrap(), b"one");
        assert_eq!(
            fs::read(dir.join("report copy1.pdf")).await.unwrap(),
            b"two"
        );

        fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_sanitizes_traversal_names() {
        let (store, dir) = temp_store().await;

        let blob = store.write("../../etc/passwd", b"x").await.unwrap();
        assert_eq!(blob.name, "passwd");
        assert!(dir.join("passwd").exists());

        fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_is_best_effort() {
        let (store, dir) = temp_store().await;

        store.write("gone.txt", b"x").await.unwrap();
        store.remove("gone.txt").await.unwrap();
        assert!(!dir.join("gone.txt").exists());

        // removing a blob that was never written is not an error
        store.remove("never-existed.txt").await.unwrap();

        fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_rejects_unsafe_names() {
        let (store, dir) = temp_store().await;

        assert!(store.resolve("report.pdf").is_some());
        assert!(store.resolve("..").is_none());
        assert!(store.resolve("../secret").is_none());
        assert!(store.resolve("").is_none());

        fs::remove_dir_all(dir).await.unwrap();
    }
}
