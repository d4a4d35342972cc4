//! Upload storage service
//!
//! Owns the upload directory: names stored objects, streams multipart parts
//! to disk and removes objects. The database only holds the resulting paths.

use crate::error::AppError;
use anyhow::Context;
use axum::body::Bytes;
use futures_util::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// An object found in the upload directory
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Full path of the object
    pub path: PathBuf,
    /// Time since the object was last modified
    pub age: Duration,
}

/// Local directory holding uploaded file bytes
#[derive(Debug, Clone)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Create storage rooted at `root`; call [`UploadStorage::init`] before use
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the upload directory if it does not exist
    pub async fn init(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create upload directory: {}", self.root.display()))
    }

    /// Upload directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Object name for a file: its id plus the lowercased original extension
    ///
    /// Extensions that are not plain alphanumerics are dropped.
    pub fn object_name(id: &str, original_name: &str) -> String {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| e.to_ascii_lowercase());

        match extension {
            Some(ext) => format!("{}.{}", id, ext),
            None => id.to_string(),
        }
    }

    /// Full path for a new object
    pub fn object_path(&self, id: &str, original_name: &str) -> PathBuf {
        self.root.join(Self::object_name(id, original_name))
    }

    /// Stream `chunks` into a new object at `path`, returning the byte count
    ///
    /// Exceeding `limit` bytes or any read/write failure removes the partial
    /// object before the error is returned.
    pub async fn write_stream<S, E>(
        &self,
        path: &Path,
        chunks: S,
        limit: usize,
    ) -> Result<u64, AppError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<AppError>,
    {
        let mut file = fs::File::create(path)
            .await
            .with_context(|| format!("Failed to create upload object: {}", path.display()))?;

        let mut chunks = std::pin::pin!(chunks);
        let mut written: u64 = 0;
        let result: Result<(), AppError> = async {
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(Into::<AppError>::into)?;
                written += chunk.len() as u64;
                if written > limit as u64 {
                    return Err(AppError::PayloadTooLarge(format!(
                        "File exceeds maximum size of {} bytes",
                        limit
                    )));
                }
                file.write_all(&chunk)
                    .await
                    .context("Failed to write upload object")?;
            }
            file.sync_all()
                .await
                .context("Failed to sync upload object")?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            drop(file);
            self.remove_quietly(path).await;
            return Err(e);
        }

        debug!("Stored upload object {} ({} bytes)", path.display(), written);
        Ok(written)
    }

    /// Whether an object exists at `path`
    pub async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    /// Open an object for reading; `None` when it is gone
    pub async fn open(&self, path: &Path) -> Result<Option<fs::File>, AppError> {
        match fs::File::open(path).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Failed to open {}: {}", path.display(), e).into()),
        }
    }

    /// Remove an object; returns `false` when there was nothing to remove
    pub async fn remove(&self, path: &Path) -> Result<bool, AppError> {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!("Removed upload object {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(anyhow::anyhow!("Failed to remove {}: {}", path.display(), e).into()),
        }
    }

    /// Remove an object, logging instead of failing
    pub async fn remove_quietly(&self, path: &Path) {
        if let Err(e) = self.remove(path).await {
            warn!("Failed to cleanup upload object: {}", e);
        }
    }

    /// Remove every listed object, logging failures
    pub async fn remove_all(&self, paths: &[String]) {
        for path in paths {
            self.remove_quietly(Path::new(path)).await;
        }
    }

    /// Regular files currently in the upload directory
    pub async fn list_objects(&self) -> Result<Vec<StoredObject>, AppError> {
        let mut entries = fs::read_dir(&self.root).await.with_context(|| {
            format!("Failed to read upload directory: {}", self.root.display())
        })?;

        let now = SystemTime::now();
        let mut objects = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .context("Failed to read upload directory entry")?
        {
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            objects.push(StoredObject {
                path: entry.path(),
                age,
            });
        }

        objects.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use tempfile::tempdir;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, AppError>> {
        stream::iter(
            parts
                .iter()
                .copied()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_object_name_keeps_lowercased_extension() {
        assert_eq!(UploadStorage::object_name("abc", "Menu.PDF"), "abc.pdf");
        assert_eq!(UploadStorage::object_name("abc", "archive.tar.gz"), "abc.gz");
        assert_eq!(UploadStorage::object_name("abc", "README"), "abc");
        assert_eq!(UploadStorage::object_name("abc", "weird.p$f"), "abc");
        assert_eq!(UploadStorage::object_name("abc", "../../evil.sh"), "abc.sh");
    }

    #[tokio::test]
    async fn test_write_stream_counts_bytes() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let storage = UploadStorage::new(temp_dir.path());
        let path = storage.object_path("f1", "notes.txt");

        let written = storage
            .write_stream(&path, chunks(&["hello ", "world"]), 1024)
            .await
            .expect("write succeeds");

        assert_eq!(written, 11);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello world");
    }

    #[tokio::test]
    async fn test_write_stream_over_limit_removes_partial_object() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let storage = UploadStorage::new(temp_dir.path());
        let path = storage.object_path("f1", "big.bin");

        let result = storage
            .write_stream(&path, chunks(&["12345", "67890"]), 8)
            .await;

        match result {
            Err(AppError::PayloadTooLarge(_)) => {}
            other => panic!("Expected PayloadTooLarge error, got: {:?}", other),
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_write_stream_read_error_removes_partial_object() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let storage = UploadStorage::new(temp_dir.path());
        let path = storage.object_path("f1", "broken.bin");
        let parts = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(AppError::Multipart("connection reset".to_string())),
        ]);

        let result = storage.write_stream(&path, parts, 1024).await;

        assert!(matches!(result, Err(AppError::Multipart(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_remove_missing_object_is_not_an_error() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let storage = UploadStorage::new(temp_dir.path());
        let path = temp_dir.path().join("gone.txt");

        assert!(!storage.remove(&path).await.unwrap());
        std::fs::write(&path, "x").unwrap();
        assert!(storage.exists(&path).await);
        assert!(storage.remove(&path).await.unwrap());
        assert!(!storage.exists(&path).await);
        assert!(storage.open(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_objects_skips_directories() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let storage = UploadStorage::new(temp_dir.path().join("uploads"));
        storage.init().await.unwrap();
        std::fs::write(storage.root().join("b.txt"), "b").unwrap();
        std::fs::write(storage.root().join("a.txt"), "a").unwrap();
        std::fs::create_dir(storage.root().join("nested")).unwrap();

        let objects = storage.list_objects().await.unwrap();
        let names: Vec<_> = objects
            .iter()
            .map(|o| o.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }
}
