//! Photo storage
//!
//! Report and close-out photos go through the `PhotoStore` held in
//! `AppState`. The local implementation writes under `UPLOAD_DIR`, which the
//! router serves at `/uploads`.

use std::path::PathBuf;

use thiserror::Error;

/// Accepted upload types
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

pub const DEFAULT_FOLDER: &str = "report-photos";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File type {0} not allowed, use JPEG, PNG or WebP")]
    UnsupportedType(String),

    #[error("File is {size} bytes, the maximum is {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[axum::async_trait]
pub trait PhotoStore: Send + Sync {
    /// Store `bytes` under `key` and return the public URL
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError>;
}

/// Filesystem-backed store
pub struct LocalPhotoStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalPhotoStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

#[axum::async_trait]
impl PhotoStore for LocalPhotoStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        if key.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(StorageError::InvalidName(key.to_string()));
        }

        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!("Stored photo {} ({} bytes)", path.display(), bytes.len());

        Ok(format!("{}/uploads/{}", self.public_base_url.trim_end_matches('/'), key))
    }
}

/// Check the declared type and size of an upload
pub fn check_upload(content_type: &str, size: usize, max: usize) -> Result<(), StorageError> {
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(StorageError::UnsupportedType(content_type.to_string()));
    }
    if size > max {
        return Err(StorageError::TooLarge { size, max });
    }
    Ok(())
}

/// Anything outside `[A-Za-z0-9.-]` becomes `_`
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();

    // no hidden files, no ".." segments
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "photo".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Folder names are a single segment of `[A-Za-z0-9_-]`
pub fn sanitize_folder(folder: Option<&str>) -> Result<String, StorageError> {
    match folder.map(str::trim).filter(|f| !f.is_empty()) {
        None => Ok(DEFAULT_FOLDER.to_string()),
        Some(f) if f.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') => {
            Ok(f.to_string())
        }
        Some(f) => Err(StorageError::InvalidName(f.to_string())),
    }
}

/// `{folder}/{unix_millis}-{name}`
pub fn object_key(folder: &str, file_name: &str, unix_millis: i64) -> String {
    format!("{}/{}-{}", folder, unix_millis, sanitize_file_name(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_upload() {
        assert!(check_upload("image/png", 100, 1024).is_ok());
        assert!(matches!(
            check_upload("image/gif", 100, 1024),
            Err(StorageError::UnsupportedType(_))
        ));
        assert!(matches!(
            check_upload("image/jpeg", 2048, 1024),
            Err(StorageError::TooLarge { size: 2048, max: 1024 })
        ));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("pasillo norte (1).jpg"), "pasillo_norte__1_.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_name("..."), "photo");
    }

    #[test]
    fn test_sanitize_folder() {
        assert_eq!(sanitize_folder(None).unwrap(), DEFAULT_FOLDER);
        assert_eq!(sanitize_folder(Some("  ")).unwrap(), DEFAULT_FOLDER);
        assert_eq!(sanitize_folder(Some("action-photos")).unwrap(), "action-photos");
        assert!(sanitize_folder(Some("../secrets")).is_err());
        assert!(sanitize_folder(Some("a/b")).is_err());
    }

    #[test]
    fn test_object_key() {
        assert_eq!(
            object_key("report-photos", "hall way.png", 1_700_000_000_000),
            "report-photos/1700000000000-hall_way.png"
        );
    }

    #[tokio::test]
    async fn test_local_store_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalPhotoStore::new(dir.path(), "http://example.test/");

        let url = store.put("report-photos/1-a.png", b"png-bytes").await.unwrap();
        assert_eq!(url, "http://example.test/uploads/report-photos/1-a.png");

        let written = std::fs::read(dir.path().join("report-photos/1-a.png")).unwrap();
        assert_eq!(written, b"png-bytes");
    }

    #[test]
    fn test_local_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalPhotoStore::new(dir.path(), "http://example.test");
        assert!(matches!(
            tokio_test::block_on(store.put("../escape.png", b"x")),
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(
            tokio_test::block_on(store.put("report-photos//a.png", b"x")),
            Err(StorageError::InvalidName(_))
        ));
    }
}
