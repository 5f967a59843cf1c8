use super::{filename, traits::ImageSink};
use crate::{
    config::LocalStorageConfig,
    error::{IllustrationError, Result},
    models::{ExtractedImage, StorageBackend, StoredImage},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionReport {
    pub deleted: usize,
    pub kept: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub filename: String,
    pub timestamp: i64,
}

/// Fallback image store rooted at `<public_dir>/images`, served back through
/// a read-only route at `url_prefix`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    images_dir: PathBuf,
    url_prefix: String,
}

impl LocalImageStore {
    pub fn new(config: &LocalStorageConfig) -> Self {
        Self {
            images_dir: config.images_dir(),
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.url_prefix, filename)
    }

    pub async fn write(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.resolve_new(filename)?;
        tokio::fs::create_dir_all(&self.images_dir).await?;
        tokio::fs::write(&path, bytes).await?;
        log::info!("💾 Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    fn resolve_new(&self, filename: &str) -> Result<PathBuf> {
        let relative = checked_relative(&[filename])?;
        Ok(self.images_dir.join(relative))
    }

    /// Map URL path segments onto an existing file inside the image directory.
    pub async fn resolve(&self, segments: &[&str]) -> Result<PathBuf> {
        let relative = checked_relative(segments)?;
        let root = tokio::fs::canonicalize(&self.images_dir).await?;
        let candidate = tokio::fs::canonicalize(root.join(relative)).await?;

        if !candidate.starts_with(&root) {
            log::warn!("🚫 Rejected image path outside {}: {:?}", root.display(), segments);
            return Err(IllustrationError::validation("path", "path escapes the image directory"));
        }
        if !tokio::fs::metadata(&candidate).await?.is_file() {
            return Err(std::io::Error::new(ErrorKind::NotFound, "not a file").into());
        }
        Ok(candidate)
    }

    pub async fn read(&self, segments: &[&str]) -> Result<(Vec<u8>, &'static str)> {
        let path = self.resolve(segments).await?;
        let bytes = tokio::fs::read(&path).await?;
        Ok((bytes, content_type_for(&path)))
    }

    /// Image files in the directory, newest first.
    pub async fn list_images(&self) -> Result<Vec<LocalImage>> {
        let mut entries = match tokio::fs::read_dir(&self.images_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut images = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !has_image_extension(Path::new(&name)) {
                continue;
            }
            let timestamp = filename::embedded_timestamp(&name).unwrap_or_else(|| {
                metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map_or(0, |d| d.as_millis() as i64)
            });
            images.push(LocalImage {
                filename: name,
                timestamp,
            });
        }

        images.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(images)
    }

    /// Keep the `retain` newest images and delete the rest.
    pub async fn sweep(&self, retain: usize) -> Result<RetentionReport> {
        let images = self.list_images().await?;
        let report = self.prune(&images, retain).await;

        log::info!(
            "🧹 Retention sweep: deleted {}, kept {}, failed {}",
            report.deleted,
            report.kept,
            report.failed
        );
        Ok(report)
    }

    /// `kept` counts every image still on disk afterwards, including the
    /// ones that could not be deleted.
    async fn prune(&self, newest_first: &[LocalImage], retain: usize) -> RetentionReport {
        let mut report = RetentionReport {
            deleted: 0,
            kept: newest_first.len().min(retain),
            failed: 0,
        };

        for image in newest_first.iter().skip(retain) {
            let path = self.images_dir.join(&image.filename);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    log::warn!("⚠️  Could not delete {}: {}", path.display(), e);
                    report.failed += 1;
                    report.kept += 1;
                }
            }
        }
        report
    }
}

#[async_trait]
impl ImageSink for LocalImageStore {
    fn name(&self) -> &'static str {
        "local filesystem"
    }

    async fn store(&self, filename: &str, image: &ExtractedImage) -> Result<StoredImage> {
        self.write(filename, &image.bytes).await?;
        Ok(StoredImage {
            url: self.url_for(filename),
            backend: StorageBackend::LocalFilesystem,
            filename: filename.to_string(),
        })
    }
}

fn checked_relative(segments: &[&str]) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for segment in segments {
        if segment.is_empty() || segment.contains('\\') || segment.contains('\0') {
            return Err(IllustrationError::validation("path", "invalid path segment"));
        }
        for component in Path::new(segment).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                _ => {
                    return Err(IllustrationError::validation(
                        "path",
                        "path traversal is not allowed",
                    ))
                }
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(IllustrationError::validation("path", "empty image path"));
    }
    Ok(relative)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageSource;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> LocalImageStore {
        LocalImageStore::new(&LocalStorageConfig::new().with_public_dir(dir.path()))
    }

    fn image() -> ExtractedImage {
        ExtractedImage {
            bytes: vec![0x89, b'P', b'N', b'G'],
            mime_type: "image/png".to_string(),
            source: ImageSource::InlineData,
        }
    }

    #[tokio::test]
    async fn test_store_creates_directory_and_returns_route_url() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let stored = store.store("illustration_1_abcdef12.png", &image()).await.unwrap();
        assert_eq!(stored.url, "/api/images/illustration_1_abcdef12.png");
        assert_eq!(stored.backend, StorageBackend::LocalFilesystem);

        let on_disk = std::fs::read(dir.path().join("images/illustration_1_abcdef12.png")).unwrap();
        assert_eq!(on_disk, image().bytes);
    }

    #[tokio::test]
    async fn test_read_returns_bytes_and_content_type() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.write("a_1_x.png", b"png-bytes").await.unwrap();

        let (bytes, content_type) = store.read(&["a_1_x.png"]).await.unwrap();
        assert_eq!(bytes, b"png-bytes");
        assert_eq!(content_type, "image/png");
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("secret.txt"), "top secret").unwrap();
        let store = store_in(&dir);
        store.write("ok_1_x.png", b"x").await.unwrap();

        for segments in [vec!["..", "secret.txt"], vec!["../secret.txt"], vec!["/etc/passwd"]] {
            let err = store.read(&segments).await.unwrap_err();
            assert!(
                matches!(err, IllustrationError::ValidationError { .. }),
                "expected rejection for {:?}, got {:?}",
                segments,
                err
            );
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.write("ok_1_x.png", b"x").await.unwrap();

        match store.read(&["missing.png"]).await.unwrap_err() {
            IllustrationError::IoError(e) => assert_eq!(e.kind(), ErrorKind::NotFound),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sweep_keeps_newest() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        for i in 0..60i64 {
            let name = format!("illustration_{}_{:08x}.png", 1_700_000_000_000 + i * 1000, i);
            store.write(&name, b"x").await.unwrap();
        }

        let report = store.sweep(50).await.unwrap();
        assert_eq!(report.deleted, 10);
        assert_eq!(report.kept, 50);
        assert_eq!(report.failed, 0);

        let remaining = store.list_images().await.unwrap();
        assert_eq!(remaining.len(), 50);
        let oldest_kept = remaining.iter().map(|i| i.timestamp).min().unwrap();
        assert_eq!(oldest_kept, 1_700_000_000_000 + 10 * 1000);
    }

    #[tokio::test]
    async fn test_undeletable_images_still_count_as_kept() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.write("fresh_3_cccccccc.png", b"x").await.unwrap();
        store.write("old_1_aaaaaaaa.png", b"x").await.unwrap();
        std::fs::create_dir_all(store.images_dir().join("stuck_2_bbbbbbbb.png/inner")).unwrap();

        let listing = vec![
            LocalImage { filename: "fresh_3_cccccccc.png".into(), timestamp: 3 },
            LocalImage { filename: "stuck_2_bbbbbbbb.png".into(), timestamp: 2 },
            LocalImage { filename: "old_1_aaaaaaaa.png".into(), timestamp: 1 },
        ];
        let report = store.prune(&listing, 1).await;

        assert_eq!(report, RetentionReport { deleted: 1, kept: 2, failed: 1 });
        assert!(store.images_dir().join("stuck_2_bbbbbbbb.png").exists());
        assert!(!store.images_dir().join("old_1_aaaaaaaa.png").exists());
    }

    #[tokio::test]
    async fn test_sweep_on_missing_directory() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let report = store.sweep(50).await.unwrap();
        assert_eq!(report, RetentionReport { deleted: 0, kept: 0, failed: 0 });
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
    }
}
