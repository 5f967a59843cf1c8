use super::traits::ImageSink;
use crate::{
    config::SupabaseConfig,
    error::{IllustrationError, Result},
    models::{ExtractedImage, StorageBackend, StoredImage},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub public: bool,
}

/// Supabase Storage over its REST API.
///
/// The bucket is looked up (and created when missing) on first upload; a
/// failed check is retried on the next upload.
pub struct SupabaseImageStore {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
    max_file_size_bytes: u64,
    allowed_mime_types: Vec<String>,
    bucket_ready: OnceCell<()>,
}

impl SupabaseImageStore {
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let base_url = config
            .url
            .clone()
            .ok_or_else(|| IllustrationError::ConfigError("SUPABASE_URL is required".into()))?;
        let service_key = config.service_key.clone().ok_or_else(|| {
            IllustrationError::ConfigError("SUPABASE_SERVICE_ROLE_KEY is required".into())
        })?;

        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket: config.bucket.clone(),
            max_file_size_bytes: config.max_file_size_bytes,
            allowed_mime_types: config.allowed_mime_types.clone(),
            bucket_ready: OnceCell::new(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }

    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        let response = self
            .authorized(self.client.get(format!("{}/storage/v1/bucket", self.base_url)))
            .send()
            .await
            .map_err(|e| IllustrationError::StorageError(format!("List buckets failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(IllustrationError::StorageError(format!(
                "List buckets returned {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| IllustrationError::StorageError(format!("Malformed bucket list: {}", e)))
    }

    pub async fn create_bucket(&self) -> Result<()> {
        let payload = json!({
            "id": self.bucket,
            "name": self.bucket,
            "public": true,
            "file_size_limit": self.max_file_size_bytes,
            "allowed_mime_types": self.allowed_mime_types,
        });

        let response = self
            .authorized(self.client.post(format!("{}/storage/v1/bucket", self.base_url)))
            .json(&payload)
            .send()
            .await
            .map_err(|e| IllustrationError::StorageError(format!("Create bucket failed: {}", e)))?;

        if response.status().is_success() {
            log::info!("🪣 Created public bucket '{}'", self.bucket);
            Ok(())
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(IllustrationError::StorageError(format!(
                "Create bucket returned {}: {}",
                status, error_text
            )))
        }
    }

    async fn ensure_bucket(&self) -> Result<()> {
        self.bucket_ready
            .get_or_try_init(|| async {
                let buckets = self.list_buckets().await?;
                if buckets.iter().any(|b| b.id == self.bucket) {
                    log::debug!("Bucket '{}' already exists", self.bucket);
                    Ok(())
                } else {
                    self.create_bucket().await
                }
            })
            .await
            .map(|_| ())
    }

    pub async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        let response = self
            .authorized(self.client.post(format!(
                "{}/storage/v1/object/{}/{}",
                self.base_url, self.bucket, path
            )))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CACHE_CONTROL, "3600")
            .header("x-upsert", "false")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| IllustrationError::StorageError(format!("Upload failed: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(IllustrationError::StorageError(format!(
                "Upload returned {}: {}",
                status, error_text
            )))
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}

#[async_trait]
impl ImageSink for SupabaseImageStore {
    fn name(&self) -> &'static str {
        "supabase storage"
    }

    async fn store(&self, filename: &str, image: &ExtractedImage) -> Result<StoredImage> {
        self.ensure_bucket().await?;
        self.upload(filename, &image.bytes, &image.mime_type).await?;

        let url = self.public_url(filename);
        log::info!("☁️  Uploaded {} to bucket '{}'", filename, self.bucket);
        Ok(StoredImage {
            url,
            backend: StorageBackend::BlobStorage,
            filename: filename.to_string(),
        })
    }
}
