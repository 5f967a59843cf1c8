use crate::{
    error::Result,
    models::{ExtractedImage, StoredImage},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Somewhere an extracted image can be persisted and addressed by URL.
#[async_trait]
pub trait ImageSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn store(&self, filename: &str, image: &ExtractedImage) -> Result<StoredImage>;
}

#[async_trait]
impl<T: ImageSink + ?Sized> ImageSink for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn store(&self, filename: &str, image: &ExtractedImage) -> Result<StoredImage> {
        (**self).store(filename, image).await
    }
}
