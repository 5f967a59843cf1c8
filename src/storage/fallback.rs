use super::traits::ImageSink;
use crate::{
    error::{IllustrationError, Result},
    models::{ExtractedImage, StoredImage},
};
use async_trait::async_trait;

/// Stores through `primary`, and silently retries through `fallback` when
/// the primary sink fails. Only fails when both do.
pub struct FallbackSink<P, F> {
    primary: P,
    fallback: F,
}

impl<P: ImageSink, F: ImageSink> FallbackSink<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<P: ImageSink, F: ImageSink> ImageSink for FallbackSink<P, F> {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn store(&self, filename: &str, image: &ExtractedImage) -> Result<StoredImage> {
        let primary_err = match self.primary.store(filename, image).await {
            Ok(stored) => return Ok(stored),
            Err(e) => e,
        };

        log::warn!(
            "⚠️  {} failed for {}: {}. Falling back to {}",
            self.primary.name(),
            filename,
            primary_err,
            self.fallback.name()
        );

        match self.fallback.store(filename, image).await {
            Ok(stored) => {
                log::info!("✅ Stored {} via {}", filename, self.fallback.name());
                Ok(stored)
            }
            Err(fallback_err) => {
                log::error!(
                    "❌ Both {} and {} failed for {}: {}",
                    self.primary.name(),
                    self.fallback.name(),
                    filename,
                    fallback_err
                );
                Err(IllustrationError::StorageError(format!(
                    "{}: {}; {}: {}",
                    self.primary.name(),
                    primary_err,
                    self.fallback.name(),
                    fallback_err
                )))
            }
        }
    }
}
