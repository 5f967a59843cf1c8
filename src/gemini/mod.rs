pub mod image_client;

use crate::{error::Result, models::GenerationResponse};
use async_trait::async_trait;

pub use image_client::GeminiImageClient;

/// A generative model that turns a prompt into a response envelope.
///
/// One call per image, no retries. Transport and service errors are returned
/// as-is so the caller can record them against the page being illustrated.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, model_id: &str, prompt: &str) -> Result<GenerationResponse>;
}
