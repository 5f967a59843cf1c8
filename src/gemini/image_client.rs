use super::GenerationClient;
use crate::{
    config::GeminiConfig,
    error::{IllustrationError, Result},
    models::{GenerateContentRequest, GenerationResponse},
};
use async_trait::async_trait;
use reqwest::Client;

#[derive(Clone)]
pub struct GeminiImageClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiImageClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| IllustrationError::ConfigError("GEMINI_API_KEY is not set".into()))?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| IllustrationError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, model_id: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model_id)
    }
}

#[async_trait]
impl GenerationClient for GeminiImageClient {
    async fn generate(&self, model_id: &str, prompt: &str) -> Result<GenerationResponse> {
        let payload = GenerateContentRequest::from_prompt(prompt);

        log::info!("🎨 Generating illustration with model: {}", model_id);
        log::debug!("Prompt ({} chars): {}", prompt.len(), prompt);

        let response = self
            .client
            .post(self.endpoint(model_id))
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| IllustrationError::RequestError(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IllustrationError::ResponseError(e.to_string()))?;

        if !status.is_success() {
            log::error!("❌ Gemini returned {}: {}", status, body);
            return Err(IllustrationError::ResponseError(format!(
                "Gemini returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerationResponse = serde_json::from_str(&body)
            .map_err(|e| IllustrationError::ResponseError(format!("Malformed Gemini response: {}", e)))?;

        log::debug!(
            "Gemini response: {} candidate(s), {} part(s)",
            parsed.candidates.len(),
            parsed.parts().count()
        );

        Ok(parsed)
    }
}
