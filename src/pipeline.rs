use crate::{
    config::PipelineConfig,
    error::{IllustrationError, Result},
    extract::{Extraction, ResponseExtractor},
    gemini::GenerationClient,
    logger,
    models::{IllustrationRequest, StorageBackend, StoredImage},
    prompt::compose_prompt,
    storage::ImageSink,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStage {
    Pending,
    Generating,
    Extracting,
    Persisting,
    Succeeded,
    Failed,
}

impl fmt::Display for PageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageStage::Pending => "pending",
            PageStage::Generating => "generating",
            PageStage::Extracting => "extracting",
            PageStage::Persisting => "persisting",
            PageStage::Succeeded => "succeeded",
            PageStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct StageTracker<'a> {
    label: &'a str,
    stage: PageStage,
}

impl<'a> StageTracker<'a> {
    fn new(label: &'a str) -> Self {
        Self {
            label,
            stage: PageStage::Pending,
        }
    }

    fn advance(&mut self, next: PageStage) {
        log::debug!("[{}] {} -> {}", self.label, self.stage, next);
        self.stage = next;
    }
}

/// Flattened result of one pipeline run, as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IllustrationOutcome {
    pub success: bool,
    pub image_url: Option<String>,
    pub storage: Option<StorageBackend>,
    pub error: Option<String>,
}

impl From<Result<StoredImage>> for IllustrationOutcome {
    fn from(result: Result<StoredImage>) -> Self {
        match result {
            Ok(stored) => Self {
                success: true,
                image_url: Some(stored.url),
                storage: Some(stored.backend),
                error: None,
            },
            Err(e) => Self {
                success: false,
                image_url: None,
                storage: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// compose prompt -> generate -> extract -> persist, for a single image.
pub struct IllustrationPipeline {
    generator: Arc<dyn GenerationClient>,
    sink: Arc<dyn ImageSink>,
    extractor: ResponseExtractor,
    model_id: String,
    config: PipelineConfig,
}

impl IllustrationPipeline {
    pub fn new(
        generator: Arc<dyn GenerationClient>,
        sink: Arc<dyn ImageSink>,
        model_id: impl Into<String>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            generator,
            sink,
            extractor: ResponseExtractor::new(config.embedded_data_url_fallback),
            model_id: model_id.into(),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Run the pipeline once. No retries: a failed page must be resubmitted.
    pub async fn illustrate(
        &self,
        request: &IllustrationRequest,
        filename: &str,
    ) -> Result<StoredImage> {
        let _timer = logger::timer(format!("illustrate {}", filename));
        let mut tracker = StageTracker::new(filename);

        let result = self.run_stages(request, filename, &mut tracker).await;
        match &result {
            Ok(stored) => {
                tracker.advance(PageStage::Succeeded);
                log::info!("✅ Illustration ready: {}", stored.url);
            }
            Err(e) => {
                log::error!("❌ Illustration failed during {}: {}", tracker.stage, e);
                tracker.advance(PageStage::Failed);
            }
        }
        result
    }

    pub async fn run(&self, request: &IllustrationRequest, filename: &str) -> IllustrationOutcome {
        self.illustrate(request, filename).await.into()
    }

    async fn run_stages(
        &self,
        request: &IllustrationRequest,
        filename: &str,
        tracker: &mut StageTracker<'_>,
    ) -> Result<StoredImage> {
        request.validate()?;
        let prompt = compose_prompt(request);

        tracker.advance(PageStage::Generating);
        let response = self.generator.generate(&self.model_id, &prompt).await?;

        tracker.advance(PageStage::Extracting);
        let image = match self.extractor.extract(&response) {
            Extraction::Image(image) => image,
            Extraction::NoImage => return Err(IllustrationError::NoImage),
        };

        tracker.advance(PageStage::Persisting);
        self.sink.store(filename, &image).await
    }
}
