use crate::{
    config::PipelineConfig,
    error::{IllustrationError, Result},
    models::{ArtStyle, BatchPage, BatchResult, BatchSummary, IllustrationRequest},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashSet;

/// Deserialize a JSON body, naming the offending field on a shape mismatch.
pub fn parse_body<T: DeserializeOwned>(body: serde_json::Value) -> Result<T> {
    serde_path_to_error::deserialize(body).map_err(|err| {
        let path = err.path().to_string();
        let field = if path == "." { "body".to_string() } else { path };
        IllustrationError::validation(field, err.into_inner().to_string())
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IllustrationBody {
    pub prompt: String,
    pub style: Option<String>,
    pub character_description: Option<String>,
    pub consistency_mode: Option<bool>,
    pub previous_image_url: Option<String>,
    pub edit_mode: Option<bool>,
    pub fusion_mode: Option<bool>,
}

impl IllustrationBody {
    /// Continuity and fusion options only apply on the advanced route.
    pub fn to_request(&self, config: &PipelineConfig, advanced: bool) -> Result<IllustrationRequest> {
        let request = IllustrationRequest::new(self.prompt.clone())?
            .with_style(ArtStyle::resolve(self.style.as_deref(), config.default_style))
            .with_character_description(self.character_description.clone())
            .with_consistency(self.consistency_mode.unwrap_or(config.default_consistency_mode));

        if !advanced {
            return Ok(request);
        }
        Ok(request
            .with_previous_image(self.previous_image_url.clone())
            .with_edit_mode(self.edit_mode.unwrap_or(false))
            .with_fusion_mode(self.fusion_mode.unwrap_or(false)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPageBody {
    #[serde(default)]
    pub text: Option<String>,
    pub prompt: String,
    pub page_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchBody {
    pub book_id: String,
    pub pages: Vec<BatchPageBody>,
    pub character_description: Option<String>,
    pub style: Option<String>,
    pub consistency_mode: Option<bool>,
    pub fusion_mode: Option<bool>,
    pub batch_size: Option<usize>,
}

impl BatchBody {
    pub fn validate(&self, config: &PipelineConfig) -> Result<()> {
        if self.book_id.trim().is_empty() {
            return Err(IllustrationError::validation("bookId", "must not be empty"));
        }
        if self.pages.is_empty() {
            return Err(IllustrationError::validation("pages", "at least one page is required"));
        }
        if let Some(size) = self.batch_size {
            if size == 0 || size > config.max_batch_size {
                return Err(IllustrationError::validation(
                    "batchSize",
                    format!("must be between 1 and {}", config.max_batch_size),
                ));
            }
        }

        let mut seen = HashSet::new();
        for (position, page) in self.pages.iter().enumerate() {
            if page.prompt.trim().is_empty() {
                return Err(IllustrationError::validation(
                    format!("pages[{}].prompt", position),
                    "must not be empty",
                ));
            }
            if !seen.insert(page.page_index) {
                return Err(IllustrationError::validation(
                    format!("pages[{}].pageIndex", position),
                    format!("duplicate page index {}", page.page_index),
                ));
            }
        }
        Ok(())
    }

    pub fn to_pages(&self, config: &PipelineConfig) -> Result<Vec<BatchPage>> {
        let style = ArtStyle::resolve(self.style.as_deref(), config.default_style);
        let consistency = self.consistency_mode.unwrap_or(config.default_consistency_mode);
        let fusion = self.fusion_mode.unwrap_or(false);

        self.pages
            .iter()
            .map(|page| {
                let request = IllustrationRequest::new(page.prompt.clone())?
                    .with_style(style)
                    .with_character_description(self.character_description.clone())
                    .with_consistency(consistency)
                    .with_fusion_mode(fusion);
                Ok(BatchPage {
                    page_index: page.page_index,
                    request,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageIllustration {
    pub page_index: usize,
    pub image_url: String,
    pub text: Option<String>,
    pub prompt: String,
    pub style: ArtStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub book_id: String,
    pub results: Vec<PageIllustration>,
    pub failed_results: Vec<BatchResult>,
    pub summary: BatchSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CleanupBody {
    pub keep: Option<usize>,
}
