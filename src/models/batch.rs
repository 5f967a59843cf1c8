use super::illustration::IllustrationRequest;
use serde::{Deserialize, Serialize};

/// One page queued for batch illustration.
#[derive(Debug, Clone)]
pub struct BatchPage {
    pub page_index: usize,
    pub request: IllustrationRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub page_index: usize,
    pub success: bool,
    pub image_url: Option<String>,
    pub error: Option<String>,
}

impl BatchResult {
    pub fn succeeded(page_index: usize, image_url: String) -> Self {
        Self {
            page_index,
            success: true,
            image_url: Some(image_url),
            error: None,
        }
    }

    pub fn failed(page_index: usize, error: impl Into<String>) -> Self {
        Self {
            page_index,
            success: false,
            image_url: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total_pages: usize,
    pub successful: usize,
    pub failed: usize,
    /// Fraction of pages illustrated, in `0.0..=1.0`.
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub results: Vec<BatchResult>,
    pub failed_results: Vec<BatchResult>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn from_results(mut outcomes: Vec<BatchResult>) -> Self {
        outcomes.sort_by_key(|r| r.page_index);
        let total_pages = outcomes.len();
        let (results, failed_results): (Vec<_>, Vec<_>) =
            outcomes.into_iter().partition(|r| r.success);

        let success_rate = if total_pages == 0 {
            0.0
        } else {
            results.len() as f64 / total_pages as f64
        };

        let summary = BatchSummary {
            total_pages,
            successful: results.len(),
            failed: failed_results.len(),
            success_rate,
        };

        Self {
            results,
            failed_results,
            summary,
        }
    }

    /// Every page outcome in page order.
    pub fn outcomes(&self) -> Vec<&BatchResult> {
        let mut all: Vec<&BatchResult> = self
            .results
            .iter()
            .chain(self.failed_results.iter())
            .collect();
        all.sort_by_key(|r| r.page_index);
        all
    }
}
