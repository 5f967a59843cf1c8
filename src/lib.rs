//! Illustration pipeline for personalized children's stories.
//!
//! A page prompt is composed into a style-aware instruction, sent to a
//! generative image model, the image is pulled out of the response and
//! persisted to blob storage (or the local filesystem when blob storage is
//! unavailable). [`BatchOrchestrator`] runs the same pipeline over many pages
//! in rate-limit friendly chunks.

pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod storage;

#[cfg(feature = "server")]
pub mod server;

pub use batch::BatchOrchestrator;
pub use config::{Config, GeminiConfig, LocalStorageConfig, PipelineConfig, SupabaseConfig};
pub use error::{IllustrationError, Result};
pub use extract::{Extraction, ResponseExtractor};
pub use gemini::{GeminiImageClient, GenerationClient};
pub use models::*;
pub use pipeline::{IllustrationOutcome, IllustrationPipeline, PageStage};
pub use prompt::compose_prompt;
pub use storage::{
    FallbackSink, ImageSink, ImageStorageManager, LocalImageStore, RetentionReport,
    SupabaseImageStore,
};
