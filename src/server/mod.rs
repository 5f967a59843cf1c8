pub mod dto;
pub mod error;
pub mod handlers;

use crate::{
    config::Config,
    gemini::GeminiImageClient,
    pipeline::IllustrationPipeline,
    storage::{ImageStorageManager, LocalImageStore},
};
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::sync::Arc;

pub use error::ApiError;

const DEFAULT_PORT: u16 = 8080;
const JSON_LIMIT_BYTES: usize = 1024 * 1024;

pub struct AppState {
    pipeline: Option<Arc<IllustrationPipeline>>,
    local: Arc<LocalImageStore>,
    retention_limit: usize,
}

impl AppState {
    pub fn new(
        pipeline: Option<Arc<IllustrationPipeline>>,
        local: Arc<LocalImageStore>,
        retention_limit: usize,
    ) -> Self {
        Self {
            pipeline,
            local,
            retention_limit,
        }
    }

    /// A missing API key leaves the image route and cleanup usable; only
    /// the generation endpoints refuse to run.
    pub fn from_config(config: &Config) -> Self {
        let storage = ImageStorageManager::new(&config.supabase, &config.local);

        let pipeline = match GeminiImageClient::new(&config.gemini) {
            Ok(client) => Some(Arc::new(IllustrationPipeline::new(
                Arc::new(client),
                storage.sink(),
                config.gemini.model_id.clone(),
                config.pipeline.clone(),
            ))),
            Err(e) => {
                log::error!("❌ Generation disabled: {}", e);
                None
            }
        };

        Self::new(pipeline, storage.local().clone(), config.local.retention_limit)
    }

    pub fn pipeline(&self) -> Result<&Arc<IllustrationPipeline>, ApiError> {
        self.pipeline
            .as_ref()
            .ok_or_else(|| ApiError::Config("GEMINI_API_KEY is not configured".into()))
    }

    pub fn local(&self) -> &LocalImageStore {
        &self.local
    }

    pub fn retention_limit(&self) -> usize {
        self.retention_limit
    }
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| ApiError::InvalidBody(err.to_string()).into())
}

pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config());
    handlers::config(cfg);
}

pub async fn run(config: Config) -> std::io::Result<()> {
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let state = web::Data::new(AppState::from_config(&config));

    log::info!("🌐 Listening on 0.0.0.0:{}", port);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(app_config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
