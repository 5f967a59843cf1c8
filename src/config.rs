use crate::models::ArtStyle;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_BUCKET: &str = "story-illustrations";
pub const DEFAULT_URL_PREFIX: &str = "/api/images";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model_id: String,
    pub base_url: String,
    /// Transport-level timeout. Unset means the HTTP client default (none).
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub service_key: Option<String>,
    pub bucket: String,
    pub max_file_size_bytes: u64,
    pub allowed_mime_types: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LocalStorageConfig {
    /// Static asset root; images land in `<public_dir>/images`.
    pub public_dir: PathBuf,
    pub url_prefix: String,
    pub retention_limit: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub default_style: ArtStyle,
    pub default_batch_size: usize,
    pub max_batch_size: usize,
    pub batch_delay: Duration,
    pub default_consistency_mode: bool,
    pub embedded_data_url_fallback: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: Option<u16>,
    pub gemini: GeminiConfig,
    pub supabase: SupabaseConfig,
    pub local: LocalStorageConfig,
    pub pipeline: PipelineConfig,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            model_id: DEFAULT_MODEL_ID.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            request_timeout: None,
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
        let model_id = env::var("GEMINI_MODEL_ID").unwrap_or(defaults.model_id);
        let base_url = env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url);
        let request_timeout = env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs);

        GeminiConfig {
            api_key,
            model_id,
            base_url,
            request_timeout,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        SupabaseConfig {
            url: None,
            service_key: None,
            bucket: DEFAULT_BUCKET.to_string(),
            max_file_size_bytes: 10 * 1024 * 1024,
            allowed_mime_types: vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "image/webp".to_string(),
            ],
        }
    }
}

impl SupabaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let url = env::var("SUPABASE_URL").ok().filter(|u| !u.is_empty());
        let service_key = env::var("SUPABASE_SERVICE_ROLE_KEY")
            .or_else(|_| env::var("SUPABASE_KEY"))
            .ok()
            .filter(|k| !k.is_empty());
        let bucket = env::var("SUPABASE_BUCKET").unwrap_or(defaults.bucket);

        SupabaseConfig {
            url,
            service_key,
            bucket,
            ..defaults
        }
    }

    pub fn with_credentials(mut self, url: impl Into<String>, service_key: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self.service_key = Some(service_key.into());
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.service_key.is_some()
    }
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        LocalStorageConfig {
            public_dir: PathBuf::from("public"),
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            retention_limit: 50,
        }
    }
}

impl LocalStorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let public_dir = env::var("PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.public_dir);
        let retention_limit = env::var("LOCAL_IMAGE_RETENTION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.retention_limit);

        LocalStorageConfig {
            public_dir,
            retention_limit,
            ..defaults
        }
    }

    pub fn with_public_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.public_dir = dir.into();
        self
    }

    pub fn with_retention(mut self, limit: usize) -> Self {
        self.retention_limit = limit;
        self
    }

    pub fn images_dir(&self) -> PathBuf {
        self.public_dir.join("images")
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            default_style: ArtStyle::Realistic,
            default_batch_size: 3,
            max_batch_size: 5,
            batch_delay: Duration::from_millis(1000),
            default_consistency_mode: false,
            embedded_data_url_fallback: true,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_style(mut self, style: ArtStyle) -> Self {
        self.default_style = style;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.default_batch_size = size;
        self
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn with_consistency_default(mut self, enabled: bool) -> Self {
        self.default_consistency_mode = enabled;
        self
    }

    pub fn with_data_url_fallback(mut self, enabled: bool) -> Self {
        self.embedded_data_url_fallback = enabled;
        self
    }

    /// Clamp a requested batch size into `1..=max_batch_size`.
    pub fn clamp_batch_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_batch_size)
            .clamp(1, self.max_batch_size.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            gemini: GeminiConfig::default(),
            supabase: SupabaseConfig::default(),
            local: LocalStorageConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());

        Config {
            port,
            gemini: GeminiConfig::from_env(),
            supabase: SupabaseConfig::from_env(),
            local: LocalStorageConfig::from_env(),
            pipeline: PipelineConfig::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self
    }

    pub fn with_supabase(mut self, config: SupabaseConfig) -> Self {
        self.supabase = config;
        self
    }

    pub fn with_local(mut self, config: LocalStorageConfig) -> Self {
        self.local = config;
        self
    }

    pub fn with_pipeline(mut self, config: PipelineConfig) -> Self {
        self.pipeline = config;
        self
    }
}
