pub mod fallback;
pub mod filename;
pub mod local;
pub mod supabase;
pub mod traits;

use crate::config::{LocalStorageConfig, SupabaseConfig};
use std::sync::Arc;

pub use fallback::FallbackSink;
pub use local::{LocalImage, LocalImageStore, RetentionReport};
pub use supabase::SupabaseImageStore;
pub use traits::ImageSink;

/// Wires the configured image sinks together: blob storage with a local
/// fallback when Supabase is configured, the local store alone otherwise.
pub struct ImageStorageManager {
    sink: Arc<dyn ImageSink>,
    local: Arc<LocalImageStore>,
}

impl ImageStorageManager {
    pub fn new(supabase: &SupabaseConfig, local: &LocalStorageConfig) -> Self {
        let local = Arc::new(LocalImageStore::new(local));

        let sink: Arc<dyn ImageSink> = if supabase.is_configured() {
            match SupabaseImageStore::new(supabase) {
                Ok(blob) => Arc::new(FallbackSink::new(blob, local.clone())),
                Err(e) => {
                    log::warn!("⚠️  Blob storage unavailable ({}), using local filesystem", e);
                    local.clone()
                }
            }
        } else {
            log::warn!("⚠️  Supabase not configured, images will be stored locally");
            local.clone()
        };

        Self { sink, local }
    }

    pub fn sink(&self) -> Arc<dyn ImageSink> {
        self.sink.clone()
    }

    pub fn local(&self) -> &Arc<LocalImageStore> {
        &self.local
    }
}
