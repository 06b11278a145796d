//! Shared application state handed to every handler.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::StartupError;
use crate::metrics::MetricsRegistry;
use crate::source;
use crate::translate::batch::{BatchConfig, BatchTranslator};
use crate::translate::cache::TranslationCache;
use crate::translate::deepl::DeepLClient;
use crate::translate::tree::{Document, TreeTranslator};
use crate::translate::Translator;

/// Everything a handler needs, built once at startup and shared by `Arc`.
pub struct AppState {
    pub config: Config,
    pub document: Document,
    pub translator: TreeTranslator,
    pub metrics: Arc<MetricsRegistry>,
}

impl AppState {
    pub fn new(config: Config, upstream: Arc<dyn Translator>, document: Document) -> Arc<Self> {
        let metrics = Arc::new(MetricsRegistry::new());
        let cache = Arc::new(TranslationCache::new(config.translation.cache_ttl));
        let batch = BatchTranslator::new(
            upstream,
            Arc::clone(&metrics),
            BatchConfig::from(&config.translation),
        );

        Arc::new(Self {
            config,
            document,
            translator: TreeTranslator::new(cache, batch),
            metrics,
        })
    }

    /// Production wiring: DeepL upstream and the configured source document.
    pub fn from_config(config: Config) -> Result<Arc<Self>, StartupError> {
        let document = source::load(config.source_document_path.as_deref())?;

        if config.api_key.is_none() {
            warn!("DEEPL_API_KEY not set, every translation will fall back to tagged source text");
        }
        let client = DeepLClient::new(
            config.api_url.clone(),
            config.api_key.clone(),
            config.translation.request_timeout,
        )?;
        info!(api_url = %config.api_url, "DeepL client initialized");

        Ok(Self::new(config, Arc::new(client), document))
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        self.translator.cache()
    }
}
