//! Batch translator.
//! Dedupes and truncates source texts, splits them into bounded batches sent
//! one after another with a fixed pause, retries a failed batch once with the
//! alternate encoding, and degrades to fallback text when both fail.
//! Output is always aligned with the input.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{Encoding, Translation, Translator};
use crate::config::TranslationConfig;
use crate::metrics::{metric_names, MetricsRegistry};

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Max texts per upstream call.
    pub batch_size: usize,
    /// Pause between consecutive upstream calls.
    pub batch_delay: Duration,
    /// Texts longer than this (in chars) are truncated before sending.
    pub max_text_chars: usize,
}

impl From<&TranslationConfig> for BatchConfig {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            batch_delay: config.batch_delay,
            max_text_chars: config.max_text_chars.max(1),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from(&TranslationConfig::default())
    }
}

pub struct BatchTranslator {
    translator: Arc<dyn Translator>,
    metrics: Arc<MetricsRegistry>,
    config: BatchConfig,
}

impl BatchTranslator {
    pub fn new(
        translator: Arc<dyn Translator>,
        metrics: Arc<MetricsRegistry>,
        config: BatchConfig,
    ) -> Self {
        Self {
            translator,
            metrics,
            config,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn provider(&self) -> &'static str {
        self.translator.provider()
    }

    /// Translate `texts`, returning one result per input in input order.
    /// Blank texts map to themselves and never reach the upstream.
    pub async fn translate_texts(
        &self,
        texts: &[String],
        target_lang: &str,
        source_lang: &str,
    ) -> Vec<Translation> {
        // Per input: None for blank, Some(lookup form) otherwise
        let keys: Vec<Option<String>> = texts
            .iter()
            .map(|t| (!t.trim().is_empty()).then(|| self.truncate(t)))
            .collect();

        let unique: Vec<String> = {
            let mut seen = HashSet::new();
            keys.iter()
                .flatten()
                .filter(|k| seen.insert(*k))
                .cloned()
                .collect()
        };

        let mut resolved: HashMap<String, Translation> = HashMap::with_capacity(unique.len());
        for (i, chunk) in unique.chunks(self.config.batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.batch_delay).await;
            }
            let results = self.translate_batch(chunk, target_lang, source_lang).await;
            resolved.extend(chunk.iter().cloned().zip(results));
        }

        texts
            .iter()
            .zip(keys)
            .map(|(text, key)| match key {
                None => Translation::Translated(text.clone()),
                Some(key) => resolved
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| Translation::fallback(target_lang, &key)),
            })
            .collect()
    }

    /// One batch: URL-encoded first, multipart once on failure, then fallback.
    async fn translate_batch(
        &self,
        batch: &[String],
        target_lang: &str,
        source_lang: &str,
    ) -> Vec<Translation> {
        let mut encoding = Some(Encoding::UrlEncoded);
        let mut last_error = None;

        while let Some(enc) = encoding {
            self.metrics.incr(metric_names::UPSTREAM_CALLS, 1);
            let timer = self.metrics.start_timer(metric_names::UPSTREAM_CALL);

            match self
                .translator
                .translate(batch, target_lang, source_lang, enc)
                .await
            {
                Ok(translated) => {
                    timer.finish();
                    debug!(count = batch.len(), ?enc, "batch translated");
                    return translated.into_iter().map(Translation::Translated).collect();
                }
                Err(e) => {
                    self.metrics.incr(metric_names::UPSTREAM_FAILURES, 1);
                    warn!(error = %e, ?enc, count = batch.len(), "translation batch failed");
                    encoding = if e.is_retryable() { enc.alternate() } else { None };
                    last_error = Some(e);
                }
            }
        }

        let error = last_error.map(|e| e.to_string()).unwrap_or_default();
        warn!(
            count = batch.len(),
            error = %error,
            "upstream unavailable, serving fallback text"
        );
        self.metrics
            .incr(metric_names::FALLBACK_TEXTS, batch.len() as u64);

        batch
            .iter()
            .map(|t| Translation::fallback(target_lang, t))
            .collect()
    }

    fn truncate(&self, text: &str) -> String {
        match text.char_indices().nth(self.config.max_text_chars) {
            Some((cut, _)) => text[..cut].to_string(),
            None => text.to_string(),
        }
    }
}
