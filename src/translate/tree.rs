//! Recursive tree translation over a nested string-keyed document.
//! String leaves are translated; nested maps are walked; every other value
//! (numbers, booleans, null, arrays) is carried through untouched.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::batch::BatchTranslator;
use super::cache::TranslationCache;
use super::Translation;

/// Document value model. `Map` keeps source key order; keys are unique
/// because documents are built from JSON objects.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Text(String),
    Map(Vec<(String, Document)>),
    Other(Value),
}

impl Document {
    pub fn get(&self, key: &str) -> Option<&Document> {
        match self {
            Document::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Document::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Depth-first visit of every string leaf.
    fn collect_texts<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Document::Text(t) => out.push(t),
            Document::Map(entries) => {
                for (_, value) in entries {
                    value.collect_texts(out);
                }
            }
            Document::Other(_) => {}
        }
    }

    /// Same shape, string leaves replaced through `resolved`.
    fn rebuild(&self, resolved: &HashMap<String, Translation>) -> Document {
        match self {
            Document::Text(t) => Document::Text(
                resolved
                    .get(t.as_str())
                    .map(|tr| tr.text().to_string())
                    .unwrap_or_else(|| t.clone()),
            ),
            Document::Map(entries) => Document::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.rebuild(resolved)))
                    .collect(),
            ),
            Document::Other(v) => Document::Other(v.clone()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Document::Text(t) => Value::String(t.clone()),
            Document::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
            Document::Other(v) => v.clone(),
        }
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Document::Text(s),
            Value::Object(map) => {
                Document::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            other => Document::Other(other),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Per-call counts over distinct source texts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub cache_hits: usize,
    pub translated: usize,
    pub fallbacks: usize,
}

#[derive(Debug, Clone)]
pub struct TreeOutcome {
    pub document: Document,
    pub stats: TreeStats,
}

pub struct TreeTranslator {
    cache: Arc<TranslationCache>,
    batch: BatchTranslator,
}

impl TreeTranslator {
    pub fn new(cache: Arc<TranslationCache>, batch: BatchTranslator) -> Self {
        Self { cache, batch }
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    pub fn provider(&self) -> &'static str {
        self.batch.provider()
    }

    /// Translate every string leaf of `document`. Cache hits are used as-is;
    /// misses go upstream in chunks of the batch size, one chunk at a time.
    pub async fn translate_tree(
        &self,
        document: &Document,
        target_lang: &str,
        source_lang: &str,
    ) -> TreeOutcome {
        let mut leaves = Vec::new();
        document.collect_texts(&mut leaves);

        let unique: Vec<String> = {
            let mut seen = HashSet::new();
            leaves
                .into_iter()
                .filter(|t| !t.trim().is_empty() && seen.insert(*t))
                .map(str::to_string)
                .collect()
        };

        let mut stats = TreeStats::default();
        let mut resolved: HashMap<String, Translation> = HashMap::with_capacity(unique.len());
        let mut misses = Vec::new();

        for (text, cached) in unique
            .iter()
            .zip(self.cache.get_batch(target_lang, &unique))
        {
            match cached {
                Some(translation) => {
                    stats.cache_hits += 1;
                    if translation.is_fallback() {
                        stats.fallbacks += 1;
                    }
                    resolved.insert(text.clone(), translation);
                }
                None => misses.push(text.clone()),
            }
        }

        let config = self.batch.config();
        for (i, chunk) in misses.chunks(config.batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(config.batch_delay).await;
            }

            let translations = self
                .batch
                .translate_texts(chunk, target_lang, source_lang)
                .await;
            self.cache.set_batch(target_lang, chunk, &translations);

            for (text, translation) in chunk.iter().zip(translations) {
                if translation.is_fallback() {
                    stats.fallbacks += 1;
                } else {
                    stats.translated += 1;
                }
                resolved.insert(text.clone(), translation);
            }
        }

        debug!(
            target_lang,
            distinct = unique.len(),
            cache_hits = stats.cache_hits,
            translated = stats.translated,
            fallbacks = stats.fallbacks,
            "document translated"
        );

        TreeOutcome {
            document: document.rebuild(&resolved),
            stats,
        }
    }
}
