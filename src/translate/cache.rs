//! In-memory translation cache with TTL.
//! Key: blake3 hash of (target_lang | text). No capacity bound: entries leave
//! only through lazy expiry on read or `clear()`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::Translation;

type CacheKey = [u8; 32];

struct CacheEntry {
    value: Translation,
    inserted_at: Instant,
}

/// Shared across requests. The lock is held for one operation at a time and
/// never across an `.await`.
pub struct TranslationCache {
    inner: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TranslationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn compute_key(lang: &str, text: &str) -> CacheKey {
        let mut hasher = blake3::Hasher::new();
        hasher.update(lang.as_bytes());
        hasher.update(b"|");
        hasher.update(text.as_bytes());
        *hasher.finalize().as_bytes()
    }

    /// Look up a cached translation. Returns None if absent or expired.
    pub fn get(&self, lang: &str, text: &str) -> Option<Translation> {
        let mut cache = self.inner.lock();
        self.lookup(&mut cache, lang, text)
    }

    pub fn set(&self, lang: &str, text: &str, translation: Translation) {
        let mut cache = self.inner.lock();
        Self::store(&mut cache, lang, text, translation);
    }

    /// Vectorized `get`, aligned with `texts`.
    pub fn get_batch(&self, lang: &str, texts: &[String]) -> Vec<Option<Translation>> {
        let mut cache = self.inner.lock();
        texts
            .iter()
            .map(|text| self.lookup(&mut cache, lang, text))
            .collect()
    }

    /// Vectorized `set`; `texts` and `translations` are paired positionally.
    pub fn set_batch(&self, lang: &str, texts: &[String], translations: &[Translation]) {
        debug_assert_eq!(texts.len(), translations.len());
        let mut cache = self.inner.lock();
        for (text, translation) in texts.iter().zip(translations) {
            Self::store(&mut cache, lang, text, translation.clone());
        }
    }

    /// Drop every entry. Returns how many were held, expired ones included.
    pub fn clear(&self) -> usize {
        let mut cache = self.inner.lock();
        let count = cache.len();
        cache.clear();
        debug!(count, "translation cache cleared");
        count
    }

    /// Entries currently stored, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    fn lookup(
        &self,
        cache: &mut HashMap<CacheKey, CacheEntry>,
        lang: &str,
        text: &str,
    ) -> Option<Translation> {
        let key = Self::compute_key(lang, text);
        if let Some(entry) = cache.get(&key) {
            if entry.inserted_at.elapsed() < self.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            // Expired: evict on read
            cache.remove(&key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn store(
        cache: &mut HashMap<CacheKey, CacheEntry>,
        lang: &str,
        text: &str,
        value: Translation,
    ) {
        cache.insert(
            Self::compute_key(lang, text),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(s: &str) -> Translation {
        Translation::Translated(s.to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn get_after_set_within_window() {
        let cache = TranslationCache::new(Duration::from_secs(60));
        cache.set("EN", "Olá", ok("Hello"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get("EN", "Olá"), Some(ok("Hello")));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_evicted_on_read() {
        let cache = TranslationCache::new(Duration::from_secs(60));
        cache.set("EN", "Olá", ok("Hello"));
        assert_eq!(cache.len(), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cache.get("EN", "Olá"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn keys_are_scoped_by_language() {
        let cache = TranslationCache::new(Duration::from_secs(60));
        cache.set("EN", "Livro", ok("Book"));
        cache.set("ES", "Livro", ok("Libro"));

        assert_eq!(cache.get("EN", "Livro"), Some(ok("Book")));
        assert_eq!(cache.get("ES", "Livro"), Some(ok("Libro")));
        assert_eq!(cache.get("FR", "Livro"), None);
    }

    #[test]
    fn set_overwrites() {
        let cache = TranslationCache::new(Duration::from_secs(60));
        cache.set("EN", "Olá", Translation::fallback("EN", "Olá"));
        cache.set("EN", "Olá", ok("Hello"));
        assert_eq!(cache.get("EN", "Olá"), Some(ok("Hello")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn batch_ops_match_single_ops() {
        let texts: Vec<String> = ["Carrinho", "Blog", "Loja"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let translations = vec![ok("Cart"), ok("Blog"), ok("Shop")];

        let batched = TranslationCache::new(Duration::from_secs(60));
        batched.set_batch("EN", &texts, &translations);

        let single = TranslationCache::new(Duration::from_secs(60));
        for (text, translation) in texts.iter().zip(&translations) {
            single.set("EN", text, translation.clone());
        }

        let mut probe = texts.clone();
        probe.insert(1, "Ausente".to_string());

        let from_batch = batched.get_batch("EN", &probe);
        let from_single: Vec<_> = probe.iter().map(|t| single.get("EN", t)).collect();

        assert_eq!(from_batch, from_single);
        assert_eq!(from_batch[1], None);
        assert_eq!(from_batch[0], Some(ok("Cart")));
        assert_eq!(from_batch[3], Some(ok("Shop")));
    }

    #[test]
    fn clear_drops_everything() {
        let cache = TranslationCache::new(Duration::from_secs(60));
        cache.set("EN", "a", ok("a"));
        cache.set("EN", "b", ok("b"));
        assert_eq!(cache.clear(), 2);
        assert_eq!(cache.get("EN", "a"), None);
    }

    #[test]
    fn hit_and_miss_counters() {
        let cache = TranslationCache::new(Duration::from_secs(60));
        cache.get("EN", "x");
        cache.set("EN", "x", ok("x"));
        cache.get("EN", "x");
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }
}
