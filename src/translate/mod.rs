//! Translation pipeline: cache -> batch translator -> tree translator.
//! The upstream service sits behind the `Translator` trait so the pipeline can
//! run against DeepL in production and a stub in tests.

pub mod batch;
pub mod cache;
pub mod deepl;
pub mod tree;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::TranslateError;

/// Outcome for one source text.
/// `Fallback` marks degraded output produced while the upstream was unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Translated(String),
    Fallback(String),
}

impl Translation {
    /// Tagged passthrough used when every encoding failed: `"[ES] Olá"`.
    pub fn fallback(target_lang: &str, text: &str) -> Self {
        Translation::Fallback(format!("[{target_lang}] {text}"))
    }

    pub fn text(&self) -> &str {
        match self {
            Translation::Translated(t) | Translation::Fallback(t) => t,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Translation::Fallback(_))
    }
}

/// Request body encoding for the upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    UrlEncoded,
    Multipart,
}

impl Encoding {
    /// The encoding tried after `self` fails, if any.
    pub fn alternate(self) -> Option<Encoding> {
        match self {
            Encoding::UrlEncoded => Some(Encoding::Multipart),
            Encoding::Multipart => None,
        }
    }
}

/// Upstream translation backend. One call translates one batch; the result
/// must be aligned with `texts`.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
        source_lang: &str,
        encoding: Encoding,
    ) -> Result<Vec<String>, TranslateError>;

    /// Reported as `_meta.translated_by`.
    fn provider(&self) -> &'static str;
}

/// Offline translator: prefixes every text with the target language.
/// Counts calls so callers can assert on upstream traffic.
#[derive(Debug, Default)]
pub struct StubTranslator {
    calls: AtomicUsize,
    fail: bool,
}

impl StubTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stub whose every call fails, as if the upstream were unreachable.
    pub fn unreachable() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for StubTranslator {
    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
        _source_lang: &str,
        _encoding: Encoding,
    ) -> Result<Vec<String>, TranslateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TranslateError::Status {
                status: 503,
                body: "stub upstream unavailable".into(),
            });
        }

        Ok(texts
            .iter()
            .map(|t| format!("[{target_lang}] {t}"))
            .collect())
    }

    fn provider(&self) -> &'static str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_tagged_with_language() {
        let t = Translation::fallback("ES", "Olá");
        assert!(t.is_fallback());
        assert_eq!(t.text(), "[ES] Olá");
    }

    #[test]
    fn alternate_encoding_is_tried_once() {
        assert_eq!(Encoding::UrlEncoded.alternate(), Some(Encoding::Multipart));
        assert_eq!(Encoding::Multipart.alternate(), None);
    }

    #[tokio::test]
    async fn stub_counts_calls() {
        let stub = StubTranslator::new();
        let out = stub
            .translate(&["Olá".to_string()], "EN", "PT", Encoding::UrlEncoded)
            .await
            .unwrap();
        assert_eq!(out, vec!["[EN] Olá".to_string()]);
        assert_eq!(stub.calls(), 1);
    }
}
