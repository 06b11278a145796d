//! DeepL API translation client.
//! One call per batch: repeated `text` fields plus `target_lang`/`source_lang`,
//! sent either URL-encoded or as multipart form data.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::Deserialize;
use tracing::debug;

use super::{Encoding, Translator};
use crate::error::TranslateError;

pub struct DeepLClient {
    http: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
}

impl DeepLClient {
    /// A client without a key is valid: every call fails with
    /// `MissingApiKey` and the pipeline serves fallback text.
    pub fn new(
        api_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TranslateError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            api_key,
            api_url: api_url.into(),
        })
    }

    fn form_fields<'a>(
        texts: &'a [String],
        target_lang: &'a str,
        source_lang: &'a str,
    ) -> Vec<(&'static str, &'a str)> {
        let mut fields: Vec<(&'static str, &'a str)> =
            texts.iter().map(|t| ("text", t.as_str())).collect();
        fields.push(("target_lang", target_lang));
        fields.push(("source_lang", source_lang));
        fields
    }

    fn multipart_form(texts: &[String], target_lang: &str, source_lang: &str) -> Form {
        Self::form_fields(texts, target_lang, source_lang)
            .into_iter()
            .fold(Form::new(), |form, (name, value)| {
                form.text(name, value.to_string())
            })
    }
}

#[async_trait]
impl Translator for DeepLClient {
    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
        source_lang: &str,
        encoding: Encoding,
    ) -> Result<Vec<String>, TranslateError> {
        let api_key = self.api_key.as_deref().ok_or(TranslateError::MissingApiKey)?;

        let request = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("DeepL-Auth-Key {api_key}"));

        let request = match encoding {
            Encoding::UrlEncoded => {
                request.form(&Self::form_fields(texts, target_lang, source_lang))
            }
            Encoding::Multipart => {
                request.multipart(Self::multipart_form(texts, target_lang, source_lang))
            }
        };

        let start = Instant::now();
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(TranslateError::Status {
                status: status.as_u16(),
                body: body_text.chars().take(200).collect(),
            });
        }

        let body: DeepLResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::MalformedResponse(e.to_string()))?;

        if body.translations.len() != texts.len() {
            return Err(TranslateError::CountMismatch {
                expected: texts.len(),
                got: body.translations.len(),
            });
        }

        debug!(
            count = texts.len(),
            ?encoding,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "DeepL batch translated"
        );

        Ok(body.translations.into_iter().map(|t| t.text).collect())
    }

    fn provider(&self) -> &'static str {
        "DeepL"
    }
}

// --- Response types ---

#[derive(Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize)]
struct DeepLTranslation {
    text: String,
}
