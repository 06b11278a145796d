//! The endpoint keeps answering 200 with the full document shape when the
//! upstream misbehaves.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::{header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storefront_translate::error::TranslateError;
use storefront_translate::translate::deepl::DeepLClient;
use storefront_translate::translate::{Encoding, StubTranslator, Translator};

use common::{get_translation, json_body, state_with};

#[tokio::test]
async fn unreachable_upstream_serves_fallback_text() {
    let stub = Arc::new(StubTranslator::unreachable());
    let state = state_with(
        stub.clone(),
        json!({ "a": "Hello", "b": { "c": "World", "n": 7 } }),
    );

    let response = get_translation(&state, Some("ES")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["a"], "[ES] Hello");
    assert_eq!(body["b"]["c"], "[ES] World");
    assert_eq!(body["b"]["n"], 7);
    assert_eq!(body["_meta"]["fallbacks"], 2);
    // one batch, both encodings tried
    assert_eq!(stub.calls(), 2);
}

#[tokio::test]
async fn connection_refused_degrades_instead_of_failing() {
    // Nothing listens on the discard port.
    let client = DeepLClient::new(
        "http://127.0.0.1:9/v2/translate",
        Some("secret".to_string()),
        Duration::from_secs(2),
    )
    .unwrap();
    let state = state_with(Arc::new(client), json!({ "title": "Livros" }));

    let response = get_translation(&state, Some("FR")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["title"], "[FR] Livros");
    assert_eq!(body["_meta"]["translated_by"], "DeepL");
}

#[tokio::test]
async fn missing_api_key_degrades() {
    let client = DeepLClient::new("http://127.0.0.1:9/v2/translate", None, Duration::from_secs(2))
        .unwrap();
    let state = state_with(Arc::new(client), json!({ "title": "Livros" }));

    let body = json_body(get_translation(&state, Some("IT")).await).await;
    assert_eq!(body["title"], "[IT] Livros");
}

#[tokio::test]
async fn multipart_retry_recovers_a_failed_batch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/translate"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/translate"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "translations": [{ "detected_source_language": "PT", "text": "Books" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DeepLClient::new(
        format!("{}/v2/translate", server.uri()),
        Some("secret".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();
    let state = state_with(Arc::new(client), json!({ "title": "Livros" }));

    let body = json_body(get_translation(&state, Some("EN")).await).await;
    assert_eq!(body["title"], "Books");
    assert_eq!(body["_meta"]["fallbacks"], 0);
    assert_eq!(body["_meta"]["translated"], 1);
}

/// Panics on its first call, then behaves like the stub.
#[derive(Default)]
struct PanicsOnce {
    panicked: AtomicBool,
    stub: StubTranslator,
}

#[async_trait]
impl Translator for PanicsOnce {
    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
        source_lang: &str,
        encoding: Encoding,
    ) -> Result<Vec<String>, TranslateError> {
        if !self.panicked.swap(true, Ordering::SeqCst) {
            panic!("upstream client bug");
        }
        self.stub
            .translate(texts, target_lang, source_lang, encoding)
            .await
    }

    fn provider(&self) -> &'static str {
        "panics-once"
    }
}

#[tokio::test]
async fn pipeline_panic_is_a_structured_500() {
    let state = state_with(Arc::new(PanicsOnce::default()), json!({ "title": "Livros" }));

    let response = get_translation(&state, Some("ES")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(response).await;
    assert_eq!(body["error"], "Translation failed");
    assert!(body["message"].is_string());
    assert!(body["timestamp"].is_string());

    let response = get_translation(&state, Some("ES")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["title"], "[ES] Livros");
}
