// Shared helpers for the endpoint tests.

use std::sync::Arc;
use std::time::Duration;

use axum::body::to_bytes;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use storefront_translate::config::Config;
use storefront_translate::routes::{translate_handler, TranslateQuery};
use storefront_translate::state::AppState;
use storefront_translate::translate::tree::Document;
use storefront_translate::translate::Translator;

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.translation.batch_delay = Duration::from_millis(1);
    config
}

pub fn state_with(upstream: Arc<dyn Translator>, document: Value) -> Arc<AppState> {
    AppState::new(test_config(), upstream, Document::from(document))
}

/// Call the translate handler the way the router would, errors included.
pub async fn get_translation(state: &Arc<AppState>, lang: Option<&str>) -> Response {
    let query = TranslateQuery {
        lang: lang.map(str::to_string),
    };
    match translate_handler(State(Arc::clone(state)), Query(query)).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&bytes).expect("JSON body")
}
