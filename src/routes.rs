//! HTTP routes and their handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, info_span, Instrument};

use crate::config::is_language_code;
use crate::error::AppError;
use crate::metrics::metric_names;
use crate::state::AppState;
use crate::translate::tree::TreeStats;
use crate::utc_timestamp;

/// Shared caches keep a response for an hour and may serve it stale for two
/// more while revalidating.
pub const CACHE_CONTROL_VALUE: &str = "public, s-maxage=3600, stale-while-revalidate=7200";

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/translate", get(translate_handler))
        .route("/api/translate/stats", get(stats_handler))
        .route("/api/translate/cache/clear", post(clear_cache_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct TranslateQuery {
    pub lang: Option<String>,
}

#[derive(Debug, Serialize)]
struct Meta<'a> {
    translated_by: &'a str,
    target_language: &'a str,
    source_language: &'a str,
    translation_time: String,
    #[serde(flatten)]
    stats: TreeStats,
}

/// Trim and upper-case `lang`; empty means "use the default".
pub fn normalize_lang(lang: Option<&str>, default: &str) -> Result<String, AppError> {
    let lang = match lang.map(str::trim) {
        Some(l) if !l.is_empty() => l.to_uppercase(),
        _ => default.to_uppercase(),
    };

    if !is_language_code(&lang) {
        return Err(AppError::InvalidLanguage(lang));
    }
    Ok(lang)
}

/// `GET /api/translate?lang=XX`: the source document translated into `lang`,
/// plus a `_meta` block.
pub async fn translate_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TranslateQuery>,
) -> Result<Response, AppError> {
    let target_lang = normalize_lang(query.lang.as_deref(), &state.config.default_target_lang)?;
    let source_lang = state.config.source_lang.clone();

    let span = info_span!(
        "translate",
        request_id = %uuid::Uuid::new_v4(),
        target_lang = %target_lang
    );

    let timer = state.metrics.start_timer(metric_names::TRANSLATE_REQUEST);

    // Run on its own task so a panic inside the pipeline becomes a 500
    // instead of tearing down the connection.
    let task_state = Arc::clone(&state);
    let task_target = target_lang.clone();
    let task = tokio::spawn(
        async move {
            if task_target == task_state.config.source_lang {
                info!("target equals source language, serving source document");
                return (task_state.document.clone(), TreeStats::default(), "source");
            }

            let outcome = task_state
                .translator
                .translate_tree(&task_state.document, &task_target, &task_state.config.source_lang)
                .await;
            info!(
                cache_hits = outcome.stats.cache_hits,
                translated = outcome.stats.translated,
                fallbacks = outcome.stats.fallbacks,
                "translation complete"
            );
            (outcome.document, outcome.stats, task_state.translator.provider())
        }
        .instrument(span),
    );

    let (document, stats, translated_by) = task.await.map_err(|e| {
        error!(error = %e, target_lang = %target_lang, "translation task failed");
        AppError::Internal(format!("translation task failed: {e}"))
    })?;
    timer.finish();

    let mut body = match document.to_json() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let meta = Meta {
        translated_by,
        target_language: &target_lang,
        source_language: &source_lang,
        translation_time: utc_timestamp(),
        stats,
    };
    body.insert(
        "_meta".to_string(),
        serde_json::to_value(&meta).map_err(|e| AppError::Internal(e.to_string()))?,
    );

    Ok((
        [(header::CACHE_CONTROL, CACHE_CONTROL_VALUE)],
        Json(Value::Object(body)),
    )
        .into_response())
}

/// `GET /api/translate/stats`
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cache = state.cache();
    let metrics = &state.metrics;

    Json(json!({
        "cache": {
            "entries": cache.len(),
            "hits": cache.hits(),
            "misses": cache.misses(),
        },
        "upstream": {
            "calls": metrics.counter(metric_names::UPSTREAM_CALLS),
            "failures": metrics.counter(metric_names::UPSTREAM_FAILURES),
            "fallback_texts": metrics.counter(metric_names::FALLBACK_TEXTS),
        },
        "latency": metrics.latency_summary(),
    }))
}

/// `POST /api/translate/cache/clear`
pub async fn clear_cache_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cleared = state.cache().clear();
    info!(cleared, "translation cache cleared on request");
    Json(json!({ "cleared": cleared }))
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_codes_are_normalized() {
        assert_eq!(normalize_lang(Some(" es "), "EN").unwrap(), "ES");
        assert_eq!(normalize_lang(Some("en-us"), "EN").unwrap(), "EN-US");
        assert_eq!(normalize_lang(Some("zh-hans"), "EN").unwrap(), "ZH-HANS");
        assert_eq!(normalize_lang(None, "en").unwrap(), "EN");
        assert_eq!(normalize_lang(Some(""), "EN").unwrap(), "EN");
    }

    #[test]
    fn malformed_language_codes_are_rejected() {
        for bad in ["e", "english", "e1", "EN_US", "EN-", "../etc"] {
            assert!(
                matches!(normalize_lang(Some(bad), "EN"), Err(AppError::InvalidLanguage(_))),
                "{bad} should be rejected"
            );
        }
    }
}
