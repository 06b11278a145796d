//! Environment-driven configuration. Every setting has a default; a missing or
//! unparsable variable is logged and the default applies.

use std::{
    env,
    fmt::Display,
    fs::read_to_string,
    path::PathBuf,
    str::FromStr,
    sync::OnceLock,
    time::Duration,
};

use regex::Regex;
use tracing::{info, warn};

pub const DEFAULT_API_URL: &str = "https://api-free.deepl.com/v2/translate";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub api_url: String,
    pub api_key: Option<String>,
    pub source_lang: String,
    pub default_target_lang: String,
    pub source_document_path: Option<PathBuf>,
    pub translation: TranslationConfig,
}

/// Knobs shared by the cache, batch translator, tree translator and client.
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub cache_ttl: Duration,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub max_text_chars: usize,
    pub request_timeout: Duration,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(24 * 3600),
            batch_size: 50,
            batch_delay: Duration::from_millis(100),
            max_text_chars: 1000,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            source_lang: "PT".to_string(),
            default_target_lang: "EN".to_string(),
            source_document_path: None,
            translation: TranslationConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let defaults = Config::default();
        let translation = defaults.translation;

        Self {
            bind_addr: try_load("BIND_ADDR", defaults.bind_addr),
            port: try_load("PORT", defaults.port),
            api_url: try_load("DEEPL_API_URL", defaults.api_url),
            api_key: load_api_key(),
            source_lang: load_lang("SOURCE_LANG", defaults.source_lang),
            default_target_lang: load_lang("DEFAULT_TARGET_LANG", defaults.default_target_lang),
            source_document_path: var("SOURCE_DOCUMENT_PATH").map(PathBuf::from),
            translation: TranslationConfig {
                cache_ttl: Duration::from_secs(try_load(
                    "TRANSLATION_CACHE_TTL_SECS",
                    translation.cache_ttl.as_secs(),
                )),
                batch_size: try_load::<usize>("TRANSLATION_BATCH_SIZE", translation.batch_size)
                    .max(1),
                batch_delay: Duration::from_millis(try_load(
                    "TRANSLATION_BATCH_DELAY_MS",
                    translation.batch_delay.as_millis() as u64,
                )),
                max_text_chars: try_load::<usize>(
                    "TRANSLATION_MAX_TEXT_CHARS",
                    translation.max_text_chars,
                )
                .max(1),
                request_timeout: Duration::from_secs(try_load(
                    "TRANSLATION_TIMEOUT_SECS",
                    translation.request_timeout.as_secs(),
                )),
            },
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = var(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };

    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
    })
}

/// `EN`, `PT-BR`, `ZH-HANS`: two letters, optionally a 2-4 letter variant.
/// Expects an upper-cased code.
pub fn is_language_code(code: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^[A-Z]{2}(-[A-Z]{2,4})?$").expect("valid language pattern")
        })
        .is_match(code)
}

fn load_lang(key: &str, default: String) -> String {
    let lang = try_load(key, default.clone()).to_uppercase();
    if is_language_code(&lang) {
        return lang;
    }
    warn!("Invalid {key} language code {lang:?}, using default: {default}");
    default
}

/// `DEEPL_API_KEY` first, then the secrets file named by `DEEPL_API_KEY_FILE`.
fn load_api_key() -> Option<String> {
    if let Some(key) = var("DEEPL_API_KEY") {
        return Some(key.trim().to_string());
    }

    let path = var("DEEPL_API_KEY_FILE")?;
    match read_to_string(&path) {
        Ok(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Ok(_) => {
            warn!("Secrets file {path} is empty");
            None
        }
        Err(e) => {
            warn!("Failed to read API key from {path}: {e}");
            None
        }
    }
}
