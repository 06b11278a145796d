//! The fixed source document served in translated form.
//! Embedded at build time; `SOURCE_DOCUMENT_PATH` may point at a replacement.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::translate::tree::Document;

const EMBEDDED: &str = include_str!("../content/source.pt.json");

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source document IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source document parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("source document must be a JSON object")]
    NotAnObject,
}

/// Parse a document; the root must be an object.
pub fn parse(content: &str) -> Result<Document, SourceError> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    if !value.is_object() {
        return Err(SourceError::NotAnObject);
    }
    Ok(Document::from(value))
}

pub fn embedded() -> Result<Document, SourceError> {
    parse(EMBEDDED)
}

/// Load from `path` if given, otherwise the embedded document.
pub fn load(path: Option<&Path>) -> Result<Document, SourceError> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let document = parse(&content)?;
            info!(path = %path.display(), "source document loaded from file");
            Ok(document)
        }
        None => embedded(),
    }
}
