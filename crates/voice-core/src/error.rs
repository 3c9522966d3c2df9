//! Error types for voice-core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed rulebook: {0}")]
    Rulebook(String),

    #[error("profile must be a JSON object, got {found}")]
    ProfileNotObject { found: &'static str },

    #[error("profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A profile entry whose value is neither a string nor a list of strings.
///
/// Collected during ingestion and reported to the caller; the offending
/// category is skipped and the rest of the profile is kept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid profile shape for '{category}': expected a string or a list of strings, got {found}")]
pub struct InvalidProfileShape {
    pub category: String,
    pub found: &'static str,
}

/// Short JSON type name for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
