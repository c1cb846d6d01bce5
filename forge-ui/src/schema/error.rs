use thiserror::Error;

/// Errors raised while importing a schema document.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The document is not valid JSON, or does not decode into the target shape.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The document root is not a JSON object.
    #[error("document root must be a JSON object")]
    NotAnObject,
    /// A required top-level field is absent.
    #[error("missing required field `{0}`")]
    MissingField(String),
    /// A field has the wrong JSON type.
    #[error("type mismatch at `{path}`: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}
