//! Error types for the conversation editor

use charon_extensions::ControlError;
use thiserror::Error;

use crate::schema_validation::SchemaValidationError;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Control error: {0}")]
    Control(#[from] ControlError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    #[error("Conversation schema is not supported ({} problems)", .0.len())]
    SchemaValidation(Vec<SchemaValidationError>),
}
