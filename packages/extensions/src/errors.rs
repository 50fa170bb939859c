//! Error types for host controls

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error("Invalid document object: {0}")]
    InvalidDocument(String),
}
