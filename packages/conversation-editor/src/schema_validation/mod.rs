//! Checks that host schemas have the shape the editor needs, and repairs
//! them when they don't.

mod migrate;
mod validate;

pub use migrate::migrate_schema;
pub use validate::validate_schema;

use std::fmt;

use charon_extensions::{DataType, Metadata, Schema};

use crate::errors::EditorError;

/// A property that is missing or has the wrong type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaValidationError {
    /// Display names leading to the schema that owns the property
    pub model_path: Vec<String>,
    pub property_name: String,
    pub expected_types: Vec<DataType>,
    pub actual_type: Option<DataType>,
    pub missing: bool,
}

impl fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected = self
            .expected_types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        write!(f, "{}.{}: ", self.model_path.join("."), self.property_name)?;
        match self.actual_type {
            Some(actual) if !self.missing => write!(f, "expected {expected}, found {actual}"),
            _ => write!(f, "missing property of type {expected}"),
        }
    }
}

/// Fail with every problem found in the conversation tree schema
pub fn ensure_valid_schema(metadata: &Metadata, conversation_tree: &Schema) -> Result<(), EditorError> {
    let errors = validate_schema(metadata, conversation_tree);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(EditorError::SchemaValidation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let missing = SchemaValidationError {
            model_path: vec!["Conversation".into(), "Nodes".into(), "Dialog Node".into()],
            property_name: "Responses".into(),
            expected_types: vec![DataType::DocumentCollection],
            actual_type: None,
            missing: true,
        };
        assert_eq!(
            missing.to_string(),
            "Conversation.Nodes.Dialog Node.Responses: missing property of type DocumentCollection"
        );

        let mismatch = SchemaValidationError {
            model_path: vec!["Dialog Response".into()],
            property_name: "Text".into(),
            expected_types: vec![DataType::Text, DataType::LocalizedText],
            actual_type: Some(DataType::Integer),
            missing: false,
        };
        assert_eq!(
            mismatch.to_string(),
            "Dialog Response.Text: expected Text or LocalizedText, found Integer"
        );
    }
}
