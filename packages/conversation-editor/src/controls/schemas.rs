use charon_extensions::{Metadata, Schema};
use serde::Deserialize;

use crate::errors::EditorError;

const BUILTIN_SCHEMAS: &str = include_str!("../schema_validation/conversation_schema.json");

/// The three schemas a conversation tree is built from
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSchemas {
    pub conversation_tree: Schema,
    pub dialog_node: Schema,
    pub dialog_response: Schema,
}

#[derive(Deserialize)]
struct SchemaExport {
    #[serde(rename = "Collections")]
    collections: SchemaCollections,
}

#[derive(Deserialize)]
struct SchemaCollections {
    #[serde(rename = "Schema")]
    schema: Vec<Schema>,
}

impl ConversationSchemas {
    /// Follow `Nodes` and `Responses` from the conversation tree schema
    pub fn resolve(metadata: &Metadata, conversation_tree: &Schema) -> Result<Self, EditorError> {
        let dialog_node = referenced(metadata, conversation_tree, "Nodes")?;
        let dialog_response = referenced(metadata, dialog_node, "Responses")?;
        Ok(Self {
            conversation_tree: conversation_tree.clone(),
            dialog_node: dialog_node.clone(),
            dialog_response: dialog_response.clone(),
        })
    }

    /// Schemas the editor expects, as shipped with the extension
    pub fn builtin() -> Result<Self, EditorError> {
        let metadata = builtin_metadata()?;
        let conversation_tree = metadata
            .find_schema("ConversationTree")
            .ok_or_else(|| EditorError::SchemaNotFound("ConversationTree".to_string()))?;
        Self::resolve(&metadata, conversation_tree)
    }
}

pub(crate) fn builtin_metadata() -> Result<Metadata, EditorError> {
    let export: SchemaExport = serde_json::from_str(BUILTIN_SCHEMAS)?;
    Ok(Metadata::new(export.collections.schema))
}

fn referenced<'a>(
    metadata: &'a Metadata,
    schema: &Schema,
    property_name: &str,
) -> Result<&'a Schema, EditorError> {
    schema
        .find_schema_property(property_name)
        .and_then(|property| metadata.referenced_schema(property))
        .ok_or_else(|| EditorError::SchemaNotFound(format!("{}.{}", schema.name, property_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_schemas_resolve() {
        let schemas = ConversationSchemas::builtin().unwrap();
        assert_eq!(schemas.conversation_tree.name, "ConversationTree");
        assert_eq!(schemas.dialog_node.name, "DialogNode");
        assert_eq!(schemas.dialog_response.name, "DialogResponse");
    }

    #[test]
    fn test_missing_reference_is_reported() {
        let mut metadata = builtin_metadata().unwrap();
        metadata.schemas.retain(|schema| schema.name != "DialogResponse");
        let tree = metadata.find_schema("ConversationTree").unwrap().clone();
        let error = ConversationSchemas::resolve(&metadata, &tree).unwrap_err();
        assert!(matches!(error, EditorError::SchemaNotFound(path) if path == "DialogNode.Responses"));
    }
}
