use charon_extensions::{DataType, Metadata, Schema};

use super::SchemaValidationError;

/// Collect every structural problem of a conversation tree schema.
///
/// Nested schemas are only checked when the collection pointing at them has
/// the right type and its referenced schema can be found.
pub fn validate_schema(metadata: &Metadata, conversation_tree: &Schema) -> Vec<SchemaValidationError> {
    let mut errors = Vec::new();

    let mut path = vec![conversation_tree.display_name.clone()];
    check(conversation_tree, &path, "RootNode", &[DataType::Reference], &mut errors);
    check(conversation_tree, &path, "Nodes", &[DataType::DocumentCollection], &mut errors);
    check(conversation_tree, &path, "Specification", &[DataType::Text], &mut errors);

    let Some(dialog_node) = referenced_collection(metadata, conversation_tree, "Nodes") else {
        return errors;
    };
    path.extend(["Nodes".to_string(), dialog_node.display_name.clone()]);
    check(dialog_node, &path, "Text", &[DataType::Text, DataType::LocalizedText], &mut errors);
    check(dialog_node, &path, "NextNode", &[DataType::Reference], &mut errors);
    check(dialog_node, &path, "Responses", &[DataType::DocumentCollection], &mut errors);
    check(dialog_node, &path, "Specification", &[DataType::Text], &mut errors);

    let Some(dialog_response) = referenced_collection(metadata, dialog_node, "Responses") else {
        return errors;
    };
    path.extend(["Responses".to_string(), dialog_response.display_name.clone()]);
    check(dialog_response, &path, "Text", &[DataType::Text, DataType::LocalizedText], &mut errors);
    check(dialog_response, &path, "NextNode", &[DataType::Reference], &mut errors);
    check(dialog_response, &path, "Specification", &[DataType::Text], &mut errors);

    errors
}

fn referenced_collection<'a>(metadata: &'a Metadata, schema: &Schema, property_name: &str) -> Option<&'a Schema> {
    let property = schema.find_schema_property(property_name)?;
    if property.data_type != DataType::DocumentCollection {
        return None;
    }
    metadata.referenced_schema(property)
}

fn check(
    schema: &Schema,
    model_path: &[String],
    property_name: &str,
    expected_types: &[DataType],
    errors: &mut Vec<SchemaValidationError>,
) {
    let (actual_type, missing) = match schema.find_schema_property(property_name) {
        None => (None, true),
        Some(property) if expected_types.contains(&property.data_type) => return,
        Some(property) => (Some(property.data_type), false),
    };
    errors.push(SchemaValidationError {
        model_path: model_path.to_vec(),
        property_name: property_name.to_string(),
        expected_types: expected_types.to_vec(),
        actual_type,
        missing,
    });
}
