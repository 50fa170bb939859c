use charon_extensions::{DataType, Metadata, Schema, SchemaReference};
use tracing::info;

use crate::controls::schemas::builtin_metadata;
use crate::errors::EditorError;

/// Bring a conversation tree schema and the schemas it references in line
/// with the built-in ones.
///
/// Missing properties are added and mismatching ones overwritten, except for
/// `Id` which keeps the host's definition. References between the three
/// schemas are then re-pointed at each other. Schemas that cannot be found
/// are replaced by the built-in ones. Returns the conversation tree, dialog
/// node and dialog response schemas, ready to import into the host.
pub fn migrate_schema(metadata: &Metadata, conversation_tree: &Schema) -> Result<Vec<Schema>, EditorError> {
    let builtin = builtin_metadata()?;
    let expected = |name: &str| {
        builtin
            .find_schema(name)
            .cloned()
            .ok_or_else(|| EditorError::SchemaNotFound(name.to_string()))
    };
    let expected_tree = expected("ConversationTree")?;
    let expected_node = expected("DialogNode")?;
    let expected_response = expected("DialogResponse")?;

    let existing_node = referenced_collection(metadata, conversation_tree, "Nodes");
    let existing_response =
        existing_node.and_then(|node| referenced_collection(metadata, node, "Responses"));

    let mut tree = conversation_tree.clone();
    let mut node = existing_node.cloned().unwrap_or_else(|| expected_node.clone());
    let mut response = existing_response
        .cloned()
        .unwrap_or_else(|| expected_response.clone());

    update_properties(&mut tree, &expected_tree);
    update_properties(&mut node, &expected_node);
    update_properties(&mut response, &expected_response);

    let node_reference = reference_to(&node);
    let response_reference = reference_to(&response);
    update_reference_type(&mut tree, "RootNode", &node_reference);
    update_reference_type(&mut tree, "Nodes", &node_reference);
    update_reference_type(&mut node, "NextNode", &node_reference);
    update_reference_type(&mut node, "Responses", &response_reference);
    update_reference_type(&mut response, "NextNode", &node_reference);

    info!(schema = %conversation_tree.name, "conversation schemas migrated");
    Ok(vec![tree, node, response])
}

fn referenced_collection<'a>(metadata: &'a Metadata, schema: &Schema, property_name: &str) -> Option<&'a Schema> {
    schema
        .find_schema_property(property_name)
        .filter(|property| property.data_type == DataType::DocumentCollection)
        .and_then(|property| metadata.referenced_schema(property))
}

fn update_properties(schema: &mut Schema, expected: &Schema) {
    for expected_property in &expected.properties {
        match schema.find_schema_property_mut(&expected_property.name) {
            Some(existing) if existing.name == "Id" => {}
            Some(existing) => *existing = expected_property.clone(),
            None => schema.properties.push(expected_property.clone()),
        }
    }
}

fn reference_to(schema: &Schema) -> SchemaReference {
    SchemaReference {
        id: schema.id.clone(),
        display_name: schema.display_name.clone(),
    }
}

fn update_reference_type(schema: &mut Schema, property_name: &str, reference: &SchemaReference) {
    let Some(property) = schema.find_schema_property_mut(property_name) else {
        return;
    };
    if !property.data_type.has_referenced_schema() {
        return;
    }
    property.reference_type = Some(reference.clone());
}
