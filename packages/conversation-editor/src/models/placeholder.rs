//! Placeholder identifiers for documents created on the client.
//!
//! The host replaces them with permanent identifiers when the document is
//! saved. Until then a random v4 suffix keeps them apart from each other and
//! from host ids.

use uuid::Uuid;

/// Prefix marking an identifier as a transient placeholder
pub const PLACEHOLDER_ID_PREFIX: &str = "_ID_";

/// Text given to documents created without any
pub const EMPTY_TEXT: &str = "<EMPTY>";

pub fn generate_dialog_node_id_placeholder() -> String {
    format!("{PLACEHOLDER_ID_PREFIX}DIALOG_NODE_{}", Uuid::new_v4().simple())
}

pub fn generate_dialog_response_id_placeholder() -> String {
    format!("{PLACEHOLDER_ID_PREFIX}DIALOG_RESPONSE_{}", Uuid::new_v4().simple())
}

pub fn is_placeholder_id(id: &str) -> bool {
    id.starts_with(PLACEHOLDER_ID_PREFIX)
}
