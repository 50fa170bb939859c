use charon_extensions::{DocumentId, DocumentReference};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Text;

/// Root document: an ordered collection of dialog nodes plus the reference
/// to the node the conversation starts from.
///
/// Properties the editor does not model (character, conditions, host
/// bookkeeping) are kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConversationTree {
    #[serde(default)]
    pub id: DocumentId,
    #[serde(default)]
    pub root_node: Option<DocumentReference>,
    #[serde(default)]
    pub nodes: Vec<DialogNode>,
    #[serde(default)]
    pub specification: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DialogNode {
    #[serde(default)]
    pub id: DocumentId,
    #[serde(default)]
    pub text: Text,
    #[serde(default)]
    pub next_node: Option<DocumentReference>,
    #[serde(default)]
    pub responses: Vec<DialogResponse>,
    #[serde(default)]
    pub specification: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DialogResponse {
    #[serde(default)]
    pub id: DocumentId,
    #[serde(default)]
    pub text: Text,
    #[serde(default)]
    pub next_node: Option<DocumentReference>,
    #[serde(default)]
    pub specification: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial dialog node used to seed a new node (paste, duplicate, templates).
/// Missing fields get defaults when the node is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DialogNodeDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node: Option<DocumentReference>,
    #[serde(default)]
    pub responses: Vec<DialogResponseDraft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DialogResponseDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node: Option<DocumentReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<DialogNode> for DialogNodeDraft {
    fn from(node: DialogNode) -> Self {
        Self {
            id: Some(node.id),
            text: Some(node.text),
            next_node: node.next_node,
            responses: node.responses.into_iter().map(Into::into).collect(),
            specification: Some(node.specification),
            extra: node.extra,
        }
    }
}

impl From<DialogResponse> for DialogResponseDraft {
    fn from(response: DialogResponse) -> Self {
        Self {
            id: Some(response.id),
            text: Some(response.text),
            next_node: response.next_node,
            specification: Some(response.specification),
            extra: response.extra,
        }
    }
}

impl ConversationTree {
    pub fn find_node(&self, id: &str) -> Option<&DialogNode> {
        self.nodes.iter().find(|node| node.id.matches(id))
    }
}

impl DialogNode {
    pub fn find_response(&self, id: &str) -> Option<&DialogResponse> {
        self.responses.iter().find(|response| response.id.matches(id))
    }
}
