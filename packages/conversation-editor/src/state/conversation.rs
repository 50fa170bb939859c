use std::borrow::Cow;

use charon_extensions::{DocumentReference, EmitOptions, EventBus, ValueChange, ValueControl};
use tracing::debug;

use super::identity::{EntityKey, IdentityMap};
use crate::config::GridLayout;
use crate::controls::{ConversationTreeControl, DialogNodeKey, DialogResponseKey};
use crate::models::ConversationTree;

/// Owns the conversation tree control and the identity map used to resolve
/// ids captured by the canvas before the host renamed their entities.
///
/// Projection lives in `projection.rs`, mutation entry points in
/// `mutations.rs`.
#[derive(Debug)]
pub struct ConversationState {
    pub(super) tree: ConversationTreeControl,
    pub(super) identity: IdentityMap,
    pub(super) grid: GridLayout,
}

impl ConversationState {
    pub fn new(tree: ConversationTreeControl) -> Self {
        Self {
            tree,
            identity: IdentityMap::new(),
            grid: GridLayout::default(),
        }
    }

    pub fn with_grid(mut self, grid: GridLayout) -> Self {
        self.grid = grid;
        self
    }

    pub fn tree(&self) -> &ConversationTreeControl {
        &self.tree
    }

    /// Direct access for host-side writes (renames, undo); every write still
    /// goes through the control's change notifications
    pub fn tree_mut(&mut self) -> &mut ConversationTreeControl {
        &mut self.tree
    }

    pub fn identity(&self) -> &IdentityMap {
        &self.identity
    }

    pub fn resolve_id<'a>(&self, id: &'a str) -> Cow<'a, str> {
        self.identity.resolve(id, &self.tree)
    }

    pub fn find_dialog_node(&self, dialog_node_id: &str) -> Option<DialogNodeKey> {
        let resolved = self.resolve_id(dialog_node_id);
        if resolved.is_empty() {
            return None;
        }
        self.tree.find_node_key(&resolved)
    }

    pub fn find_dialog_response(
        &self,
        dialog_node_id: &str,
        dialog_response_id: &str,
    ) -> Option<(DialogNodeKey, DialogResponseKey)> {
        let response_id = self.resolve_id(dialog_response_id);
        if response_id.is_empty() {
            return None;
        }
        let node = self.find_dialog_node(dialog_node_id)?;
        let response = self.tree.find_response_key(node, &response_id)?;
        Some((node, response))
    }

    /// Reference to the node `target` currently names, with its display text
    pub(super) fn get_next_node_reference(&self, target: &str) -> Option<DocumentReference> {
        let Some(key) = self.find_dialog_node(target) else {
            debug!(target_dialog_node_id = %target, "link target not found");
            return None;
        };
        let node = self.tree.node(key)?;
        let current_id = node.id().to_string();

        let (id, display_text) = match self.tree.dialog_node_schema() {
            Some(schema) => {
                let display_text = self
                    .tree
                    .node_value(key)
                    .and_then(|value| serde_json::to_value(value).ok())
                    .and_then(|document| schema.format_display_text(&document));
                (schema.convert_id(&current_id), display_text)
            }
            None => (node.id().clone(), None),
        };

        Some(DocumentReference::new(id).with_display_name(display_text.unwrap_or(current_id)))
    }

    /// Current conversation tree id as used in graph ids
    pub(super) fn conversation_tree_id(&self) -> String {
        self.tree.id().to_string()
    }

    /// Snapshot of the whole tree
    pub fn value(&self) -> ConversationTree {
        self.tree.value()
    }

    /// Replace the whole tree, forgetting identity entries whose control now
    /// holds a different entity or is gone.
    ///
    /// Undo and redo restore through here so a placeholder captured before
    /// the restore cannot resolve to whatever node took over its slot.
    pub fn restore(&mut self, value: ConversationTree, opts: EmitOptions) -> bool {
        let before = self.identity.len();
        let replaced = self.tree.replace_value(value, opts);
        for key in &replaced.nodes {
            self.identity.forget(EntityKey::DialogNode(*key));
        }
        for key in &replaced.responses {
            self.identity.forget(EntityKey::DialogResponse(*key));
        }
        let forgotten = before - self.identity.len();
        if forgotten > 0 {
            debug!(forgotten, "identity entries dropped after restore");
        }
        !replaced.is_empty()
    }
}

impl ValueControl for ConversationState {
    type Value = ConversationTree;

    fn value(&self) -> ConversationTree {
        self.tree.value()
    }

    fn set_value(&mut self, value: ConversationTree, opts: EmitOptions) {
        self.restore(value, opts);
    }

    fn value_changes(&self) -> &EventBus<ValueChange> {
        self.tree.value_changes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::ConversationSchemas;
    use crate::models::{DialogNode, DialogResponse, Text};
    use charon_extensions::DocumentId;

    fn state() -> ConversationState {
        let tree = ConversationTree {
            id: "tree".into(),
            nodes: vec![
                DialogNode {
                    id: DocumentId::Integer(7),
                    text: Text::from("Speak, friend"),
                    responses: vec![DialogResponse {
                        id: "mellon".into(),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                DialogNode {
                    id: "_ID_DIALOG_NODE_tmp".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let schemas = ConversationSchemas::builtin().unwrap();
        ConversationState::new(ConversationTreeControl::new(tree).with_schemas(schemas))
    }

    #[test]
    fn test_lookups_compare_ids_loosely() {
        let state = state();
        assert_eq!(state.find_dialog_node("7"), Some(state.tree().nodes()[0]));
        assert!(state.find_dialog_response("7", "mellon").is_some());
        assert!(state.find_dialog_response("7", "missing").is_none());
        assert!(state.find_dialog_node("").is_none());
    }

    #[test]
    fn test_renamed_placeholder_resolves_to_same_node() {
        let mut state = state();
        let key = state.tree().nodes()[1];
        state
            .identity
            .remember("_ID_DIALOG_NODE_tmp", EntityKey::DialogNode(key));
        state.tree_mut().set_node_id(key, DocumentId::Integer(123), EmitOptions::default());

        assert_eq!(state.find_dialog_node("_ID_DIALOG_NODE_tmp"), Some(key));
        assert_eq!(state.find_dialog_node("123"), Some(key));
    }

    #[test]
    fn test_restore_forgets_slots_taken_over_by_other_nodes() {
        let mut state = state();
        let placeholder_key = state.tree().nodes()[1];
        state
            .identity
            .remember("_ID_DIALOG_NODE_tmp", EntityKey::DialogNode(placeholder_key));
        let mut earlier = state.value();
        earlier.nodes.insert(
            0,
            DialogNode {
                id: "gandalf".into(),
                ..Default::default()
            },
        );

        assert!(state.restore(earlier, EmitOptions::default()));

        assert!(state.identity().is_empty());
        assert_eq!(state.find_dialog_node("7"), Some(placeholder_key));
        let restored = state.find_dialog_node("_ID_DIALOG_NODE_tmp").unwrap();
        assert_ne!(restored, placeholder_key);
        assert!(state.tree().node(restored).unwrap().id().matches("_ID_DIALOG_NODE_tmp"));
    }

    #[test]
    fn test_next_node_reference_uses_schema() {
        let state = state();
        let reference = state.get_next_node_reference("7").unwrap();
        assert_eq!(reference.id, DocumentId::Integer(7));
        assert_eq!(reference.display_name.as_deref(), Some("Speak, friend"));
        assert!(state.get_next_node_reference("404").is_none());
    }

    #[test]
    fn test_next_node_reference_falls_back_to_id() {
        let state = state();
        let reference = state.get_next_node_reference("_ID_DIALOG_NODE_tmp").unwrap();
        assert_eq!(reference.display_name.as_deref(), Some("_ID_DIALOG_NODE_tmp"));
    }
}
