//! # Graph-to-Tree Mutator
//!
//! Entry points the canvas calls to edit the conversation. Every id passes
//! through the identity map first. A lookup that fails is a benign race with
//! the host and ends the operation without touching the tree; the return
//! value only reports whether anything was written.

use charon_extensions::{ControlError, DocumentReference, EmitOptions};
use serde_json::{Map, Value};
use tracing::debug;

use super::identity::EntityKey;
use super::position::{clamp_position, get_position, positions_equal, set_position};
use super::ConversationState;
use crate::controls::{DialogNodeKey, DialogResponseKey};
use crate::errors::EditorError;
use crate::flow::{parse_handle_id, parse_node_id, HandleKind, XYPosition};
use crate::models::{
    generate_dialog_node_id_placeholder, generate_dialog_response_id_placeholder,
    is_placeholder_id, DialogNode, DialogNodeDraft, DialogResponse, Text, EMPTY_TEXT,
};

/// Link value the caller believes is current.
///
/// When it no longer matches the live value the link was changed by someone
/// else since the canvas rendered it, and the write is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpectedTarget<'a> {
    /// Write unconditionally
    #[default]
    Any,
    /// The link must currently be empty
    Unlinked,
    /// The link must currently point at this dialog node id
    Node(&'a str),
}

impl ConversationState {
    pub fn set_dialog_next_node(
        &mut self,
        dialog_node_id: &str,
        target_dialog_node_id: Option<&str>,
        expected: ExpectedTarget<'_>,
        opts: EmitOptions,
    ) -> bool {
        let Some(key) = self.find_dialog_node(dialog_node_id) else {
            debug!(dialog_node_id = %dialog_node_id, "dialog node not found, link skipped");
            return false;
        };
        let current = self.tree.node(key).and_then(|node| node.next_node());
        if !self.is_expected(current, expected) {
            debug!(dialog_node_id = %dialog_node_id, ?expected, "next node changed, link skipped");
            return false;
        }

        let reference = target_dialog_node_id.and_then(|target| self.get_next_node_reference(target));
        self.tree.set_node_next_node(key, reference, opts)
    }

    pub fn set_dialog_response_next_node(
        &mut self,
        dialog_node_id: &str,
        dialog_response_id: &str,
        target_dialog_node_id: Option<&str>,
        expected: ExpectedTarget<'_>,
        opts: EmitOptions,
    ) -> bool {
        let Some((_, key)) = self.find_dialog_response(dialog_node_id, dialog_response_id) else {
            debug!(
                dialog_node_id = %dialog_node_id,
                dialog_response_id = %dialog_response_id,
                "dialog response not found, link skipped"
            );
            return false;
        };
        let current = self.tree.response(key).and_then(|response| response.next_node());
        if !self.is_expected(current, expected) {
            debug!(dialog_response_id = %dialog_response_id, ?expected, "next node changed, link skipped");
            return false;
        }

        let reference = target_dialog_node_id.and_then(|target| self.get_next_node_reference(target));
        self.tree.set_response_next_node(key, reference, opts)
    }

    pub fn set_root_node(
        &mut self,
        target_dialog_node_id: Option<&str>,
        expected: ExpectedTarget<'_>,
        opts: EmitOptions,
    ) -> bool {
        if !self.is_expected(self.tree.root_node(), expected) {
            debug!(?expected, "root node changed, link skipped");
            return false;
        }

        let reference = target_dialog_node_id.and_then(|target| self.get_next_node_reference(target));
        self.tree.set_root_node(reference, opts)
    }

    /// Set the link behind a graph handle.
    ///
    /// `source` is the graph node id owning the handle; `target` is a dialog
    /// node id.
    pub fn set_handle_target(
        &mut self,
        source: &str,
        source_handle: &str,
        target_dialog_node_id: Option<&str>,
        expected: ExpectedTarget<'_>,
        opts: EmitOptions,
    ) -> bool {
        let (_, source_dialog_node_id) = parse_node_id(source);
        match parse_handle_id(source_handle) {
            (HandleKind::Response, dialog_response_id) => self.set_dialog_response_next_node(
                source_dialog_node_id,
                dialog_response_id,
                target_dialog_node_id,
                expected,
                opts,
            ),
            (HandleKind::Dialog, _) => {
                self.set_dialog_next_node(source_dialog_node_id, target_dialog_node_id, expected, opts)
            }
            (HandleKind::Root, _) => self.set_root_node(target_dialog_node_id, expected, opts),
            (HandleKind::Unknown, _) => {
                debug!(source_handle = %source_handle, "unknown handle");
                false
            }
        }
    }

    /// Append an empty node at `position` and link the handle it was dragged
    /// out of to it
    pub fn create_dialog_continuation_node(
        &mut self,
        source: &str,
        source_handle: &str,
        position: XYPosition,
        opts: EmitOptions,
    ) -> DialogNodeKey {
        let dialog_node_id = generate_dialog_node_id_placeholder();
        let key = self.tree.append_node(
            DialogNode {
                id: dialog_node_id.as_str().into(),
                text: Text::from(EMPTY_TEXT),
                next_node: None,
                responses: Vec::new(),
                specification: set_position("", Some(position)),
                extra: Map::new(),
            },
            opts,
        );
        self.identity
            .remember(dialog_node_id.as_str(), EntityKey::DialogNode(key));

        self.set_handle_target(
            source,
            source_handle,
            Some(&dialog_node_id),
            ExpectedTarget::Any,
            opts,
        );
        key
    }

    /// Append a node built from external data (paste, duplicate).
    ///
    /// The node's own next-node link is always dropped; nested responses keep
    /// their text but get fresh links and, when missing, placeholder ids.
    pub fn create_dialog_node(
        &mut self,
        draft: DialogNodeDraft,
        position: XYPosition,
        opts: EmitOptions,
    ) -> DialogNodeKey {
        let DialogNodeDraft {
            id,
            text,
            next_node: _,
            responses,
            specification,
            extra,
        } = draft;

        let responses = responses
            .into_iter()
            .map(|response| DialogResponse {
                id: response
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| generate_dialog_response_id_placeholder().into()),
                text: response.text.unwrap_or_else(|| Text::from(EMPTY_TEXT)),
                next_node: None,
                specification: response.specification.unwrap_or_default(),
                extra: response.extra,
            })
            .collect();

        let node = DialogNode {
            id: id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| generate_dialog_node_id_placeholder().into()),
            text: text.unwrap_or_else(|| Text::from(EMPTY_TEXT)),
            next_node: None,
            responses,
            specification: set_position(specification.as_deref().unwrap_or(""), Some(position)),
            extra,
        };
        let key = self.tree.append_node(node, opts);
        self.remember_placeholders(key);
        key
    }

    /// Like [`Self::create_dialog_node`], from an untyped host document
    pub fn create_dialog_node_from_json(
        &mut self,
        document: Value,
        position: XYPosition,
        opts: EmitOptions,
    ) -> Result<DialogNodeKey, EditorError> {
        if !document.is_object() {
            return Err(ControlError::InvalidDocument(format!(
                "dialog node must be an object, got {document}"
            ))
            .into());
        }
        let draft: DialogNodeDraft = serde_json::from_value(document)?;
        Ok(self.create_dialog_node(draft, position, opts))
    }

    /// Append a response; a node with responses has no direct next node, so
    /// the node's own link is cleared first
    pub fn add_dialog_response(
        &mut self,
        dialog_node_id: &str,
        text: impl Into<Text>,
        opts: EmitOptions,
    ) -> Option<DialogResponseKey> {
        let Some(key) = self.find_dialog_node(dialog_node_id) else {
            debug!(dialog_node_id = %dialog_node_id, "dialog node not found, response not added");
            return None;
        };
        self.tree.set_node_next_node(key, None, opts);

        let dialog_response_id = generate_dialog_response_id_placeholder();
        let response_key = self.tree.append_response(
            key,
            DialogResponse {
                id: dialog_response_id.as_str().into(),
                text: text.into(),
                next_node: None,
                specification: String::new(),
                extra: Map::new(),
            },
            opts,
        )?;
        self.identity
            .remember(dialog_response_id, EntityKey::DialogResponse(response_key));
        Some(response_key)
    }

    pub fn remove_dialog_response(
        &mut self,
        dialog_node_id: &str,
        dialog_response_id: &str,
        opts: EmitOptions,
    ) -> bool {
        let Some((node_key, response_key)) =
            self.find_dialog_response(dialog_node_id, dialog_response_id)
        else {
            debug!(dialog_response_id = %dialog_response_id, "dialog response not found, nothing removed");
            return false;
        };
        let Some((_, index)) = self.tree.response_index(response_key) else {
            return false;
        };
        self.tree.remove_response_at(node_key, index, opts);
        self.identity.forget(EntityKey::DialogResponse(response_key));
        true
    }

    /// Remove a node and clear every link that pointed at it, including the
    /// conversation root
    pub fn remove_dialog_node(&mut self, dialog_node_id: &str, opts: EmitOptions) -> bool {
        let Some(key) = self.find_dialog_node(dialog_node_id) else {
            debug!(dialog_node_id = %dialog_node_id, "dialog node not found, nothing removed");
            return false;
        };
        let Some(index) = self.tree.node_index(key) else {
            return false;
        };
        let Some(node) = self.tree.node(key) else {
            return false;
        };
        let removed_id = node.id().to_string();
        let response_keys = node.responses().to_vec();

        self.tree.remove_node_at(index, opts);
        self.identity.forget(EntityKey::DialogNode(key));
        for response_key in response_keys {
            self.identity.forget(EntityKey::DialogResponse(response_key));
        }

        // Links written before a host rename may still carry the old id
        let points_at_removed = |reference: Option<&DocumentReference>| {
            reference.is_some_and(|r| r.id.matches(&removed_id) || r.id.matches(dialog_node_id))
        };

        let node_keys = self.tree.nodes().to_vec();
        for node_key in node_keys {
            let Some(node) = self.tree.node(node_key) else {
                continue;
            };
            let clear_node = points_at_removed(node.next_node());
            let stale_responses: Vec<_> = node
                .responses()
                .iter()
                .copied()
                .filter(|response| {
                    points_at_removed(self.tree.response(*response).and_then(|r| r.next_node()))
                })
                .collect();

            if clear_node {
                self.tree.set_node_next_node(node_key, None, opts);
            }
            for response in stale_responses {
                self.tree.set_response_next_node(response, None, opts);
            }
        }

        if points_at_removed(self.tree.root_node()) {
            self.tree.set_root_node(None, opts);
        }

        debug!(dialog_node_id = %removed_id, "dialog node removed");
        true
    }

    /// Store a node's canvas position; unchanged positions are not written
    pub fn set_dialog_node_position(
        &mut self,
        dialog_node_id: &str,
        position: Option<XYPosition>,
        opts: EmitOptions,
    ) -> bool {
        let Some(key) = self.find_dialog_node(dialog_node_id) else {
            debug!(dialog_node_id = %dialog_node_id, "dialog node not found, position skipped");
            return false;
        };
        let Some(node) = self.tree.node(key) else {
            return false;
        };
        let specification = node.specification();
        if positions_equal(get_position(specification), clamp_position(position)) {
            return false;
        }
        let specification = set_position(specification, position);
        self.tree.set_node_specification(key, specification, opts)
    }

    pub fn set_root_node_position(&mut self, position: Option<XYPosition>, opts: EmitOptions) -> bool {
        let specification = self.tree.specification();
        if positions_equal(get_position(specification), clamp_position(position)) {
            return false;
        }
        let specification = set_position(specification, position);
        self.tree.set_specification(specification, opts)
    }

    fn is_expected(&self, current: Option<&DocumentReference>, expected: ExpectedTarget<'_>) -> bool {
        match expected {
            ExpectedTarget::Any => true,
            ExpectedTarget::Unlinked => current.is_none(),
            ExpectedTarget::Node(expected_id) => {
                let expected_id = self.resolve_id(expected_id);
                current.is_some_and(|reference| reference.id.matches(&expected_id))
            }
        }
    }

    fn remember_placeholders(&mut self, key: DialogNodeKey) {
        let Some(node) = self.tree.node(key) else {
            return;
        };
        let mut placeholders = Vec::new();
        let node_id = node.id().to_string();
        if is_placeholder_id(&node_id) {
            placeholders.push((node_id, EntityKey::DialogNode(key)));
        }
        for response_key in node.responses() {
            if let Some(response) = self.tree.response(*response_key) {
                let response_id = response.id().to_string();
                if is_placeholder_id(&response_id) {
                    placeholders.push((response_id, EntityKey::DialogResponse(*response_key)));
                }
            }
        }
        for (id, entity) in placeholders {
            self.identity.remember(id, entity);
        }
    }
}
