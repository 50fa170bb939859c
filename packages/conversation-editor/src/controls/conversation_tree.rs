use charon_extensions::{
    ControlError, DocumentId, DocumentReference, EmitOptions, EventBus, Schema, ValueChange,
    ValueControl,
};
use serde_json::{Map, Value};
use slotmap::{new_key_type, SlotMap};
use tracing::trace;

use super::ConversationSchemas;
use crate::models::{ConversationTree, DialogNode, DialogResponse, Text};

new_key_type! {
    /// Generation-checked handle to a live dialog node control
    pub struct DialogNodeKey;
    /// Generation-checked handle to a live dialog response control
    pub struct DialogResponseKey;
}

#[derive(Debug, Clone)]
pub struct DialogNodeControl {
    id: DocumentId,
    text: Text,
    next_node: Option<DocumentReference>,
    responses: Vec<DialogResponseKey>,
    specification: String,
    extra: Map<String, Value>,
}

impl DialogNodeControl {
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn text(&self) -> &Text {
        &self.text
    }

    pub fn next_node(&self) -> Option<&DocumentReference> {
        self.next_node.as_ref()
    }

    pub fn responses(&self) -> &[DialogResponseKey] {
        &self.responses
    }

    pub fn specification(&self) -> &str {
        &self.specification
    }
}

#[derive(Debug, Clone)]
pub struct DialogResponseControl {
    node: DialogNodeKey,
    id: DocumentId,
    text: Text,
    next_node: Option<DocumentReference>,
    specification: String,
    extra: Map<String, Value>,
}

impl DialogResponseControl {
    /// Node owning this response
    pub fn node(&self) -> DialogNodeKey {
        self.node
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn text(&self) -> &Text {
        &self.text
    }

    pub fn next_node(&self) -> Option<&DocumentReference> {
        self.next_node.as_ref()
    }

    pub fn specification(&self) -> &str {
        &self.specification
    }
}

/// Controls that a whole-value write handed to a different entity or dropped.
///
/// Keys listed here no longer stand for the entity they were issued to, so
/// anything remembered against them must be forgotten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacedControls {
    pub nodes: Vec<DialogNodeKey>,
    pub responses: Vec<DialogResponseKey>,
}

impl ReplacedControls {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.responses.is_empty()
    }
}

/// Control over a whole conversation tree.
///
/// Node and response controls live in arenas and are addressed by
/// generation-checked keys, so a key held after its control was removed
/// never aliases a newer control. Replacing the whole value reuses controls
/// by index the way the host document collection does: an entity keeps its
/// key across a host-side id change.
///
/// Every mutation compares before writing and reports whether anything
/// changed. Changes that reach the root (see [`EmitOptions::reaches_root`])
/// are published on [`ValueControl::value_changes`].
#[derive(Debug)]
pub struct ConversationTreeControl {
    id: DocumentId,
    root_node: Option<DocumentReference>,
    specification: String,
    extra: Map<String, Value>,
    nodes: Vec<DialogNodeKey>,
    node_controls: SlotMap<DialogNodeKey, DialogNodeControl>,
    response_controls: SlotMap<DialogResponseKey, DialogResponseControl>,
    schemas: Option<ConversationSchemas>,
    value_changes: EventBus<ValueChange>,
}

impl ConversationTreeControl {
    pub fn new(value: ConversationTree) -> Self {
        let mut control = Self {
            id: DocumentId::default(),
            root_node: None,
            specification: String::new(),
            extra: Map::new(),
            nodes: Vec::new(),
            node_controls: SlotMap::with_key(),
            response_controls: SlotMap::with_key(),
            schemas: None,
            value_changes: EventBus::new(),
        };
        control.write_value(value);
        control
    }

    pub fn with_schemas(mut self, schemas: ConversationSchemas) -> Self {
        self.schemas = Some(schemas);
        self
    }

    pub fn schemas(&self) -> Option<&ConversationSchemas> {
        self.schemas.as_ref()
    }

    pub fn dialog_node_schema(&self) -> Option<&Schema> {
        self.schemas.as_ref().map(|schemas| &schemas.dialog_node)
    }

    // ---- reads ----

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn root_node(&self) -> Option<&DocumentReference> {
        self.root_node.as_ref()
    }

    pub fn specification(&self) -> &str {
        &self.specification
    }

    /// Node keys in document order
    pub fn nodes(&self) -> &[DialogNodeKey] {
        &self.nodes
    }

    /// Node controls in document order
    pub fn node_entries(&self) -> impl Iterator<Item = (DialogNodeKey, &DialogNodeControl)> + '_ {
        self.nodes
            .iter()
            .filter_map(|key| self.node_controls.get(*key).map(|control| (*key, control)))
    }

    pub fn node(&self, key: DialogNodeKey) -> Option<&DialogNodeControl> {
        self.node_controls.get(key)
    }

    pub fn response(&self, key: DialogResponseKey) -> Option<&DialogResponseControl> {
        self.response_controls.get(key)
    }

    pub fn contains_node(&self, key: DialogNodeKey) -> bool {
        self.node_controls.contains_key(key)
    }

    pub fn contains_response(&self, key: DialogResponseKey) -> bool {
        self.response_controls.contains_key(key)
    }

    pub fn node_index(&self, key: DialogNodeKey) -> Option<usize> {
        self.nodes.iter().position(|candidate| *candidate == key)
    }

    /// Owning node and position within it
    pub fn response_index(&self, key: DialogResponseKey) -> Option<(DialogNodeKey, usize)> {
        let node_key = self.response_controls.get(key)?.node;
        let index = self
            .node_controls
            .get(node_key)?
            .responses
            .iter()
            .position(|candidate| *candidate == key)?;
        Some((node_key, index))
    }

    /// First node whose id loosely equals `id`
    pub fn find_node_key(&self, id: &str) -> Option<DialogNodeKey> {
        self.node_entries()
            .find(|(_, control)| control.id.matches(id))
            .map(|(key, _)| key)
    }

    /// First response of `node` whose id loosely equals `id`
    pub fn find_response_key(&self, node: DialogNodeKey, id: &str) -> Option<DialogResponseKey> {
        self.node_controls.get(node)?.responses.iter().copied().find(|key| {
            self.response_controls
                .get(*key)
                .map(|control| control.id.matches(id))
                .unwrap_or(false)
        })
    }

    pub fn node_value(&self, key: DialogNodeKey) -> Option<DialogNode> {
        let control = self.node_controls.get(key)?;
        Some(DialogNode {
            id: control.id.clone(),
            text: control.text.clone(),
            next_node: control.next_node.clone(),
            responses: control
                .responses
                .iter()
                .filter_map(|response| self.response_value(*response))
                .collect(),
            specification: control.specification.clone(),
            extra: control.extra.clone(),
        })
    }

    pub fn response_value(&self, key: DialogResponseKey) -> Option<DialogResponse> {
        let control = self.response_controls.get(key)?;
        Some(DialogResponse {
            id: control.id.clone(),
            text: control.text.clone(),
            next_node: control.next_node.clone(),
            specification: control.specification.clone(),
            extra: control.extra.clone(),
        })
    }

    // ---- root properties ----

    pub fn set_id(&mut self, id: DocumentId, opts: EmitOptions) -> bool {
        if self.id == id {
            return false;
        }
        self.id = id;
        self.notify("/Id".to_string(), opts);
        true
    }

    pub fn set_root_node(&mut self, root_node: Option<DocumentReference>, opts: EmitOptions) -> bool {
        if self.root_node == root_node {
            return false;
        }
        self.root_node = root_node;
        self.notify("/RootNode".to_string(), opts);
        true
    }

    pub fn set_specification(&mut self, specification: String, opts: EmitOptions) -> bool {
        if self.specification == specification {
            return false;
        }
        self.specification = specification;
        self.notify("/Specification".to_string(), opts);
        true
    }

    // ---- node properties ----

    /// Change a node's id in place, as the host does when it assigns a
    /// permanent id to a placeholder
    pub fn set_node_id(&mut self, key: DialogNodeKey, id: DocumentId, opts: EmitOptions) -> bool {
        self.update_node(key, "Id", opts, |control| {
            if control.id == id {
                return false;
            }
            control.id = id;
            true
        })
    }

    pub fn set_node_text(&mut self, key: DialogNodeKey, text: Text, opts: EmitOptions) -> bool {
        self.update_node(key, "Text", opts, |control| {
            if control.text == text {
                return false;
            }
            control.text = text;
            true
        })
    }

    pub fn set_node_next_node(
        &mut self,
        key: DialogNodeKey,
        next_node: Option<DocumentReference>,
        opts: EmitOptions,
    ) -> bool {
        self.update_node(key, "NextNode", opts, |control| {
            if control.next_node == next_node {
                return false;
            }
            control.next_node = next_node;
            true
        })
    }

    pub fn set_node_specification(
        &mut self,
        key: DialogNodeKey,
        specification: String,
        opts: EmitOptions,
    ) -> bool {
        self.update_node(key, "Specification", opts, |control| {
            if control.specification == specification {
                return false;
            }
            control.specification = specification;
            true
        })
    }

    // ---- response properties ----

    pub fn set_response_id(
        &mut self,
        key: DialogResponseKey,
        id: DocumentId,
        opts: EmitOptions,
    ) -> bool {
        self.update_response(key, "Id", opts, |control| {
            if control.id == id {
                return false;
            }
            control.id = id;
            true
        })
    }

    pub fn set_response_text(&mut self, key: DialogResponseKey, text: Text, opts: EmitOptions) -> bool {
        self.update_response(key, "Text", opts, |control| {
            if control.text == text {
                return false;
            }
            control.text = text;
            true
        })
    }

    pub fn set_response_next_node(
        &mut self,
        key: DialogResponseKey,
        next_node: Option<DocumentReference>,
        opts: EmitOptions,
    ) -> bool {
        self.update_response(key, "NextNode", opts, |control| {
            if control.next_node == next_node {
                return false;
            }
            control.next_node = next_node;
            true
        })
    }

    pub fn set_response_specification(
        &mut self,
        key: DialogResponseKey,
        specification: String,
        opts: EmitOptions,
    ) -> bool {
        self.update_response(key, "Specification", opts, |control| {
            if control.specification == specification {
                return false;
            }
            control.specification = specification;
            true
        })
    }

    // ---- structure ----

    pub fn append_node(&mut self, node: DialogNode, opts: EmitOptions) -> DialogNodeKey {
        self.insert_node_at(self.nodes.len(), node, opts)
    }

    /// Insert a node; an out-of-range index appends
    pub fn insert_node_at(&mut self, index: usize, node: DialogNode, opts: EmitOptions) -> DialogNodeKey {
        let index = index.min(self.nodes.len());
        let key = self.insert_node_control(node);
        self.nodes.insert(index, key);
        self.notify(format!("/Nodes/{index}"), opts);
        key
    }

    /// Insert a node from an untyped host document
    pub fn insert_document(
        &mut self,
        index: usize,
        document: Value,
        opts: EmitOptions,
    ) -> Result<DialogNodeKey, ControlError> {
        if !document.is_object() {
            return Err(ControlError::InvalidDocument(format!(
                "dialog node must be an object, got {document}"
            )));
        }
        let node: DialogNode = serde_json::from_value(document)
            .map_err(|error| ControlError::InvalidDocument(error.to_string()))?;
        Ok(self.insert_node_at(index, node, opts))
    }

    pub fn remove_node_at(&mut self, index: usize, opts: EmitOptions) -> Option<DialogNode> {
        let key = *self.nodes.get(index)?;
        let value = self.node_value(key);
        self.nodes.remove(index);
        self.discard_node_control(key, &mut ReplacedControls::default());
        self.notify(format!("/Nodes/{index}"), opts);
        value
    }

    pub fn append_response(
        &mut self,
        node: DialogNodeKey,
        response: DialogResponse,
        opts: EmitOptions,
    ) -> Option<DialogResponseKey> {
        let node_index = self.node_index(node)?;
        let key = self.insert_response_control(node, response);
        let control = self.node_controls.get_mut(node)?;
        control.responses.push(key);
        let response_index = control.responses.len() - 1;
        self.notify(format!("/Nodes/{node_index}/Responses/{response_index}"), opts);
        Some(key)
    }

    pub fn remove_response_at(
        &mut self,
        node: DialogNodeKey,
        index: usize,
        opts: EmitOptions,
    ) -> Option<DialogResponse> {
        let node_index = self.node_index(node)?;
        let key = *self.node_controls.get(node)?.responses.get(index)?;
        let value = self.response_value(key);
        if let Some(control) = self.node_controls.get_mut(node) {
            control.responses.remove(index);
        }
        self.response_controls.remove(key);
        self.notify(format!("/Nodes/{node_index}/Responses/{index}"), opts);
        value
    }

    /// Overwrite the whole value and report which controls changed hands.
    ///
    /// [`ValueControl::set_value`] is this without the report.
    pub fn replace_value(&mut self, value: ConversationTree, opts: EmitOptions) -> ReplacedControls {
        if self.value() == value {
            return ReplacedControls::default();
        }
        let replaced = self.write_value(value);
        trace!(
            nodes = self.nodes.len(),
            replaced_nodes = replaced.nodes.len(),
            replaced_responses = replaced.responses.len(),
            "conversation tree replaced"
        );
        if opts.emit_event {
            self.value_changes.emit(&ValueChange::root());
        }
        replaced
    }

    // ---- internals ----

    fn notify(&self, path: String, opts: EmitOptions) {
        trace!(path = %path, emit = opts.reaches_root(), "conversation tree changed");
        if opts.reaches_root() {
            self.value_changes.emit(&ValueChange::at(path));
        }
    }

    fn update_node(
        &mut self,
        key: DialogNodeKey,
        property: &str,
        opts: EmitOptions,
        update: impl FnOnce(&mut DialogNodeControl) -> bool,
    ) -> bool {
        let Some(index) = self.node_index(key) else {
            return false;
        };
        let Some(control) = self.node_controls.get_mut(key) else {
            return false;
        };
        if !update(control) {
            return false;
        }
        self.notify(format!("/Nodes/{index}/{property}"), opts);
        true
    }

    fn update_response(
        &mut self,
        key: DialogResponseKey,
        property: &str,
        opts: EmitOptions,
        update: impl FnOnce(&mut DialogResponseControl) -> bool,
    ) -> bool {
        let Some((node, response_index)) = self.response_index(key) else {
            return false;
        };
        let Some(node_index) = self.node_index(node) else {
            return false;
        };
        let Some(control) = self.response_controls.get_mut(key) else {
            return false;
        };
        if !update(control) {
            return false;
        }
        self.notify(
            format!("/Nodes/{node_index}/Responses/{response_index}/{property}"),
            opts,
        );
        true
    }

    fn insert_node_control(&mut self, node: DialogNode) -> DialogNodeKey {
        let DialogNode {
            id,
            text,
            next_node,
            responses,
            specification,
            extra,
        } = node;
        let key = self.node_controls.insert(DialogNodeControl {
            id,
            text,
            next_node,
            responses: Vec::new(),
            specification,
            extra,
        });
        let response_keys: Vec<_> = responses
            .into_iter()
            .map(|response| self.insert_response_control(key, response))
            .collect();
        if let Some(control) = self.node_controls.get_mut(key) {
            control.responses = response_keys;
        }
        key
    }

    fn insert_response_control(&mut self, node: DialogNodeKey, response: DialogResponse) -> DialogResponseKey {
        let DialogResponse {
            id,
            text,
            next_node,
            specification,
            extra,
        } = response;
        self.response_controls.insert(DialogResponseControl {
            node,
            id,
            text,
            next_node,
            specification,
            extra,
        })
    }

    fn discard_node_control(&mut self, key: DialogNodeKey, replaced: &mut ReplacedControls) {
        if let Some(control) = self.node_controls.remove(key) {
            replaced.nodes.push(key);
            for response in control.responses {
                self.response_controls.remove(response);
                replaced.responses.push(response);
            }
        }
    }

    /// Overwrite everything, reusing node and response controls by index
    fn write_value(&mut self, value: ConversationTree) -> ReplacedControls {
        let ConversationTree {
            id,
            root_node,
            nodes,
            specification,
            extra,
        } = value;
        self.id = id;
        self.root_node = root_node;
        self.specification = specification;
        self.extra = extra;

        let mut replaced = ReplacedControls::default();
        let mut previous = std::mem::take(&mut self.nodes).into_iter();
        let mut keys = Vec::with_capacity(nodes.len());
        for node in nodes {
            let key = match previous.next() {
                Some(key) => {
                    self.overwrite_node_control(key, node, &mut replaced);
                    key
                }
                None => self.insert_node_control(node),
            };
            keys.push(key);
        }
        for stale in previous {
            self.discard_node_control(stale, &mut replaced);
        }
        self.nodes = keys;
        replaced
    }

    fn overwrite_node_control(
        &mut self,
        key: DialogNodeKey,
        node: DialogNode,
        replaced: &mut ReplacedControls,
    ) {
        let DialogNode {
            id,
            text,
            next_node,
            responses,
            specification,
            extra,
        } = node;
        let previous_responses = match self.node_controls.get_mut(key) {
            Some(control) => {
                if control.id != id {
                    replaced.nodes.push(key);
                }
                control.id = id;
                control.text = text;
                control.next_node = next_node;
                control.specification = specification;
                control.extra = extra;
                std::mem::take(&mut control.responses)
            }
            None => return,
        };

        let mut previous = previous_responses.into_iter();
        let mut response_keys = Vec::with_capacity(responses.len());
        for response in responses {
            let response_key = match previous.next() {
                Some(response_key) => {
                    if let Some(control) = self.response_controls.get_mut(response_key) {
                        if control.id != response.id {
                            replaced.responses.push(response_key);
                        }
                        control.id = response.id;
                        control.text = response.text;
                        control.next_node = response.next_node;
                        control.specification = response.specification;
                        control.extra = response.extra;
                    }
                    response_key
                }
                None => self.insert_response_control(key, response),
            };
            response_keys.push(response_key);
        }
        for stale in previous {
            self.response_controls.remove(stale);
            replaced.responses.push(stale);
        }
        if let Some(control) = self.node_controls.get_mut(key) {
            control.responses = response_keys;
        }
    }
}

impl ValueControl for ConversationTreeControl {
    type Value = ConversationTree;

    fn value(&self) -> ConversationTree {
        ConversationTree {
            id: self.id.clone(),
            root_node: self.root_node.clone(),
            nodes: self
                .nodes
                .iter()
                .filter_map(|key| self.node_value(*key))
                .collect(),
            specification: self.specification.clone(),
            extra: self.extra.clone(),
        }
    }

    fn set_value(&mut self, value: ConversationTree, opts: EmitOptions) {
        self.replace_value(value, opts);
    }

    fn value_changes(&self) -> &EventBus<ValueChange> {
        &self.value_changes
    }
}
