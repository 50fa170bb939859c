//! # Conversation Editor
//!
//! Ties the pieces together the way the canvas uses them: the flow sync,
//! the snapshot history, copy/paste and the focused entity.
//!
//! Snapshots are taken when the canvas gains or loses focus and after an
//! auto layout, so a burst of edits between two focus changes undoes as
//! one step.

use std::time::Instant;

use charon_extensions::{EmitOptions, Metadata, Schema};
use serde_json::Value;
use tracing::debug;

use crate::clipboard::{Clipboard, CopyPaste, MemoryClipboard};
use crate::config::EditorConfig;
use crate::controls::{ConversationSchemas, ConversationTreeControl, DialogNodeKey, DialogResponseKey};
use crate::errors::EditorError;
use crate::flow::XYPosition;
use crate::layout::layout_left_to_right;
use crate::models::ConversationTree;
use crate::schema_validation::ensure_valid_schema;
use crate::state::{ConversationState, UndoRedoState};
use crate::sync::{ConversationFlowSync, ReconcileSummary};

/// The entity the user last selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedEntity {
    ConversationTree,
    DialogNode(DialogNodeKey),
    DialogResponse(DialogResponseKey),
}

#[derive(Debug)]
pub struct ConversationEditor<C = MemoryClipboard> {
    sync: ConversationFlowSync,
    history: UndoRedoState<ConversationTree>,
    copy_paste: CopyPaste<C>,
    focused: Option<FocusedEntity>,
    config: EditorConfig,
}

impl ConversationEditor<MemoryClipboard> {
    pub fn new(tree: ConversationTree, config: EditorConfig) -> Self {
        Self::with_clipboard(ConversationTreeControl::new(tree), MemoryClipboard::default(), config)
    }
}

impl<C: Clipboard> ConversationEditor<C> {
    pub fn with_clipboard(control: ConversationTreeControl, clipboard: C, config: EditorConfig) -> Self {
        let state = ConversationState::new(control);
        let history = UndoRedoState::new(&state, config.undo_redo);
        let sync = ConversationFlowSync::new(state, config.sync.clone());
        Self {
            sync,
            history,
            copy_paste: CopyPaste::new(clipboard),
            focused: None,
            config,
        }
    }

    /// Open a host document, refusing schemas the editor cannot work with
    pub fn open(
        document: Value,
        metadata: &Metadata,
        conversation_tree_schema: &Schema,
        clipboard: C,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        ensure_valid_schema(metadata, conversation_tree_schema)?;
        let schemas = ConversationSchemas::resolve(metadata, conversation_tree_schema)?;
        let tree: ConversationTree = serde_json::from_value(document)?;
        let control = ConversationTreeControl::new(tree).with_schemas(schemas);
        Ok(Self::with_clipboard(control, clipboard, config))
    }

    pub fn sync(&self) -> &ConversationFlowSync {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut ConversationFlowSync {
        &mut self.sync
    }

    pub fn state(&self) -> &ConversationState {
        self.sync.state()
    }

    pub fn history(&self) -> &UndoRedoState<ConversationTree> {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn value(&self) -> ConversationTree {
        self.sync.state().value()
    }

    pub fn focused(&self) -> Option<FocusedEntity> {
        self.focused
    }

    /// Run the sync loop's due work
    pub fn tick(&mut self, now: Instant) -> Option<ReconcileSummary> {
        self.sync.tick(now)
    }

    /// Canvas gained focus, optionally on an entity
    pub fn on_focus(&mut self, entity: Option<FocusedEntity>) {
        if entity.is_some() {
            self.focused = entity;
        }
        self.save_state();
    }

    pub fn on_blur(&mut self) {
        self.save_state();
    }

    pub fn save_state(&mut self) -> bool {
        self.history.save_state(self.sync.state())
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo(self.sync.state_mut());
        if undone {
            self.drop_stale_focus();
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo(self.sync.state_mut());
        if redone {
            self.drop_stale_focus();
        }
        redone
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Delete the focused entity. The conversation tree itself is never
    /// deleted. Focus moves to the owner of what was removed.
    pub fn delete(&mut self) -> bool {
        let Some(focused) = self.focused else {
            return false;
        };
        let state = self.sync.state_mut();

        match focused {
            FocusedEntity::ConversationTree => {
                debug!("conversation tree is not deletable");
                false
            }
            FocusedEntity::DialogNode(key) => {
                let Some(dialog_node_id) = state.tree().node(key).map(|node| node.id().to_string())
                else {
                    return false;
                };
                let removed = state.remove_dialog_node(&dialog_node_id, EmitOptions::default());
                if removed {
                    self.focused = Some(FocusedEntity::ConversationTree);
                }
                removed
            }
            FocusedEntity::DialogResponse(key) => {
                let tree = state.tree();
                let Some(response) = tree.response(key) else {
                    return false;
                };
                let node_key = response.node();
                let dialog_response_id = response.id().to_string();
                let Some(dialog_node_id) = tree.node(node_key).map(|node| node.id().to_string())
                else {
                    return false;
                };
                let removed = state.remove_dialog_response(
                    &dialog_node_id,
                    &dialog_response_id,
                    EmitOptions::default(),
                );
                if removed {
                    self.focused = Some(FocusedEntity::DialogNode(node_key));
                }
                removed
            }
        }
    }

    /// Copy the focused dialog node
    pub fn copy(&mut self) -> bool {
        match self.focused {
            Some(FocusedEntity::DialogNode(key)) => self.copy_paste.copy(self.sync.state(), key),
            _ => false,
        }
    }

    pub fn paste(&mut self, position: XYPosition) -> Option<DialogNodeKey> {
        self.copy_paste
            .paste(self.sync.state_mut(), position, EmitOptions::default())
    }

    /// Copy the focused dialog node and paste it at `position`
    pub fn duplicate(&mut self, position: XYPosition) -> Option<DialogNodeKey> {
        match self.focused {
            Some(FocusedEntity::DialogNode(key)) => self.copy_paste.duplicate(
                self.sync.state_mut(),
                key,
                position,
                EmitOptions::default(),
            ),
            _ => None,
        }
    }

    /// Lay the rendered graph out left to right and store the positions.
    /// Returns the number of nodes moved.
    pub fn auto_layout(&mut self, now: Instant) -> usize {
        let changes = layout_left_to_right(self.sync.nodes(), self.sync.edges(), &self.config.layout);
        let moved = changes.len();
        self.sync.on_nodes_change(changes, now);
        self.save_state();
        moved
    }

    fn drop_stale_focus(&mut self) {
        let tree = self.sync.state().tree();
        let stale = match self.focused {
            Some(FocusedEntity::DialogNode(key)) => !tree.contains_node(key),
            Some(FocusedEntity::DialogResponse(key)) => !tree.contains_response(key),
            _ => false,
        };
        if stale {
            self.focused = Some(FocusedEntity::ConversationTree);
        }
    }
}
