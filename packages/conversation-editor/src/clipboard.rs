//! Copy, paste and duplicate of dialog nodes.
//!
//! Nodes travel through the clipboard as host JSON. The system clipboard is
//! best effort: the last copied node is kept in memory and used whenever the
//! clipboard cannot be read.

use charon_extensions::EmitOptions;
use tracing::{error, warn};

use crate::controls::DialogNodeKey;
use crate::errors::EditorError;
use crate::flow::XYPosition;
use crate::models::DialogNodeDraft;
use crate::state::ConversationState;

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), EditorError>;
    fn read_text(&mut self) -> Result<String, EditorError>;
}

/// Process-local clipboard
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    text: Option<String>,
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), EditorError> {
        self.text = Some(text.to_string());
        Ok(())
    }

    fn read_text(&mut self) -> Result<String, EditorError> {
        self.text
            .clone()
            .ok_or_else(|| EditorError::Clipboard("clipboard is empty".to_string()))
    }
}

/// Clipboard of a host that denies access
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClipboard;

impl Clipboard for NoClipboard {
    fn write_text(&mut self, _text: &str) -> Result<(), EditorError> {
        Err(EditorError::Clipboard("clipboard is not accessible".to_string()))
    }

    fn read_text(&mut self) -> Result<String, EditorError> {
        Err(EditorError::Clipboard("clipboard is not accessible".to_string()))
    }
}

impl<C: Clipboard + ?Sized> Clipboard for Box<C> {
    fn write_text(&mut self, text: &str) -> Result<(), EditorError> {
        (**self).write_text(text)
    }

    fn read_text(&mut self) -> Result<String, EditorError> {
        (**self).read_text()
    }
}

#[derive(Debug)]
pub struct CopyPaste<C> {
    clipboard: C,
    last_copied: Option<String>,
}

impl<C: Clipboard> CopyPaste<C> {
    pub fn new(clipboard: C) -> Self {
        Self {
            clipboard,
            last_copied: None,
        }
    }

    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }

    /// Copy a node. Clipboard failures are logged; the node stays available
    /// to [`Self::paste`] either way.
    pub fn copy(&mut self, state: &ConversationState, node: DialogNodeKey) -> bool {
        let Some(value) = state.tree().node_value(node) else {
            return false;
        };
        let text = match serde_json::to_string(&value) {
            Ok(text) => text,
            Err(error) => {
                error!(%error, "failed to serialize dialog node");
                return false;
            }
        };

        if let Err(error) = self.clipboard.write_text(&text) {
            warn!(%error, "failed to copy dialog node to clipboard");
        }
        self.last_copied = Some(text);
        true
    }

    /// Paste the clipboard as a new node at `position`.
    ///
    /// Ids and links of the pasted node and its responses are cleared so
    /// the copy is independent of the original.
    pub fn paste(
        &mut self,
        state: &mut ConversationState,
        position: XYPosition,
        opts: EmitOptions,
    ) -> Option<DialogNodeKey> {
        let text = match self.clipboard.read_text() {
            Ok(text) => text,
            Err(error) => {
                warn!(%error, "failed to read from clipboard, using last copied node");
                self.last_copied.clone()?
            }
        };

        let mut draft: DialogNodeDraft = match serde_json::from_str(&text) {
            Ok(draft) => draft,
            Err(error) => {
                error!(%error, "clipboard text is not a dialog node");
                return None;
            }
        };
        draft.id = None;
        draft.next_node = None;
        for response in &mut draft.responses {
            response.id = None;
            response.next_node = None;
        }

        Some(state.create_dialog_node(draft, position, opts))
    }

    pub fn duplicate(
        &mut self,
        state: &mut ConversationState,
        node: DialogNodeKey,
        position: XYPosition,
        opts: EmitOptions,
    ) -> Option<DialogNodeKey> {
        if !self.copy(state, node) {
            return None;
        }
        self.paste(state, position, opts)
    }
}
