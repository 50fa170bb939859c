//! # Charon Conversation Editor
//!
//! Editing core for branching conversation trees: keeps a node-and-edge
//! canvas graph in step with the hierarchical conversation document.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ canvas: drags, links, deletes, drops        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ sync: debounced event loop                  │
//! │  - mutator: canvas edits → tree writes      │
//! │  - projector: tree → graph add/replace/rm   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ controls: conversation tree document        │
//! │  - positions stored in specifications       │
//! │  - identity map for host-renamed ids        │
//! │  - snapshot history for undo/redo           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Tree is source of truth**: the graph is a derived view, rebuilt by
//!    reconciliation and never edited in place
//! 2. **Stale events are harmless**: writes carry the value they expect to
//!    replace and do nothing when it no longer matches
//! 3. **Stable identity**: ids the host renames keep resolving to the same
//!    entity
//!
//! ## Usage
//!
//! ```rust,ignore
//! use charon_conversation_editor::{ConversationEditor, EditorConfig};
//!
//! let mut editor = ConversationEditor::new(tree, EditorConfig::default());
//!
//! // Feed canvas events in, then drive the loop
//! editor.sync_mut().on_nodes_change(changes, Instant::now());
//! if let Some(summary) = editor.tick(Instant::now()) {
//!     render(editor.sync().nodes(), editor.sync().edges());
//! }
//!
//! editor.on_blur();
//! editor.undo();
//! ```

mod clipboard;
mod config;
mod controls;
mod debounce;
mod editor;
mod errors;
pub mod flow;
mod layout;
mod models;
pub mod schema_validation;
pub mod state;
mod sync;

pub use clipboard::{Clipboard, CopyPaste, MemoryClipboard, NoClipboard};
pub use config::{EditorConfig, GridLayout, LayoutConfig, SyncConfig, UndoRedoConfig};
pub use controls::{
    ConversationSchemas, ConversationTreeControl, DialogNodeControl, DialogNodeKey,
    DialogResponseControl, DialogResponseKey, ReplacedControls,
};
pub use debounce::Debouncer;
pub use editor::{ConversationEditor, FocusedEntity};
pub use errors::EditorError;
pub use layout::layout_left_to_right;
pub use models::{
    generate_dialog_node_id_placeholder, generate_dialog_response_id_placeholder,
    is_placeholder_id, ConversationTree, DialogNode, DialogNodeDraft, DialogResponse,
    DialogResponseDraft, Text, EMPTY_TEXT, PLACEHOLDER_ID_PREFIX,
};
pub use schema_validation::{migrate_schema, validate_schema, SchemaValidationError};
pub use state::{ConversationState, EntityKey, ExpectedTarget, IdentityMap, UndoRedoEvent, UndoRedoState};
pub use sync::{ConversationFlowSync, ReconcileSummary};

pub use charon_extensions::{EmitOptions, ValueControl};
