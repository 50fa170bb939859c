//! Conversation state: the tree control plus everything needed to project it
//! onto the canvas graph and to apply canvas edits back to it.

mod conversation;
mod identity;
mod mutations;
pub mod position;
mod projection;
mod undo_redo;

pub use conversation::ConversationState;
pub use identity::{EntityKey, IdentityMap};
pub use mutations::ExpectedTarget;
pub use undo_redo::{UndoRedoEvent, UndoRedoState};
