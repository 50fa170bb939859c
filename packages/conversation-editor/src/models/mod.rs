//! Conversation document models
//!
//! Plain values mirroring the host documents. Field names serialize in the
//! host's PascalCase so documents copied out of Charon deserialize directly.

mod conversation_tree;
mod placeholder;
mod text;

pub use conversation_tree::{ConversationTree, DialogNode, DialogNodeDraft, DialogResponse, DialogResponseDraft};
pub use placeholder::{
    generate_dialog_node_id_placeholder, generate_dialog_response_id_placeholder,
    is_placeholder_id, EMPTY_TEXT, PLACEHOLDER_ID_PREFIX,
};
pub use text::Text;
