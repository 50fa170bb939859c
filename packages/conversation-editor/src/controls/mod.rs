//! Live controls over the conversation tree document.

mod conversation_tree;
pub(crate) mod schemas;

pub use conversation_tree::{
    ConversationTreeControl, DialogNodeControl, DialogNodeKey, DialogResponseControl,
    DialogResponseKey, ReplacedControls,
};
pub use schemas::ConversationSchemas;
