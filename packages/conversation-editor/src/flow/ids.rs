//! Graph node, handle and edge identifiers.
//!
//! Graph ids embed the tree id they were built from, so the same tree state
//! always yields the same graph ids.

const DIALOG_NODE_PREFIX: &str = "node-dialog-";
const ROOT_NODE_PREFIX: &str = "node-root-";
const DIALOG_HANDLE_PREFIX: &str = "handle-dialog-";
const RESPONSE_HANDLE_PREFIX: &str = "handle-response-";
const ROOT_HANDLE_PREFIX: &str = "handle-root-";
const EDGE_PREFIX: &str = "edge-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Dialog,
    Root,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// A dialog node's own next-node handle
    Dialog,
    Response,
    Root,
    Unknown,
}

pub fn create_dialog_node_id(dialog_node_id: &str) -> String {
    format!("{DIALOG_NODE_PREFIX}{dialog_node_id}")
}

pub fn create_root_node_id(conversation_tree_id: &str) -> String {
    format!("{ROOT_NODE_PREFIX}{conversation_tree_id}")
}

pub fn create_dialog_handle_id(dialog_node_id: &str) -> String {
    format!("{DIALOG_HANDLE_PREFIX}{dialog_node_id}")
}

pub fn create_response_handle_id(response_id: &str) -> String {
    format!("{RESPONSE_HANDLE_PREFIX}{response_id}")
}

pub fn create_root_handle_id(conversation_tree_id: &str) -> String {
    format!("{ROOT_HANDLE_PREFIX}{conversation_tree_id}")
}

/// Edges are keyed by their source handle: a handle has at most one link
pub fn create_edge_id(source_handle_id: &str) -> String {
    format!("{EDGE_PREFIX}{source_handle_id}")
}

pub fn parse_node_id(id: &str) -> (NodeKind, &str) {
    if let Some(rest) = id.strip_prefix(DIALOG_NODE_PREFIX) {
        (NodeKind::Dialog, rest)
    } else if let Some(rest) = id.strip_prefix(ROOT_NODE_PREFIX) {
        (NodeKind::Root, rest)
    } else {
        (NodeKind::Unknown, id)
    }
}

pub fn parse_handle_id(id: &str) -> (HandleKind, &str) {
    if let Some(rest) = id.strip_prefix(DIALOG_HANDLE_PREFIX) {
        (HandleKind::Dialog, rest)
    } else if let Some(rest) = id.strip_prefix(RESPONSE_HANDLE_PREFIX) {
        (HandleKind::Response, rest)
    } else if let Some(rest) = id.strip_prefix(ROOT_HANDLE_PREFIX) {
        (HandleKind::Root, rest)
    } else {
        (HandleKind::Unknown, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_prefixes() {
        assert_eq!(parse_node_id(&create_dialog_node_id("42")), (NodeKind::Dialog, "42"));
        assert_eq!(parse_node_id(&create_root_node_id("t")), (NodeKind::Root, "t"));
        assert_eq!(parse_handle_id(&create_response_handle_id("r-1")), (HandleKind::Response, "r-1"));
        assert_eq!(parse_handle_id(&create_root_handle_id("t")), (HandleKind::Root, "t"));
        assert_eq!(parse_handle_id(&create_dialog_handle_id("n")), (HandleKind::Dialog, "n"));
    }

    #[test]
    fn test_unknown_ids_fall_through() {
        assert_eq!(parse_node_id("something"), (NodeKind::Unknown, "something"));
        assert_eq!(parse_handle_id("handle-other-1"), (HandleKind::Unknown, "handle-other-1"));
    }

    #[test]
    fn test_ids_may_contain_separators() {
        let id = create_dialog_node_id("_ID_DIALOG_NODE_ab-cd");
        assert_eq!(parse_node_id(&id), (NodeKind::Dialog, "_ID_DIALOG_NODE_ab-cd"));
        assert_eq!(create_edge_id("handle-dialog-7"), "edge-handle-dialog-7");
    }
}
