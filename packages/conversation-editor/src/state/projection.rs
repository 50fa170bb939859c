//! # Tree-to-Graph Projector
//!
//! Diffs the rendered graph against the tree and returns the changes that
//! make the graph match. Graph ids are pure functions of entity kind, entity
//! id and handle role, so projecting an unchanged tree onto its own
//! projection yields no changes.

use std::collections::HashMap;

use tracing::trace;

use super::position::get_position;
use super::ConversationState;
use crate::flow::{
    create_dialog_handle_id, create_dialog_node_id, create_response_handle_id,
    create_root_handle_id, create_root_node_id, EdgeChange, FlowControl, FlowEdge, FlowNode,
    NodeChange, NodeKind, XYPosition,
};

impl ConversationState {
    pub fn get_conversation_node_changes(&self, nodes: &[FlowNode]) -> Vec<NodeChange> {
        let mut nodes_by_id: HashMap<&str, &FlowNode> =
            nodes.iter().map(|node| (node.id.as_str(), node)).collect();
        let mut changes = Vec::new();

        for (key, dialog_node) in self.tree.node_entries() {
            let flow_node_id = create_dialog_node_id(&dialog_node.id().to_string());
            let position = get_position(dialog_node.specification());
            let existing = nodes_by_id.remove(flow_node_id.as_str());
            reconcile_node(
                &mut changes,
                existing,
                flow_node_id,
                NodeKind::Dialog,
                FlowControl::DialogNode(key),
                position,
            );
        }

        let root_flow_node_id = create_root_node_id(&self.conversation_tree_id());
        let root_position = get_position(self.tree.specification());
        let existing_root = nodes_by_id.remove(root_flow_node_id.as_str());
        reconcile_node(
            &mut changes,
            existing_root,
            root_flow_node_id,
            NodeKind::Root,
            FlowControl::ConversationTree,
            root_position,
        );

        self.place_unplaced_nodes(&mut changes);

        // Keep removals in rendered order so the change list is deterministic
        for node in nodes {
            if nodes_by_id.remove(node.id.as_str()).is_some() {
                changes.push(NodeChange::Remove {
                    id: node.id.clone(),
                });
            }
        }

        trace!(changes = changes.len(), "projected node changes");
        changes
    }

    pub fn get_initial_nodes(&self) -> Vec<FlowNode> {
        self.get_conversation_node_changes(&[])
            .into_iter()
            .filter_map(|change| match change {
                NodeChange::Add(item) => Some(item),
                _ => None,
            })
            .collect()
    }

    pub fn get_conversation_edge_changes(&self, edges: &[FlowEdge]) -> Vec<EdgeChange> {
        let mut edges_by_id: HashMap<&str, &FlowEdge> =
            edges.iter().map(|edge| (edge.id.as_str(), edge)).collect();
        let mut changes = Vec::new();

        for (_, dialog_node) in self.tree.node_entries() {
            let dialog_node_id = dialog_node.id().to_string();
            let source = create_dialog_node_id(&dialog_node_id);

            if let Some(next_node) = dialog_node.next_node() {
                if dialog_node.responses().is_empty() {
                    let edge = FlowEdge::from_handle(
                        source.clone(),
                        create_dialog_node_id(&next_node.id.to_string()),
                        create_dialog_handle_id(&dialog_node_id),
                    );
                    reconcile_edge(&mut changes, &mut edges_by_id, edge);
                }
            }

            for response in dialog_node
                .responses()
                .iter()
                .filter_map(|key| self.tree.response(*key))
            {
                let Some(next_node) = response.next_node() else {
                    continue;
                };
                let edge = FlowEdge::from_handle(
                    source.clone(),
                    create_dialog_node_id(&next_node.id.to_string()),
                    create_response_handle_id(&response.id().to_string()),
                );
                reconcile_edge(&mut changes, &mut edges_by_id, edge);
            }
        }

        if let Some(root_node) = self.tree.root_node() {
            let conversation_tree_id = self.conversation_tree_id();
            let edge = FlowEdge::from_handle(
                create_root_node_id(&conversation_tree_id),
                create_dialog_node_id(&root_node.id.to_string()),
                create_root_handle_id(&conversation_tree_id),
            );
            reconcile_edge(&mut changes, &mut edges_by_id, edge);
        }

        for edge in edges {
            if edges_by_id.remove(edge.id.as_str()).is_some() {
                changes.push(EdgeChange::Remove {
                    id: edge.id.clone(),
                });
            }
        }

        trace!(changes = changes.len(), "projected edge changes");
        changes
    }

    pub fn get_initial_edges(&self) -> Vec<FlowEdge> {
        self.get_conversation_edge_changes(&[])
            .into_iter()
            .filter_map(|change| match change {
                EdgeChange::Add(item) => Some(item),
                _ => None,
            })
            .collect()
    }

    /// Lay out added or replaced nodes without a stored position on a
    /// left-to-right wrapping grid
    fn place_unplaced_nodes(&self, changes: &mut [NodeChange]) {
        let grid = self.grid;
        let mut last_x = 0.0;
        let mut last_y = 0.0;
        for change in changes.iter_mut() {
            let item = match change {
                NodeChange::Add(item) | NodeChange::Replace { item, .. } => item,
                _ => continue,
            };
            if item.position.is_placed() {
                continue;
            }
            item.position = XYPosition::new(last_x, last_y);

            last_x += grid.node_width + grid.gap;
            if last_x > grid.row_width() {
                last_y += grid.node_height + grid.gap;
                last_x = 0.0;
            }
        }
    }
}

fn reconcile_node(
    changes: &mut Vec<NodeChange>,
    existing: Option<&FlowNode>,
    id: String,
    kind: NodeKind,
    control: FlowControl,
    position: Option<XYPosition>,
) {
    match existing {
        Some(existing) if existing.control == control => {
            if let Some(position) = position {
                if position != existing.position {
                    changes.push(NodeChange::Position {
                        id,
                        position: Some(position),
                        dragging: false,
                    });
                }
            }
        }
        Some(_) => changes.push(NodeChange::Replace {
            item: FlowNode::new(id.clone(), kind, control, position),
            id,
        }),
        None => changes.push(NodeChange::Add(FlowNode::new(id, kind, control, position))),
    }
}

fn reconcile_edge(changes: &mut Vec<EdgeChange>, edges_by_id: &mut HashMap<&str, &FlowEdge>, edge: FlowEdge) {
    match edges_by_id.remove(edge.id.as_str()) {
        Some(existing) if *existing == edge => {}
        Some(_) => changes.push(EdgeChange::Replace {
            id: edge.id.clone(),
            item: edge,
        }),
        None => changes.push(EdgeChange::Add(edge)),
    }
}
