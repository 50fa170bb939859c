use super::{Dimensions, FlowEdge, FlowNode, XYPosition};

/// Change to the rendered node list
#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    Add(FlowNode),
    Replace { id: String, item: FlowNode },
    Remove { id: String },
    /// Canvas drag; `dragging` is false on the final drop
    Position {
        id: String,
        position: Option<XYPosition>,
        dragging: bool,
    },
    Dimensions { id: String, dimensions: Dimensions },
}

impl NodeChange {
    pub fn id(&self) -> &str {
        match self {
            NodeChange::Add(item) => &item.id,
            NodeChange::Replace { id, .. }
            | NodeChange::Remove { id }
            | NodeChange::Position { id, .. }
            | NodeChange::Dimensions { id, .. } => id,
        }
    }
}

/// Change to the rendered edge list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeChange {
    Add(FlowEdge),
    Replace { id: String, item: FlowEdge },
    Remove { id: String },
}

impl EdgeChange {
    pub fn id(&self) -> &str {
        match self {
            EdgeChange::Add(item) => &item.id,
            EdgeChange::Replace { id, .. } | EdgeChange::Remove { id } => id,
        }
    }
}

/// Apply changes in order. Adding an id that is already rendered replaces
/// it; changes to unknown ids are ignored.
pub fn apply_node_changes(nodes: &mut Vec<FlowNode>, changes: impl IntoIterator<Item = NodeChange>) {
    for change in changes {
        match change {
            NodeChange::Add(item) => match nodes.iter_mut().find(|node| node.id == item.id) {
                Some(existing) => *existing = item,
                None => nodes.push(item),
            },
            NodeChange::Replace { id, item } => {
                if let Some(existing) = nodes.iter_mut().find(|node| node.id == id) {
                    *existing = item;
                }
            }
            NodeChange::Remove { id } => nodes.retain(|node| node.id != id),
            NodeChange::Position { id, position, .. } => {
                if let (Some(node), Some(position)) =
                    (nodes.iter_mut().find(|node| node.id == id), position)
                {
                    node.position = position;
                }
            }
            NodeChange::Dimensions { id, dimensions } => {
                if let Some(node) = nodes.iter_mut().find(|node| node.id == id) {
                    node.measured = Some(dimensions);
                }
            }
        }
    }
}

pub fn apply_edge_changes(edges: &mut Vec<FlowEdge>, changes: impl IntoIterator<Item = EdgeChange>) {
    for change in changes {
        match change {
            EdgeChange::Add(item) => match edges.iter_mut().find(|edge| edge.id == item.id) {
                Some(existing) => *existing = item,
                None => edges.push(item),
            },
            EdgeChange::Replace { id, item } => {
                if let Some(existing) = edges.iter_mut().find(|edge| edge.id == id) {
                    *existing = item;
                }
            }
            EdgeChange::Remove { id } => edges.retain(|edge| edge.id != id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(id: &str, target: &str) -> FlowEdge {
        FlowEdge {
            id: id.to_string(),
            source: "a".to_string(),
            target: target.to_string(),
            source_handle: None,
            target_handle: None,
        }
    }

    #[test]
    fn test_edge_changes_apply_in_order() {
        let mut edges = vec![edge("e1", "b"), edge("e2", "c")];
        apply_edge_changes(
            &mut edges,
            vec![
                EdgeChange::Replace { id: "e1".into(), item: edge("e1", "d") },
                EdgeChange::Remove { id: "e2".into() },
                EdgeChange::Add(edge("e3", "a")),
                EdgeChange::Remove { id: "missing".into() },
            ],
        );
        assert_eq!(edges, vec![edge("e1", "d"), edge("e3", "a")]);
    }

    #[test]
    fn test_duplicate_add_replaces() {
        let mut edges = vec![edge("e1", "b")];
        apply_edge_changes(&mut edges, vec![EdgeChange::Add(edge("e1", "c"))]);
        assert_eq!(edges, vec![edge("e1", "c")]);
    }
}
