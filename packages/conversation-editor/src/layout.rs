//! Left-to-right auto layout.
//!
//! Nodes are ranked by longest path from the sources of the graph, ranks
//! become columns and the nodes of a rank are stacked top to bottom in
//! graph order. Columns are centered on the tallest one.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::config::LayoutConfig;
use crate::flow::{FlowEdge, FlowNode, NodeChange, XYPosition};

/// Compute positions for every node. The changes are final drops, so
/// applying them writes the positions straight into the tree.
pub fn layout_left_to_right(
    nodes: &[FlowNode],
    edges: &[FlowEdge],
    config: &LayoutConfig,
) -> Vec<NodeChange> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let ranks = rank_nodes(nodes, edges);
    let sizes: Vec<(f64, f64)> = nodes
        .iter()
        .map(|node| match node.measured {
            Some(measured) => (measured.width, measured.height),
            None => (config.default_node_width, config.default_node_height),
        })
        .collect();

    let rank_count = ranks.iter().copied().max().unwrap_or(0) + 1;
    let mut columns: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
    for (index, rank) in ranks.iter().enumerate() {
        columns[*rank].push(index);
    }

    let column_heights: Vec<f64> = columns
        .iter()
        .map(|column| {
            let heights: f64 = column.iter().map(|index| sizes[*index].1).sum();
            heights + config.node_separation * column.len().saturating_sub(1) as f64
        })
        .collect();
    let tallest = column_heights.iter().copied().fold(0.0, f64::max);

    let mut positions = vec![XYPosition::default(); nodes.len()];
    let mut x = 0.0;
    for (column, height) in columns.iter().zip(&column_heights) {
        let mut y = (tallest - height) / 2.0;
        let mut width: f64 = 0.0;
        for index in column {
            positions[*index] = XYPosition::new(x, y);
            y += sizes[*index].1 + config.node_separation;
            width = width.max(sizes[*index].0);
        }
        x += width + config.rank_separation;
    }

    debug!(nodes = nodes.len(), ranks = rank_count, "auto layout computed");

    nodes
        .iter()
        .zip(positions)
        .map(|(node, position)| NodeChange::Position {
            id: node.id.clone(),
            position: Some(position),
            dragging: false,
        })
        .collect()
}

/// Longest-path rank of every node, by index into `nodes`.
///
/// Cycles are broken by releasing the earliest node still waiting on an
/// incoming edge.
fn rank_nodes(nodes: &[FlowNode], edges: &[FlowEdge]) -> Vec<usize> {
    let index_of: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.as_str(), index))
        .collect();

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree = vec![0usize; nodes.len()];
    for edge in edges {
        let (Some(&source), Some(&target)) = (
            index_of.get(edge.source.as_str()),
            index_of.get(edge.target.as_str()),
        ) else {
            continue;
        };
        if source == target {
            continue;
        }
        successors[source].push(target);
        in_degree[target] += 1;
    }

    let mut ranks = vec![0usize; nodes.len()];
    let mut visited = vec![false; nodes.len()];
    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|i| in_degree[*i] == 0).collect();
    let mut remaining = nodes.len();

    while remaining > 0 {
        let next = match queue.pop_front() {
            Some(next) => next,
            None => match (0..nodes.len()).find(|i| !visited[*i]) {
                Some(stuck) => stuck,
                None => break,
            },
        };
        if visited[next] {
            continue;
        }
        visited[next] = true;
        remaining -= 1;

        for &successor in &successors[next] {
            if visited[successor] {
                continue;
            }
            ranks[successor] = ranks[successor].max(ranks[next] + 1);
            in_degree[successor] = in_degree[successor].saturating_sub(1);
            if in_degree[successor] == 0 {
                queue.push_back(successor);
            }
        }
    }

    ranks
}
