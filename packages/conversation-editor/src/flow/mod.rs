//! Graph-side types: what the canvas renders and the changes it accepts.

mod changes;
mod ids;

pub use changes::{apply_edge_changes, apply_node_changes, EdgeChange, NodeChange};
pub use ids::{
    create_dialog_handle_id, create_dialog_node_id, create_edge_id, create_response_handle_id,
    create_root_handle_id, create_root_node_id, parse_handle_id, parse_node_id, HandleKind,
    NodeKind,
};

use serde::{Deserialize, Serialize};

use crate::controls::DialogNodeKey;

/// Canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XYPosition {
    pub x: f64,
    pub y: f64,
}

impl XYPosition {
    /// Sentinel for "not placed yet"; the projector lays such nodes out on a
    /// fallback grid before handing them to the canvas
    pub const UNPLACED: XYPosition = XYPosition {
        x: f64::NAN,
        y: f64::NAN,
    };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_placed(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Default for XYPosition {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Measured node size reported by the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// Tree entity a graph node renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowControl {
    DialogNode(DialogNodeKey),
    ConversationTree,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowNode {
    pub id: String,
    pub kind: NodeKind,
    pub position: XYPosition,
    pub control: FlowControl,
    pub draggable: bool,
    pub measured: Option<Dimensions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
}

impl FlowNode {
    /// Draggable node; without a position it is left for the fallback grid
    pub fn new(id: String, kind: NodeKind, control: FlowControl, position: Option<XYPosition>) -> Self {
        Self {
            id,
            kind,
            position: position.unwrap_or(XYPosition::UNPLACED),
            control,
            draggable: true,
            measured: None,
        }
    }
}

impl FlowEdge {
    /// Edge leaving `source_handle`, keyed by that handle
    pub fn from_handle(source: String, target: String, source_handle: String) -> Self {
        Self {
            id: create_edge_id(&source_handle),
            source,
            target,
            source_handle: Some(source_handle),
            target_handle: None,
        }
    }
}

/// A link the user drew between a source handle and a target node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    pub source_handle: Option<String>,
    pub target: String,
    pub target_handle: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandleType {
    Source,
    Target,
}

/// End of a connection drag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEnd {
    pub from_node: Option<String>,
    pub from_handle: Option<String>,
    pub from_handle_type: HandleType,
    /// False when the drag was released over empty canvas
    pub is_valid: bool,
    /// Release point in flow coordinates
    pub position: XYPosition,
}
