//! Editor configuration
//!
//! Plain data with defaults; every struct can be built in code or
//! deserialized from the host's extension settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing and fallback-layout settings for the synchronization loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Quiet period before tree changes are projected onto the graph
    pub reconcile_debounce_ms: u64,

    /// Quiet period before an in-progress drag is written to the tree
    pub position_debounce_ms: u64,

    pub grid: GridLayout,
}

impl SyncConfig {
    pub fn reconcile_debounce(&self) -> Duration {
        Duration::from_millis(self.reconcile_debounce_ms)
    }

    pub fn position_debounce(&self) -> Duration {
        Duration::from_millis(self.position_debounce_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconcile_debounce_ms: 5,
            position_debounce_ms: 200,
            grid: GridLayout::default(),
        }
    }
}

/// Fallback grid used for nodes that have no stored position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridLayout {
    pub node_width: f64,
    pub node_height: f64,
    pub gap: f64,
    /// Start a new row once a row is wider than this many node widths
    pub columns: u32,
}

impl GridLayout {
    pub fn row_width(&self) -> f64 {
        self.node_width * f64::from(self.columns)
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            node_width: 200.0,
            node_height: 500.0,
            gap: 20.0,
            columns: 10,
        }
    }
}

/// Snapshot history settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UndoRedoConfig {
    pub max_state_snapshots: usize,
}

impl UndoRedoConfig {
    pub const DEFAULT_MAX_STATE_SNAPSHOTS: usize = 100;
    pub const MIN_STATE_SNAPSHOTS: usize = 10;

    /// Configured limit, raised to the floor when set too low
    pub fn effective_max_state_snapshots(&self) -> usize {
        self.max_state_snapshots.max(Self::MIN_STATE_SNAPSHOTS)
    }
}

impl Default for UndoRedoConfig {
    fn default() -> Self {
        Self {
            max_state_snapshots: Self::DEFAULT_MAX_STATE_SNAPSHOTS,
        }
    }
}

/// Left-to-right auto layout settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Horizontal space between ranks
    pub rank_separation: f64,
    /// Vertical space between nodes of the same rank
    pub node_separation: f64,
    /// Size assumed for nodes the canvas has not measured yet
    pub default_node_width: f64,
    pub default_node_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rank_separation: 50.0,
            node_separation: 50.0,
            default_node_width: 260.0,
            default_node_height: 300.0,
        }
    }
}

/// Settings for the whole editor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub sync: SyncConfig,
    pub undo_redo: UndoRedoConfig,
    pub layout: LayoutConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"sync": {"positionDebounceMs": 50}, "undoRedo": {"maxStateSnapshots": 3}}"#)
                .unwrap();
        assert_eq!(config.sync.position_debounce(), Duration::from_millis(50));
        assert_eq!(config.sync.reconcile_debounce(), Duration::from_millis(5));
        assert_eq!(config.sync.grid.row_width(), 2000.0);
        assert_eq!(config.undo_redo.effective_max_state_snapshots(), 10);
        assert_eq!(config.layout.default_node_width, 260.0);
    }
}
