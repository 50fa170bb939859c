//! # Synchronization Loop
//!
//! Keeps the rendered graph in step with the conversation tree.
//!
//! ```text
//! canvas event ──► mutator ──► tree ──► value change ──► debounce ──► projector ──► graph
//! ```
//!
//! The tree is the only source of truth. Canvas events never touch the
//! rendered graph directly: they edit the tree, the tree reports the change,
//! and the next reconcile pass rewrites the graph. Bursts of tree writes
//! within the reconcile delay collapse into one pass over the final state.
//!
//! Drags are debounced per entity with a longer delay; the final drop is
//! written at once. Time is supplied by the caller, so the loop runs on
//! whatever event loop hosts it.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use charon_extensions::{EmitOptions, Subscription, ValueControl};
use tracing::{debug, trace};

use crate::config::SyncConfig;
use crate::controls::DialogNodeKey;
use crate::debounce::Debouncer;
use crate::flow::{
    apply_edge_changes, apply_node_changes, parse_handle_id, parse_node_id, Connection,
    ConnectionEnd, EdgeChange, FlowEdge, FlowNode, HandleKind, HandleType, NodeChange, NodeKind,
    XYPosition,
};
use crate::state::{ConversationState, ExpectedTarget};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SyncTaskKey {
    Reconcile,
    DialogNodePosition(String),
    RootNodePosition,
}

#[derive(Debug, Clone)]
enum SyncTask {
    Reconcile,
    DialogNodePosition {
        dialog_node_id: String,
        position: XYPosition,
    },
    RootNodePosition(XYPosition),
}

/// Size of a reconcile pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub node_changes: usize,
    pub edge_changes: usize,
}

impl ReconcileSummary {
    pub fn is_empty(&self) -> bool {
        self.node_changes == 0 && self.edge_changes == 0
    }
}

#[derive(Debug)]
pub struct ConversationFlowSync {
    state: ConversationState,
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
    debouncer: Debouncer<SyncTaskKey, SyncTask>,
    /// Tree changes seen since the last reconcile was scheduled
    tree_changes: Rc<Cell<usize>>,
    subscription: Option<Subscription>,
    config: SyncConfig,
}

impl ConversationFlowSync {
    pub fn new(state: ConversationState, config: SyncConfig) -> Self {
        let state = state.with_grid(config.grid);
        let nodes = state.get_initial_nodes();
        let edges = state.get_initial_edges();

        let tree_changes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&tree_changes);
        let subscription = state
            .tree()
            .value_changes()
            .subscribe(move |_| counter.set(counter.get() + 1));

        debug!(nodes = nodes.len(), edges = edges.len(), "flow sync started");
        Self {
            state,
            nodes,
            edges,
            debouncer: Debouncer::new(),
            tree_changes,
            subscription: Some(subscription),
            config,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Writes made through here are picked up like any other tree change
    pub fn state_mut(&mut self) -> &mut ConversationState {
        &mut self.state
    }

    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// When the host should call [`Self::tick`] next
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.next_deadline()
    }

    pub fn has_pending_work(&self) -> bool {
        self.tree_changes.get() > 0 || !self.debouncer.is_empty()
    }

    /// Run everything due at `now`. Returns the summary of the reconcile
    /// pass, if one ran.
    pub fn tick(&mut self, now: Instant) -> Option<ReconcileSummary> {
        self.observe_tree_changes(now);

        let mut summary = None;
        for (_, task) in self.debouncer.take_due(now) {
            match task {
                SyncTask::Reconcile => summary = Some(self.reconcile()),
                SyncTask::DialogNodePosition {
                    dialog_node_id,
                    position,
                } => {
                    self.state.set_dialog_node_position(
                        &dialog_node_id,
                        Some(position),
                        EmitOptions::default(),
                    );
                }
                SyncTask::RootNodePosition(position) => {
                    self.state
                        .set_root_node_position(Some(position), EmitOptions::default());
                }
            }
        }

        self.observe_tree_changes(now);
        summary
    }

    /// Project the tree onto the graph now, bypassing the reconcile delay
    pub fn reconcile(&mut self) -> ReconcileSummary {
        self.tree_changes.set(0);
        self.debouncer.cancel(&SyncTaskKey::Reconcile);

        let node_changes = self.state.get_conversation_node_changes(&self.nodes);
        let edge_changes = self.state.get_conversation_edge_changes(&self.edges);
        let summary = ReconcileSummary {
            node_changes: node_changes.len(),
            edge_changes: edge_changes.len(),
        };
        apply_node_changes(&mut self.nodes, node_changes);
        apply_edge_changes(&mut self.edges, edge_changes);

        debug!(
            node_changes = summary.node_changes,
            edge_changes = summary.edge_changes,
            "graph reconciled"
        );
        summary
    }

    /// Node changes made by the user on the canvas
    pub fn on_nodes_change(&mut self, changes: Vec<NodeChange>, now: Instant) {
        for change in changes {
            match change {
                NodeChange::Position {
                    id,
                    position: Some(position),
                    dragging,
                } => self.on_position_change(&id, position, dragging, now),
                NodeChange::Position { id, position: None, .. } => {
                    trace!(flow_node_id = %id, "position change without coordinates ignored");
                }
                NodeChange::Remove { id } => {
                    if let (NodeKind::Dialog, dialog_node_id) = parse_node_id(&id) {
                        self.state
                            .remove_dialog_node(dialog_node_id, EmitOptions::default());
                    }
                }
                // Measured sizes are view-only and never stored in the tree
                dimensions @ NodeChange::Dimensions { .. } => {
                    apply_node_changes(&mut self.nodes, [dimensions]);
                }
                NodeChange::Add(_) | NodeChange::Replace { .. } => {}
            }
        }
        self.observe_tree_changes(now);
    }

    /// Edge changes made by the user on the canvas
    pub fn on_edges_change(&mut self, changes: Vec<EdgeChange>, now: Instant) {
        for change in changes {
            match change {
                EdgeChange::Add(edge) => {
                    let (_, target_dialog_node_id) = parse_node_id(&edge.target);
                    let source_handle = edge.source_handle.as_deref().unwrap_or_default();
                    self.state.set_handle_target(
                        &edge.source,
                        source_handle,
                        Some(target_dialog_node_id),
                        ExpectedTarget::Any,
                        EmitOptions::default(),
                    );
                }
                EdgeChange::Remove { id } => {
                    let Some(edge) = self.edges.iter().find(|edge| edge.id == id).cloned() else {
                        trace!(edge_id = %id, "removed edge is not rendered");
                        continue;
                    };
                    let (_, target_dialog_node_id) = parse_node_id(&edge.target);
                    let source_handle = edge.source_handle.as_deref().unwrap_or_default();
                    self.state.set_handle_target(
                        &edge.source,
                        source_handle,
                        None,
                        ExpectedTarget::Node(target_dialog_node_id),
                        EmitOptions::default(),
                    );
                }
                EdgeChange::Replace { .. } => {}
            }
        }
        self.observe_tree_changes(now);
    }

    /// A link drawn from a source handle onto a node.
    ///
    /// Drawing the link a handle already has removes it; drawing a different
    /// one moves it.
    pub fn on_connect(&mut self, connection: Connection, now: Instant) {
        let Some(source_handle) = connection.source_handle.as_deref() else {
            return;
        };
        if matches!(parse_handle_id(source_handle).0, HandleKind::Unknown) {
            return;
        }
        if !matches!(parse_node_id(&connection.target).0, NodeKind::Dialog) {
            return;
        }

        let edge = FlowEdge::from_handle(
            connection.source.clone(),
            connection.target.clone(),
            source_handle.to_string(),
        );
        let existing = self
            .edges
            .iter()
            .find(|rendered| rendered.source_handle.as_deref() == Some(source_handle))
            .cloned();

        match existing {
            Some(existing) if existing.target == connection.target => {
                self.on_edges_change(vec![EdgeChange::Remove { id: existing.id }], now);
            }
            Some(existing) => {
                self.on_edges_change(vec![EdgeChange::Remove { id: existing.id }], now);
                self.on_edges_change(vec![EdgeChange::Add(edge)], now);
            }
            None => self.on_edges_change(vec![EdgeChange::Add(edge)], now),
        }
    }

    /// A link dragged out of a source handle and released over empty canvas
    /// creates a node there. The graph is reconciled at once so the node
    /// shows up without waiting for the reconcile delay.
    pub fn on_connect_end(&mut self, end: ConnectionEnd) -> Option<DialogNodeKey> {
        if end.is_valid || end.from_handle_type == HandleType::Target {
            return None;
        }
        let (Some(source), Some(source_handle)) = (end.from_node.as_deref(), end.from_handle.as_deref())
        else {
            return None;
        };

        let key = self.state.create_dialog_continuation_node(
            source,
            source_handle,
            end.position,
            EmitOptions::default(),
        );
        self.reconcile();
        Some(key)
    }

    /// Detach from the tree; later tree changes no longer reach the graph
    pub fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.debouncer.clear();
        self.tree_changes.set(0);
        debug!("flow sync torn down");
    }

    fn on_position_change(&mut self, flow_node_id: &str, position: XYPosition, dragging: bool, now: Instant) {
        match parse_node_id(flow_node_id) {
            (NodeKind::Dialog, dialog_node_id) => {
                let key = SyncTaskKey::DialogNodePosition(dialog_node_id.to_string());
                if dragging {
                    let task = SyncTask::DialogNodePosition {
                        dialog_node_id: dialog_node_id.to_string(),
                        position,
                    };
                    self.debouncer
                        .schedule(key, task, self.config.position_debounce(), now);
                } else {
                    // The drop supersedes any drag frame still waiting
                    self.debouncer.cancel(&key);
                    self.state.set_dialog_node_position(
                        dialog_node_id,
                        Some(position),
                        EmitOptions::default(),
                    );
                }
            }
            (NodeKind::Root, _) => {
                if dragging {
                    self.debouncer.schedule(
                        SyncTaskKey::RootNodePosition,
                        SyncTask::RootNodePosition(position),
                        self.config.position_debounce(),
                        now,
                    );
                } else {
                    self.debouncer.cancel(&SyncTaskKey::RootNodePosition);
                    self.state
                        .set_root_node_position(Some(position), EmitOptions::default());
                }
            }
            (NodeKind::Unknown, _) => {}
        }
    }

    fn observe_tree_changes(&mut self, now: Instant) {
        if self.subscription.is_none() {
            return;
        }
        let changes = self.tree_changes.replace(0);
        if changes > 0 {
            trace!(changes, "tree changed, reconcile scheduled");
            self.debouncer.schedule(
                SyncTaskKey::Reconcile,
                SyncTask::Reconcile,
                self.config.reconcile_debounce(),
                now,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::ConversationTreeControl;
    use crate::models::{ConversationTree, DialogNode};
    use charon_extensions::DocumentReference;
    use std::time::Duration;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn sync() -> ConversationFlowSync {
        let tree = ConversationTree {
            id: "tree".into(),
            root_node: Some(DocumentReference::new("A")),
            nodes: vec![
                DialogNode {
                    id: "A".into(),
                    specification: "x=0&y=0".into(),
                    ..Default::default()
                },
                DialogNode {
                    id: "B".into(),
                    specification: "x=300&y=0".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let state = ConversationState::new(ConversationTreeControl::new(tree));
        ConversationFlowSync::new(state, SyncConfig::default())
    }

    fn position_of(sync: &ConversationFlowSync, id: &str) -> Option<XYPosition> {
        sync.nodes().iter().find(|node| node.id == id).map(|node| node.position)
    }

    #[test]
    fn test_bootstrap_renders_tree() {
        let sync = sync();
        assert_eq!(sync.nodes().len(), 3);
        assert_eq!(sync.edges().len(), 1);
        assert!(!sync.has_pending_work());
    }

    #[test]
    fn test_tree_change_reconciles_after_delay() {
        let start = Instant::now();
        let mut sync = sync();
        sync.state_mut()
            .set_dialog_next_node("A", Some("B"), ExpectedTarget::Any, EmitOptions::default());

        assert_eq!(sync.tick(start), None);
        assert_eq!(sync.edges().len(), 1);

        let summary = sync.tick(start + ms(5)).unwrap();
        assert_eq!(summary.edge_changes, 1);
        assert_eq!(sync.edges().len(), 2);
    }

    #[test]
    fn test_burst_collapses_into_one_pass() {
        let start = Instant::now();
        let mut sync = sync();
        for (offset, x) in [(0, 10.0), (2, 20.0), (4, 30.0)] {
            sync.state_mut().set_dialog_node_position(
                "A",
                Some(XYPosition::new(x, 0.0)),
                EmitOptions::default(),
            );
            assert_eq!(sync.tick(start + ms(offset)), None);
        }

        let summary = sync.tick(start + ms(9)).unwrap();
        assert_eq!(summary.node_changes, 1);
        assert_eq!(position_of(&sync, "node-dialog-A"), Some(XYPosition::new(30.0, 0.0)));
    }

    #[test]
    fn test_drag_is_debounced_and_drop_is_immediate() {
        let start = Instant::now();
        let mut sync = sync();
        let drag = |x: f64, dragging: bool| NodeChange::Position {
            id: "node-dialog-A".into(),
            position: Some(XYPosition::new(x, 0.0)),
            dragging,
        };

        sync.on_nodes_change(vec![drag(10.0, true)], start);
        sync.on_nodes_change(vec![drag(20.0, true)], start + ms(50));
        sync.tick(start + ms(100));
        assert_eq!(sync.state().tree().specification(), "");
        assert!(sync.state().find_dialog_node("A").is_some());
        let stored = |sync: &ConversationFlowSync| {
            let key = sync.state().find_dialog_node("A").unwrap();
            sync.state().tree().node(key).unwrap().specification().to_string()
        };
        assert_eq!(stored(&sync), "x=0&y=0");

        sync.tick(start + ms(250));
        assert_eq!(stored(&sync), "x=20&y=0");

        sync.on_nodes_change(vec![drag(25.0, true)], start + ms(260));
        sync.on_nodes_change(vec![drag(40.0, false)], start + ms(270));
        assert_eq!(stored(&sync), "x=40&y=0");

        // The cancelled drag frame never overwrites the drop
        sync.tick(start + ms(600));
        assert_eq!(stored(&sync), "x=40&y=0");
        assert_eq!(position_of(&sync, "node-dialog-A"), Some(XYPosition::new(40.0, 0.0)));
    }

    #[test]
    fn test_user_input_does_not_touch_graph_directly() {
        let start = Instant::now();
        let mut sync = sync();
        sync.on_nodes_change(
            vec![NodeChange::Position {
                id: "node-dialog-B".into(),
                position: Some(XYPosition::new(999.0, 0.0)),
                dragging: false,
            }],
            start,
        );
        assert_eq!(position_of(&sync, "node-dialog-B"), Some(XYPosition::new(300.0, 0.0)));
        sync.tick(start + ms(5));
        assert_eq!(position_of(&sync, "node-dialog-B"), Some(XYPosition::new(999.0, 0.0)));
    }

    #[test]
    fn test_connect_toggles_and_moves_links() {
        let start = Instant::now();
        let mut sync = sync();
        let connect = |target: &str| Connection {
            source: "node-dialog-A".into(),
            source_handle: Some("handle-dialog-A".into()),
            target: target.into(),
            target_handle: None,
        };

        sync.on_connect(connect("node-dialog-B"), start);
        sync.tick(start + ms(5));
        assert!(sync.edges().iter().any(|edge| edge.id == "edge-handle-dialog-A" && edge.target == "node-dialog-B"));

        sync.on_connect(connect("node-dialog-A"), start + ms(10));
        sync.tick(start + ms(15));
        let moved: Vec<_> = sync.edges().iter().filter(|edge| edge.id == "edge-handle-dialog-A").collect();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].target, "node-dialog-A");

        sync.on_connect(connect("node-dialog-A"), start + ms(20));
        sync.tick(start + ms(25));
        assert!(sync.edges().iter().all(|edge| edge.id != "edge-handle-dialog-A"));
    }

    #[test]
    fn test_removed_node_cascades_to_graph() {
        let start = Instant::now();
        let mut sync = sync();
        sync.on_nodes_change(vec![NodeChange::Remove { id: "node-dialog-A".into() }], start);
        sync.tick(start + ms(5));

        assert!(position_of(&sync, "node-dialog-A").is_none());
        assert!(sync.edges().is_empty());
        assert!(sync.state().tree().root_node().is_none());
    }

    #[test]
    fn test_connect_end_on_canvas_creates_node_immediately() {
        let mut sync = sync();
        let key = sync
            .on_connect_end(ConnectionEnd {
                from_node: Some("node-dialog-B".into()),
                from_handle: Some("handle-dialog-B".into()),
                from_handle_type: HandleType::Source,
                is_valid: false,
                position: XYPosition::new(600.0, 40.0),
            })
            .unwrap();

        let created_id = sync.state().tree().node(key).unwrap().id().to_string();
        let flow_id = crate::flow::create_dialog_node_id(&created_id);
        assert_eq!(position_of(&sync, &flow_id), Some(XYPosition::new(600.0, 40.0)));
        assert!(sync.edges().iter().any(|edge| edge.target == flow_id));
    }

    #[test]
    fn test_connect_end_on_node_is_ignored() {
        let mut sync = sync();
        let end = ConnectionEnd {
            from_node: Some("node-dialog-B".into()),
            from_handle: Some("handle-dialog-B".into()),
            from_handle_type: HandleType::Source,
            is_valid: true,
            position: XYPosition::new(0.0, 0.0),
        };
        assert!(sync.on_connect_end(end).is_none());
        assert_eq!(sync.state().tree().nodes().len(), 2);
    }

    #[test]
    fn test_teardown_stops_sync() {
        let start = Instant::now();
        let mut sync = sync();
        sync.teardown();
        sync.state_mut().remove_dialog_node("B", EmitOptions::default());

        assert_eq!(sync.tick(start + ms(50)), None);
        assert!(position_of(&sync, "node-dialog-B").is_some());
        assert_eq!(sync.state().tree().value_changes().listener_count(), 0);
    }
}
