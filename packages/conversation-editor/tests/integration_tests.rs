//! End-to-end tests over the Council of Elrond fixture and the scenarios
//! the editor must always satisfy.

use std::time::{Duration, Instant};

use charon_conversation_editor::flow::{
    create_dialog_node_id, Connection, ConnectionEnd, HandleType, NodeChange, XYPosition,
};
use charon_conversation_editor::state::position::{clamp_position, get_position, set_position};
use charon_conversation_editor::{
    ConversationEditor, ConversationFlowSync, ConversationSchemas, ConversationState,
    ConversationTree, ConversationTreeControl, DialogNode, DialogNodeDraft, DialogResponse,
    EditorConfig, EmitOptions, ExpectedTarget, FocusedEntity, SyncConfig, Text, UndoRedoConfig,
};
use charon_extensions::{DocumentId, DocumentReference};

/// Log to the test output; set `RUST_LOG=charon_conversation_editor=trace`
/// to follow a failing scenario
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn council() -> anyhow::Result<ConversationTree> {
    Ok(serde_json::from_str(include_str!("fixtures/council_of_elrond.json"))?)
}

fn state_of(tree: ConversationTree) -> ConversationState {
    ConversationState::new(ConversationTreeControl::new(tree))
}

fn node(id: &str, next: Option<&str>) -> DialogNode {
    DialogNode {
        id: id.into(),
        next_node: next.map(DocumentReference::new),
        ..Default::default()
    }
}

fn next_node_id(state: &ConversationState, id: &str) -> Option<String> {
    let key = state.find_dialog_node(id)?;
    state.tree().node(key)?.next_node().map(|reference| reference.id.to_string())
}

#[test]
fn test_fixture_projects_every_link() -> anyhow::Result<()> {
    init_tracing();
    let sync = ConversationFlowSync::new(state_of(council()?), SyncConfig::default());

    assert_eq!(sync.nodes().len(), 6);
    let mut edge_ids: Vec<&str> = sync.edges().iter().map(|edge| edge.id.as_str()).collect();
    edge_ids.sort_unstable();
    assert_eq!(
        edge_ids,
        vec![
            "edge-handle-dialog-BoromirIntroduction",
            "edge-handle-dialog-ElrondOpening",
            "edge-handle-response-BoromirQuestion",
            "edge-handle-response-GimliReaction",
            "edge-handle-root-CouncilOfElrond",
        ]
    );

    // Unplaced nodes never pile up at the origin
    let mut positions: Vec<(i64, i64)> = sync
        .nodes()
        .iter()
        .map(|node| (node.position.x as i64, node.position.y as i64))
        .collect();
    positions.sort_unstable();
    positions.dedup();
    assert_eq!(positions.len(), 6);
    Ok(())
}

#[test]
fn test_projection_is_idempotent() -> anyhow::Result<()> {
    let state = state_of(council()?);
    let nodes = state.get_initial_nodes();
    let edges = state.get_initial_edges();

    assert!(state.get_conversation_node_changes(&nodes).is_empty());
    assert!(state.get_conversation_edge_changes(&edges).is_empty());

    let mut sync = ConversationFlowSync::new(state, SyncConfig::default());
    assert!(sync.reconcile().is_empty());
    Ok(())
}

#[test]
fn test_position_round_trip_truncates() {
    let annotations = ["", "color=red", "x=1&y=2&zoom=3", "y=7"];
    let positions = [
        XYPosition::new(0.0, 0.0),
        XYPosition::new(-120.0, 48.0),
        XYPosition::new(2_147_483_647.0, -2_147_483_648.0),
        XYPosition::new(10.9, -10.9),
    ];

    for annotation in annotations {
        for position in positions {
            let written = set_position(annotation, Some(position));
            assert_eq!(get_position(&written), clamp_position(Some(position)));
        }
    }
    assert_eq!(set_position("color=red&x=1&y=2", None), "color=red");
}

#[test]
fn test_add_response_clears_next_node() -> anyhow::Result<()> {
    let mut state = state_of(council()?);
    assert_eq!(next_node_id(&state, "ElrondOpening").as_deref(), Some("BoromirIntroduction"));

    let response = state.add_dialog_response("ElrondOpening", "Frodo: I will take it.", EmitOptions::default());

    assert!(response.is_some());
    assert_eq!(next_node_id(&state, "ElrondOpening"), None);
    let value = state.value();
    assert_eq!(value.nodes[0].responses.len(), 1);
    assert_eq!(value.nodes[0].responses[0].text, Text::from("Frodo: I will take it."));
    Ok(())
}

#[test]
fn test_remove_node_clears_every_reference() {
    let mut state = state_of(ConversationTree {
        id: "tree".into(),
        root_node: Some(DocumentReference::new("C")),
        nodes: vec![
            node("A", Some("C")),
            DialogNode {
                id: "B".into(),
                responses: vec![DialogResponse {
                    id: "r".into(),
                    next_node: Some(DocumentReference::new("C")),
                    ..Default::default()
                }],
                ..Default::default()
            },
            node("C", None),
        ],
        ..Default::default()
    });

    assert!(state.remove_dialog_node("C", EmitOptions::default()));

    let value = state.value();
    assert!(value.find_node("C").is_none());
    assert_eq!(value.nodes[0].next_node, None);
    assert_eq!(value.nodes[1].responses[0].next_node, None);
    assert_eq!(value.root_node, None);
    assert!(!state.remove_dialog_node("C", EmitOptions::default()));
}

#[test]
fn test_history_bounds() -> anyhow::Result<()> {
    let config = EditorConfig {
        undo_redo: UndoRedoConfig {
            max_state_snapshots: 10,
        },
        ..Default::default()
    };
    let mut editor = ConversationEditor::new(council()?, config);
    assert!(!editor.undo());

    for version in 0..25 {
        let state = editor.sync_mut().state_mut();
        let key = state.find_dialog_node("ElrondOpening").unwrap();
        state
            .tree_mut()
            .set_node_text(key, Text::from(format!("version {version}")), EmitOptions::default());
        assert!(editor.save_state());
    }
    assert_eq!(editor.history().len(), 10);

    let mut undos = 0;
    while editor.can_undo() {
        assert!(editor.undo());
        undos += 1;
    }
    assert_eq!(undos, 9);

    let before = editor.value();
    assert!(!editor.undo());
    assert_eq!(editor.value(), before);
    assert_eq!(before.nodes[0].text, Text::from("version 15"));
    Ok(())
}

#[test]
fn test_save_after_undo_discards_redo() -> anyhow::Result<()> {
    let mut editor = ConversationEditor::new(council()?, EditorConfig::default());
    editor
        .sync_mut()
        .state_mut()
        .remove_dialog_node("ElrondWarning", EmitOptions::default());
    editor.save_state();

    assert!(editor.undo());
    assert!(editor.can_redo());

    editor
        .sync_mut()
        .state_mut()
        .remove_dialog_node("ElrondStopsGimli", EmitOptions::default());
    assert!(editor.save_state());
    assert!(!editor.can_redo());
    assert!(editor.value().find_node("ElrondWarning").is_some());
    Ok(())
}

#[test]
fn test_linear_tree_edges() {
    let state = state_of(ConversationTree {
        id: "tree".into(),
        root_node: Some(DocumentReference::new("A")),
        nodes: vec![node("A", Some("B")), node("B", None)],
        ..Default::default()
    });

    let edges = state.get_initial_edges();
    assert_eq!(edges.len(), 2);

    let dialog = edges
        .iter()
        .find(|edge| edge.source_handle.as_deref() == Some("handle-dialog-A"))
        .unwrap();
    assert_eq!(dialog.source, "node-dialog-A");
    assert_eq!(dialog.target, "node-dialog-B");

    let root = edges
        .iter()
        .find(|edge| edge.source_handle.as_deref() == Some("handle-root-tree"))
        .unwrap();
    assert_eq!(root.source, "node-root-tree");
    assert_eq!(root.target, "node-dialog-A");

    assert!(!edges.iter().any(|edge| edge
        .source_handle
        .as_deref()
        .is_some_and(|handle| handle.starts_with("handle-response-"))));
}

#[test]
fn test_stale_expected_target_skips_link() {
    let mut state = state_of(ConversationTree {
        id: "tree".into(),
        nodes: vec![node("A", Some("X")), node("B", None), node("C", None), node("X", None)],
        ..Default::default()
    });
    let before = state.value();

    assert!(!state.set_dialog_next_node(
        "A",
        Some("C"),
        ExpectedTarget::Node("B"),
        EmitOptions::default()
    ));
    assert_eq!(state.value(), before);
    assert_eq!(next_node_id(&state, "A").as_deref(), Some("X"));
}

#[test]
fn test_renamed_placeholder_resolves_to_same_node() {
    let mut state = state_of(ConversationTree::default());
    let key = state.create_dialog_node(
        DialogNodeDraft {
            id: Some("_ID_tempX".into()),
            ..Default::default()
        },
        XYPosition::new(0.0, 0.0),
        EmitOptions::default(),
    );

    // The host assigns the permanent id on save
    state
        .tree_mut()
        .set_node_id(key, DocumentId::from("real123"), EmitOptions::default());

    assert_eq!(state.find_dialog_node("_ID_tempX"), Some(key));
    assert_eq!(state.find_dialog_node("real123"), Some(key));
}

#[test]
fn test_canvas_session() -> anyhow::Result<()> {
    init_tracing();
    let start = Instant::now();
    let at = |ms: u64| start + Duration::from_millis(ms);
    let mut editor = ConversationEditor::new(council()?, EditorConfig::default());
    editor.on_focus(None);

    // Drag a node; only the drop lands in the tree
    let drag = |x: f64, dragging: bool| NodeChange::Position {
        id: create_dialog_node_id("ElrondReveal"),
        position: Some(XYPosition::new(x, 90.0)),
        dragging,
    };
    editor.sync_mut().on_nodes_change(vec![drag(100.0, true)], at(0));
    editor.sync_mut().on_nodes_change(vec![drag(150.0, true)], at(20));
    editor.sync_mut().on_nodes_change(vec![drag(180.5, false)], at(40));
    editor.tick(at(300));
    let key = editor.state().find_dialog_node("ElrondReveal").unwrap();
    assert_eq!(
        get_position(editor.state().tree().node(key).unwrap().specification()),
        Some(XYPosition::new(180.0, 90.0))
    );

    // Release a link from a response over empty canvas
    let created = editor
        .sync_mut()
        .on_connect_end(ConnectionEnd {
            from_node: Some(create_dialog_node_id("ElrondWarning")),
            from_handle: Some("handle-response-BoromirDoubt".into()),
            from_handle_type: HandleType::Source,
            is_valid: false,
            position: XYPosition::new(900.0, 400.0),
        })
        .unwrap();
    let created_id = editor.state().tree().node(created).unwrap().id().to_string();
    assert_eq!(editor.sync().nodes().len(), 7);
    assert!(editor
        .sync()
        .edges()
        .iter()
        .any(|edge| edge.id == "edge-handle-response-BoromirDoubt"
            && edge.target == create_dialog_node_id(&created_id)));

    // Drawing the same link again removes it
    editor.sync_mut().on_connect(
        Connection {
            source: create_dialog_node_id("ElrondWarning"),
            source_handle: Some("handle-response-BoromirDoubt".into()),
            target: create_dialog_node_id(&created_id),
            target_handle: None,
        },
        at(400),
    );
    editor.tick(at(410));
    assert!(!editor
        .sync()
        .edges()
        .iter()
        .any(|edge| edge.id == "edge-handle-response-BoromirDoubt"));

    editor.on_blur();
    assert!(editor.undo());
    // The first tick notices the restored tree, the second reconciles
    editor.tick(at(500));
    editor.tick(at(520));
    assert_eq!(editor.sync().nodes().len(), 6);
    assert_eq!(editor.value(), council()?);
    Ok(())
}

#[test]
fn test_links_carry_display_text_from_schema() -> anyhow::Result<()> {
    let schemas = ConversationSchemas::builtin()?;
    let control = ConversationTreeControl::new(council()?).with_schemas(schemas);
    let mut state = ConversationState::new(control);

    assert!(state.set_dialog_next_node(
        "ElrondWarning",
        Some("ElrondStopsGimli"),
        ExpectedTarget::Unlinked,
        EmitOptions::default(),
    ));

    let value = state.value();
    let reference = value
        .find_node("ElrondWarning")
        .and_then(|node| node.next_node.clone())
        .unwrap();
    assert_eq!(reference.id, DocumentId::from("ElrondStopsGimli"));
    assert_eq!(
        reference.display_name.as_deref(),
        Some("Elrond: The Ring cannot be destroyed, Gimli, son of Gloin, by any craft that we here possess.")
    );
    Ok(())
}

#[test]
fn test_delete_through_focus() -> anyhow::Result<()> {
    let mut editor = ConversationEditor::new(council()?, EditorConfig::default());
    let key = editor.state().find_dialog_node("ElrondOpening").unwrap();
    editor.on_focus(Some(FocusedEntity::DialogNode(key)));

    assert!(editor.delete());
    let value = editor.value();
    assert_eq!(value.root_node, None);
    assert_eq!(value.nodes.len(), 4);
    assert!(!editor.delete());
    Ok(())
}
