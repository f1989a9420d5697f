use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use canvas::config::CanvasConfig;
use canvas::document::{Canvas, CanvasEdge, CanvasNode, DependencyKind, GraphSnapshot, Position};
use canvas::errors::{CoreResult, SyncError};
use canvas::services::StoreEvent;
use canvas::sync::{
    open_session, CanvasSession, CanvasWriter, DropReason, EdgeChange, NodeChange,
    ReconcileOutcome, SaveStatus, SessionUpdate,
};
use canvas_test_utils::{ctx, edge, new_node_data, node, TestDb, ALICE};
use chrono::Utc;

#[derive(Default)]
struct RecordingWriter {
    saves: Mutex<Vec<GraphSnapshot>>,
}

impl RecordingWriter {
    fn saves(&self) -> Vec<GraphSnapshot> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl CanvasWriter for RecordingWriter {
    async fn save_graph(&self, _canvas_id: &str, snapshot: GraphSnapshot) -> CoreResult<()> {
        self.saves.lock().unwrap().push(snapshot);
        Ok(())
    }
}

fn remote(nodes: Vec<CanvasNode>, edges: Vec<CanvasEdge>) -> Canvas {
    let now = Utc::now();
    Canvas {
        id: "c-1".to_string(),
        creator_id: ALICE.to_string(),
        name: "Sketch".to_string(),
        nodes,
        edges,
        version: 1,
        created_at: now,
        updated_at: now,
    }
}

fn at(id: &str, x: f64) -> CanvasNode {
    CanvasNode::new(id, "textNote", Position::new(x, 0.0))
}

fn open(writer: Arc<RecordingWriter>) -> CanvasSession {
    CanvasSession::open(
        &remote(vec![at("a", 0.0), at("b", 0.0)], vec![]),
        writer,
        &CanvasConfig::default(),
    )
}

fn move_to(id: &str, x: f64, dragging: Option<bool>) -> NodeChange {
    NodeChange::Position {
        id: id.to_string(),
        position: Some(Position::new(x, 0.0)),
        dragging,
    }
}

fn select(id: &str) -> NodeChange {
    NodeChange::Select {
        id: id.to_string(),
        selected: true,
    }
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_selection_changes_are_neither_saved_nor_recorded() {
    let writer = Arc::new(RecordingWriter::default());
    let mut session = open(writer.clone());

    session.apply_node_changes(&[select("a")]).unwrap();
    session
        .apply_edge_changes(&[EdgeChange::Select {
            id: "missing".to_string(),
            selected: true,
        }])
        .unwrap();

    assert!(session.mirror().node("a").unwrap().selected);
    assert_eq!(session.save_status(), SaveStatus::Idle);
    assert_eq!(session.history().len(), 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    settle().await;
    assert!(writer.saves().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_drag_records_one_entry_and_saves_once() {
    let writer = Arc::new(RecordingWriter::default());
    let mut session = open(writer.clone());

    session.apply_node_changes(&[move_to("a", 1.0, Some(true))]).unwrap();
    session.apply_node_changes(&[move_to("a", 2.0, Some(true))]).unwrap();
    assert_eq!(session.history().len(), 1);
    session.apply_node_changes(&[move_to("a", 3.0, Some(false))]).unwrap();
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.save_status(), SaveStatus::Unsynced);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    settle().await;

    let saves = writer.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].nodes[0].position.x, 3.0);
    assert_eq!(session.save_status(), SaveStatus::Saved);
}

#[tokio::test(start_paused = true)]
async fn test_undo_redo_restores_without_new_entries() {
    let writer = Arc::new(RecordingWriter::default());
    let mut session = open(writer.clone());
    session.apply_node_changes(&[select("b")]).unwrap();
    session.apply_node_changes(&[move_to("a", 5.0, None)]).unwrap();
    let edited = session.snapshot();

    assert!(session.undo().unwrap());
    assert_eq!(session.mirror().node("a").unwrap().position.x, 0.0);
    assert!(session.mirror().node("b").unwrap().selected);
    assert_eq!(session.history().len(), 2);

    assert!(session.redo().unwrap());
    assert!(session.snapshot().structurally_eq(&edited));
    assert_eq!(session.history().len(), 2);
    assert!(!session.redo().unwrap());

    assert_eq!(session.flush().await.unwrap(), SaveStatus::Saved);
    let saves = writer.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0], edited.without_selection());
}

#[tokio::test(start_paused = true)]
async fn test_undo_on_fresh_session_is_noop() {
    let writer = Arc::new(RecordingWriter::default());
    let mut session = open(writer.clone());

    assert!(!session.undo().unwrap());
    assert_eq!(session.save_status(), SaveStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_remote_snapshot_dropped_while_unsynced() {
    let writer = Arc::new(RecordingWriter::default());
    let mut session = open(writer.clone());
    session.apply_node_changes(&[select("a")]).unwrap();
    session.apply_node_changes(&[move_to("a", 5.0, None)]).unwrap();

    let incoming = remote(vec![at("a", 99.0), at("b", 0.0)], vec![]);
    assert_eq!(
        session.on_remote_snapshot(&incoming).unwrap(),
        ReconcileOutcome::Dropped {
            reason: DropReason::Unsynced
        }
    );
    assert_eq!(session.mirror().node("a").unwrap().position.x, 5.0);

    session.flush().await.unwrap();
    assert!(session.on_remote_snapshot(&incoming).unwrap().is_merged());
    let a = session.mirror().node("a").unwrap();
    assert_eq!(a.position.x, 99.0);
    assert!(a.selected);
}

#[tokio::test(start_paused = true)]
async fn test_remote_snapshot_dropped_during_drag() {
    let writer = Arc::new(RecordingWriter::default());
    let mut session = open(writer.clone());
    session.apply_node_changes(&[move_to("a", 1.0, Some(true))]).unwrap();
    session.flush().await.unwrap();

    let incoming = remote(vec![at("a", 99.0)], vec![]);
    assert_eq!(
        session.on_remote_snapshot(&incoming).unwrap(),
        ReconcileOutcome::Dropped {
            reason: DropReason::Gesture
        }
    );

    session.apply_node_changes(&[move_to("a", 2.0, Some(false))]).unwrap();
    session.flush().await.unwrap();
    assert!(session.on_remote_snapshot(&incoming).unwrap().is_merged());
    assert!(session.mirror().node("b").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_resize_blocks_reconcile_until_settled() {
    let writer = Arc::new(RecordingWriter::default());
    let mut session = open(writer.clone());
    let resize = |resizing| NodeChange::Dimensions {
        id: "a".to_string(),
        width: Some(500.0),
        height: None,
        resizing: Some(resizing),
    };

    session.apply_node_changes(&[resize(true)]).unwrap();
    session.apply_node_changes(&[resize(false)]).unwrap();
    session.flush().await.unwrap();

    let incoming = remote(vec![at("a", 0.0)], vec![]);
    assert!(!session.on_remote_snapshot(&incoming).unwrap().is_merged());

    tokio::time::sleep(CanvasConfig::default().resize_settle() + Duration::from_millis(1)).await;
    assert!(session.on_remote_snapshot(&incoming).unwrap().is_merged());
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_for_other_canvas_is_rejected() {
    let writer = Arc::new(RecordingWriter::default());
    let mut session = open(writer);
    let mut other = remote(vec![], vec![]);
    other.id = "c-2".to_string();

    assert!(matches!(
        session.on_remote_snapshot(&other),
        Err(SyncError::CanvasMismatch { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_canvas_deletion_discards_pending_save() {
    let writer = Arc::new(RecordingWriter::default());
    let mut session = open(writer.clone());
    session
        .apply_edge_changes(&[EdgeChange::Add {
            edge: edge("e1", "a", "b"),
        }])
        .unwrap();
    assert_eq!(session.mirror().edges().count(), 1);

    let update = session
        .on_store_event(&StoreEvent::CanvasDeleted {
            canvas_id: "c-1".to_string(),
        })
        .unwrap();
    assert_eq!(update, SessionUpdate::CanvasDeleted);

    tokio::time::sleep(Duration::from_secs(5)).await;
    settle().await;
    assert!(writer.saves().is_empty());
    assert_eq!(session.save_status(), SaveStatus::Idle);
}

#[tokio::test]
async fn test_session_saves_through_store_and_reconciles_own_write() {
    let app = TestDb::new_in_memory()
        .app(CanvasConfig {
            save_debounce_ms: 20,
            ..Default::default()
        })
        .await
        .unwrap();
    let canvas_id = app.create_canvas(&ctx(ALICE), "Live").await.unwrap();
    let na = app
        .create_node_data(&ctx(ALICE), new_node_data("textNote"))
        .await
        .unwrap();
    let nb = app
        .create_node_data(&ctx(ALICE), new_node_data("summary"))
        .await
        .unwrap();
    app.add_nodes(
        &ctx(ALICE),
        &canvas_id,
        vec![node("A", &na.id), node("B", &nb.id)],
    )
    .await
    .unwrap();

    let (mut session, mut events) = open_session(&app, &ctx(ALICE), &canvas_id).await.unwrap();
    session
        .apply_edge_changes(&[EdgeChange::Add {
            edge: edge("e1", "A", "B"),
        }])
        .unwrap();
    assert_eq!(session.flush().await.unwrap(), SaveStatus::Saved);

    let stored = app.get_canvas(&ctx(ALICE), &canvas_id).await.unwrap();
    assert_eq!(stored.edges.len(), 1);
    let nb = app.get_node_data(&ctx(ALICE), &nb.id).await.unwrap();
    assert_eq!(nb.dependencies.len(), 1);
    assert_eq!(nb.dependencies[0].kind, DependencyKind::Input);

    let event = events.recv().await.unwrap();
    match session.on_store_event(&event).unwrap() {
        SessionUpdate::Reconciled(outcome) => assert!(outcome.is_merged()),
        other => panic!("unexpected update {:?}", other),
    }
    assert!(session.snapshot().structurally_eq(&stored.snapshot()));

    session.dispose().await.unwrap();
}

#[tokio::test]
async fn test_failed_save_reports_error_status() {
    let app = TestDb::new_in_memory()
        .app(CanvasConfig::default())
        .await
        .unwrap();
    let canvas_id = app.create_canvas(&ctx(ALICE), "Gone").await.unwrap();
    let (mut session, _events) = open_session(&app, &ctx(ALICE), &canvas_id).await.unwrap();

    app.delete_canvas(&ctx(ALICE), &canvas_id).await.unwrap();
    session
        .apply_node_changes(&[NodeChange::Add {
            node: at("late", 1.0),
        }])
        .unwrap();

    assert_eq!(session.flush().await.unwrap(), SaveStatus::Error);
}
