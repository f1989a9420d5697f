use canvas::config::CanvasConfig;
use canvas::document::{Dependency, DependencyKind, GraphSnapshot, NodeData};
use canvas::AppContext;
use canvas_test_utils::{bare_node, ctx, edge, new_node_data, node, triggering_edge, TestDb, ALICE};

struct Board {
    app: AppContext,
    canvas_id: String,
}

impl Board {
    /// A canvas whose nodes `A`, `B`, `C` link node data of the same names.
    async fn new() -> (Self, [String; 3]) {
        let app = TestDb::new_in_memory()
            .app(CanvasConfig::default())
            .await
            .unwrap();
        let canvas_id = app.create_canvas(&ctx(ALICE), "Deps").await.unwrap();

        let mut ids = Vec::new();
        for _ in 0..3 {
            let data = app
                .create_node_data(&ctx(ALICE), new_node_data("textNote"))
                .await
                .unwrap();
            ids.push(data.id);
        }
        let ids: [String; 3] = ids.try_into().unwrap();

        app.add_nodes(
            &ctx(ALICE),
            &canvas_id,
            vec![node("A", &ids[0]), node("B", &ids[1]), node("C", &ids[2])],
        )
        .await
        .unwrap();

        (Self { app, canvas_id }, ids)
    }

    async fn data(&self, id: &str) -> NodeData {
        self.app.get_node_data(&ctx(ALICE), id).await.unwrap()
    }
}

fn entries(data: &NodeData) -> Vec<(String, DependencyKind)> {
    data.dependencies
        .iter()
        .map(|d| (d.node_data_id.clone(), d.kind))
        .collect()
}

#[tokio::test]
async fn test_add_then_remove_single_edge() {
    let (board, [na, nb, _]) = Board::new().await;

    board
        .app
        .add_edges(&ctx(ALICE), &board.canvas_id, vec![edge("e1", "A", "B")])
        .await
        .unwrap();

    assert_eq!(board.data(&na).await.dependencies, vec![Dependency::output(&nb)]);
    assert_eq!(board.data(&nb).await.dependencies, vec![Dependency::input(&na)]);

    board
        .app
        .remove_edges(&ctx(ALICE), &board.canvas_id, vec!["e1".to_string()])
        .await
        .unwrap();

    assert!(board.data(&na).await.dependencies.is_empty());
    assert!(board.data(&nb).await.dependencies.is_empty());
}

#[tokio::test]
async fn test_re_adding_edges_is_idempotent() {
    let (board, [na, nb, _]) = Board::new().await;
    let batch = vec![edge("e1", "A", "B")];

    let first = board
        .app
        .add_edges(&ctx(ALICE), &board.canvas_id, batch.clone())
        .await
        .unwrap();
    let second = board
        .app
        .add_edges(&ctx(ALICE), &board.canvas_id, batch)
        .await
        .unwrap();

    assert_eq!(first.dependencies.linked, 2);
    assert_eq!(second.dependencies.linked, 0);
    assert_eq!(entries(&board.data(&na).await), vec![(nb.clone(), DependencyKind::Output)]);
    assert_eq!(entries(&board.data(&nb).await), vec![(na.clone(), DependencyKind::Input)]);
}

#[tokio::test]
async fn test_removing_edge_keeps_entries_of_shared_endpoint() {
    let (board, [na, nb, nc]) = Board::new().await;
    board
        .app
        .add_edges(
            &ctx(ALICE),
            &board.canvas_id,
            vec![edge("ab", "A", "B"), edge("cb", "C", "B")],
        )
        .await
        .unwrap();

    board
        .app
        .remove_edges(&ctx(ALICE), &board.canvas_id, vec!["ab".to_string()])
        .await
        .unwrap();

    assert!(board.data(&na).await.dependencies.is_empty());
    assert_eq!(entries(&board.data(&nb).await), vec![(nc.clone(), DependencyKind::Input)]);
    assert_eq!(entries(&board.data(&nc).await), vec![(nb, DependencyKind::Output)]);
}

#[tokio::test]
async fn test_parallel_edge_keeps_link_alive() {
    let (board, [na, nb, _]) = Board::new().await;
    let mut by_handle = edge("ab-2", "A", "B");
    by_handle.target_handle = Some("summary".to_string());
    board
        .app
        .add_edges(
            &ctx(ALICE),
            &board.canvas_id,
            vec![edge("ab-1", "A", "B"), by_handle],
        )
        .await
        .unwrap();

    // One entry per pair and kind, whatever the handle.
    assert_eq!(board.data(&nb).await.dependencies.len(), 1);

    let outcome = board
        .app
        .remove_edges(&ctx(ALICE), &board.canvas_id, vec!["ab-1".to_string()])
        .await
        .unwrap();
    assert_eq!(outcome.dependencies.unlinked, 0);
    assert_eq!(entries(&board.data(&nb).await), vec![(na.clone(), DependencyKind::Input)]);

    board
        .app
        .remove_edges(&ctx(ALICE), &board.canvas_id, vec!["ab-2".to_string()])
        .await
        .unwrap();
    assert!(board.data(&na).await.dependencies.is_empty());
    assert!(board.data(&nb).await.dependencies.is_empty());
}

#[tokio::test]
async fn test_rewiring_edge_moves_dependencies() {
    let (board, [na, nb, nc]) = Board::new().await;
    board
        .app
        .add_edges(&ctx(ALICE), &board.canvas_id, vec![edge("e1", "A", "B")])
        .await
        .unwrap();

    board
        .app
        .add_edges(&ctx(ALICE), &board.canvas_id, vec![edge("e1", "A", "C")])
        .await
        .unwrap();

    assert!(board.data(&nb).await.dependencies.is_empty());
    assert_eq!(entries(&board.data(&na).await), vec![(nc.clone(), DependencyKind::Output)]);
    assert_eq!(entries(&board.data(&nc).await), vec![(na, DependencyKind::Input)]);
}

#[tokio::test]
async fn test_edges_without_node_data_are_skipped() {
    let (board, [na, _, _]) = Board::new().await;
    board
        .app
        .add_nodes(&ctx(ALICE), &board.canvas_id, vec![bare_node("label")])
        .await
        .unwrap();

    let outcome = board
        .app
        .add_edges(
            &ctx(ALICE),
            &board.canvas_id,
            vec![edge("to-label", "A", "label"), edge("dangling", "A", "ghost")],
        )
        .await
        .unwrap();

    assert_eq!(outcome.dependencies.linked, 0);
    assert_eq!(
        outcome.dependencies.skipped_edges,
        vec!["to-label".to_string(), "dangling".to_string()]
    );
    assert!(board.data(&na).await.dependencies.is_empty());

    let canvas = board.app.get_canvas(&ctx(ALICE), &board.canvas_id).await.unwrap();
    assert_eq!(canvas.edges.len(), 2);
}

#[tokio::test]
async fn test_trigger_flag_is_copied_from_edge_data() {
    let (board, [na, nb, _]) = Board::new().await;
    board
        .app
        .add_edges(
            &ctx(ALICE),
            &board.canvas_id,
            vec![triggering_edge("e1", "A", "B")],
        )
        .await
        .unwrap();

    let input = board.data(&nb).await.dependencies.remove(0);
    assert_eq!(input.node_data_id, na);
    assert_eq!(input.should_trigger_update, Some(true));
    let output = board.data(&na).await.dependencies.remove(0);
    assert_eq!(output.should_trigger_update, None);
}

#[tokio::test]
async fn test_removing_node_cascades_to_edges_and_marks_node_data() {
    let (board, [na, nb, nc]) = Board::new().await;
    board
        .app
        .add_edges(
            &ctx(ALICE),
            &board.canvas_id,
            vec![edge("ab", "A", "B"), edge("bc", "B", "C")],
        )
        .await
        .unwrap();

    board
        .app
        .remove_nodes(&ctx(ALICE), &board.canvas_id, vec!["B".to_string()])
        .await
        .unwrap();

    let canvas = board.app.get_canvas(&ctx(ALICE), &board.canvas_id).await.unwrap();
    assert!(canvas.edges.is_empty());
    assert!(board.data(&na).await.dependencies.is_empty());
    assert!(board.data(&nc).await.dependencies.is_empty());

    let removed = board.data(&nb).await;
    assert!(removed.dependencies.is_empty());
    assert!(!removed.is_on_canvas());

    board
        .app
        .add_nodes(&ctx(ALICE), &board.canvas_id, vec![node("B", &nb)])
        .await
        .unwrap();
    assert!(board.data(&nb).await.is_on_canvas());
}

#[tokio::test]
async fn test_graph_save_derives_dependency_changes() {
    let (board, [na, nb, nc]) = Board::new().await;
    let canvas = board.app.get_canvas(&ctx(ALICE), &board.canvas_id).await.unwrap();

    let with_edge = GraphSnapshot::new(canvas.nodes.clone(), vec![edge("e1", "A", "B")]);
    board
        .app
        .save_canvas_graph(&ctx(ALICE), &board.canvas_id, with_edge, Some(canvas.version))
        .await
        .unwrap();
    assert_eq!(entries(&board.data(&nb).await), vec![(na.clone(), DependencyKind::Input)]);

    let mut relabelled = edge("e1", "A", "B");
    relabelled.data = Some(serde_json::json!({ "label": "feeds" }));
    let outcome = board
        .app
        .save_canvas_graph(
            &ctx(ALICE),
            &board.canvas_id,
            GraphSnapshot::new(canvas.nodes.clone(), vec![relabelled]),
            None,
        )
        .await
        .unwrap();
    assert_eq!(outcome.dependencies.linked, 0);
    assert_eq!(outcome.dependencies.unlinked, 0);

    let rewired = GraphSnapshot::new(canvas.nodes.clone(), vec![edge("e1", "C", "B")]);
    board
        .app
        .save_canvas_graph(&ctx(ALICE), &board.canvas_id, rewired, None)
        .await
        .unwrap();
    assert!(board.data(&na).await.dependencies.is_empty());
    assert_eq!(entries(&board.data(&nb).await), vec![(nc, DependencyKind::Input)]);

    let stale = board
        .app
        .save_canvas_graph(
            &ctx(ALICE),
            &board.canvas_id,
            GraphSnapshot::default(),
            Some(canvas.version),
        )
        .await
        .unwrap_err();
    assert!(stale.is_conflict());
}
