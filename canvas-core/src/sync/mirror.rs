use indexmap::IndexMap;

use super::changes::{EdgeChange, NodeChange};
use crate::document::{CanvasEdge, CanvasNode, GraphIndex, GraphSnapshot};

/// Elements whose selection is local to the view.
trait Selectable: Clone {
    fn key(&self) -> &str;
    fn is_selected(&self) -> bool;
    fn set_selected(&mut self, selected: bool);
}

impl Selectable for CanvasNode {
    fn key(&self) -> &str {
        &self.id
    }
    fn is_selected(&self) -> bool {
        self.selected
    }
    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

impl Selectable for CanvasEdge {
    fn key(&self) -> &str {
        &self.id
    }
    fn is_selected(&self) -> bool {
        self.selected
    }
    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

/// The client's optimistic working copy of one canvas graph.
#[derive(Clone, Debug, Default)]
pub struct Mirror {
    graph: GraphIndex,
}

impl Mirror {
    pub fn new(snapshot: GraphSnapshot) -> Self {
        Self {
            graph: GraphIndex::from_snapshot(snapshot),
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CanvasNode> {
        self.graph.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &CanvasEdge> {
        self.graph.edges.values()
    }

    pub fn node(&self, id: &str) -> Option<&CanvasNode> {
        self.graph.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&CanvasEdge> {
        self.graph.edges.get(id)
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.to_snapshot()
    }

    pub fn apply_node_changes(&mut self, changes: &[NodeChange]) {
        for change in changes {
            match change {
                NodeChange::Position { id, position, .. } => {
                    if let Some(position) = position {
                        self.graph.patch_node(id, |node| node.position = *position);
                    }
                }
                NodeChange::Dimensions { id, width, height, .. } => {
                    self.graph.patch_node(id, |node| {
                        if let Some(width) = width {
                            node.width = *width;
                        }
                        if let Some(height) = height {
                            node.height = *height;
                        }
                    });
                }
                NodeChange::Select { id, selected } => {
                    self.graph.patch_node(id, |node| node.selected = *selected);
                }
                NodeChange::Remove { id } => {
                    self.graph.remove_nodes(std::slice::from_ref(id));
                }
                NodeChange::Add { node } => {
                    self.graph.upsert_nodes([node.clone()]);
                }
                NodeChange::Replace { id, node } => {
                    let selected = self.graph.nodes.get(id).map(|n| n.selected).unwrap_or(false);
                    self.graph.patch_node(id, |current| {
                        *current = node.clone();
                        current.selected = selected;
                    });
                }
            }
        }
    }

    pub fn apply_edge_changes(&mut self, changes: &[EdgeChange]) {
        for change in changes {
            match change {
                EdgeChange::Select { id, selected } => {
                    self.graph.patch_edge(id, |edge| edge.selected = *selected);
                }
                EdgeChange::Remove { id } => {
                    self.graph.remove_edges(std::slice::from_ref(id));
                }
                EdgeChange::Add { edge } => {
                    self.graph.upsert_edges([edge.clone()]);
                }
                EdgeChange::Replace { id, edge } => {
                    let selected = self.graph.edges.get(id).map(|e| e.selected).unwrap_or(false);
                    self.graph.patch_edge(id, |current| {
                        *current = edge.clone();
                        current.selected = selected;
                    });
                }
            }
        }
    }

    /// Adopt `snapshot` as the graph, keeping the local `selected` flag of
    /// every element that survives. Elements missing from the snapshot are
    /// dropped; new ones arrive unselected.
    pub fn merge_preserving_selection(&mut self, snapshot: &GraphSnapshot) {
        self.graph.nodes = merge_by_id(&self.graph.nodes, &snapshot.nodes);
        self.graph.edges = merge_by_id(&self.graph.edges, &snapshot.edges);
    }
}

fn merge_by_id<T: Selectable>(local: &IndexMap<String, T>, incoming: &[T]) -> IndexMap<String, T> {
    incoming
        .iter()
        .map(|element| {
            let mut merged = element.clone();
            let selected = local
                .get(element.key())
                .map(Selectable::is_selected)
                .unwrap_or(false);
            merged.set_selected(selected);
            (merged.key().to_string(), merged)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Position;

    fn node(id: &str, x: f64) -> CanvasNode {
        CanvasNode::new(id, "textNote", Position::new(x, 0.0))
    }

    #[test]
    fn test_apply_changes() {
        let mut mirror = Mirror::new(GraphSnapshot::new(
            vec![node("a", 0.0), node("b", 0.0)],
            vec![CanvasEdge::new("ab", "a", "b")],
        ));

        mirror.apply_node_changes(&[
            NodeChange::Position {
                id: "a".into(),
                position: Some(Position::new(10.0, 5.0)),
                dragging: Some(true),
            },
            NodeChange::Select { id: "b".into(), selected: true },
        ]);
        assert_eq!(mirror.node("a").unwrap().position, Position::new(10.0, 5.0));
        assert!(mirror.node("b").unwrap().selected);

        mirror.apply_node_changes(&[NodeChange::Remove { id: "b".into() }]);
        assert!(mirror.node("b").is_none());
        assert!(mirror.edge("ab").is_none());
    }

    #[test]
    fn test_replace_keeps_selection() {
        let mut mirror = Mirror::new(GraphSnapshot::new(vec![node("a", 0.0)], vec![]));
        mirror.apply_node_changes(&[NodeChange::Select { id: "a".into(), selected: true }]);
        mirror.apply_node_changes(&[NodeChange::Replace { id: "a".into(), node: node("a", 99.0) }]);

        let a = mirror.node("a").unwrap();
        assert!(a.selected);
        assert_eq!(a.position.x, 99.0);
    }

    #[test]
    fn test_merge_follows_incoming_order_and_membership() {
        let mut mirror = Mirror::new(GraphSnapshot::new(vec![node("a", 0.0), node("b", 0.0)], vec![]));
        mirror.apply_node_changes(&[NodeChange::Select { id: "a".into(), selected: true }]);

        let mut remote_a = node("a", 42.0);
        remote_a.selected = false;
        mirror.merge_preserving_selection(&GraphSnapshot::new(vec![node("c", 1.0), remote_a], vec![]));

        let ids: Vec<_> = mirror.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        let a = mirror.node("a").unwrap();
        assert!(a.selected);
        assert_eq!(a.position.x, 42.0);
        assert!(!mirror.node("c").unwrap().selected);
    }
}
