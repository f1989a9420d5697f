use indexmap::IndexMap;

use super::{CanvasEdge, CanvasNode, GraphSnapshot};

/// Id-indexed view of a canvas graph for element-level edits.
///
/// Insertion order is kept so converting back to arrays is stable. Duplicate
/// ids in the input collapse to the last occurrence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphIndex {
    pub nodes: IndexMap<String, CanvasNode>,
    pub edges: IndexMap<String, CanvasEdge>,
}

impl GraphIndex {
    pub fn new(nodes: Vec<CanvasNode>, edges: Vec<CanvasEdge>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
            edges: edges.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        Self::new(snapshot.nodes, snapshot.edges)
    }

    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }

    pub fn into_snapshot(self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.into_values().collect(),
            edges: self.edges.into_values().collect(),
        }
    }

    /// Insert or replace nodes by id.
    pub fn upsert_nodes(&mut self, nodes: impl IntoIterator<Item = CanvasNode>) {
        for node in nodes {
            self.nodes.insert(node.id.clone(), node);
        }
    }

    /// Apply `f` to the node with `id`; returns false when the node is absent.
    pub fn patch_node<F>(&mut self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut CanvasNode),
    {
        match self.nodes.get_mut(id) {
            Some(node) => {
                f(node);
                true
            }
            None => false,
        }
    }

    /// Remove nodes and every edge attached to them.
    pub fn remove_nodes(&mut self, ids: &[String]) -> (Vec<CanvasNode>, Vec<CanvasEdge>) {
        let removed_nodes: Vec<CanvasNode> = ids
            .iter()
            .filter_map(|id| self.nodes.shift_remove(id))
            .collect();

        let attached: Vec<String> = self
            .edges
            .values()
            .filter(|e| removed_nodes.iter().any(|n| e.touches(&n.id)))
            .map(|e| e.id.clone())
            .collect();
        let removed_edges = self.remove_edges(&attached);

        (removed_nodes, removed_edges)
    }

    /// Insert or replace edges by id; returns the previous edge for replaced ids.
    pub fn upsert_edges(
        &mut self,
        edges: impl IntoIterator<Item = CanvasEdge>,
    ) -> Vec<(CanvasEdge, Option<CanvasEdge>)> {
        edges
            .into_iter()
            .map(|edge| {
                let previous = self.edges.insert(edge.id.clone(), edge.clone());
                (edge, previous)
            })
            .collect()
    }

    pub fn patch_edge<F>(&mut self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut CanvasEdge),
    {
        match self.edges.get_mut(id) {
            Some(edge) => {
                f(edge);
                true
            }
            None => false,
        }
    }

    pub fn remove_edges(&mut self, ids: &[String]) -> Vec<CanvasEdge> {
        ids.iter()
            .filter_map(|id| self.edges.shift_remove(id))
            .collect()
    }

    pub fn node_data_id(&self, node_id: &str) -> Option<&str> {
        self.nodes
            .get(node_id)
            .and_then(|n| n.node_data_id.as_deref())
    }
}

/// Edge-level difference between two graph versions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeDiff {
    /// New edges and edges whose endpoints changed
    pub added: Vec<CanvasEdge>,
    /// Deleted edges and the old version of edges whose endpoints changed
    pub removed: Vec<CanvasEdge>,
}

impl EdgeDiff {
    pub fn between(before: &[CanvasEdge], after: &[CanvasEdge]) -> Self {
        let old: IndexMap<&str, &CanvasEdge> = before.iter().map(|e| (e.id.as_str(), e)).collect();
        let new: IndexMap<&str, &CanvasEdge> = after.iter().map(|e| (e.id.as_str(), e)).collect();

        let mut diff = EdgeDiff::default();
        for (id, edge) in &new {
            match old.get(id) {
                None => diff.added.push((*edge).clone()),
                Some(previous) if !previous.same_endpoints(edge) => {
                    diff.removed.push((*previous).clone());
                    diff.added.push((*edge).clone());
                }
                Some(_) => {}
            }
        }
        for (id, edge) in &old {
            if !new.contains_key(id) {
                diff.removed.push((*edge).clone());
            }
        }
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
