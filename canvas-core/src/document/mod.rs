pub mod edge;
pub mod graph_index;
pub mod node;
pub mod node_data;
pub mod position;

pub use edge::*;
pub use graph_index::*;
pub use node::*;
pub use node_data::*;
pub use position::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted canvas aggregate, owned by its creator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Canvas {
    pub id: String,
    pub creator_id: String,
    pub name: String,
    pub nodes: Vec<CanvasNode>,
    pub edges: Vec<CanvasEdge>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Canvas {
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    pub fn node(&self, node_id: &str) -> Option<&CanvasNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasSummary {
    pub id: String,
    pub name: String,
}

/// The `{nodes, edges}` pair shared by history, persistence and reconciliation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<CanvasNode>,
    pub edges: Vec<CanvasEdge>,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<CanvasNode>, edges: Vec<CanvasEdge>) -> Self {
        Self { nodes, edges }
    }

    /// Copy with every `selected` flag cleared, for structural comparison.
    pub fn without_selection(&self) -> Self {
        let mut copy = self.clone();
        copy.nodes.iter_mut().for_each(|n| n.selected = false);
        copy.edges.iter_mut().for_each(|e| e.selected = false);
        copy
    }

    pub fn structurally_eq(&self, other: &GraphSnapshot) -> bool {
        self.without_selection() == other.without_selection()
    }
}

/// Partial whole-field replacement accepted by the document store's `patch`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Option<Vec<CanvasNode>>,
    #[serde(default)]
    pub edges: Option<Vec<CanvasEdge>>,
}

impl CanvasPatch {
    pub fn graph(snapshot: GraphSnapshot) -> Self {
        Self {
            name: None,
            nodes: Some(snapshot.nodes),
            edges: Some(snapshot.edges),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.nodes.is_none() && self.edges.is_none()
    }
}
