use serde::{Deserialize, Serialize};

use crate::document::{CanvasEdge, CanvasNode, Position};

/// A single change reported by the canvas view for a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeChange {
    Position {
        id: String,
        #[serde(default)]
        position: Option<Position>,
        /// `Some(true)` while a drag is in progress, `Some(false)` when it ends
        #[serde(default)]
        dragging: Option<bool>,
    },
    Dimensions {
        id: String,
        #[serde(default)]
        width: Option<f64>,
        #[serde(default)]
        height: Option<f64>,
        #[serde(default)]
        resizing: Option<bool>,
    },
    Select {
        id: String,
        selected: bool,
    },
    Remove {
        id: String,
    },
    Add {
        node: CanvasNode,
    },
    Replace {
        id: String,
        node: CanvasNode,
    },
}

impl NodeChange {
    pub fn id(&self) -> &str {
        match self {
            NodeChange::Position { id, .. }
            | NodeChange::Dimensions { id, .. }
            | NodeChange::Select { id, .. }
            | NodeChange::Remove { id }
            | NodeChange::Replace { id, .. } => id,
            NodeChange::Add { node } => &node.id,
        }
    }

    pub fn is_selection(&self) -> bool {
        matches!(self, NodeChange::Select { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EdgeChange {
    Select { id: String, selected: bool },
    Remove { id: String },
    Add { edge: CanvasEdge },
    Replace { id: String, edge: CanvasEdge },
}

impl EdgeChange {
    pub fn is_selection(&self) -> bool {
        matches!(self, EdgeChange::Select { .. })
    }
}

/// True when a batch only moves selection and must not be persisted or recorded.
pub fn selection_only<'a, I, T>(changes: I, is_selection: fn(&T) -> bool) -> bool
where
    I: IntoIterator<Item = &'a T>,
    T: 'a,
{
    changes.into_iter().all(is_selection)
}
