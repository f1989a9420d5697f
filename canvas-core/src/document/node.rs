use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::position::Position;

/// A visual node on the canvas.
///
/// `id` is the graph-local identifier used by edges; it is unrelated to any
/// storage id. `node_data_id` links the node to an automatable [`NodeData`]
/// record when the node carries one.
///
/// [`NodeData`]: super::NodeData
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_data_id: Option<String>,
    pub position: Position,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// UI-local selection state. Accepted from clients but never stored.
    #[serde(default, skip_serializing)]
    pub selected: bool,
}

impl CanvasNode {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            node_data_id: None,
            position,
            width: DEFAULT_NODE_WIDTH,
            height: DEFAULT_NODE_HEIGHT,
            locked: None,
            hidden: None,
            z_index: None,
            color: None,
            parent_id: None,
            extent: None,
            data: None,
            selected: false,
        }
    }

    pub fn with_node_data(mut self, node_data_id: impl Into<String>) -> Self {
        self.node_data_id = Some(node_data_id.into());
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

pub const DEFAULT_NODE_WIDTH: f64 = 320.0;
pub const DEFAULT_NODE_HEIGHT: f64 = 200.0;

/// Geometry patch for `update_node_position_or_dimensions`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGeometryPatch {
    pub id: String,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

impl NodeGeometryPatch {
    pub fn apply(&self, node: &mut CanvasNode) {
        if let Some(position) = self.position {
            node.position = position;
        }
        if let Some(width) = self.width {
            node.width = width;
        }
        if let Some(height) = self.height {
            node.height = height;
        }
    }
}

/// Display patch for `update_node_display_props`.
///
/// Outer `None` leaves the field untouched; `Some(None)` clears it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDisplayPatch {
    pub id: String,
    #[serde(default, with = "double_option")]
    pub locked: Option<Option<bool>>,
    #[serde(default, with = "double_option")]
    pub hidden: Option<Option<bool>>,
    #[serde(default, with = "double_option")]
    pub z_index: Option<Option<i32>>,
    #[serde(default, with = "double_option")]
    pub color: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub data: Option<Option<Value>>,
}

impl NodeDisplayPatch {
    pub fn apply(&self, node: &mut CanvasNode) {
        if let Some(locked) = &self.locked {
            node.locked = *locked;
        }
        if let Some(hidden) = &self.hidden {
            node.hidden = *hidden;
        }
        if let Some(z_index) = &self.z_index {
            node.z_index = *z_index;
        }
        if let Some(color) = &self.color {
            node.color = color.clone();
        }
        if let Some(data) = &self.data {
            node.data = data.clone();
        }
    }
}

// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
