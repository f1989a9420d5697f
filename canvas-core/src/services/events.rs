use serde::Serialize;

use crate::document::{Canvas, NodeData};
use crate::utils::EventBroadcaster;

/// Change notification published after every committed store write.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum StoreEvent {
    CanvasChanged(Box<Canvas>),
    CanvasDeleted { canvas_id: String },
    NodeDataChanged(Box<NodeData>),
}

/// Per-record subscriptions for canvases and node data.
#[derive(Clone)]
pub struct StoreEvents {
    canvases: EventBroadcaster<String, StoreEvent>,
    node_data: EventBroadcaster<String, StoreEvent>,
}

impl StoreEvents {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            canvases: EventBroadcaster::new(buffer_size),
            node_data: EventBroadcaster::new(buffer_size),
        }
    }

    pub fn subscribe_canvas(&self, canvas_id: &str) -> tokio::sync::broadcast::Receiver<StoreEvent> {
        self.canvases.subscribe(canvas_id.to_string())
    }

    pub fn subscribe_node_data(
        &self,
        node_data_id: &str,
    ) -> tokio::sync::broadcast::Receiver<StoreEvent> {
        self.node_data.subscribe(node_data_id.to_string())
    }

    pub(crate) fn canvas_changed(&self, canvas: &Canvas) {
        self.canvases.publish(
            canvas.id.clone(),
            StoreEvent::CanvasChanged(Box::new(canvas.clone())),
        );
    }

    pub(crate) fn canvas_deleted(&self, canvas_id: &str) {
        self.canvases.publish(
            canvas_id.to_string(),
            StoreEvent::CanvasDeleted {
                canvas_id: canvas_id.to_string(),
            },
        );
        self.canvases.close(&canvas_id.to_string());
    }

    pub(crate) fn node_data_changed(&self, data: &NodeData) {
        self.node_data.publish(
            data.id.clone(),
            StoreEvent::NodeDataChanged(Box::new(data.clone())),
        );
    }

    /// Drop channels nobody listens to anymore.
    pub fn cleanup_idle(&self) {
        self.canvases.cleanup_idle();
        self.node_data.cleanup_idle();
    }
}
