use canvas::document::{AgentConfig, AutomationMode, CanvasEdge, CanvasNode, NewNodeData, Position};
use canvas::services::RequestContext;
use serde_json::{json, Map, Value};

pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";

pub fn ctx(user: &str) -> RequestContext {
    RequestContext::for_user(user)
}

pub fn node(id: &str, node_data_id: &str) -> CanvasNode {
    CanvasNode::new(id, "textNote", Position::new(0.0, 0.0)).with_node_data(node_data_id)
}

/// A node without node data, e.g. a free-floating label.
pub fn bare_node(id: &str) -> CanvasNode {
    CanvasNode::new(id, "label", Position::new(0.0, 0.0))
}

pub fn edge(id: &str, source: &str, target: &str) -> CanvasEdge {
    CanvasEdge::new(id, source, target)
}

/// Edge whose downstream automation re-runs when the source changes.
pub fn triggering_edge(id: &str, source: &str, target: &str) -> CanvasEdge {
    let mut edge = CanvasEdge::new(id, source, target);
    edge.data = Some(json!({ "shouldTriggerUpdate": true }));
    edge
}

pub fn new_node_data(node_type: &str) -> NewNodeData {
    NewNodeData {
        node_type: node_type.to_string(),
        ..Default::default()
    }
}

pub fn agent_node_data(node_type: &str, touchable_fields: Option<&[&str]>) -> NewNodeData {
    NewNodeData {
        node_type: node_type.to_string(),
        values: Map::new(),
        automation_mode: AutomationMode::Agent,
        agent: Some(AgentConfig {
            model: "test-model".to_string(),
            instructions: "Summarise the inputs.".to_string(),
            touchable_fields: touchable_fields
                .map(|fields| fields.iter().map(|f| f.to_string()).collect()),
        }),
    }
}

pub fn values(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}
