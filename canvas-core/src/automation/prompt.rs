use serde_json::{json, Value};

use crate::document::NodeData;

/// Build the agent prompt from the node's own values and its input set.
pub fn build_prompt(node: &NodeData, inputs: &[NodeData]) -> String {
    let input_set: Vec<Value> = inputs
        .iter()
        .map(|input| {
            json!({
                "nodeDataId": input.id,
                "type": input.node_type,
                "values": input.values,
            })
        })
        .collect();

    let inputs_json = serde_json::to_string_pretty(&input_set).unwrap_or_else(|_| "[]".to_string());
    let values_json =
        serde_json::to_string_pretty(&node.values).unwrap_or_else(|_| "{}".to_string());

    format!(
        "You are updating a `{}` node.\n\n## Inputs\n```json\n{}\n```\n\n## Current values\n```json\n{}\n```\n",
        node.node_type, inputs_json, values_json
    )
}
