use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::automation::{AutomationTool, ToolContext};
use crate::errors::{AutomationError, AutomationResult};

pub const UPDATE_NODE_FIELDS: &str = "update_node_fields";

#[derive(Debug, Deserialize)]
struct UpdateFieldsArgs {
    #[serde(rename = "nodeDataId")]
    node_data_id: Option<String>,
    fields: Map<String, Value>,
}

/// Writes field values onto a node data record.
///
/// Within an automation run the target defaults to the run's node data and
/// writes are limited to the agent's touchable fields.
#[derive(Clone, Debug, Default)]
pub struct UpdateNodeFieldsTool;

#[async_trait]
impl AutomationTool for UpdateNodeFieldsTool {
    fn name(&self) -> &str {
        UPDATE_NODE_FIELDS
    }

    fn description(&self) -> &str {
        "Set one or more field values on a node"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "nodeDataId": { "type": "string" },
                "fields": { "type": "object" }
            },
            "required": ["fields"]
        })
    }

    async fn call(&self, ctx: &ToolContext, arguments: Value) -> AutomationResult<Value> {
        let args: UpdateFieldsArgs = serde_json::from_value(arguments)
            .map_err(|e| AutomationError::tool(UPDATE_NODE_FIELDS, e.to_string()))?;
        let target = args
            .node_data_id
            .or_else(|| ctx.node_data_id.clone())
            .ok_or_else(|| AutomationError::tool(UPDATE_NODE_FIELDS, "no target node data"))?;

        let record = ctx.store.get(&target).await?;
        let mut allowed = Map::new();
        let mut ignored = Vec::new();
        for (key, value) in args.fields {
            match &record.agent {
                Some(agent) if !agent.may_touch(&key) => ignored.push(key),
                _ => {
                    allowed.insert(key, value);
                }
            }
        }
        if !ignored.is_empty() {
            warn!("Ignoring untouchable fields {:?} on node data {}", ignored, target);
        }

        let updated: Vec<String> = allowed.keys().cloned().collect();
        ctx.progress
            .report("updating_fields", Some(json!({ "fields": updated })))
            .await;
        ctx.store.update_values(&target, allowed).await?;

        Ok(json!({ "updated": updated, "ignored": ignored }))
    }
}
