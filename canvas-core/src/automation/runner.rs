use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::automation::ProgressReporter;
use crate::errors::{AutomationError, AutomationResult};
use crate::services::NodeDataService;

/// Context handed to tools invoked by an agent.
#[derive(Clone)]
pub struct ToolContext {
    /// Node data the run belongs to; `None` for interactive sessions
    pub node_data_id: Option<String>,
    pub store: NodeDataService,
    pub progress: ProgressReporter,
}

impl ToolContext {
    pub fn for_run(store: NodeDataService, node_data_id: &str, progress: ProgressReporter) -> Self {
        Self {
            node_data_id: Some(node_data_id.to_string()),
            store,
            progress,
        }
    }

    pub fn interactive(store: NodeDataService) -> Self {
        Self {
            node_data_id: None,
            store,
            progress: ProgressReporter::disabled(),
        }
    }
}

/// A capability exposed to the agent runtime.
#[async_trait]
pub trait AutomationTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the tool arguments
    fn parameters(&self) -> Value;

    async fn call(&self, ctx: &ToolContext, arguments: Value) -> AutomationResult<Value>;
}

/// Everything an agent runtime needs for one run.
pub struct AgentRequest {
    pub model: Option<String>,
    pub instructions: String,
    pub input_schema: Value,
    pub prompt: String,
    pub tools: Vec<Arc<dyn AutomationTool>>,
    pub context: ToolContext,
}

impl AgentRequest {
    pub fn tool(&self, name: &str) -> Option<&Arc<dyn AutomationTool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Invoke a tool by name within this request's context.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> AutomationResult<ToolCall> {
        let tool = self
            .tool(name)
            .ok_or_else(|| AutomationError::tool(name, "unknown tool"))?;
        let output = tool.call(&self.context, arguments.clone()).await?;
        Ok(ToolCall {
            name: name.to_string(),
            arguments,
            output: Some(output),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

/// Result of an agent run: final text plus the tool calls it made.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutcome {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Opaque agent runtime.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, request: AgentRequest) -> AutomationResult<AgentOutcome>;
}

/// Runner used when no agent runtime is configured; every run fails.
#[derive(Clone, Debug, Default)]
pub struct UnconfiguredRunner;

#[async_trait]
impl AgentRunner for UnconfiguredRunner {
    async fn run(&self, _request: AgentRequest) -> AutomationResult<AgentOutcome> {
        Err(AutomationError::Runner(
            "no agent runtime is configured".to_string(),
        ))
    }
}
