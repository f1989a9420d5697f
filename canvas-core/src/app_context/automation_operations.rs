use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::AppContext;
use crate::automation::RunStatus;
use crate::document::{AutomationMode, DependencyKind, NewNodeData, NodeData};
use crate::errors::{CoreError, CoreResult};
use crate::services::RequestContext;

impl AppContext {
    // ----- Node data -----------------------------------------------------------
    pub async fn create_node_data(
        &self,
        ctx: &RequestContext,
        input: NewNodeData,
    ) -> CoreResult<NodeData> {
        self.caller(ctx)?;
        self.node_data_service.create(input).await
    }

    pub async fn get_node_data(&self, ctx: &RequestContext, node_data_id: &str) -> CoreResult<NodeData> {
        self.caller(ctx)?;
        self.node_data_service.get(node_data_id).await
    }

    /// Merge values into a record, then trigger downstream automations whose
    /// input link from this record asks for it.
    pub async fn update_node_data_values(
        &self,
        ctx: &RequestContext,
        node_data_id: &str,
        values: Map<String, Value>,
    ) -> CoreResult<NodeData> {
        self.caller(ctx)?;
        let updated = self
            .node_data_service
            .update_values(node_data_id, values)
            .await?;

        for dependency in updated.dependencies_of(DependencyKind::Output) {
            let Some(downstream) = self.node_data_service.find(&dependency.node_data_id).await?
            else {
                warn!(
                    "Downstream node data {} of {} no longer exists",
                    dependency.node_data_id, updated.id
                );
                continue;
            };
            if wants_upstream_trigger(&downstream, &updated.id) {
                let run_id = self.automation_service.trigger(&downstream.id);
                info!(
                    "Update of {} triggered automation run {} on {}",
                    updated.id, run_id, downstream.id
                );
            }
        }

        Ok(updated)
    }

    // ----- Automation ----------------------------------------------------------
    /// Start an automation run and return its correlation id.
    ///
    /// Authentication and existence are checked here; everything after that
    /// runs in the background and only surfaces through the record's status.
    pub async fn trigger_automation(
        &self,
        ctx: &RequestContext,
        node_data_id: &str,
    ) -> CoreResult<String> {
        self.caller(ctx)?;
        if self.node_data_service.find(node_data_id).await?.is_none() {
            return Err(CoreError::not_found("NodeData", node_data_id));
        }
        let run_id = self.automation_service.trigger(node_data_id);
        debug!("Automation for {} accepted as run {}", node_data_id, run_id);
        Ok(run_id)
    }

    pub fn automation_run_status(&self, ctx: &RequestContext, run_id: &str) -> CoreResult<RunStatus> {
        self.caller(ctx)?;
        self.automation_service
            .run_status(run_id)
            .ok_or_else(|| CoreError::not_found("AutomationRun", run_id))
    }
}

fn wants_upstream_trigger(downstream: &NodeData, upstream_id: &str) -> bool {
    downstream.automation_mode != AutomationMode::Off
        && downstream.is_on_canvas()
        && downstream
            .dependencies_of(DependencyKind::Input)
            .any(|d| d.node_data_id == upstream_id && d.should_trigger_update == Some(true))
}
