use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::document::{AutomationMode, NodeData, NodeDataStatus};
use crate::errors::CoreError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "node_data")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub node_type: String,
    pub values_json: String,
    pub status: String,
    pub automation_mode: String,
    pub agent_json: Option<String>,
    pub dependencies_json: String,
    pub automation_progress_json: Option<String>,
    pub automation_run_id: Option<String>,
    pub updated_at: ChronoDateTimeUtc,
    pub removed_from_canvas_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for NodeData {
    type Error = CoreError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let status = NodeDataStatus::parse(&model.status).ok_or_else(|| {
            CoreError::internal(format!(
                "Unknown status '{}' on node data {}",
                model.status, model.id
            ))
        })?;
        let automation_mode = AutomationMode::parse(&model.automation_mode).ok_or_else(|| {
            CoreError::internal(format!(
                "Unknown automation mode '{}' on node data {}",
                model.automation_mode, model.id
            ))
        })?;

        Ok(NodeData {
            values: serde_json::from_str(&model.values_json)?,
            agent: model
                .agent_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            dependencies: serde_json::from_str(&model.dependencies_json)?,
            automation_progress: model
                .automation_progress_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            id: model.id,
            node_type: model.node_type,
            status,
            automation_mode,
            automation_run_id: model.automation_run_id,
            updated_at: model.updated_at,
            removed_from_canvas_at: model.removed_from_canvas_at,
        })
    }
}

impl TryFrom<&NodeData> for Model {
    type Error = CoreError;

    fn try_from(data: &NodeData) -> Result<Self, Self::Error> {
        Ok(Model {
            id: data.id.clone(),
            node_type: data.node_type.clone(),
            values_json: serde_json::to_string(&data.values)?,
            status: data.status.as_str().to_string(),
            automation_mode: data.automation_mode.as_str().to_string(),
            agent_json: data.agent.as_ref().map(serde_json::to_string).transpose()?,
            dependencies_json: serde_json::to_string(&data.dependencies)?,
            automation_progress_json: data
                .automation_progress
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            automation_run_id: data.automation_run_id.clone(),
            updated_at: data.updated_at,
            removed_from_canvas_at: data.removed_from_canvas_at,
        })
    }
}
