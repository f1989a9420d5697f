use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::entities::node_data;
use crate::document::{AutomationProgress, NewNodeData, NodeData, NodeDataStatus};
use crate::errors::{CoreError, CoreResult};
use crate::services::StoreEvents;

/// Storage for automatable node data records.
///
/// Every mutation is a single-record read-modify-write. There is no
/// cross-record transaction; callers that touch several records accept that
/// a failure part way leaves earlier writes in place.
#[derive(Clone)]
pub struct NodeDataService {
    db: DatabaseConnection,
    events: StoreEvents,
}

impl NodeDataService {
    pub fn new(db: DatabaseConnection, events: StoreEvents) -> Self {
        Self { db, events }
    }

    pub async fn create(&self, input: NewNodeData) -> CoreResult<NodeData> {
        if input.node_type.trim().is_empty() {
            return Err(CoreError::validation("Node data type must not be empty"));
        }

        let data = NodeData {
            id: Uuid::new_v4().to_string(),
            node_type: input.node_type,
            values: input.values,
            status: NodeDataStatus::Idle,
            automation_mode: input.automation_mode,
            agent: input.agent,
            dependencies: Vec::new(),
            automation_progress: None,
            automation_run_id: None,
            updated_at: Utc::now(),
            removed_from_canvas_at: None,
        };

        active_model(&data)?
            .insert(&self.db)
            .await
            .map_err(|e| CoreError::database("Failed to create node data", e))?;

        debug!("Created node data {} of type {}", data.id, data.node_type);
        self.events.node_data_changed(&data);
        Ok(data)
    }

    pub async fn find(&self, id: &str) -> CoreResult<Option<NodeData>> {
        node_data::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| CoreError::database("Failed to load node data", e))?
            .map(NodeData::try_from)
            .transpose()
    }

    pub async fn get(&self, id: &str) -> CoreResult<NodeData> {
        self.find(id)
            .await?
            .ok_or_else(|| CoreError::not_found("NodeData", id))
    }

    /// Load every existing record among `ids`; unknown ids are skipped.
    pub async fn get_many(&self, ids: &[String]) -> CoreResult<Vec<NodeData>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = node_data::Entity::find()
            .filter(node_data::Column::Id.is_in(ids.iter().cloned()))
            .all(&self.db)
            .await
            .map_err(|e| CoreError::database("Failed to load node data", e))?;

        let mut records = models
            .into_iter()
            .map(NodeData::try_from)
            .collect::<CoreResult<Vec<_>>>()?;
        records.sort_by_key(|r| ids.iter().position(|id| *id == r.id));
        Ok(records)
    }

    /// Read, mutate and write one record.
    ///
    /// `mutate` returns whether it changed anything; unchanged records are not
    /// written and keep their `updated_at`.
    pub async fn modify<F>(&self, id: &str, mutate: F) -> CoreResult<(NodeData, bool)>
    where
        F: FnOnce(&mut NodeData) -> bool,
    {
        let mut data = self.get(id).await?;
        if !mutate(&mut data) {
            return Ok((data, false));
        }
        data.updated_at = Utc::now();
        self.write(&data).await?;
        Ok((data, true))
    }

    /// Merge `values` into the record's value map.
    pub async fn update_values(&self, id: &str, values: Map<String, Value>) -> CoreResult<NodeData> {
        let (data, _) = self
            .modify(id, |data| {
                let mut changed = false;
                for (key, value) in values {
                    if data.values.get(&key) != Some(&value) {
                        data.values.insert(key, value);
                        changed = true;
                    }
                }
                changed
            })
            .await?;
        Ok(data)
    }

    /// Mark the record as working under `run_id`.
    pub async fn begin_run(&self, id: &str, run_id: &str) -> CoreResult<NodeData> {
        let (data, _) = self
            .modify(id, |data| {
                data.status = NodeDataStatus::Working;
                data.automation_run_id = Some(run_id.to_string());
                true
            })
            .await?;
        Ok(data)
    }

    /// Settle a run. The write always happens; an unexpected prior status is
    /// logged since it means another run already settled this record.
    pub async fn settle_run(
        &self,
        id: &str,
        run_id: &str,
        status: NodeDataStatus,
    ) -> CoreResult<NodeData> {
        let (data, _) = self
            .modify(id, |data| {
                if !data.status.can_transition_to(status) {
                    warn!(
                        "Run {} settling node data {} as {} from {}",
                        run_id,
                        data.id,
                        status.as_str(),
                        data.status.as_str()
                    );
                }
                if data.automation_run_id.as_deref() != Some(run_id) {
                    warn!(
                        "Run {} settling node data {} last started by {:?}",
                        run_id, data.id, data.automation_run_id
                    );
                }
                data.status = status;
                true
            })
            .await?;
        Ok(data)
    }

    pub async fn set_progress(&self, id: &str, progress: AutomationProgress) -> CoreResult<()> {
        self.modify(id, |data| {
            data.automation_progress = Some(progress);
            true
        })
        .await?;
        Ok(())
    }

    /// Soft-mark records whose nodes left the canvas, or clear the mark with `None`.
    pub async fn mark_removed(&self, ids: &[String], at: Option<DateTime<Utc>>) -> CoreResult<usize> {
        let mut touched = 0;
        for id in ids {
            match self
                .modify(id, |data| {
                    if data.removed_from_canvas_at.is_some() == at.is_some() {
                        return false;
                    }
                    data.removed_from_canvas_at = at;
                    true
                })
                .await
            {
                Ok((_, true)) => touched += 1,
                Ok((_, false)) => {}
                Err(err) if err.is_not_found() => {
                    warn!("Node data {} missing while updating canvas membership", id);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(touched)
    }

    async fn write(&self, data: &NodeData) -> CoreResult<()> {
        active_model(data)?
            .update(&self.db)
            .await
            .map_err(|e| match e {
                sea_orm::DbErr::RecordNotUpdated => CoreError::not_found("NodeData", &data.id),
                other => CoreError::database("Failed to update node data", other),
            })?;

        self.events.node_data_changed(data);
        Ok(())
    }
}

fn active_model(data: &NodeData) -> CoreResult<node_data::ActiveModel> {
    let model = node_data::Model::try_from(data)?;
    Ok(node_data::ActiveModel {
        id: Set(model.id),
        node_type: Set(model.node_type),
        values_json: Set(model.values_json),
        status: Set(model.status),
        automation_mode: Set(model.automation_mode),
        agent_json: Set(model.agent_json),
        dependencies_json: Set(model.dependencies_json),
        automation_progress_json: Set(model.automation_progress_json),
        automation_run_id: Set(model.automation_run_id),
        updated_at: Set(model.updated_at),
        removed_from_canvas_at: Set(model.removed_from_canvas_at),
    })
}
