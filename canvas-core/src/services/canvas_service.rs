use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::entities::canvases;
use crate::document::{Canvas, CanvasPatch, CanvasSummary, GraphIndex};
use crate::errors::{CoreError, CoreResult};
use crate::services::{ensure_creator, CallerId, StoreEvents};

/// Document store for canvases.
///
/// Reads and writes are gated on the canvas creator. Each successful write
/// increments `version`; conditional writes compare it before committing.
#[derive(Clone)]
pub struct CanvasService {
    db: DatabaseConnection,
    events: StoreEvents,
    retry_limit: usize,
}

impl CanvasService {
    pub fn new(db: DatabaseConnection, events: StoreEvents, retry_limit: usize) -> Self {
        Self {
            db,
            events,
            retry_limit: retry_limit.max(1),
        }
    }

    pub async fn create(&self, caller: &CallerId, name: &str) -> CoreResult<Canvas> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("Canvas name must not be empty"));
        }

        let now = Utc::now();
        let model = canvases::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            creator_id: Set(caller.as_str().to_string()),
            name: Set(name.to_string()),
            nodes_json: Set("[]".to_string()),
            edges_json: Set("[]".to_string()),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(|e| CoreError::database("Failed to create canvas", e))?;

        let canvas = Canvas::try_from(model)?;
        info!("Created canvas {} for {}", canvas.id, caller);
        Ok(canvas)
    }

    /// Load a canvas without the creator gate, for internal callers.
    pub async fn load(&self, canvas_id: &str) -> CoreResult<Canvas> {
        let model = canvases::Entity::find_by_id(canvas_id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| CoreError::database("Failed to load canvas", e))?
            .ok_or_else(|| CoreError::not_found("Canvas", canvas_id))?;
        Canvas::try_from(model)
    }

    pub async fn get(&self, caller: &CallerId, canvas_id: &str) -> CoreResult<Canvas> {
        let canvas = self.load(canvas_id).await?;
        ensure_creator(&canvas, caller)?;
        Ok(canvas)
    }

    /// Canvases created by the caller, most recently updated first.
    pub async fn list(&self, caller: &CallerId) -> CoreResult<Vec<CanvasSummary>> {
        let models = canvases::Entity::find()
            .filter(canvases::Column::CreatorId.eq(caller.as_str()))
            .order_by_desc(canvases::Column::UpdatedAt)
            .all(&self.db)
            .await
            .map_err(|e| CoreError::database("Failed to list canvases", e))?;

        Ok(models
            .into_iter()
            .map(|m| CanvasSummary {
                id: m.id,
                name: m.name,
            })
            .collect())
    }

    pub async fn delete(&self, caller: &CallerId, canvas_id: &str) -> CoreResult<String> {
        let canvas = self.get(caller, canvas_id).await?;
        canvases::Entity::delete_by_id(canvas.id.clone())
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::database("Failed to delete canvas", e))?;

        info!("Deleted canvas {}", canvas.id);
        self.events.canvas_deleted(&canvas.id);
        Ok(canvas.id)
    }

    /// Replace whole fields of a canvas.
    ///
    /// With `expected_version` the write only commits if the stored version
    /// still matches; without it the patch wins over concurrent writers.
    pub async fn patch(
        &self,
        caller: &CallerId,
        canvas_id: &str,
        patch: CanvasPatch,
        expected_version: Option<i64>,
    ) -> CoreResult<Canvas> {
        let mut canvas = self.get(caller, canvas_id).await?;
        if let Some(expected) = expected_version {
            if canvas.version != expected {
                return Err(version_conflict(&canvas, expected));
            }
        }
        if patch.is_empty() {
            return Ok(canvas);
        }

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CoreError::validation("Canvas name must not be empty"));
            }
            canvas.name = name;
        }
        if let Some(nodes) = patch.nodes {
            canvas.nodes = nodes;
        }
        if let Some(edges) = patch.edges {
            canvas.edges = edges;
        }

        let read_version = canvas.version;
        match self.commit(&mut canvas, expected_version.map(|_| read_version)).await? {
            true => Ok(canvas),
            false => Err(CoreError::conflict(format!(
                "Canvas {} changed after version {} was read",
                canvas.id, read_version
            ))),
        }
    }

    /// Element-level read-modify-write over the id-indexed graph.
    ///
    /// The edit runs against the latest stored graph and commits only if no
    /// other write landed in between; otherwise it is re-applied to a fresh
    /// read, up to the configured retry limit.
    ///
    /// With `expected_version` a stale read fails with `Conflict` instead of
    /// being retried.
    pub async fn edit_graph<F, R>(
        &self,
        caller: &CallerId,
        canvas_id: &str,
        expected_version: Option<i64>,
        edit: F,
    ) -> CoreResult<(Canvas, R)>
    where
        F: Fn(&mut GraphIndex) -> CoreResult<R>,
    {
        for attempt in 1..=self.retry_limit {
            let mut canvas = self.get(caller, canvas_id).await?;
            if let Some(expected) = expected_version {
                if canvas.version != expected {
                    return Err(version_conflict(&canvas, expected));
                }
            }
            let mut index = GraphIndex::new(
                std::mem::take(&mut canvas.nodes),
                std::mem::take(&mut canvas.edges),
            );
            let outcome = edit(&mut index)?;
            let graph = index.into_snapshot();
            canvas.nodes = graph.nodes;
            canvas.edges = graph.edges;

            let read_version = canvas.version;
            if self.commit(&mut canvas, Some(read_version)).await? {
                return Ok((canvas, outcome));
            }
            if expected_version.is_some() {
                return Err(CoreError::conflict(format!(
                    "Canvas {} changed after version {} was read",
                    canvas_id, read_version
                )));
            }
            warn!(
                "Canvas {} changed during edit (attempt {}/{}), retrying",
                canvas_id, attempt, self.retry_limit
            );
        }

        Err(CoreError::conflict(format!(
            "Canvas {} kept changing during edit; gave up after {} attempts",
            canvas_id, self.retry_limit
        )))
    }

    /// Persist `canvas` with a bumped version. Returns false when the stored
    /// version no longer matches `expected`.
    async fn commit(&self, canvas: &mut Canvas, expected: Option<i64>) -> CoreResult<bool> {
        let now = Utc::now();
        let nodes_json = serde_json::to_string(&canvas.nodes)?;
        let edges_json = serde_json::to_string(&canvas.edges)?;

        let mut update = canvases::Entity::update_many()
            .col_expr(canvases::Column::Name, Expr::value(canvas.name.clone()))
            .col_expr(canvases::Column::NodesJson, Expr::value(nodes_json))
            .col_expr(canvases::Column::EdgesJson, Expr::value(edges_json))
            .col_expr(canvases::Column::UpdatedAt, Expr::value(now))
            .filter(canvases::Column::Id.eq(canvas.id.as_str()));

        update = match expected {
            Some(version) => update
                .col_expr(canvases::Column::Version, Expr::value(version + 1))
                .filter(canvases::Column::Version.eq(version)),
            None => update.col_expr(
                canvases::Column::Version,
                Expr::col(canvases::Column::Version).add(1),
            ),
        };

        let result = update
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::database("Failed to update canvas", e))?;

        if result.rows_affected == 0 {
            if expected.is_none() {
                return Err(CoreError::not_found("Canvas", &canvas.id));
            }
            debug!("Canvas {} version moved past {:?}", canvas.id, expected);
            return Ok(false);
        }

        canvas.version = match expected {
            Some(version) => version + 1,
            None => self.load(&canvas.id).await?.version,
        };
        canvas.updated_at = now;
        self.events.canvas_changed(canvas);
        Ok(true)
    }
}

fn version_conflict(canvas: &Canvas, expected: i64) -> CoreError {
    CoreError::conflict(format!(
        "Canvas {} is at version {}, expected {}",
        canvas.id, canvas.version, expected
    ))
}
