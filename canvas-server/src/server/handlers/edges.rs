use axum::extract::{Path, State};
use axum::Json;
use canvas::document::{CanvasEdge, EdgeDataUpdate};
use canvas::MutationOutcome;
use serde::Deserialize;

use super::Caller;
use crate::server::app::AppState;
use crate::server::errors::ApiResult;

#[derive(Deserialize)]
pub struct AddEdgesBody {
    pub edges: Vec<CanvasEdge>,
}

#[derive(Deserialize)]
pub struct EdgeDataBody {
    pub updates: Vec<EdgeDataUpdate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveEdgesBody {
    pub edge_ids: Vec<String>,
}

pub async fn add_edges(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(canvas_id): Path<String>,
    Json(body): Json<AddEdgesBody>,
) -> ApiResult<Json<MutationOutcome>> {
    Ok(Json(
        state.context.add_edges(&ctx, &canvas_id, body.edges).await?,
    ))
}

pub async fn update_edge_data(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(canvas_id): Path<String>,
    Json(body): Json<EdgeDataBody>,
) -> ApiResult<Json<MutationOutcome>> {
    Ok(Json(
        state
            .context
            .update_edge_data(&ctx, &canvas_id, body.updates)
            .await?,
    ))
}

pub async fn remove_edges(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(canvas_id): Path<String>,
    Json(body): Json<RemoveEdgesBody>,
) -> ApiResult<Json<MutationOutcome>> {
    Ok(Json(
        state
            .context
            .remove_edges(&ctx, &canvas_id, body.edge_ids)
            .await?,
    ))
}
