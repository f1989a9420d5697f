use axum::extract::{Path, State};
use axum::Json;
use canvas::document::{CanvasNode, NodeDisplayPatch, NodeGeometryPatch};
use canvas::MutationOutcome;
use serde::Deserialize;

use super::Caller;
use crate::server::app::AppState;
use crate::server::errors::ApiResult;

#[derive(Deserialize)]
pub struct AddNodesBody {
    pub nodes: Vec<CanvasNode>,
}

#[derive(Deserialize)]
pub struct GeometryBody {
    pub patches: Vec<NodeGeometryPatch>,
}

#[derive(Deserialize)]
pub struct DisplayBody {
    pub patches: Vec<NodeDisplayPatch>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveNodesBody {
    pub node_ids: Vec<String>,
}

pub async fn add_nodes(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(canvas_id): Path<String>,
    Json(body): Json<AddNodesBody>,
) -> ApiResult<Json<MutationOutcome>> {
    Ok(Json(
        state.context.add_nodes(&ctx, &canvas_id, body.nodes).await?,
    ))
}

pub async fn update_geometry(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(canvas_id): Path<String>,
    Json(body): Json<GeometryBody>,
) -> ApiResult<Json<MutationOutcome>> {
    Ok(Json(
        state
            .context
            .update_node_position_or_dimensions(&ctx, &canvas_id, body.patches)
            .await?,
    ))
}

pub async fn update_display(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(canvas_id): Path<String>,
    Json(body): Json<DisplayBody>,
) -> ApiResult<Json<MutationOutcome>> {
    Ok(Json(
        state
            .context
            .update_node_display_props(&ctx, &canvas_id, body.patches)
            .await?,
    ))
}

pub async fn remove_nodes(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(canvas_id): Path<String>,
    Json(body): Json<RemoveNodesBody>,
) -> ApiResult<Json<MutationOutcome>> {
    Ok(Json(
        state
            .context
            .remove_nodes(&ctx, &canvas_id, body.node_ids)
            .await?,
    ))
}
