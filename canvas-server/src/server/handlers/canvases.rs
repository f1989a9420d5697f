use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use canvas::document::{Canvas, CanvasNode, CanvasEdge, CanvasPatch, CanvasSummary, GraphSnapshot};
use canvas::MutationOutcome;
use serde::Deserialize;
use serde_json::{json, Value};

use super::Caller;
use crate::server::app::AppState;
use crate::server::errors::ApiResult;

#[derive(Deserialize)]
pub struct CreateCanvasBody {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchCanvasBody {
    #[serde(flatten)]
    pub patch: CanvasPatch,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveGraphBody {
    pub nodes: Vec<CanvasNode>,
    pub edges: Vec<CanvasEdge>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

pub async fn list_canvases(
    State(state): State<AppState>,
    Caller(ctx): Caller,
) -> ApiResult<Json<Vec<CanvasSummary>>> {
    Ok(Json(state.context.list_user_canvases(&ctx).await?))
}

pub async fn create_canvas(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Json(body): Json<CreateCanvasBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let id = state.context.create_canvas(&ctx, &body.name).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn get_canvas(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(canvas_id): Path<String>,
) -> ApiResult<Json<Canvas>> {
    Ok(Json(state.context.get_canvas(&ctx, &canvas_id).await?))
}

pub async fn delete_canvas(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(canvas_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = state.context.delete_canvas(&ctx, &canvas_id).await?;
    Ok(Json(json!({ "id": id })))
}

pub async fn patch_canvas(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(canvas_id): Path<String>,
    Json(body): Json<PatchCanvasBody>,
) -> ApiResult<Json<Canvas>> {
    let canvas = state
        .context
        .patch_canvas(&ctx, &canvas_id, body.patch, body.expected_version)
        .await?;
    Ok(Json(canvas))
}

pub async fn save_graph(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(canvas_id): Path<String>,
    Json(body): Json<SaveGraphBody>,
) -> ApiResult<Json<MutationOutcome>> {
    let outcome = state
        .context
        .save_canvas_graph(
            &ctx,
            &canvas_id,
            GraphSnapshot::new(body.nodes, body.edges),
            body.expected_version,
        )
        .await?;
    Ok(Json(outcome))
}
