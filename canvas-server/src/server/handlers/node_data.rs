use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use canvas::document::{NewNodeData, NodeData};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::Caller;
use crate::server::app::AppState;
use crate::server::errors::ApiResult;

#[derive(Deserialize)]
pub struct UpdateValuesBody {
    pub values: Map<String, Value>,
}

pub async fn create_node_data(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Json(body): Json<NewNodeData>,
) -> ApiResult<(StatusCode, Json<NodeData>)> {
    let data = state.context.create_node_data(&ctx, body).await?;
    Ok((StatusCode::CREATED, Json(data)))
}

pub async fn get_node_data(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(node_data_id): Path<String>,
) -> ApiResult<Json<NodeData>> {
    Ok(Json(state.context.get_node_data(&ctx, &node_data_id).await?))
}

pub async fn update_values(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(node_data_id): Path<String>,
    Json(body): Json<UpdateValuesBody>,
) -> ApiResult<Json<NodeData>> {
    Ok(Json(
        state
            .context
            .update_node_data_values(&ctx, &node_data_id, body.values)
            .await?,
    ))
}
