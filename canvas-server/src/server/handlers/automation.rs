use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use canvas::automation::RunStatus;
use serde_json::{json, Value};

use super::Caller;
use crate::server::app::AppState;
use crate::server::errors::ApiResult;

/// Fire-and-forget trigger. The outcome is observable on the node data's
/// status or through the returned run id.
pub async fn trigger_automation(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(node_data_id): Path<String>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let run_id = state
        .context
        .trigger_automation(&ctx, &node_data_id)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "runId": run_id }))))
}

pub async fn run_status(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(run_id): Path<String>,
) -> ApiResult<Json<RunStatus>> {
    Ok(Json(state.context.automation_run_status(&ctx, &run_id)?))
}
