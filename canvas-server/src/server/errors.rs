use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use canvas::errors::{CoreError, CoreErrorKind};
use serde_json::json;
use tracing::error;

/// `CoreError` rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

pub fn status_for(kind: CoreErrorKind) -> StatusCode {
    match kind {
        CoreErrorKind::NotFound => StatusCode::NOT_FOUND,
        CoreErrorKind::Validation => StatusCode::BAD_REQUEST,
        CoreErrorKind::Conflict => StatusCode::CONFLICT,
        CoreErrorKind::Forbidden => StatusCode::FORBIDDEN,
        CoreErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        CoreErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        CoreErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        if kind == CoreErrorKind::Internal {
            error!("Request failed: {}", self.0);
        }

        let mut body = json!({
            "error": kind.as_str(),
            "message": self.0.message(),
        });
        if let Some(fields) = self.0.fields() {
            body["fields"] = json!(fields);
        }
        (status_for(kind), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
