pub mod automation;
pub mod canvases;
pub mod edges;
pub mod health;
pub mod node_data;
pub mod nodes;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use canvas::services::RequestContext;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Request identity taken from the `x-user-id` header. A missing header
/// yields an anonymous context; the auth provider decides what that means.
pub struct Caller(pub RequestContext);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        Ok(Caller(RequestContext { user_id }))
    }
}
