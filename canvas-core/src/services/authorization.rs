use std::fmt;

use crate::document::Canvas;
use crate::errors::{CoreError, CoreResult};

/// Identity of an authenticated caller, as resolved by an [`AuthProvider`].
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CallerId(String);

impl CallerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-request credentials handed to the auth provider.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub user_id: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }
}

/// Resolves the caller identity for a request.
///
/// Identity management itself lives outside this crate; implementations only
/// map request credentials to a [`CallerId`] or reject the request.
pub trait AuthProvider: Send + Sync {
    fn require_auth(&self, ctx: &RequestContext) -> CoreResult<CallerId>;
}

/// Trusts the user id carried on the request.
#[derive(Clone, Debug, Default)]
pub struct HeaderAuthProvider;

impl AuthProvider for HeaderAuthProvider {
    fn require_auth(&self, ctx: &RequestContext) -> CoreResult<CallerId> {
        match ctx.user_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(CallerId::new(id)),
            _ => Err(CoreError::unauthorized("Authentication required")),
        }
    }
}

/// Creator-only gate applied by every canvas read and write.
pub fn ensure_creator(canvas: &Canvas, caller: &CallerId) -> CoreResult<()> {
    if canvas.creator_id != caller.as_str() {
        return Err(CoreError::unauthorized(format!(
            "Only the creator can access canvas {}",
            canvas.id
        )));
    }
    Ok(())
}
