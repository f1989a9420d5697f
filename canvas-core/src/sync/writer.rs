use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::scheduler::CanvasWriter;
use super::session::CanvasSession;
use crate::app_context::AppContext;
use crate::document::GraphSnapshot;
use crate::errors::CoreResult;
use crate::services::{RequestContext, StoreEvent};

/// Saves session snapshots through `AppContext::save_canvas_graph` as the
/// session's user.
#[derive(Clone)]
pub struct ContextWriter {
    app: AppContext,
    ctx: RequestContext,
}

impl ContextWriter {
    pub fn new(app: AppContext, ctx: RequestContext) -> Self {
        Self { app, ctx }
    }
}

#[async_trait]
impl CanvasWriter for ContextWriter {
    async fn save_graph(&self, canvas_id: &str, snapshot: GraphSnapshot) -> CoreResult<()> {
        self.app
            .save_canvas_graph(&self.ctx, canvas_id, snapshot, None)
            .await
            .map(|_| ())
    }
}

/// Load a canvas, subscribe to its changes and open a session over it.
///
/// The subscription is taken before the load so no change between the two
/// is missed.
pub async fn open_session(
    app: &AppContext,
    ctx: &RequestContext,
    canvas_id: &str,
) -> CoreResult<(CanvasSession, broadcast::Receiver<StoreEvent>)> {
    let events = app.subscribe_canvas(ctx, canvas_id).await?;
    let canvas = app.get_canvas(ctx, canvas_id).await?;
    let writer = Arc::new(ContextWriter::new(app.clone(), ctx.clone()));
    let session = CanvasSession::open(&canvas, writer, app.config());
    Ok((session, events))
}
