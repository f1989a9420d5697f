use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::automation::{
    AgentRunner, AutomationService, InputSchemaRegistry, UnconfiguredRunner, UpdateNodeFieldsTool,
};
use crate::config::CanvasConfig;
use crate::document::Canvas;
use crate::errors::CoreResult;
use crate::services::{
    AuthProvider, CallerId, CanvasService, DependencyReport, DependencyService,
    HeaderAuthProvider, NodeDataService, RequestContext, StoreEvents,
};

mod automation_operations;
mod canvas_operations;
mod edge_operations;
mod node_operations;

/// Result of a canvas mutation: the new version plus any dependency
/// bookkeeping it caused.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub canvas_id: String,
    pub version: i64,
    pub dependencies: DependencyReport,
}

impl MutationOutcome {
    fn new(canvas: &Canvas, dependencies: DependencyReport) -> Self {
        Self {
            canvas_id: canvas.id.clone(),
            version: canvas.version,
            dependencies,
        }
    }
}

/// Shared application context exposing the canvas operation surface to the
/// HTTP layer and client sessions.
#[derive(Clone)]
pub struct AppContext {
    db: DatabaseConnection,
    config: Arc<CanvasConfig>,
    auth: Arc<dyn AuthProvider>,
    events: StoreEvents,
    canvas_service: Arc<CanvasService>,
    node_data_service: Arc<NodeDataService>,
    dependency_service: Arc<DependencyService>,
    automation_service: Arc<AutomationService>,
}

impl AppContext {
    /// Context with header-based auth and no agent runtime.
    pub fn new(db: DatabaseConnection, config: CanvasConfig) -> Self {
        Self::with_collaborators(
            db,
            config,
            Arc::new(HeaderAuthProvider),
            Arc::new(UnconfiguredRunner),
            InputSchemaRegistry::builtin(),
        )
    }

    pub fn with_collaborators(
        db: DatabaseConnection,
        config: CanvasConfig,
        auth: Arc<dyn AuthProvider>,
        runner: Arc<dyn AgentRunner>,
        registry: InputSchemaRegistry,
    ) -> Self {
        let events = StoreEvents::new(config.event_buffer);
        let node_data_service = NodeDataService::new(db.clone(), events.clone());
        let canvas_service = CanvasService::new(db.clone(), events.clone(), config.patch_retry_limit);
        let dependency_service = DependencyService::new(node_data_service.clone());
        let automation_service = AutomationService::new(
            node_data_service.clone(),
            registry,
            runner,
            config.automation_concurrency,
        )
        .with_tool(Arc::new(UpdateNodeFieldsTool));

        Self {
            db,
            config: Arc::new(config),
            auth,
            events,
            canvas_service: Arc::new(canvas_service),
            node_data_service: Arc::new(node_data_service),
            dependency_service: Arc::new(dependency_service),
            automation_service: Arc::new(automation_service),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn events(&self) -> &StoreEvents {
        &self.events
    }

    pub fn canvas_service(&self) -> &Arc<CanvasService> {
        &self.canvas_service
    }

    pub fn node_data_service(&self) -> &Arc<NodeDataService> {
        &self.node_data_service
    }

    pub fn automation_service(&self) -> &Arc<AutomationService> {
        &self.automation_service
    }

    fn caller(&self, ctx: &RequestContext) -> CoreResult<CallerId> {
        self.auth.require_auth(ctx)
    }
}
