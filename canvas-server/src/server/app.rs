use anyhow::{anyhow, Result};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, patch, post, put};
use axum::Router;
use canvas::AppContext;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{automation, canvases, edges, health, node_data, nodes};

#[derive(Clone)]
pub struct AppState {
    pub context: AppContext,
}

pub fn create_app(context: AppContext, cors_origin: Option<&str>) -> Result<Router> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = match cors_origin {
        Some(origin) => CorsLayer::new().allow_origin(
            origin
                .parse::<HeaderValue>()
                .map_err(|e| anyhow!("Invalid CORS origin: {}", e))?,
        ),
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(methods)
    .allow_headers(Any)
    .allow_credentials(false);

    let state = AppState { context };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/canvases",
            get(canvases::list_canvases).post(canvases::create_canvas),
        )
        .route(
            "/api/canvases/:canvas_id",
            get(canvases::get_canvas)
                .patch(canvases::patch_canvas)
                .delete(canvases::delete_canvas),
        )
        .route("/api/canvases/:canvas_id/graph", put(canvases::save_graph))
        .route("/api/canvases/:canvas_id/nodes", post(nodes::add_nodes))
        .route(
            "/api/canvases/:canvas_id/nodes/geometry",
            patch(nodes::update_geometry),
        )
        .route(
            "/api/canvases/:canvas_id/nodes/display",
            patch(nodes::update_display),
        )
        .route(
            "/api/canvases/:canvas_id/nodes/remove",
            post(nodes::remove_nodes),
        )
        .route("/api/canvases/:canvas_id/edges", post(edges::add_edges))
        .route(
            "/api/canvases/:canvas_id/edges/data",
            patch(edges::update_edge_data),
        )
        .route(
            "/api/canvases/:canvas_id/edges/remove",
            post(edges::remove_edges),
        )
        .route("/api/node-data", post(node_data::create_node_data))
        .route("/api/node-data/:node_data_id", get(node_data::get_node_data))
        .route(
            "/api/node-data/:node_data_id/values",
            patch(node_data::update_values),
        )
        .route(
            "/api/node-data/:node_data_id/automation",
            post(automation::trigger_automation),
        )
        .route(
            "/api/automation-runs/:run_id",
            get(automation::run_status),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}
