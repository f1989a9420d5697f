pub mod app;
pub mod errors;
pub mod handlers;

use anyhow::Result;
use canvas::config::CanvasConfig;
use canvas::database::migrations::Migrator;
use canvas::database::{establish_connection, get_database_url};
use canvas::AppContext;
use clap::Subcommand;
use sea_orm_migration::prelude::*;
use tracing::info;

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

pub async fn start_server(
    port: u16,
    database_path: &str,
    cors_origin: Option<&str>,
    mut config: CanvasConfig,
) -> Result<()> {
    config.database_url = get_database_url(Some(database_path));
    let db = establish_connection(&config.database_url).await?;

    Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    let context = AppContext::new(db, config);
    spawn_event_cleanup(context.clone());
    let app = app::create_app(context, cors_origin)?;

    log_routes();

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Settled automation runs stay pollable this long.
const RUN_RETENTION: std::time::Duration = std::time::Duration::from_secs(3600);

/// Periodically drop notification channels without subscribers and forget
/// old settled automation runs.
fn spawn_event_cleanup(context: AppContext) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval.tick().await;

        loop {
            interval.tick().await;
            tracing::debug!("Cleaning up idle event channels");
            context.events().cleanup_idle();
            let evicted = context.automation_service().cleanup_settled(RUN_RETENTION);
            if evicted > 0 {
                tracing::debug!("Evicted {} settled automation runs", evicted);
            }
        }
    });
}

fn log_routes() {
    info!("API Endpoints:");
    info!("  /health                              - Health check");
    info!("  /api/canvases                        - List and create canvases");
    info!("  /api/canvases/:id                    - Get, patch and delete a canvas");
    info!("  /api/canvases/:id/graph              - Save the whole graph");
    info!("  /api/canvases/:id/nodes[/...]        - Node operations");
    info!("  /api/canvases/:id/edges[/...]        - Edge operations");
    info!("  /api/node-data[/:id[/...]]           - Node data and automation triggers");
    info!("  /api/automation-runs/:run_id         - Automation run status");
}

pub async fn migrate_database(database_path: &str, direction: MigrateDirection) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}
