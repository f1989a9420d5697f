use canvas::config::CanvasConfig;
use canvas::database::establish_connection;
use canvas::database::migrations::{Migrator, MigratorTrait};
use canvas::AppContext;
use sea_orm::DatabaseConnection;

pub struct TestDb {
    url: String,
}

impl TestDb {
    pub fn new_in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
        }
    }

    /// Connect and apply every migration.
    pub async fn connect(&self) -> anyhow::Result<DatabaseConnection> {
        let db = establish_connection(&self.url).await?;
        Migrator::up(&db, None).await?;
        Ok(db)
    }

    /// Application context over a fresh migrated database.
    pub async fn app(&self, config: CanvasConfig) -> anyhow::Result<AppContext> {
        let db = self.connect().await?;
        Ok(AppContext::new(db, config))
    }
}
