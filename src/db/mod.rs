pub mod components;
pub mod portfolio;
pub mod projects;
pub mod references;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

use crate::config::Config;

/// Upper bound on ids bound into one `IN (...)` clause.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Create a SeaORM connection pool from the loaded [`Config`].
pub async fn create_pool(config: &Config) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(config.sql_logging);
    if let Some(max) = config.max_connections {
        options.max_connections(max);
    }

    Database::connect(options).await
}
