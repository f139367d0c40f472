use dotenv::dotenv;
use migration::{Migrator, MigratorTrait};
use portfolio_engine::collaborators::Collaborators;
use portfolio_engine::{Config, PortfolioService, create_pool};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = Config::from_env().expect("Invalid configuration");
    let db = create_pool(&config)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Connected to database");

    if config.run_migrations {
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        tracing::info!("Migrations applied");
    }

    let service = PortfolioService::new(db, Collaborators::default());

    let roots = service.roots().await.expect("Failed to list portfolios");
    let counts = service.count_by_mode().await.expect("Failed to count portfolios");
    tracing::info!(
        roots = roots.len(),
        portfolios = ?counts.portfolios,
        subportfolios = ?counts.subportfolios,
        "Portfolio store ready"
    );
}
