// src/main.rs
use dotenvy::dotenv;
use polls_api::config::{Config, ConfigError};
use polls_api::{build_app, db};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    dotenv().ok(); // Load environment variables from .env file

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("polls_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let pools = db::create_pools(&config).await?;
    db::run_migrations(&pools.admin).await?;

    let addr = config.socket_addr();
    let app = build_app(pools, &config);

    info!(%addr, "listening");
    axum_server::bind(addr).serve(app.into_make_service()).await?;

    Ok(())
}
