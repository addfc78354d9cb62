use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vaccine_card::api::create_routes;
use vaccine_card::auth::{JwtService, PasswordService};
use vaccine_card::config::{run_migrations, AppConfig, StoreBackend};
use vaccine_card::data::{InMemoryStore, PgStore, Store};
use vaccine_card::handlers::Mediator;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .init();

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = config.database.create_pool().await?;
            run_migrations(&pool).await?;
            info!("database migrations applied");
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            if config.is_development() {
                info!("using in-memory store; data is lost on shutdown");
            } else {
                warn!(
                    environment = %config.environment,
                    "in-memory store selected outside development; data is lost on shutdown"
                );
            }
            Arc::new(InMemoryStore::new())
        }
    };

    let mediator = Mediator::new(
        store,
        PasswordService::new(config.password.hash_cost),
        JwtService::new(&config.jwt),
    );
    let app = create_routes(mediator, config.require_auth);

    let address = config.server_address();
    let listener = TcpListener::bind(&address).await?;
    info!(
        environment = %config.environment,
        require_auth = config.require_auth,
        "vaccine card server listening on http://{address}"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}
