use anyhow::Context;
use clap::Parser;
use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};
use tower_http::services::ServeDir;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use enhancement_tracker::{
    app::{app, cors_layer, AppState, RateLimits},
    auth::SupabaseIdentity,
    cli::Cli,
    config::{self, StoreBackend},
    database::{DatabaseManager, EnhancementRepository, EnhancementStore, MemoryStore},
};

const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SUPABASE_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("enhancement_tracker=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = config::config().clone();
    cli.apply(&mut config);
    cli.check(&config)?;
    config.validate().context("invalid configuration")?;

    info!("Starting enhancement tracker in {:?} mode", config.environment);

    let store: Arc<dyn EnhancementStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to the database")?;
            if cli.migrate || config.database.run_migrations {
                DatabaseManager::migrate(&pool).await.context("migrations failed")?;
            }
            if cli.migrate {
                return Ok(());
            }
            Arc::new(EnhancementRepository::new(pool))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; records are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let identity = SupabaseIdentity::from_config(&config.identity)?;
    if config.identity.jwt_secret.is_some() {
        info!("Access tokens are verified locally");
    }
    if config.security.slack_signing_secret.is_none() {
        warn!("SLACK_SIGNING_SECRET is not set; Slack requests will be refused");
    }

    let limits = RateLimits::from_config(&config);
    if config.api.enable_rate_limiting {
        limits.spawn_pruning(RATE_LIMIT_PRUNE_INTERVAL);
    }

    let state = AppState::new(store, Arc::new(identity))
        .with_slack_secret(config.security.slack_signing_secret.clone())
        .with_rate_limits(limits)
        .with_max_upload_bytes(config.api.max_upload_bytes);

    let mut router = app(state);
    if Path::new(&config.server.static_dir).is_dir() {
        router = router.fallback_service(ServeDir::new(&config.server.static_dir));
    }
    let router = router.layer(cors_layer(&config.security.cors_origins));

    let bind_addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Enhancement tracker listening on http://{}", bind_addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
