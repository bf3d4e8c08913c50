use nodemc::{
    accounts::{self, CredentialStore},
    config::AppConfig,
    setup::{ConfigService, MirrorProvisioner, RuntimeConfigFile},
    web,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging first
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nodemc=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting NodeMC v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::init()?;
    info!("Configuration loaded");

    // Runtime config is created on first start so the setup key survives restarts
    let runtime_file = RuntimeConfigFile::new(&config.runtime.path);
    let runtime = runtime_file.load_or_init().await?;

    let listen_port = if runtime.firstrun {
        warn!("First run: setup has not been completed yet");
        info!(
            "Setup key {} is available from GET /apikey until setup completes",
            runtime.nodemc.apikey.redacted()
        );
        config.web.port
    } else {
        runtime.nodemc.port
    };

    // Initialize database
    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    info!("Database connected: {}", config.database.url);

    // Run migrations
    accounts::init_db(&pool).await?;

    let provisioner = Arc::new(MirrorProvisioner::new(&config.artifacts)?);
    let config_service = Arc::new(ConfigService::new(runtime, runtime_file, provisioner));
    let credentials = Arc::new(CredentialStore::new(pool, config.kdf)?);

    let app = web::create_router(web::AppState {
        config: config_service,
        credentials,
    });

    let addr = format!("{}:{}", config.web.host, listen_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Web server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
