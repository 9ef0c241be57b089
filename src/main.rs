use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{Level, info, warn};
use tracing_subscriber::fmt::format::FmtSpan;

use rmpc_server::{
    api::{AppState, SecurityMiddlewareConfig, SecurityState, create_app},
    config::ServiceConfig,
    database::{DatabasePool, Datastore, InMemoryDatastore},
    session::{IdentityVerifier, OpenplanetVerifier, StaticIdentityVerifier},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Invalid configuration aborts startup
    let config = ServiceConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {:#}", e);
        eprintln!("Please check environment variables.");
        e
    })?;

    init_secure_logging(&config)?;

    info!("Starting rmpc score server");

    let (store, identity) = init_backends(&config).await?;

    let state = AppState::new(&config, store, identity);
    let _sweeper = state.auth_limiter.spawn_sweeper();
    info!(
        limit = config.auth.rate_limit_per_minute,
        "Auth rate limiter started"
    );

    let security_state = SecurityState::new(SecurityMiddlewareConfig::from(&config));
    let app = create_app(state, security_state).layer(TraceLayer::new_for_http());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!("Score server listening on {}", bind_addr);
    info!(
        "Score cooldown={}s, session expiry={}h, max body={}KB",
        config.scores.cooldown.as_secs(),
        config.auth.token_expiry.as_secs() / 3600,
        config.security.max_request_size / 1024
    );

    // Serve with connect info for client IP extraction
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

/// PostgreSQL and the Openplanet verifier, or in-memory stand-ins in dev mode
async fn init_backends(
    config: &ServiceConfig,
) -> Result<(Arc<dyn Datastore>, Arc<dyn IdentityVerifier>)> {
    if config.dev_mode {
        warn!("DEV_MODE enabled: in-memory datastore and canned dev players, nothing is persisted");
        return Ok((
            Arc::new(InMemoryDatastore::new()),
            Arc::new(StaticIdentityVerifier::dev_players()),
        ));
    }

    let pool = DatabasePool::new(&config.database)
        .await
        .context("Failed to connect to PostgreSQL")?;
    pool.init_schema()
        .await
        .context("Failed to initialize database schema")?;

    let verifier = OpenplanetVerifier::new(&config.identity)?;
    Ok((Arc::new(pool), Arc::new(verifier)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}

/// Initialize logging from configuration
fn init_secure_logging(config: &ServiceConfig) -> Result<()> {
    let log_level = match config.logging.level.as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    if config.logging.sanitize_logs {
        info!("Logging initialized with client address masking");
    }

    Ok(())
}
