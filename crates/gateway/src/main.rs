//! Shopbridge gateway server
//!
//! Binds the webhook endpoint and wires configuration, the audit log, and
//! the vTiger client together.

use std::net::SocketAddr;

use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopbridge_gateway::{config::Config, routes, state::AppState};
use shopbridge_shared::AuditLog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,shopbridge_gateway=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting shopbridge gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    tracing::info!(
        vtiger_url = %config.vtiger.base_url,
        audit_log = %config.audit_log_path,
        "Configuration loaded"
    );

    let audit = AuditLog::to_file(&config.audit_log_path).await?;

    let state = AppState::new(&config, audit);
    let app = routes::create_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
