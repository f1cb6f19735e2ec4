//! Marketplace API - Entry point.

use anyhow::Context;
use marketplace_api::{
    api::{cors_layer, create_router_with_rate_limit, AppState, RateLimitState},
    config::Config,
};
use marketplace_core::{LogMailer, Marketplace, Store, TextCertificateRenderer};
use payment_gateway::PaymentVerifier;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Marketplace API");

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let store = if config.storage.persist {
        Store::new(
            config.storage.path.clone(),
            config.storage.encryption_secret.as_ref(),
        )
    } else {
        info!("Persistence disabled, using in-memory storage");
        Store::memory()
    };
    info!(persistent = store.is_persistent(), "Storage ready");

    let payments =
        PaymentVerifier::from_config(&config.gateway).context("Invalid gateway configuration")?;

    let marketplace = Marketplace::new(store, payments, config.pricing.clone())
        .await
        .context("Failed to load marketplace state")?;

    let state = AppState::new(
        marketplace,
        Arc::new(TextCertificateRenderer::new(
            config.certificates.url_prefix.clone(),
        )),
        Arc::new(LogMailer),
    );

    let rate_limit = RateLimitState::new(config.rate_limit.global_per_minute);
    let mut app = create_router_with_rate_limit(state, rate_limit);
    if let Some(origin) = config.server.cors_origin.as_deref() {
        app = app.layer(cors_layer(origin).context("Invalid CORS origin")?);
        info!(%origin, "CORS enabled");
    }

    let addr = SocketAddr::new(
        config.server.listen_addr.parse().unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")
}
