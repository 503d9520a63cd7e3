use anyhow::Context;
use claims_gateway::{
    AppState, CanopyClient, GatewayConfig, InMemoryIdempotencyStore, LogFormat, create_app,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing: structured JSON by default, human-readable with LOG_FORMAT=pretty
fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "claims_gateway=debug,claim_flow=debug,tower_http=debug".into());

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env().context("invalid gateway configuration")?;
    init_tracing(config.log_format);

    if !config.provider.is_configured() {
        warn!("CANOPY_CLIENT_ID not set, provider routes will answer 500");
    }

    let provider = CanopyClient::new(&config.provider).context("failed to build provider client")?;
    let listen_addr = config.listen_addr();

    info!(
        provider = %config.provider.base_url,
        amount_rule = ?config.amount_rule,
        idempotency = ?config.idempotency,
        "configuration loaded"
    );

    let idempotency =
        InMemoryIdempotencyStore::with_limits(config.idempotency.ttl, config.idempotency.capacity);

    let app = create_app(AppState {
        config: Arc::new(config),
        provider: Arc::new(provider),
        idempotency: Arc::new(idempotency),
    });

    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    let addr = listener.local_addr()?;

    info!("Claims gateway running on http://{}", addr);
    info!("Claims endpoint: POST http://{}/api/claims", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
