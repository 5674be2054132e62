use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use common_auth::KeyPair;
use identity_service::config::load_identity_config;
use identity_service::{build_router, AppState, Argon2Hasher, OpContext};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_identity_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let keys = KeyPair::load(
        config.token.private_key_path.as_deref(),
        config.token.public_key_path.as_deref(),
        config.environment.key_fallback(),
    )
    .context("Failed to load token signing keys")?;
    if keys.is_embedded() {
        warn!(
            environment = config.environment.as_str(),
            "Issuing tokens with the embedded development key pair"
        );
    }

    let hasher = Argon2Hasher::new(config.hasher).context("Invalid argon2 parameters")?;
    let shutdown = CancellationToken::new();
    let state = AppState::new(&config, &keys, Arc::new(hasher), shutdown.clone())?;

    if let Some(bootstrap) = &config.bootstrap {
        state
            .bootstrap_admin(&OpContext::background(), bootstrap)
            .context("Failed to bootstrap administrator")?;
    }

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(
        %addr,
        issuer = %config.token.issuer,
        environment = config.environment.as_str(),
        "starting identity-service"
    );

    let started = Instant::now();
    let grace_period = config.server.grace_period;
    let server = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()));
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        result = &mut server => {
            result.context("Server task failed")??;
        }
        _ = async {
            shutdown.cancelled().await;
            tokio::time::sleep(grace_period).await;
        } => {
            warn!(
                grace_period = %humantime::format_duration(grace_period),
                "Graceful shutdown timed out, dropping open connections"
            );
            server.abort();
        }
    }

    info!(
        uptime = %humantime::format_duration(std::time::Duration::from_secs(
            started.elapsed().as_secs()
        )),
        "identity-service stopped"
    );
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
    shutdown.cancel();
}
