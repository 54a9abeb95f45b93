use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use feedbot_booru::BooruClient;
use feedbot_cloudflare::{D1Client, D1Config, R2Client, R2Config};
use feedbot_core::{config::Config, relay::Relay, runner};
use feedbot_telegram::{throttled::ThrottledPublisher, TelegramPublisher};

/// Minimum spacing between two channel posts.
const PUBLISH_MIN_INTERVAL: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    feedbot_core::logging::init("feedbot")?;

    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Not fatal: keep running so the container does not restart in a loop.
    if !cfg.missing.is_empty() {
        tracing::error!(
            "missing required environment variables: {}",
            cfg.missing.join(", ")
        );
    }

    let relay = build_relay(&cfg)?;

    let cancel = CancellationToken::new();
    let runner_cancel = cancel.clone();
    let interval = cfg.post_interval;
    let worker = tokio::spawn(async move {
        runner::run_forever(&relay, interval, runner_cancel).await;
    });

    shutdown_signal().await;
    tracing::info!("shutdown requested");
    cancel.cancel();
    worker.await?;

    Ok(())
}

fn build_relay(cfg: &Config) -> feedbot_core::Result<Relay> {
    let source = Arc::new(BooruClient::new(
        cfg.source_base_url.clone(),
        cfg.source_tags.clone(),
        cfg.http_timeout,
    )?);

    let telegram = Arc::new(TelegramPublisher::from_token(
        &cfg.bot_token,
        cfg.telegram_api_url.as_deref(),
        cfg.channel_id,
    )?);
    let publisher = Arc::new(ThrottledPublisher::new(telegram, PUBLISH_MIN_INTERVAL));

    let objects = Arc::new(R2Client::new(
        R2Config {
            endpoint: cfg.r2_endpoint.clone(),
            bucket: cfg.r2_bucket.clone(),
            access_key: cfg.r2_access_key.clone(),
            secret_key: cfg.r2_secret_key.clone(),
        },
        cfg.http_timeout,
    )?);

    let records = Arc::new(D1Client::new(
        D1Config {
            api_base: cfg.cf_api_base.clone(),
            account_id: cfg.cf_account_id.clone(),
            database_id: cfg.d1_database_id.clone(),
            api_token: cfg.cf_api_token.clone(),
            table: cfg.d1_table.clone(),
        },
        cfg.http_timeout,
    )?);

    Ok(Relay::new(
        source,
        publisher,
        objects,
        records,
        cfg.recent_capacity,
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
