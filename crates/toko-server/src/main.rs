// SPDX-License-Identifier: Apache-2.0
#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use toko_server::{
    build_router, spawn_outbox_worker, validate_startup_config, AppState, HttpPaymentGateway,
    HttpShippingGateway, LogNotifier, Notifier, PaymentConfig, ServerConfig, ShippingConfig,
    ShippingGateway, StaticShippingGateway, UnconfiguredPaymentGateway,
};
use toko_store::{PaymentGateway, Store};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("TOKO_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn config_from_env() -> ServerConfig {
    let allow_private = env_bool("TOKO_GATEWAY_ALLOW_PRIVATE_HOSTS", false);
    ServerConfig {
        max_body_bytes: env_usize("TOKO_BODY_MAX_BYTES", 64 * 1024),
        max_page_limit: env_u32("TOKO_PAGE_LIMIT_MAX", toko_api::MAX_PAGE_LIMIT),
        request_timeout: env_duration_ms("TOKO_REQUEST_TIMEOUT_MS", 10_000),
        outbox_drain_interval: env_duration_ms("TOKO_OUTBOX_DRAIN_MS", 2_000),
        outbox_batch_size: env_usize("TOKO_OUTBOX_BATCH", 16),
        outbox_max_attempts: env_u32("TOKO_OUTBOX_MAX_ATTEMPTS", 5),
        shipping: ShippingConfig {
            base_url: env_nonempty("TOKO_SHIPPING_BASE_URL"),
            api_key: env::var("TOKO_SHIPPING_API_KEY").unwrap_or_default(),
            timeout: env_duration_ms("TOKO_SHIPPING_TIMEOUT_MS", 5_000),
            retry_backoff: env_duration_ms("TOKO_SHIPPING_RETRY_BACKOFF_MS", 250),
            allow_private_hosts: allow_private,
        },
        payment: PaymentConfig {
            base_url: env_nonempty("TOKO_PAYMENT_BASE_URL"),
            server_key: env::var("TOKO_PAYMENT_SERVER_KEY").unwrap_or_default(),
            timeout: env_duration_ms("TOKO_PAYMENT_TIMEOUT_MS", 10_000),
            allow_private_hosts: allow_private,
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let bind_addr = env::var("TOKO_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let db_path = PathBuf::from(env::var("TOKO_DB_PATH").unwrap_or_else(|_| "toko.db".to_string()));

    let config = config_from_env();
    validate_startup_config(&config)?;

    let store =
        Arc::new(Store::open(&db_path).map_err(|e| format!("open store {db_path:?}: {e}"))?);

    let shipping: Arc<dyn ShippingGateway> = match &config.shipping.base_url {
        Some(url) => Arc::new(HttpShippingGateway::new(
            url.clone(),
            config.shipping.api_key.clone(),
            config.shipping.timeout,
            config.shipping.retry_backoff,
            config.shipping.allow_private_hosts,
        )),
        None => {
            info!("no shipping provider configured; quotes return no options");
            Arc::new(StaticShippingGateway::with_options(Vec::new()))
        }
    };

    let payment: Arc<dyn PaymentGateway> = match &config.payment.base_url {
        Some(url) => Arc::new(HttpPaymentGateway::new(
            url.clone(),
            config.payment.server_key.clone(),
            config.payment.timeout,
            config.payment.allow_private_hosts,
        )),
        None => {
            info!("no payment provider configured; online checkout will be refused");
            Arc::new(UnconfiguredPaymentGateway)
        }
    };

    let state = AppState::with_config(Arc::clone(&store), shipping, payment, config.clone());
    let app = build_router(state);

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    spawn_outbox_worker(
        Arc::clone(&store),
        notifier,
        config.outbox_drain_interval,
        config.outbox_batch_size,
        config.outbox_max_attempts,
    );

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("bind {bind_addr} failed: {e}"))?;
    info!("toko-server listening on {bind_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received; draining requests");
        })
        .await
        .map_err(|e| format!("server error: {e}"))?;
    Ok(())
}
