//! faq-cascade HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use faq_cascade::config::Config;
use faq_cascade::gateway::{HandlerState, create_router_with_state};
use faq_cascade::{BankCache, EntryFetcher, HttpEmbedder, PipelineConfig, Resolver};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let pipeline_config = PipelineConfig::from_env()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    let fetcher = config.source_fetcher().context("invalid bank source")?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        source = %fetcher.describe(),
        "faq-cascade starting"
    );

    let embedder = match config.embedding_config() {
        Some(embedding_config) => {
            tracing::info!(
                url = %embedding_config.url,
                model = %embedding_config.model,
                "Semantic stage enabled"
            );
            Some(Arc::new(HttpEmbedder::new(embedding_config)?))
        }
        None => {
            tracing::warn!("No FAQ_EMBEDDING_URL configured, semantic stage disabled");
            None
        }
    };

    let cache = Arc::new(BankCache::new(fetcher, embedder, config.bank_config())?);
    let resolver = Arc::new(Resolver::new(Arc::clone(&cache), pipeline_config)?);
    tracing::info!(stages = ?resolver.stage_kinds(), "Pipeline ready");

    warm_bank(&cache).await;

    let app = create_router_with_state(HandlerState::new(resolver));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("faq-cascade shutdown complete");
    Ok(())
}

/// Loads the first generation before serving; failure is retried on the first request.
async fn warm_bank<F: EntryFetcher>(cache: &BankCache<F, HttpEmbedder>) {
    match cache.get().await {
        Ok(bank) => tracing::info!(
            entries = bank.len(),
            semantic = ?bank.semantic(),
            "Bank warmed"
        ),
        Err(e) => tracing::warn!("Failed to warm bank: {}. Loading on first request.", e),
    }
}

fn run_health_check() -> i32 {
    let port = std::env::var("FAQ_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let Ok(rt) = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    else {
        return 1;
    };

    rt.block_on(async {
        let Ok(client) = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
        else {
            return 1;
        };

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
