//! Application entrypoint and state wiring.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use session_ledger::config::NodeConfig;
use session_ledger::crypto::NodeIdentity;
use session_ledger::network::HttpChainFetcher;
use session_ledger::server::{build_router, open_ledger, spawn_periodic_resolution, AppState};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "session_ledger=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = NodeConfig::parse();
    tracing::info!("starting ledger node with config: {:?}", cfg);

    // 0) dirs
    std::fs::create_dir_all(&cfg.data_dir).context("create data dir")?;

    // 1) node identity
    let identity = NodeIdentity::load_or_create(&cfg.key_path()).context("load node key")?;
    tracing::info!("node id: {}", identity.node_id());

    // 2) chain and peers
    let ledger = open_ledger(&cfg.data_dir, &cfg.peers).context("open ledger")?;
    tracing::info!(
        "ledger at height {} with {} peer(s)",
        ledger.height(),
        ledger.peers().len()
    );

    // 3) shared state
    let shutdown = CancellationToken::new();
    let state = AppState {
        ledger: Arc::new(Mutex::new(ledger)),
        identity: Arc::new(identity),
        fetcher: Arc::new(HttpChainFetcher::new(cfg.fetch_timeout()).context("build http client")?),
        data_dir: cfg.data_dir.clone(),
        shutdown: shutdown.clone(),
        mine_timeout: cfg.mine_timeout(),
    };

    let background = cfg
        .resolve_interval()
        .map(|every| spawn_periodic_resolution(state.clone(), every));

    // 4) serve until ctrl-c
    let app = build_router(state);
    let listener = TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("bind {}", cfg.bind))?;
    tracing::info!("listening on http://{}", cfg.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("failed to listen for ctrl-c: {e}");
                }
                tracing::info!("shutting down");
                shutdown.cancel();
            }
        })
        .await
        .context("serve")?;

    if let Some(task) = background {
        let _ = task.await;
    }
    Ok(())
}
