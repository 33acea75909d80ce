//! Exchange binary
//!
//! Wires the four exchange stages together over their rings and runs until
//! SIGINT, then performs the two-stage graceful shutdown: a grace period
//! for in-flight work, teardown, and a final grace period before exit.

use anyhow::Result;
use clap::Parser;
use kestrel_bins::common::{init_logging, install_sigint_handler};
use kestrel_core::config::Config;
use kestrel_core::core::*;
use kestrel_core::exchange::{MarketDataPublisher, MatchingEngine, OrderServer, SnapshotSynthesizer};
use kestrel_core::runtime::ring;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "kestrel exchange: matching engine and market data")]
struct Args {
    /// Optional TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let cfg = Config::load(args.config.as_deref())?;
    tracing::info!("exchange starting with {cfg:?}");

    let running = Arc::new(AtomicBool::new(true));
    let shutdown = Arc::new(AtomicBool::new(false));
    install_sigint_handler(Arc::clone(&shutdown))?;

    // R1: order server -> matching engine.
    let (requests_tx, requests_rx) = ring(MAX_CLIENT_UPDATES);
    // R2: matching engine -> order server.
    let (responses_tx, responses_rx) = ring(MAX_CLIENT_UPDATES);
    // R3: matching engine -> market data publisher.
    let (updates_tx, updates_rx) = ring(MAX_MARKET_UPDATES);
    // R4: publisher -> snapshot synthesizer.
    let (snapshot_tx, snapshot_rx) = ring(MAX_MARKET_UPDATES);

    tracing::info!("starting matching engine");
    let matching_engine = MatchingEngine::new(
        requests_rx,
        responses_tx,
        updates_tx,
        Arc::clone(&running),
    );

    tracing::info!("starting market data publisher");
    let publisher = MarketDataPublisher::new(
        cfg.market_data.incremental_group,
        cfg.market_data.iface,
        updates_rx,
        snapshot_tx,
        Arc::clone(&running),
    )?;

    tracing::info!("starting snapshot synthesizer");
    let synthesizer = SnapshotSynthesizer::new(
        cfg.market_data.snapshot_group,
        cfg.market_data.iface,
        snapshot_rx,
        Duration::from_secs(cfg.market_data.snapshot_interval_secs),
        Arc::clone(&running),
    )?;

    tracing::info!("starting order server");
    let order_server = OrderServer::new(
        cfg.gateway.addr,
        requests_tx,
        responses_rx,
        Arc::clone(&running),
    )?;

    let handles = vec![
        matching_engine.spawn(None),
        publisher.spawn(None),
        synthesizer.spawn(None),
        order_server.spawn(None),
    ];

    while !shutdown.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_millis(100));
    }

    // Stage one: let in-flight work drain while everything still runs.
    tracing::info!("shutdown stage 1: draining");
    std::thread::sleep(Duration::from_secs(10));

    running.store(false, Ordering::Release);
    for handle in handles {
        let _ = handle.join();
    }

    // Stage two: a final grace period before exit.
    tracing::info!("shutdown stage 2: exiting");
    std::thread::sleep(Duration::from_secs(10));

    Ok(())
}
