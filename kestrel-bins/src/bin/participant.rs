//! Participant binary
//!
//! `participant CLIENT_ID ALGO_TYPE [clip thresh max_order_size max_position max_loss]...`
//!
//! One 5-tuple of strategy/risk parameters per ticker, starting at ticker
//! id 0. Wires the market-data consumer, gateway client, and trading
//! engine, then either lets the strategy trade or (for RANDOM) drives
//! random order flow from this thread. Exits after the plant has been
//! silent for a minute.

use anyhow::{Context, Result};
use clap::Parser;
use kestrel_bins::common::{init_logging, install_sigint_handler, sleep_interruptible};
use kestrel_core::config::Config;
use kestrel_core::core::*;
use kestrel_core::protocol::*;
use kestrel_core::runtime::{ring, Producer};
use kestrel_core::trading::{GatewayClient, MarketDataConsumer, OrderManager, TradingEngine};
use kestrel_strategies::Algo;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Seconds of silence after which the participant shuts itself down.
const SILENT_WINDOW_SECS: u64 = 60;

#[derive(Parser, Debug)]
#[command(author, version, about = "kestrel participant: market data, book, strategy, gateway")]
struct Args {
    /// Client id, unique per participant.
    client_id: ClientId,

    /// Trading algorithm: RANDOM, MAKER, or TAKER.
    algo_type: AlgoType,

    /// Per-ticker parameters, 5 values per ticker starting at ticker 0:
    /// clip threshold max_order_size max_position max_loss
    #[arg(num_args = 0.., allow_negative_numbers = true)]
    ticker_params: Vec<f64>,

    /// Optional TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn parse_ticker_cfg(params: &[f64]) -> Result<TickerCfgMap> {
    anyhow::ensure!(
        params.len() % 5 == 0,
        "ticker parameters must come in 5-tuples: clip thresh max_order_size max_position max_loss"
    );
    anyhow::ensure!(
        params.len() / 5 <= MAX_TICKERS,
        "at most {MAX_TICKERS} ticker 5-tuples"
    );

    let mut cfg = TickerCfgMap::default();
    for (ticker, tuple) in params.chunks_exact(5).enumerate() {
        cfg[ticker] = TickerCfg {
            clip: tuple[0] as Qty,
            threshold: tuple[1],
            risk: RiskCfg {
                max_order_size: tuple[2] as Qty,
                max_position: tuple[3] as Qty,
                max_loss: tuple[4],
            },
        };
        tracing::info!("ticker {ticker}: {}", cfg[ticker]);
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let cfg = Config::load(args.config.as_deref())?;
    let ticker_cfg = parse_ticker_cfg(&args.ticker_params)?;
    tracing::info!(
        "participant {} starting with algo {}",
        args.client_id,
        args.algo_type
    );

    let running = Arc::new(AtomicBool::new(true));
    let shutdown = Arc::new(AtomicBool::new(false));
    install_sigint_handler(Arc::clone(&shutdown))?;

    // Order manager -> gateway client.
    let (requests_tx, requests_rx) = ring(MAX_CLIENT_UPDATES);
    // Gateway client -> trading engine.
    let (responses_tx, responses_rx) = ring(MAX_CLIENT_UPDATES);
    // Market data consumer -> trading engine.
    let (updates_tx, updates_rx) = ring(MAX_MARKET_UPDATES);

    // Under RANDOM the engine's order manager never sends; this thread
    // owns the gateway ring producer instead, keeping it single-producer.
    let (engine_requests_tx, random_requests_tx): (Producer<ClientRequest>, _) =
        if args.algo_type == AlgoType::Random {
            let (sink_tx, _sink_rx) = ring(64);
            (sink_tx, Some(requests_tx))
        } else {
            (requests_tx, None)
        };

    tracing::info!("starting trading engine");
    let engine = TradingEngine::new(
        args.client_id,
        &ticker_cfg,
        Algo::new(args.algo_type, &ticker_cfg),
        OrderManager::new(args.client_id, engine_requests_tx),
        responses_rx,
        updates_rx,
        Arc::clone(&running),
    );
    let clock = engine.clock();

    tracing::info!("starting gateway client");
    let gateway = GatewayClient::new(
        args.client_id,
        cfg.gateway.addr,
        requests_rx,
        responses_tx,
        Arc::clone(&running),
    )
    .context("connecting to the exchange")?;

    tracing::info!("starting market data consumer");
    let consumer = MarketDataConsumer::new(
        cfg.market_data.incremental_group,
        cfg.market_data.snapshot_group,
        cfg.market_data.iface,
        updates_tx,
        Arc::clone(&running),
    )?;

    let handles = vec![engine.spawn(None), gateway.spawn(None), consumer.spawn(None)];

    // Let the sockets and subscriptions settle before trading.
    sleep_interruptible(Duration::from_secs(10), &shutdown);
    clock.restart();

    if let Some(mut requests) = random_requests_tx {
        run_random_flow(
            args.client_id,
            &mut requests,
            &clock,
            &shutdown,
        );
    }

    while clock.silent_seconds() < SILENT_WINDOW_SECS && !shutdown.load(Ordering::Acquire) {
        tracing::info!(
            "waiting for the plant to go quiet, silent for {}s",
            clock.silent_seconds()
        );
        sleep_interruptible(Duration::from_secs(10), &shutdown);
    }

    tracing::info!("shutting down");
    running.store(false, Ordering::Release);
    for handle in handles {
        let _ = handle.join();
    }

    Ok(())
}

/// Random order flow: up to 10 000 (new, cancel-an-earlier-one) pairs at
/// ~20 ms intervals with random ticker, price, quantity, and side.
fn run_random_flow(
    client_id: ClientId,
    requests: &mut Producer<ClientRequest>,
    clock: &kestrel_core::trading::EngineClock,
    shutdown: &AtomicBool,
) {
    let mut rng = StdRng::seed_from_u64(client_id as u64);
    let pace = Duration::from_millis(20);

    let mut next_order_id: OrderId = client_id as OrderId * 1000;
    let mut sent: Vec<ClientRequest> = Vec::new();

    let base_price: Vec<Price> = (0..MAX_TICKERS)
        .map(|_| 100 + rng.gen_range(0..100))
        .collect();

    for _ in 0..10_000 {
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        let ticker_id = rng.gen_range(0..MAX_TICKERS) as TickerId;
        let request = ClientRequest {
            kind: ClientRequestKind::New,
            client_id,
            ticker_id,
            order_id: next_order_id,
            side: if rng.gen_bool(0.5) {
                Side::Buy
            } else {
                Side::Sell
            },
            price: base_price[ticker_id as usize] + rng.gen_range(1..=10),
            qty: 2 + rng.gen_range(0..100),
        };
        next_order_id += 1;

        requests.push(request);
        std::thread::sleep(pace);

        sent.push(request);
        let mut cancel = sent[rng.gen_range(0..sent.len())];
        cancel.kind = ClientRequestKind::Cancel;
        requests.push(cancel);
        std::thread::sleep(pace);

        if clock.silent_seconds() >= SILENT_WINDOW_SECS {
            tracing::info!("stopping random flow: plant silent");
            break;
        }
    }
}
