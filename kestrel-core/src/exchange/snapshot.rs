//! Snapshot synthesiser
//!
//! Tails the sequenced incremental stream on its own thread, maintains the
//! set of live orders per ticker, and periodically broadcasts a
//! self-contained snapshot on the snapshot multicast group so participants
//! can bootstrap or resynchronise after loss.
//!
//! The publisher feeds this stage over a local ring, so any sequence
//! discontinuity here is a plant bug and is fatal.

use crate::core::*;
use crate::net::McastSender;
use crate::protocol::*;
use crate::runtime::Consumer;
use anyhow::Result;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use zerocopy::AsBytes;

/// Live-order state reconstructed from the incremental stream.
///
/// Orders are keyed by market order id; the ordered map replays each
/// ticker's orders in id order, which is also intra-level priority order,
/// so a consumer rebuilding a book from the snapshot recovers the FIFO.
pub struct SnapshotTable {
    orders: Vec<BTreeMap<OrderId, MarketUpdate>>,
    last_inc_seq: u64,
}

impl Default for SnapshotTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotTable {
    pub fn new() -> Self {
        Self {
            orders: (0..MAX_TICKERS).map(|_| BTreeMap::new()).collect(),
            last_inc_seq: 0,
        }
    }

    /// Fold one sequenced incremental into the state table.
    pub fn absorb(&mut self, sequenced: &SeqMarketUpdate) {
        let update = &sequenced.update;
        let orders = &mut self.orders[update.ticker_id as usize];

        match update.kind {
            MarketUpdateKind::Add => {
                let previous = orders.insert(update.order_id, *update);
                assert!(
                    previous.is_none(),
                    "ADD for already-live order: {update}"
                );
            }
            MarketUpdateKind::Modify => {
                let order = orders
                    .get_mut(&update.order_id)
                    .unwrap_or_else(|| panic!("MODIFY for unknown order: {update}"));
                assert_eq!(order.side, update.side, "MODIFY changed side: {update}");
                order.qty = update.qty;
                order.price = update.price;
            }
            MarketUpdateKind::Cancel => {
                let removed = orders.remove(&update.order_id);
                assert!(removed.is_some(), "CANCEL for unknown order: {update}");
            }
            MarketUpdateKind::Trade
            | MarketUpdateKind::Clear
            | MarketUpdateKind::SnapshotStart
            | MarketUpdateKind::SnapshotEnd
            | MarketUpdateKind::Invalid => {}
        }

        assert_eq!(
            sequenced.seq,
            self.last_inc_seq + 1,
            "incremental sequence discontinuity at synthesiser: {sequenced}"
        );
        self.last_inc_seq = sequenced.seq;
    }

    /// Materialise one self-contained snapshot: SNAPSHOT_START, then per
    /// ticker a CLEAR followed by an ADD per live order, then SNAPSHOT_END.
    /// Local sequence runs 0, 1, 2, …; the start and end records carry the
    /// superseded incremental sequence in `order_id`.
    pub fn build_snapshot(&self) -> Vec<SeqMarketUpdate> {
        let mut messages = Vec::new();
        let mut seq = 0u64;
        let mut push = |messages: &mut Vec<SeqMarketUpdate>, update: MarketUpdate| {
            messages.push(SeqMarketUpdate { seq, update });
            seq += 1;
        };

        push(
            &mut messages,
            MarketUpdate {
                kind: MarketUpdateKind::SnapshotStart,
                order_id: self.last_inc_seq,
                ..MarketUpdate::default()
            },
        );

        for (ticker, orders) in self.orders.iter().enumerate() {
            push(
                &mut messages,
                MarketUpdate {
                    kind: MarketUpdateKind::Clear,
                    ticker_id: ticker as TickerId,
                    ..MarketUpdate::default()
                },
            );
            for order in orders.values() {
                push(&mut messages, *order);
            }
        }

        push(
            &mut messages,
            MarketUpdate {
                kind: MarketUpdateKind::SnapshotEnd,
                order_id: self.last_inc_seq,
                ..MarketUpdate::default()
            },
        );

        messages
    }

    pub fn last_inc_seq(&self) -> u64 {
        self.last_inc_seq
    }

    pub fn live_orders(&self, ticker_id: TickerId) -> usize {
        self.orders[ticker_id as usize].len()
    }
}

pub struct SnapshotSynthesizer {
    table: SnapshotTable,
    rx: Consumer<SeqMarketUpdate>,
    socket: McastSender,
    snapshot_interval: Duration,
    last_snapshot_at: Instant,
    running: Arc<AtomicBool>,
}

impl SnapshotSynthesizer {
    pub fn new(
        group: SocketAddrV4,
        iface: Ipv4Addr,
        rx: Consumer<SeqMarketUpdate>,
        snapshot_interval: Duration,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        Ok(Self {
            table: SnapshotTable::new(),
            rx,
            socket: McastSender::new(group, iface)?,
            snapshot_interval,
            // First snapshot goes out one full interval after start.
            last_snapshot_at: Instant::now(),
            running,
        })
    }

    pub fn run(&mut self) {
        info!("snapshot synthesizer running");
        while self.running.load(Ordering::Acquire) {
            while let Some(sequenced) = self.rx.pop() {
                debug!("absorbing {sequenced}");
                self.table.absorb(&sequenced);
            }

            if self.last_snapshot_at.elapsed() >= self.snapshot_interval {
                self.last_snapshot_at = Instant::now();
                self.publish_snapshot();
            }
        }
        // Absorb what the publisher teed before stopping.
        while let Some(sequenced) = self.rx.pop() {
            self.table.absorb(&sequenced);
        }
        info!("snapshot synthesizer stopped");
    }

    fn publish_snapshot(&mut self) {
        let messages = self.table.build_snapshot();
        for sequenced in &messages {
            let frame = MarketDataFrame::new(sequenced.seq, &sequenced.update);
            if let Err(e) = self.socket.send(frame.as_bytes()) {
                warn!("snapshot publish failed: {e:#}");
            }
        }
        info!(
            "published snapshot of {} messages through inc seq {}",
            messages.len(),
            self.table.last_inc_seq()
        );
    }

    pub fn spawn(mut self, core: Option<usize>) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("kestrel-snapshotter".into())
            .spawn(move || {
                if let Some(core) = core {
                    let _ = crate::runtime::cpu::pin_to_core(core);
                }
                self.run();
            })
            .expect("spawn snapshot synthesizer thread")
    }
}
