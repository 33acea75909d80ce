//! Incremental market-data publisher
//!
//! Drains the matching engine's market updates, stamps each with the next
//! incremental sequence number (monotone across all tickers, from 1), sends
//! it to the incremental multicast group, and tees the sequenced update to
//! the snapshot synthesiser's ring.

use crate::net::McastSender;
use crate::protocol::*;
use crate::runtime::{Consumer, Producer};
use anyhow::Result;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};
use zerocopy::AsBytes;

pub struct MarketDataPublisher {
    updates: Consumer<MarketUpdate>,
    snapshot_tx: Producer<SeqMarketUpdate>,
    socket: McastSender,
    next_inc_seq: u64,
    running: Arc<AtomicBool>,
}

impl MarketDataPublisher {
    pub fn new(
        group: SocketAddrV4,
        iface: Ipv4Addr,
        updates: Consumer<MarketUpdate>,
        snapshot_tx: Producer<SeqMarketUpdate>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        Ok(Self {
            updates,
            snapshot_tx,
            socket: McastSender::new(group, iface)?,
            next_inc_seq: 1,
            running,
        })
    }

    pub fn run(&mut self) {
        tracing::info!("market data publisher running");
        while self.running.load(Ordering::Acquire) {
            self.drain();
        }
        // Flush updates the matching engine emitted before stopping.
        self.drain();
        tracing::info!("market data publisher stopped");
    }

    fn drain(&mut self) {
        while let Some(update) = self.updates.pop() {
            let seq = self.next_inc_seq;
            debug!("publishing seq:{seq} {update}");

            let frame = MarketDataFrame::new(seq, &update);
            if let Err(e) = self.socket.send(frame.as_bytes()) {
                warn!("incremental publish failed: {e:#}");
            }

            self.snapshot_tx.push(SeqMarketUpdate { seq, update });
            self.next_inc_seq += 1;
        }
    }

    pub fn spawn(mut self, core: Option<usize>) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("kestrel-md-publisher".into())
            .spawn(move || {
                if let Some(core) = core {
                    let _ = crate::runtime::cpu::pin_to_core(core);
                }
                self.run();
            })
            .expect("spawn market data publisher thread")
    }
}
