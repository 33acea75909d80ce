//! Market-data consumer with gap recovery
//!
//! Steady state tails only the incremental multicast stream and forwards
//! in-sequence updates straight to the trading engine's ring. A sequence
//! gap flips the consumer into recovery: it joins the snapshot group,
//! buffers both streams keyed by sequence number, and on every arrival
//! attempts to stitch a complete snapshot to the queued incremental tail.
//! Success replays snapshot body then tail into the engine ring, drops the
//! snapshot subscription, and returns to steady state.
//!
//! Snapshots republish periodically and the queued incrementals are
//! re-examined on each arrival, so recovery completes within about one
//! snapshot interval after loss stops.

use crate::net::McastReceiver;
use crate::protocol::*;
use crate::runtime::Producer;
use anyhow::Result;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};
use zerocopy::FromBytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    Incremental,
    Snapshot,
}

/// What a message did to the recovery state machine; the socket layer acts
/// on the transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTransition {
    None,
    /// First detected gap: subscribe to the snapshot stream.
    EnteredRecovery,
    /// Sync complete: drop the snapshot subscription.
    CompletedRecovery,
}

/// The pure recovery/synchronisation state machine, separated from the
/// sockets so it can be driven directly.
pub struct RecoverySync {
    next_expected_inc_seq: u64,
    in_recovery: bool,
    snapshot_queued: BTreeMap<u64, MarketUpdate>,
    incremental_queued: BTreeMap<u64, MarketUpdate>,
}

impl Default for RecoverySync {
    fn default() -> Self {
        Self::new()
    }
}

impl RecoverySync {
    pub fn new() -> Self {
        Self {
            next_expected_inc_seq: 1,
            in_recovery: false,
            snapshot_queued: BTreeMap::new(),
            incremental_queued: BTreeMap::new(),
        }
    }

    pub fn in_recovery(&self) -> bool {
        self.in_recovery
    }

    pub fn next_expected_inc_seq(&self) -> u64 {
        self.next_expected_inc_seq
    }

    /// Feed one sequenced message from either stream. In-sequence steady
    /// state updates go straight to `out`; everything else is buffered
    /// until a sync attempt succeeds.
    pub fn on_message(
        &mut self,
        source: StreamSource,
        seq: u64,
        update: MarketUpdate,
        out: &mut Producer<MarketUpdate>,
    ) -> SyncTransition {
        if source == StreamSource::Snapshot && !self.in_recovery {
            // Stale subscription; snapshot data is only meaningful mid-recovery.
            warn!("ignoring snapshot message outside recovery");
            return SyncTransition::None;
        }

        let already_in_recovery = self.in_recovery;
        if source == StreamSource::Incremental && seq != self.next_expected_inc_seq {
            self.in_recovery = true;
        }

        if self.in_recovery {
            let mut transition = SyncTransition::None;
            if !already_in_recovery {
                warn!(
                    "gap on incremental stream: expected {} received {seq}; entering recovery",
                    self.next_expected_inc_seq
                );
                self.snapshot_queued.clear();
                self.incremental_queued.clear();
                transition = SyncTransition::EnteredRecovery;
            }

            self.queue_message(source, seq, update);
            if self.try_sync(out) {
                transition = SyncTransition::CompletedRecovery;
            }
            transition
        } else {
            debug!("forwarding seq:{seq} {update}");
            self.next_expected_inc_seq += 1;
            out.push(update);
            SyncTransition::None
        }
    }

    fn queue_message(&mut self, source: StreamSource, seq: u64, update: MarketUpdate) {
        match source {
            StreamSource::Snapshot => {
                if self.snapshot_queued.contains_key(&seq) {
                    // A repeated local sequence means we dropped part of the
                    // previous snapshot; restart buffering from this one.
                    warn!("snapshot sequence {seq} seen twice, abandoning previous snapshot");
                    self.snapshot_queued.clear();
                }
                self.snapshot_queued.insert(seq, update);
            }
            StreamSource::Incremental => {
                self.incremental_queued.insert(seq, update);
            }
        }
    }

    /// Try to complete recovery from the buffered messages. On success the
    /// snapshot body and contiguous incremental tail are pushed to `out` in
    /// order and the machine returns to steady state.
    fn try_sync(&mut self, out: &mut Producer<MarketUpdate>) -> bool {
        let Some(first) = self.snapshot_queued.values().next() else {
            return false;
        };
        if first.kind != MarketUpdateKind::SnapshotStart {
            debug!("no SNAPSHOT_START yet, discarding snapshot buffer");
            self.snapshot_queued.clear();
            return false;
        }

        let mut final_events = Vec::new();

        let mut next_snapshot_seq = 0u64;
        let mut have_complete_snapshot = true;
        for (&seq, update) in &self.snapshot_queued {
            if seq != next_snapshot_seq {
                warn!("gap in snapshot stream: expected {next_snapshot_seq} found {seq}");
                have_complete_snapshot = false;
                break;
            }
            if update.kind != MarketUpdateKind::SnapshotStart
                && update.kind != MarketUpdateKind::SnapshotEnd
            {
                final_events.push(*update);
            }
            next_snapshot_seq += 1;
        }
        if !have_complete_snapshot {
            self.snapshot_queued.clear();
            return false;
        }

        let last = self
            .snapshot_queued
            .values()
            .next_back()
            .expect("non-empty snapshot buffer");
        if last.kind != MarketUpdateKind::SnapshotEnd {
            debug!("snapshot incomplete, waiting for SNAPSHOT_END");
            return false;
        }

        // The hand-off: resume incrementals just past the sequence the
        // snapshot supersedes.
        self.next_expected_inc_seq = last.order_id + 1;

        let mut num_incrementals = 0usize;
        let mut have_complete_incremental = true;
        for (&seq, update) in &self.incremental_queued {
            if seq < self.next_expected_inc_seq {
                continue;
            }
            if seq != self.next_expected_inc_seq {
                warn!(
                    "gap in queued incrementals: expected {} found {seq}",
                    self.next_expected_inc_seq
                );
                have_complete_incremental = false;
                break;
            }
            if update.kind != MarketUpdateKind::SnapshotStart
                && update.kind != MarketUpdateKind::SnapshotEnd
            {
                final_events.push(*update);
            }
            self.next_expected_inc_seq += 1;
            num_incrementals += 1;
        }
        if !have_complete_incremental {
            self.snapshot_queued.clear();
            return false;
        }

        info!(
            "recovered {} snapshot and {num_incrementals} incremental events",
            self.snapshot_queued.len() - 2
        );
        for update in final_events {
            out.push(update);
        }

        self.snapshot_queued.clear();
        self.incremental_queued.clear();
        self.in_recovery = false;
        true
    }
}

/// Socket-facing consumer: two multicast receivers feeding the state
/// machine, with frame slicing identical to the TCP side.
pub struct MarketDataConsumer {
    incremental: McastReceiver,
    snapshot: Option<McastReceiver>,
    sync: RecoverySync,
    out: Producer<MarketUpdate>,
    snapshot_group: SocketAddrV4,
    iface: Ipv4Addr,
    running: Arc<AtomicBool>,
}

impl MarketDataConsumer {
    pub fn new(
        incremental_group: SocketAddrV4,
        snapshot_group: SocketAddrV4,
        iface: Ipv4Addr,
        out: Producer<MarketUpdate>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        Ok(Self {
            incremental: McastReceiver::join(incremental_group, iface)?,
            snapshot: None,
            sync: RecoverySync::new(),
            out,
            snapshot_group,
            iface,
            running,
        })
    }

    pub fn run(&mut self) {
        info!("market data consumer running");
        while self.running.load(Ordering::Acquire) {
            self.poll_source(StreamSource::Incremental);
            if self.snapshot.is_some() {
                self.poll_source(StreamSource::Snapshot);
            }
        }
        info!("market data consumer stopped");
    }

    fn poll_source(&mut self, source: StreamSource) {
        let receiver = match source {
            StreamSource::Incremental => &mut self.incremental,
            StreamSource::Snapshot => match self.snapshot.as_mut() {
                Some(receiver) => receiver,
                None => return,
            },
        };

        match receiver.poll() {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                warn!("multicast poll failed: {e:#}");
                return;
            }
        }

        let mut consumed = 0;
        loop {
            // Re-borrow each iteration: handling a frame may re-arm the
            // snapshot subscription, which touches `self`.
            let receiver = match source {
                StreamSource::Incremental => &self.incremental,
                StreamSource::Snapshot => match self.snapshot.as_ref() {
                    Some(receiver) => receiver,
                    None => break,
                },
            };
            let bytes = receiver.rx_bytes();
            if bytes.len() - consumed < MarketDataFrame::SIZE {
                break;
            }
            let frame =
                MarketDataFrame::read_from(&bytes[consumed..consumed + MarketDataFrame::SIZE])
                    .expect("frame slice has exact size");
            consumed += MarketDataFrame::SIZE;

            match self
                .sync
                .on_message(source, frame.seq, frame.update(), &mut self.out)
            {
                SyncTransition::None => {}
                SyncTransition::EnteredRecovery => self.join_snapshot_stream(),
                SyncTransition::CompletedRecovery => {
                    info!("recovery complete, leaving snapshot group");
                    // Dropping the receiver closes the socket; that is the
                    // whole leave operation.
                    self.snapshot = None;
                }
            }
        }

        match source {
            StreamSource::Incremental => self.incremental.consume(consumed),
            StreamSource::Snapshot => {
                if let Some(receiver) = self.snapshot.as_mut() {
                    receiver.consume(consumed);
                }
            }
        }
    }

    fn join_snapshot_stream(&mut self) {
        if self.snapshot.is_some() {
            return;
        }
        match McastReceiver::join(self.snapshot_group, self.iface) {
            Ok(receiver) => self.snapshot = Some(receiver),
            Err(e) => warn!("failed to join snapshot group: {e:#}"),
        }
    }

    pub fn spawn(mut self, core: Option<usize>) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("kestrel-md-consumer".into())
            .spawn(move || {
                if let Some(core) = core {
                    let _ = crate::runtime::cpu::pin_to_core(core);
                }
                self.run();
            })
            .expect("spawn market data consumer thread")
    }
}
