//! FIFO ingress sequencer
//!
//! Receive timestamps across TCP sockets are not monotonic in the order the
//! receive callbacks fire, so requests accepted during one poll round are
//! buffered here and flushed once per round in receive-time order. The sort
//! is stable: requests with equal timestamps keep arrival order.

use crate::core::*;
use crate::protocol::ClientRequest;
use crate::runtime::Producer;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct TimedRequest {
    recv_time: Nanos,
    request: ClientRequest,
}

pub struct FifoSequencer {
    pending: Vec<TimedRequest>,
    out: Producer<ClientRequest>,
}

impl FifoSequencer {
    pub fn new(out: Producer<ClientRequest>) -> Self {
        Self {
            pending: Vec::with_capacity(MAX_PENDING_SEQ),
            out,
        }
    }

    /// Buffer one validated request. Overflowing the round buffer is fatal.
    pub fn push(&mut self, recv_time: Nanos, request: ClientRequest) {
        assert!(
            self.pending.len() < MAX_PENDING_SEQ,
            "too many pending requests in one poll round"
        );
        self.pending.push(TimedRequest { recv_time, request });
    }

    /// Flush the round's requests into the matching engine ring, ordered by
    /// kernel receive time.
    pub fn sequence_and_publish(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        debug!("sequencing {} requests", self.pending.len());

        self.pending.sort_by_key(|t| t.recv_time);

        for timed in self.pending.drain(..) {
            self.out.push(timed.request);
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
