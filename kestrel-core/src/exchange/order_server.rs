//! Order gateway server
//!
//! Terminates participant TCP sessions: slices inbound byte streams into
//! request frames, enforces the (client, socket) binding and per-client
//! request sequence, feeds accepted requests to the FIFO sequencer, and
//! writes sequenced responses back out.
//!
//! Protocol faults (wrong socket for a pinned client, sequence mismatch)
//! drop the frame with a warning. Sending a response to a client with no
//! known socket is fatal.

use crate::core::*;
use crate::exchange::sequencer::FifoSequencer;
use crate::net::TcpServer;
use crate::protocol::*;
use crate::runtime::timing::nanos_now;
use crate::runtime::{Consumer, Producer};
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};
use zerocopy::{AsBytes, FromBytes};

pub struct OrderServer {
    server: TcpServer,
    sequencer: FifoSequencer,
    responses: Consumer<ClientResponse>,

    /// Per-client sequence on the outgoing response stream, from 1.
    next_outgoing_seq: Vec<u64>,
    /// Per-client sequence expected on the incoming request stream, from 1.
    next_expected_seq: Vec<u64>,
    /// First socket observed for a client id is pinned to it.
    client_conn: Vec<Option<usize>>,

    running: Arc<AtomicBool>,
}

impl OrderServer {
    pub fn new(
        addr: SocketAddr,
        requests: Producer<ClientRequest>,
        responses: Consumer<ClientResponse>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        Ok(Self {
            server: TcpServer::bind(addr)?,
            sequencer: FifoSequencer::new(requests),
            responses,
            next_outgoing_seq: vec![1; MAX_CLIENTS],
            next_expected_seq: vec![1; MAX_CLIENTS],
            client_conn: vec![None; MAX_CLIENTS],
            running,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.server.local_addr()
    }

    /// One thread: accept, receive a full round, sequence it, then drain
    /// outbound responses. The sequencer flushes once per round so fairness
    /// is by kernel receive time, not callback order.
    pub fn run(&mut self) {
        tracing::info!("order server running");
        while self.running.load(Ordering::Acquire) {
            if let Err(e) = self.server.poll_accept() {
                warn!("accept failed: {e:#}");
            }

            self.receive_round();
            self.sequencer.sequence_and_publish();
            self.send_responses();
            self.flush_round();
        }
        // Push out any responses the matching engine produced before stopping.
        self.send_responses();
        self.flush_round();
        tracing::info!("order server stopped");
    }

    fn receive_round(&mut self) {
        for conn_id in self.server.connection_ids() {
            let conn = match self.server.connection_mut(conn_id) {
                Some(conn) => conn,
                None => continue,
            };

            match conn.recv() {
                Ok(true) => {
                    let recv_time = nanos_now();
                    self.slice_frames(conn_id, recv_time);
                }
                Ok(false) => {}
                Err(e) => warn!("receive failed on connection {conn_id}: {e:#}"),
            }

            if self
                .server
                .connection_mut(conn_id)
                .is_some_and(|c| c.is_dead())
            {
                self.server.close(conn_id);
            }
        }
    }

    fn slice_frames(&mut self, conn_id: usize, recv_time: Nanos) {
        let conn = self.server.connection_mut(conn_id).expect("live connection");

        let mut consumed = 0;
        loop {
            let bytes = conn.rx_bytes();
            if bytes.len() - consumed < RequestFrame::SIZE {
                break;
            }
            let frame =
                RequestFrame::read_from(&bytes[consumed..consumed + RequestFrame::SIZE])
                    .expect("frame slice has exact size");
            consumed += RequestFrame::SIZE;

            let request = frame.request();
            debug!("received seq:{} {request}", { frame.seq });

            let client = request.client_id as usize;
            if client >= MAX_CLIENTS {
                warn!("dropping frame with out-of-range client id {client}");
                continue;
            }

            if self.client_conn[client].is_none() {
                self.client_conn[client] = Some(conn_id);
            }
            if self.client_conn[client] != Some(conn_id) {
                // TODO(gateway): reject to the client instead of dropping.
                warn!(
                    "client {client} sent on connection {conn_id}, pinned to {:?}; dropping",
                    self.client_conn[client]
                );
                continue;
            }

            let expected = &mut self.next_expected_seq[client];
            if frame.seq != *expected {
                // TODO(gateway): reject to the client instead of dropping.
                warn!(
                    "client {client} sequence mismatch: expected {expected} received {}; dropping",
                    { frame.seq }
                );
                continue;
            }
            *expected += 1;

            self.sequencer.push(recv_time, request);
        }

        self.server
            .connection_mut(conn_id)
            .expect("live connection")
            .consume(consumed);
    }

    fn send_responses(&mut self) {
        while let Some(response) = self.responses.pop() {
            let client = response.client_id as usize;
            let conn_id = self.client_conn[client]
                .unwrap_or_else(|| panic!("no socket for client {client}: {response}"));

            let seq = self.next_outgoing_seq[client];
            debug!("sending seq:{seq} {response}");

            let frame = ResponseFrame::new(seq, &response);
            let conn = self
                .server
                .connection_mut(conn_id)
                .unwrap_or_else(|| panic!("connection {conn_id} for client {client} is gone"));
            conn.send(frame.as_bytes());

            self.next_outgoing_seq[client] += 1;
        }
    }

    fn flush_round(&mut self) {
        for conn_id in self.server.connection_ids() {
            if let Some(conn) = self.server.connection_mut(conn_id) {
                if let Err(e) = conn.flush() {
                    warn!("flush failed on connection {conn_id}: {e:#}");
                }
            }
        }
    }

    pub fn spawn(mut self, core: Option<usize>) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("kestrel-order-server".into())
            .spawn(move || {
                if let Some(core) = core {
                    let _ = crate::runtime::cpu::pin_to_core(core);
                }
                self.run();
            })
            .expect("spawn order server thread")
    }
}
