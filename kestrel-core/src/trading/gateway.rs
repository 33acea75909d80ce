//! Order-gateway client
//!
//! One TCP connection to the exchange per participant. Outbound requests
//! are drained from the trading engine's ring, stamped with the next
//! gateway sequence, and framed; inbound responses are sliced, validated
//! for client id and sequence, and forwarded to the engine's response ring.

use crate::core::*;
use crate::net::TcpConnection;
use crate::protocol::*;
use crate::runtime::{Consumer, Producer};
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};
use zerocopy::{AsBytes, FromBytes};

pub struct GatewayClient {
    client_id: ClientId,
    conn: TcpConnection,
    requests: Consumer<ClientRequest>,
    responses: Producer<ClientResponse>,
    next_outgoing_seq: u64,
    next_expected_seq: u64,
    running: Arc<AtomicBool>,
}

impl GatewayClient {
    pub fn new(
        client_id: ClientId,
        addr: SocketAddr,
        requests: Consumer<ClientRequest>,
        responses: Producer<ClientResponse>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        Ok(Self {
            client_id,
            conn: TcpConnection::connect(addr)?,
            requests,
            responses,
            next_outgoing_seq: 1,
            next_expected_seq: 1,
            running,
        })
    }

    pub fn run(&mut self) {
        tracing::info!("gateway client {} running", self.client_id);
        while self.running.load(Ordering::Acquire) {
            match self.conn.recv() {
                Ok(true) => self.slice_responses(),
                Ok(false) => {}
                Err(e) => warn!("gateway receive failed: {e:#}"),
            }

            while let Some(request) = self.requests.pop() {
                let seq = self.next_outgoing_seq;
                debug!("sending seq:{seq} {request}");
                let frame = RequestFrame::new(seq, &request);
                self.conn.send(frame.as_bytes());
                self.next_outgoing_seq += 1;
            }

            if let Err(e) = self.conn.flush() {
                warn!("gateway flush failed: {e:#}");
            }
        }
        // Send anything the engine queued before stopping.
        while let Some(request) = self.requests.pop() {
            let frame = RequestFrame::new(self.next_outgoing_seq, &request);
            self.conn.send(frame.as_bytes());
            self.next_outgoing_seq += 1;
        }
        if let Err(e) = self.conn.flush() {
            warn!("gateway flush failed: {e:#}");
        }
        tracing::info!("gateway client {} stopped", self.client_id);
    }

    fn slice_responses(&mut self) {
        let mut consumed = 0;
        loop {
            let bytes = self.conn.rx_bytes();
            if bytes.len() - consumed < ResponseFrame::SIZE {
                break;
            }
            let frame =
                ResponseFrame::read_from(&bytes[consumed..consumed + ResponseFrame::SIZE])
                    .expect("frame slice has exact size");
            consumed += ResponseFrame::SIZE;

            let response = frame.response();

            // Either mismatch here means an exchange-side bug; TCP cannot
            // reorder or lose within a connection.
            if response.client_id != self.client_id {
                warn!(
                    "response for client {} on client {}'s session; dropping",
                    response.client_id, self.client_id
                );
                continue;
            }
            if frame.seq != self.next_expected_seq {
                warn!(
                    "response sequence mismatch: expected {} received {}; dropping",
                    self.next_expected_seq,
                    { frame.seq }
                );
                continue;
            }
            self.next_expected_seq += 1;

            debug!("received {response}");
            self.responses.push(response);
        }
        self.conn.consume(consumed);
    }

    pub fn spawn(mut self, core: Option<usize>) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("kestrel-gateway-client".into())
            .spawn(move || {
                if let Some(core) = core {
                    let _ = crate::runtime::cpu::pin_to_core(core);
                }
                self.run();
            })
            .expect("spawn gateway client thread")
    }
}
