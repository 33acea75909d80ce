//! Matching engine
//!
//! A single thread that drains the ingress request ring and dispatches each
//! request to the book for its ticker. Responses and market updates flow
//! out through the two producer halves handed to the books.

use crate::core::*;
use crate::exchange::book::ExchangeBook;
use crate::protocol::*;
use crate::runtime::{Consumer, Producer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

pub struct MatchingEngine {
    books: Vec<ExchangeBook>,
    requests: Consumer<ClientRequest>,
    responses: Producer<ClientResponse>,
    updates: Producer<MarketUpdate>,
    running: Arc<AtomicBool>,
}

impl MatchingEngine {
    pub fn new(
        requests: Consumer<ClientRequest>,
        responses: Producer<ClientResponse>,
        updates: Producer<MarketUpdate>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let books = (0..MAX_TICKERS as TickerId).map(ExchangeBook::new).collect();
        Self {
            books,
            requests,
            responses,
            updates,
            running,
        }
    }

    /// Non-blocking spin loop: one request per iteration.
    pub fn run(&mut self) {
        tracing::info!("matching engine running");
        while self.running.load(Ordering::Acquire) {
            if let Some(request) = self.requests.pop() {
                debug!("processing {request}");
                self.process(&request);
            }
        }
        // Drain whatever the sequencer already published before stopping.
        while let Some(request) = self.requests.pop() {
            self.process(&request);
        }
        tracing::info!("matching engine stopped");
    }

    fn process(&mut self, request: &ClientRequest) {
        let ticker = request.ticker_id as usize;
        assert!(
            ticker < self.books.len(),
            "request for unknown ticker: {request}"
        );
        let book = &mut self.books[ticker];

        match request.kind {
            ClientRequestKind::New => book.add(
                request.client_id,
                request.order_id,
                request.side,
                request.price,
                request.qty,
                &mut self.responses,
                &mut self.updates,
            ),
            ClientRequestKind::Cancel => book.cancel(
                request.client_id,
                request.order_id,
                &mut self.responses,
                &mut self.updates,
            ),
            ClientRequestKind::Invalid => {
                panic!("matching engine received invalid request type: {request}")
            }
        }
    }

    pub fn spawn(mut self, core: Option<usize>) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("kestrel-matcher".into())
            .spawn(move || {
                if let Some(core) = core {
                    let _ = crate::runtime::cpu::pin_to_core(core);
                }
                self.run();
            })
            .expect("spawn matching engine thread")
    }
}
