//! Kestrel Core - Low-Latency Electronic Trading Plant
//!
//! An exchange and a trading participant built from single-threaded stages
//! connected only by lock-free SPSC rings.
//!
//! ## System Architecture
//!
//! ```text
//!           (client TCP)              ring R1                 ring R3
//!  Clients ────────────► OrderServer ───────► MatchingEngine ───────► MDPublisher ──► (incremental UDP)
//!                         │  FifoSequencer          │                     │
//!                         │◄────────────── ring R2 ◄┘                     │ ring R4
//!                         ▼ (client TCP)                                  ▼
//!                     responses                                SnapshotSynthesizer ──► (snapshot UDP)
//!
//!  Participant mirror image:
//!
//!  (incremental + snapshot UDP) ──► MarketDataConsumer ──► ring ──► TradingEngine ──► Strategy
//!               (client TCP)   ◄──► GatewayClient      ◄──► rings ◄──┘
//! ```
//!
//! ## Design Principles
//! - One thread per stage; hot loops spin, they never block
//! - Every cross-thread channel is a single-producer single-consumer ring
//! - Zero heap allocation on the hot path: order and level records come
//!   from fixed pools, ring storage is preallocated
//! - Books link records by `u32` arena index, never by pointer
//! - Invariant violations abort the process; protocol faults are logged
//!   and dropped; business rejections go back to the client

pub mod config;
pub mod core;
pub mod exchange;
pub mod logging;
pub mod net;
pub mod protocol;
pub mod runtime;
pub mod trading;
