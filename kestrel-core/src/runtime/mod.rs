//! Runtime primitives: lock-free rings, object pools, thread placement.

pub mod cpu;
pub mod pool;
pub mod spsc;
pub mod timing;

pub use pool::{Pool, SlotIdx, NULL_IDX};
pub use spsc::{ring, Consumer, Producer};
