//! Domain types shared by every component of the plant.

pub mod types;

pub use types::*;
