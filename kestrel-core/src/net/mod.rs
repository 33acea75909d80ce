//! Socket transports: non-blocking TCP for the order gateway, UDP multicast
//! for market data.

pub mod multicast;
pub mod tcp;

pub use multicast::{McastReceiver, McastSender};
pub use tcp::{TcpConnection, TcpServer};
