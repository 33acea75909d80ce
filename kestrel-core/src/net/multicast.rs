//! UDP multicast transport for the market-data streams
//!
//! The publisher and snapshot synthesiser each own a sender; participants
//! own one receiver per joined group. Receivers accumulate datagrams into a
//! framing buffer sliced by the consumer, so the same code path handles one
//! or many frames per datagram.
//!
//! Dropping a receiver closes the socket outright instead of issuing an
//! explicit leave; re-joining builds a fresh socket. This mirrors how the
//! recovery protocol re-arms its snapshot subscription.

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};

const BUFFER_SIZE: usize = 1024 * 1024;
const MAX_DATAGRAM: usize = 64 * 1024;

fn new_udp_socket() -> Result<Socket> {
    Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).context("create UDP socket")
}

/// Sender bound to one multicast group.
pub struct McastSender {
    socket: UdpSocket,
    group: SocketAddrV4,
}

impl McastSender {
    /// `iface` selects the outgoing interface by address (loopback for the
    /// default single-host deployment).
    pub fn new(group: SocketAddrV4, iface: Ipv4Addr) -> Result<Self> {
        let socket = new_udp_socket()?;
        socket.set_nonblocking(true).context("set_nonblocking")?;
        socket
            .set_multicast_if_v4(&iface)
            .context("set_multicast_if_v4")?;
        socket
            .set_multicast_loop_v4(true)
            .context("set_multicast_loop_v4")?;
        socket
            .bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0).into())
            .context("bind sender")?;
        tracing::info!("multicast sender ready for group {group}");
        Ok(Self {
            socket: socket.into(),
            group,
        })
    }

    /// Send one datagram to the group. A full kernel buffer drops the
    /// datagram, exactly as the wire would.
    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        match self.socket.send_to(bytes, self.group) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                tracing::warn!("multicast send buffer full, dropping datagram");
                Ok(())
            }
            Err(e) => Err(e).context("multicast send"),
        }
    }

    pub fn group(&self) -> SocketAddrV4 {
        self.group
    }
}

/// Receiver joined to one multicast group, with a framing buffer.
pub struct McastReceiver {
    socket: UdpSocket,
    rx: Vec<u8>,
    rx_len: usize,
    group: SocketAddrV4,
}

impl McastReceiver {
    pub fn join(group: SocketAddrV4, iface: Ipv4Addr) -> Result<Self> {
        let socket = new_udp_socket()?;
        // Multiple participants on one host share the group port.
        socket.set_reuse_address(true).context("set_reuse_address")?;
        socket.set_nonblocking(true).context("set_nonblocking")?;
        socket
            .bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, group.port()).into())
            .with_context(|| format!("bind receiver to port {}", group.port()))?;
        socket
            .join_multicast_v4(group.ip(), &iface)
            .with_context(|| format!("join multicast group {group}"))?;
        tracing::info!("joined multicast group {group}");
        Ok(Self {
            socket: socket.into(),
            rx: vec![0; BUFFER_SIZE],
            rx_len: 0,
            group,
        })
    }

    /// Drain every pending datagram into the framing buffer. Returns true
    /// when new bytes arrived.
    pub fn poll(&mut self) -> Result<bool> {
        let mut got_data = false;
        loop {
            if self.rx.len() - self.rx_len < MAX_DATAGRAM {
                break;
            }
            match self.socket.recv_from(&mut self.rx[self.rx_len..]) {
                Ok((n, _)) => {
                    self.rx_len += n;
                    got_data = true;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("multicast recv"),
            }
        }
        Ok(got_data)
    }

    #[inline(always)]
    pub fn rx_bytes(&self) -> &[u8] {
        &self.rx[..self.rx_len]
    }

    #[inline]
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.rx_len);
        self.rx.copy_within(n..self.rx_len, 0);
        self.rx_len -= n;
    }

    pub fn group(&self) -> SocketAddrV4 {
        self.group
    }
}
