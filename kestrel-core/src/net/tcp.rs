//! Non-blocking TCP transport for the order gateway
//!
//! Connections are polled from spin loops, never blocked on. Each
//! connection owns a receive buffer that accumulates the byte stream until
//! the session layer slices complete frames out of it, and a send buffer
//! that batches writes until `flush`.

use anyhow::{Context, Result};
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

/// Receive/send buffer size per connection. Sized well above the largest
/// burst a single poll round is expected to carry.
const BUFFER_SIZE: usize = 1024 * 1024;

/// One non-blocking TCP connection with framing buffers.
pub struct TcpConnection {
    stream: TcpStream,
    rx: Vec<u8>,
    rx_len: usize,
    tx: Vec<u8>,
    dead: bool,
}

impl TcpConnection {
    /// Wrap an accepted stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream
            .set_nonblocking(true)
            .context("set_nonblocking on accepted stream")?;
        stream.set_nodelay(true).context("set_nodelay")?;
        Ok(Self {
            stream,
            rx: vec![0; BUFFER_SIZE],
            rx_len: 0,
            tx: Vec::with_capacity(BUFFER_SIZE),
            dead: false,
        })
    }

    /// Connect to a listening gateway.
    pub fn connect(addr: SocketAddr) -> Result<Self> {
        let stream =
            TcpStream::connect(addr).with_context(|| format!("connect to gateway {addr}"))?;
        Self::from_stream(stream)
    }

    /// Pull whatever the kernel has buffered into the receive buffer.
    /// Returns true when new bytes arrived.
    pub fn recv(&mut self) -> Result<bool> {
        if self.dead {
            return Ok(false);
        }
        let mut got_data = false;
        loop {
            if self.rx_len == self.rx.len() {
                break;
            }
            match self.stream.read(&mut self.rx[self.rx_len..]) {
                Ok(0) => {
                    self.dead = true;
                    break;
                }
                Ok(n) => {
                    self.rx_len += n;
                    got_data = true;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.dead = true;
                    return Err(e).context("tcp read");
                }
            }
        }
        Ok(got_data)
    }

    /// Bytes received so far and not yet consumed by the session layer.
    #[inline(always)]
    pub fn rx_bytes(&self) -> &[u8] {
        &self.rx[..self.rx_len]
    }

    /// Drop `n` leading bytes; the unconsumed tail fragment is shifted to
    /// the buffer head so the next read appends after it.
    #[inline]
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.rx_len);
        self.rx.copy_within(n..self.rx_len, 0);
        self.rx_len -= n;
    }

    /// Queue bytes for transmission; nothing hits the socket until `flush`.
    #[inline]
    pub fn send(&mut self, bytes: &[u8]) {
        self.tx.extend_from_slice(bytes);
    }

    /// Push the send buffer to the kernel, keeping any unwritten tail.
    pub fn flush(&mut self) -> Result<()> {
        if self.dead || self.tx.is_empty() {
            return Ok(());
        }
        let mut written = 0;
        while written < self.tx.len() {
            match self.stream.write(&self.tx[written..]) {
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.dead = true;
                    return Err(e).context("tcp write");
                }
            }
        }
        self.tx.drain(..written);
        Ok(())
    }

    #[inline(always)]
    pub fn is_dead(&self) -> bool {
        self.dead
    }
}

/// Non-blocking listener plus the set of accepted connections, addressed by
/// a stable connection id.
pub struct TcpServer {
    listener: TcpListener,
    connections: Vec<Option<TcpConnection>>,
}

impl TcpServer {
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).with_context(|| format!("bind gateway {addr}"))?;
        listener
            .set_nonblocking(true)
            .context("set_nonblocking on listener")?;
        tracing::info!("order gateway listening on {addr}");
        Ok(Self {
            listener,
            connections: Vec::new(),
        })
    }

    /// Accept every pending connection, returning the new ids.
    pub fn poll_accept(&mut self) -> Result<Vec<usize>> {
        let mut accepted = Vec::new();
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let conn = TcpConnection::from_stream(stream)?;
                    let id = self.store(conn);
                    tracing::info!("accepted connection {id} from {peer}");
                    accepted.push(id);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(e).context("tcp accept"),
            }
        }
        Ok(accepted)
    }

    fn store(&mut self, conn: TcpConnection) -> usize {
        if let Some(id) = self.connections.iter().position(Option::is_none) {
            self.connections[id] = Some(conn);
            id
        } else {
            self.connections.push(Some(conn));
            self.connections.len() - 1
        }
    }

    #[inline]
    pub fn connection_mut(&mut self, id: usize) -> Option<&mut TcpConnection> {
        self.connections.get_mut(id).and_then(Option::as_mut)
    }

    /// Ids of all live connections.
    pub fn connection_ids(&self) -> Vec<usize> {
        self.connections
            .iter()
            .enumerate()
            .filter_map(|(id, conn)| conn.as_ref().map(|_| id))
            .collect()
    }

    /// Drop a closed connection slot.
    pub fn close(&mut self, id: usize) {
        if let Some(slot) = self.connections.get_mut(id) {
            if slot.take().is_some() {
                tracing::info!("closed connection {id}");
            }
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context("listener local_addr")
    }
}
