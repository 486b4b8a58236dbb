use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::BusLink;

/// Receive buffer size. Larger than any legal frame so oversized datagrams
/// arrive whole and are rejected by the decoder instead of being truncated
/// into something that might parse.
const RECV_BUFFER_SIZE: usize = 1024;

/// `set_read_timeout` rejects zero; poll with the shortest useful wait instead.
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// UDP link: the IP-tunneled equivalent of the RS-485 line.
///
/// Each datagram carries exactly one frame, so no boundary inference is
/// needed. A link created with [`UdpLink::bind`] replies to whoever it heard
/// from last; one created with [`UdpLink::connect`] always talks to the same
/// peer and ignores datagrams from anyone else.
pub struct UdpLink {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
    fixed_peer: bool,
    buf: Box<[u8]>,
}

impl UdpLink {
    /// Bind to a local address and learn the peer from incoming traffic.
    pub fn bind(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<Self> {
        let socket = UdpSocket::bind(&addr).map_err(|source| TransportError::Bind {
            addr: format!("{addr:?}"),
            source,
        })?;
        let link = Self::from_socket(socket, None);
        info!(local = ?link.local_addr().ok(), "udp link bound");
        Ok(link)
    }

    /// Bind to `local` and exchange datagrams with `peer` only.
    pub fn connect(
        local: impl ToSocketAddrs + std::fmt::Debug,
        peer: impl ToSocketAddrs + std::fmt::Debug,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(&local).map_err(|source| TransportError::Bind {
            addr: format!("{local:?}"),
            source,
        })?;
        let peer_addr = peer
            .to_socket_addrs()
            .and_then(|mut addrs| {
                addrs.next().ok_or_else(|| {
                    std::io::Error::new(ErrorKind::InvalidInput, "peer resolved to no address")
                })
            })
            .map_err(|source| TransportError::Connect {
                addr: format!("{peer:?}"),
                source,
            })?;
        socket
            .connect(peer_addr)
            .map_err(|source| TransportError::Connect {
                addr: peer_addr.to_string(),
                source,
            })?;
        debug!(%peer_addr, "udp link connected");
        Ok(Self::from_socket(socket, Some(peer_addr)))
    }

    fn from_socket(socket: UdpSocket, peer: Option<SocketAddr>) -> Self {
        Self {
            socket,
            fixed_peer: peer.is_some(),
            peer,
            buf: vec![0u8; RECV_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Local socket address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Into::into)
    }

    /// Address replies currently go to, if any.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Send the next datagram to `peer` regardless of who was heard last.
    ///
    /// Used by push-mode nodes that never receive anything.
    pub fn set_peer(&mut self, peer: SocketAddr) {
        self.peer = Some(peer);
    }
}

impl BusLink for UdpLink {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        let peer = self.peer.ok_or(TransportError::NoPeer)?;
        let sent = if self.fixed_peer {
            self.socket.send(frame)?
        } else {
            self.socket.send_to(frame, peer)?
        };
        if sent != frame.len() {
            return Err(TransportError::ShortSend {
                peer,
                sent,
                len: frame.len(),
            });
        }
        trace!(%peer, len = frame.len(), "sent datagram");
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Bytes>> {
        self.socket.set_read_timeout(Some(timeout.max(MIN_TIMEOUT)))?;
        let (len, from) = match self.socket.recv_from(&mut self.buf) {
            Ok(received) => received,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Ok(None)
            }
            // A previous send to a closed port surfaces here on some platforms.
            Err(err) if err.kind() == ErrorKind::ConnectionRefused => return Ok(None),
            Err(err) => return Err(TransportError::Io(err)),
        };

        if !self.fixed_peer {
            self.peer = Some(from);
        }
        trace!(%from, len, "received datagram");
        Ok(Some(Bytes::copy_from_slice(&self.buf[..len])))
    }
}

impl std::fmt::Debug for UdpLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpLink")
            .field("local", &self.socket.local_addr().ok())
            .field("peer", &self.peer)
            .field("fixed_peer", &self.fixed_peer)
            .finish()
    }
}
