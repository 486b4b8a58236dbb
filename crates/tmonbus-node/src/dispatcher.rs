use bytes::Bytes;
use tmonbus_frame::{
    command_name, decode_frame, encode_frame, encode_reply, is_valid_address, FrameError,
    FRAME_OVERHEAD, POLL, REPLY, REPLY_PAYLOAD_LEN,
};
use tracing::{trace, warn};

use crate::error::{NodeError, Result};
use crate::source::ReadingSource;

const REPLY_FRAME_SIZE: usize = FRAME_OVERHEAD + REPLY_PAYLOAD_LEN;

/// Build a complete REPLY frame for `address` from the source's current values.
fn build_reply_frame<S: ReadingSource + ?Sized>(
    address: u8,
    source: &S,
) -> std::result::Result<Bytes, FrameError> {
    let payload = encode_reply(&source.read_channels());
    let mut buf = [0u8; REPLY_FRAME_SIZE];
    let len = encode_frame(address, REPLY, &payload, &mut buf)?;
    Ok(Bytes::copy_from_slice(&buf[..len]))
}

/// Decide how a node at `my_address` answers one received burst.
///
/// Returns the REPLY frame to transmit, or an empty buffer for "no response".
/// Undecodable bursts, frames for other nodes and anything but POLL all
/// yield an empty buffer: on a shared bus those are normal traffic, not
/// errors of this node.
pub fn process<S>(my_address: u8, inbound: &[u8], source: &S) -> Bytes
where
    S: ReadingSource + ?Sized,
{
    respond(my_address, false, inbound, source)
}

fn respond<S: ReadingSource + ?Sized>(
    my_address: u8,
    promiscuous: bool,
    inbound: &[u8],
    source: &S,
) -> Bytes {
    let frame = match decode_frame(inbound) {
        Ok(frame) => frame,
        Err(err) => {
            trace!(error = %err, len = inbound.len(), "ignoring undecodable burst");
            return Bytes::new();
        }
    };

    if frame.address != my_address && !promiscuous {
        trace!(address = frame.address, "frame addressed to another node");
        return Bytes::new();
    }

    if frame.command != POLL {
        trace!(
            command = frame.command,
            command_name = command_name(frame.command),
            "not a POLL, no reply"
        );
        return Bytes::new();
    }

    // In promiscuous mode the reply carries the polled address.
    match build_reply_frame(frame.address, source) {
        Ok(reply) => reply,
        Err(err) => {
            warn!(error = %err, address = frame.address, "failed to build REPLY");
            Bytes::new()
        }
    }
}

/// POLL handler bound to one node address and one reading source.
///
/// Stateless across calls: every [`Dispatcher::process`] is a function of
/// the inbound bytes and the source's values at that moment. Shareable
/// between threads whenever the source is.
#[derive(Debug)]
pub struct Dispatcher<S> {
    address: u8,
    promiscuous: bool,
    source: S,
}

impl<S: ReadingSource> Dispatcher<S> {
    /// Create a dispatcher for a node at `address` (1-247).
    pub fn new(address: u8, source: S) -> Result<Self> {
        if !is_valid_address(address) {
            return Err(NodeError::InvalidAddress(address));
        }
        Ok(Self {
            address,
            promiscuous: false,
            source,
        })
    }

    /// Answer POLLs for every address, replying as the polled node.
    ///
    /// For simulators standing in for a whole bus of nodes.
    pub fn with_promiscuous(mut self, promiscuous: bool) -> Self {
        self.promiscuous = promiscuous;
        self
    }

    /// This node's address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Whether POLLs for other addresses are answered too.
    pub fn is_promiscuous(&self) -> bool {
        self.promiscuous
    }

    /// The reading source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Turn one inbound burst into the bytes to transmit.
    ///
    /// An empty result means "send nothing". Never fails.
    pub fn process(&self, inbound: &[u8]) -> Bytes {
        respond(self.address, self.promiscuous, inbound, &self.source)
    }

    /// Build an unsolicited REPLY with the current readings (push mode).
    pub fn build_reply(&self) -> Result<Bytes> {
        build_reply_frame(self.address, &self.source).map_err(Into::into)
    }
}
