//! Broadcast packet and its binary codec.
//!
//! Wire format (bincode-encoded, standard config):
//! ```text
//! ┌──────────┬──────────┬──────────┐
//! │ nsp      │ event    │ data     │
//! │ varint + │ varint + │ varint + │
//! │ utf-8    │ utf-8    │ bytes    │
//! └──────────┴──────────┴──────────┘
//! ```
//!
//! The registry never looks inside `data`; it only stamps `nsp` before
//! fan-out. Encoding is offered for transports that frame packets
//! themselves.

use serde::{Deserialize, Serialize};

/// A message fanned out to connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Owning namespace, stamped by the registry at broadcast time
    pub nsp: String,
    /// Event name the receiver dispatches on
    pub event: String,
    /// Opaque payload
    pub data: Vec<u8>,
}

impl Packet {
    /// Create an event packet. `nsp` stays empty until broadcast.
    pub fn event(event: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            nsp: String::new(),
            event: event.into(),
            data: data.into(),
        }
    }

    /// Serialize to binary wire format.
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| PacketError::Encode(e.to_string()))
    }

    /// Deserialize from binary wire format.
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        let (packet, read) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| PacketError::Decode(e.to_string()))?;
        if read != bytes.len() {
            return Err(PacketError::TrailingBytes(bytes.len() - read));
        }
        Ok(packet)
    }
}

/// Packet codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("Packet encode error: {0}")]
    Encode(String),
    #[error("Packet decode error: {0}")]
    Decode(String),
    #[error("Packet has {0} trailing bytes")]
    TrailingBytes(usize),
}
