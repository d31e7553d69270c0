//! Collaborators the registry delivers through.
//!
//! ```text
//! MembershipRegistry ──lookup(id)──► Namespace ──► Arc<dyn Connection>
//!                                                        │
//!                                              deliver(packet, flags)
//!                                                        ▼
//!                                                    transport
//! ```
//!
//! The registry only knows ids. A [`Namespace`] maps ids to live
//! connections, and a [`Connection`] hands packets to whatever transport
//! backs it. [`LocalNamespace`] and [`ChannelConnection`] are the in-process
//! implementations.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;

use crate::broadcast::BroadcastFlags;
use crate::config::RegistryConfig;
use crate::ids::ConnectionId;
use crate::packet::Packet;

/// A live client connection.
///
/// `deliver` must not block. An error is reported to the registry's
/// statistics and never surfaces to the broadcaster.
pub trait Connection: Send + Sync {
    fn id(&self) -> &ConnectionId;

    fn deliver(&self, packet: Arc<Packet>, flags: BroadcastFlags) -> Result<(), DeliveryError>;
}

/// Owner of a name and the set of live connections.
pub trait Namespace: Send + Sync {
    fn name(&self) -> &str;

    /// `None` if `id` has disconnected.
    fn lookup(&self, id: &ConnectionId) -> Option<Arc<dyn Connection>>;
}

/// Why a single delivery failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Connection {0} is closed")]
    Closed(ConnectionId),
    #[error("Connection {0} buffer is full")]
    Full(ConnectionId),
}

// ───────────────────────────────────────────────────────────────────
// Channel-backed connection
// ───────────────────────────────────────────────────────────────────

/// What a [`ChannelConnection`] receiver gets per broadcast.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub packet: Arc<Packet>,
    pub flags: BroadcastFlags,
}

/// Connection backed by a bounded tokio mpsc channel.
///
/// The receiving half is typically drained by the task that owns the
/// socket writer.
#[derive(Debug, Clone)]
pub struct ChannelConnection {
    id: ConnectionId,
    sender: mpsc::Sender<Delivery>,
}

impl ChannelConnection {
    /// Open a connection that buffers up to `capacity` deliveries.
    pub fn open(id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<Delivery>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { id, sender }, receiver)
    }

    /// Open with `config.connection_buffer` as the capacity.
    pub fn open_with(id: ConnectionId, config: &RegistryConfig) -> (Self, mpsc::Receiver<Delivery>) {
        Self::open(id, config.connection_buffer)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl Connection for ChannelConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn deliver(&self, packet: Arc<Packet>, flags: BroadcastFlags) -> Result<(), DeliveryError> {
        self.sender
            .try_send(Delivery { packet, flags })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => DeliveryError::Full(self.id.clone()),
                mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed(self.id.clone()),
            })
    }
}

// ───────────────────────────────────────────────────────────────────
// In-process namespace
// ───────────────────────────────────────────────────────────────────

/// Namespace holding its live connections in memory.
///
/// Disconnecting here does not touch room membership; pair it with
/// `MembershipRegistry::leave_all`.
pub struct LocalNamespace {
    name: String,
    connected: RwLock<HashMap<ConnectionId, Arc<dyn Connection>>>,
}

impl LocalNamespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connected: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self {
            name: config.namespace.clone(),
            connected: RwLock::new(HashMap::with_capacity(config.initial_capacity)),
        }
    }

    /// Register a live connection, replacing any previous one with the same id.
    pub fn connect(&self, conn: Arc<dyn Connection>) {
        let id = conn.id().clone();
        let replaced = self
            .connected
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), conn);
        if replaced.is_some() {
            log::warn!("Connection {id} reconnected to namespace {}", self.name);
        } else {
            log::info!("Connection {id} joined namespace {}", self.name);
        }
    }

    /// Forget a connection. Returns it if it was connected.
    pub fn disconnect(&self, id: &ConnectionId) -> Option<Arc<dyn Connection>> {
        let removed = self
            .connected
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if removed.is_some() {
            log::info!("Connection {id} left namespace {}", self.name);
        }
        removed
    }

    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.connected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn connection_count(&self) -> usize {
        self.connected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Namespace for LocalNamespace {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, id: &ConnectionId) -> Option<Arc<dyn Connection>> {
        self.connected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}
