//! Room membership registry with broadcast fan-out.
//!
//! Architecture:
//! ```text
//! join / leave / leave_all ──► RwLock<MembershipIndex> (write)
//!
//! broadcast(packet, opts)
//!   1. stamp packet.nsp
//!   2. read lock ── resolve ids (dedup + except) ── unlock
//!   3. for each id: Namespace::lookup ─► Connection::deliver
//! ```
//!
//! All index mutations take the one write lock, so the connection and room
//! maps are never observed out of step. Delivery runs after the lock is
//! released; a `Connection` may call back into the registry.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::broadcast::{AtomicBroadcastStats, BroadcastOptions, BroadcastReport, BroadcastStats};
use crate::completion::Completion;
use crate::config::RegistryConfig;
use crate::ids::{ConnectionId, Room};
use crate::index::MembershipIndex;
use crate::namespace::{DeliveryError, Namespace};
use crate::packet::Packet;

/// Membership registry for one namespace.
pub struct MembershipRegistry<N: Namespace + ?Sized> {
    namespace: Arc<N>,
    index: RwLock<MembershipIndex>,
    stats: AtomicBroadcastStats,
}

impl<N: Namespace + ?Sized> MembershipRegistry<N> {
    pub fn new(namespace: Arc<N>) -> Self {
        Self::with_config(namespace, &RegistryConfig::default())
    }

    /// Size the index from `config.initial_capacity`.
    pub fn with_config(namespace: Arc<N>, config: &RegistryConfig) -> Self {
        Self {
            namespace,
            index: RwLock::new(MembershipIndex::with_capacity(config.initial_capacity)),
            stats: AtomicBroadcastStats::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MembershipIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MembershipIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `conn` to `room`, creating the room if needed.
    ///
    /// The membership is visible as soon as this returns. Awaiting the
    /// returned [`Completion`] is optional.
    pub fn join(&self, conn: &ConnectionId, room: &Room) -> Completion {
        if self.write().insert(conn, room) {
            log::trace!("{conn} joined {room} in {}", self.namespace.name());
        }
        Completion::new()
    }

    /// Remove `conn` from `room`. Unknown pairs are a no-op.
    ///
    /// The room is deleted once empty, and so is the connection's entry
    /// once it belongs to no room.
    pub fn leave(&self, conn: &ConnectionId, room: &Room) -> Completion {
        if self.write().remove(conn.as_str(), room.as_str()) {
            log::trace!("{conn} left {room} in {}", self.namespace.name());
        }
        Completion::new()
    }

    /// Remove `conn` from every room. Call this on disconnect.
    pub fn leave_all(&self, conn: &ConnectionId) {
        let rooms = self.write().remove_all(conn.as_str());
        if !rooms.is_empty() {
            log::trace!(
                "{conn} left {} rooms in {}",
                rooms.len(),
                self.namespace.name()
            );
        }
    }

    /// Send `packet` to every connection selected by `opts`, once each.
    ///
    /// Stale ids and failed deliveries are counted, never propagated.
    pub fn broadcast(&self, mut packet: Packet, opts: &BroadcastOptions) -> BroadcastReport {
        packet.nsp = self.namespace.name().to_owned();
        let packet = Arc::new(packet);

        let recipients = {
            let index = self.read();
            if opts.is_unscoped() {
                index.resolve_all(&opts.except)
            } else {
                index.resolve_rooms(&opts.rooms, &opts.except)
            }
        };

        let mut report = BroadcastReport {
            targeted: recipients.len(),
            ..BroadcastReport::default()
        };

        for id in &recipients {
            let Some(conn) = self.namespace.lookup(id) else {
                log::debug!("Skipping stale connection {id} in {}", packet.nsp);
                report.stale += 1;
                continue;
            };
            match conn.deliver(packet.clone(), opts.flags) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Full(_)) if opts.flags.volatile => {
                    log::trace!("Dropped volatile packet for {id}");
                    report.dropped += 1;
                }
                Err(e) => {
                    log::debug!("Delivery failed: {e}");
                    report.failed += 1;
                }
            }
        }

        self.stats.record(&report);
        report
    }

    /// Rooms `conn` currently belongs to.
    pub fn rooms_of(&self, conn: &ConnectionId) -> HashSet<Room> {
        self.read()
            .rooms_of(conn.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Connections currently in `room`.
    pub fn members_of(&self, room: &Room) -> HashSet<ConnectionId> {
        self.read()
            .members_of(room.as_str())
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_member(&self, conn: &ConnectionId, room: &Room) -> bool {
        self.read().contains(conn.as_str(), room.as_str())
    }

    /// Every non-empty room.
    pub fn rooms(&self) -> Vec<Room> {
        self.read().rooms().cloned().collect()
    }

    /// Every connection in at least one room.
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.read().connections().cloned().collect()
    }

    pub fn room_count(&self) -> usize {
        self.read().room_count()
    }

    pub fn connection_count(&self) -> usize {
        self.read().connection_count()
    }

    pub fn namespace(&self) -> &str {
        self.namespace.name()
    }

    /// Cumulative broadcast statistics.
    pub fn stats(&self) -> BroadcastStats {
        self.stats.snapshot()
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        self.read().assert_consistent();
    }
}
