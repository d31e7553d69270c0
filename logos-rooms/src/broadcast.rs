//! Broadcast options, per-call reports, and cumulative statistics.
//!
//! A broadcast is scoped by an ordered list of rooms (empty = every joined
//! connection) and filtered by an exclusion set. Recipient resolution lives
//! in [`crate::index::MembershipIndex`]; fan-out lives in
//! [`crate::registry::MembershipRegistry::broadcast`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ids::{ConnectionId, Room};

/// Delivery hints forwarded to every `Connection::deliver` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastFlags {
    /// Best-effort: a full connection buffer counts as a drop, not a failure
    pub volatile: bool,
    /// Transport may compress the frame
    pub compress: bool,
}

/// Who a broadcast targets.
#[derive(Debug, Clone, Default)]
pub struct BroadcastOptions {
    /// Rooms in iteration order. Empty targets every joined connection.
    pub rooms: Vec<Room>,
    /// Connections that never receive this broadcast
    pub except: HashSet<ConnectionId>,
    pub flags: BroadcastFlags,
}

impl BroadcastOptions {
    /// Unscoped broadcast with no exclusions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target room. Repeats are harmless.
    pub fn to(mut self, room: impl Into<Room>) -> Self {
        self.rooms.push(room.into());
        self
    }

    /// Exclude a connection.
    pub fn except(mut self, conn: impl Into<ConnectionId>) -> Self {
        self.except.insert(conn.into());
        self
    }

    pub fn volatile(mut self) -> Self {
        self.flags.volatile = true;
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.flags.compress = compress;
        self
    }

    /// True if no rooms were named.
    pub fn is_unscoped(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// Outcome of a single broadcast call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Distinct ids resolved from the index after exclusion
    pub targeted: usize,
    /// Successful `deliver` calls
    pub delivered: usize,
    /// Ids the namespace no longer knows
    pub stale: usize,
    /// Volatile packets a full connection refused
    pub dropped: usize,
    /// `deliver` returned an error
    pub failed: usize,
}

/// Statistics for monitoring broadcast health.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    pub broadcasts: u64,
    pub delivered: u64,
    pub stale: u64,
    pub dropped: u64,
    pub failed: u64,
}

/// Atomic broadcast stats, updated once per broadcast without taking the
/// registry lock. Read via `snapshot()`.
#[derive(Debug, Default)]
pub(crate) struct AtomicBroadcastStats {
    broadcasts: AtomicU64,
    delivered: AtomicU64,
    stale: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

impl AtomicBroadcastStats {
    pub(crate) fn record(&self, report: &BroadcastReport) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.stale.fetch_add(report.stale as u64, Ordering::Relaxed);
        self.dropped.fetch_add(report.dropped as u64, Ordering::Relaxed);
        self.failed.fetch_add(report.failed as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BroadcastStats {
        BroadcastStats {
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
