//! # logos-rooms — Room membership and broadcast fan-out for Logos
//!
//! Tracks which connections are in which rooms and fans packets out to
//! room members, each recipient at most once per broadcast.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────┐  lookup(id)  ┌──────────────┐
//! │ MembershipRegistry │ ───────────► │ Namespace    │
//! │  RwLock<Index>     │              │ (live conns) │
//! └─────────┬──────────┘              └──────┬───────┘
//!           │                                │
//!           ▼                                ▼
//! ┌────────────────────┐              ┌──────────────┐
//! │ MembershipIndex    │              │ Connection   │
//! │ conn → {rooms}     │              │ deliver()    │
//! │ room → {conns}     │              └──────────────┘
//! └────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`index`] — Bidirectional membership index and recipient resolution
//! - [`registry`] — Locked registry: join / leave / leave_all / broadcast
//! - [`broadcast`] — Broadcast options, reports and statistics
//! - [`namespace`] — `Namespace` / `Connection` traits and in-memory impls
//! - [`packet`] — Broadcast packet and bincode codec
//! - [`completion`] — Awaitable join/leave completion
//! - [`config`] — Registry configuration
//! - [`ids`] — Connection and room identifiers

pub mod broadcast;
pub mod completion;
pub mod config;
pub mod ids;
pub mod index;
pub mod namespace;
pub mod packet;
pub mod registry;

// Re-exports for convenience
pub use broadcast::{BroadcastFlags, BroadcastOptions, BroadcastReport, BroadcastStats};
pub use completion::Completion;
pub use config::RegistryConfig;
pub use ids::{ConnectionId, Room};
pub use index::MembershipIndex;
pub use namespace::{
    ChannelConnection, Connection, Delivery, DeliveryError, LocalNamespace, Namespace,
};
pub use packet::{Packet, PacketError};
pub use registry::MembershipRegistry;
