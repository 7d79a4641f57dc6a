//! # Relaycast Groups Crate
//!
//! In-memory group state for the relay: the connection-to-group registry and
//! the per-group message history. Both structures are process-local; nothing
//! here survives a restart, and there is no cross-node synchronization.
//!
//! Groups are created implicitly on first use and are never evicted - an
//! empty group keeps its (empty) history for the lifetime of the process.

pub mod history;
pub mod membership;

pub use history::{GroupHistory, HistoryEntry};
pub use membership::{ConnectionId, GroupMembership};
