//! Peer state and session registry for the OpenRViewer router.
//!
//! This crate is the only place where one connection's task reaches
//! across to another connection:
//!
//! 1. **Peer state** ([`Peer`], [`PeerStatus`]) — one record per accepted
//!    connection: its stream handle plus the pairing fields (role,
//!    session, registered/authenticated flags) that other tasks may read
//!    and reset.
//! 2. **Registry** ([`SessionRegistry`]) — the process-wide table of live
//!    peers, addressed only by (session identifier, role). All
//!    cross-connection effects — pairing eviction, authentication
//!    propagation, cascade disconnects, byte forwarding — are atomic
//!    operations on this table.
//!
//! # How it fits in the stack
//!
//! ```text
//! Router worker loop (above)  ← drives the per-connection state machine
//!     ↕
//! Registry layer (this crate) ← locates and affects the paired connection
//!     ↕
//! Transport layer (below)     ← provides the encrypted byte streams
//! ```

mod peer;
mod registry;

pub use peer::{Peer, PeerStatus};
pub use registry::SessionRegistry;
