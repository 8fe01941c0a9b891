//! The session registry: the process-wide table of live peers.
//!
//! Pairings have no direct reference between their two sides — a
//! (session identifier, role) pair is the only addressing scheme, and
//! every cross-connection action is a scan of this table. All operations
//! take the single registry lock for the full scan-and-mutate, so a
//! forward can never interleave with an eviction or cascade disconnect
//! on the same pairing and write to a stream that is already being torn
//! down.

use std::sync::Arc;

use tokio::sync::Mutex;

use orv_protocol::{Role, SessionId};
use orv_transport::{Connection, ConnectionId};

use crate::Peer;

/// The table of all live peer connections.
///
/// One instance per process, created at startup and shared (`Arc`) with
/// the listener and every connection worker. Nothing in it survives a
/// restart.
pub struct SessionRegistry<C: Connection> {
    peers: Mutex<Vec<Arc<Peer<C>>>>,
}

impl<C: Connection> SessionRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            peers: Mutex::new(Vec::new()),
        }
    }

    /// Adds a peer to the table. No dedup happens here — colliding
    /// (session, role) holders are displaced by [`evict_same_id`]
    /// before a new connection claims the pair.
    ///
    /// [`evict_same_id`]: SessionRegistry::evict_same_id
    pub async fn register(&self, peer: Arc<Peer<C>>) {
        self.peers.lock().await.push(peer);
    }

    /// Number of live entries. Read at the accept decision point to
    /// enforce the session cap; advisory only, not atomic against
    /// concurrent accepts.
    pub async fn len(&self) -> usize {
        self.peers.lock().await.len()
    }

    /// Returns `true` if the table is empty.
    pub async fn is_empty(&self) -> bool {
        self.peers.lock().await.is_empty()
    }

    /// Unconditionally drops a peer from the table (normal teardown).
    pub async fn remove(&self, id: ConnectionId) {
        self.peers.lock().await.retain(|p| p.id() != id);
    }

    /// Displaces every holder of the given (session, role) pair: resets
    /// it to unpaired and closes its stream. The entry itself stays in
    /// the table until its own worker observes the close and removes it.
    /// No-op when nothing matches.
    pub async fn evict_same_id(&self, session: &SessionId, role: Role) {
        let peers = self.peers.lock().await;
        for peer in peers.iter() {
            if peer.matches(session, role) {
                tracing::info!(
                    conn = %peer.id(),
                    %role,
                    %session,
                    "evicting stale holder of session"
                );
                peer.clear_pairing();
                if let Err(e) = peer.conn().close().await {
                    tracing::debug!(conn = %peer.id(), error = %e, "close failed");
                }
            }
        }
    }

    /// Flips `authenticated` on every MANAGER peer of the session. The
    /// RCuser side flips its own flag in its worker — only the manager
    /// learns of success through the registry.
    pub async fn mark_peer_authenticated(&self, session: &SessionId) {
        let peers = self.peers.lock().await;
        for peer in peers.iter() {
            if peer.matches(session, Role::Manager) {
                peer.set_authenticated(true);
            }
        }
    }

    /// Cascade disconnect: tears down every *authenticated* peer on the
    /// opposite side of the sender's pairing — resets it to unpaired,
    /// closes its stream, and removes it from the table.
    pub async fn disconnect_peer(&self, sender_role: Role, session: &SessionId) {
        let mut peers = self.peers.lock().await;
        Self::disconnect_peer_locked(&mut peers, sender_role, session).await;
    }

    /// Forwards bytes to every peer on the opposite side of the sender's
    /// pairing, flushing each write.
    ///
    /// A failed write is terminal for the pairing: the sender's cascade
    /// disconnect runs, then the failing target itself is force-closed
    /// and removed (covering targets the cascade's `authenticated`
    /// filter would skip). The fault is logged, never propagated.
    ///
    /// Returns `false` if any write failed, so the calling worker can
    /// tear its own side down as well.
    pub async fn forward_to_peer(
        &self,
        data: &[u8],
        sender_role: Role,
        session: &SessionId,
    ) -> bool {
        let mut peers = self.peers.lock().await;
        let targets: Vec<Arc<Peer<C>>> = peers
            .iter()
            .filter(|p| p.matches(session, sender_role.opposite()))
            .cloned()
            .collect();

        let mut delivered = true;
        for target in targets {
            if !target.is_authenticated() {
                tracing::debug!(
                    len = data.len(),
                    to = %target.id(),
                    role = %sender_role.opposite(),
                    "forwarding pre-auth bytes"
                );
            }
            if let Err(e) = target.conn().send(data).await {
                tracing::error!(
                    to = %target.id(),
                    addr = target.remote_addr(),
                    %session,
                    error = %e,
                    "forward to peer failed"
                );
                delivered = false;
                Self::disconnect_peer_locked(&mut peers, sender_role, session)
                    .await;
                target.clear_pairing();
                if let Err(e) = target.conn().close().await {
                    tracing::debug!(conn = %target.id(), error = %e, "close failed");
                }
                peers.retain(|p| p.id() != target.id());
            }
        }
        delivered
    }

    /// Whether an RCuser peer currently holds this session.
    pub async fn rcuser_connected(&self, session: &SessionId) -> bool {
        let peers = self.peers.lock().await;
        peers.iter().any(|p| p.matches(session, Role::RcUser))
    }

    /// Whether the RCuser peer of this session has authenticated.
    pub async fn rcuser_authenticated(&self, session: &SessionId) -> bool {
        let peers = self.peers.lock().await;
        peers
            .iter()
            .any(|p| p.matches(session, Role::RcUser) && p.is_authenticated())
    }

    /// Body of [`disconnect_peer`](Self::disconnect_peer), callable with
    /// the table lock already held (the forward failure path runs inside
    /// the forwarding scan's critical section).
    async fn disconnect_peer_locked(
        peers: &mut Vec<Arc<Peer<C>>>,
        sender_role: Role,
        session: &SessionId,
    ) {
        let victims: Vec<Arc<Peer<C>>> = peers
            .iter()
            .filter(|p| {
                p.matches(session, sender_role.opposite()) && p.is_authenticated()
            })
            .cloned()
            .collect();

        for victim in &victims {
            tracing::info!(
                conn = %victim.id(),
                addr = victim.remote_addr(),
                %session,
                "cascade disconnecting peer"
            );
            victim.clear_pairing();
            if let Err(e) = victim.conn().close().await {
                tracing::debug!(conn = %victim.id(), error = %e, "close failed");
            }
        }
        peers.retain(|p| !victims.iter().any(|v| v.id() == p.id()));
    }
}

impl<C: Connection> Default for SessionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
