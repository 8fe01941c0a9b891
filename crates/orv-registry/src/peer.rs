//! Per-connection peer state.

use std::sync::{Arc, Mutex, PoisonError};

use orv_protocol::{ClientHello, Role, SessionId};
use orv_transport::{Connection, ConnectionId};

/// The mutable pairing fields of a peer.
///
/// `session == None` is the unpaired state: such a peer participates in
/// no pairing and is never a forwarding or cascade-disconnect target.
/// `session` only ever moves from a real value back to `None` (on
/// teardown or eviction), never between two real values.
#[derive(Debug, Clone, Default)]
pub struct PeerStatus {
    /// Which side of a pairing this connection is. Set once during the
    /// handshake, never changed afterwards.
    pub role: Option<Role>,
    /// The claimed session identifier, or `None` while unpaired.
    pub session: Option<SessionId>,
    /// The handshake header was parsed successfully.
    pub registered: bool,
    /// The authentication handshake has completed for this connection.
    pub authenticated: bool,
    /// Client-reported version text (informational).
    pub client_version: String,
}

/// One accepted connection: its stream handle plus shared pairing state.
///
/// The owning worker task is the only reader of the stream; writes reach
/// the stream from any task through the registry. The status fields are
/// behind a std `Mutex` — every critical section is a handful of field
/// reads or writes with no await inside.
pub struct Peer<C: Connection> {
    conn: Arc<C>,
    status: Mutex<PeerStatus>,
}

impl<C: Connection> Peer<C> {
    /// Wraps a freshly accepted connection in an unpaired peer.
    pub fn new(conn: C) -> Arc<Self> {
        Arc::new(Self {
            conn: Arc::new(conn),
            status: Mutex::new(PeerStatus::default()),
        })
    }

    /// The connection's unique identifier.
    pub fn id(&self) -> ConnectionId {
        self.conn.id()
    }

    /// The underlying stream handle.
    pub fn conn(&self) -> &Arc<C> {
        &self.conn
    }

    /// The remote address, for logging.
    pub fn remote_addr(&self) -> &str {
        self.conn.remote_addr()
    }

    /// Snapshot of the current status fields.
    pub fn status(&self) -> PeerStatus {
        self.lock().clone()
    }

    /// This peer's role, if the handshake has set one.
    pub fn role(&self) -> Option<Role> {
        self.lock().role
    }

    /// This peer's session identifier, or `None` while unpaired.
    pub fn session(&self) -> Option<SessionId> {
        self.lock().session.clone()
    }

    /// Whether the authentication handshake has completed.
    pub fn is_authenticated(&self) -> bool {
        self.lock().authenticated
    }

    /// Marks the handshake as completed: claims the session identifier,
    /// fixes the role, and records the client version.
    pub fn set_registered(&self, hello: &ClientHello) {
        let mut status = self.lock();
        status.role = Some(hello.role);
        status.session = Some(hello.session_id.clone());
        status.registered = true;
        status.client_version = hello.user_agent.clone();
    }

    /// Flips the authenticated flag.
    pub fn set_authenticated(&self, authenticated: bool) {
        self.lock().authenticated = authenticated;
    }

    /// Returns the peer to the unpaired state: drops the session claim
    /// and the authenticated flag. Role and registration stick — a
    /// connection's role never changes once set.
    pub fn clear_pairing(&self) {
        let mut status = self.lock();
        status.session = None;
        status.authenticated = false;
    }

    /// Whether this peer currently holds the given (session, role) pair.
    /// Unpaired peers match nothing.
    pub fn matches(&self, session: &SessionId, role: Role) -> bool {
        let status = self.lock();
        status.role == Some(role) && status.session.as_ref() == Some(session)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PeerStatus> {
        // A panic while holding this lock leaves only plain data behind;
        // the poisoned state carries no torn invariant worth dying for.
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =========================================================================
// Tests
// =========================================================================
