//! Per-connection worker: handshake, authentication relay, forwarding.
//!
//! Each accepted connection gets its own Tokio task running this worker.
//! The flow is:
//!   1. Read the hello header → validate marker, role, session id
//!   2. Evict any stale same-role holder, claim the pair, send the ack
//!   3. Relay the authentication exchange tag by tag
//!   4. Once authenticated, forward every byte opaquely until the
//!      connection dies

use std::sync::Arc;

use orv_protocol::{
    parse_client_hello, render_handshake_ack, ACK_TERMINATOR, CLIENT_MARKER,
    ControlTag, ProtocolError, Role,
};
use orv_registry::{Peer, SessionRegistry};
use orv_transport::{Connection, TransportError};

use crate::server::ServerState;
use crate::RouterError;

/// Handles a single connection from accept to close.
///
/// Every exit path leaves the registry consistent: the peer's entry is
/// gone and its stream closed, with the paired side cascade-disconnected
/// on the fault paths that require it. The returned error is purely
/// informational — the server loop logs it and nothing else.
pub(crate) async fn handle_connection<C>(
    peer: Arc<Peer<C>>,
    state: Arc<ServerState<C>>,
) -> Result<(), RouterError>
where
    C: Connection<Error = TransportError>,
{
    let conn_id = peer.id();
    let registry = &state.registry;

    // Unconsumed bytes read from the stream but not yet interpreted.
    let mut buf: Vec<u8> = Vec::new();

    // --- Step 1: hello header ---
    let hello = loop {
        match peer.conn().recv().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            Ok(None) => {
                tracing::info!(
                    conn = %conn_id,
                    addr = peer.remote_addr(),
                    "connection closed before handshake"
                );
                registry.remove(conn_id).await;
                let _ = peer.conn().close().await;
                return Ok(());
            }
            Err(e) => {
                registry.remove(conn_id).await;
                let _ = peer.conn().close().await;
                return Err(RouterError::Transport(e));
            }
        }

        let header = String::from_utf8_lossy(&buf);
        if !header.contains(CLIENT_MARKER) {
            tracing::info!(
                conn = %conn_id,
                addr = peer.remote_addr(),
                "not an openrviewer client, closing"
            );
            registry.remove(conn_id).await;
            let _ = peer.conn().close().await;
            return Ok(());
        }
        match parse_client_hello(&header) {
            Ok(hello) => break hello,
            // A required delimiter may still be in flight.
            Err(ProtocolError::IncompleteHello) => continue,
            Err(e) => {
                tracing::info!(
                    conn = %conn_id,
                    addr = peer.remote_addr(),
                    error = %e,
                    "rejecting client hello"
                );
                safe_teardown(&peer, registry).await;
                return Err(RouterError::Protocol(e));
            }
        }
    };
    // Everything available was the header.
    buf.clear();

    // --- Step 2: claim the pair, acknowledge ---
    registry.evict_same_id(&hello.session_id, hello.role).await;
    peer.set_registered(&hello);
    tracing::info!(
        conn = %conn_id,
        role = %hello.role,
        session = %hello.session_id,
        version = %hello.user_agent,
        addr = peer.remote_addr(),
        "peer registered"
    );

    let mut ack = render_handshake_ack(1).into_bytes();
    ack.push(ACK_TERMINATOR);
    if let Err(e) = peer.conn().send(&ack).await {
        safe_teardown(&peer, registry).await;
        return Err(RouterError::Transport(e));
    }

    let role = hello.role;
    let session = hello.session_id;

    // --- Step 3: authentication relay ---
    loop {
        // A manager is flipped by the RCuser's worker through the
        // registry; from then on its bytes are payload, not tags.
        if peer.is_authenticated() {
            break;
        }

        if buf.is_empty() {
            match peer.conn().recv().await {
                Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
                Ok(None) => {
                    tracing::info!(
                        conn = %conn_id,
                        role = %role,
                        addr = peer.remote_addr(),
                        "client connection closed"
                    );
                    registry.remove(conn_id).await;
                    let _ = peer.conn().close().await;
                    return Ok(());
                }
                Err(e) => {
                    safe_teardown(&peer, registry).await;
                    return Err(RouterError::Transport(e));
                }
            }
            // The read may have completed after the flip.
            if peer.is_authenticated() {
                break;
            }
        }

        match ControlTag::from_byte(buf[0]) {
            Some(ControlTag::AuthPassword) => {
                let data = std::mem::take(&mut buf);
                if !registry.forward_to_peer(&data, role, &session).await {
                    safe_teardown(&peer, registry).await;
                    return Ok(());
                }
            }
            Some(ControlTag::AuthOk) => {
                // Only the controlled side may assert success.
                if role != Role::RcUser {
                    tracing::info!(
                        conn = %conn_id,
                        %session,
                        "auth-ok from manager side, closing"
                    );
                    safe_teardown(&peer, registry).await;
                    return Ok(());
                }
                let data = std::mem::take(&mut buf);
                if !registry.forward_to_peer(&data, role, &session).await {
                    safe_teardown(&peer, registry).await;
                    return Ok(());
                }
                registry.mark_peer_authenticated(&session).await;
                peer.set_authenticated(true);
                tracing::info!(%session, "pairing authenticated");
                break;
            }
            Some(ControlTag::AuthFailed) => {
                // Only the controlled side may assert failure.
                if role != Role::RcUser {
                    tracing::info!(
                        conn = %conn_id,
                        %session,
                        "auth-failed from manager side, closing"
                    );
                    safe_teardown(&peer, registry).await;
                    return Ok(());
                }
                tracing::info!(
                    %session,
                    "authentication rejected, disconnecting manager"
                );
                registry.disconnect_peer(role, &session).await;
                // The manager usually has not authenticated yet at this
                // point, which the cascade above skips; displace it the
                // same way a colliding registration would.
                registry.evict_same_id(&session, role.opposite()).await;
                buf.remove(0);
            }
            None => {
                // Unexpected byte before authentication: drop it and idle
                // briefly instead of spinning on the stream.
                buf.remove(0);
                tokio::time::sleep(state.config.auth_poll_interval).await;
            }
        }
    }

    // --- Step 4: transparent relay ---
    loop {
        let data = if buf.is_empty() {
            match peer.conn().recv().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => {
                    tracing::info!(
                        conn = %conn_id,
                        role = %role,
                        addr = peer.remote_addr(),
                        "client connection closed"
                    );
                    safe_teardown(&peer, registry).await;
                    return Ok(());
                }
                Err(e) => {
                    safe_teardown(&peer, registry).await;
                    return Err(RouterError::Transport(e));
                }
            }
        } else {
            std::mem::take(&mut buf)
        };

        if !registry.forward_to_peer(&data, role, &session).await {
            safe_teardown(&peer, registry).await;
            return Ok(());
        }
    }
}

/// Shared cleanup for violation and fault paths: cascade-disconnects the
/// paired side (a no-op while unpaired), removes this peer from the
/// table, resets it, and closes its stream.
async fn safe_teardown<C: Connection>(
    peer: &Arc<Peer<C>>,
    registry: &SessionRegistry<C>,
) {
    let status = peer.status();
    if let (Some(role), Some(session)) = (status.role, status.session) {
        registry.disconnect_peer(role, &session).await;
    }
    registry.remove(peer.id()).await;
    peer.clear_pairing();
    let _ = peer.conn().close().await;
}
