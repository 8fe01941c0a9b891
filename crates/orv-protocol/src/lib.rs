//! Wire protocol for the OpenRViewer rendezvous router.
//!
//! This crate defines the small, fixed vocabulary the router and its
//! clients speak:
//!
//! - **Types** ([`Role`], [`SessionId`], [`ControlTag`], [`ClientHello`]) —
//!   the identity and message-tag values that appear on the wire.
//! - **Handshake codec** ([`parse_client_hello`], [`render_handshake_ack`]) —
//!   parsing the HTTP-shaped hello header and rendering the fixed
//!   acknowledgement that precedes relaying.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while parsing.
//!
//! Everything here is pure and stateless. Once a pairing is
//! authenticated, no type in this crate is consulted again — relayed
//! traffic is opaque bytes.

mod error;
mod handshake;
mod types;

pub use error::ProtocolError;
pub use handshake::{
    parse_client_hello, render_handshake_ack, ACK_TERMINATOR, CLIENT_MARKER,
    ORV_VERSION,
};
pub use types::{ClientHello, ControlTag, Role, SessionId, SESSION_ID_LEN};
