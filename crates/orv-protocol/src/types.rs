//! Core wire types: connection roles, session identifiers, control tags.

use std::fmt;

use crate::ProtocolError;

/// Exact length of a session identifier, in bytes.
pub const SESSION_ID_LEN: usize = 14;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Which side of a remote-control pairing a connection is.
///
/// Set once during the handshake and never changed afterwards. Every
/// registry operation that reaches "across" a pairing addresses the
/// *opposite* role under the same session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The machine being remotely controlled.
    RcUser,
    /// The controlling operator.
    Manager,
}

impl Role {
    /// Returns the other side of a pairing.
    pub fn opposite(self) -> Role {
        match self {
            Role::RcUser => Role::Manager,
            Role::Manager => Role::RcUser,
        }
    }

    /// Parses the role text of the hello cookie. Strictly `MANAGER` or
    /// `RCUSER`; anything else is a protocol violation.
    pub fn from_cookie(text: &str) -> Result<Role, ProtocolError> {
        match text {
            "MANAGER" => Ok(Role::Manager),
            "RCUSER" => Ok(Role::RcUser),
            other => Err(ProtocolError::InvalidRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::RcUser => write!(f, "RCuser"),
            Role::Manager => write!(f, "manager"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A validated 14-character session identifier.
///
/// The identifier is opaque to the router — it only ever compares them
/// for equality. Using a newtype (rather than a bare `String` with a
/// reserved "no session" value) means the unpaired state is expressed as
/// `Option<SessionId>` and can never collide with a real identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Validates and wraps a raw identifier.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidSessionIdLength`] unless the text
    /// is exactly [`SESSION_ID_LEN`] bytes.
    pub fn parse(raw: &str) -> Result<SessionId, ProtocolError> {
        if raw.len() != SESSION_ID_LEN {
            return Err(ProtocolError::InvalidSessionIdLength(raw.len()));
        }
        Ok(SessionId(raw.to_string()))
    }

    /// Returns the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ControlTag
// ---------------------------------------------------------------------------

/// Single-byte message tags, meaningful only before a connection is
/// authenticated. Once both sides of a pairing are authenticated, every
/// byte is opaque relayed payload and no tag is ever inspected again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlTag {
    /// A password attempt travelling from the manager to the RCuser.
    AuthPassword,
    /// The RCuser accepted the password.
    AuthOk,
    /// The RCuser rejected the password.
    AuthFailed,
}

impl ControlTag {
    /// Maps a wire byte to its tag, if it is one.
    pub const fn from_byte(byte: u8) -> Option<ControlTag> {
        match byte {
            2 => Some(ControlTag::AuthPassword),
            3 => Some(ControlTag::AuthOk),
            4 => Some(ControlTag::AuthFailed),
            _ => None,
        }
    }

    /// The wire value of this tag.
    pub const fn as_byte(self) -> u8 {
        match self {
            ControlTag::AuthPassword => 2,
            ControlTag::AuthOk => 3,
            ControlTag::AuthFailed => 4,
        }
    }
}

// ---------------------------------------------------------------------------
// ClientHello
// ---------------------------------------------------------------------------

/// The parsed contents of a client's handshake header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    /// The client's self-reported version string (informational).
    pub user_agent: String,
    /// Which side of a pairing this connection wants to be.
    pub role: Role,
    /// The session identifier it wants to claim.
    pub session_id: SessionId,
}

// =========================================================================
// Tests
// =========================================================================
