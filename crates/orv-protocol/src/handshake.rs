//! Handshake codec: hello-header parsing and acknowledgement rendering.
//!
//! The hello a client sends is HTTP-shaped text, but it is not parsed as
//! HTTP — only three fields matter, each delimited by fixed marker
//! substrings. The acknowledgement the router sends back reproduces the
//! original router's reply byte-for-byte (including its quirk of
//! concatenating header fields with no separator) so that deployed
//! manager/RCuser clients keep recognizing it.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::{ClientHello, ProtocolError, Role, SessionId};

/// Substring every OpenRViewer hello must contain. A header without it
/// belongs to some other protocol and the connection is closed outright.
pub const CLIENT_MARKER: &str = "/openrviewer/";

/// The single byte that terminates the handshake acknowledgement.
pub const ACK_TERMINATOR: u8 = 0x00;

/// Router protocol version advertised in the acknowledgement.
pub const ORV_VERSION: &str = "0.01";

const USER_AGENT_KEY: &str = "User-Agent: ";
const USER_AGENT_END: &str = " Accept:";
const COOKIE_KEY: &str = "Cookie: ";
const SESSION_ID_END: &str = " Pragma: ";

// ---------------------------------------------------------------------------
// Hello parsing
// ---------------------------------------------------------------------------

/// Parses a client hello header.
///
/// Field boundary rules:
/// - the `User-Agent: ` value runs to the next ` Accept:` occurrence;
/// - the `Cookie: ` value is `<ROLE>=<identifier>` where ROLE is the text
///   before the first `=` and the identifier runs to the next
///   ` Pragma: ` occurrence, trimmed.
///
/// # Errors
/// - [`ProtocolError::NotRViewerClient`] — marker missing.
/// - [`ProtocolError::IncompleteHello`] — marker present but a delimiter
///   has not arrived yet; the caller should read more bytes and retry.
/// - [`ProtocolError::InvalidRole`] / [`ProtocolError::InvalidSessionIdLength`]
///   — protocol violations; the connection must be torn down.
pub fn parse_client_hello(header: &str) -> Result<ClientHello, ProtocolError> {
    if !header.contains(CLIENT_MARKER) {
        return Err(ProtocolError::NotRViewerClient);
    }

    let ua_start = header
        .find(USER_AGENT_KEY)
        .ok_or(ProtocolError::IncompleteHello)?
        + USER_AGENT_KEY.len();
    let ua_end = header[ua_start..]
        .find(USER_AGENT_END)
        .ok_or(ProtocolError::IncompleteHello)?
        + ua_start;
    let user_agent = header[ua_start..ua_end].trim().to_string();

    let cookie_start = header
        .find(COOKIE_KEY)
        .ok_or(ProtocolError::IncompleteHello)?
        + COOKIE_KEY.len();
    let eq = header[cookie_start..]
        .find('=')
        .ok_or(ProtocolError::IncompleteHello)?
        + cookie_start;
    let id_end = header[eq..]
        .find(SESSION_ID_END)
        .ok_or(ProtocolError::IncompleteHello)?
        + eq;

    let role = Role::from_cookie(header[cookie_start..eq].trim())?;
    let session_id = SessionId::parse(header[eq + 1..id_end].trim())?;

    Ok(ClientHello {
        user_agent,
        role,
        session_id,
    })
}

// ---------------------------------------------------------------------------
// Acknowledgement rendering
// ---------------------------------------------------------------------------

/// Renders the handshake acknowledgement header for the current time.
///
/// The caller appends [`ACK_TERMINATOR`] as the one-byte payload that
/// `Content-Length` announces.
pub fn render_handshake_ack(content_length: usize) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    render_handshake_ack_at(content_length, now)
}

/// Renders the acknowledgement for a fixed timestamp (seconds since the
/// Unix epoch). Split out so tests can pin the Date field.
pub fn render_handshake_ack_at(content_length: usize, unix_secs: u64) -> String {
    format!(
        "HTTP/1.1 200 OK\
         Date: {date}\
         Content-Type: application/octet-stream\
         Accept-Ranges: bytes\
         Age: 0\
         ORV-Version: {version}\
         Cache-Control: private\
         Connection: keep-alive\
         Content-Encoding: gzip\
         Content-Length: {content_length}\n\n",
        date = http_date(unix_secs),
        version = ORV_VERSION,
    )
}

/// Formats an upper-cased RFC-1123-style date, e.g.
/// `THU, 01 JAN 1970 00:00:00 GMT`.
fn http_date(unix_secs: u64) -> String {
    const WEEKDAYS: [&str; 7] = ["THU", "FRI", "SAT", "SUN", "MON", "TUE", "WED"];
    const MONTHS: [&str; 12] = [
        "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT",
        "NOV", "DEC",
    ];

    let days = (unix_secs / 86_400) as i64;
    let secs_of_day = unix_secs % 86_400;
    let (year, month, day) = civil_from_days(days);

    format!(
        "{}, {:02} {} {} {:02}:{:02}:{:02} GMT",
        WEEKDAYS[(days % 7) as usize],
        day,
        MONTHS[(month - 1) as usize],
        year,
        secs_of_day / 3600,
        (secs_of_day % 3600) / 60,
        secs_of_day % 60,
    )
}

/// Converts days since 1970-01-01 to a (year, month, day) civil date.
/// Standard era-based algorithm, valid far beyond any plausible clock.
fn civil_from_days(days: i64) -> (i64, usize, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as usize;
    (if month <= 2 { year + 1 } else { year }, month, day)
}

// =========================================================================
// Tests
// =========================================================================
