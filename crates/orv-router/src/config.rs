//! Router configuration.

use std::time::Duration;

/// Tunables for a running router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Maximum concurrent registry entries. Checked at each accept
    /// decision point; while at the cap, new connections are simply not
    /// accepted until the count drops.
    pub max_sessions: usize,

    /// How long a worker idles after an unrecognized pre-authentication
    /// byte before looking at the stream again.
    pub auth_poll_interval: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_sessions: 1024,
            auth_poll_interval: Duration::from_millis(100),
        }
    }
}
