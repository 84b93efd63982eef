//! Reconstruction of the server's truncated message timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the UNIX epoch.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Rebuilds a full-width timestamp from the server's truncated value.
///
/// The server sends only the low 32 bits of the message time. The high
/// bits are taken from `now_millis`, on the assumption that the
/// message is recent. This is not a wraparound-safe reconstruction:
/// it produces wrong results for messages more than ~49 days of
/// millisecond range away from the current epoch window, and it
/// inherits any host/server clock disagreement.
#[must_use]
pub const fn reconstruct_millis(server_value: i64, now_millis: u64) -> u64 {
    #[allow(clippy::cast_sign_loss)]
    let low = (server_value as u64) & 0xFFFF_FFFF;
    (now_millis & 0xFFFF_FFFF_0000_0000) | low
}
