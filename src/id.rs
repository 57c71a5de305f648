//! ID generation utilities for xflow
//!
//! Request identifiers double as correlation ids for fault diagnosis.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Generate a unique request ID
///
/// Format: `req-{timestamp_ms}-{random_hex}`
/// Example: `req-1738300800123-a1b2`
pub fn generate_request_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("req-{}-{:04x}", timestamp, random)
}
