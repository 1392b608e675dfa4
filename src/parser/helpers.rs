//! Sequence arithmetic helpers
//!
//! Record sequence numbers are 16-bit counters that wrap from 65535 to 0.
//! Comparisons go through two's-complement arithmetic so that distances
//! stay correct across the rollover.

/// Signed distance from `existing` to `incoming`.
///
/// Positive when `incoming` comes after `existing`, including across the
/// 65535 -> 0 wrap.
pub fn sequence_delta(incoming: u16, existing: u16) -> i16 {
    (incoming as i16).wrapping_sub(existing as i16)
}

/// Forward distance from `prev` to `curr`, modulo 65536
pub fn forward_gap(prev: u16, curr: u16) -> u16 {
    curr.wrapping_sub(prev)
}

/// Whether a signed distance lies within `[-window, window]`
pub fn within_window(delta: i16, window: u32) -> bool {
    (delta as i32).unsigned_abs() <= window
}
