//! Resume-token codec: generation, validation, and expiry for the opaque
//! credential that recovers an in-progress survey session.
//!
//! Format: uppercase base-36 millisecond timestamp, a hyphen, and an
//! 8-character random alphanumeric suffix (e.g. `MB2KX91A-F7Q2Z8WK`). The
//! sortable prefix aids expiry checks without a separate timestamp field; the
//! random suffix prevents guessing.

use chrono::{DateTime, Duration, TimeZone, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

/// Tokens older than this are treated as expired (30 days).
pub const DEFAULT_EXPIRY_HOURS: i64 = 24 * 30;

const SUFFIX_LEN: usize = 8;
const MIN_TOKEN_LEN: usize = 10;
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z0-9]+-[A-Z0-9]+$").expect("TOKEN_PATTERN is a valid regex")
});

pub fn generate() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    format!("{}-{}", to_base36(millis), random_suffix(SUFFIX_LEN))
}

/// Syntactic check only, run before any store lookup. Expiry is a separate
/// policy layered on top (`is_expired`).
pub fn validate(token: &str) -> bool {
    token.len() >= MIN_TOKEN_LEN && TOKEN_PATTERN.is_match(token)
}

/// Decode the creation time from the base-36 prefix.
pub fn timestamp(token: &str) -> Option<DateTime<Utc>> {
    if !validate(token) {
        return None;
    }
    let prefix = token.split('-').next()?;
    let millis = u64::from_str_radix(prefix, 36).ok()?;
    Utc.timestamp_millis_opt(millis as i64).single()
}

/// Policy check on top of basic validation; undecodable tokens count as
/// expired.
pub fn is_expired(token: &str, horizon_hours: i64) -> bool {
    match timestamp(token) {
        Some(created) => Utc::now() - created > Duration::hours(horizon_hours),
        None => true,
    }
}

/// Regroup into hyphen-separated 4-character chunks for human presentation,
/// e.g. `MB2KX91A-F7Q2Z8WK` -> `MB2K-X91A-F7Q2-Z8WK`. Invalid tokens are
/// returned unchanged.
pub fn format_for_display(token: &str) -> String {
    if !validate(token) {
        return token.to_string();
    }
    let cleaned: String = token.chars().filter(|c| *c != '-').collect();
    cleaned
        .as_bytes()
        .chunks(4)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("-")
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let d = (value % 36) as u8;
        digits.push(if d < 10 { b'0' + d } else { b'A' + d - 10 });
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
