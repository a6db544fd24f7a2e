//! Secret generation, comparison, and wall-clock helpers.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use subtle::ConstantTimeEq;

/// Generates a random 32-character lowercase hex string (128 bits).
///
/// Used for session keys, combo tokens and verification tokens.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Compares two secrets without leaking the position of the first
/// mismatching byte through timing.
pub fn secrets_match(presented: &str, stored: &str) -> bool {
    presented.as_bytes().ct_eq(stored.as_bytes()).into()
}

/// Current wall-clock time in unix milliseconds, or 0 if the system clock
/// is set before the epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_millis)
        .unwrap_or(0)
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Returns `true` once `now` has reached `stamp + ttl`.
///
/// With a zero `ttl` everything is expired.
pub fn is_past(stamp: u64, ttl: Duration, now: u64) -> bool {
    now >= stamp.saturating_add(duration_millis(ttl))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_is_32_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_token_is_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("abc", "abc"));
        assert!(!secrets_match("abc", "abd"));
        assert!(!secrets_match("abc", "abcd"));
        assert!(!secrets_match("", "abc"));
    }

    #[test]
    fn test_is_past_zero_ttl_always_expired() {
        assert!(is_past(1_000, Duration::ZERO, 1_000));
    }

    #[test]
    fn test_is_past_within_window() {
        let ttl = Duration::from_secs(10);
        assert!(!is_past(1_000, ttl, 10_999));
        assert!(is_past(1_000, ttl, 11_000));
    }

    #[test]
    fn test_duration_millis_saturates() {
        assert_eq!(duration_millis(Duration::from_millis(1_500)), 1_500);
        assert_eq!(duration_millis(Duration::from_secs(u64::MAX)), u64::MAX);
    }

    #[test]
    fn test_is_past_huge_ttl_never_expires() {
        // u64::MAX seconds in millis would wrap to a small value if truncated.
        let ttl = Duration::from_secs(u64::MAX);
        assert!(!is_past(1_000, ttl, u64::MAX - 1));
    }

    #[test]
    fn test_is_past_saturates_on_huge_stamp() {
        assert!(!is_past(u64::MAX, Duration::from_secs(1), 5));
    }
}
