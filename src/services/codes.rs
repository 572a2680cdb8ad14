//! Human-readable order and customer codes.
//!
//! These are display labels, not identifiers: the order code carries no
//! uniqueness guarantee and the customer code is a weak fingerprint.
//! Anything that must be unique joins on the order's UUID instead.

use chrono::Utc;
use rand::Rng;

const BASE36_UPPER: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const BASE36_LOWER: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Prime multiplier spreading the customer-code hash.
const HASH_SPREAD_PRIME: u64 = 997;

/// Generates an order code of the form `YYYYMMDD-XXXX`, where the suffix
/// is four random base-36 characters. Collisions within a day are
/// improbable (1 in 36^4 per pair) but not prevented.
pub fn generate_order_code() -> String {
    let date_part = Utc::now().format("%Y%m%d");
    let mut rng = rand::thread_rng();
    let suffix: String = (0..4)
        .map(|_| BASE36_UPPER[rng.gen_range(0..BASE36_UPPER.len())] as char)
        .collect();
    format!("{date_part}-{suffix}")
}

/// Derives a display label from the customer's name and email:
/// `<initial>-<4-char base-36 hash>`. Returns `None` when either input
/// is empty. Deterministic for identical inputs.
pub fn generate_customer_code(name: &str, email: &str) -> Option<String> {
    if name.is_empty() || email.is_empty() {
        return None;
    }

    let initial: char = name.trim().chars().next()?.to_ascii_uppercase();

    let sum: u64 = email.chars().map(|c| c as u64).sum();
    let encoded = to_base36(sum.wrapping_mul(HASH_SPREAD_PRIME));
    let tail_start = encoded.len().saturating_sub(4);
    let hash_part = encoded[tail_start..].to_ascii_uppercase();

    Some(format!("{initial}-{hash_part}"))
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_LOWER[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}
