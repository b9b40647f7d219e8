//! Human-readable order numbers: `ORD-<base36 millis>-<8 random base36>`.

use chrono::Utc;
use rand::Rng;

const PREFIX: &str = "ORD";
const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 8;

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Generates a new order number from the current time and a random suffix.
pub fn generate_order_number() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();

    format!("{PREFIX}-{}-{suffix}", to_base36(millis))
}

/// Checks that `value` has the shape produced by [`generate_order_number`].
pub fn is_order_number(value: &str) -> bool {
    let mut parts = value.split('-');
    let (Some(prefix), Some(time), Some(suffix), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let base36 = |s: &str| s.bytes().all(|b| ALPHABET.contains(&b));

    prefix == PREFIX
        && !time.is_empty()
        && base36(time)
        && suffix.len() == SUFFIX_LEN
        && base36(suffix)
}
