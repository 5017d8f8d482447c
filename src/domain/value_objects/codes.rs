//! Human-facing codes: affiliate referral codes and license serial keys.
//!
//! Both draw from an alphabet without the easily confused `0`, `O`, `1`
//! and `I`.

use rand::Rng;

pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const REFERRAL_CODE_LEN: usize = 8;
const SERIAL_GROUPS: usize = 4;
const SERIAL_GROUP_LEN: usize = 4;

/// Attempts made before giving up on finding an unused code.
pub const MAX_CODE_ATTEMPTS: usize = 5;

fn random_chars<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Generate an 8 character referral code.
pub fn generate_referral_code() -> String {
    random_chars(&mut rand::rng(), REFERRAL_CODE_LEN)
}

/// Generate a serial key shaped like `ABCD-EFGH-JKLM-NPQR`.
pub fn generate_serial_key() -> String {
    let mut rng = rand::rng();
    (0..SERIAL_GROUPS)
        .map(|_| random_chars(&mut rng, SERIAL_GROUP_LEN))
        .collect::<Vec<_>>()
        .join("-")
}

/// Uppercase and trim user input so lookups are case-insensitive.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

fn in_alphabet(c: char) -> bool {
    c.is_ascii() && CODE_ALPHABET.contains(&(c as u8))
}

pub fn is_valid_referral_code(code: &str) -> bool {
    code.len() == REFERRAL_CODE_LEN && code.chars().all(in_alphabet)
}

pub fn is_valid_serial_key(key: &str) -> bool {
    let groups: Vec<&str> = key.split('-').collect();
    groups.len() == SERIAL_GROUPS
        && groups
            .iter()
            .all(|g| g.len() == SERIAL_GROUP_LEN && g.chars().all(in_alphabet))
}
