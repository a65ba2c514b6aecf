//! Random strings and operations for the property tests.
//!
//! The character pool deliberately mixes ASCII, Latin-1, CJK and astral
//! characters so that every property is exercised across one- and two-unit
//! UTF-16 widths.

use rand::Rng;

use crate::operation::TextOperation;

const POOL: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', ' ', '\n', 'ä', 'ö', 'ü', 'ß', '中', '文', '編', '集',
    '🚀', '😀', '𝕏',
];

/// A random string of `size` characters drawn from the mixed-width pool.
pub fn random_string<R: Rng>(rng: &mut R, size: usize) -> String {
    (0..size).map(|_| POOL[rng.gen_range(0..POOL.len())]).collect()
}

/// A random operation whose `base_len` matches `s`.
///
/// Component boundaries always fall on character boundaries of `s`, as they
/// do for operations produced by a real editor.
pub fn random_operation<R: Rng>(rng: &mut R, s: &str) -> TextOperation {
    let mut operation = TextOperation::default();
    let chars: Vec<char> = s.chars().collect();
    let mut consumed = 0;
    while consumed < chars.len() {
        if rng.gen_bool(0.3) {
            let size = rng.gen_range(1..=5);
            operation.insert(random_string(rng, size));
        }
        let chunk = rng.gen_range(1..=5).min(chars.len() - consumed);
        let units: u64 = chars[consumed..consumed + chunk]
            .iter()
            .map(|c| c.len_utf16() as u64)
            .sum();
        if rng.gen_bool(0.6) {
            operation.retain(units);
        } else {
            operation.delete(units);
        }
        consumed += chunk;
    }
    if rng.gen_bool(0.3) {
        let size = rng.gen_range(1..=5);
        operation.insert(random_string(rng, size));
    }
    operation
}
