//! UTF-16 code-unit measurement over Rust (UTF-8) strings.
//!
//! The editor widget reports positions in UTF-16 code units, so every
//! length in the algebra is counted in that measure. A `char` outside the
//! Basic Multilingual Plane occupies two code units; an offset that lands
//! between those two units has no corresponding `&str` boundary and is
//! reported as `None`.

/// Length of `s` in UTF-16 code units.
pub fn len(s: &str) -> u64 {
    s.chars().map(|c| c.len_utf16() as u64).sum()
}

/// Byte index of the `n`-th UTF-16 code unit of `s`.
///
/// Returns `None` if `n` exceeds the length of `s` or falls between the
/// two code units of a surrogate pair.
pub fn byte_index(s: &str, n: u64) -> Option<usize> {
    if n == 0 {
        return Some(0);
    }
    let mut units = 0u64;
    for (i, c) in s.char_indices() {
        if units == n {
            return Some(i);
        }
        units += c.len_utf16() as u64;
        if units > n {
            return None; // inside a surrogate pair
        }
    }
    (units == n).then_some(s.len())
}

/// Split `s` at `n` UTF-16 code units.
pub fn split(s: &str, n: u64) -> Option<(&str, &str)> {
    byte_index(s, n).map(|i| s.split_at(i))
}
