//! Hex color canonicalization.

/// Shorten a hex color code to half its digits when that loses no accuracy.
///
/// A 6- or 8-digit code collapses to 3 or 4 digits when every channel pair
/// repeats a single digit (`#AABBCC` -> `#ABC`). Codes that cannot be
/// shortened are upper-cased in full; codes shorter than 6 digits are
/// upper-cased unchanged. Inputs that are not hex color codes at all pass
/// through untouched.
pub fn canonical_rgb_hex(hex_code: &str) -> String {
    let digits = hex_code.strip_prefix('#').unwrap_or(hex_code);
    let count = digits.chars().count();
    if !(3..=8).contains(&count) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return hex_code.to_string();
    }

    let digits = digits.to_ascii_uppercase();
    if count < 6 {
        return format!("#{digits}");
    }

    let mut short = String::with_capacity(4);
    for pair in digits.as_bytes().chunks_exact(2) {
        if pair[0] != pair[1] {
            return format!("#{digits}");
        }
        short.push(pair[0] as char);
    }
    format!("#{short}")
}
