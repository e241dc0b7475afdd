/// Parse an integer token into the unsigned 64-bit range.
///
/// Accepts `0x`/`0X` hex or decimal with an optional sign. Out-of-range and
/// negative values wrap modulo 2^64; callers narrowing further (16-bit
/// addresses) truncate the same way.
pub fn parse_value(token: &str) -> Option<u64> {
    let t = token.trim();
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return fold_digits(hex, 16);
    }
    let (negative, digits) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let v = fold_digits(digits, 10)?;
    Some(if negative { v.wrapping_neg() } else { v })
}

fn fold_digits(digits: &str, radix: u32) -> Option<u64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0u64, |acc, c| {
        let d = c.to_digit(radix)?;
        Some(acc.wrapping_mul(radix as u64).wrapping_add(d as u64))
    })
}
