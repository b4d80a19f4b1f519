//! Sequence number comparisons modulo 2^32.

/// Returns `true` if `lhs` comes strictly before `rhs` in sequence space.
#[inline]
pub fn wrapping_lt(lhs: u32, rhs: u32) -> bool {
    // RFC 1323 (2.3)
    //
    // TCP determines if a data segment is "old" or "new" by testing whether
    // its sequence number is within 2**31 bytes of the left edge of the window.
    lhs.wrapping_sub(rhs) > (1 << 31)
}

/// Returns `true` if `lhs` comes before or is equal to `rhs` in sequence
/// space.
#[inline]
pub fn wrapping_le(lhs: u32, rhs: u32) -> bool {
    lhs == rhs || wrapping_lt(lhs, rhs)
}

/// Returns `true` if the value `x` is strictly in between the values `start`
/// and `end`, using wrapping arithmetic.
#[inline]
pub fn is_between_wrapped(start: u32, x: u32, end: u32) -> bool {
    wrapping_lt(start, x) && wrapping_lt(x, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_across_wrap() {
        assert!(wrapping_lt(u32::MAX - 10, 5));
        assert!(!wrapping_lt(5, u32::MAX - 10));
        assert!(wrapping_le(7, 7));
        assert!(!wrapping_lt(7, 7));
        assert!(is_between_wrapped(u32::MAX, 0, 1));
        assert!(!is_between_wrapped(1, 1, 2));
    }
}
