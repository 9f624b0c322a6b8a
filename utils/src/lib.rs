//! Leverage common functionality across the dealing primitives.

/// Converts bytes to a hexadecimal string.
pub fn hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes.iter() {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// Compute the largest threshold `t` such that `t + 1` shares are required to
/// use a secret shared among `n` participants while honest participants
/// remain a majority (`t = (n - 1) / 2`).
///
/// If `n` is too small to share a secret with any threshold, this function
/// returns `None`.
pub fn optimal_threshold(n: u32) -> Option<u32> {
    let t = n.checked_sub(1)? / 2;
    if t == 0 {
        return None;
    }
    Some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        // Test case 0: empty bytes
        let b = &[];
        let h = hex(b);
        assert_eq!(h, "");

        // Test case 1: single byte
        let b = &[0x01];
        let h = hex(b);
        assert_eq!(h, "01");

        // Test case 2: multiple bytes
        let b = &[0x01, 0x02, 0x03];
        let h = hex(b);
        assert_eq!(h, "010203");

        // Test case 3: leading zeros are kept
        let b = &[0x00, 0x0a, 0xff];
        let h = hex(b);
        assert_eq!(h, "000aff");
    }

    #[test]
    fn test_optimal_threshold() {
        assert_eq!(optimal_threshold(0), None);
        assert_eq!(optimal_threshold(1), None);
        assert_eq!(optimal_threshold(2), None);
        assert_eq!(optimal_threshold(3), Some(1));
        assert_eq!(optimal_threshold(4), Some(1));
        assert_eq!(optimal_threshold(5), Some(2));
        assert_eq!(optimal_threshold(10), Some(4));
        assert_eq!(optimal_threshold(254), Some(126));
    }
}
