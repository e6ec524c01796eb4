//! Reflected CRC-32/ISO-HDLC, computed with a direct per-bit loop rather than
//! a lookup table: this leaf is small and is exercised once per field-63
//! token, not once per byte of a bulk stream, so a table buys nothing here.
//!
//! ```text
//! init:  0xFFFFFFFF
//! poly:  0xEDB88320 (reflected)
//! xorout: 0xFFFFFFFF
//! ```

const POLY: u32 = 0xEDB8_8320;

/// Compute the CRC-32 of `data`, returning the 4-byte big-endian digest.
pub fn crc32(data: &[u8]) -> [u8; 4] {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    (!crc).to_be_bytes()
}

/// Compute the CRC-32 of `data` and render it as an 8-hex-digit string.
pub fn crc32_hex(data: &[u8]) -> String {
    crate::hex::bytes_to_hex(&crc32(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc32_hex(b""), "00000000");
    }

    #[test]
    fn ascii_123456789_reference_vector() {
        assert_eq!(crc32_hex(b"123456789"), "cbf43926");
    }

    #[test]
    fn hex_of_reference_vector_input_matches_spec_framing() {
        // The spec frames the reference vector as "CRC-32 of the ASCII
        // hex string '313233343536373839'" - that hex string is just the
        // hex encoding of ASCII "123456789", the actual CRC input.
        assert_eq!(crate::hex::bytes_to_hex(b"123456789"), "313233343536373839");
        assert_eq!(crc32_hex(b"123456789"), "cbf43926");
    }
}
