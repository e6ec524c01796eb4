//! Packer strategies: each knows how to turn a field's text value into wire
//! bytes and back.

use crate::bcd;
use crate::error::{Error, Result};
use crate::hex;

/// A strategy for encoding a field's text value to wire bytes and decoding it
/// back. Implementations are stateless and shared as `'static` references.
pub trait FieldPacker: Sync {
    /// Encode `value` (already format-validated) to wire bytes.
    fn pack(&self, field: u32, value: &str) -> Result<Vec<u8>>;

    /// Decode `bytes` back to the field's text value.
    fn unpack(&self, field: u32, bytes: &[u8]) -> Result<String>;

    /// The number of wire bytes `value` packs to, without actually packing
    /// it. Used to size length prefixes ahead of packing.
    fn packed_len(&self, value: &str) -> usize;
}

/// Stores the value as raw ASCII bytes, one byte per character.
pub struct AsciiPacker;
pub static ASCII: AsciiPacker = AsciiPacker;

impl FieldPacker for AsciiPacker {
    fn pack(&self, _field: u32, value: &str) -> Result<Vec<u8>> {
        Ok(value.as_bytes().to_vec())
    }

    fn unpack(&self, _field: u32, bytes: &[u8]) -> Result<String> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn packed_len(&self, value: &str) -> usize {
        value.len()
    }
}

/// Stores the value as raw bytes, with the text form being its hex encoding.
pub struct BinaryPacker;
pub static BINARY: BinaryPacker = BinaryPacker;

impl FieldPacker for BinaryPacker {
    fn pack(&self, _field: u32, value: &str) -> Result<Vec<u8>> {
        hex::hex_to_bytes(value)
    }

    fn unpack(&self, _field: u32, bytes: &[u8]) -> Result<String> {
        Ok(hex::bytes_to_hex(bytes))
    }

    fn packed_len(&self, value: &str) -> usize {
        value.len() / 2
    }
}

/// Stores decimal digits two-per-byte, unsigned, left-zero-padded odd.
pub struct BcdPackedUnsignedPacker;
pub static BCD_UNSIGNED: BcdPackedUnsignedPacker = BcdPackedUnsignedPacker;

impl FieldPacker for BcdPackedUnsignedPacker {
    fn pack(&self, field: u32, value: &str) -> Result<Vec<u8>> {
        bcd::str_to_bcd_packed_unsigned(value).map_err(|_| Error::BadField { field })
    }

    fn unpack(&self, _field: u32, bytes: &[u8]) -> Result<String> {
        Ok(bcd::bcd_packed_unsigned_to_str(bytes))
    }

    fn packed_len(&self, value: &str) -> usize {
        value.len().div_ceil(2)
    }
}

/// Stores decimal digits two-per-byte with a trailing sign nibble on an odd
/// digit count, per [`bcd`].
pub struct BcdPackedSignedPacker;
pub static BCD_SIGNED: BcdPackedSignedPacker = BcdPackedSignedPacker;

impl FieldPacker for BcdPackedSignedPacker {
    fn pack(&self, field: u32, value: &str) -> Result<Vec<u8>> {
        bcd::str_to_bcd_packed_signed(value).map_err(|_| Error::BadField { field })
    }

    fn unpack(&self, _field: u32, bytes: &[u8]) -> Result<String> {
        Ok(bcd::bcd_packed_signed_to_str(bytes))
    }

    fn packed_len(&self, value: &str) -> usize {
        let digits = match value.as_bytes().first() {
            Some(b'+') | Some(b'-') | Some(b'C') | Some(b'c') | Some(b'D') | Some(b'd') => {
                value.len() - 1
            }
            _ => value.len(),
        };
        if digits % 2 == 0 {
            digits / 2
        } else {
            digits / 2 + 1
        }
    }
}

/// Packs decimal digits as unsigned BCD, same as [`BcdPackedUnsignedPacker`],
/// but strips leading zeros on unpack (collapsing an all-zero field to a
/// single `"0"`) so the numeric value round-trips independent of padding
/// width.
pub struct NumericFieldPacker;
pub static NUMERIC: NumericFieldPacker = NumericFieldPacker;

impl FieldPacker for NumericFieldPacker {
    fn pack(&self, field: u32, value: &str) -> Result<Vec<u8>> {
        bcd::str_to_bcd_packed_unsigned(value).map_err(|_| Error::BadField { field })
    }

    fn unpack(&self, _field: u32, bytes: &[u8]) -> Result<String> {
        let s = bcd::bcd_packed_unsigned_to_str(bytes);
        let trimmed = s.trim_start_matches('0');
        Ok(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() })
    }

    fn packed_len(&self, value: &str) -> usize {
        value.len().div_ceil(2)
    }
}
