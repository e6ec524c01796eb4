//! The ISO 8583 message engine: a field-definition registry, a sparse
//! field map, and the bitmap/pack/unpack pipelines that move between them
//! and wire bytes.

use crate::bcd;
use crate::error::{Error, Result};
use crate::field::{FieldDefinition, FieldLenMode};
use crate::hex;
use crate::mti::Mti;
use std::collections::BTreeMap;

/// A field-definition registry: every field number an [`IsoMessage`] is
/// allowed to carry, keyed by field number. Field 1 is reserved for the
/// secondary-bitmap presence bit and must never appear here.
#[derive(Clone)]
pub struct FieldRegistry {
    defs: BTreeMap<u32, FieldDefinition>,
}

impl FieldRegistry {
    /// Build a registry from `(field_number, definition)` pairs. Fails
    /// [`Error::BadRegistry`] if any field number is <= 1 or any definition
    /// violates its own invariants (e.g. `maxLen >= 1`).
    pub fn new(defs: impl IntoIterator<Item = (u32, FieldDefinition)>) -> Result<FieldRegistry> {
        let mut map = BTreeMap::new();
        for (field, def) in defs {
            if field <= 1 {
                return Err(Error::BadRegistry { field });
            }
            def.check(field)?;
            map.insert(field, def);
        }
        Ok(FieldRegistry { defs: map })
    }

    fn get(&self, field: u32) -> Result<&FieldDefinition> {
        self.defs.get(&field).ok_or(Error::BadField { field })
    }
}

/// An ISO 8583 message: a registry reference, an optional MTI, and a sparse
/// `{field -> text value}` map. One message per request; never shared
/// across threads.
#[derive(Clone)]
pub struct IsoMessage<'r> {
    registry: &'r FieldRegistry,
    mti: Option<Mti>,
    fields: BTreeMap<u32, String>,
}

impl<'r> IsoMessage<'r> {
    /// An empty message bound to `registry`.
    pub fn new(registry: &'r FieldRegistry) -> IsoMessage<'r> {
        IsoMessage {
            registry,
            mti: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn mti(&self) -> Option<Mti> {
        self.mti
    }

    pub fn set_mti(&mut self, mti: Mti) {
        self.mti = Some(mti);
    }

    /// Read a field's stored text value, if set.
    pub fn field(&self, n: u32) -> Option<&str> {
        self.fields.get(&n).map(String::as_str)
    }

    pub fn remove_field(&mut self, n: u32) {
        self.fields.remove(&n);
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.mti = None;
    }

    /// Set field `n` to `value`, validating against its registered format
    /// and length, then applying FIXED-field padding.
    pub fn set_field(&mut self, n: u32, value: &str) -> Result<()> {
        let def = self.registry.get(n)?;
        if !def.format.validate(value) {
            return Err(Error::BadFormat { field: n });
        }
        if value.len() > def.max_len {
            return Err(Error::BadLen {
                field: n,
                max: def.max_len,
                actual: value.len(),
            });
        }
        let stored = if def.len_mode == FieldLenMode::Fixed {
            pad_fixed(def, value)
        } else {
            value.to_string()
        };
        self.fields.insert(n, stored);
        Ok(())
    }

    /// Set a binary (format `B`) field from raw bytes, storing its hex text.
    pub fn set_binary_field(&mut self, n: u32, bytes: &[u8]) -> Result<()> {
        self.set_field(n, &hex::bytes_to_hex(bytes))
    }

    fn primary_fields(&self) -> impl Iterator<Item = (&u32, &String)> {
        self.fields.iter().filter(|(&n, _)| n != 1)
    }

    fn bitmap_hex(&self) -> String {
        let mut primary = [false; 64];
        let mut secondary = [false; 64];
        let mut any_secondary = false;
        for &n in self.fields.keys() {
            if n == 1 {
                continue;
            }
            if n >= 2 && n <= 64 {
                primary[(n - 1) as usize] = true;
            } else if (65..=128).contains(&n) {
                secondary[(n - 65) as usize] = true;
                any_secondary = true;
            }
        }
        primary[0] = any_secondary;
        let mut hex = bits_to_hex(&primary);
        if any_secondary {
            hex.push_str(&bits_to_hex(&secondary));
        }
        hex
    }

    /// Render the text form: `mti || bitmap_hex || body`, where body is the
    /// (possibly length-prefixed) concatenation of each defined field's text
    /// value in ascending field-number order.
    pub fn to_text(&self) -> Result<String> {
        let mut out = String::new();
        if let Some(mti) = self.mti {
            out.push_str(&mti.to_string());
        }
        out.push_str(&self.bitmap_hex());
        for (&n, value) in self.primary_fields() {
            let def = self.registry.get(n)?;
            if def.len_mode != FieldLenMode::Fixed {
                let width = def.len_mode.ordinal();
                out.push_str(&format!("{:0width$}", value.len(), width = width));
            }
            out.push_str(value);
        }
        Ok(out)
    }

    /// Pack this message to wire bytes per the bit-exact pipeline: MTI,
    /// then bitmap, then each defined field's (length-prefix?)(value) bytes
    /// in ascending field order.
    pub fn pack(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mti = self.mti.ok_or(Error::MissingField { field: 0 })?;
        out.extend(bcd::str_to_bcd_packed_unsigned(&mti.to_string())?);
        out.extend(hex::hex_to_bytes(&self.bitmap_hex())?);
        for (&n, value) in self.primary_fields() {
            let def = self.registry.get(n)?;
            let packer = def.packer();
            let bytes = packer.pack(n, value)?;
            if def.len_mode != FieldLenMode::Fixed {
                let width = def.len_mode.ordinal();
                let len_str = format!("{:0width$}", bytes.len(), width = width);
                out.extend(bcd::str_to_bcd_packed_unsigned(&len_str)?);
            }
            out.extend(bytes);
        }
        Ok(out)
    }

    /// Unpack `bytes` into a fresh message bound to `registry`, mirroring
    /// [`IsoMessage::pack`]'s field order.
    pub fn unpack(bytes: &[u8], registry: &'r FieldRegistry) -> Result<IsoMessage<'r>> {
        let mut cursor = Cursor::new(bytes);
        let mti_bytes = cursor.take(2)?;
        let mti = Mti::parse(&bcd::bcd_packed_unsigned_to_str(mti_bytes))?;

        let primary_bytes = cursor.take(8)?;
        let primary_hex = hex::bytes_to_hex(primary_bytes);
        let primary_bits = hex_to_bits(&primary_hex)?;

        let mut present = Vec::new();
        for (i, &set) in primary_bits.iter().enumerate() {
            let field = (i + 1) as u32;
            if field != 1 && set {
                present.push(field);
            }
        }
        if primary_bits[0] {
            let secondary_bytes = cursor.take(8)?;
            let secondary_hex = hex::bytes_to_hex(secondary_bytes);
            let secondary_bits = hex_to_bits(&secondary_hex)?;
            for (i, &set) in secondary_bits.iter().enumerate() {
                if set {
                    present.push(65 + i as u32);
                }
            }
        }
        present.sort_unstable();

        let mut msg = IsoMessage::new(registry);
        msg.mti = Some(mti);
        for field in present {
            let def = registry.get(field)?;
            let packer = def.packer();
            let payload = if def.len_mode == FieldLenMode::Fixed {
                cursor.take(packer.packed_len(&"0".repeat(def.max_len)))?
            } else {
                let width = def.len_mode.ordinal();
                let len_bytes = cursor.take(width.div_ceil(2))?;
                let len_str = bcd::bcd_packed_unsigned_to_str(len_bytes);
                let len_str = &len_str[len_str.len() - width..];
                let n: usize = len_str
                    .parse()
                    .map_err(|_| Error::BadField { field })?;
                cursor.take(n)?
            };
            let value = packer.unpack(field, payload)?;
            msg.set_field(field, &value)?;
        }
        Ok(msg)
    }
}

fn pad_fixed(def: &FieldDefinition, value: &str) -> String {
    use crate::field::FieldFormat;
    match def.format {
        FieldFormat::N | FieldFormat::B | FieldFormat::Xn => {
            format!("{:0>width$}", value, width = def.max_len)
        }
        _ => format!("{:<width$}", value, width = def.max_len),
    }
}

fn bits_to_hex(bits: &[bool; 64]) -> String {
    let mut bytes = [0u8; 8];
    for (i, chunk) in bits.chunks(8).enumerate() {
        let mut byte = 0u8;
        for (j, &b) in chunk.iter().enumerate() {
            if b {
                byte |= 1 << (7 - j);
            }
        }
        bytes[i] = byte;
    }
    hex::bytes_to_hex(&bytes)
}

fn hex_to_bits(s: &str) -> Result<[bool; 64]> {
    let bytes = hex::hex_to_bytes(s)?;
    let mut bits = [false; 64];
    for (i, &byte) in bytes.iter().enumerate() {
        for j in 0..8 {
            bits[i * 8 + j] = byte & (1 << (7 - j)) != 0;
        }
    }
    Ok(bits)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Cursor<'a> {
        Cursor { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(Error::BadToken { marker: "iso message" });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldFormat;

    fn minimal_registry() -> FieldRegistry {
        FieldRegistry::new([(39, FieldDefinition::fixed(FieldFormat::An, 2))]).unwrap()
    }

    #[test]
    fn registry_rejects_field_1() {
        let err = FieldRegistry::new([(1, FieldDefinition::fixed(FieldFormat::N, 2))]);
        assert!(matches!(err, Err(Error::BadRegistry { field: 1 })));
    }

    #[test]
    fn packs_minimal_sale_response() {
        let registry = minimal_registry();
        let mut msg = IsoMessage::new(&registry);
        msg.set_mti(Mti::parse("0210").unwrap());
        msg.set_field(39, "00").unwrap();
        let packed = msg.pack().unwrap();
        assert_eq!(hex::bytes_to_hex(&packed), "021000000000020000003030");
    }

    #[test]
    fn bitmap_has_only_bit_39_set() {
        let registry = minimal_registry();
        let mut msg = IsoMessage::new(&registry);
        msg.set_mti(Mti::parse("0210").unwrap());
        msg.set_field(39, "00").unwrap();
        let packed = msg.pack().unwrap();
        // MTI (2 bytes BCD) + bitmap (8 bytes) + field 39 (2 ASCII bytes)
        assert_eq!(packed.len(), 2 + 8 + 2);
        assert_eq!(hex::bytes_to_hex(&packed[2..10]), "0000000002000000");
        assert_eq!(&packed[10..12], b"00");
    }

    #[test]
    fn round_trips_pack_unpack() {
        let registry = FieldRegistry::new([
            (2, FieldDefinition::variable(FieldFormat::N, 19)),
            (39, FieldDefinition::fixed(FieldFormat::An, 2)),
            (70, FieldDefinition::variable(FieldFormat::N, 19)),
        ])
        .unwrap();
        let mut msg = IsoMessage::new(&registry);
        msg.set_mti(Mti::parse("0200").unwrap());
        msg.set_field(2, "4111111111111111").unwrap();
        msg.set_field(39, "00").unwrap();
        msg.set_field(70, "301").unwrap();
        let packed = msg.pack().unwrap();
        let unpacked = IsoMessage::unpack(&packed, &registry).unwrap();
        assert_eq!(unpacked.mti(), msg.mti());
        assert_eq!(unpacked.field(2), msg.field(2));
        assert_eq!(unpacked.field(39), msg.field(39));
        assert_eq!(unpacked.field(70), msg.field(70));
    }

    #[test]
    fn fixed_numeric_field_with_empty_value_is_rejected() {
        let registry = minimal_registry();
        let mut msg = IsoMessage::new(&registry);
        assert!(matches!(
            msg.set_field(39, ""),
            Err(Error::BadFormat { field: 39 })
        ));
    }

    #[test]
    fn no_fields_above_64_emits_no_secondary_bitmap() {
        let registry = minimal_registry();
        let mut msg = IsoMessage::new(&registry);
        msg.set_field(39, "00").unwrap();
        assert_eq!(msg.bitmap_hex().len(), 16);
    }

    #[test]
    fn to_text_prefixes_variable_fields_with_padded_length() {
        let registry = FieldRegistry::new([(2, FieldDefinition::variable(FieldFormat::N, 19))]).unwrap();
        let mut msg = IsoMessage::new(&registry);
        msg.set_mti(Mti::parse("0200").unwrap());
        msg.set_field(2, "4111111111111111").unwrap();
        let text = msg.to_text().unwrap();
        assert!(text.starts_with("0200"));
        assert!(text.starts_with("02004000000000000000"));
        assert!(text.ends_with("164111111111111111"));
    }
}
