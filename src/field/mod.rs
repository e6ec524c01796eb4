//! Field formats, length modes, and field definitions: the registry entries
//! an [`IsoMessage`][crate::message::IsoMessage] validates and (un)packs
//! values against.

pub mod packer;

use crate::error::{Error, Result};
use packer::FieldPacker;
use regex::Regex;
use std::sync::OnceLock;

/// The character-class format a field's text value must satisfy, and which
/// default [`FieldPacker`] applies to it on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldFormat {
    /// Alphabetic only.
    A,
    /// Numeric only.
    N,
    /// Special characters only (not alphanumeric).
    S,
    /// Alphanumeric.
    An,
    /// Alphabetic + special (not purely numeric).
    As,
    /// Numeric + special (not purely alphabetic).
    Ns,
    /// Alphanumeric + special: anything goes.
    Ans,
    /// Binary, stored on the wire as raw bytes (and as hex text in the
    /// message).
    B,
    /// Signed numeric (BCD with a sign nibble).
    Xn,
    /// Alias for NS used by some field catalogs (tracks, etc.).
    Z,
}

fn regex_for(format: FieldFormat) -> &'static Regex {
    static A: OnceLock<Regex> = OnceLock::new();
    static N: OnceLock<Regex> = OnceLock::new();
    static AN: OnceLock<Regex> = OnceLock::new();
    static B: OnceLock<Regex> = OnceLock::new();
    static XN: OnceLock<Regex> = OnceLock::new();
    static NOT_ALPHA: OnceLock<Regex> = OnceLock::new();
    static NOT_NUMERIC: OnceLock<Regex> = OnceLock::new();
    static NOT_ALPHANUMERIC: OnceLock<Regex> = OnceLock::new();
    static ANY: OnceLock<Regex> = OnceLock::new();

    match format {
        FieldFormat::A => A.get_or_init(|| Regex::new(r"^[A-Za-z]+$").unwrap()),
        FieldFormat::N => N.get_or_init(|| Regex::new(r"^[0-9]+$").unwrap()),
        FieldFormat::An => AN.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap()),
        FieldFormat::Ans => ANY.get_or_init(|| Regex::new(r"^.*$").unwrap()),
        FieldFormat::B => B.get_or_init(|| Regex::new(r"^[A-Fa-f0-9]+$").unwrap()),
        FieldFormat::Xn => XN.get_or_init(|| Regex::new(r"^[cdCD0-9][0-9]+$").unwrap()),
        FieldFormat::Ns | FieldFormat::Z => {
            NOT_ALPHA.get_or_init(|| Regex::new(r"^(?!^[A-Za-z]+$).+$").unwrap())
        }
        FieldFormat::As => {
            NOT_NUMERIC.get_or_init(|| Regex::new(r"^(?!^[0-9]+$).+$").unwrap())
        }
        FieldFormat::S => {
            NOT_ALPHANUMERIC.get_or_init(|| Regex::new(r"^(?!^[A-Za-z0-9]+$).+$").unwrap())
        }
    }
}

impl FieldFormat {
    /// True if `value` satisfies this format's character-class rule. Every
    /// format but `Ans` requires at least one character; `Ans` matches any
    /// string, including empty.
    pub fn validate(self, value: &str) -> bool {
        regex_for(self).is_match(value)
    }

    /// The packer strategy used for this format unless a field definition
    /// overrides it.
    pub fn default_packer(self) -> &'static dyn FieldPacker {
        match self {
            FieldFormat::B => &packer::BINARY,
            FieldFormat::N => &packer::NUMERIC,
            FieldFormat::Xn => &packer::BCD_SIGNED,
            _ => &packer::ASCII,
        }
    }
}

/// How a field's length is carried on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldLenMode {
    /// Fixed length: no length prefix, value is exactly `max_len` (packed)
    /// long.
    Fixed,
    /// 1-digit decimal length prefix.
    Lvar,
    /// 2-digit decimal length prefix.
    Llvar,
    /// 3-digit decimal length prefix.
    Lllvar,
    /// 4-digit decimal length prefix.
    Llllvar,
}

impl FieldLenMode {
    /// Number of decimal digits in this mode's length prefix; 0 for `Fixed`.
    pub fn ordinal(self) -> usize {
        match self {
            FieldLenMode::Fixed => 0,
            FieldLenMode::Lvar => 1,
            FieldLenMode::Llvar => 2,
            FieldLenMode::Lllvar => 3,
            FieldLenMode::Llllvar => 4,
        }
    }

    /// Choose a length mode from a field's maximum length, per the magnitude
    /// table: 1-9 -> Lvar, 10-99 -> Llvar, 100-999 -> Lllvar, >=1000 -> Llllvar.
    pub fn from_max_len(max_len: usize) -> FieldLenMode {
        match max_len {
            1..=9 => FieldLenMode::Lvar,
            10..=99 => FieldLenMode::Llvar,
            100..=999 => FieldLenMode::Lllvar,
            _ => FieldLenMode::Llllvar,
        }
    }
}

/// The registered shape of one ISO field: its format, maximum text length,
/// length-prefix mode, and (optionally) a non-default packer.
#[derive(Clone, Copy)]
pub struct FieldDefinition {
    pub format: FieldFormat,
    pub max_len: usize,
    pub len_mode: FieldLenMode,
    pub custom_packer: Option<&'static dyn FieldPacker>,
}

impl FieldDefinition {
    /// A field with an explicit length mode (e.g. a FIXED field, or a LLVAR
    /// field whose length-prefix width doesn't follow the magnitude table).
    pub fn new(format: FieldFormat, max_len: usize, len_mode: FieldLenMode) -> FieldDefinition {
        FieldDefinition {
            format,
            max_len,
            len_mode,
            custom_packer: None,
        }
    }

    /// A variable-length field whose length mode is derived from `max_len`'s
    /// magnitude.
    pub fn variable(format: FieldFormat, max_len: usize) -> FieldDefinition {
        FieldDefinition::new(format, max_len, FieldLenMode::from_max_len(max_len))
    }

    /// A fixed-length field.
    pub fn fixed(format: FieldFormat, max_len: usize) -> FieldDefinition {
        FieldDefinition::new(format, max_len, FieldLenMode::Fixed)
    }

    /// Override the packer used for this field instead of the format's
    /// default.
    pub fn with_packer(mut self, packer: &'static dyn FieldPacker) -> FieldDefinition {
        self.custom_packer = Some(packer);
        self
    }

    /// The packer that applies to this field: the custom one if set,
    /// otherwise the format's default.
    pub fn packer(&self) -> &'static dyn FieldPacker {
        self.custom_packer.unwrap_or_else(|| self.format.default_packer())
    }

    pub(crate) fn check(&self, field: u32) -> Result<()> {
        if self.max_len == 0 {
            return Err(Error::BadRegistry { field });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_mode_from_magnitude() {
        assert_eq!(FieldLenMode::from_max_len(1), FieldLenMode::Lvar);
        assert_eq!(FieldLenMode::from_max_len(9), FieldLenMode::Lvar);
        assert_eq!(FieldLenMode::from_max_len(10), FieldLenMode::Llvar);
        assert_eq!(FieldLenMode::from_max_len(99), FieldLenMode::Llvar);
        assert_eq!(FieldLenMode::from_max_len(100), FieldLenMode::Lllvar);
        assert_eq!(FieldLenMode::from_max_len(999), FieldLenMode::Lllvar);
        assert_eq!(FieldLenMode::from_max_len(1000), FieldLenMode::Llllvar);
    }

    #[test]
    fn format_validation() {
        assert!(FieldFormat::N.validate("123"));
        assert!(!FieldFormat::N.validate("12a"));
        assert!(!FieldFormat::N.validate(""));
        assert!(FieldFormat::A.validate("abcXYZ"));
        assert!(!FieldFormat::A.validate("abc1"));
        assert!(FieldFormat::An.validate("abc123"));
        assert!(FieldFormat::Ans.validate("any! thing"));
        assert!(FieldFormat::B.validate("deadBEEF"));
        assert!(FieldFormat::Xn.validate("C12345"));
        assert!(FieldFormat::Xn.validate("012345"));
        assert!(!FieldFormat::Xn.validate("X12345"));
    }

    #[test]
    fn ns_and_as_and_s_reject_pure_classes() {
        assert!(!FieldFormat::Ns.validate("abc"));
        assert!(FieldFormat::Ns.validate("abc1"));
        assert!(!FieldFormat::As.validate("123"));
        assert!(FieldFormat::As.validate("abc1"));
        assert!(!FieldFormat::S.validate("abc123"));
    }
}
