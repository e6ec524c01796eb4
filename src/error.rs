//! Core error type.
//!
use std::fmt;

/// An acquirer-core [`Result`], normally returning an [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised by the ISO 8583 codec or payment cryptography kernel.
#[derive(Clone, Debug)]
pub enum Error {
    /// Odd-length or non-hex digit in a hex conversion.
    BadHex,
    /// Non-decimal digit encountered in a BCD conversion.
    BadBcd,
    /// A field-definition registry contained a field number <= 1.
    BadRegistry {
        /// The offending field number.
        field: u32,
    },
    /// A field was set or read that has no entry in the registry.
    BadField {
        /// The undefined field number.
        field: u32,
    },
    /// A value didn't match the format's validation regex.
    BadFormat {
        /// The field the value was destined for.
        field: u32,
    },
    /// A value was longer than the field definition's maximum length.
    BadLen {
        /// The field the value was destined for.
        field: u32,
        /// The maximum allowed length.
        max: usize,
        /// The actual length given.
        actual: usize,
    },
    /// An MTI string was not exactly 4 decimal digits.
    BadMti(String),
    /// A field-63 sub-token marker (`! EW`/`! ES`/`! EZ`/...) was missing or too short.
    BadToken {
        /// The expected marker, e.g. `"! EW"`.
        marker: &'static str,
    },
    /// The CRC-32 trailer on an incoming field-63 token didn't match.
    CrcMismatch,
    /// A transport key's KCV didn't match the KCV carried alongside it.
    KcvMismatch,
    /// An RSA or 3DES operation failed: bad ciphertext, bad signature, or
    /// input not a multiple of the cipher's block size.
    CryptoFailure(String),
    /// A required message field was absent (e.g. field 63 during key-init).
    MissingField {
        /// The missing field number.
        field: u32,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadHex => write!(f, "odd-length or non-hex digit in hex conversion"),
            Error::BadBcd => write!(f, "non-decimal digit in BCD conversion"),
            Error::BadRegistry { field } => {
                write!(f, "field {field} may not be registered (field 1 is reserved)")
            }
            Error::BadField { field } => write!(f, "field {field} is not in the registry"),
            Error::BadFormat { field } => write!(f, "value for field {field} fails its format"),
            Error::BadLen { field, max, actual } => write!(
                f,
                "field {field} value is {actual} bytes, exceeds max of {max}"
            ),
            Error::BadMti(s) => write!(f, "'{s}' is not a valid 4-digit MTI"),
            Error::BadToken { marker } => write!(f, "missing or truncated {marker} token"),
            Error::CrcMismatch => write!(f, "field-63 CRC-32 did not match"),
            Error::KcvMismatch => write!(f, "transport key KCV did not match"),
            Error::CryptoFailure(msg) => write!(f, "cryptographic operation failed: {msg}"),
            Error::MissingField { field } => write!(f, "field {field} not present in message"),
        }
    }
}

impl std::error::Error for Error {}

impl From<rsa::Error> for Error {
    fn from(e: rsa::Error) -> Self {
        Error::CryptoFailure(e.to_string())
    }
}

impl From<rsa::pkcs8::Error> for Error {
    fn from(e: rsa::pkcs8::Error) -> Self {
        Error::CryptoFailure(e.to_string())
    }
}

impl From<rsa::pkcs1::Error> for Error {
    fn from(e: rsa::pkcs1::Error) -> Self {
        Error::CryptoFailure(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_bounded_and_has_no_field_values() {
        let e = Error::BadFormat { field: 39 };
        let s = e.to_string();
        assert!(s.contains("39"));
        assert!(s.len() < 120);
    }
}
