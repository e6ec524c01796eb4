//! Message Type Indicator: a 4-digit decimal code decomposed into version,
//! class, function, and origin digits.

use crate::error::{Error, Result};
use std::fmt;

/// The ISO 8583 version the message was formatted under (MTI digit 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Version {
    V1987,
    V1993,
    V2003,
    Reserved(u8),
    National,
    Private,
}

impl Version {
    fn from_digit(d: u8) -> Self {
        match d {
            0 => Version::V1987,
            1 => Version::V1993,
            2 => Version::V2003,
            3..=7 => Version::Reserved(d),
            8 => Version::National,
            9 => Version::Private,
            _ => unreachable!("digit is 0-9"),
        }
    }

    fn to_digit(self) -> u8 {
        match self {
            Version::V1987 => 0,
            Version::V1993 => 1,
            Version::V2003 => 2,
            Version::Reserved(d) => d,
            Version::National => 8,
            Version::Private => 9,
        }
    }
}

/// The message class (MTI digit 2): what kind of transaction this is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Class {
    Reserved0,
    Authorization,
    Financial,
    FileAction,
    Reversal,
    Reconciliation,
    Administrative,
    FeeCollection,
    NetworkManagement,
    Reserved9,
}

impl Class {
    fn from_digit(d: u8) -> Self {
        match d {
            0 => Class::Reserved0,
            1 => Class::Authorization,
            2 => Class::Financial,
            3 => Class::FileAction,
            4 => Class::Reversal,
            5 => Class::Reconciliation,
            6 => Class::Administrative,
            7 => Class::FeeCollection,
            8 => Class::NetworkManagement,
            9 => Class::Reserved9,
            _ => unreachable!("digit is 0-9"),
        }
    }

    fn to_digit(self) -> u8 {
        match self {
            Class::Reserved0 => 0,
            Class::Authorization => 1,
            Class::Financial => 2,
            Class::FileAction => 3,
            Class::Reversal => 4,
            Class::Reconciliation => 5,
            Class::Administrative => 6,
            Class::FeeCollection => 7,
            Class::NetworkManagement => 8,
            Class::Reserved9 => 9,
        }
    }
}

/// The message function (MTI digit 3): request, response, advice, etc.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    Request,
    RequestResponse,
    Advice,
    AdviceResponse,
    Notification,
    NotificationAck,
    InstructionAck,
    Reserved(u8),
}

impl Function {
    fn from_digit(d: u8) -> Self {
        match d {
            0 => Function::Request,
            1 => Function::RequestResponse,
            2 => Function::Advice,
            3 => Function::AdviceResponse,
            4 => Function::Notification,
            5 => Function::NotificationAck,
            6 => Function::InstructionAck,
            7..=9 => Function::Reserved(d),
            _ => unreachable!("digit is 0-9"),
        }
    }

    fn to_digit(self) -> u8 {
        match self {
            Function::Request => 0,
            Function::RequestResponse => 1,
            Function::Advice => 2,
            Function::AdviceResponse => 3,
            Function::Notification => 4,
            Function::NotificationAck => 5,
            Function::InstructionAck => 6,
            Function::Reserved(d) => d,
        }
    }
}

/// The message origin (MTI digit 4): who originated it and where it sits in
/// the acquirer/issuer topology.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Acquirer,
    AcquirerRepeat,
    Issuer,
    IssuerRepeat,
    Other,
    OtherRepeat,
    Reserved(u8),
}

impl Origin {
    fn from_digit(d: u8) -> Self {
        match d {
            0 => Origin::Acquirer,
            1 => Origin::AcquirerRepeat,
            2 => Origin::Issuer,
            3 => Origin::IssuerRepeat,
            4 => Origin::Other,
            5 => Origin::OtherRepeat,
            6..=9 => Origin::Reserved(d),
            _ => unreachable!("digit is 0-9"),
        }
    }

    fn to_digit(self) -> u8 {
        match self {
            Origin::Acquirer => 0,
            Origin::AcquirerRepeat => 1,
            Origin::Issuer => 2,
            Origin::IssuerRepeat => 3,
            Origin::Other => 4,
            Origin::OtherRepeat => 5,
            Origin::Reserved(d) => d,
        }
    }
}

/// A 4-digit Message Type Indicator, decomposed into its four semantic digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mti {
    pub version: Version,
    pub class: Class,
    pub function: Function,
    pub origin: Origin,
}

impl Mti {
    /// Parse a 4-digit decimal MTI string. Fails with [`Error::BadMti`] unless
    /// the string is exactly 4 ASCII decimal digits.
    pub fn parse(s: &str) -> Result<Mti> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(u8::is_ascii_digit) {
            return Err(Error::BadMti(s.to_string()));
        }
        let d = |i: usize| bytes[i] - b'0';
        Ok(Mti {
            version: Version::from_digit(d(0)),
            class: Class::from_digit(d(1)),
            function: Function::from_digit(d(2)),
            origin: Origin::from_digit(d(3)),
        })
    }

}

impl fmt::Display for Mti {
    /// Render back to the canonical 4-digit decimal string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            self.version.to_digit(),
            self.class.to_digit(),
            self.function.to_digit(),
            self.origin.to_digit()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_any_4_digit_string() {
        for s in ["0200", "0210", "0800", "1999", "0000"] {
            assert_eq!(Mti::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn rejects_non_digit() {
        assert!(matches!(Mti::parse("02AB"), Err(Error::BadMti(_))));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Mti::parse("210").is_err());
        assert!(Mti::parse("02100").is_err());
    }

    #[test]
    fn decomposes_sale_response() {
        let mti = Mti::parse("0210").unwrap();
        assert_eq!(mti.version, Version::V1987);
        assert_eq!(mti.class, Class::Authorization);
        assert_eq!(mti.function, Function::RequestResponse);
        assert_eq!(mti.origin, Origin::Acquirer);
    }
}
