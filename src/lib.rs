//! Acquirer-side ISO 8583 authorization core: codec, payment cryptography
//! kernel, and the proprietary field-63 token grammar. The HTTP layer
//! (`http`, `main`) is a thin shell around these modules; every operation
//! below is pure and callable reentrantly without locking.

pub mod bcd;
pub mod config;
pub mod crc32;
pub mod crypto;
pub mod error;
pub mod field;
pub mod handlers;
pub mod hex;
pub mod http;
pub mod message;
pub mod mti;
pub mod registry;
pub mod tlv;
pub mod tokens;
