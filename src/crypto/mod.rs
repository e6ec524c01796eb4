//! Payment cryptography kernel: 3DES-ECB, DUKPT key derivation, and RSA
//! transport-key unwrap / terminal-token signing.

pub mod des3;
pub mod dukpt;
pub mod rsa_ops;

/// The hard-coded base derivation key used by every sale/key-init exchange
/// this acquirer simulator handles. A reference simulator, not a production
/// HSM: there is exactly one BDK.
pub const BDK: [u8; 16] = [
    0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54, 0x32, 0x10,
];

/// The new base key injected during key-init, ciphered under the terminal's
/// transport key and handed back in the `! EX` reply token.
pub const NEW_BASE_KEY: [u8; 16] = [
    0xfd, 0xb5, 0xc1, 0x38, 0xd3, 0x1d, 0xdc, 0xaa, 0x6c, 0x5d, 0xc7, 0x68, 0x27, 0xef, 0x48, 0x7e,
];

/// The KSN handed back alongside [`NEW_BASE_KEY`] in the `! EX` reply token.
pub const NEW_BASE_KEY_KSN: [u8; 10] = [0x01, 0x02, 0x01, 0x23, 0x45, 0x67, 0x8a, 0xe0, 0x00, 0x00];
