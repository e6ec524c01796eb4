//! DUKPT (Derived Unique Key Per Transaction) key derivation: BDK -> IPEK ->
//! base key (via the shift-register loop) -> data/PIN/MAC session keys.
//! Purely functional: every key is derived fresh from `(BDK, KSN)`, nothing
//! is mutated in place across calls.

use crate::crypto::des3;
use crate::error::{Error, Result};

const KSN_MASK: [u8; 10] = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xE0, 0x00, 0x00];
const BDK_VARIANT_MASK: [u8; 16] = [
    0xC0, 0xC0, 0xC0, 0xC0, 0x00, 0x00, 0x00, 0x00, 0xC0, 0xC0, 0xC0, 0xC0, 0x00, 0x00, 0x00, 0x00,
];
const DATA_VARIANT_MASK: [u8; 16] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00,
];
const PIN_VARIANT_MASK: [u8; 16] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF,
];
const MAC_VARIANT_MASK: [u8; 16] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x00,
];

fn xor16(a: &[u8; 16], b: &[u8; 16]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for i in 0..16 {
        out[i] = a[i] ^ b[i];
    }
    out
}

fn require_len(bytes: &[u8], expected: usize, what: &str) -> Result<()> {
    if bytes.len() != expected {
        return Err(Error::CryptoFailure(format!(
            "{what} must be {expected} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(())
}

/// Derive the Initial PIN Encryption Key from a 16-byte BDK and a 10-byte
/// KSN.
pub fn derive_ipek(bdk: &[u8], ksn: &[u8]) -> Result<[u8; 16]> {
    require_len(bdk, 16, "BDK")?;
    require_len(ksn, 10, "KSN")?;

    let mut masked_ksn8 = [0u8; 8];
    for i in 0..8 {
        masked_ksn8[i] = ksn[i] & KSN_MASK[i];
    }

    let mut bdk_key = [0u8; 16];
    bdk_key.copy_from_slice(bdk);
    let left_key: Vec<u8> = [bdk, &bdk[..8]].concat();
    let left = des3::ecb_encrypt(&left_key, &masked_ksn8)?;

    let variant = xor16(&bdk_key, &BDK_VARIANT_MASK);
    let right_key: Vec<u8> = [&variant[..], &variant[..8]].concat();
    let right = des3::ecb_encrypt(&right_key, &masked_ksn8)?;

    let mut ipek = [0u8; 16];
    ipek[..8].copy_from_slice(&left);
    ipek[8..].copy_from_slice(&right);
    Ok(ipek)
}

fn encreg(key: &[u8; 16], reg: &[u8; 8]) -> [u8; 8] {
    let top: [u8; 8] = key[..8].try_into().unwrap();
    let bot: [u8; 8] = key[8..].try_into().unwrap();
    let mut xored = [0u8; 8];
    for i in 0..8 {
        xored[i] = bot[i] ^ reg[i];
    }
    let encrypted = des3::des_encrypt_block(&top, &xored);
    let mut out = [0u8; 8];
    for i in 0..8 {
        out[i] = bot[i] ^ encrypted[i];
    }
    out
}

fn generate_key(key: &[u8; 16], reg: &[u8; 8]) -> [u8; 16] {
    let variant = xor16(key, &BDK_VARIANT_MASK);
    let variant_arr: [u8; 16] = variant;
    let left = encreg(&variant_arr, reg);
    let right = encreg(key, reg);
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&left);
    out[8..].copy_from_slice(&right);
    out
}

/// Derive the DUKPT base key for transaction counter `KSN` from `IPEK`,
/// walking the shift-register loop over the 21-bit transaction counter.
pub fn derive_base_key(ipek: &[u8; 16], ksn: &[u8]) -> Result<[u8; 16]> {
    require_len(ksn, 10, "KSN")?;

    let mut base_ksn = [0u8; 8];
    for i in 0..8 {
        base_ksn[i] = ksn[2 + i] & KSN_MASK[i];
    }
    let counter = (u32::from(ksn[7]) << 16 | u32::from(ksn[8]) << 8 | u32::from(ksn[9])) & 0x1F_FFFF;

    let mut cur_key = *ipek;
    let mut shift_reg: u32 = 0x10_0000;
    while shift_reg > 0 {
        if shift_reg & counter != 0 {
            let mut tmp_ksn = base_ksn;
            let low24 = (u32::from(base_ksn[5]) << 16
                | u32::from(base_ksn[6]) << 8
                | u32::from(base_ksn[7]))
                | shift_reg;
            tmp_ksn[5] = (low24 >> 16) as u8;
            tmp_ksn[6] = (low24 >> 8) as u8;
            tmp_ksn[7] = low24 as u8;
            base_ksn = tmp_ksn;
            cur_key = generate_key(&cur_key, &base_ksn);
        }
        shift_reg >>= 1;
    }
    Ok(cur_key)
}

/// Derive the data-encryption session key from a 16-byte base key.
pub fn derive_data_key(base_key: &[u8; 16]) -> Result<[u8; 16]> {
    let masked = xor16(base_key, &DATA_VARIANT_MASK);
    let key: Vec<u8> = [&masked[..], &masked[..8]].concat();
    let left = des3::ecb_encrypt(&key, &masked[..8])?;
    let right = des3::ecb_encrypt(&key, &masked[8..])?;
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&left);
    out[8..].copy_from_slice(&right);
    Ok(out)
}

/// Derive the PIN-encryption session key: the base key XORed with the PIN
/// variant mask, no further encryption.
pub fn derive_pin_key(base_key: &[u8; 16]) -> [u8; 16] {
    xor16(base_key, &PIN_VARIANT_MASK)
}

/// Derive the MAC session key: the base key XORed with the MAC variant
/// mask, no further encryption.
pub fn derive_mac_key(base_key: &[u8; 16]) -> [u8; 16] {
    xor16(base_key, &MAC_VARIANT_MASK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex;

    #[test]
    fn ipek_matches_ansi_x9_24_reference_vector() {
        let bdk = hex::hex_to_bytes("0123456789ABCDEFFEDCBA9876543210").unwrap();
        let ksn = hex::hex_to_bytes("FFFF9876543210E00008").unwrap();
        let ipek = derive_ipek(&bdk, &ksn).unwrap();
        assert_eq!(hex::bytes_to_hex(&ipek), "6ac292faa1315b4d858ab3a3d7d5933a");
    }

    #[test]
    fn ipek_requires_16_byte_bdk_and_10_byte_ksn() {
        assert!(derive_ipek(&[0u8; 8], &[0u8; 10]).is_err());
        assert!(derive_ipek(&[0u8; 16], &[0u8; 4]).is_err());
    }

    #[test]
    fn data_key_twice_from_same_base_is_identical() {
        let bdk = hex::hex_to_bytes("0123456789ABCDEFFEDCBA9876543210").unwrap();
        let ksn = hex::hex_to_bytes("FFFF9876543210E00008").unwrap();
        let ipek = derive_ipek(&bdk, &ksn).unwrap();
        let base = derive_base_key(&ipek, &ksn).unwrap();
        let a = derive_data_key(&base).unwrap();
        let b = derive_data_key(&base).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn data_pin_mac_variants_are_pairwise_distinct() {
        let bdk = hex::hex_to_bytes("0123456789ABCDEFFEDCBA9876543210").unwrap();
        let ksn = hex::hex_to_bytes("FFFF9876543210E00008").unwrap();
        let ipek = derive_ipek(&bdk, &ksn).unwrap();
        let base = derive_base_key(&ipek, &ksn).unwrap();
        let data = derive_data_key(&base).unwrap();
        let pin = derive_pin_key(&base);
        let mac = derive_mac_key(&base);
        assert_ne!(data, pin);
        assert_ne!(data, mac);
        assert_ne!(pin, mac);
    }
}
