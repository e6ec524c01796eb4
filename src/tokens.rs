//! The proprietary sub-token grammar carried inside field 63: fixed-offset
//! ASCII records tagged `! EW`, `! ER`, `! EX`, `! ES`, `! EZ`.
//!
//! Every sub-token begins with `! XX`, a 5-digit decimal nominal length and
//! a space, then a payload. Parsing here slices by fixed offset rather than
//! trusting the stated length field, matching the wire behavior terminals
//! actually rely on.

use crate::crc32;
use crate::error::{Error, Result};
use crate::hex;

const EW_LEN: usize = 548;
const ER_LEN: usize = 12;
const EX_LEN: usize = 78;
const ES_LEN: usize = 70;
const EZ_LEN: usize = 108;

fn locate(field63: &str, marker: &'static str, total_len: usize) -> Result<&str> {
    let start = field63.find(marker).ok_or(Error::BadToken { marker })?;
    field63
        .get(start..start + total_len)
        .ok_or(Error::BadToken { marker })
}

/// The decoded fields of an `! EW` key-init request token.
pub struct KeyInitRequest {
    /// The RSA-wrapped transport key ciphertext.
    pub ciphered_tk: Vec<u8>,
    /// The transport key's key check value, as carried in the token.
    pub kcv: Vec<u8>,
    /// The CRC-32 trailer, as carried in the token (uppercase hex per the
    /// authoritative convention).
    pub crc: String,
}

/// Parse an `! EW` token out of field 63's text, by locating the marker and
/// slicing its fixed 548-character span.
pub fn parse_key_init_request(field63: &str) -> Result<KeyInitRequest> {
    let token = locate(field63, "! EW", EW_LEN)?;
    let ciphered_tk_hex = &token[10..522];
    let kcv_hex = &token[522..528];
    let crc = token[540..548].to_string();
    Ok(KeyInitRequest {
        ciphered_tk: hex::hex_to_bytes(ciphered_tk_hex)?,
        kcv: hex::hex_to_bytes(kcv_hex)?,
        crc,
    })
}

/// Verify the CRC-32 trailer of an `! EW` token: computed over the ASCII
/// encoding of the *uppercased* hex of the transport-key ciphertext (the
/// authoritative convention between the two observed in the field). Raises
/// [`Error::CrcMismatch`] on mismatch so callers propagate it with `?`
/// alongside every other token failure.
pub fn verify_key_init_request_crc(req: &KeyInitRequest) -> Result<()> {
    let upper_hex = hex::bytes_to_hex(&req.ciphered_tk).to_uppercase();
    if crc32::crc32_hex(upper_hex.as_bytes()).to_uppercase() == req.crc.to_uppercase() {
        Ok(())
    } else {
        Err(Error::CrcMismatch)
    }
}

/// Build the `! ER` response-flags token: 2 flag digits after a fixed
/// `00002`-length header (the stated length is stale; terminals use fixed
/// offsets). `require_key_init` wins over `suggest_key_init` if both are
/// set.
pub fn token_er(suggest_key_init: bool, require_key_init: bool, should_update_bin: bool) -> String {
    let first = if require_key_init {
        '2'
    } else if suggest_key_init {
        '1'
    } else {
        '0'
    };
    let second = if should_update_bin { '1' } else { '0' };
    format!("! ER00002 {first}{second}")
}

/// Build the `! EX` key-init-success reply token.
///
/// `k0_ciphered` is the new base key enciphered under the transport key
/// (16 bytes in practice, though the nominal grammar documents 8 - the
/// handler must emit what the ciphering step actually produces).
pub fn token_ex(k0_ciphered: &[u8], ksn: &[u8], k0_kcv: &[u8]) -> Result<String> {
    if ksn.len() != 10 {
        return Err(Error::CryptoFailure(format!(
            "! EX KSN must be 10 bytes, got {}",
            ksn.len()
        )));
    }
    if k0_kcv.len() != 3 {
        return Err(Error::CryptoFailure(format!(
            "! EX KCV must be 3 bytes, got {}",
            k0_kcv.len()
        )));
    }
    let ciphered_hex = hex::bytes_to_hex(k0_ciphered);
    let crc = crc32::crc32_hex(ciphered_hex.as_bytes());
    Ok(format!(
        "! EX00068 {}{}{}00{}",
        ciphered_hex,
        hex::bytes_to_hex(ksn),
        hex::bytes_to_hex(k0_kcv),
        crc
    ))
}

/// Build an `! EX` error reply token: all-zero payload with a 2-digit error
/// code in place of the status byte.
pub fn token_ex_error(code2: &str) -> String {
    format!(
        "! EX00068 {}{}{}{}{}",
        "0".repeat(32),
        "0".repeat(20),
        "0".repeat(6),
        code2,
        "0".repeat(8)
    )
}

/// The decoded fields of an `! ES` sale marker.
pub struct SaleMarker {
    /// True iff the track data accompanying this sale is carried encrypted
    /// in a following `! EZ` token.
    pub encrypted: bool,
}

/// Parse an `! ES` token: the byte at offset 50 is `'5'` iff track data is
/// encrypted.
pub fn parse_sale_marker(field63: &str) -> Result<SaleMarker> {
    let token = locate(field63, "! ES", ES_LEN)?;
    let flag = token.as_bytes()[50];
    Ok(SaleMarker {
        encrypted: flag == b'5',
    })
}

/// The decoded fields of an `! EZ` encrypted-sale token.
pub struct EncryptedSale {
    /// The 10-byte DUKPT KSN under which the track ciphertext was
    /// encrypted.
    pub ksn: Vec<u8>,
    /// The 24-byte encrypted track-2-equivalent ciphertext.
    pub ciphertext: Vec<u8>,
}

/// Parse an `! EZ` token: 10-byte KSN at hex offsets 10..30, 24-byte
/// ciphertext at hex offsets 48..96.
pub fn parse_encrypted_sale(field63: &str) -> Result<EncryptedSale> {
    let token = locate(field63, "! EZ", EZ_LEN)?;
    let ksn = hex::hex_to_bytes(&token[10..30])?;
    let ciphertext = hex::hex_to_bytes(&token[48..96])?;
    Ok(EncryptedSale { ksn, ciphertext })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_er_flags() {
        assert_eq!(token_er(false, false, false), "! ER00002 00");
        assert_eq!(token_er(true, false, false), "! ER00002 10");
        assert_eq!(token_er(false, true, false), "! ER00002 20");
        assert_eq!(token_er(false, false, true), "! ER00002 01");
        assert_eq!(token_er(false, false, false).len(), ER_LEN);
    }

    #[test]
    fn token_ex_error_is_108_all_zero_chars_with_code() {
        let t = token_ex_error("03");
        assert_eq!(t.len(), EX_LEN);
        assert!(t.starts_with("! EX00068 "));
        assert!(t.contains("03"));
        assert!(t.ends_with("00000000"));
    }

    #[test]
    fn token_ex_rejects_wrong_ksn_length() {
        assert!(token_ex(&[0u8; 16], &[0u8; 9], &[0u8; 3]).is_err());
    }

    #[test]
    fn token_ex_builds_expected_length() {
        let t = token_ex(&[0xab; 16], &[0x11; 10], &[0x22; 3]).unwrap();
        assert_eq!(t.len(), EX_LEN);
        assert!(t.starts_with("! EX00068 "));
    }

    #[test]
    fn sale_marker_reads_offset_50() {
        let mut payload = "! ES00065 ".to_string();
        payload.push_str(&"0".repeat(40));
        payload.push('5');
        payload.push_str(&"0".repeat(ES_LEN - payload.len()));
        let marker = parse_sale_marker(&payload).unwrap();
        assert!(marker.encrypted);
    }

    #[test]
    fn missing_marker_is_bad_token() {
        assert!(matches!(
            parse_key_init_request("no markers here"),
            Err(Error::BadToken { marker: "! EW" })
        ));
    }
}
