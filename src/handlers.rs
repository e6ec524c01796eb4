//! Pure business logic for the three HTTP-facing operations: key injection,
//! sale authorization, and terminal-token issuance. No HTTP types appear
//! here; handlers operate on bytes and strings so they can be exercised
//! directly from tests.

use crate::crypto::{des3, dukpt, rsa_ops, BDK, NEW_BASE_KEY, NEW_BASE_KEY_KSN};
use crate::error::{Error, Result};
use crate::hex;
use crate::message::{FieldRegistry, IsoMessage};
use crate::mti::Mti;
use crate::tokens;
use rsa::RsaPrivateKey;
use tracing::warn;

/// Parse a hex-encoded ISO request, run `business` against the unpacked
/// message (returning its field-39 response code and field-63 payload, if
/// any), and pack a response message with the given reply MTI.
fn respond(
    hex_request: &str,
    registry: &FieldRegistry,
    reply_mti: &str,
    business: impl FnOnce(&IsoMessage) -> Result<(&'static str, Option<String>)>,
) -> Result<String> {
    let bytes = hex::hex_to_bytes(hex_request)?;
    let request = IsoMessage::unpack(&bytes, registry)?;
    let (field39, field63) = business(&request)?;

    let mut reply = IsoMessage::new(registry);
    reply.set_mti(Mti::parse(reply_mti)?);
    reply.set_field(39, field39)?;
    if let Some(value) = field63 {
        reply.set_field(63, &value)?;
    }
    let packed = reply.pack()?;
    Ok(hex::bytes_to_hex(&packed))
}

/// Handle `/keyinit/<iso>`: verify the key-init `! EW` token's CRC and KCV,
/// wrap the new base key under the terminal's transport key, and reply with
/// `! ER` + `! EX`.
pub fn key_init(hex_request: &str, registry: &FieldRegistry, transport_key: &RsaPrivateKey) -> Result<String> {
    respond(hex_request, registry, "0810", |request| {
        let field63 = request
            .field(63)
            .ok_or(Error::MissingField { field: 63 })?;
        let ew = tokens::parse_key_init_request(field63)?;

        let unwrapped = (|| -> Result<Vec<u8>> {
            tokens::verify_key_init_request_crc(&ew)?;
            let tk = rsa_ops::decrypt_transport_key(transport_key, &ew.ciphered_tk)?;
            des3::verify_kcv(&tk, &ew.kcv)?;
            Ok(tk)
        })();

        let tk = match unwrapped {
            Ok(tk) => tk,
            Err(err @ Error::CrcMismatch) => {
                warn!(error = %err, "key-init request rejected");
                let reply63 = format!("{}{}", tokens::token_er(false, false, false), tokens::token_ex_error("03"));
                return Ok(("73", Some(reply63)));
            }
            Err(err @ Error::KcvMismatch) => {
                warn!(error = %err, "key-init request rejected");
                let reply63 = format!("{}{}", tokens::token_er(false, false, false), tokens::token_ex_error("01"));
                return Ok(("72", Some(reply63)));
            }
            Err(err) => return Err(err),
        };

        let k0_kcv = des3::kcv(&NEW_BASE_KEY)?;
        let k0_ciphered = des3::ecb_encrypt(&tk, &NEW_BASE_KEY)?;
        let reply63 = format!(
            "{}{}",
            tokens::token_er(false, false, false),
            tokens::token_ex(&k0_ciphered, &NEW_BASE_KEY_KSN, &k0_kcv)?
        );
        Ok(("00", Some(reply63)))
    })
}

fn extract_pan_from_track2(track2: &str) -> Option<&str> {
    track2.find(['D', '=']).map(|i| &track2[..i])
}

fn extract_pan(request: &IsoMessage) -> Result<String> {
    if let Some(pan) = request.field(2) {
        return Ok(pan.to_string());
    }
    if let Some(track2) = request.field(35) {
        if let Some(pan) = extract_pan_from_track2(track2) {
            return Ok(pan.to_string());
        }
    }
    let field63 = request
        .field(63)
        .ok_or(Error::MissingField { field: 63 })?;
    let marker = tokens::parse_sale_marker(field63)?;
    if !marker.encrypted {
        return Err(Error::BadToken { marker: "! ES" });
    }
    let ez = tokens::parse_encrypted_sale(field63)?;
    let ipek = dukpt::derive_ipek(&BDK, &ez.ksn)?;
    let base_key = dukpt::derive_base_key(&ipek, &ez.ksn)?;
    let data_key = dukpt::derive_data_key(&base_key)?;
    let plain = des3::ecb_decrypt(&data_key, &ez.ciphertext)?;
    let plain_hex = hex::bytes_to_hex(&plain).to_uppercase();
    extract_pan_from_track2(&plain_hex)
        .map(str::to_string)
        .ok_or(Error::BadToken { marker: "! EZ" })
}

/// Handle `/sale/<iso>`: extract the PAN (field 2, field 35, or the DUKPT-
/// decrypted `! EZ` token) and reject transactions whose PAN starts with
/// `'4'`.
pub fn sale(hex_request: &str, registry: &FieldRegistry) -> Result<String> {
    respond(hex_request, registry, "0210", |request| {
        match extract_pan(request) {
            Ok(pan) if pan.starts_with('4') => Ok(("01", None)),
            Ok(_) => Ok(("00", None)),
            Err(err) => {
                warn!(error = %err, "sale PAN extraction failed, declining");
                Ok(("01", None))
            }
        }
    })
}

/// The acquirer's reserved byte preceding the signature/expiry in a
/// provisioning token.
const TOKEN_VERSION: u8 = 0x01;

/// Handle `/token/<serial>`: sign a short-lived provisioning payload for an
/// allow-listed terminal serial, returning raw `version || signature ||
/// exp` bytes. `now_ms` and `validity_ms` are injected so the expiry
/// computation stays deterministic and testable.
pub fn terminal_token(
    serial: &str,
    allow_list: &[String],
    token_key: &RsaPrivateKey,
    now_ms: u64,
    validity_ms: u64,
) -> Result<Vec<u8>> {
    if !allow_list.iter().any(|s| s == serial) {
        return Err(Error::BadToken { marker: "serial" });
    }
    let exp_ms = now_ms + validity_ms;
    let mut payload = vec![TOKEN_VERSION];
    payload.extend_from_slice(&exp_ms.to_be_bytes()[2..]);
    payload.extend_from_slice(serial.as_bytes());

    let signature = rsa_ops::sign_sha256(token_key, &payload)?;

    let mut out = vec![TOKEN_VERSION];
    out.extend_from_slice(&signature);
    out.extend_from_slice(&exp_ms.to_be_bytes()[2..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::standard_field_definitions;

    #[test]
    fn sale_rejects_pan_starting_with_4_via_track2() {
        let registry = standard_field_definitions();
        let mut msg = IsoMessage::new(&registry);
        msg.set_mti(Mti::parse("0200").unwrap());
        msg.set_field(35, "4761340000000019D25121010000000000000")
            .unwrap();
        let packed = msg.pack().unwrap();
        let hex_request = hex::bytes_to_hex(&packed);
        let response = sale(&hex_request, &registry).unwrap();
        let response_bytes = hex::hex_to_bytes(&response).unwrap();
        let response_msg = IsoMessage::unpack(&response_bytes, &registry).unwrap();
        assert_eq!(response_msg.field(39), Some("01"));
    }

    #[test]
    fn sale_approves_pan_not_starting_with_4() {
        let registry = standard_field_definitions();
        let mut msg = IsoMessage::new(&registry);
        msg.set_mti(Mti::parse("0200").unwrap());
        msg.set_field(2, "5411111111111111").unwrap();
        let packed = msg.pack().unwrap();
        let hex_request = hex::bytes_to_hex(&packed);
        let response = sale(&hex_request, &registry).unwrap();
        let response_bytes = hex::hex_to_bytes(&response).unwrap();
        let response_msg = IsoMessage::unpack(&response_bytes, &registry).unwrap();
        assert_eq!(response_msg.field(39), Some("00"));
    }

    #[test]
    fn terminal_token_rejects_unknown_serial() {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let allow_list = vec!["KNOWN001".to_string()];
        let err = terminal_token("UNKNOWN", &allow_list, &key, 0, 1000);
        assert!(matches!(err, Err(Error::BadToken { marker: "serial" })));
    }

    #[test]
    fn terminal_token_signs_known_serial() {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let allow_list = vec!["KNOWN001".to_string()];
        let token = terminal_token("KNOWN001", &allow_list, &key, 1_000, 2_000).unwrap();
        assert_eq!(token[0], TOKEN_VERSION);
        use rsa::traits::PublicKeyParts;
        assert_eq!(token.len(), 1 + key.size() + 6);
    }
}
