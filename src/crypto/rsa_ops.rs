//! RSA operations: transport-key unwrap (PKCS#1 v1.5 decrypt) and terminal
//! provisioning-token signing (RSASSA-PKCS1-v1.5 with SHA-256).

use crate::error::{Error, Result};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256};

/// Load a PEM-encoded RSA private key, trying PKCS#1 first and falling
/// back to PKCS#8 (the two forms `openssl genrsa`/`openssl pkcs8` produce).
pub fn load_private_key_pem(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|e| Error::CryptoFailure(format!("invalid RSA private key PEM: {e}")))
}

/// Unwrap an RSA-PKCS#1-v1.5-encrypted transport key.
pub fn decrypt_transport_key(private_key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
    private_key
        .decrypt(Pkcs1v15Encrypt, ciphertext)
        .map_err(|e| Error::CryptoFailure(format!("RSA transport-key decrypt failed: {e}")))
}

/// Sign `payload` with RSASSA-PKCS1-v1.5 over SHA-256, as used for the
/// terminal provisioning token.
pub fn sign_sha256(private_key: &RsaPrivateKey, payload: &[u8]) -> Result<Vec<u8>> {
    let digest = Sha256::digest(payload);
    private_key
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| Error::CryptoFailure(format!("RSA-SHA256 sign failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::traits::PublicKeyParts;
    use rsa::RsaPublicKey;

    fn test_key() -> RsaPrivateKey {
        let mut rng = rand::thread_rng();
        RsaPrivateKey::new(&mut rng, 1024).expect("key generation")
    }

    #[test]
    fn decrypts_what_was_encrypted_with_the_matching_public_key() {
        let private = test_key();
        let public = RsaPublicKey::from(&private);
        let mut rng = rand::thread_rng();
        let ciphertext = public
            .encrypt(&mut rng, Pkcs1v15Encrypt, b"0123456789ABCDEF")
            .unwrap();
        let plain = decrypt_transport_key(&private, &ciphertext).unwrap();
        assert_eq!(plain, b"0123456789ABCDEF");
    }

    #[test]
    fn sign_produces_modulus_sized_signature() {
        let private = test_key();
        let sig = sign_sha256(&private, b"payload").unwrap();
        assert_eq!(sig.len(), private.size());
    }
}
