//! Raw Triple-DES, ECB mode, no padding. The whole input must be a multiple
//! of the 8-byte block size; a 16-byte key is expanded to the 3-key EDE form
//! `(K1, K2, K1)` by reusing the key's first 8 bytes as K3.

use crate::error::{Error, Result};
use cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use des::{Des, TdesEde3};

const BLOCK_LEN: usize = 8;

fn tdes_key(key: &[u8]) -> Result<TdesEde3> {
    let expanded: Vec<u8> = match key.len() {
        16 => [key, &key[..8]].concat(),
        24 => key.to_vec(),
        n => {
            return Err(Error::CryptoFailure(format!(
                "3DES key must be 16 or 24 bytes, got {n}"
            )))
        }
    };
    TdesEde3::new_from_slice(&expanded)
        .map_err(|e| Error::CryptoFailure(format!("bad 3DES key: {e}")))
}

fn check_block_multiple(data: &[u8]) -> Result<()> {
    if data.len() % BLOCK_LEN != 0 {
        return Err(Error::CryptoFailure(format!(
            "3DES input length {} is not a multiple of {BLOCK_LEN}",
            data.len()
        )));
    }
    Ok(())
}

/// Encrypt `data` under `key` (16 or 24 bytes), one 8-byte block at a time,
/// independently (ECB). `data.len()` must be a multiple of 8.
pub fn ecb_encrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_block_multiple(data)?;
    let cipher = tdes_key(key)?;
    let mut out = data.to_vec();
    for block in out.chunks_exact_mut(BLOCK_LEN) {
        let generic = cipher::generic_array::GenericArray::from_mut_slice(block);
        cipher.encrypt_block(generic);
    }
    Ok(out)
}

/// Decrypt `data` under `key` (16 or 24 bytes), one 8-byte block at a time,
/// independently (ECB). `data.len()` must be a multiple of 8.
pub fn ecb_decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_block_multiple(data)?;
    let cipher = tdes_key(key)?;
    let mut out = data.to_vec();
    for block in out.chunks_exact_mut(BLOCK_LEN) {
        let generic = cipher::generic_array::GenericArray::from_mut_slice(block);
        cipher.decrypt_block(generic);
    }
    Ok(out)
}

/// Single-DES ECB encrypt of one 8-byte block, used internally by the DUKPT
/// key-register step (`encReg`), which is single-DES rather than 3DES.
pub fn des_encrypt_block(key: &[u8; 8], block: &[u8; 8]) -> [u8; 8] {
    let cipher = Des::new_from_slice(key).expect("DES key is exactly 8 bytes");
    let mut buf = *block;
    let generic = cipher::generic_array::GenericArray::from_mut_slice(&mut buf);
    cipher.encrypt_block(generic);
    buf
}

/// Compute a key check value: the first 3 bytes of the 3DES-ECB encryption
/// of an all-zero 8-byte block under `key`.
pub fn kcv(key: &[u8]) -> Result<[u8; 3]> {
    let block = ecb_encrypt(key, &[0u8; 8])?;
    Ok([block[0], block[1], block[2]])
}

/// Check `key`'s KCV against an `expected` value carried alongside it,
/// raising [`Error::KcvMismatch`] rather than just returning a bool so
/// callers can propagate it through `?` like any other crypto failure.
pub fn verify_kcv(key: &[u8], expected: &[u8]) -> Result<()> {
    if kcv(key)?.as_slice() == expected {
        Ok(())
    } else {
        Err(Error::KcvMismatch)
    }
}
