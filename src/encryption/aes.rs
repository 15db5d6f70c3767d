//! AES-CBC for PDF strings and streams.
//!
//! Encrypted payloads carry the 16-byte IV as a prefix and PKCS#7 padding.
//! The unpadded variants serve the AES-256 key wrapping in `UE`/`OE`/`Perms`
//! and the revision 6 hash.
//!
//! PDF Spec: Section 7.6.2 - General Encryption Algorithm

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes256};
use cbc::{Decryptor, Encryptor};

use crate::error::{Error, Result};

const BLOCK: usize = 16;

/// CBC-encrypt block-aligned data without padding. The key selects AES-128
/// or AES-256 by its length.
pub fn cbc_encrypt_no_padding(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % BLOCK != 0 {
        return Err(Error::Encryption("AES input is not block aligned".to_string()));
    }
    let mut buffer = data.to_vec();
    let len = buffer.len();
    match key.len() {
        16 => {
            Encryptor::<Aes128>::new_from_slices(key, iv)
                .map_err(|_| invalid_key_or_iv())?
                .encrypt_padded_mut::<NoPadding>(&mut buffer, len)
                .map_err(|_| Error::Encryption("AES encryption failed".to_string()))?;
        },
        32 => {
            Encryptor::<Aes256>::new_from_slices(key, iv)
                .map_err(|_| invalid_key_or_iv())?
                .encrypt_padded_mut::<NoPadding>(&mut buffer, len)
                .map_err(|_| Error::Encryption("AES encryption failed".to_string()))?;
        },
        n => return Err(Error::Encryption(format!("invalid AES key length {}", n))),
    }
    Ok(buffer)
}

/// CBC-decrypt block-aligned data without removing padding.
pub fn cbc_decrypt_no_padding(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % BLOCK != 0 {
        return Err(Error::Encryption("AES ciphertext is not block aligned".to_string()));
    }
    let mut buffer = data.to_vec();
    match key.len() {
        16 => {
            Decryptor::<Aes128>::new_from_slices(key, iv)
                .map_err(|_| invalid_key_or_iv())?
                .decrypt_padded_mut::<NoPadding>(&mut buffer)
                .map_err(|_| Error::Encryption("AES decryption failed".to_string()))?;
        },
        32 => {
            Decryptor::<Aes256>::new_from_slices(key, iv)
                .map_err(|_| invalid_key_or_iv())?
                .decrypt_padded_mut::<NoPadding>(&mut buffer)
                .map_err(|_| Error::Encryption("AES decryption failed".to_string()))?;
        },
        n => return Err(Error::Encryption(format!("invalid AES key length {}", n))),
    }
    Ok(buffer)
}

fn invalid_key_or_iv() -> Error {
    Error::Encryption("invalid AES key or IV length".to_string())
}

/// Encrypt with a fresh random IV, returned as the first 16 bytes.
pub fn encrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let iv = super::random_bytes(BLOCK);
    let pad = BLOCK - data.len() % BLOCK;
    let mut padded = Vec::with_capacity(data.len() + pad);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad, pad as u8);

    let mut out = iv.clone();
    out.extend(cbc_encrypt_no_padding(key, &iv, &padded)?);
    Ok(out)
}

/// Decrypt an IV-prefixed payload and strip PKCS#7 padding.
///
/// Invalid padding is tolerated with a warning, as some writers omit it.
pub fn decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < BLOCK {
        if !data.is_empty() {
            log::warn!("AES payload shorter than its IV ({} bytes)", data.len());
        }
        return Ok(Vec::new());
    }
    let (iv, body) = data.split_at(BLOCK);
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let usable = body.len() - body.len() % BLOCK;
    if usable != body.len() {
        log::warn!("AES payload not block aligned; ignoring {} trailing bytes", body.len() - usable);
    }
    let mut plain = cbc_decrypt_no_padding(key, iv, &body[..usable])?;

    let pad = plain.last().copied().unwrap_or(0) as usize;
    let valid = (1..=BLOCK).contains(&pad)
        && pad <= plain.len()
        && plain[plain.len() - pad..].iter().all(|&b| b as usize == pad);
    if valid {
        plain.truncate(plain.len() - pad);
    } else {
        log::warn!("Invalid PKCS#7 padding in AES payload");
    }
    Ok(plain)
}
