//! Standard security handler password algorithms.
//!
//! Revisions 2-4 derive the file key from the password with MD5 and RC4
//! (PDF Spec: Section 7.6.3.3, Algorithms 2-7). Revisions 5 and 6 store a
//! random file key wrapped with a SHA-2 based hash of the password
//! (ISO 32000-2:2020, Section 7.6.4.3.3, Algorithms 2.A, 2.B, 8-12).

use md5::{Digest, Md5};
use sha2::{Sha256, Sha384, Sha512};

use super::aes;
use super::rc4::rc4_crypt;
use crate::error::Result;

/// Padding string used in PDF encryption (32 bytes).
///
/// PDF Spec: Algorithm 2, step a
pub const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Pad or truncate a password to 32 bytes.
pub fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = PADDING;
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PADDING[..32 - len]);
    padded
}

/// Truncate a password to 127 bytes on a UTF-8 boundary (revisions 5 and 6).
pub fn truncate_password(password: &[u8]) -> &[u8] {
    if password.len() <= 127 {
        return password;
    }
    let mut end = 127;
    while end > 0 && (password[end] & 0xC0) == 0x80 {
        end -= 1;
    }
    &password[..end]
}

// ============================================================================
// Revisions 2-4
// ============================================================================

/// Parameters of a revision 2-4 encryption dictionary.
#[derive(Debug, Clone, Copy)]
pub struct LegacyParams<'a> {
    /// `/O`
    pub owner_hash: &'a [u8],
    /// `/P`
    pub permissions: i32,
    /// First element of the trailer `/ID`
    pub file_id: &'a [u8],
    /// `/R`
    pub revision: u32,
    /// File key length in bytes
    pub key_length: usize,
    /// `/EncryptMetadata`
    pub encrypt_metadata: bool,
}

/// Algorithm 2: file key from a user password.
pub fn compute_file_key(password: &[u8], params: &LegacyParams<'_>) -> Vec<u8> {
    let n = params.key_length.clamp(5, 16);
    let mut hasher = Md5::new();
    hasher.update(pad_password(password));
    hasher.update(params.owner_hash);
    hasher.update(params.permissions.to_le_bytes());
    hasher.update(params.file_id);
    if params.revision >= 4 && !params.encrypt_metadata {
        hasher.update([0xFF, 0xFF, 0xFF, 0xFF]);
    }
    let mut hash = hasher.finalize().to_vec();
    if params.revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash[..n]).to_vec();
        }
    }
    hash.truncate(if params.revision == 2 { 5 } else { n });
    hash
}

/// RC4 key derived from the owner password (Algorithm 3, steps a-d).
fn owner_rc4_key(owner_password: &[u8], revision: u32, key_length: usize) -> Vec<u8> {
    let n = if revision == 2 { 5 } else { key_length.clamp(5, 16) };
    let mut hash = Md5::digest(pad_password(owner_password)).to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash).to_vec();
        }
    }
    hash.truncate(n);
    hash
}

fn xor_key(key: &[u8], round: u8) -> Vec<u8> {
    key.iter().map(|b| b ^ round).collect()
}

/// Algorithm 3: the `/O` value. An empty owner password falls back to the
/// user password.
pub fn compute_o_value(owner_password: &[u8], user_password: &[u8], revision: u32, key_length: usize) -> Vec<u8> {
    let owner = if owner_password.is_empty() { user_password } else { owner_password };
    let key = owner_rc4_key(owner, revision, key_length);
    let mut result = rc4_crypt(&key, &pad_password(user_password));
    if revision >= 3 {
        for round in 1..=19u8 {
            result = rc4_crypt(&xor_key(&key, round), &result);
        }
    }
    result
}

/// Algorithms 4 and 5: the `/U` value for a file key.
pub fn compute_u_value(file_key: &[u8], file_id: &[u8], revision: u32) -> Vec<u8> {
    if revision == 2 {
        return rc4_crypt(file_key, &PADDING);
    }
    let mut hasher = Md5::new();
    hasher.update(PADDING);
    hasher.update(file_id);
    let mut result = rc4_crypt(file_key, &hasher.finalize());
    for round in 1..=19u8 {
        result = rc4_crypt(&xor_key(file_key, round), &result);
    }
    // 16 arbitrary bytes complete the 32-byte entry
    result.extend_from_slice(&PADDING[..16]);
    result
}

/// Algorithm 6: check a user password, returning the file key on success.
pub fn authenticate_user_legacy(password: &[u8], user_hash: &[u8], params: &LegacyParams<'_>) -> Option<Vec<u8>> {
    let key = compute_file_key(password, params);
    let expected = compute_u_value(&key, params.file_id, params.revision);
    let compared = if params.revision == 2 { 32 } else { 16 };
    if user_hash.len() >= compared && constant_time_eq(&user_hash[..compared], &expected[..compared]) {
        Some(key)
    } else {
        None
    }
}

/// Algorithm 7: check an owner password by recovering the user password
/// from `/O` and authenticating it.
pub fn authenticate_owner_legacy(password: &[u8], user_hash: &[u8], params: &LegacyParams<'_>) -> Option<Vec<u8>> {
    let key = owner_rc4_key(password, params.revision, params.key_length);
    let mut user_password = params.owner_hash.get(..32)?.to_vec();
    if params.revision == 2 {
        user_password = rc4_crypt(&key, &user_password);
    } else {
        for round in (0..=19u8).rev() {
            user_password = rc4_crypt(&xor_key(&key, round), &user_password);
        }
    }
    authenticate_user_legacy(&user_password, user_hash, params)
}

// ============================================================================
// Revisions 5 and 6
// ============================================================================

/// Algorithm 2.B (revision 6), or plain SHA-256 for revision 5.
///
/// `user_key` is the 48-byte `/U` value when hashing an owner password and
/// empty otherwise.
pub fn hash_r6(password: &[u8], salt: &[u8], user_key: &[u8], revision: u32) -> Result<[u8; 32]> {
    let mut k: Vec<u8> = {
        let mut hasher = Sha256::new();
        hasher.update(password);
        hasher.update(salt);
        hasher.update(user_key);
        hasher.finalize().to_vec()
    };

    if revision >= 6 {
        let mut round: u32 = 0;
        let mut last = 0u8;
        while round < 64 || last as u32 + 32 > round {
            let mut k1 = Vec::with_capacity(64 * (password.len() + k.len() + user_key.len()));
            for _ in 0..64 {
                k1.extend_from_slice(password);
                k1.extend_from_slice(&k);
                k1.extend_from_slice(user_key);
            }
            let e = aes::cbc_encrypt_no_padding(&k[..16], &k[16..32], &k1)?;
            let selector = e[..16].iter().map(|&b| b as u32).sum::<u32>() % 3;
            k = match selector {
                0 => Sha256::digest(&e).to_vec(),
                1 => Sha384::digest(&e).to_vec(),
                _ => Sha512::digest(&e).to_vec(),
            };
            last = e[e.len() - 1];
            round += 1;
        }
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&k[..32]);
    Ok(out)
}

/// Algorithm 11: check a user password against `/U` and unwrap `/UE`.
pub fn authenticate_user_r6(password: &[u8], u: &[u8], ue: &[u8], revision: u32) -> Result<Option<Vec<u8>>> {
    let password = truncate_password(password);
    if u.len() < 48 {
        return Ok(None);
    }
    let hash = hash_r6(password, &u[32..40], &[], revision)?;
    if !constant_time_eq(&hash, &u[..32]) {
        return Ok(None);
    }
    let key = hash_r6(password, &u[40..48], &[], revision)?;
    unwrap_file_key(&key, ue).map(Some)
}

/// Algorithm 12: check an owner password against `/O` and unwrap `/OE`.
pub fn authenticate_owner_r6(password: &[u8], o: &[u8], oe: &[u8], u: &[u8], revision: u32) -> Result<Option<Vec<u8>>> {
    let password = truncate_password(password);
    if o.len() < 48 || u.len() < 48 {
        return Ok(None);
    }
    let hash = hash_r6(password, &o[32..40], &u[..48], revision)?;
    if !constant_time_eq(&hash, &o[..32]) {
        return Ok(None);
    }
    let key = hash_r6(password, &o[40..48], &u[..48], revision)?;
    unwrap_file_key(&key, oe).map(Some)
}

fn unwrap_file_key(key: &[u8], wrapped: &[u8]) -> Result<Vec<u8>> {
    let wrapped = wrapped.get(..32).ok_or_else(|| {
        crate::error::Error::Encryption("UE/OE entry shorter than 32 bytes".to_string())
    })?;
    aes::cbc_decrypt_no_padding(key, &[0u8; 16], wrapped)
}

/// Values written to a revision 6 encryption dictionary.
#[derive(Debug, Clone)]
pub struct R6Values {
    /// `/U`
    pub u: Vec<u8>,
    /// `/UE`
    pub ue: Vec<u8>,
    /// `/O`
    pub o: Vec<u8>,
    /// `/OE`
    pub oe: Vec<u8>,
    /// `/Perms`
    pub perms: Vec<u8>,
}

/// Algorithms 8, 9 and 10: compute U/UE, O/OE and Perms for a file key.
pub fn compute_r6_values(
    user_password: &[u8],
    owner_password: &[u8],
    file_key: &[u8],
    permissions: i32,
    encrypt_metadata: bool,
) -> Result<R6Values> {
    let user_password = truncate_password(user_password);
    let owner_password = truncate_password(owner_password);

    let salts = super::random_bytes(16);
    let (u_validation, u_key_salt) = salts.split_at(8);
    let mut u = hash_r6(user_password, u_validation, &[], 6)?.to_vec();
    u.extend_from_slice(u_validation);
    u.extend_from_slice(u_key_salt);
    let ue_key = hash_r6(user_password, u_key_salt, &[], 6)?;
    let ue = aes::cbc_encrypt_no_padding(&ue_key, &[0u8; 16], file_key)?;

    let salts = super::random_bytes(16);
    let (o_validation, o_key_salt) = salts.split_at(8);
    let mut o = hash_r6(owner_password, o_validation, &u, 6)?.to_vec();
    o.extend_from_slice(o_validation);
    o.extend_from_slice(o_key_salt);
    let oe_key = hash_r6(owner_password, o_key_salt, &u, 6)?;
    let oe = aes::cbc_encrypt_no_padding(&oe_key, &[0u8; 16], file_key)?;

    let mut block = Vec::with_capacity(16);
    block.extend_from_slice(&(permissions as u32).to_le_bytes());
    block.extend_from_slice(&[0xFF; 4]);
    block.push(if encrypt_metadata { b'T' } else { b'F' });
    block.extend_from_slice(b"adb");
    block.extend_from_slice(&super::random_bytes(4));
    let perms = aes::cbc_encrypt_no_padding(file_key, &[0u8; 16], &block)?;

    Ok(R6Values { u, ue, o, oe, perms })
}

/// Algorithm 13: decrypt `/Perms` and check its marker.
pub fn perms_valid(file_key: &[u8], perms: &[u8], permissions: i32) -> bool {
    let Some(block) = perms.get(..16) else {
        return false;
    };
    match aes::cbc_decrypt_no_padding(file_key, &[0u8; 16], block) {
        Ok(plain) => &plain[9..12] == b"adb" && plain[..4] == (permissions as u32).to_le_bytes(),
        Err(_) => false,
    }
}

/// Constant-time comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
