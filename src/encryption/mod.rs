//! PDF encryption support.
//!
//! Implements the standard security handler (ISO 32000-1:2008, Section 7.6;
//! ISO 32000-2:2020 for revision 6):
//!
//! - RC4 40-bit (V1 R2) and 128-bit (V2 R3)
//! - AES-128 (V4 R4, crypt filter `AESV2`)
//! - AES-256 (V5 R6, crypt filter `AESV3`; R5 is read as well)
//!
//! A document moves through [`EncryptionState`]: `Unencrypted`, `Encrypted`
//! (no usable key, or a fresh key waiting to be applied on write) and
//! `Decrypted` (unlocked with a password).

mod aes;
mod algorithms;
mod handler;
mod rc4;

pub use handler::SecurityHandler;

use bitflags::bitflags;

/// Encryption algorithm of a security handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// RC4 with a 40-bit key (V1, R2)
    Rc4_40,
    /// RC4 with a 128-bit key (V2, R3)
    Rc4_128,
    /// AES-128 in CBC mode (V4, R4)
    Aes128,
    /// AES-256 in CBC mode (V5, R6)
    Aes256,
}

impl Algorithm {
    /// File key length in bytes.
    pub fn key_length(&self) -> usize {
        match self {
            Algorithm::Rc4_40 => 5,
            Algorithm::Rc4_128 | Algorithm::Aes128 => 16,
            Algorithm::Aes256 => 32,
        }
    }

    /// Check if this is an AES algorithm.
    pub fn is_aes(&self) -> bool {
        matches!(self, Algorithm::Aes128 | Algorithm::Aes256)
    }

    /// `(V, R)` written for this algorithm.
    pub fn version_revision(&self) -> (i64, i64) {
        match self {
            Algorithm::Rc4_40 => (1, 2),
            Algorithm::Rc4_128 => (2, 3),
            Algorithm::Aes128 => (4, 4),
            Algorithm::Aes256 => (5, 6),
        }
    }
}

bitflags! {
    /// User access permissions (`/P`).
    ///
    /// PDF Spec: Table 22 - User access permissions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u32 {
        /// Bit 3: print the document
        const PRINT = 1 << 2;
        /// Bit 4: modify contents
        const MODIFY = 1 << 3;
        /// Bit 5: copy or extract text and graphics
        const COPY = 1 << 4;
        /// Bit 6: add or modify annotations
        const ANNOTATE = 1 << 5;
        /// Bit 9: fill in form fields
        const FILL_FORMS = 1 << 8;
        /// Bit 10: extract for accessibility
        const EXTRACT_ACCESSIBILITY = 1 << 9;
        /// Bit 11: assemble (insert, rotate, delete pages)
        const ASSEMBLE = 1 << 10;
        /// Bit 12: print at full quality
        const PRINT_HIGH_QUALITY = 1 << 11;
    }
}

/// Bits 7-8 and 13-32 must be set in `/P`.
const RESERVED_BITS: u32 = 0xFFFF_F0C0;

impl Permissions {
    /// Decode a `/P` value.
    pub fn from_p(p: i32) -> Self {
        Self::from_bits_truncate(p as u32)
    }

    /// Encode as a `/P` value with the reserved bits set.
    pub fn to_p(self) -> i32 {
        (self.bits() | RESERVED_BITS) as i32
    }

    /// Check if printing is allowed.
    pub fn can_print(&self) -> bool {
        self.contains(Permissions::PRINT)
    }

    /// Check if modifying the document is allowed.
    pub fn can_modify(&self) -> bool {
        self.contains(Permissions::MODIFY)
    }

    /// Check if copying text/graphics is allowed.
    pub fn can_copy(&self) -> bool {
        self.contains(Permissions::COPY)
    }
}

/// Settings for encrypting a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptOptions {
    /// Password required to open the document (may be empty)
    pub user_password: String,
    /// Password granting full access; empty means the user password
    pub owner_password: String,
    /// Cipher and key size
    pub algorithm: Algorithm,
    /// Permissions granted to user-password holders
    pub permissions: Permissions,
    /// Whether XMP metadata streams are encrypted
    pub encrypt_metadata: bool,
}

impl EncryptOptions {
    /// AES-128 with all permissions.
    pub fn new(user_password: impl Into<String>, owner_password: impl Into<String>) -> Self {
        Self {
            user_password: user_password.into(),
            owner_password: owner_password.into(),
            algorithm: Algorithm::Aes128,
            permissions: Permissions::all(),
            encrypt_metadata: true,
        }
    }

    /// Choose the algorithm.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Choose the permissions.
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Owner password, falling back to the user password.
    pub(crate) fn effective_owner_password(&self) -> &str {
        if self.owner_password.is_empty() {
            &self.user_password
        } else {
            &self.owner_password
        }
    }
}

/// Encryption state of a document.
#[derive(Debug, Clone, Default)]
pub enum EncryptionState {
    /// No `/Encrypt` dictionary
    #[default]
    Unencrypted,
    /// Encrypted: either locked (the handler has no key) or sealed with a
    /// fresh key that is applied when the document is written
    Encrypted(SecurityHandler),
    /// Encrypted on disk, unlocked in memory
    Decrypted(SecurityHandler),
}

impl EncryptionState {
    /// Whether the document carries encryption at all.
    pub fn is_encrypted(&self) -> bool {
        !matches!(self, EncryptionState::Unencrypted)
    }

    /// Encrypted without a usable key.
    pub fn is_locked(&self) -> bool {
        matches!(self, EncryptionState::Encrypted(h) if !h.has_key())
    }

    /// Handler holding a file key, if any.
    pub fn keyed_handler(&self) -> Option<&SecurityHandler> {
        match self {
            EncryptionState::Encrypted(h) | EncryptionState::Decrypted(h) if h.has_key() => Some(h),
            _ => None,
        }
    }

    /// Handler, keyed or not.
    pub fn handler(&self) -> Option<&SecurityHandler> {
        match self {
            EncryptionState::Encrypted(h) | EncryptionState::Decrypted(h) => Some(h),
            EncryptionState::Unencrypted => None,
        }
    }
}

/// Random bytes from UUID v4 values mixed through MD5.
pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    use md5::{Digest, Md5};

    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let mut hasher = Md5::new();
        hasher.update(uuid::Uuid::new_v4().as_bytes());
        hasher.update(uuid::Uuid::new_v4().as_bytes());
        let hash = hasher.finalize();
        let take = (len - out.len()).min(hash.len());
        out.extend_from_slice(&hash[..take]);
    }
    out
}
