//! Standard security handler.
//!
//! Reads and writes the encryption dictionary, authenticates passwords and
//! encrypts or decrypts the strings and streams of individual objects.

use md5::{Digest, Md5};

use super::algorithms::{self, LegacyParams};
use super::{aes, rc4, Algorithm, EncryptOptions, Permissions};
use crate::error::{Error, Result};
use crate::object::{Dictionary, ObjectRef, PdfValue};

/// Security handler for one document.
#[derive(Debug, Clone)]
pub struct SecurityHandler {
    algorithm: Algorithm,
    revision: u32,
    key_length: usize,
    owner_hash: Vec<u8>,
    user_hash: Vec<u8>,
    owner_key: Vec<u8>,
    user_key: Vec<u8>,
    perms: Vec<u8>,
    permissions: i32,
    encrypt_metadata: bool,
    encrypt_strings: bool,
    encrypt_streams: bool,
    file_id: Vec<u8>,
    file_key: Option<Vec<u8>>,
}

impl SecurityHandler {
    /// Read an encryption dictionary. The handler starts without a key.
    pub fn from_dict(dict: &Dictionary, file_id: &[u8]) -> Result<Self> {
        let filter = dict.get("Filter").and_then(|f| f.as_name()).unwrap_or("Standard");
        if filter != "Standard" {
            return Err(Error::Encryption(format!("unsupported security handler /{}", filter)));
        }
        let int = |key: &str| dict.get(key).and_then(|v| v.as_integer());
        let bytes = |key: &str| {
            dict.get(key)
                .and_then(|v| v.as_string())
                .map(|s| s.to_vec())
                .unwrap_or_default()
        };

        let version = int("V").unwrap_or(0);
        let revision = int("R")
            .and_then(|r| u32::try_from(r).ok())
            .ok_or_else(|| Error::Encryption("encryption dictionary has no /R".to_string()))?;
        let permissions = int("P").map(|p| p as i32).unwrap_or(-4);
        let encrypt_metadata = dict
            .get("EncryptMetadata")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        let length_bits = int("Length").unwrap_or(40);

        let mut encrypt_strings = true;
        let mut encrypt_streams = true;
        let (algorithm, key_length) = match version {
            1 => (Algorithm::Rc4_40, 5),
            2 | 3 => (Algorithm::Rc4_128, (length_bits / 8).clamp(5, 16) as usize),
            4 | 5 => {
                let stm_f = dict.get("StmF").and_then(|v| v.as_name()).unwrap_or("Identity");
                let str_f = dict.get("StrF").and_then(|v| v.as_name()).unwrap_or("Identity");
                encrypt_streams = stm_f != "Identity";
                encrypt_strings = str_f != "Identity";
                let filter_name = if encrypt_streams { stm_f } else { str_f };
                let method = dict
                    .get("CF")
                    .and_then(|cf| cf.get(filter_name))
                    .and_then(|f| f.get("CFM"))
                    .and_then(|m| m.as_name())
                    .unwrap_or(if version == 5 { "AESV3" } else { "V2" });
                match method {
                    "AESV2" => (Algorithm::Aes128, 16),
                    "AESV3" => (Algorithm::Aes256, 32),
                    "V2" => (Algorithm::Rc4_128, 16),
                    "None" => {
                        encrypt_streams = false;
                        encrypt_strings = false;
                        (Algorithm::Rc4_128, 16)
                    },
                    other => {
                        return Err(Error::Encryption(format!("unsupported crypt filter method /{}", other)));
                    },
                }
            },
            v => return Err(Error::Encryption(format!("unsupported encryption version V={}", v))),
        };
        if algorithm == Algorithm::Aes256 && revision < 5 {
            return Err(Error::Encryption(format!("AES-256 requires R>=5, found R={}", revision)));
        }

        log::info!(
            "Document is encrypted with {:?} (V={}, R={})",
            algorithm,
            version,
            revision
        );

        Ok(Self {
            algorithm,
            revision,
            key_length,
            owner_hash: bytes("O"),
            user_hash: bytes("U"),
            owner_key: bytes("OE"),
            user_key: bytes("UE"),
            perms: bytes("Perms"),
            permissions,
            encrypt_metadata,
            encrypt_strings,
            encrypt_streams,
            file_id: file_id.to_vec(),
            file_key: None,
        })
    }

    /// Create a handler with a fresh file key for `options`.
    ///
    /// `file_id` is the first element of the trailer `/ID` the document will
    /// be written with.
    pub fn new_for_encryption(options: &EncryptOptions, file_id: &[u8]) -> Result<Self> {
        let algorithm = options.algorithm;
        let (_, revision) = algorithm.version_revision();
        let revision = revision as u32;
        let key_length = algorithm.key_length();
        let permissions = options.permissions.to_p();
        let user = options.user_password.as_bytes();
        let owner = options.effective_owner_password().as_bytes();

        let mut handler = Self {
            algorithm,
            revision,
            key_length,
            owner_hash: Vec::new(),
            user_hash: Vec::new(),
            owner_key: Vec::new(),
            user_key: Vec::new(),
            perms: Vec::new(),
            permissions,
            encrypt_metadata: options.encrypt_metadata,
            encrypt_strings: true,
            encrypt_streams: true,
            file_id: file_id.to_vec(),
            file_key: None,
        };

        if algorithm == Algorithm::Aes256 {
            let file_key = super::random_bytes(32);
            let values = algorithms::compute_r6_values(user, owner, &file_key, permissions, options.encrypt_metadata)?;
            handler.user_hash = values.u;
            handler.user_key = values.ue;
            handler.owner_hash = values.o;
            handler.owner_key = values.oe;
            handler.perms = values.perms;
            handler.file_key = Some(file_key);
        } else {
            handler.owner_hash = algorithms::compute_o_value(owner, user, revision, key_length);
            let file_key = algorithms::compute_file_key(user, &handler.legacy_params());
            handler.user_hash = algorithms::compute_u_value(&file_key, file_id, revision);
            handler.file_key = Some(file_key);
        }
        log::debug!("Created {:?} security handler", algorithm);
        Ok(handler)
    }

    fn legacy_params(&self) -> LegacyParams<'_> {
        LegacyParams {
            owner_hash: &self.owner_hash,
            permissions: self.permissions,
            file_id: &self.file_id,
            revision: self.revision,
            key_length: self.key_length,
            encrypt_metadata: self.encrypt_metadata,
        }
    }

    /// Try `password` as the user password, then as the owner password.
    /// Returns the file key on success.
    pub fn authenticate(&self, password: &[u8]) -> Result<Option<Vec<u8>>> {
        if self.revision >= 5 {
            if let Some(key) = algorithms::authenticate_user_r6(password, &self.user_hash, &self.user_key, self.revision)? {
                self.check_perms(&key);
                return Ok(Some(key));
            }
            let key = algorithms::authenticate_owner_r6(
                password,
                &self.owner_hash,
                &self.owner_key,
                &self.user_hash,
                self.revision,
            )?;
            if let Some(key) = &key {
                self.check_perms(key);
            }
            return Ok(key);
        }

        let params = self.legacy_params();
        if let Some(key) = algorithms::authenticate_user_legacy(password, &self.user_hash, &params) {
            return Ok(Some(key));
        }
        Ok(algorithms::authenticate_owner_legacy(password, &self.user_hash, &params))
    }

    fn check_perms(&self, key: &[u8]) {
        if self.revision >= 6 && !algorithms::perms_valid(key, &self.perms, self.permissions) {
            log::warn!("Encrypted /Perms entry does not match /P");
        }
    }

    /// Authenticate and keep the file key.
    pub fn unlock(&mut self, password: &[u8]) -> Result<()> {
        match self.authenticate(password)? {
            Some(key) => {
                self.file_key = Some(key);
                Ok(())
            },
            None => Err(Error::IncorrectPassword),
        }
    }

    /// Whether a file key is available.
    pub fn has_key(&self) -> bool {
        self.file_key.is_some()
    }

    /// Encryption algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Security handler revision (`/R`).
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Granted permissions.
    pub fn permissions(&self) -> Permissions {
        Permissions::from_p(self.permissions)
    }

    /// Whether metadata streams are encrypted.
    pub fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }

    /// Encryption dictionary describing this handler.
    pub fn to_dictionary(&self) -> Dictionary {
        let (v, r) = self.algorithm.version_revision();
        let mut dict = Dictionary::new();
        dict.insert("Filter".to_string(), PdfValue::name("Standard"));
        dict.insert("V".to_string(), PdfValue::Integer(v));
        dict.insert("R".to_string(), PdfValue::Integer(r));
        dict.insert("Length".to_string(), PdfValue::Integer(self.key_length as i64 * 8));
        dict.insert("O".to_string(), PdfValue::string(self.owner_hash.clone()));
        dict.insert("U".to_string(), PdfValue::string(self.user_hash.clone()));
        dict.insert("P".to_string(), PdfValue::Integer(self.permissions as i64));

        if self.algorithm.is_aes() {
            let (method, length) = if self.algorithm == Algorithm::Aes256 {
                ("AESV3", 32)
            } else {
                ("AESV2", 16)
            };
            let mut std_cf = Dictionary::new();
            std_cf.insert("Type".to_string(), PdfValue::name("CryptFilter"));
            std_cf.insert("CFM".to_string(), PdfValue::name(method));
            std_cf.insert("AuthEvent".to_string(), PdfValue::name("DocOpen"));
            std_cf.insert("Length".to_string(), PdfValue::Integer(length));
            let mut cf = Dictionary::new();
            cf.insert("StdCF".to_string(), PdfValue::Dictionary(std_cf));
            dict.insert("CF".to_string(), PdfValue::Dictionary(cf));
            dict.insert("StmF".to_string(), PdfValue::name("StdCF"));
            dict.insert("StrF".to_string(), PdfValue::name("StdCF"));
        }
        if self.algorithm == Algorithm::Aes256 {
            dict.insert("OE".to_string(), PdfValue::string(self.owner_key.clone()));
            dict.insert("UE".to_string(), PdfValue::string(self.user_key.clone()));
            dict.insert("Perms".to_string(), PdfValue::string(self.perms.clone()));
        }
        if !self.encrypt_metadata {
            dict.insert("EncryptMetadata".to_string(), PdfValue::Boolean(false));
        }
        dict
    }

    /// Per-object key (Algorithm 1). Revisions 5 and 6 use the file key as is.
    pub fn object_key(&self, reference: ObjectRef) -> Result<Vec<u8>> {
        let key = self.file_key.as_ref().ok_or(Error::Locked)?;
        if self.revision >= 5 {
            return Ok(key.clone());
        }
        let mut hasher = Md5::new();
        hasher.update(key);
        hasher.update(&reference.id.to_le_bytes()[..3]);
        hasher.update(reference.gen.to_le_bytes());
        if self.algorithm.is_aes() {
            hasher.update(b"sAlT");
        }
        let hash = hasher.finalize();
        Ok(hash[..(key.len() + 5).min(16)].to_vec())
    }

    fn crypt(&self, reference: ObjectRef, data: &[u8], encrypting: bool) -> Result<Vec<u8>> {
        let key = self.object_key(reference)?;
        match (self.algorithm.is_aes(), encrypting) {
            (false, _) => Ok(rc4::rc4_crypt(&key, data)),
            (true, true) => aes::encrypt(&key, data),
            (true, false) => aes::decrypt(&key, data),
        }
    }

    /// Decrypt a string of object `reference`.
    pub fn decrypt_string(&self, reference: ObjectRef, data: &[u8]) -> Result<Vec<u8>> {
        if !self.encrypt_strings {
            return Ok(data.to_vec());
        }
        self.crypt(reference, data, false)
    }

    /// Encrypt a string of object `reference`.
    pub fn encrypt_string(&self, reference: ObjectRef, data: &[u8]) -> Result<Vec<u8>> {
        if !self.encrypt_strings {
            return Ok(data.to_vec());
        }
        self.crypt(reference, data, true)
    }

    /// Decrypt stream data of object `reference`.
    pub fn decrypt_stream(&self, reference: ObjectRef, data: &[u8]) -> Result<Vec<u8>> {
        if !self.encrypt_streams {
            return Ok(data.to_vec());
        }
        self.crypt(reference, data, false)
    }

    /// Encrypt stream data of object `reference`.
    pub fn encrypt_stream(&self, reference: ObjectRef, data: &[u8]) -> Result<Vec<u8>> {
        if !self.encrypt_streams {
            return Ok(data.to_vec());
        }
        self.crypt(reference, data, true)
    }

    /// Whether a stream with this dictionary is left in the clear.
    fn stream_exempt(&self, dict: &Dictionary) -> bool {
        match dict.get("Type").and_then(|t| t.as_name()) {
            Some("XRef") => true,
            Some("Metadata") => !self.encrypt_metadata,
            _ => false,
        }
    }

    /// Decrypt every string and stream inside the value of object `reference`.
    pub fn decrypt_value(&self, reference: ObjectRef, value: &mut PdfValue) -> Result<()> {
        self.transform(reference, value, false)
    }

    /// Encrypt every string and stream inside the value of object `reference`.
    pub fn encrypt_value(&self, reference: ObjectRef, value: &mut PdfValue) -> Result<()> {
        self.transform(reference, value, true)
    }

    fn transform(&self, reference: ObjectRef, value: &mut PdfValue, encrypting: bool) -> Result<()> {
        match value {
            PdfValue::String(bytes) => {
                *bytes = if encrypting {
                    self.encrypt_string(reference, bytes)?
                } else {
                    self.decrypt_string(reference, bytes)?
                };
            },
            PdfValue::Array(items) => {
                for item in items.iter_mut() {
                    self.transform(reference, item, encrypting)?;
                }
            },
            PdfValue::Dictionary(dict) => {
                for item in dict.values_mut() {
                    self.transform(reference, item, encrypting)?;
                }
            },
            PdfValue::Stream { dict, data } => {
                if self.stream_exempt(dict) {
                    return Ok(());
                }
                for item in dict.values_mut() {
                    self.transform(reference, item, encrypting)?;
                }
                let out = if encrypting {
                    self.encrypt_stream(reference, data)?
                } else {
                    self.decrypt_stream(reference, data)?
                };
                *data = out.into();
            },
            _ => {},
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE_ID: &[u8] = b"\x01\x23\x45\x67\x89\xab\xcd\xef\x01\x23\x45\x67\x89\xab\xcd\xef";

    fn reopen(handler: &SecurityHandler) -> SecurityHandler {
        SecurityHandler::from_dict(&handler.to_dictionary(), FILE_ID).unwrap()
    }

    #[test]
    fn test_every_algorithm_reopens_with_both_passwords() {
        for algorithm in [Algorithm::Rc4_40, Algorithm::Rc4_128, Algorithm::Aes128, Algorithm::Aes256] {
            let options = EncryptOptions::new("user", "owner").with_algorithm(algorithm);
            let sealed = SecurityHandler::new_for_encryption(&options, FILE_ID).unwrap();
            let mut reopened = reopen(&sealed);
            assert_eq!(reopened.algorithm(), algorithm);
            assert!(!reopened.has_key());

            assert!(matches!(reopened.unlock(b"nope"), Err(Error::IncorrectPassword)));
            assert_eq!(reopened.authenticate(b"owner").unwrap(), sealed.file_key.clone());
            reopened.unlock(b"user").unwrap();
            assert_eq!(reopened.file_key, sealed.file_key);
        }
    }

    #[test]
    fn test_value_roundtrip() {
        let options = EncryptOptions::new("", "owner");
        let handler = SecurityHandler::new_for_encryption(&options, FILE_ID).unwrap();
        let reference = ObjectRef::new(4, 0);

        let mut dict = Dictionary::new();
        dict.insert("Title".to_string(), PdfValue::string(b"Secret".to_vec()));
        let original = PdfValue::stream(dict, b"BT (Hello) Tj ET".to_vec());

        let mut value = original.clone();
        handler.encrypt_value(reference, &mut value).unwrap();
        assert_ne!(value, original);
        handler.decrypt_value(reference, &mut value).unwrap();
        assert_eq!(value, original);
    }

    #[test]
    fn test_xref_stream_exempt() {
        let handler = SecurityHandler::new_for_encryption(&EncryptOptions::new("a", "b"), FILE_ID).unwrap();
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), PdfValue::name("XRef"));
        let mut value = PdfValue::stream(dict, b"raw".to_vec());
        handler.encrypt_value(ObjectRef::new(9, 0), &mut value).unwrap();
        assert_eq!(value.stream_data().map(|d| d.as_ref()), Some(&b"raw"[..]));
    }

    #[test]
    fn test_object_key_length() {
        let options = EncryptOptions::new("", "").with_algorithm(Algorithm::Rc4_40);
        let handler = SecurityHandler::new_for_encryption(&options, FILE_ID).unwrap();
        assert_eq!(handler.object_key(ObjectRef::new(1, 0)).unwrap().len(), 10);
    }

    #[test]
    fn test_locked_handler_has_no_object_key() {
        let sealed = SecurityHandler::new_for_encryption(&EncryptOptions::new("pw", ""), FILE_ID).unwrap();
        let locked = reopen(&sealed);
        assert!(matches!(locked.object_key(ObjectRef::new(1, 0)), Err(Error::Locked)));
    }

    #[test]
    fn test_unsupported_filter() {
        let mut dict = Dictionary::new();
        dict.insert("Filter".to_string(), PdfValue::name("Adobe.PubSec"));
        dict.insert("R".to_string(), PdfValue::Integer(4));
        assert!(matches!(SecurityHandler::from_dict(&dict, FILE_ID), Err(Error::Encryption(_))));
    }
}
