//! Encrypt and decrypt whole documents.

use crate::document::Document;
use crate::encryption::{random_bytes, Algorithm, EncryptOptions, SecurityHandler};
use crate::error::{Error, Result};

/// Copy `doc` with a standard security handler for `options`.
///
/// Any existing encryption is replaced; the input must be unencrypted or
/// unlocked. The file identifier is kept when present. The header version is
/// raised to the minimum the algorithm needs.
pub fn encrypt(doc: &Document, options: &EncryptOptions) -> Result<Document> {
    if doc.is_locked() {
        return Err(Error::Locked);
    }
    let mut output = doc.clone();
    output.materialize()?;
    output.strip_encryption();

    let mut file_id = doc.file_id();
    if file_id.is_empty() {
        file_id = random_bytes(16);
    }
    let handler = SecurityHandler::new_for_encryption(options, &file_id)?;
    log::info!(
        "Encrypting with {:?} (revision {})",
        handler.algorithm(),
        handler.revision()
    );
    output.seal(handler, file_id);

    let minimum = minimum_version(options.algorithm);
    if output.version() < minimum {
        output.set_version(minimum.0, minimum.1);
    }
    Ok(output)
}

/// Copy `doc` without encryption, unlocking it with `password` (user or
/// owner).
///
/// Fails with [`Error::NotEncrypted`] on an unencrypted document and with
/// [`Error::IncorrectPassword`] when the password does not match, even if
/// the document was already unlocked.
pub fn decrypt(doc: &Document, password: &str) -> Result<Document> {
    if !doc.is_encrypted() {
        return Err(Error::NotEncrypted);
    }
    let mut output = doc.clone();
    output.unlock(password)?;
    output.materialize()?;
    output.strip_encryption();
    log::info!("Document decrypted");
    Ok(output)
}

/// Protect `doc` with `password` as both user and owner password (AES-128).
pub fn add_password(doc: &Document, password: &str) -> Result<Document> {
    encrypt(doc, &EncryptOptions::new(password, password))
}

/// Remove the password protection of `doc`.
pub fn remove_password(doc: &Document, password: &str) -> Result<Document> {
    decrypt(doc, password)
}

fn minimum_version(algorithm: Algorithm) -> (u8, u8) {
    match algorithm {
        Algorithm::Rc4_40 => (1, 3),
        Algorithm::Rc4_128 => (1, 4),
        Algorithm::Aes128 => (1, 6),
        Algorithm::Aes256 => (1, 7),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Dictionary, PdfValue};
    use crate::writer::write_document;

    fn sample() -> Document {
        let mut doc = Document::new();
        let content = doc.add_object(PdfValue::stream(Dictionary::new(), b"BT (secret) Tj ET".to_vec()));
        let mut page = Dictionary::new();
        page.insert("Contents".to_string(), content.into());
        doc.add_page(page, None).unwrap();
        doc
    }

    fn first_page_content(doc: &Document) -> Vec<u8> {
        doc.page_contents(&doc.page(0).unwrap()).unwrap()
    }

    #[test]
    fn test_encrypt_then_decrypt_in_memory() {
        let encrypted = encrypt(&sample(), &EncryptOptions::new("user", "owner")).unwrap();
        assert!(encrypted.is_encrypted());
        let decrypted = decrypt(&encrypted, "user").unwrap();
        assert!(!decrypted.is_encrypted());
        assert_eq!(first_page_content(&decrypted), b"BT (secret) Tj ET\n");
    }

    #[test]
    fn test_written_file_is_locked() {
        let encrypted = encrypt(&sample(), &EncryptOptions::new("user", "owner")).unwrap();
        let bytes = write_document(&encrypted).unwrap();
        assert!(!bytes.windows(6).any(|w| w == b"secret"));

        let reloaded = Document::load(&bytes).unwrap();
        assert!(reloaded.is_locked());
        assert!(matches!(decrypt(&reloaded, "wrong"), Err(Error::IncorrectPassword)));
        assert!(reloaded.is_locked());

        let by_owner = decrypt(&reloaded, "owner").unwrap();
        assert_eq!(first_page_content(&by_owner), b"BT (secret) Tj ET\n");
    }

    #[test]
    fn test_decrypt_unencrypted() {
        assert!(matches!(decrypt(&sample(), "x"), Err(Error::NotEncrypted)));
    }

    #[test]
    fn test_version_raised() {
        let options = EncryptOptions::new("a", "b").with_algorithm(Algorithm::Aes256);
        let mut doc = sample();
        doc.set_version(1, 4);
        assert_eq!(encrypt(&doc, &options).unwrap().version(), (1, 7));
    }

    #[test]
    fn test_empty_user_password_opens() {
        let encrypted = encrypt(&sample(), &EncryptOptions::new("", "owner")).unwrap();
        let reloaded = Document::load(&write_document(&encrypted).unwrap()).unwrap();
        assert!(reloaded.is_encrypted());
        assert!(!reloaded.is_locked());
        assert_eq!(first_page_content(&reloaded), b"BT (secret) Tj ET\n");
    }

    #[test]
    fn test_add_and_remove_password() {
        let protected = add_password(&sample(), "pw").unwrap();
        let reloaded = Document::load(&write_document(&protected).unwrap()).unwrap();
        let open = remove_password(&reloaded, "pw").unwrap();
        assert_eq!(open.page_count().unwrap(), 1);
    }
}
