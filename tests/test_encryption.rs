//! Encrypting and decrypting whole files.

mod common;

use common::{text_content, pdf_with_contents};
use pdf_handler::operations::{decrypt, encrypt, read_metadata};
use pdf_handler::{load, save, Algorithm, Document, EncryptOptions, Error, Permissions};

const ALGORITHMS: [Algorithm; 4] = [Algorithm::Rc4_40, Algorithm::Rc4_128, Algorithm::Aes128, Algorithm::Aes256];

fn sample() -> Document {
    load(&pdf_with_contents(&[text_content("confidential"), text_content("page two")], Some("Secret Title"))).unwrap()
}

fn contents(doc: &Document) -> Vec<Vec<u8>> {
    doc.pages()
        .unwrap()
        .map(|page| doc.page_contents(&page.unwrap()).unwrap())
        .collect()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[test]
fn test_round_trip_every_algorithm() {
    let original = sample();
    for algorithm in ALGORITHMS {
        let options = EncryptOptions::new("user", "owner").with_algorithm(algorithm);
        let bytes = save(&encrypt(&original, &options).unwrap()).unwrap();
        assert!(!contains(&bytes, b"Secret Title"), "{:?} leaked the title", algorithm);

        let locked = load(&bytes).unwrap();
        assert!(locked.is_locked(), "{:?}", algorithm);
        assert!(matches!(
            locked.page_contents(&locked.page(0).unwrap()),
            Err(Error::Locked)
        ));

        let opened = decrypt(&locked, "user").unwrap();
        assert_eq!(contents(&opened), contents(&original), "{:?}", algorithm);
        assert_eq!(
            read_metadata(&opened).unwrap().info.title.as_deref(),
            Some("Secret Title")
        );

        // the decrypted copy is written in the clear
        let clear = load(&save(&opened).unwrap()).unwrap();
        assert!(!clear.is_encrypted());
        assert_eq!(contents(&clear), contents(&original));
    }
}

#[test]
fn test_owner_password_unlocks() {
    for algorithm in ALGORITHMS {
        let options = EncryptOptions::new("user", "owner").with_algorithm(algorithm);
        let locked = load(&save(&encrypt(&sample(), &options).unwrap()).unwrap()).unwrap();
        let opened = decrypt(&locked, "owner").unwrap();
        assert_eq!(opened.page_count().unwrap(), 2, "{:?}", algorithm);
    }
}

#[test]
fn test_wrong_password_leaves_input_unchanged() {
    let locked = load(&save(&encrypt(&sample(), &EncryptOptions::new("user", "owner")).unwrap()).unwrap()).unwrap();
    assert!(matches!(decrypt(&locked, "guess"), Err(Error::IncorrectPassword)));
    assert!(locked.is_locked());
    assert!(decrypt(&locked, "user").is_ok());
}

#[test]
fn test_decrypt_unencrypted_fails() {
    assert!(matches!(decrypt(&sample(), "user"), Err(Error::NotEncrypted)));
}

#[test]
fn test_permissions_written() {
    let options = EncryptOptions::new("", "owner")
        .with_algorithm(Algorithm::Rc4_128)
        .with_permissions(Permissions::PRINT | Permissions::COPY);
    let doc = load(&save(&encrypt(&sample(), &options).unwrap()).unwrap()).unwrap();
    // empty user password opens on load
    assert!(doc.is_encrypted());
    assert!(!doc.is_locked());
    let handler = doc.encryption_state().handler().unwrap();
    assert!(handler.permissions().contains(Permissions::PRINT | Permissions::COPY));
    assert!(!handler.permissions().contains(Permissions::MODIFY));
}

#[test]
fn test_reencrypt_decrypted_document() {
    let first = load(&save(&encrypt(&sample(), &EncryptOptions::new("one", "one")).unwrap()).unwrap()).unwrap();
    let mut opened = first.clone();
    opened.unlock("one").unwrap();

    let second = encrypt(&opened, &EncryptOptions::new("two", "two").with_algorithm(Algorithm::Aes256)).unwrap();
    let locked = load(&save(&second).unwrap()).unwrap();
    assert!(matches!(decrypt(&locked, "one"), Err(Error::IncorrectPassword)));
    assert_eq!(contents(&decrypt(&locked, "two").unwrap()), contents(&sample()));
}

#[test]
fn test_encrypt_locked_fails() {
    let locked = load(&save(&encrypt(&sample(), &EncryptOptions::new("u", "o")).unwrap()).unwrap()).unwrap();
    assert!(matches!(
        encrypt(&locked, &EncryptOptions::new("x", "x")),
        Err(Error::Locked)
    ));
}

#[test]
fn test_locked_metadata_hides_ciphertext() {
    for algorithm in ALGORITHMS {
        let options = EncryptOptions::new("user", "owner").with_algorithm(algorithm);
        let locked = load(&save(&encrypt(&sample(), &options).unwrap()).unwrap()).unwrap();
        assert!(locked.is_locked());
        assert!(matches!(locked.info(), Err(Error::Locked)), "{:?}", algorithm);

        let metadata = read_metadata(&locked).unwrap();
        assert_eq!(metadata.page_count, 2);
        assert!(metadata.info.is_empty(), "{:?} returned {:?}", algorithm, metadata.info);
    }
}
