//! Reading and replacing the document information dictionary.

mod common;

use common::{pdf_with_contents, text_content, RawPdf};
use pdf_handler::operations::{read_metadata, write_metadata, DocumentInfo};
use pdf_handler::{load, save};

#[test]
fn test_read_from_file() {
    let doc = load(&pdf_with_contents(&[text_content("a"), text_content("b")], Some("Quarterly"))).unwrap();
    let metadata = read_metadata(&doc).unwrap();
    assert_eq!(metadata.page_count, 2);
    assert_eq!(metadata.info.title.as_deref(), Some("Quarterly"));
    assert_eq!(metadata.info.producer.as_deref(), Some("test suite"));
    assert_eq!(metadata.info.author, None);
}

#[test]
fn test_no_info_yields_empty_fields() {
    let doc = load(&pdf_with_contents(&[text_content("a")], None)).unwrap();
    let metadata = read_metadata(&doc).unwrap();
    assert!(metadata.info.is_empty());
    assert_eq!(metadata.page_count, 1);
}

#[test]
fn test_dangling_info_yields_empty_fields() {
    let pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
        .build("/Root 1 0 R /Info 9 0 R");
    let metadata = read_metadata(&load(&pdf).unwrap()).unwrap();
    assert!(metadata.info.is_empty());
}

#[test]
fn test_utf16_and_custom_entries() {
    let pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
        .object(3, "<< /Author <FEFF00C50073006B> /Keywords (pdf, rust) /Company (ACME) >>")
        .build("/Root 1 0 R /Info 3 0 R");
    let info = read_metadata(&load(&pdf).unwrap()).unwrap().info;
    assert_eq!(info.author.as_deref(), Some("\u{c5}sk"));
    assert_eq!(info.extra.get("Keywords").map(String::as_str), Some("pdf, rust"));
    assert_eq!(info.extra.get("Company").map(String::as_str), Some("ACME"));
}

#[test]
fn test_write_replaces_and_survives_save() {
    let doc = load(&pdf_with_contents(&[text_content("a")], Some("Old title"))).unwrap();
    let info = DocumentInfo::default()
        .with_author("Ada")
        .with_subject("\u{3b1}\u{3b2}\u{3b3}");
    let updated = write_metadata(&doc, &info).unwrap();

    let reloaded = load(&save(&updated).unwrap()).unwrap();
    let metadata = read_metadata(&reloaded).unwrap();
    assert_eq!(metadata.info.title, None);
    assert_eq!(metadata.info.producer, None);
    assert_eq!(metadata.info.author.as_deref(), Some("Ada"));
    assert_eq!(metadata.info.subject.as_deref(), Some("\u{3b1}\u{3b2}\u{3b3}"));
    assert_eq!(metadata.page_count, 1);

    // the source still has its old Info
    assert_eq!(read_metadata(&doc).unwrap().info.title.as_deref(), Some("Old title"));
}

#[test]
fn test_write_empty_removes_info() {
    let doc = load(&pdf_with_contents(&[text_content("a")], Some("Gone"))).unwrap();
    let cleared = write_metadata(&doc, &DocumentInfo::default()).unwrap();
    let reloaded = load(&save(&cleared).unwrap()).unwrap();
    assert!(reloaded.trailer().get("Info").is_none());
    assert!(read_metadata(&reloaded).unwrap().info.is_empty());
}

#[test]
fn test_metadata_json() {
    let doc = load(&pdf_with_contents(&[text_content("a")], Some("Json"))).unwrap();
    let json = serde_json::to_value(read_metadata(&doc).unwrap()).unwrap();
    assert_eq!(json["title"], "Json");
    assert_eq!(json["page_count"], 1);
}
