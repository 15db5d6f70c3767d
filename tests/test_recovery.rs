//! Damaged files, modern cross-reference formats and structural errors.

mod common;

use common::{flate, stream, text_content, text_pdf, RawPdf};
use pdf_handler::operations::extract_text;
use pdf_handler::{load, load_with_options, Error, ParserOptions};

fn replace_once(data: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    let pos = data.windows(from.len()).rposition(|w| w == from).unwrap();
    [&data[..pos], to, &data[pos + from.len()..]].concat()
}

#[test]
fn test_bad_startxref_recovers() {
    let good = text_pdf(&["recovered"]);
    let tail = String::from_utf8_lossy(&good[good.len() - 30..]).to_string();
    let offset = tail.split_whitespace().rev().nth(1).unwrap().to_string();
    let broken = replace_once(&good, format!("startxref\n{}", offset).as_bytes(), b"startxref\n999999");

    let doc = load(&broken).unwrap();
    assert_eq!(doc.page_count().unwrap(), 1);
    assert_eq!(extract_text(&doc, &[0])[0].text().as_deref(), Some("recovered"));

    assert!(load_with_options(&broken, ParserOptions::strict()).is_err());
}

#[test]
fn test_shifted_offsets_recover() {
    let good = text_pdf(&["shifted"]);
    // ten bytes of padding after the header moves every object
    let broken = replace_once(&good, b"%\xE2\xE3\xCF\xD3\n", b"%\xE2\xE3\xCF\xD3\n%padding!\n");
    let doc = load(&broken).unwrap();
    assert_eq!(extract_text(&doc, &[0])[0].text().as_deref(), Some("shifted"));
}

#[test]
fn test_missing_xref_table() {
    let (body, _) = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R >>")
        .body();
    let mut data = body;
    data.extend_from_slice(b"trailer\n<< /Root 1 0 R >>\n%%EOF\n");
    let doc = load(&data).unwrap();
    assert_eq!(doc.page_count().unwrap(), 1);
}

#[test]
fn test_garbage_is_malformed() {
    assert!(matches!(load(b"%PDF-1.4\nnothing to see"), Err(Error::MalformedDocument(_))));
}

#[test]
fn test_cyclic_page_tree_rejected() {
    let pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Pages /Parent 2 0 R /Kids [2 0 R] /Count 1 >>")
        .build("/Root 1 0 R");
    let doc = load(&pdf).unwrap();
    assert!(matches!(doc.page_count(), Err(Error::MalformedDocument(_))));
}

#[test]
fn test_unsupported_filter() {
    let pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>")
        .object(4, stream("/Filter /SnappyDecode", b"xyz"))
        .build("/Root 1 0 R");
    let doc = load(&pdf).unwrap();
    let page = doc.page(0).unwrap();
    assert!(matches!(doc.page_contents(&page), Err(Error::UnsupportedFilter(name)) if name == "SnappyDecode"));
}

#[test]
fn test_wrong_stream_length() {
    let content = text_content("length");
    let body = format!("<< /Length {} >>\nstream\n", content.len() + 40).into_bytes();
    let object = [body.as_slice(), &content, b"\nendstream"].concat();
    let pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            "<< /Type /Pages /Kids [3 0 R] /Count 1 /Resources << /Font << /F1 5 0 R >> >> >>",
        )
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>")
        .object(4, object)
        .object(5, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>")
        .build("/Root 1 0 R");
    let doc = load(&pdf).unwrap();
    assert_eq!(extract_text(&doc, &[0])[0].text().as_deref(), Some("length"));
}

/// Catalog and page tree root in a compressed object stream, indexed by a
/// cross-reference stream.
fn object_stream_pdf() -> Vec<u8> {
    let catalog: &[u8] = b"<< /Type /Catalog /Pages 2 0 R >>";
    let pages: &[u8] = b"<< /Type /Pages /Kids [3 0 R] /Count 1 /Resources << /Font << /F1 << /Type /Font /Subtype /Type1 /BaseFont /Courier >> >> >> >>";
    let header = format!("1 0 2 {} ", catalog.len() + 1);
    let packed = [header.as_bytes(), catalog, b" ", pages].concat();
    let objstm = stream(
        &format!("/Type /ObjStm /N 2 /First {} /Filter /FlateDecode", header.len()),
        &flate(&packed),
    );

    let (mut data, offsets) = RawPdf::new()
        .version("1.5")
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>")
        .object(4, stream("/Filter /FlateDecode", &flate(&text_content("compressed"))))
        .object(5, objstm)
        .body();
    let offset_of = |id: u32| offsets.iter().find(|(n, _)| *n == id).unwrap().1 as u32;

    let xref_offset = data.len() as u32;
    let mut rows = Vec::new();
    let mut row = |kind: u8, field2: u32, field3: u16| {
        rows.push(kind);
        rows.extend_from_slice(&field2.to_be_bytes());
        rows.extend_from_slice(&field3.to_be_bytes());
    };
    row(0, 0, 65535);
    row(2, 5, 0);
    row(2, 5, 1);
    row(1, offset_of(3), 0);
    row(1, offset_of(4), 0);
    row(1, offset_of(5), 0);
    row(1, xref_offset, 0);

    data.extend_from_slice(b"6 0 obj\n");
    data.extend_from_slice(&stream("/Type /XRef /Size 7 /W [1 4 2] /Root 1 0 R", &rows));
    data.extend_from_slice(format!("\nendobj\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());
    data
}

#[test]
fn test_xref_stream_and_object_stream() {
    let doc = load_with_options(&object_stream_pdf(), ParserOptions::strict()).unwrap();
    assert_eq!(doc.version(), (1, 5));
    assert_eq!(doc.catalog().unwrap().get("Type").and_then(|t| t.as_name()), Some("Catalog"));
    assert_eq!(doc.page_count().unwrap(), 1);
    let page = extract_text(&doc, &[0]).remove(0).result.unwrap();
    assert_eq!(page[0].text, "compressed");
    assert_eq!(page[0].font, "Courier");
}

#[test]
fn test_object_stream_written_as_plain_objects() {
    let doc = load(&object_stream_pdf()).unwrap();
    let saved = pdf_handler::save(&doc).unwrap();
    assert!(!saved.windows(6).any(|w| w == b"ObjStm"));
    let reloaded = load_with_options(&saved, ParserOptions::strict()).unwrap();
    assert_eq!(extract_text(&reloaded, &[0])[0].text().as_deref(), Some("compressed"));
}
