//! Text extraction from complete files.

mod common;

use common::{flate, stream, text_pdf, RawPdf};
use pdf_handler::operations::extract_text;
use pdf_handler::{load, Error};

fn joined(doc: &pdf_handler::Document, index: usize) -> String {
    extract_text(doc, &[index]).remove(0).text().unwrap()
}

#[test]
fn test_simple_pages() {
    let doc = load(&text_pdf(&["Hello World", "Second page"])).unwrap();
    let pages = extract_text(&doc, &[0, 1]);
    assert_eq!(pages[0].text().as_deref(), Some("Hello World"));
    assert_eq!(pages[1].text().as_deref(), Some("Second page"));

    let runs = pages[0].result.as_ref().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].font, "Helvetica");
    assert_eq!(runs[0].font_size, 12.0);
}

#[test]
fn test_page_without_text_is_empty() {
    let doc = load(&common::pdf_with_contents(&[b"q 1 0 0 1 0 0 cm 0 0 m 100 100 l S Q".to_vec()], None)).unwrap();
    let pages = extract_text(&doc, &[0]);
    assert!(pages[0].is_empty());
}

#[test]
fn test_out_of_range_recorded_and_rest_processed() {
    let doc = load(&text_pdf(&["only"])).unwrap();
    let pages = extract_text(&doc, &[3, 0]);
    assert!(matches!(pages[0].result, Err(Error::PageIndexOutOfRange { index: 3, count: 1 })));
    assert_eq!(pages[1].text().as_deref(), Some("only"));
}

#[test]
fn test_lines_kerning_and_escapes() {
    let content = b"BT /F1 10 Tf 72 700 Td (Line \\(one\\)) Tj 0 -12 Td [(Sp) -300 (aced) 20 (!)] TJ T* (third) ' ET";
    let doc = load(&common::pdf_with_contents(&[content.to_vec()], None)).unwrap();
    assert_eq!(joined(&doc, 0), "Line (one)\nSp aced!\nthird");
}

#[test]
fn test_content_array_split_across_streams() {
    let pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents [4 0 R 5 0 R] \
             /Resources << /Font << /F1 6 0 R >> >> >>",
        )
        .object(4, stream("/Filter /FlateDecode", &flate(b"BT /F1 9 Tf (first) Tj")))
        .object(5, stream("", b"(second) Tj ET"))
        .object(6, "<< /Type /Font /Subtype /TrueType /BaseFont /Arial >>")
        .build("/Root 1 0 R");
    let doc = load(&pdf).unwrap();
    // the text object spans both streams
    assert_eq!(joined(&doc, 0), "firstsecond");
}

#[test]
fn test_type0_font_with_to_unicode() {
    let cmap = b"/CIDInit /ProcSet findresource begin\n\
                 12 dict begin\nbegincmap\n\
                 1 begincodespacerange <0000> <FFFF> endcodespacerange\n\
                 2 beginbfchar <0001> <0048> <0002> <0069> endbfchar\n\
                 1 beginbfrange <0010> <0011> [<00E9> <263A>] endbfrange\n\
                 endcmap\nend\nend";
    let pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R \
             /Resources << /Font << /F2 5 0 R >> >> >>",
        )
        .object(4, stream("", b"BT /F2 11 Tf <000100020010> Tj <0011> Tj ET"))
        .object(
            5,
            "<< /Type /Font /Subtype /Type0 /BaseFont /NotoSans /Encoding /Identity-H /ToUnicode 6 0 R >>",
        )
        .object(6, stream("/Filter /FlateDecode", &flate(cmap)))
        .build("/Root 1 0 R");
    let doc = load(&pdf).unwrap();
    let runs = extract_text(&doc, &[0]).remove(0).result.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].text, "Hi\u{e9}");
    assert_eq!(runs[1].text, "\u{263A}");
    assert_eq!(runs[0].font, "NotoSans");
}

#[test]
fn test_form_xobject_text() {
    let pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R \
             /Resources << /Font << /F1 6 0 R >> /XObject << /X1 5 0 R >> >> >>",
        )
        .object(4, stream("", b"BT /F1 12 Tf (before) Tj ET /X1 Do BT /F1 12 Tf 0 -20 Td (after) Tj ET"))
        .object(
            5,
            stream(
                "/Type /XObject /Subtype /Form /BBox [0 0 100 100] /Resources << /Font << /F1 6 0 R >> >>",
                b"BT /F1 8 Tf (inside) Tj ET",
            ),
        )
        .object(6, "<< /Type /Font /Subtype /Type1 /BaseFont /Courier >>")
        .build("/Root 1 0 R");
    let doc = load(&pdf).unwrap();
    let runs = extract_text(&doc, &[0]).remove(0).result.unwrap();
    let texts: Vec<&str> = runs.iter().map(|r| r.text.trim_start()).collect();
    assert_eq!(texts, ["before", "inside", "after"]);
    assert_eq!(runs[1].font_size, 8.0);
}
