//! PDF files assembled byte by byte for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;

/// zlib-compress `data`.
pub fn flate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A stream object body with `/Length` set and `extra` dictionary entries.
pub fn stream(extra: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!("<< /Length {} {} >>\nstream\n", data.len(), extra).into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(b"\nendstream");
    body
}

/// Raw objects written in order, followed by a classic xref table.
pub struct RawPdf {
    version: &'static str,
    objects: Vec<(u32, Vec<u8>)>,
}

impl RawPdf {
    pub fn new() -> Self {
        Self {
            version: "1.4",
            objects: Vec::new(),
        }
    }

    pub fn version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    pub fn object(mut self, id: u32, body: impl AsRef<[u8]>) -> Self {
        self.objects.push((id, body.as_ref().to_vec()));
        self
    }

    /// Header and objects only, plus the offset of each object.
    pub fn body(&self) -> (Vec<u8>, Vec<(u32, usize)>) {
        let mut out = format!("%PDF-{}\n", self.version).into_bytes();
        out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        let mut offsets = Vec::new();
        for (id, body) in &self.objects {
            offsets.push((*id, out.len()));
            out.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }
        (out, offsets)
    }

    /// Complete file with a classic xref table and `trailer_extra` in the
    /// trailer dictionary.
    pub fn build(&self, trailer_extra: &str) -> Vec<u8> {
        let (mut out, offsets) = self.body();
        let size = offsets.iter().map(|(id, _)| id + 1).max().unwrap_or(1);
        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
        for id in 0..size {
            match offsets.iter().find(|(n, _)| *n == id) {
                Some((_, offset)) => out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes()),
                None if id == 0 => out.extend_from_slice(b"0000000000 65535 f \n"),
                None => out.extend_from_slice(b"0000000000 00000 f \n"),
            }
        }
        out.extend_from_slice(format!("trailer\n<< /Size {} {} >>\nstartxref\n{}\n%%EOF\n", size, trailer_extra, xref).as_bytes());
        out
    }
}

/// Content stream showing `text` in Helvetica.
pub fn text_content(text: &str) -> Vec<u8> {
    format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text).into_bytes()
}

/// A PDF with one page per entry of `contents`, each content stream
/// FlateDecode-compressed, and an Info dictionary when `title` is set.
///
/// Objects: 1 catalog, 2 page tree, 3 font, 4 Info, then page and content
/// pairs from 5.
pub fn pdf_with_contents(contents: &[Vec<u8>], title: Option<&str>) -> Vec<u8> {
    let kids: Vec<String> = (0..contents.len()).map(|i| format!("{} 0 R", 5 + 2 * i)).collect();
    let mut pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 3 0 R >> >> >>",
                kids.join(" "),
                contents.len()
            ),
        )
        .object(3, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>");
    if let Some(title) = title {
        pdf = pdf.object(4, format!("<< /Title ({}) /Producer (test suite) >>", title));
    }
    for (i, content) in contents.iter().enumerate() {
        let page = 5 + 2 * i as u32;
        pdf = pdf
            .object(page, format!("<< /Type /Page /Parent 2 0 R /Contents {} 0 R >>", page + 1))
            .object(page + 1, stream("/Filter /FlateDecode", &flate(content)));
    }
    let trailer = if title.is_some() {
        "/Root 1 0 R /Info 4 0 R"
    } else {
        "/Root 1 0 R"
    };
    pdf.build(trailer)
}

/// A PDF whose pages show `texts`.
pub fn text_pdf(texts: &[&str]) -> Vec<u8> {
    let contents: Vec<Vec<u8>> = texts.iter().map(|t| text_content(t)).collect();
    pdf_with_contents(&contents, None)
}

/// Write `bytes` to `dir/name`.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Break the `N 0 obj` header of object `id` in place, so the object can be
/// found neither through the xref table nor by scanning.
pub fn corrupt_object(bytes: &mut [u8], id: u32) {
    let header = format!("\n{} 0 obj\n", id).into_bytes();
    let start = bytes
        .windows(header.len())
        .position(|w| w == header.as_slice())
        .unwrap();
    let keyword = start + header.len() - 4;
    bytes[keyword..keyword + 3].copy_from_slice(b"xxx");
}

/// A PDF whose pages show `texts`, with the content stream of page
/// `broken` (0-based) unreadable.
pub fn text_pdf_with_broken_page(texts: &[&str], broken: usize) -> Vec<u8> {
    let mut bytes = text_pdf(texts);
    corrupt_object(&mut bytes, 6 + 2 * broken as u32);
    bytes
}
