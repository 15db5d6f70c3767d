//! Cross-reference reconstruction for damaged files.
//!
//! When the xref is missing, points to garbage or yields a trailer without a
//! usable `/Root`, the whole file is scanned for `N G obj` headers. Later
//! definitions of the same object number replace earlier ones, objects packed
//! into object streams are registered as compressed entries, and the trailer
//! is taken from the last `trailer` dictionary (or cross-reference stream) or
//! rebuilt around the catalog.

use crate::decoders::decode_stream_with_options;
use crate::error::{Error, Result};
use crate::object::{Dictionary, ObjectRef, PdfValue};
use crate::objstm::ObjectStream;
use crate::parser::ObjectParser;
use crate::parser_config::ParserOptions;
use crate::xref::{CrossRefTable, XRefEntry};
use lazy_static::lazy_static;
use regex::bytes::Regex;
use std::collections::BTreeMap;

lazy_static! {
    /// `N G obj` with PDF whitespace between the parts
    static ref RE_OBJ_HEADER: Regex =
        Regex::new(r"(\d{1,10})[\x00\t\n\x0C\r ]+(\d{1,5})[\x00\t\n\x0C\r ]+obj").unwrap();
    static ref RE_TRAILER: Regex = Regex::new(r"trailer[\x00\t\n\x0C\r ]*<<").unwrap();
}

/// Rebuild the cross-reference table and trailer by scanning every byte.
pub fn reconstruct_xref(data: &[u8], options: &ParserOptions) -> Result<CrossRefTable> {
    log::info!("Reconstructing cross-reference table by linear scan");

    let parser = ObjectParser::new(options);
    let mut table = CrossRefTable::new();
    // object number -> (gen, parsed value) for the winning definitions
    let mut found: BTreeMap<u32, (u16, Option<PdfValue>)> = BTreeMap::new();

    for caps in RE_OBJ_HEADER.captures_iter(data) {
        let (Some(whole), Some(num), Some(gen)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        // "112 0 obj" must not be read as "12 0 obj"
        if whole.start() > 0 && data[whole.start() - 1].is_ascii_digit() {
            continue;
        }
        let (Some(id), Some(gen)) = (ascii_number::<u32>(num.as_bytes()), ascii_number::<u16>(gen.as_bytes()))
        else {
            continue;
        };

        let offset = whole.start();
        let value = parser
            .indirect_object(&data[offset..])
            .ok()
            .map(|(_, (_, value))| value);
        if value.is_none() {
            log::debug!("Object header {} {} at {} does not parse; keeping offset", id, gen, offset);
        }

        table.add_entry(id, XRefEntry::uncompressed(offset, gen));
        found.insert(id, (gen, value));
    }

    if found.is_empty() {
        return Err(Error::malformed("no objects found while scanning the file"));
    }

    let packed = register_object_streams(&mut table, &found, options);

    let trailer = recover_trailer(data, &table, &found, &packed, options)?;
    table.set_trailer(trailer);

    log::info!("Recovered {} objects by linear scan", table.len());
    Ok(table)
}

/// Add compressed entries for objects inside discovered object streams and
/// return the packed objects that parsed. Objects defined directly in the file
/// take precedence.
fn register_object_streams(
    table: &mut CrossRefTable,
    found: &BTreeMap<u32, (u16, Option<PdfValue>)>,
    options: &ParserOptions,
) -> Vec<(u32, PdfValue)> {
    let mut packed = Vec::new();
    for (&stream_id, (_, value)) in found {
        let Some(value @ PdfValue::Stream { dict, .. }) = value else {
            continue;
        };
        if value.dict_type() != Some("ObjStm") {
            continue;
        }
        let stream = decode_stream_with_options(value, options).and_then(|d| ObjectStream::parse(dict, d));
        match stream {
            Ok(stream) => {
                let ids: Vec<u32> = stream.object_numbers().collect();
                for (index, id) in ids.into_iter().enumerate() {
                    if found.contains_key(&id) {
                        continue;
                    }
                    table.add_entry(id, XRefEntry::compressed(stream_id, index as u32));
                    if let Ok(obj) = stream.object(index, id, options) {
                        packed.push((id, obj));
                    }
                }
            },
            Err(e) => log::debug!("Object stream {} unreadable during recovery: {}", stream_id, e),
        }
    }
    packed
}

/// Pick the trailer: the last `trailer` dictionary or cross-reference stream
/// dictionary whose `/Root` exists, otherwise one rebuilt around the catalog.
fn recover_trailer(
    data: &[u8],
    table: &CrossRefTable,
    found: &BTreeMap<u32, (u16, Option<PdfValue>)>,
    packed: &[(u32, PdfValue)],
    options: &ParserOptions,
) -> Result<Dictionary> {
    let parser = ObjectParser::new(options);
    let root_exists = |d: &Dictionary| {
        d.get("Root")
            .and_then(|r| r.as_reference())
            .is_some_and(|r| table.contains(r.id))
    };

    let mut candidates: Vec<Dictionary> = RE_TRAILER
        .find_iter(data)
        .filter_map(|m| {
            let dict_start = m.end() - 2;
            match parser.parse(&data[dict_start..]) {
                Ok((_, PdfValue::Dictionary(d))) => Some(d),
                _ => None,
            }
        })
        .collect();
    candidates.extend(found.values().filter_map(|(_, v)| match v {
        Some(PdfValue::Stream { dict, .. }) if dict.get("Type").and_then(|t| t.as_name()) == Some("XRef") => {
            Some(dict.clone())
        },
        _ => None,
    }));

    let mut trailer = candidates.iter().rev().find(|d| root_exists(d)).cloned().unwrap_or_else(|| {
        candidates.last().cloned().unwrap_or_default()
    });

    if !root_exists(&trailer) {
        let direct = found
            .iter()
            .rev()
            .find(|(_, (_, v))| v.as_ref().and_then(|v| v.dict_type()) == Some("Catalog"))
            .map(|(id, (gen, _))| ObjectRef::new(*id, *gen));
        let catalog = direct
            .or_else(|| {
                packed
                    .iter()
                    .rev()
                    .find(|(_, v)| v.dict_type() == Some("Catalog"))
                    .map(|(id, _)| ObjectRef::new(*id, 0))
            })
            .ok_or_else(|| Error::malformed("no trailer with /Root and no /Type /Catalog object"))?;
        log::info!("Rebuilt trailer around catalog {}", catalog);
        trailer.insert("Root".to_string(), PdfValue::Reference(catalog));
    }

    for key in ["Type", "W", "Index", "Filter", "DecodeParms", "Length", "Prev", "XRefStm"] {
        trailer.shift_remove(key);
    }
    let size = table.max_object_number() as i64 + 1;
    trailer.insert("Size".to_string(), PdfValue::Integer(size));
    Ok(trailer)
}

fn ascii_number<T: std::str::FromStr>(bytes: &[u8]) -> Option<T> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}
