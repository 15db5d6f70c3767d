//! PDF document model.
//!
//! A [`Document`] owns the raw file bytes, the cross-reference table and the
//! trailer. Objects are parsed lazily on first access and memoized; objects
//! added or replaced in memory live in a separate table that always wins over
//! the file. The page tree is flattened on demand into a depth-first sequence
//! of page references.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use bytes::Bytes;

use crate::decoders::decode_data;
use crate::encryption::{EncryptionState, SecurityHandler};
use crate::error::{Error, Result};
use crate::object::{Dictionary, ObjectRef, PdfValue};
use crate::objstm::ObjectStream;
use crate::operations::metadata::DocumentInfo;
use crate::parser::{to_parse_error, ObjectParser};
use crate::parser_config::ParserOptions;
use crate::xref::{find_startxref, read_xref_chain, CrossRefTable, XRefEntry};
use crate::xref_reconstruction::reconstruct_xref;

/// Page attributes a page inherits from its ancestors when absent locally.
const INHERITABLE: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Bytes searched for the `%PDF-` header.
const HEADER_WINDOW: usize = 1024;

/// One page of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    index: usize,
    reference: ObjectRef,
    dict: Dictionary,
}

impl Page {
    /// 0-based position in the page sequence.
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based page number.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Reference of the page object.
    pub fn reference(&self) -> ObjectRef {
        self.reference
    }

    /// Page dictionary with inherited attributes filled in.
    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    /// `/Resources` entry (may still be a reference).
    pub fn resources(&self) -> Option<&PdfValue> {
        self.dict.get("Resources")
    }

    /// `/MediaBox` as `[llx, lly, urx, ury]`, when it is a direct array of numbers.
    pub fn media_box(&self) -> Option<[f64; 4]> {
        let items = self.dict.get("MediaBox")?.as_array()?;
        if items.len() != 4 {
            return None;
        }
        let mut out = [0.0; 4];
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = item.as_number()?;
        }
        Some(out)
    }

    /// `/Rotate` in degrees, 0 when absent.
    pub fn rotation(&self) -> i64 {
        self.dict.get("Rotate").and_then(|r| r.as_integer()).unwrap_or(0)
    }
}

/// A PDF document.
///
/// `Document` is `Send` but not `Sync`: the object memo uses interior
/// mutability so that read access only needs `&self`.
#[derive(Clone)]
pub struct Document {
    data: Bytes,
    version: (u8, u8),
    options: ParserOptions,
    xref: CrossRefTable,
    trailer: Dictionary,
    /// Objects created or replaced in memory: object number -> (generation, value)
    modified: BTreeMap<u32, (u16, PdfValue)>,
    next_id: u32,
    object_cache: RefCell<HashMap<u32, PdfValue>>,
    object_streams: RefCell<HashMap<u32, ObjectStream>>,
    /// Table from a linear scan, built the first time an xref offset is wrong
    recovered: RefCell<Option<CrossRefTable>>,
    /// Objects being parsed right now; guards self-referencing `/Length`
    loading: RefCell<HashSet<u32>>,
    page_refs: RefCell<Option<Vec<ObjectRef>>>,
    encryption: EncryptionState,
    encrypt_ref: Option<ObjectRef>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document: a catalog and a page tree without pages.
    pub fn new() -> Self {
        let catalog_ref = ObjectRef::new(1, 0);
        let pages_ref = ObjectRef::new(2, 0);

        let mut catalog = Dictionary::new();
        catalog.insert("Type".to_string(), PdfValue::name("Catalog"));
        catalog.insert("Pages".to_string(), pages_ref.into());

        let mut pages = Dictionary::new();
        pages.insert("Type".to_string(), PdfValue::name("Pages"));
        pages.insert("Kids".to_string(), PdfValue::Array(Vec::new()));
        pages.insert("Count".to_string(), PdfValue::Integer(0));

        let mut modified = BTreeMap::new();
        modified.insert(catalog_ref.id, (0, PdfValue::Dictionary(catalog)));
        modified.insert(pages_ref.id, (0, PdfValue::Dictionary(pages)));

        let mut trailer = Dictionary::new();
        trailer.insert("Root".to_string(), catalog_ref.into());

        Self {
            data: Bytes::new(),
            version: (1, 7),
            options: ParserOptions::default(),
            xref: CrossRefTable::new(),
            trailer,
            modified,
            next_id: 3,
            object_cache: RefCell::new(HashMap::new()),
            object_streams: RefCell::new(HashMap::new()),
            recovered: RefCell::new(None),
            loading: RefCell::new(HashSet::new()),
            page_refs: RefCell::new(None),
            encryption: EncryptionState::Unencrypted,
            encrypt_ref: None,
        }
    }

    /// Load a document from bytes with lenient options.
    pub fn load(data: &[u8]) -> Result<Self> {
        Self::load_with_options(data, ParserOptions::default())
    }

    /// Load a document from bytes.
    ///
    /// Structural failures surface as [`Error::MalformedDocument`] once
    /// recovery (lenient mode only) has been tried. An unsupported security
    /// handler is reported as [`Error::Encryption`].
    pub fn load_with_options(data: &[u8], options: ParserOptions) -> Result<Self> {
        let (data, version) = match find_header(data) {
            Some((offset, version)) => {
                if offset > 0 {
                    log::warn!("Skipping {} bytes of garbage before the header", offset);
                }
                (Bytes::copy_from_slice(&data[offset..]), version)
            },
            None if options.strict => {
                return Err(Error::malformed("no %PDF- header in the first 1024 bytes"));
            },
            None => {
                log::warn!("No %PDF- header found; assuming PDF 1.7");
                (Bytes::copy_from_slice(data), (1, 7))
            },
        };

        let mut doc = Self {
            data,
            version,
            options,
            ..Self::new()
        };
        doc.modified.clear();
        doc.trailer.clear();

        if let Err(e) = doc.read_structure() {
            if options.strict {
                return Err(into_malformed(e));
            }
            log::warn!("Cross-reference data unusable ({}); scanning the file", e);
            doc.recover()?;
        }

        if let Err(e) = doc.catalog() {
            if options.strict {
                return Err(into_malformed(e));
            }
            log::warn!("Trailer /Root unusable ({}); scanning the file", e);
            doc.recover()?;
            doc.catalog().map_err(into_malformed)?;
        }

        doc.init_encryption()?;
        log::debug!(
            "Loaded PDF {}.{} with {} cross-reference entries",
            doc.version.0,
            doc.version.1,
            doc.xref.len()
        );
        Ok(doc)
    }

    fn read_structure(&mut self) -> Result<()> {
        let offset = find_startxref(&self.data)?;
        let table = read_xref_chain(&self.data, offset, &self.options)?;
        if !table.trailer().contains_key("Root") {
            return Err(Error::malformed("trailer has no /Root"));
        }
        self.install_table(table);
        Ok(())
    }

    fn recover(&mut self) -> Result<()> {
        let table = reconstruct_xref(&self.data, &self.options).map_err(into_malformed)?;
        log::info!("Recovered {} objects by linear scan", table.len());
        *self.recovered.get_mut() = Some(table.clone());
        self.install_table(table);
        Ok(())
    }

    fn install_table(&mut self, table: CrossRefTable) {
        let size = table
            .trailer()
            .get("Size")
            .and_then(|s| s.as_integer())
            .and_then(|s| u32::try_from(s).ok())
            .unwrap_or(0);
        self.next_id = size.max(table.max_object_number() + 1).max(1);
        self.trailer = table.trailer().clone();
        self.xref = table;
        self.clear_memo();
    }

    fn init_encryption(&mut self) -> Result<()> {
        let Some(value) = self.trailer.get("Encrypt").cloned() else {
            return Ok(());
        };
        self.encrypt_ref = value.as_reference();
        let dict = match self.resolve(&value)? {
            PdfValue::Dictionary(d) => d,
            other => return Err(Error::Encryption(format!("/Encrypt is a {}", other.type_name()))),
        };
        let file_id = self.file_id();
        let mut handler = SecurityHandler::from_dict(&dict, &file_id)?;

        self.encryption = match handler.unlock(b"") {
            Ok(()) => {
                log::info!("Opened with the empty user password");
                EncryptionState::Decrypted(handler)
            },
            Err(Error::IncorrectPassword) => EncryptionState::Encrypted(handler),
            Err(e) => return Err(e),
        };
        self.clear_memo();
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Header version `(major, minor)`.
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// Change the version written in the header.
    pub fn set_version(&mut self, major: u8, minor: u8) {
        self.version = (major, minor);
    }

    /// Trailer dictionary.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Options the document was loaded with.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Encryption state.
    pub fn encryption_state(&self) -> &EncryptionState {
        &self.encryption
    }

    /// Whether the document carries an encryption dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_encrypted()
    }

    /// Encrypted and not unlocked.
    pub fn is_locked(&self) -> bool {
        self.encryption.is_locked()
    }

    /// Reference of the encryption dictionary, if it is indirect.
    pub(crate) fn encrypt_ref(&self) -> Option<ObjectRef> {
        self.encrypt_ref
    }

    /// First element of the trailer `/ID`, or empty.
    pub fn file_id(&self) -> Vec<u8> {
        self.trailer
            .get("ID")
            .and_then(|id| id.as_array())
            .and_then(|ids| ids.first())
            .and_then(|first| first.as_string())
            .map(|s| s.to_vec())
            .unwrap_or_default()
    }

    /// Document catalog (`/Root`).
    pub fn catalog(&self) -> Result<Dictionary> {
        let root = self
            .trailer
            .get("Root")
            .ok_or_else(|| Error::malformed("trailer has no /Root"))?;
        let catalog = self.resolve(root)?;
        match catalog.as_dict() {
            Some(d) => Ok(d.clone()),
            None => Err(Error::malformed(format!("/Root is a {}", catalog.type_name()))),
        }
    }

    /// Document information dictionary, if present and usable.
    ///
    /// Fails with [`Error::Locked`] on a locked document: its strings are
    /// still ciphertext.
    pub fn info(&self) -> Result<Option<Dictionary>> {
        let Some(info) = self.trailer.get("Info") else {
            return Ok(None);
        };
        if self.is_locked() {
            return Err(Error::Locked);
        }
        match self.resolve(info) {
            Ok(PdfValue::Dictionary(d)) => Ok(Some(d)),
            Ok(other) => {
                log::warn!("Ignoring /Info of type {}", other.type_name());
                Ok(None)
            },
            Err(Error::DanglingReference(r)) => {
                log::warn!("Ignoring dangling /Info reference {}", r);
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Object access
    // ========================================================================

    /// Follow one level of indirection. Direct values are returned as-is.
    pub fn resolve(&self, value: &PdfValue) -> Result<PdfValue> {
        match value {
            PdfValue::Reference(r) => self.get_object(*r),
            other => Ok(other.clone()),
        }
    }

    /// Value of an indirect object.
    ///
    /// Fails with [`Error::DanglingReference`] when the object number is
    /// missing or free. A generation mismatch is tolerated.
    pub fn get_object(&self, reference: ObjectRef) -> Result<PdfValue> {
        if let Some((_, value)) = self.modified.get(&reference.id) {
            return Ok(value.clone());
        }
        if let Some(value) = self.object_cache.borrow().get(&reference.id) {
            return Ok(value.clone());
        }

        if !self.loading.borrow_mut().insert(reference.id) {
            return Err(Error::malformed(format!("object {} refers to itself while loading", reference)));
        }
        let result = self.load_object(reference);
        self.loading.borrow_mut().remove(&reference.id);

        let value = result?;
        self.object_cache.borrow_mut().insert(reference.id, value.clone());
        Ok(value)
    }

    /// Resolve and require a dictionary (or stream dictionary).
    pub fn resolve_dict(&self, value: &PdfValue) -> Result<Dictionary> {
        let resolved = self.resolve(value)?;
        resolved
            .as_dict()
            .cloned()
            .ok_or_else(|| resolved.type_error("Dictionary"))
    }

    fn load_object(&self, reference: ObjectRef) -> Result<PdfValue> {
        let entry = match self.xref.get(reference.id) {
            Some(entry) if entry.in_use() => Some(*entry),
            _ => self.recovered_entry(reference.id),
        };
        match entry {
            Some(XRefEntry::InUse { offset, .. }) => self.load_direct(reference, offset),
            Some(XRefEntry::Compressed { stream, index }) => self.load_compressed(reference, stream, index),
            Some(XRefEntry::Free { .. }) | None => Err(Error::DanglingReference(reference)),
        }
    }

    /// Entry from a linear scan. Only consulted in lenient mode.
    fn recovered_entry(&self, id: u32) -> Option<XRefEntry> {
        if self.options.strict || self.data.is_empty() {
            return None;
        }
        if self.recovered.borrow().is_none() {
            let table = match reconstruct_xref(&self.data, &self.options) {
                Ok(table) => table,
                Err(e) => {
                    log::warn!("Linear scan failed: {}", e);
                    CrossRefTable::new()
                },
            };
            *self.recovered.borrow_mut() = Some(table);
        }
        self.recovered
            .borrow()
            .as_ref()
            .and_then(|table| table.get(id).copied())
            .filter(|entry| entry.in_use())
    }

    fn load_direct(&self, reference: ObjectRef, offset: usize) -> Result<PdfValue> {
        match self.parse_at(reference, offset) {
            Ok(value) => Ok(value),
            Err(e) if !self.options.strict => {
                log::warn!("Object {} not at offset {} ({}); scanning the file", reference, offset, e);
                match self.recovered_entry(reference.id) {
                    Some(XRefEntry::InUse { offset: found, .. }) if found != offset => self.parse_at(reference, found),
                    Some(XRefEntry::Compressed { stream, index }) => self.load_compressed(reference, stream, index),
                    _ => Err(e),
                }
            },
            Err(e) => Err(e),
        }
    }

    fn parse_at(&self, reference: ObjectRef, offset: usize) -> Result<PdfValue> {
        let input = self.data.get(offset..).ok_or_else(|| Error::ParseError {
            offset,
            reason: "offset past end of file".to_string(),
        })?;
        let length_of = |r: ObjectRef| self.resolve_length(r);
        let parser = ObjectParser::new(&self.options).with_length_resolver(&length_of);
        let (_, (found, mut value)) = parser
            .indirect_object(input)
            .map_err(|e| to_parse_error(input, offset, e))?;
        if found.id != reference.id {
            return Err(Error::ParseError {
                offset,
                reason: format!("expected object {}, found {}", reference.id, found.id),
            });
        }

        if let EncryptionState::Decrypted(handler) = &self.encryption {
            if self.encrypt_ref.map(|r| r.id) != Some(found.id) {
                handler.decrypt_value(found, &mut value)?;
            }
        }
        Ok(value)
    }

    fn resolve_length(&self, reference: ObjectRef) -> Option<usize> {
        self.get_object(reference)
            .ok()?
            .as_integer()
            .and_then(|n| usize::try_from(n).ok())
    }

    fn load_compressed(&self, reference: ObjectRef, stream_id: u32, index: u32) -> Result<PdfValue> {
        if self.encryption.is_locked() {
            return Err(Error::Locked);
        }
        if let Some(stm) = self.object_streams.borrow().get(&stream_id) {
            return stm.object(index as usize, reference.id, &self.options);
        }

        let container = self.get_object(ObjectRef::new(stream_id, 0))?;
        let PdfValue::Stream { dict, .. } = &container else {
            return Err(container.type_error("Stream"));
        };
        let decoded = self.decode_stream(&container)?;
        let stm = ObjectStream::parse(dict, decoded)?;
        let value = stm.object(index as usize, reference.id, &self.options)?;
        self.object_streams.borrow_mut().insert(stream_id, stm);
        Ok(value)
    }

    /// Decode a stream (or a reference to one) through its filter chain.
    ///
    /// Indirect `/Filter` and `/DecodeParms` entries are resolved first.
    pub fn decode_stream(&self, stream: &PdfValue) -> Result<Vec<u8>> {
        if self.encryption.is_locked() {
            return Err(Error::Locked);
        }
        let stream = self.resolve(stream)?;
        let PdfValue::Stream { dict, data } = &stream else {
            return Err(stream.type_error("Stream"));
        };
        let mut dict = dict.clone();
        for key in ["Filter", "DecodeParms", "DP"] {
            if let Some(value) = dict.get_mut(key) {
                *value = self.resolve(value)?;
                if let PdfValue::Array(items) = value {
                    for item in items.iter_mut() {
                        *item = self.resolve(item)?;
                    }
                }
            }
        }
        decode_data(data, &dict, &self.options)
    }

    /// Generation of an object as recorded in memory or in the xref.
    pub(crate) fn generation(&self, id: u32) -> u16 {
        if let Some((gen, _)) = self.modified.get(&id) {
            return *gen;
        }
        match self.xref.get(id) {
            Some(XRefEntry::InUse { gen, .. }) => *gen,
            _ => 0,
        }
    }

    // ========================================================================
    // Object mutation
    // ========================================================================

    /// Store a new indirect object and return its reference.
    pub fn add_object(&mut self, value: PdfValue) -> ObjectRef {
        let reference = self.reserve_ref();
        self.modified.insert(reference.id, (reference.gen, value));
        reference
    }

    fn reserve_ref(&mut self) -> ObjectRef {
        let id = self.next_id;
        self.next_id += 1;
        ObjectRef::new(id, 0)
    }

    /// Replace (or create) the object at `reference`.
    pub fn set_object(&mut self, reference: ObjectRef, value: PdfValue) {
        self.modified.insert(reference.id, (reference.gen, value));
        self.object_cache.get_mut().remove(&reference.id);
        *self.page_refs.get_mut() = None;
        self.next_id = self.next_id.max(reference.id + 1);
    }

    /// Copy every parseable object into memory so that later changes to the
    /// encryption state cannot affect how the source bytes are read.
    pub(crate) fn materialize(&mut self) -> Result<()> {
        let ids: Vec<u32> = self
            .xref
            .iter()
            .filter(|(id, entry)| entry.in_use() && !self.modified.contains_key(id))
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            let reference = ObjectRef::new(id, self.generation(id));
            match self.get_object(reference) {
                Ok(value) => {
                    self.modified.insert(id, (reference.gen, value));
                },
                Err(Error::Locked) => return Err(Error::Locked),
                Err(e) => log::warn!("Dropping unreadable object {}: {}", reference, e),
            }
        }
        self.clear_memo();
        Ok(())
    }

    /// Install a keyed handler that is applied when the document is written.
    /// Call [`Document::materialize`] first.
    pub(crate) fn seal(&mut self, handler: SecurityHandler, file_id: Vec<u8>) {
        let reference = self.add_object(PdfValue::Dictionary(handler.to_dictionary()));
        self.trailer.insert("Encrypt".to_string(), reference.into());
        self.trailer.insert(
            "ID".to_string(),
            PdfValue::Array(vec![PdfValue::string(file_id.clone()), PdfValue::string(file_id)]),
        );
        self.encrypt_ref = Some(reference);
        self.encryption = EncryptionState::Encrypted(handler);
    }

    /// Forget the encryption dictionary. Call [`Document::materialize`] first.
    pub(crate) fn strip_encryption(&mut self) {
        if let Some(reference) = self.encrypt_ref.take() {
            self.modified.remove(&reference.id);
        }
        self.trailer.shift_remove("Encrypt");
        self.encryption = EncryptionState::Unencrypted;
    }

    fn clear_memo(&mut self) {
        self.object_cache.get_mut().clear();
        self.object_streams.get_mut().clear();
        *self.page_refs.get_mut() = None;
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.encryption.is_locked() {
            return Err(Error::Locked);
        }
        Ok(())
    }

    // ========================================================================
    // Encryption
    // ========================================================================

    /// Unlock an encrypted document with the user or owner password.
    ///
    /// On a document that is already open, the password is still checked.
    /// Unencrypted documents accept any password.
    pub fn unlock(&mut self, password: &str) -> Result<()> {
        let handler = match &self.encryption {
            EncryptionState::Unencrypted => return Ok(()),
            EncryptionState::Decrypted(h) | EncryptionState::Encrypted(h) => h,
        };
        if handler.has_key() {
            return match handler.authenticate(password.as_bytes())? {
                Some(_) => Ok(()),
                None => Err(Error::IncorrectPassword),
            };
        }

        let mut handler = handler.clone();
        handler.unlock(password.as_bytes())?;
        log::info!("Document unlocked");
        self.encryption = EncryptionState::Decrypted(handler);
        self.clear_memo();
        Ok(())
    }

    // ========================================================================
    // Page tree
    // ========================================================================

    fn pages_root(&self) -> Result<ObjectRef> {
        let catalog = self.catalog()?;
        catalog
            .get("Pages")
            .and_then(|p| p.as_reference())
            .ok_or_else(|| Error::malformed("catalog has no indirect /Pages"))
    }

    fn page_refs(&self) -> Result<Vec<ObjectRef>> {
        if let Some(refs) = self.page_refs.borrow().as_ref() {
            return Ok(refs.clone());
        }
        let root = self.pages_root()?;
        let mut visited = HashSet::new();
        let mut refs = Vec::new();
        self.walk_page_tree(root, 0, &mut visited, &mut refs)?;
        *self.page_refs.borrow_mut() = Some(refs.clone());
        Ok(refs)
    }

    fn walk_page_tree(
        &self,
        node_ref: ObjectRef,
        depth: u32,
        visited: &mut HashSet<ObjectRef>,
        out: &mut Vec<ObjectRef>,
    ) -> Result<()> {
        if depth > self.options.max_recursion_depth {
            return Err(Error::RecursionLimitExceeded(self.options.max_recursion_depth));
        }
        if !visited.insert(node_ref) {
            return Err(Error::malformed(format!("cyclic page tree at {}", node_ref)));
        }

        let node = self.get_object(node_ref)?;
        let dict = node
            .as_dict()
            .ok_or_else(|| Error::malformed(format!("page tree node {} is a {}", node_ref, node.type_name())))?;

        let kind = dict.get("Type").and_then(|t| t.as_name());
        let is_pages = kind == Some("Pages") || (kind.is_none() && dict.contains_key("Kids"));
        if !is_pages {
            if kind != Some("Page") {
                if self.options.strict {
                    return Err(Error::malformed(format!("page tree leaf {} is not /Type /Page", node_ref)));
                }
                log::warn!("Treating page tree leaf {} without /Type /Page as a page", node_ref);
            }
            out.push(node_ref);
            return Ok(());
        }

        let kids = match dict.get("Kids") {
            Some(kids) => self.resolve(kids)?,
            None => PdfValue::Array(Vec::new()),
        };
        for kid in kids.as_array().map(|k| k.as_slice()).unwrap_or_default() {
            match kid.as_reference() {
                Some(kid_ref) => self.walk_page_tree(kid_ref, depth + 1, visited, out)?,
                None => log::warn!("Skipping direct object in /Kids of {}", node_ref),
            }
        }
        Ok(())
    }

    /// Page dictionary with inheritable attributes copied from its ancestors.
    fn page_dict(&self, reference: ObjectRef) -> Result<Dictionary> {
        let mut dict = self.resolve_dict(&reference.into())?;
        let mut parent = dict.get("Parent").and_then(|p| p.as_reference());
        let mut seen = HashSet::from([reference]);
        let mut depth = 0;

        while let Some(parent_ref) = parent {
            if !seen.insert(parent_ref) {
                return Err(Error::malformed(format!("cyclic page tree at {}", parent_ref)));
            }
            depth += 1;
            if depth > self.options.max_recursion_depth {
                return Err(Error::RecursionLimitExceeded(self.options.max_recursion_depth));
            }
            let node = match self.resolve_dict(&parent_ref.into()) {
                Ok(node) => node,
                Err(e) => {
                    log::warn!("Unreadable /Parent {} of page {}: {}", parent_ref, reference, e);
                    break;
                },
            };
            for key in INHERITABLE {
                if let Some(value) = node.get(key) {
                    dict.entry(key.to_string()).or_insert_with(|| value.clone());
                }
            }
            parent = node.get("Parent").and_then(|p| p.as_reference());
        }
        Ok(dict)
    }

    /// Number of pages.
    pub fn page_count(&self) -> Result<usize> {
        Ok(self.page_refs()?.len())
    }

    /// Page at a 0-based index.
    pub fn page(&self, index: usize) -> Result<Page> {
        let refs = self.page_refs()?;
        let reference = *refs.get(index).ok_or(Error::PageIndexOutOfRange {
            index,
            count: refs.len(),
        })?;
        Ok(Page {
            index,
            reference,
            dict: self.page_dict(reference)?,
        })
    }

    /// Iterate over all pages in order.
    pub fn pages(&self) -> Result<impl Iterator<Item = Result<Page>> + '_> {
        let refs = self.page_refs()?;
        Ok(refs.into_iter().enumerate().map(move |(index, reference)| {
            Ok(Page {
                index,
                reference,
                dict: self.page_dict(reference)?,
            })
        }))
    }

    /// Decoded and concatenated content streams of a page.
    pub fn page_contents(&self, page: &Page) -> Result<Vec<u8>> {
        let contents = match page.dict().get("Contents") {
            Some(contents) => self.resolve(contents)?,
            None => return Ok(Vec::new()),
        };
        let parts = match contents {
            PdfValue::Array(items) => items,
            stream @ PdfValue::Stream { .. } => vec![stream],
            PdfValue::Null => Vec::new(),
            other => return Err(other.type_error("Stream or Array")),
        };

        let mut out = Vec::new();
        for part in &parts {
            let decoded = self.decode_stream(part)?;
            out.extend_from_slice(&decoded);
            // separate operators split across streams
            out.push(b'\n');
        }
        Ok(out)
    }

    /// Insert a page at `position` (default: at the end).
    pub fn add_page(&mut self, page: Dictionary, position: Option<usize>) -> Result<ObjectRef> {
        self.ensure_unlocked()?;
        let reference = self.reserve_ref();
        self.insert_page(reference, page, position)?;
        Ok(reference)
    }

    fn insert_page(&mut self, reference: ObjectRef, mut page: Dictionary, position: Option<usize>) -> Result<()> {
        let mut refs = self.page_refs()?;
        let position = position.unwrap_or(refs.len());
        if position > refs.len() {
            return Err(Error::PageIndexOutOfRange {
                index: position,
                count: refs.len(),
            });
        }
        let root = self.pages_root()?;
        page.insert("Type".to_string(), PdfValue::name("Page"));
        page.insert("Parent".to_string(), root.into());
        self.set_object(reference, PdfValue::Dictionary(page));
        refs.insert(position, reference);
        self.rebuild_page_tree(refs)
    }

    /// Remove the page at a 0-based index.
    pub fn remove_page(&mut self, index: usize) -> Result<()> {
        self.ensure_unlocked()?;
        let mut refs = self.page_refs()?;
        if index >= refs.len() {
            return Err(Error::PageIndexOutOfRange {
                index,
                count: refs.len(),
            });
        }
        refs.remove(index);
        self.rebuild_page_tree(refs)
    }

    /// Replace the page tree with a single node listing `refs`, copying
    /// inherited attributes onto each page first.
    fn rebuild_page_tree(&mut self, refs: Vec<ObjectRef>) -> Result<()> {
        let root = self.pages_root()?;
        let mut pages = Vec::with_capacity(refs.len());
        for reference in &refs {
            let mut dict = self.page_dict(*reference)?;
            dict.insert("Parent".to_string(), root.into());
            pages.push((*reference, dict));
        }
        for (reference, dict) in pages {
            self.set_object(reference, PdfValue::Dictionary(dict));
        }

        let mut node = self.resolve_dict(&root.into())?;
        node.insert("Type".to_string(), PdfValue::name("Pages"));
        node.insert(
            "Kids".to_string(),
            PdfValue::Array(refs.iter().map(|r| PdfValue::Reference(*r)).collect()),
        );
        node.insert("Count".to_string(), PdfValue::Integer(refs.len() as i64));
        node.shift_remove("Parent");
        self.set_object(root, PdfValue::Dictionary(node));

        *self.page_refs.get_mut() = Some(refs);
        Ok(())
    }

    /// Replace the document information dictionary. An empty `info` removes it.
    pub fn set_info(&mut self, info: &DocumentInfo) -> Result<()> {
        self.ensure_unlocked()?;
        let dict = info.to_dictionary();
        if dict.is_empty() {
            self.trailer.shift_remove("Info");
            return Ok(());
        }
        match self.trailer.get("Info").and_then(|i| i.as_reference()) {
            Some(reference) => self.set_object(reference, PdfValue::Dictionary(dict)),
            None => {
                let reference = self.add_object(PdfValue::Dictionary(dict));
                self.trailer.insert("Info".to_string(), reference.into());
            },
        }
        Ok(())
    }

    /// Copy page `index` of `source` to the end of this document.
    ///
    /// Everything the page references is copied under fresh object numbers.
    /// References to other pages or page tree nodes become `null`, and
    /// dangling references are replaced by `null` with a warning.
    pub fn import_page(&mut self, source: &Document, index: usize) -> Result<ObjectRef> {
        if source.is_locked() {
            return Err(Error::Locked);
        }
        self.ensure_unlocked()?;

        let page = source.page(index)?;
        let new_page = self.reserve_ref();
        let mut mapping = HashMap::from([(page.reference, new_page)]);
        let mut queue = Vec::new();

        let mut dict = page.dict.clone();
        dict.shift_remove("Parent");
        let copied = self.remap(source, &PdfValue::Dictionary(dict), &mut mapping, &mut queue)?;

        while let Some((old, new)) = queue.pop() {
            let value = match source.get_object(old) {
                Ok(value) => self.remap(source, &value, &mut mapping, &mut queue)?,
                Err(Error::DanglingReference(r)) => {
                    log::warn!("Dangling reference {} on page {} replaced by null", r, page.number());
                    PdfValue::Null
                },
                Err(e) => return Err(e),
            };
            self.set_object(new, value);
        }

        let PdfValue::Dictionary(copied) = copied else {
            return Err(Error::malformed("page did not copy as a dictionary"));
        };
        self.insert_page(new_page, copied, None)?;
        Ok(new_page)
    }

    fn remap(
        &mut self,
        source: &Document,
        value: &PdfValue,
        mapping: &mut HashMap<ObjectRef, ObjectRef>,
        queue: &mut Vec<(ObjectRef, ObjectRef)>,
    ) -> Result<PdfValue> {
        Ok(match value {
            PdfValue::Reference(old) => {
                if let Some(new) = mapping.get(old) {
                    return Ok(PdfValue::Reference(*new));
                }
                let other_page = match source.get_object(*old) {
                    Ok(target) => matches!(target.dict_type(), Some("Page") | Some("Pages")),
                    Err(Error::DanglingReference(_)) => false,
                    Err(e) => return Err(e),
                };
                if other_page {
                    log::debug!("Reference {} to another page dropped", old);
                    return Ok(PdfValue::Null);
                }
                let new = self.reserve_ref();
                mapping.insert(*old, new);
                queue.push((*old, new));
                PdfValue::Reference(new)
            },
            PdfValue::Array(items) => PdfValue::Array(
                items
                    .iter()
                    .map(|item| self.remap(source, item, mapping, queue))
                    .collect::<Result<_>>()?,
            ),
            PdfValue::Dictionary(dict) => PdfValue::Dictionary(self.remap_dict(source, dict, mapping, queue)?),
            PdfValue::Stream { dict, data } => PdfValue::Stream {
                dict: self.remap_dict(source, dict, mapping, queue)?,
                data: data.clone(),
            },
            other => other.clone(),
        })
    }

    fn remap_dict(
        &mut self,
        source: &Document,
        dict: &Dictionary,
        mapping: &mut HashMap<ObjectRef, ObjectRef>,
        queue: &mut Vec<(ObjectRef, ObjectRef)>,
    ) -> Result<Dictionary> {
        let mut out = Dictionary::with_capacity(dict.len());
        for (key, value) in dict {
            out.insert(key.clone(), self.remap(source, value, mapping, queue)?);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("version", &self.version)
            .field("size", &self.data.len())
            .field("xref_entries", &self.xref.len())
            .field("modified", &self.modified.len())
            .field("encrypted", &self.encryption.is_encrypted())
            .finish_non_exhaustive()
    }
}

/// Offset of `%PDF-` and the version that follows it.
fn find_header(data: &[u8]) -> Option<(usize, (u8, u8))> {
    let window = &data[..data.len().min(HEADER_WINDOW)];
    let offset = window.windows(5).position(|w| w == b"%PDF-")?;
    let rest = &data[offset + 5..];
    let version = match rest {
        [major, b'.', minor, ..] if major.is_ascii_digit() && minor.is_ascii_digit() => {
            (major - b'0', minor - b'0')
        },
        _ => {
            log::warn!("Unreadable version after %PDF-; assuming 1.7");
            (1, 7)
        },
    };
    Some((offset, version))
}

fn into_malformed(err: Error) -> Error {
    match err {
        Error::MalformedDocument(_) => err,
        other => Error::MalformedDocument(other.to_string()),
    }
}
