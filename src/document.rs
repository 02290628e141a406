//! PDF document model.
//!
//! A [`Document`] wraps the byte source and the merged cross-reference
//! table. Indirect objects are parsed on first access and cached; repeated
//! resolution of the same reference returns the same [`Arc`]. Mutations go
//! into the same cache and are tracked as dirty so that the writer can emit
//! either a full file or an incremental update.
//!
//! Parent links in the page tree are stored as `/Parent` references, never
//! as owning pointers; cycles in the object graph are therefore harmless.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone};

use crate::decoders::{FilterPipeline, FilterSpec};
use crate::error::{Error, Result, Warning, WarningKind, WarningSink};
use crate::fonts::{FontProgram, PdfFont, TrueTypeProgram};
use crate::geometry::Rect;
use crate::object::{Dictionary, Object, ObjectRef, PdfString, Stream};
use crate::objstm::ObjectStream;
use crate::parser::{LengthResolver, Parser};
use crate::parser_config::ParserOptions;
use crate::source::ByteSource;
use crate::xref::{find_startxref, load_xref_chain, parse_windowed, CrossRefTable, XRefEntry};
use crate::xref_reconstruction::{reconstruct_xref, search_nearby_for_object};

/// Version written by documents created in memory.
pub const DEFAULT_VERSION: (u8, u8) = (1, 7);

/// Page attributes inherited from ancestor `/Pages` nodes.
const INHERITABLE: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// A page with inherited attributes applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Reference to the page object
    pub reference: ObjectRef,
    /// Zero-based position in document order
    pub index: usize,
    /// Page dictionary, with `/Resources`, `/MediaBox`, `/CropBox` and
    /// `/Rotate` filled in from ancestors when the page lacks them
    pub dict: Dictionary,
}

impl Page {
    /// The page's `/MediaBox`.
    pub fn media_box(&self) -> Option<Rect> {
        self.dict.get("MediaBox").and_then(Object::as_array).and_then(|a| Rect::from_array(a))
    }

    /// The page's `/CropBox`, defaulting to the media box.
    pub fn crop_box(&self) -> Option<Rect> {
        self.dict
            .get("CropBox")
            .and_then(Object::as_array)
            .and_then(|a| Rect::from_array(a))
            .or_else(|| self.media_box())
    }

    /// Rotation in degrees, normalized to 0, 90, 180 or 270.
    pub fn rotation(&self) -> i64 {
        let raw = self.dict.get_integer("Rotate").unwrap_or(0);
        (raw.rem_euclid(360) / 90) * 90
    }

    /// The page's `/Resources` entry, possibly a reference.
    pub fn resources(&self) -> Option<&Object> {
        self.dict.get("Resources")
    }

    /// The page's `/Contents` entry, possibly a reference or an array.
    pub fn contents(&self) -> Option<&Object> {
        self.dict.get("Contents")
    }
}

/// An open (or newly created) PDF document.
///
/// # Example
///
/// ```no_run
/// use pdf_ferrite::document::Document;
/// use pdf_ferrite::source::ByteSource;
///
/// let file = std::fs::File::open("sample.pdf")?;
/// let mut doc = Document::open(ByteSource::new(file)?)?;
/// println!("PDF version: {}.{}", doc.version().0, doc.version().1);
/// println!("Page count: {}", doc.page_count()?);
/// # Ok::<(), pdf_ferrite::error::Error>(())
/// ```
pub struct Document {
    /// Bytes of the file this document was read from
    source: Option<ByteSource>,
    /// PDF version (major, minor)
    version: (u8, u8),
    /// Merged cross-reference table
    xref: CrossRefTable,
    /// Trailer dictionary (without /Prev and /XRefStm)
    trailer: Dictionary,
    options: ParserOptions,
    pipeline: FilterPipeline,
    /// Loaded and modified objects
    cache: HashMap<ObjectRef, Arc<Object>>,
    /// Decoded object streams by object number
    object_streams: HashMap<u32, Arc<ObjectStream>>,
    /// Objects being resolved (cycle detection)
    resolving: HashSet<ObjectRef>,
    /// Current resolution depth
    depth: u32,
    /// Objects created or replaced since open
    dirty: BTreeSet<ObjectRef>,
    /// Objects deleted since open
    removed: BTreeSet<ObjectRef>,
    next_object_number: u32,
    warnings: Vec<Warning>,
    sink: Option<Box<dyn WarningSink>>,
    reconstructed: bool,
    /// Loaded fonts by font dictionary reference
    fonts: HashMap<ObjectRef, Arc<PdfFont>>,
    /// Embedded font program loader
    font_program: Arc<dyn FontProgram>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("version", &self.version)
            .field("xref_entries", &self.xref.len())
            .field("cached_objects", &self.cache.len())
            .field("dirty", &self.dirty.len())
            .field("warnings", &self.warnings.len())
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding a catalog and an empty page tree.
    pub fn new() -> Self {
        let mut doc = Self::with_xref(None, DEFAULT_VERSION, CrossRefTable::new(), ParserOptions::default());
        let pages = ObjectRef::new(1, 0);
        let catalog = ObjectRef::new(2, 0);
        doc.set_object(
            pages,
            crate::dict! { "Type" => "Pages", "Kids" => Vec::<Object>::new(), "Count" => 0 }.into(),
        );
        doc.set_object(catalog, crate::dict! { "Type" => "Catalog", "Pages" => pages }.into());
        doc.trailer.set("Root", catalog);
        doc
    }

    /// Open a document with default (lenient) options.
    pub fn open(source: ByteSource) -> Result<Self> {
        Self::open_with_options(source, ParserOptions::default())
    }

    /// Open an in-memory PDF.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Result<Self> {
        Self::open(ByteSource::from_bytes(data))
    }

    /// Open a document.
    ///
    /// 1. Reads the `%PDF-M.m` header.
    /// 2. Locates `startxref` and loads every xref section reachable
    ///    through `/Prev`.
    /// 3. If that fails, or the catalog cannot be read, rebuilds the table
    ///    by scanning the file (unless `options.strict`).
    ///
    /// # Errors
    ///
    /// Returns an error if the header is invalid, or if the xref cannot be
    /// loaded and reconstruction is disabled or also fails.
    pub fn open_with_options(mut source: ByteSource, options: ParserOptions) -> Result<Self> {
        let version = parse_header(&mut source)?;
        let mut warnings = Vec::new();

        let regular = find_startxref(&mut source)
            .and_then(|start| load_xref_chain(&mut source, start, &options, &mut warnings));
        let mut reconstructed = false;
        let xref = match regular {
            Ok(xref) if xref.trailer().contains_key("Root") => xref,
            other => {
                let failure = match other {
                    Ok(_) => Error::InvalidXref("trailer has no /Root".to_string()),
                    Err(e) => e,
                };
                if !options.allows_xref_recovery() {
                    return Err(failure);
                }
                log::warn!("Regular xref loading failed: {}, attempting reconstruction", failure);
                match reconstruct_xref(&mut source, &options, &mut warnings) {
                    Ok(xref) => {
                        reconstructed = true;
                        xref
                    },
                    Err(recon) => {
                        log::error!("XRef reconstruction also failed: {}", recon);
                        return Err(failure);
                    },
                }
            },
        };

        let mut document = Self::with_xref(Some(source), version, xref, options);
        document.reconstructed = reconstructed;
        for warning in warnings {
            document.report(warning);
        }

        // A table that parses but points at garbage is as bad as no table
        if !reconstructed && options.allows_xref_recovery() {
            if let Err(e) = document.catalog() {
                log::warn!("Catalog unreadable through the xref table ({}), attempting reconstruction", e);
                document.rebuild_xref()?;
            }
        }

        if document.trailer.contains_key("Encrypt") {
            document.report(Warning::new(
                WarningKind::Encrypted,
                "document is encrypted; strings and streams are returned as stored",
            ));
        }

        // PDF 1.4+: the catalog may raise the header version
        if let Ok(catalog) = document.catalog() {
            if let Some(v) = catalog.get_name("Version").and_then(parse_version) {
                if v > document.version {
                    document.version = v;
                }
            }
        }

        log::debug!("Opened document: {:?}", document);
        Ok(document)
    }

    fn with_xref(source: Option<ByteSource>, version: (u8, u8), xref: CrossRefTable, options: ParserOptions) -> Self {
        let trailer = xref.trailer().clone();
        let next_object_number = next_free_number(&xref, &trailer);
        Self {
            source,
            version,
            xref,
            trailer,
            options,
            pipeline: FilterPipeline::from_options(&options),
            cache: HashMap::new(),
            object_streams: HashMap::new(),
            resolving: HashSet::new(),
            depth: 0,
            dirty: BTreeSet::new(),
            removed: BTreeSet::new(),
            next_object_number,
            warnings: Vec::new(),
            sink: None,
            reconstructed: false,
            fonts: HashMap::new(),
            font_program: Arc::new(TrueTypeProgram),
        }
    }

    /// Replace the xref with one rebuilt by scanning the source.
    fn rebuild_xref(&mut self) -> Result<()> {
        let Some(source) = self.source.as_mut() else {
            return Ok(());
        };
        let mut found = Vec::new();
        match reconstruct_xref(source, &self.options, &mut found) {
            Ok(xref) => {
                self.trailer = xref.trailer().clone();
                self.next_object_number = next_free_number(&xref, &self.trailer);
                self.xref = xref;
                self.cache.clear();
                self.object_streams.clear();
                self.reconstructed = true;
                for warning in found {
                    self.report(warning);
                }
                Ok(())
            },
            Err(e) => {
                log::error!("XRef reconstruction failed: {}", e);
                Err(e)
            },
        }
    }

    /// PDF version (major, minor).
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// Set the version written by the next save.
    pub fn set_version(&mut self, version: (u8, u8)) {
        self.version = version;
    }

    /// Trailer dictionary.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Mutable trailer access. The trailer is always rewritten on save.
    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.trailer
    }

    /// Merged cross-reference table as read from the file.
    pub fn xref(&self) -> &CrossRefTable {
        &self.xref
    }

    /// True if the xref was rebuilt by scanning.
    pub fn is_reconstructed(&self) -> bool {
        self.reconstructed
    }

    /// True if the trailer names an `/Encrypt` dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.trailer.contains_key("Encrypt")
    }

    /// Options this document was opened with.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Change the options used from now on.
    pub fn set_options(&mut self, options: ParserOptions) {
        self.options = options;
    }

    /// Filter pipeline used for stream decoding.
    pub fn pipeline(&self) -> &FilterPipeline {
        &self.pipeline
    }

    /// Replace the filter pipeline, e.g. to install an image codec.
    pub fn set_pipeline(&mut self, pipeline: FilterPipeline) {
        self.pipeline = pipeline;
    }

    // ------------------------------------------------------------------
    // Warnings
    // ------------------------------------------------------------------

    /// Warnings recorded so far, oldest first, up to `max_warnings`.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Install a warning sink. Warnings recorded before installation are
    /// replayed into it.
    pub fn set_warning_sink(&mut self, mut sink: Box<dyn WarningSink>) {
        for warning in &self.warnings {
            sink.warn(warning);
        }
        self.sink = Some(sink);
    }

    /// Record a warning: log it, forward it to the sink, keep it in the log.
    pub fn report(&mut self, warning: Warning) {
        log::warn!("{}", warning);
        if let Some(sink) = self.sink.as_mut() {
            sink.warn(&warning);
        }
        if self.warnings.len() < self.options.max_warnings {
            self.warnings.push(warning);
        }
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Resolve an indirect object.
    ///
    /// Results are cached: resolving the same reference twice returns the
    /// same `Arc`. An object that depends on itself while loading (for
    /// example through an indirect `/Length`) resolves to `Null` with a
    /// [`WarningKind::ResolutionCycle`] warning.
    ///
    /// # Errors
    ///
    /// [`Error::ObjectNotFound`] if the xref has no entry for the object,
    /// [`Error::RecursionLimitExceeded`] past `max_recursion_depth`, or any
    /// parse error from the object's bytes.
    pub fn resolve(&mut self, reference: ObjectRef) -> Result<Arc<Object>> {
        if let Some(cached) = self.cache.get(&reference) {
            return Ok(Arc::clone(cached));
        }
        if self.removed.contains(&reference) {
            return Err(Error::ObjectNotFound(reference.id, reference.gen));
        }
        if self.resolving.contains(&reference) {
            self.report(Warning::new(
                WarningKind::ResolutionCycle,
                format!("object {} depends on itself; resolved as null", reference),
            ));
            return Ok(Arc::new(Object::Null));
        }
        if self.depth >= self.options.max_recursion_depth {
            log::error!(
                "Recursion depth limit exceeded ({}) while loading object {}",
                self.options.max_recursion_depth,
                reference
            );
            return Err(Error::RecursionLimitExceeded(self.options.max_recursion_depth));
        }

        log::trace!("Loading object {}", reference);
        self.resolving.insert(reference);
        self.depth += 1;
        let result = self.load(reference);
        self.depth -= 1;
        self.resolving.remove(&reference);

        let object = Arc::new(result?);
        self.cache.insert(reference, Arc::clone(&object));
        Ok(object)
    }

    /// Dereference `object` if it is a reference; clone it otherwise.
    pub fn resolve_object(&mut self, object: &Object) -> Result<Object> {
        match object {
            Object::Reference(r) => Ok((*self.resolve(*r)?).clone()),
            other => Ok(other.clone()),
        }
    }

    /// Resolve references inside `object` up to `max_depth` levels.
    /// References that fail to resolve are left in place.
    pub fn resolve_references(&mut self, object: &Object, max_depth: usize) -> Result<Object> {
        if max_depth == 0 {
            return Ok(object.clone());
        }
        match object {
            Object::Reference(r) => match self.resolve(*r) {
                Ok(resolved) => self.resolve_references(&resolved, max_depth - 1),
                Err(e) => {
                    log::warn!("Failed to resolve reference {}: {}", r, e);
                    Ok(object.clone())
                },
            },
            Object::Dictionary(dict) => {
                let mut resolved = Dictionary::new();
                for (key, value) in dict.iter() {
                    resolved.set(key.clone(), self.resolve_references(value, max_depth - 1)?);
                }
                Ok(Object::Dictionary(resolved))
            },
            Object::Array(items) => {
                let resolved: Result<Vec<Object>> = items
                    .iter()
                    .map(|item| self.resolve_references(item, max_depth - 1))
                    .collect();
                Ok(Object::Array(resolved?))
            },
            _ => Ok(object.clone()),
        }
    }

    fn load(&mut self, reference: ObjectRef) -> Result<Object> {
        match self.xref.get(reference.id).copied() {
            Some(XRefEntry::InUse { offset, generation }) => {
                if generation != reference.gen {
                    if self.options.strict {
                        return Err(Error::ObjectNotFound(reference.id, reference.gen));
                    }
                    log::debug!("Object {} requested, xref has generation {}", reference, generation);
                }
                self.load_uncompressed(reference, offset)
            },
            Some(XRefEntry::Compressed { stream, index }) => self.load_compressed(reference, stream, index),
            Some(XRefEntry::Free { .. }) | None => Err(Error::ObjectNotFound(reference.id, reference.gen)),
        }
    }

    /// Load an object stored at a byte offset. An offset that misses the
    /// header by a few bytes is corrected by searching nearby.
    fn load_uncompressed(&mut self, reference: ObjectRef, offset: u64) -> Result<Object> {
        match self.parse_object_at(reference, offset) {
            Ok(object) => Ok(object),
            Err(e) if self.options.allows_xref_recovery() => {
                let Some(source) = self.source.as_mut() else {
                    return Err(e);
                };
                match search_nearby_for_object(source, reference, offset)? {
                    Some(actual) if actual != offset => {
                        log::info!("Object {} found at {} instead of {}", reference, actual, offset);
                        self.parse_object_at(reference, actual)
                    },
                    _ => Err(e),
                }
            },
            Err(e) => Err(e),
        }
    }

    /// Parse `N G obj ... endobj` at `offset`.
    ///
    /// An indirect `/Length` cannot be resolved while the source is being
    /// read, so the first pass records the reference it needs, the length
    /// object is resolved, and the object is parsed again.
    fn parse_object_at(&mut self, reference: ObjectRef, offset: u64) -> Result<Object> {
        const MAX_PASSES: usize = 3;

        let options = self.options;
        let mut lengths: HashMap<ObjectRef, i64> = HashMap::new();

        for _ in 0..MAX_PASSES {
            let mut missing: Option<ObjectRef> = None;
            let (indirect, warnings) = {
                let source = self
                    .source
                    .as_mut()
                    .ok_or(Error::ObjectNotFound(reference.id, reference.gen))?;
                parse_windowed(source, offset, |data, at_eof| {
                    let mut known_length = |r: ObjectRef| match lengths.get(&r) {
                        Some(len) => Some(*len),
                        None => {
                            missing = Some(r);
                            None
                        },
                    };
                    let resolver: LengthResolver<'_> = &mut known_length;
                    let mut parser = Parser::with_base(data, offset as usize)
                        .with_options(options)
                        .with_file_end(at_eof);
                    let indirect = parser.parse_indirect_object(Some(resolver))?;
                    Ok((indirect, parser.take_warnings()))
                })?
            };

            if let Some(length_ref) = missing {
                if !lengths.contains_key(&length_ref) {
                    let len = match self.resolve(length_ref) {
                        Ok(obj) => obj.as_integer().unwrap_or(-1),
                        Err(e) => {
                            log::debug!("Indirect /Length {} unresolvable: {}", length_ref, e);
                            -1
                        },
                    };
                    lengths.insert(length_ref, len);
                    continue;
                }
            }

            if indirect.reference.id != reference.id {
                return Err(Error::Resolve(format!(
                    "expected object {} at offset {}, found {}",
                    reference, offset, indirect.reference
                )));
            }
            for warning in warnings {
                self.report(warning);
            }
            return Ok(indirect.object);
        }

        Err(Error::Resolve(format!("object {} needs too many /Length lookups", reference)))
    }

    /// Load an object packed in an object stream.
    fn load_compressed(&mut self, reference: ObjectRef, stream_number: u32, index: u32) -> Result<Object> {
        log::trace!("Object {} is in object stream {} at index {}", reference, stream_number, index);
        let objstm = self.object_stream(stream_number)?;
        match objstm.object_at(index as usize, &self.options) {
            Ok((num, object)) if num == reference.id => Ok(object),
            other => {
                if let Ok((num, _)) = other {
                    log::debug!("Object stream {} index {} holds {}, not {}", stream_number, index, num, reference.id);
                }
                // The header may still list the object at another position
                objstm
                    .get(reference.id, &self.options)
                    .unwrap_or(Err(Error::ObjectNotFound(reference.id, reference.gen)))
            },
        }
    }

    fn object_stream(&mut self, number: u32) -> Result<Arc<ObjectStream>> {
        if let Some(cached) = self.object_streams.get(&number) {
            return Ok(Arc::clone(cached));
        }
        let object = self.resolve(ObjectRef::new(number, 0))?;
        let stream = self.with_direct_filters(object.try_stream()?)?;
        let objstm = Arc::new(ObjectStream::parse(&stream, &self.pipeline)?);
        self.object_streams.insert(number, Arc::clone(&objstm));
        Ok(objstm)
    }

    // ------------------------------------------------------------------
    // Streams
    // ------------------------------------------------------------------

    /// Decode a stream's payload through its filter chain.
    ///
    /// Indirect `/Filter` and `/DecodeParms` values are resolved first. The
    /// result is memoized on the stream. Image streams whose filters fail
    /// part-way return the bytes decoded so far with a
    /// [`WarningKind::FilterTruncated`] warning; other filter failures
    /// propagate.
    pub fn decode_stream(&mut self, stream: &Stream) -> Result<Bytes> {
        if let Some(cached) = stream.cached_decoded() {
            return Ok(cached.clone());
        }
        let direct = self.with_direct_filters(stream)?;
        let outcome = self.pipeline.decode(direct.raw_data(), &direct.filters(), direct.is_image())?;
        if let Some(err) = outcome.truncated_by {
            self.report(Warning::new(
                WarningKind::FilterTruncated,
                format!("image stream truncated after {} bytes: {}", outcome.data.len(), err),
            ));
        }
        Ok(stream.remember_decoded(Bytes::from(outcome.data)))
    }

    /// Resolve `reference` and decode it as a stream.
    pub fn stream_data(&mut self, reference: ObjectRef) -> Result<Bytes> {
        let object = self.resolve(reference)?;
        self.decode_stream(object.try_stream()?)
    }

    /// The filter chain of `stream` with indirect values resolved.
    pub fn filter_chain(&mut self, stream: &Stream) -> Result<Vec<FilterSpec>> {
        Ok(self.with_direct_filters(stream)?.filters())
    }

    /// A copy of `stream` whose filter keys hold direct values.
    fn with_direct_filters(&mut self, stream: &Stream) -> Result<Stream> {
        const KEYS: [&str; 4] = ["Filter", "DecodeParms", "F", "DP"];
        let indirect = KEYS.iter().any(|k| match stream.dict.get(k) {
            Some(Object::Reference(_)) => true,
            Some(Object::Array(items)) => items.iter().any(|i| matches!(i, Object::Reference(_))),
            _ => false,
        });
        if !indirect {
            return Ok(stream.clone());
        }
        let mut dict = stream.dict.clone();
        for key in KEYS {
            let Some(value) = dict.get(key).cloned() else { continue };
            let value = match self.resolve_object(&value)? {
                Object::Array(items) => Object::Array(
                    items
                        .iter()
                        .map(|i| self.resolve_object(i))
                        .collect::<Result<Vec<_>>>()?,
                ),
                other => other,
            };
            dict.set(key, value);
        }
        Ok(Stream::from_parts(dict, stream.raw_data().clone()))
    }

    // ------------------------------------------------------------------
    // Catalog, info and pages
    // ------------------------------------------------------------------

    /// The document catalog (`/Root`).
    pub fn catalog(&mut self) -> Result<Dictionary> {
        let root = self
            .trailer
            .get("Root")
            .and_then(Object::as_reference)
            .ok_or_else(|| Error::Resolve("trailer has no /Root reference".to_string()))?;
        let object = self.resolve(root)?;
        Ok(object.try_dict()?.clone())
    }

    /// The document information dictionary (`/Info`), if any.
    pub fn info(&mut self) -> Result<Option<Dictionary>> {
        let Some(info) = self.trailer.get("Info").cloned() else {
            return Ok(None);
        };
        Ok(self.resolve_object(&info)?.as_dict().cloned())
    }

    /// Set a key in the information dictionary, creating it if needed.
    pub fn set_info(&mut self, key: &str, value: impl Into<Object>) -> Result<()> {
        match self.trailer.get("Info").and_then(Object::as_reference) {
            Some(info_ref) => self.set(info_ref, key, value.into()),
            None => {
                let mut info = Dictionary::new();
                info.set(key, value.into());
                let info_ref = self.add_object(info.into())?;
                self.trailer.set("Info", info_ref);
                Ok(())
            },
        }
    }

    /// Write `/ModDate` in `D:YYYYMMDDHHmmSSOHH'mm'` form.
    pub fn set_modification_date<Tz: TimeZone>(&mut self, when: &DateTime<Tz>) -> Result<()> {
        self.set_info("ModDate", PdfString::literal(format_pdf_date(when).into_bytes()))
    }

    /// Decode a PDF text string, resolving a reference first.
    ///
    /// Returns `None` for non-string objects.
    pub fn text_string(&mut self, object: &Object) -> Result<Option<String>> {
        Ok(self.resolve_object(object)?.as_string().map(PdfString::to_text))
    }

    /// All pages in document order.
    ///
    /// Walks `/Root/Pages`, applying inherited attributes. A `/Kids` entry
    /// that leads back to a node already visited is skipped with a warning.
    pub fn pages(&mut self) -> Result<Vec<Page>> {
        let root = self.pages_root()?;
        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        self.collect_pages(root, &Dictionary::new(), &mut visited, &mut pages, 0)?;
        Ok(pages)
    }

    /// Page `index` (zero-based).
    pub fn page(&mut self, index: usize) -> Result<Page> {
        let mut pages = self.pages()?;
        let count = pages.len();
        if index >= count {
            return Err(Error::Resolve(format!("page {} out of range ({} pages)", index, count)));
        }
        Ok(pages.swap_remove(index))
    }

    /// Number of pages reachable through the page tree.
    pub fn page_count(&mut self) -> Result<usize> {
        Ok(self.pages()?.len())
    }

    fn pages_root(&mut self) -> Result<ObjectRef> {
        self.catalog()?
            .get("Pages")
            .and_then(Object::as_reference)
            .ok_or_else(|| Error::Resolve("catalog has no /Pages reference".to_string()))
    }

    fn collect_pages(
        &mut self,
        node_ref: ObjectRef,
        inherited: &Dictionary,
        visited: &mut HashSet<ObjectRef>,
        out: &mut Vec<Page>,
        depth: usize,
    ) -> Result<()> {
        if !visited.insert(node_ref) {
            self.report(Warning::new(
                WarningKind::Other,
                format!("page tree revisits {}; skipping", node_ref),
            ));
            return Ok(());
        }
        if depth > self.options.max_nesting {
            return Err(Error::RecursionLimitExceeded(depth as u32));
        }

        let node = self.resolve(node_ref)?;
        let mut dict = node.try_dict()?.clone();
        for key in INHERITABLE {
            if let Some(value @ Object::Reference(_)) = dict.get(key).cloned() {
                dict.set(key, self.resolve_object(&value)?);
            }
        }

        let is_tree_node = dict.has_type("Pages") || (!dict.has_type("Page") && dict.contains_key("Kids"));
        if is_tree_node {
            let mut inherit = inherited.clone();
            for key in INHERITABLE {
                if let Some(value) = dict.get(key) {
                    inherit.set(key, value.clone());
                }
            }
            let kids = match dict.get("Kids") {
                Some(kids) => self.resolve_object(kids)?,
                None => Object::Null,
            };
            for kid in kids.as_array().map(Vec::as_slice).unwrap_or_default() {
                match kid.as_reference() {
                    Some(kid_ref) => self.collect_pages(kid_ref, &inherit, visited, out, depth + 1)?,
                    None => log::warn!("Ignoring direct object in /Kids of {}", node_ref),
                }
            }
        } else {
            for (key, value) in inherited.iter() {
                if dict.get_by_name(key).is_none() {
                    dict.set(key.clone(), value.clone());
                }
            }
            out.push(Page {
                reference: node_ref,
                index: out.len(),
                dict,
            });
        }
        Ok(())
    }

    /// The page's resource dictionary, resolved.
    pub fn page_resources(&mut self, page: &Page) -> Result<Dictionary> {
        match page.resources() {
            Some(res) => Ok(self.resolve_object(res)?.as_dict().cloned().unwrap_or_default()),
            None => Ok(Dictionary::new()),
        }
    }

    /// The page's decoded content, concatenating `/Contents` arrays with a
    /// newline between parts.
    pub fn page_contents(&mut self, page: &Page) -> Result<Vec<u8>> {
        let Some(contents) = page.contents().cloned() else {
            return Ok(Vec::new());
        };
        let parts = match self.resolve_object(&contents)? {
            Object::Array(items) => items,
            Object::Stream(_) => vec![contents],
            Object::Null => Vec::new(),
            other => {
                return Err(Error::InvalidObjectType {
                    expected: "Stream or Array".to_string(),
                    found: other.type_name().to_string(),
                })
            },
        };

        let mut data = Vec::new();
        for (i, part) in parts.iter().enumerate() {
            let stream = match part {
                Object::Reference(r) => self.resolve(*r)?,
                direct => Arc::new(direct.clone()),
            };
            let Some(stream) = stream.as_stream() else {
                log::warn!("Skipping non-stream /Contents element {} on page {}", i, page.index);
                continue;
            };
            if i > 0 {
                data.push(b'\n');
            }
            data.extend_from_slice(&self.decode_stream(stream)?);
        }
        Ok(data)
    }

    // ------------------------------------------------------------------
    // Fonts
    // ------------------------------------------------------------------

    /// Replace the loader used for embedded font programs. Fonts loaded
    /// so far are dropped.
    pub fn set_font_program(&mut self, program: Arc<dyn FontProgram>) {
        self.fonts.clear();
        self.font_program = program;
    }

    /// Load the font described by `font`, a font dictionary or a reference
    /// to one. Fonts reached through a reference are loaded once per
    /// document; the registry is cleared whenever an object changes.
    pub fn load_font(&mut self, font: &Object) -> Result<Arc<PdfFont>> {
        let reference = font.as_reference();
        if let Some(cached) = reference.and_then(|r| self.fonts.get(&r)) {
            return Ok(Arc::clone(cached));
        }
        let program = Arc::clone(&self.font_program);
        let loaded = Arc::new(PdfFont::load(self, font, program.as_ref())?);
        if let Some(r) = reference {
            log::debug!("Loaded font {} ({})", r, loaded.base_font());
            self.fonts.insert(r, Arc::clone(&loaded));
        }
        Ok(loaded)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// True if `reference` names a live object.
    pub fn contains(&self, reference: ObjectRef) -> bool {
        if self.removed.contains(&reference) {
            return false;
        }
        self.cache.contains_key(&reference)
            || self.xref.get(reference.id).is_some_and(|e| e.is_in_use() && e.generation() == reference.gen)
    }

    /// Store `object` under `reference`, replacing any previous value.
    pub fn set_object(&mut self, reference: ObjectRef, object: Object) {
        self.fonts.clear();
        self.removed.remove(&reference);
        self.cache.insert(reference, Arc::new(object));
        self.dirty.insert(reference);
        self.next_object_number = self.next_object_number.max(reference.id.saturating_add(1));
    }

    /// Add a new object under the next free object number.
    ///
    /// Fails once the largest object number is taken.
    pub fn add_object(&mut self, object: Object) -> Result<ObjectRef> {
        let reference = ObjectRef::new(self.next_object_number, 0);
        if self.contains(reference) {
            return Err(Error::Resolve(format!(
                "no free object number after {}",
                reference.id
            )));
        }
        self.set_object(reference, object);
        Ok(reference)
    }

    /// Delete an object. Its number becomes a free xref entry on save.
    pub fn remove_object(&mut self, reference: ObjectRef) -> Result<()> {
        if !self.contains(reference) {
            return Err(Error::ObjectNotFound(reference.id, reference.gen));
        }
        self.fonts.clear();
        self.cache.remove(&reference);
        self.dirty.remove(&reference);
        self.removed.insert(reference);
        Ok(())
    }

    /// Set `key` in the dictionary (or stream dictionary) `target`.
    ///
    /// Well-known keys are type-checked: `/Type` must be a name, `/Kids` an
    /// array, `/Parent` a reference, and so on. Setting `/Kids` points each
    /// kid's `/Parent` back at `target`.
    pub fn set(&mut self, target: ObjectRef, key: &str, value: Object) -> Result<()> {
        check_key_type(key, &value)?;
        let mut object = (*self.resolve(target)?).clone();
        dict_of_mut(&mut object)?.set(key, value.clone());
        self.set_object(target, object);

        if key == "Kids" {
            for kid in value.as_array().map(Vec::as_slice).unwrap_or_default() {
                if let Some(kid_ref) = kid.as_reference() {
                    self.set_parent(kid_ref, target)?;
                }
            }
        }
        Ok(())
    }

    /// Append `value` to the array at `key` in `target`, creating the array
    /// if absent. Appending a page or page-tree node to `/Kids` sets its
    /// `/Parent` and adds its leaf count to `/Count` up the tree.
    pub fn append(&mut self, target: ObjectRef, key: &str, value: Object) -> Result<()> {
        let mut object = (*self.resolve(target)?).clone();
        let dict = dict_of_mut(&mut object)?;
        match dict.get_mut(key) {
            Some(Object::Array(items)) => items.push(value.clone()),
            Some(other) => {
                return Err(Error::InvalidObjectType {
                    expected: "Array".to_string(),
                    found: other.type_name().to_string(),
                })
            },
            None => {
                dict.set(key, Object::Array(vec![value.clone()]));
            },
        }
        self.set_object(target, object);

        if key == "Kids" {
            if let Some(child) = value.as_reference() {
                self.set_parent(child, target)?;
                let leaves = self.leaf_count(child)?;
                self.adjust_page_count(target, leaves)?;
            }
        }
        Ok(())
    }

    /// Remove `key` from `target`, returning the old value.
    pub fn remove(&mut self, target: ObjectRef, key: &str) -> Result<Option<Object>> {
        let mut object = (*self.resolve(target)?).clone();
        let old = dict_of_mut(&mut object)?.remove(key);
        if old.is_some() {
            self.set_object(target, object);
        }
        Ok(old)
    }

    fn set_parent(&mut self, child: ObjectRef, parent: ObjectRef) -> Result<()> {
        let mut object = (*self.resolve(child)?).clone();
        dict_of_mut(&mut object)?.set("Parent", parent);
        self.set_object(child, object);
        Ok(())
    }

    fn leaf_count(&mut self, node: ObjectRef) -> Result<i64> {
        let object = self.resolve(node)?;
        let dict = object.try_dict()?;
        Ok(if dict.has_type("Pages") {
            dict.get_integer("Count").unwrap_or(0)
        } else {
            1
        })
    }

    /// Add `delta` to `/Count` of `node` and all its ancestors.
    fn adjust_page_count(&mut self, node: ObjectRef, delta: i64) -> Result<()> {
        let mut visited = HashSet::new();
        let mut current = Some(node);
        while let Some(node_ref) = current.take() {
            if !visited.insert(node_ref) {
                break;
            }
            let mut object = (*self.resolve(node_ref)?).clone();
            let dict = dict_of_mut(&mut object)?;
            let count = dict.get_integer("Count").unwrap_or(0);
            dict.set("Count", count + delta);
            current = dict.get("Parent").and_then(Object::as_reference);
            self.set_object(node_ref, object);
        }
        Ok(())
    }

    /// Append a page under `/Root/Pages`.
    pub fn add_page(&mut self, media_box: Rect, resources: Dictionary, content: &[u8]) -> Result<ObjectRef> {
        let pages_root = self.pages_root()?;
        let contents = self.add_object(Stream::new(Dictionary::new(), content.to_vec()).into())?;
        let page = self.add_object(
            crate::dict! {
                "Type" => "Page",
                "Parent" => pages_root,
                "MediaBox" => media_box.to_array(),
                "Resources" => resources,
                "Contents" => contents,
            }
            .into(),
        )?;
        self.append(pages_root, "Kids", Object::Reference(page))?;
        Ok(page)
    }

    /// Objects created or replaced since open, in object-number order.
    pub fn dirty_objects(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.dirty.iter().copied()
    }

    /// True if `reference` was created or replaced since open.
    pub fn is_dirty(&self, reference: ObjectRef) -> bool {
        self.dirty.contains(&reference)
    }

    /// Objects deleted since open.
    pub fn removed_objects(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.removed.iter().copied()
    }

    /// Forget dirty state, e.g. after an incremental save.
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
        self.removed.clear();
    }

    /// Every live object reference, in object-number order.
    pub fn object_refs(&self) -> Vec<ObjectRef> {
        let mut refs: BTreeSet<ObjectRef> = self
            .xref
            .iter()
            .filter(|(_, e)| e.is_in_use())
            .map(|(num, e)| ObjectRef::new(num, e.generation()))
            .collect();
        refs.extend(self.dirty.iter().copied());
        refs.retain(|r| r.id != 0 && !self.removed.contains(r));
        refs.into_iter().collect()
    }

    /// Next object number `add_object` will use.
    pub fn next_object_number(&self) -> u32 {
        self.next_object_number
    }

    /// The complete bytes of the file this document was opened from.
    pub fn source_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        match self.source.as_mut() {
            Some(source) => Ok(Some(source.read_all()?)),
            None => Ok(None),
        }
    }
}

fn next_free_number(xref: &CrossRefTable, trailer: &Dictionary) -> u32 {
    let from_size = trailer
        .get_integer("Size")
        .filter(|s| (1..=u32::MAX as i64).contains(s))
        .unwrap_or(1) as u32;
    from_size.max(xref.max_object_number().saturating_add(1)).max(1)
}

fn dict_of_mut(object: &mut Object) -> Result<&mut Dictionary> {
    match object {
        Object::Dictionary(dict) => Ok(dict),
        Object::Stream(stream) => Ok(&mut stream.dict),
        other => Err(Error::InvalidObjectType {
            expected: "Dictionary".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

/// Type constraints on well-known dictionary keys.
fn check_key_type(key: &str, value: &Object) -> Result<()> {
    let ok = match key {
        "Parent" => matches!(value, Object::Reference(_)),
        _ if matches!(value, Object::Reference(_)) => true,
        "Type" | "Subtype" | "BaseFont" => matches!(value, Object::Name(_)),
        "Kids" | "Annots" | "Widths" => matches!(value, Object::Array(_)),
        "MediaBox" | "CropBox" | "BBox" => value.as_array().and_then(|a| Rect::from_array(a)).is_some(),
        "Count" | "Length" | "Size" => matches!(value, Object::Integer(n) if *n >= 0),
        "Rotate" => matches!(value, Object::Integer(n) if n % 90 == 0),
        "Resources" => matches!(value, Object::Dictionary(_)),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        let expected = match key {
            "Parent" => "Reference",
            "Type" | "Subtype" | "BaseFont" => "Name",
            "Kids" | "Annots" | "Widths" => "Array",
            "MediaBox" | "CropBox" | "BBox" => "Array of 4 numbers",
            "Count" | "Length" | "Size" => "non-negative Integer",
            "Rotate" => "Integer multiple of 90",
            _ => "Dictionary",
        };
        Err(Error::InvalidObjectType {
            expected: format!("{} for /{}", expected, key),
            found: value.type_name().to_string(),
        })
    }
}

/// Parse a `M.m` version string.
fn parse_version(s: &str) -> Option<(u8, u8)> {
    let (major, minor) = s.split_once('.')?;
    Some((major.trim().parse().ok()?, minor.trim().parse().ok()?))
}

/// Parse the `%PDF-M.m` header.
///
/// The header may be preceded by up to 1024 bytes of garbage.
///
/// # Example
///
/// ```
/// use pdf_ferrite::document::parse_header;
/// use pdf_ferrite::source::ByteSource;
///
/// let mut src = ByteSource::from_bytes(b"%PDF-1.7\n".to_vec());
/// assert_eq!(parse_header(&mut src).unwrap(), (1, 7));
/// ```
pub fn parse_header(source: &mut ByteSource) -> Result<(u8, u8)> {
    let head = source.read_window(0, 1024)?;
    let start = head
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| Error::InvalidHeader(String::from_utf8_lossy(&head[..head.len().min(8)]).into_owned()))?;
    if start > 0 {
        log::warn!("{} bytes of garbage before the PDF header", start);
    }

    let version = &head[start + 5..];
    match version {
        [major, b'.', minor, ..] if major.is_ascii_digit() && minor.is_ascii_digit() => {
            let v = (major - b'0', minor - b'0');
            if v.0 == 0 || v.0 > 2 {
                return Err(Error::InvalidHeader(format!("%PDF-{}.{}", v.0, v.1)));
            }
            Ok(v)
        },
        _ => Err(Error::InvalidHeader(
            String::from_utf8_lossy(&head[start..head.len().min(start + 8)]).into_owned(),
        )),
    }
}

/// Format a date as a PDF date string, `D:YYYYMMDDHHmmSSOHH'mm'`.
///
/// ```
/// use chrono::{FixedOffset, TimeZone};
/// use pdf_ferrite::document::format_pdf_date;
///
/// let tz = FixedOffset::west_opt(5 * 3600).unwrap();
/// let when = tz.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
/// assert_eq!(format_pdf_date(&when), "D:20240309140500-05'00'");
/// ```
pub fn format_pdf_date<Tz: TimeZone>(when: &DateTime<Tz>) -> String {
    let offset = when.offset().fix().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let minutes = offset.abs() / 60;
    format!(
        "D:{}{}{:02}'{:02}'",
        when.naive_local().format("%Y%m%d%H%M%S"),
        sign,
        minutes / 60,
        minutes % 60
    )
}

/// Parse a PDF date string. Missing trailing fields take their defaults
/// (month and day 1, time 00:00:00, UTC).
pub fn parse_pdf_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.strip_prefix("D:").unwrap_or(s);
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    let field = |from: usize, len: usize, default: u32| -> u32 {
        digits.get(from..from + len).and_then(|f| f.parse().ok()).unwrap_or(default)
    };
    let year = digits[..4].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, field(4, 2, 1), field(6, 2, 1))?;
    let time = date.and_hms_opt(field(8, 2, 0), field(10, 2, 0), field(12, 2, 0))?;

    let rest = &s[digits.len()..];
    let offset_secs = match rest.chars().next() {
        Some(sign @ ('+' | '-')) => {
            let tz: String = rest[1..].chars().filter(|c| c.is_ascii_digit()).collect();
            let hours: i32 = tz.get(0..2).and_then(|h| h.parse().ok()).unwrap_or(0);
            let minutes: i32 = tz.get(2..4).and_then(|m| m.parse().ok()).unwrap_or(0);
            let secs = hours * 3600 + minutes * 60;
            if sign == '-' {
                -secs
            } else {
                secs
            }
        },
        _ => 0,
    };
    FixedOffset::east_opt(offset_secs)?.from_local_datetime(&time).single()
}
