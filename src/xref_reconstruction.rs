//! Cross-reference table reconstruction for damaged PDFs.
//!
//! When `startxref` points nowhere useful or the xref sections cannot be
//! parsed, the whole file is scanned for `N G obj` headers and a table is
//! rebuilt from the offsets found. Objects packed in object streams are
//! recovered by reading the streams the scan turns up.
//!
//! This is a fallback used only when regular xref loading fails, and never
//! in strict mode.

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::decoders::FilterPipeline;
use crate::error::{Error, Result, Warning, WarningKind};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::objstm::ObjectStream;
use crate::parser::Parser;
use crate::parser_config::ParserOptions;
use crate::source::ByteSource;
use crate::xref::{CrossRefTable, XRefEntry};

lazy_static! {
    /// "N G obj" object headers
    static ref RE_OBJ_PATTERN: Regex = Regex::new(r"(\d{1,10})[ \t\r\n\f\x00]+(\d{1,5})[ \t\r\n\f\x00]+obj")
        .unwrap();

    /// "trailer <<"
    static ref RE_TRAILER: Regex = Regex::new(r"trailer[ \t\r\n\f\x00]*<<").unwrap();
}

/// Trailer keys that only make sense for the section they came from.
const SECTION_KEYS: [&str; 9] = ["Prev", "XRefStm", "Type", "W", "Index", "Length", "Filter", "DecodeParms", "N"];

/// Rebuild the cross-reference table by scanning every byte of `src`.
///
/// Later headers for the same object number win, matching the way
/// incremental updates append newer definitions. The trailer is taken from
/// the last `trailer` dictionary in the file, or from the last xref stream;
/// when neither names a usable `/Root`, the first `/Type /Catalog` object
/// found becomes the root.
///
/// A [`WarningKind::RecoveredXref`] warning records the reconstruction.
///
/// # Errors
///
/// Fails if no object headers are found or no catalog can be identified.
pub fn reconstruct_xref(
    src: &mut ByteSource,
    options: &ParserOptions,
    warnings: &mut Vec<Warning>,
) -> Result<CrossRefTable> {
    log::info!("Reconstructing xref table by scanning {} bytes", src.length());
    let contents = src.read_all()?;

    let mut xref = CrossRefTable::new();
    let mut headers = 0usize;
    for (num, gen, offset) in scan_object_headers(&contents) {
        xref.add_entry(
            num,
            XRefEntry::InUse {
                offset: offset as u64,
                generation: gen,
            },
        );
        headers += 1;
    }

    if headers == 0 {
        return Err(Error::InvalidXref("no objects found during xref reconstruction".to_string()));
    }
    log::debug!("Found {} object headers ({} distinct objects)", headers, xref.len());

    let scan = inspect_objects(&contents, &xref, options);
    for (stream_num, objstm) in &scan.object_streams {
        for index in 0..objstm.len() {
            let Some(num) = objstm.object_number(index) else { continue };
            // A direct definition found by the scan wins over a packed one
            if !xref.contains(num) {
                xref.add_entry(
                    num,
                    XRefEntry::Compressed {
                        stream: *stream_num,
                        index: index as u32,
                    },
                );
            }
        }
    }

    let mut trailer = find_trailer(&contents, options)
        .or_else(|| scan.xref_stream_dict.clone())
        .unwrap_or_default();
    for key in SECTION_KEYS {
        trailer.remove(key);
    }

    let root_usable = trailer
        .get("Root")
        .and_then(Object::as_reference)
        .is_some_and(|r| xref.get(r.id).is_some_and(XRefEntry::is_in_use));
    if !root_usable {
        let catalog = scan
            .catalog
            .ok_or_else(|| Error::InvalidXref("could not find catalog in reconstructed xref".to_string()))?;
        log::info!("Using catalog {} found by scanning", catalog);
        trailer.set("Root", Object::Reference(catalog));
    }
    if trailer.get("Info").is_none() {
        if let Some(info) = scan.info {
            trailer.set("Info", Object::Reference(info));
        }
    }
    trailer.set("Size", Object::Integer(xref.max_object_number() as i64 + 1));
    xref.set_trailer(trailer);

    let warning = Warning::new(
        WarningKind::RecoveredXref,
        format!("cross-reference table rebuilt by scanning: {} objects", xref.len()),
    );
    warnings.push(warning);

    Ok(xref)
}

/// Yield `(object number, generation, offset)` for each plausible header.
fn scan_object_headers(contents: &[u8]) -> impl Iterator<Item = (u32, u16, usize)> + '_ {
    RE_OBJ_PATTERN.captures_iter(contents).filter_map(move |capture| {
        let full = capture.get(0)?;
        let offset = full.start();

        // "10 0 obj" must not be read as "0 0 obj" inside a longer number
        if offset > 0 && !is_boundary(contents[offset - 1]) {
            return None;
        }
        let num: u32 = std::str::from_utf8(capture.get(1)?.as_bytes()).ok()?.parse().ok()?;
        let gen: u16 = std::str::from_utf8(capture.get(2)?.as_bytes()).ok()?.parse().ok()?;

        // "obj" must end the keyword and be followed by something that can
        // start an object, otherwise this is text inside a string or comment
        let rest = &contents[full.end()..];
        let next = rest.iter().copied().find(|b| !crate::lexer::is_whitespace(*b));
        let valid = match rest.first() {
            Some(b) if crate::lexer::is_regular(*b) => false,
            _ => next.map_or(true, |b| {
                matches!(b, b'<' | b'[' | b'(' | b'/' | b't' | b'f' | b'n' | b'e' | b'-' | b'+' | b'.')
                    || b.is_ascii_digit()
            }),
        };
        if !valid {
            log::debug!("Skipping false positive object header at offset {}", offset);
            return None;
        }
        Some((num, gen, offset))
    })
}

fn is_boundary(b: u8) -> bool {
    crate::lexer::is_whitespace(b) || crate::lexer::is_delimiter(b)
}

/// Objects of interest found while re-reading the scanned headers.
#[derive(Default)]
struct ScanResult {
    catalog: Option<ObjectRef>,
    info: Option<ObjectRef>,
    xref_stream_dict: Option<Dictionary>,
    object_streams: Vec<(u32, ObjectStream)>,
}

/// Parse every scanned object once, looking for the catalog, an info
/// dictionary, xref streams and object streams.
fn inspect_objects(contents: &[u8], xref: &CrossRefTable, options: &ParserOptions) -> ScanResult {
    let pipeline = FilterPipeline::from_options(options);
    let mut result = ScanResult::default();

    for (num, entry) in xref.iter() {
        let XRefEntry::InUse { offset, .. } = *entry else { continue };
        let Some(data) = contents.get(offset as usize..) else { continue };
        let mut parser = Parser::with_base(data, offset as usize).with_options(*options);
        let indirect = match parser.parse_indirect_object(None) {
            Ok(indirect) => indirect,
            Err(e) => {
                log::debug!("Object {} at {} unreadable during scan: {}", num, offset, e);
                continue;
            },
        };

        match &indirect.object {
            Object::Dictionary(dict) => {
                if dict.has_type("Catalog") && result.catalog.is_none() {
                    result.catalog = Some(indirect.reference);
                } else if is_info_dict(dict) {
                    result.info = Some(indirect.reference);
                }
            },
            Object::Stream(stream) if stream.dict.has_type("XRef") => {
                // Later xref streams are newer
                result.xref_stream_dict = Some(stream.dict.clone());
            },
            Object::Stream(stream) if stream.dict.has_type("ObjStm") => match ObjectStream::parse(stream, &pipeline) {
                Ok(objstm) => {
                    for index in 0..objstm.len() {
                        if result.catalog.is_some() {
                            break;
                        }
                        if let Ok((packed, Object::Dictionary(d))) = objstm.object_at(index, options) {
                            if d.has_type("Catalog") {
                                result.catalog = Some(ObjectRef::new(packed, 0));
                            }
                        }
                    }
                    result.object_streams.push((num, objstm));
                },
                Err(e) => log::debug!("Object stream {} unreadable during scan: {}", num, e),
            },
            _ => {},
        }
    }
    result
}

fn is_info_dict(dict: &Dictionary) -> bool {
    ["Producer", "Creator", "CreationDate", "ModDate", "Title", "Author"]
        .iter()
        .any(|k| dict.get(k).is_some())
        && dict.get("Type").is_none()
}

/// Parse the dictionary after the last `trailer` keyword that yields one.
fn find_trailer(contents: &[u8], options: &ParserOptions) -> Option<Dictionary> {
    let starts: Vec<usize> = RE_TRAILER.find_iter(contents).map(|m| m.start()).collect();
    for start in starts.into_iter().rev() {
        let dict_start = start + "trailer".len();
        let mut parser = Parser::with_base(&contents[dict_start..], dict_start).with_options(*options);
        match parser.parse_object() {
            Ok(Object::Dictionary(dict)) => {
                log::debug!("Recovered trailer dictionary at offset {}", start);
                return Some(dict);
            },
            Ok(other) => log::debug!("'trailer' at {} followed by {}", start, other.type_name()),
            Err(e) => log::debug!("Failed to parse trailer at {}: {}", start, e),
        }
    }
    None
}

/// Search around `approx_offset` for the header of `reference`.
///
/// Used when an xref entry is off by a few bytes. The window reaches 1 KB on
/// either side; the header closest to `approx_offset` wins.
pub fn search_nearby_for_object(
    src: &mut ByteSource,
    reference: ObjectRef,
    approx_offset: u64,
) -> Result<Option<u64>> {
    const SEARCH_RANGE: u64 = 1024;

    let start = approx_offset.saturating_sub(SEARCH_RANGE);
    let buffer = src.read_window(start, (SEARCH_RANGE * 2) as usize)?;
    let pattern = format!(r"(^|[^0-9]){}[ \t\r\n\f\x00]+{}[ \t\r\n\f\x00]+obj", reference.id, reference.gen);
    let re = Regex::new(&pattern).map_err(|e| Error::Resolve(format!("bad search pattern: {}", e)))?;

    let found = re
        .captures_iter(&buffer)
        .filter_map(|c| {
            let prefix = c.get(1)?;
            Some(start + prefix.end() as u64)
        })
        .min_by_key(|pos| pos.abs_diff(approx_offset));

    if let Some(pos) = found {
        log::debug!("Found object {} at offset {} (xref said {})", reference, pos, approx_offset);
    }
    Ok(found)
}
