//! Cross-reference table parser.
//!
//! The xref table maps object numbers to byte offsets in the PDF file,
//! enabling random access to PDF objects.
//!
//! Supports both traditional xref tables (PDF 1.0-1.4) and
//! cross-reference streams (PDF 1.5+), incremental updates chained through
//! `/Prev`, and hybrid-reference files whose table trailer names an
//! additional stream through `/XRefStm`.

use std::collections::{BTreeMap, HashSet};

use byteorder::{BigEndian, ByteOrder};

use crate::decoders::FilterPipeline;
use crate::error::{Error, Result, Warning, WarningKind};
use crate::lexer::{Lexer, TokenKind};
use crate::object::{Dictionary, Object};
use crate::parser::Parser;
use crate::parser_config::ParserOptions;
use crate::source::ByteSource;

/// Cross-reference table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Reusable entry
    Free {
        /// Next free object number
        next_free: u32,
        /// Generation to use when the number is reused
        generation: u16,
    },
    /// Object stored at a byte offset
    InUse {
        /// Byte offset of `N G obj`
        offset: u64,
        /// Generation number
        generation: u16,
    },
    /// Object stored inside an object stream
    Compressed {
        /// Object number of the containing object stream
        stream: u32,
        /// Index within that stream
        index: u32,
    },
}

impl XRefEntry {
    /// Generation this entry answers to. Compressed objects always have generation 0.
    pub fn generation(&self) -> u16 {
        match self {
            XRefEntry::Free { generation, .. } | XRefEntry::InUse { generation, .. } => *generation,
            XRefEntry::Compressed { .. } => 0,
        }
    }

    /// True for entries that locate an object.
    pub fn is_in_use(&self) -> bool {
        !matches!(self, XRefEntry::Free { .. })
    }
}

/// Merged cross-reference table and trailer.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    entries: BTreeMap<u32, XRefEntry>,
    trailer: Dictionary,
    /// Offsets of every section read, newest first
    sections: Vec<u64>,
}

impl CrossRefTable {
    /// Create a new empty cross-reference table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trailer dictionary (for xref streams, the stream dictionary).
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Mutable trailer access.
    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.trailer
    }

    /// Replace the trailer.
    pub fn set_trailer(&mut self, trailer: Dictionary) {
        self.trailer = trailer;
    }

    /// Add or replace an entry.
    pub fn add_entry(&mut self, object_number: u32, entry: XRefEntry) {
        self.entries.insert(object_number, entry);
    }

    /// Get an entry by object number.
    pub fn get(&self, object_number: u32) -> Option<&XRefEntry> {
        self.entries.get(&object_number)
    }

    /// Check if an object number has an entry.
    pub fn contains(&self, object_number: u32) -> bool {
        self.entries.contains_key(&object_number)
    }

    /// All entries in object-number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &XRefEntry)> + '_ {
        self.entries.iter().map(|(n, e)| (*n, e))
    }

    /// Highest object number with an entry.
    pub fn max_object_number(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    /// Byte offsets of the sections this table was merged from, newest first.
    pub fn section_offsets(&self) -> &[u64] {
        &self.sections
    }

    /// Merge an older section into this one.
    ///
    /// Entries already present (from newer sections) win. Trailer keys the
    /// newer trailer lacks are filled in from the older one.
    pub fn merge_older(&mut self, older: CrossRefTable) {
        for (num, entry) in older.entries {
            self.entries.entry(num).or_insert(entry);
        }
        for (key, value) in older.trailer {
            let chain_key = key.as_bytes() == b"Prev" || key.as_bytes() == b"XRefStm";
            if !chain_key && self.trailer.get_by_name(&key).is_none() {
                self.trailer.set(key, value);
            }
        }
        self.sections.extend(older.sections);
    }

    /// Overlay a stream section of a hybrid file: its entries win over the
    /// table section it accompanies.
    fn overlay(&mut self, stream: CrossRefTable) {
        for (num, entry) in stream.entries {
            self.entries.insert(num, entry);
        }
    }

    /// Get the number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Run `parse` over a window of the source starting at `offset`, growing the
/// window while parsing fails before the end of the file is in view. A
/// window boundary can split a token, so any failure short of EOF retries.
pub(crate) fn parse_windowed<T>(
    src: &mut ByteSource,
    offset: u64,
    mut parse: impl FnMut(&[u8], bool) -> Result<T>,
) -> Result<T> {
    let mut window = 16 * 1024;
    loop {
        let data = src.read_window(offset, window)?;
        let at_eof = offset + data.len() as u64 >= src.length();
        match parse(&data, at_eof) {
            Err(e) if !at_eof => {
                log::trace!("Window of {} bytes at {} too small: {}", data.len(), offset, e);
                window *= 4;
            },
            other => return other,
        }
    }
}

/// Find the byte offset of the newest xref section.
///
/// Scans backward from the end of the file for the line holding
/// `startxref`, then reads the number that follows it. A missing `%%EOF`
/// and trailing garbage lines are tolerated.
pub fn find_startxref(src: &mut ByteSource) -> Result<u64> {
    const MAX_LINES: usize = 64;

    let mut pos = src.length();
    let mut below: Option<Vec<u8>> = None;
    for _ in 0..MAX_LINES {
        let Some((line, start)) = src.read_line_backward_from(pos)? else {
            break;
        };
        let text = String::from_utf8_lossy(&line);
        let trimmed = text.trim();
        if let Some(idx) = trimmed.find("startxref") {
            let rest = trimmed[idx + "startxref".len()..].trim();
            let candidate = if rest.is_empty() {
                below.as_deref().map(|b| String::from_utf8_lossy(b).trim().to_string())
            } else {
                Some(rest.to_string())
            };
            let number = candidate
                .as_deref()
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.parse::<u64>().ok());
            return number.ok_or_else(|| {
                Error::InvalidXref("no offset after 'startxref'".to_string())
            });
        }
        below = Some(line);
        pos = start;
    }
    Err(Error::InvalidXref("'startxref' not found near end of file".to_string()))
}

/// Read a single xref section (table or stream) at `offset`.
pub fn read_xref_section(
    src: &mut ByteSource,
    offset: u64,
    options: &ParserOptions,
    warnings: &mut Vec<Warning>,
) -> Result<CrossRefTable> {
    if offset >= src.length() {
        return Err(Error::InvalidXref(format!(
            "xref offset {} beyond end of file ({} bytes)",
            offset,
            src.length()
        )));
    }
    let head = src.read_window(offset, 32)?;
    let first = head.iter().position(|b| !crate::lexer::is_whitespace(*b));
    let mut table = match first.map(|i| &head[i..]) {
        Some(rest) if rest.starts_with(b"xref") => {
            log::debug!("Traditional xref at offset {}", offset);
            let (table, found) = parse_windowed(src, offset, |data, at_eof| {
                // Warnings from a retried window are discarded with it
                let mut found = Vec::new();
                let table = parse_xref_table(data, offset as usize, at_eof, options, &mut found)?;
                Ok((table, found))
            })?;
            warnings.extend(found);
            table
        },
        Some(rest) if rest.first().is_some_and(|c| c.is_ascii_digit()) => {
            log::debug!("Xref stream at offset {}", offset);
            let pipeline = FilterPipeline::from_options(options);
            let (table, found) = parse_windowed(src, offset, |data, at_eof| {
                let mut found = Vec::new();
                let table = parse_xref_stream(data, offset as usize, at_eof, options, &pipeline, &mut found)?;
                Ok((table, found))
            })?;
            warnings.extend(found);
            table
        },
        _ => {
            return Err(Error::InvalidXref(format!("no xref section at offset {}", offset)));
        },
    };
    table.sections.push(offset);
    Ok(table)
}

/// Read the newest section and every section reachable through `/Prev`,
/// merging them so that later definitions win.
pub fn load_xref_chain(
    src: &mut ByteSource,
    start: u64,
    options: &ParserOptions,
    warnings: &mut Vec<Warning>,
) -> Result<CrossRefTable> {
    let mut visited = HashSet::new();
    let mut merged: Option<CrossRefTable> = None;
    let mut next = Some(start);

    while let Some(offset) = next.take() {
        if !visited.insert(offset) {
            warnings.push(
                Warning::new(WarningKind::Other, format!("/Prev chain loops back to {}", offset))
                    .at(offset),
            );
            break;
        }

        let mut section = read_xref_section(src, offset, options, warnings)?;

        // Hybrid-reference file: the table trailer points at a stream
        // holding the compressed entries
        if let Some(stm_offset) = section.trailer.get_integer("XRefStm") {
            match read_xref_section(src, stm_offset as u64, options, warnings) {
                Ok(stream) => section.overlay(stream),
                Err(e) => {
                    if options.strict {
                        return Err(e);
                    }
                    log::warn!("Ignoring unreadable /XRefStm at {}: {}", stm_offset, e);
                },
            }
        }

        next = section
            .trailer
            .get_integer("Prev")
            .filter(|p| *p >= 0)
            .map(|p| p as u64);

        merged = Some(match merged {
            None => section,
            Some(mut newer) => {
                newer.merge_older(section);
                newer
            },
        });
    }

    let mut merged = merged.ok_or_else(|| Error::InvalidXref("no xref sections".to_string()))?;
    merged.trailer.remove("Prev");
    merged.trailer.remove("XRefStm");
    log::debug!(
        "Loaded xref: {} entries from {} section(s)",
        merged.len(),
        merged.sections.len()
    );
    Ok(merged)
}

/// Parse a traditional cross-reference table.
///
/// ```text
/// xref
/// 0 6
/// 0000000000 65535 f
/// 0000000018 00000 n
/// ...
/// trailer
/// << /Size 6 /Root 1 0 R >>
/// ```
///
/// Entries are read as tokens rather than fixed 20-byte records, so 19- and
/// 21-byte lines are accepted. A subsection whose header undercounts its
/// entries is extended with a warning.
pub fn parse_xref_table(
    data: &[u8],
    base: usize,
    at_eof: bool,
    options: &ParserOptions,
    warnings: &mut Vec<Warning>,
) -> Result<CrossRefTable> {
    let mut lexer = Lexer::with_base(data, base);
    let eof = |lexer: &Lexer<'_>| Error::UnexpectedEof {
        offset: lexer.absolute_position(),
    };

    match lexer.next_significant()? {
        Some(t) if t.kind.is_keyword(b"xref") => {},
        Some(t) => return Err(Error::InvalidXref(format!("expected 'xref' at {}", t.offset))),
        None => return Err(eof(&lexer)),
    }

    let mut table = CrossRefTable::new();
    let mut next_number: Option<u32> = None;

    loop {
        let Some(token) = lexer.next_significant()? else {
            return Err(if at_eof {
                Error::InvalidXref("xref table has no trailer".to_string())
            } else {
                eof(&lexer)
            });
        };

        let first = match token.kind {
            TokenKind::Keyword(ref k) if k == b"trailer" => break,
            TokenKind::Integer(n) if n >= 0 => n,
            _ => {
                return Err(Error::InvalidXref(format!(
                    "unexpected token in xref table at {}",
                    token.offset
                )));
            },
        };
        let second = match lexer.next_significant()? {
            Some(t) => match t.kind {
                TokenKind::Integer(n) if n >= 0 => n,
                _ => return Err(Error::InvalidXref(format!("bad xref entry at {}", t.offset))),
            },
            None => return Err(eof(&lexer)),
        };

        // "offset gen n|f" where a subsection header was expected: the
        // previous header undercounted
        let saved = lexer.position();
        if let Some(t) = lexer.next_significant()? {
            if let Some(kind) = entry_kind(&t.kind) {
                if let Some(num) = next_number {
                    if options.strict {
                        return Err(Error::InvalidXref(format!(
                            "xref subsection has more entries than declared at {}",
                            token.offset
                        )));
                    }
                    warnings.push(
                        Warning::new(WarningKind::RecoveredXref, "xref subsection count too small")
                            .at(token.offset as u64),
                    );
                    add_table_entry(&mut table, num, first, second, kind);
                    next_number = num.checked_add(1);
                    continue;
                }
            }
        }
        lexer.set_position(saved);

        if second > 10_000_000 {
            return Err(Error::InvalidXref(format!("xref subsection count {} exceeds limit", second)));
        }
        let Ok(start) = u32::try_from(first) else {
            return Err(Error::InvalidXref(format!(
                "xref subsection starts at object {} (at {})",
                first, token.offset
            )));
        };
        let count = second as u32;

        let mut read = 0;
        let mut overflowed = 0;
        while read < count {
            let before = lexer.position();
            let offset_tok = lexer.next_significant()?;
            let gen_tok = lexer.next_significant()?;
            let kind_tok = lexer.next_significant()?;
            match (offset_tok, gen_tok, kind_tok) {
                (Some(o), Some(g), Some(k)) => match (&o.kind, &g.kind, entry_kind(&k.kind)) {
                    (TokenKind::Integer(off), TokenKind::Integer(gen), Some(kind)) => {
                        match start.checked_add(read) {
                            Some(num) => add_table_entry(&mut table, num, *off, *gen, kind),
                            None => overflowed += 1,
                        }
                        read += 1;
                    },
                    _ => {
                        // Header overcounted: stop at the first non-entry
                        lexer.set_position(before);
                        if options.strict {
                            return Err(Error::InvalidXref(format!(
                                "xref subsection at {} has {} of {} entries",
                                base, read, count
                            )));
                        }
                        warnings.push(
                            Warning::new(
                                WarningKind::RecoveredXref,
                                format!("xref subsection declares {} entries, found {}", count, read),
                            )
                            .at(o.offset as u64),
                        );
                        break;
                    },
                },
                _ if !at_eof => return Err(eof(&lexer)),
                _ => return Err(Error::InvalidXref("xref table truncated".to_string())),
            }
        }
        if overflowed > 0 {
            if options.strict {
                return Err(Error::InvalidXref(format!(
                    "xref subsection at {} runs past the largest object number",
                    token.offset
                )));
            }
            warnings.push(
                Warning::new(
                    WarningKind::RecoveredXref,
                    format!("dropped {} xref entries past the largest object number", overflowed),
                )
                .at(token.offset as u64),
            );
        }
        next_number = start.checked_add(read);
    }

    let mut parser = Parser::with_base(lexer.remaining(), lexer.absolute_position())
        .with_options(*options)
        .with_file_end(at_eof);
    match parser.parse_object()? {
        Object::Dictionary(trailer) => table.set_trailer(trailer),
        other => {
            return Err(Error::InvalidXref(format!(
                "trailer is a {}, not a dictionary",
                other.type_name()
            )));
        },
    }
    Ok(table)
}

#[derive(Clone, Copy)]
enum TableEntryKind {
    InUse,
    Free,
}

fn entry_kind(kind: &TokenKind) -> Option<TableEntryKind> {
    match kind {
        TokenKind::Keyword(k) if k.as_slice() == b"n" => Some(TableEntryKind::InUse),
        TokenKind::Keyword(k) if k.as_slice() == b"f" => Some(TableEntryKind::Free),
        _ => None,
    }
}

fn add_table_entry(table: &mut CrossRefTable, num: u32, field1: i64, gen: i64, kind: TableEntryKind) {
    let generation = gen.clamp(0, u16::MAX as i64) as u16;
    let entry = match kind {
        TableEntryKind::InUse => XRefEntry::InUse {
            offset: field1.max(0) as u64,
            generation,
        },
        TableEntryKind::Free => XRefEntry::Free {
            next_free: field1.clamp(0, u32::MAX as i64) as u32,
            generation,
        },
    };
    table.add_entry(num, entry);
}

/// Parse a cross-reference stream object found at the start of `data`.
///
/// The stream dictionary carries:
/// - `/W [w1 w2 w3]` - field widths in bytes
/// - `/Size` - total number of entries
/// - `/Index [start1 count1 ...]` - optional subsection ranges (default `[0 Size]`)
///
/// Field 1 is the entry type (0 = free, 1 = in use, 2 = compressed) and
/// defaults to 1 when its width is zero.
pub fn parse_xref_stream(
    data: &[u8],
    base: usize,
    at_eof: bool,
    options: &ParserOptions,
    pipeline: &FilterPipeline,
    warnings: &mut Vec<Warning>,
) -> Result<CrossRefTable> {
    let mut parser = Parser::with_base(data, base)
        .with_options(*options)
        .with_file_end(at_eof);
    let indirect = parser.parse_indirect_object(None)?;
    let Object::Stream(stream) = indirect.object else {
        return Err(Error::InvalidXref(format!("object at {} is not an xref stream", base)));
    };
    let dict = &stream.dict;
    if let Some(t) = dict.get_name("Type") {
        if t != "XRef" {
            return Err(Error::InvalidXref(format!("expected /Type /XRef, got /{}", t)));
        }
    }

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(|o| o.as_array())
        .ok_or_else(|| Error::InvalidXref("xref stream without /W".to_string()))?
        .iter()
        .map(|o| o.as_integer().filter(|w| (0..=8).contains(w)).map(|w| w as usize))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::InvalidXref("invalid /W entry".to_string()))?;
    let [w1, w2, w3] = widths[..] else {
        return Err(Error::InvalidXref(format!("/W has {} entries, expected 3", widths.len())));
    };
    let entry_size = w1 + w2 + w3;
    if entry_size == 0 {
        return Err(Error::InvalidXref("/W describes empty entries".to_string()));
    }

    let size = dict
        .get_integer("Size")
        .ok_or_else(|| Error::InvalidXref("xref stream without /Size".to_string()))?;
    let ranges: Vec<(u32, u32)> = match dict.get("Index").and_then(|o| o.as_array()) {
        Some(index) => index
            .chunks(2)
            .filter_map(|pair| match pair {
                [s, c] => Some((s.as_integer()?, c.as_integer()?)),
                _ => None,
            })
            .map(|(s, c)| match (u32::try_from(s), u32::try_from(c)) {
                (Ok(s), Ok(c)) => Ok((s, c)),
                _ => Err(Error::InvalidXref(format!("/Index pair [{} {}] out of range", s, c))),
            })
            .collect::<Result<_>>()?,
        None => vec![(0, size.clamp(0, u32::MAX as i64) as u32)],
    };

    let decoded = pipeline.decode(stream.raw_data(), &stream.filters(), false)?.data;

    let mut table = CrossRefTable::new();
    let mut records = decoded.chunks_exact(entry_size);
    let mut overflowed = 0;
    'ranges: for (start, count) in ranges {
        for i in 0..count {
            let Some(record) = records.next() else {
                log::warn!("Xref stream data ends before /Index is satisfied");
                break 'ranges;
            };
            let field = |from: usize, width: usize| -> u64 {
                if width == 0 {
                    0
                } else {
                    BigEndian::read_uint(&record[from..from + width], width)
                }
            };
            let kind = if w1 == 0 { 1 } else { field(0, w1) };
            let f2 = field(w1, w2);
            let f3 = field(w1 + w2, w3);
            let entry = match kind {
                0 => XRefEntry::Free {
                    next_free: f2 as u32,
                    generation: f3 as u16,
                },
                1 => XRefEntry::InUse {
                    offset: f2,
                    generation: f3 as u16,
                },
                2 => XRefEntry::Compressed {
                    stream: f2 as u32,
                    index: f3 as u32,
                },
                // Unknown types are treated as references to the null object
                _ => continue,
            };
            match start.checked_add(i) {
                Some(num) => table.add_entry(num, entry),
                None => overflowed += 1,
            }
        }
    }
    if overflowed > 0 {
        if options.strict {
            return Err(Error::InvalidXref(format!(
                "xref stream at {} runs past the largest object number",
                base
            )));
        }
        warnings.push(
            Warning::new(
                WarningKind::RecoveredXref,
                format!("dropped {} xref stream entries past the largest object number", overflowed),
            )
            .at(base as u64),
        );
    }

    let mut trailer = stream.dict.clone();
    for key in ["Length", "Filter", "DecodeParms", "W", "Index", "Type"] {
        trailer.remove(key);
    }
    table.set_trailer(trailer);
    Ok(table)
}
