//! PDF document writer.
//!
//! Serializes a [`Document`]'s object graph: header, body, cross-reference
//! section (table or stream), and trailer. Incremental saves copy the
//! original bytes and append only dirty objects.

use std::collections::BTreeMap;
use std::io::Write;

use md5::{Digest, Md5};

use super::object_serializer::ObjectSerializer;
use crate::decoders::{FilterPipeline, FilterSpec};
use crate::document::Document;
use crate::error::{Result, Warning, WarningKind};
use crate::object::{Dictionary, Object, ObjectRef, PdfString, Stream};

/// Binary marker line written after the header.
const BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

/// Trailer keys that belong to a cross-reference section, not the document.
const SECTION_KEYS: &[&str] = &[
    "Prev", "XRefStm", "Type", "W", "Index", "Length", "Filter", "DecodeParms", "Size",
];

/// How the cross-reference section is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XrefMode {
    /// Plain-text `xref` table followed by `trailer`
    #[default]
    Table,
    /// Compressed `/Type /XRef` stream (PDF 1.5+)
    Stream,
}

/// Configuration for PDF output.
#[derive(Debug, Clone, Default)]
pub struct WriterOptions {
    /// Header version; the document's version when `None`
    pub version: Option<(u8, u8)>,
    /// Cross-reference format
    pub xref_mode: XrefMode,
    /// FlateDecode streams that have no filter
    pub compress_streams: bool,
    /// Add an `/ID` derived from the object bodies when the trailer has none
    pub generate_id: bool,
}

impl WriterOptions {
    /// Set the header version.
    pub fn with_version(mut self, major: u8, minor: u8) -> Self {
        self.version = Some((major, minor));
        self
    }

    /// Choose table or stream cross-reference output.
    pub fn with_xref_mode(mut self, mode: XrefMode) -> Self {
        self.xref_mode = mode;
        self
    }

    /// Enable or disable stream compression.
    ///
    /// When enabled, streams without a `/Filter` are compressed with
    /// FlateDecode. Streams that already carry filters are written as stored.
    pub fn with_compress_streams(mut self, compress: bool) -> Self {
        self.compress_streams = compress;
        self
    }

    /// Enable or disable `/ID` generation.
    pub fn with_generate_id(mut self, generate: bool) -> Self {
        self.generate_id = generate;
        self
    }
}

/// Cross-reference slot for one object number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Free { generation: u16 },
    InUse { offset: u64, generation: u16 },
}

/// Output buffer that tracks the absolute file offset.
struct CountingWriter<'w, W: Write> {
    inner: &'w mut W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Document writer.
///
/// # Example
///
/// ```no_run
/// use pdf_ferrite::document::Document;
/// use pdf_ferrite::writer::{PdfWriter, WriterOptions, XrefMode};
///
/// let mut doc = Document::from_bytes(std::fs::read("in.pdf")?)?;
/// let writer = PdfWriter::with_options(WriterOptions::default().with_xref_mode(XrefMode::Stream));
/// let mut out = std::fs::File::create("out.pdf")?;
/// writer.write(&mut doc, &mut out)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct PdfWriter {
    options: WriterOptions,
    serializer: ObjectSerializer,
}

impl PdfWriter {
    /// Create a writer with default options.
    pub fn new() -> Self {
        Self::with_options(WriterOptions::default())
    }

    /// Create a writer with custom options.
    pub fn with_options(options: WriterOptions) -> Self {
        Self {
            options,
            serializer: ObjectSerializer::compact(),
        }
    }

    /// Options in use.
    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Write the whole document to `sink`, returning the byte count.
    ///
    /// Object streams and cross-reference streams of the source are not
    /// copied; their objects are written individually.
    pub fn write<W: Write>(&self, doc: &mut Document, sink: &mut W) -> Result<u64> {
        let mut out = CountingWriter { inner: sink, written: 0 };
        let version = self.header_version(doc);
        writeln!(out, "%PDF-{}.{}", version.0, version.1)?;
        out.write_all(BINARY_MARKER)?;

        let mut slots: BTreeMap<u32, Slot> = BTreeMap::new();
        slots.insert(0, Slot::Free { generation: 65535 });
        let mut hasher = Md5::new();

        for reference in doc.object_refs() {
            let Some(object) = self.prepare(doc, reference)? else {
                continue;
            };
            let offset = out.written;
            let body = self.serializer.serialize_indirect(reference, &object);
            hasher.update(&body);
            out.write_all(&body)?;
            slots.insert(
                reference.id,
                Slot::InUse {
                    offset,
                    generation: reference.gen,
                },
            );
        }

        let mut trailer = document_trailer(doc);
        if self.options.generate_id && !trailer.contains_key("ID") {
            let digest = PdfString::hex(hasher.finalize().to_vec());
            trailer.set("ID", vec![Object::String(digest.clone()), Object::String(digest)]);
        }

        // Holes in the numbering, including skipped objects, become free entries
        let size = doc
            .next_object_number()
            .max(slots.keys().next_back().map_or(1, |n| n + 1));
        for n in 1..size {
            slots.entry(n).or_insert(Slot::Free { generation: 0 });
        }
        log::debug!("Writing {} objects, xref {:?}", slots.len() - 1, self.options.xref_mode);

        self.finish_section(&mut out, slots, trailer, size)?;
        out.flush()?;
        Ok(out.written)
    }

    /// Append dirty objects to the original bytes as an incremental update.
    ///
    /// The new section's trailer carries `/Prev`. Documents with no source
    /// bytes, or whose cross-reference data had to be reconstructed, are
    /// written in full instead.
    pub fn write_incremental<W: Write>(&self, doc: &mut Document, sink: &mut W) -> Result<u64> {
        let previous = doc.xref().section_offsets().first().copied();
        let source = match (doc.source_bytes()?, previous) {
            (Some(bytes), Some(prev)) if !doc.is_reconstructed() => Some((bytes, prev)),
            _ => None,
        };
        let Some((original, prev)) = source else {
            log::debug!("No usable original cross-reference; writing the whole document");
            return self.write(doc, sink);
        };

        let mut out = CountingWriter { inner: sink, written: 0 };
        out.write_all(&original)?;
        if !original.ends_with(b"\n") && !original.ends_with(b"\r") {
            out.write_all(b"\n")?;
        }

        let mut slots: BTreeMap<u32, Slot> = BTreeMap::new();
        let dirty: Vec<ObjectRef> = doc.dirty_objects().collect();
        for reference in dirty {
            let Some(object) = self.prepare(doc, reference)? else {
                continue;
            };
            let offset = out.written;
            self.serializer.write_indirect(&mut out, reference, &object)?;
            slots.insert(
                reference.id,
                Slot::InUse {
                    offset,
                    generation: reference.gen,
                },
            );
        }
        let removed: Vec<ObjectRef> = doc.removed_objects().collect();
        for reference in removed {
            slots.insert(
                reference.id,
                Slot::Free {
                    generation: reference.gen.saturating_add(1),
                },
            );
        }

        let mut trailer = document_trailer(doc);
        trailer.set("Prev", Object::Integer(prev as i64));
        let size = doc
            .next_object_number()
            .max(slots.keys().next_back().map_or(0, |n| n + 1));
        log::debug!("Appending {} objects after byte {}", slots.len(), original.len());

        self.finish_section(&mut out, slots, trailer, size)?;
        out.flush()?;
        Ok(out.written)
    }

    /// Write the whole document into a new buffer.
    pub fn to_bytes(&self, doc: &mut Document) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(doc, &mut buf)?;
        Ok(buf)
    }

    fn header_version(&self, doc: &Document) -> (u8, u8) {
        let version = self.options.version.unwrap_or_else(|| doc.version());
        if self.options.xref_mode == XrefMode::Stream && version < (1, 5) {
            log::debug!("Raising header version to 1.5 for a cross-reference stream");
            return (1, 5);
        }
        version
    }

    /// Resolve an object for output. `None` skips it.
    fn prepare(&self, doc: &mut Document, reference: ObjectRef) -> Result<Option<Object>> {
        let object = match doc.resolve(reference) {
            Ok(object) => object,
            Err(e) if !doc.options().strict => {
                doc.report(Warning::new(
                    WarningKind::Other,
                    format!("object {} not written: {}", reference, e),
                ));
                return Ok(None);
            },
            Err(e) => return Err(e),
        };

        match object.as_ref() {
            Object::Stream(stream) if is_section_stream(stream) => Ok(None),
            Object::Stream(stream) if self.options.compress_streams && stream.filters().is_empty() => {
                let flate = [FilterSpec::new("FlateDecode")];
                let encoded = FilterPipeline::default().encode(stream.raw_data(), &flate)?;
                let mut dict = stream.dict.clone();
                FilterSpec::write_chain(&mut dict, &flate);
                Ok(Some(Object::Stream(Stream::new(dict, encoded))))
            },
            other => Ok(Some(other.clone())),
        }
    }

    /// Cross-reference section, trailer, `startxref` and `%%EOF`.
    fn finish_section<W: Write>(
        &self,
        out: &mut CountingWriter<'_, W>,
        slots: BTreeMap<u32, Slot>,
        trailer: Dictionary,
        size: u32,
    ) -> Result<()> {
        match self.options.xref_mode {
            XrefMode::Table => {
                let start = out.written;
                write_xref_table(out, &slots)?;
                let mut trailer = trailer;
                trailer.set("Size", Object::Integer(i64::from(size)));
                out.write_all(b"trailer\n")?;
                self.serializer.write_object(out, &Object::Dictionary(trailer))?;
                write!(out, "\nstartxref\n{}\n%%EOF\n", start)?;
            },
            XrefMode::Stream => {
                let start = out.written;
                let stream_ref = ObjectRef::new(size, 0);
                let mut slots = slots;
                slots.insert(
                    stream_ref.id,
                    Slot::InUse {
                        offset: start,
                        generation: 0,
                    },
                );
                let stream = xref_stream(&slots, trailer, size + 1)?;
                self.serializer.write_indirect(out, stream_ref, &Object::Stream(stream))?;
                write!(out, "startxref\n{}\n%%EOF\n", start)?;
            },
        }
        Ok(())
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Write the whole document to `sink` with default options.
pub fn save<W: Write>(doc: &mut Document, sink: &mut W) -> Result<u64> {
    PdfWriter::new().write(doc, sink)
}

/// Append the document's changes to its original bytes with default options.
pub fn save_incremental<W: Write>(doc: &mut Document, sink: &mut W) -> Result<u64> {
    PdfWriter::new().write_incremental(doc, sink)
}

fn is_section_stream(stream: &Stream) -> bool {
    matches!(stream.dict.get_name("Type"), Some("ObjStm") | Some("XRef"))
}

/// The document trailer without section-specific keys.
fn document_trailer(doc: &Document) -> Dictionary {
    let mut trailer = doc.trailer().clone();
    for key in SECTION_KEYS {
        trailer.remove(key);
    }
    trailer
}

/// Consecutive runs of object numbers, as `(first, count)`.
/// Bytes needed for `largest`, never fewer than 4.
fn offset_field_width(largest: u64) -> usize {
    let significant = 64 - largest.leading_zeros() as usize;
    significant.div_ceil(8).max(4)
}

fn subsections(slots: &BTreeMap<u32, Slot>) -> Vec<(u32, u32)> {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for &n in slots.keys() {
        match runs.last_mut() {
            Some((first, count)) if *first + *count == n => *count += 1,
            _ => runs.push((n, 1)),
        }
    }
    runs
}

fn write_xref_table<W: Write>(out: &mut W, slots: &BTreeMap<u32, Slot>) -> std::io::Result<()> {
    out.write_all(b"xref\n")?;
    for (first, count) in subsections(slots) {
        writeln!(out, "{} {}", first, count)?;
        for slot in slots.range(first..first + count).map(|(_, slot)| slot) {
            // Each entry is exactly 20 bytes
            match *slot {
                Slot::InUse { offset, generation } => write!(out, "{:010} {:05} n\r\n", offset, generation)?,
                Slot::Free { generation } => write!(out, "{:010} {:05} f\r\n", 0, generation)?,
            }
        }
    }
    Ok(())
}

/// Build a `/Type /XRef` stream with `/W [1 n 2]`, where the offset field
/// is 4 bytes unless a larger offset needs more.
fn xref_stream(slots: &BTreeMap<u32, Slot>, trailer: Dictionary, size: u32) -> Result<Stream> {
    let largest = slots
        .values()
        .map(|slot| match *slot {
            Slot::InUse { offset, .. } => offset,
            Slot::Free { .. } => 0,
        })
        .max()
        .unwrap_or(0);
    let offset_width = offset_field_width(largest);

    let mut rows = Vec::with_capacity(slots.len() * (offset_width + 3));
    for slot in slots.values() {
        let (kind, field2, field3) = match *slot {
            Slot::Free { generation } => (0u8, 0u64, generation),
            Slot::InUse { offset, generation } => (1u8, offset, generation),
        };
        rows.push(kind);
        rows.extend_from_slice(&field2.to_be_bytes()[8 - offset_width..]);
        rows.extend_from_slice(&field3.to_be_bytes());
    }
    let index: Vec<Object> = subsections(slots)
        .into_iter()
        .flat_map(|(first, count)| [Object::Integer(i64::from(first)), Object::Integer(i64::from(count))])
        .collect();

    let flate = [FilterSpec::new("FlateDecode")];
    let encoded = FilterPipeline::default().encode(&rows, &flate)?;
    let mut dict = crate::dict! {
        "Type" => "XRef",
        "Size" => Object::Integer(i64::from(size)),
        "W" => vec![Object::Integer(1), Object::Integer(offset_width as i64), Object::Integer(2)],
        "Index" => index,
    };
    FilterSpec::write_chain(&mut dict, &flate);
    for (key, value) in trailer {
        dict.set(key, value);
    }
    Ok(Stream::new(dict, encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;
    use crate::geometry::Rect;

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.add_page(Rect::new(0.0, 0.0, 612.0, 792.0), Dictionary::new(), b"BT ET")
            .unwrap();
        doc
    }

    #[test]
    fn test_full_save_layout() {
        let mut doc = sample();
        let bytes = PdfWriter::new().to_bytes(&mut doc).unwrap();
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.starts_with("%PDF-1.7\n"));
        assert!(text.contains("/Type /Catalog"));
        assert!(text.contains("/Type /Pages"));
        assert!(text.contains("/Count 1"));
        assert!(text.contains("xref\n0 5\n0000000000 65535 f\r\n"));
        assert!(text.contains("/Size 5"));
        assert!(text.ends_with("%%EOF\n"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let mut doc = sample();
        let bytes = PdfWriter::new().to_bytes(&mut doc).unwrap();
        let start = bytes.windows(5).position(|w| w == b"xref\n").unwrap();
        let table = String::from_utf8_lossy(&bytes[start..]).into_owned();
        for (i, line) in table.lines().skip(3).take(4).enumerate() {
            let offset: usize = line[..10].parse().unwrap();
            let header = format!("{} 0 obj", i + 1);
            assert!(bytes[offset..].starts_with(header.as_bytes()), "object {} at {}", i + 1, offset);
        }
    }

    #[test]
    fn test_output_is_deterministic() {
        let mut doc = sample();
        let writer = PdfWriter::with_options(WriterOptions::default().with_generate_id(true));
        let first = writer.to_bytes(&mut doc).unwrap();
        let second = writer.to_bytes(&mut doc).unwrap();
        assert_eq!(first, second);
        assert!(String::from_utf8_lossy(&first).contains("/ID [<"));
    }

    #[test]
    fn test_compress_streams() {
        let mut doc = sample();
        let writer = PdfWriter::with_options(WriterOptions::default().with_compress_streams(true));
        let bytes = writer.to_bytes(&mut doc).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("/Filter /FlateDecode"));
    }

    #[test]
    fn test_xref_stream_mode() {
        let mut doc = sample();
        doc.set_version((1, 4));
        let writer = PdfWriter::with_options(WriterOptions::default().with_xref_mode(XrefMode::Stream));
        let bytes = writer.to_bytes(&mut doc).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.5\n"));
        assert!(text.contains("5 0 obj"));
        assert!(text.contains("/Type /XRef"));
        assert!(text.contains("/Size 6"));
        assert!(!text.contains("trailer"));
    }

    #[test]
    fn test_xref_stream_widens_offsets_past_4_gib() {
        assert_eq!(offset_field_width(0), 4);
        assert_eq!(offset_field_width(u32::MAX as u64), 4);
        assert_eq!(offset_field_width(1 << 32), 5);

        let mut slots = BTreeMap::new();
        slots.insert(0, Slot::Free { generation: 65535 });
        slots.insert(
            1,
            Slot::InUse {
                offset: 0x01_0000_0010,
                generation: 0,
            },
        );
        let stream = xref_stream(&slots, Dictionary::new(), 2).unwrap();
        let widths: Vec<i64> = stream
            .dict
            .get("W")
            .and_then(Object::as_array)
            .unwrap()
            .iter()
            .filter_map(Object::as_integer)
            .collect();
        assert_eq!(widths, vec![1, 5, 2]);
        let rows = stream.decoded_data().unwrap();
        assert_eq!(rows.len(), 16);
        assert_eq!(&rows[8..16], &[1, 0x01, 0, 0, 0, 0x10, 0, 0]);
    }

    #[test]
    fn test_object_streams_are_not_copied() {
        let mut doc = sample();
        doc.add_object(Object::Stream(Stream::new(dict! { "Type" => "ObjStm", "N" => 0, "First" => 0 }, Vec::new()))).unwrap();
        let bytes = PdfWriter::new().to_bytes(&mut doc).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(!text.contains("ObjStm"));
        assert!(text.contains("0000000000 00000 f\r\n"));
    }

    #[test]
    fn test_subsections() {
        let mut slots = BTreeMap::new();
        for n in [0, 1, 2, 7, 9, 10] {
            slots.insert(n, Slot::Free { generation: 0 });
        }
        assert_eq!(subsections(&slots), vec![(0, 3), (7, 1), (9, 2)]);
    }

    #[test]
    fn test_incremental_without_source_writes_everything() {
        let mut doc = sample();
        let mut out = Vec::new();
        save_incremental(&mut doc, &mut out).unwrap();
        assert!(out.starts_with(b"%PDF-"));
        assert!(!String::from_utf8_lossy(&out).contains("/Prev"));
    }
}
