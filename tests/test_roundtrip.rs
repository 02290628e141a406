//! Save/reopen round trips and property tests for the serializer and filters.

use pdf_ferrite::content::EventCollector;
use pdf_ferrite::decoders::{FilterPipeline, FilterSpec};
use pdf_ferrite::dict;
use pdf_ferrite::document::Document;
use pdf_ferrite::geometry::Rect;
use pdf_ferrite::object::{Dictionary, Name, Object, ObjectRef, PdfString};
use pdf_ferrite::parser::parse_object;
use pdf_ferrite::source::ByteSource;
use pdf_ferrite::writer::{self, ObjectSerializer, PdfWriter, WriterOptions, XrefMode};
use proptest::prelude::*;
use std::io::{Seek, SeekFrom, Write};

fn sample_document() -> Document {
    let mut doc = Document::new();
    let font = doc.add_object(Object::Dictionary(dict! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    })).unwrap();
    let resources = dict! { "Font" => dict! { "F1" => font } };
    doc.add_page(
        Rect::new(0.0, 0.0, 612.0, 792.0),
        resources,
        b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET",
    )
    .unwrap();
    doc.set_info("Title", PdfString::from_text("Round trip")).unwrap();
    doc
}

fn without_length(object: &Object) -> Object {
    match object {
        Object::Stream(stream) => {
            let mut dict = stream.dict.clone();
            dict.remove("Length");
            Object::Array(vec![Object::Dictionary(dict), Object::String(PdfString::hex(stream.raw_data().to_vec()))])
        }
        other => other.clone(),
    }
}

fn assert_same_objects(original: &mut Document, reopened: &mut Document) {
    let refs = original.object_refs();
    assert_eq!(refs, reopened.object_refs());
    for reference in refs {
        let a = original.resolve(reference).unwrap();
        let b = reopened.resolve(reference).unwrap();
        assert_eq!(without_length(&a), without_length(&b), "object {:?}", reference);
    }
}

#[test]
fn test_save_then_open_is_structurally_equal() {
    let mut doc = sample_document();
    let mut bytes = Vec::new();
    writer::save(&mut doc, &mut bytes).unwrap();

    let mut reopened = Document::from_bytes(bytes).unwrap();
    assert!(reopened.warnings().is_empty(), "{:?}", reopened.warnings());
    assert_same_objects(&mut doc, &mut reopened);

    let page = reopened.page(0).unwrap();
    let mut collector = EventCollector::new();
    pdf_ferrite::content::interpret_page(&mut reopened, &page, &mut [&mut collector]).unwrap();
    assert_eq!(collector.text(), "Hello");
}

#[test]
fn test_save_to_file_and_reopen() {
    let mut doc = sample_document();
    let mut file = tempfile::tempfile().unwrap();
    writer::save(&mut doc, &mut file).unwrap();
    file.flush().unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let mut reopened = Document::open(ByteSource::new(file).unwrap()).unwrap();
    assert_eq!(reopened.pages().unwrap().len(), 1);
    let info = reopened.info().unwrap().unwrap();
    assert_eq!(info.get("Title").and_then(Object::as_string).map(PdfString::to_text).as_deref(), Some("Round trip"));
}

#[test]
fn test_incremental_save_appends_section() {
    let mut doc = sample_document();
    let mut original = Vec::new();
    writer::save(&mut doc, &mut original).unwrap();

    let mut opened = Document::from_bytes(original.clone()).unwrap();
    opened.set_info("Title", PdfString::from_text("Edited")).unwrap();
    let mut updated = Vec::new();
    writer::save_incremental(&mut opened, &mut updated).unwrap();

    assert!(updated.starts_with(&original));
    let appended = String::from_utf8_lossy(&updated[original.len()..]).into_owned();
    assert!(appended.contains("/Prev"), "{}", appended);

    let mut reread = Document::from_bytes(updated).unwrap();
    assert_eq!(reread.xref().section_offsets().len(), 2);
    let title = reread.info().unwrap().and_then(|d| d.get("Title").cloned());
    assert_eq!(title.as_ref().and_then(Object::as_string).map(PdfString::to_text).as_deref(), Some("Edited"));
    assert_eq!(reread.pages().unwrap().len(), 1);
}

#[test]
fn test_incremental_save_marks_removed_objects_free() {
    let mut doc = sample_document();
    let extra = doc.add_object(Object::Integer(99)).unwrap();
    let mut original = Vec::new();
    writer::save(&mut doc, &mut original).unwrap();

    let mut opened = Document::from_bytes(original).unwrap();
    opened.remove_object(extra).unwrap();
    let mut updated = Vec::new();
    writer::save_incremental(&mut opened, &mut updated).unwrap();

    let reread = Document::from_bytes(updated).unwrap();
    assert!(!reread.contains(extra));
    assert!(!reread.xref().get(extra.id).unwrap().is_in_use());
}

#[test]
fn test_xref_stream_output_reopens() {
    let mut doc = sample_document();
    doc.set_version((1, 4));
    let options = WriterOptions::default()
        .with_xref_mode(XrefMode::Stream)
        .with_compress_streams(true);
    let bytes = PdfWriter::with_options(options).to_bytes(&mut doc).unwrap();
    // Cross-reference streams need at least 1.5
    assert!(bytes.starts_with(b"%PDF-1.5\n"));

    let mut reopened = Document::from_bytes(bytes).unwrap();
    assert!(!reopened.is_reconstructed());
    let page = reopened.page(0).unwrap();
    let contents = reopened.page_contents(&page).unwrap();
    assert_eq!(contents, b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET".to_vec());
}

#[test]
fn test_name_with_space_round_trips() {
    let parsed = parse_object(b"/Foo#20Bar").unwrap();
    assert_eq!(parsed.as_name().map(Name::as_bytes), Some(&b"Foo Bar"[..]));
    let written = ObjectSerializer::compact().serialize_to_string(&parsed);
    assert_eq!(written, "/Foo#20Bar");
}

#[test]
fn test_truncated_file_is_rebuilt() {
    let mut doc = sample_document();
    let mut bytes = Vec::new();
    writer::save(&mut doc, &mut bytes).unwrap();
    let cut = bytes.windows(6).rposition(|w| w == b"\nxref\n").unwrap();
    bytes.truncate(cut + 1);

    let mut reopened = Document::from_bytes(bytes).unwrap();
    assert!(reopened.is_reconstructed());
    assert!(!reopened.warnings().is_empty());
    assert_eq!(reopened.pages().unwrap().len(), 1);
}

fn lossless_filter() -> impl Strategy<Value = FilterSpec> {
    prop_oneof![
        Just(FilterSpec::new("FlateDecode")),
        Just(FilterSpec::new("LZWDecode")),
        Just(FilterSpec::new("ASCIIHexDecode")),
        Just(FilterSpec::new("ASCII85Decode")),
        Just(FilterSpec::new("RunLengthDecode")),
    ]
}

proptest! {
    #[test]
    fn prop_name_bytes_round_trip(bytes in prop::collection::vec(1u8..=255, 1..32)) {
        let name = Object::Name(Name::new(bytes));
        let text = ObjectSerializer::compact().serialize(&name);
        prop_assert_eq!(parse_object(&text).unwrap(), name);
    }

    #[test]
    fn prop_real_round_trip(value in -1.0e9f64..1.0e9) {
        let text = writer::format_real(value);
        let parsed = parse_object(text.as_bytes()).unwrap();
        prop_assert_eq!(parsed, Object::Real(value));
    }

    #[test]
    fn prop_string_round_trip(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        for string in [PdfString::literal(bytes.clone()), PdfString::hex(bytes.clone())] {
            let object = Object::String(string);
            let text = ObjectSerializer::compact().serialize(&object);
            prop_assert_eq!(parse_object(&text).unwrap(), object);
        }
    }

    #[test]
    fn prop_filter_chain_round_trip(
        data in prop::collection::vec(any::<u8>(), 0..512),
        chain in prop::collection::vec(lossless_filter(), 1..3),
    ) {
        let pipeline = FilterPipeline::default();
        let encoded = pipeline.encode(&data, &chain).unwrap();
        let decoded = pipeline.decode(&encoded, &chain, false).unwrap();
        prop_assert_eq!(decoded.data, data);
        prop_assert!(decoded.truncated_by.is_none());
    }

    #[test]
    fn prop_dictionary_round_trip(entries in prop::collection::vec(("[A-Za-z]{1,8}", -1000i64..1000), 0..8)) {
        let dict: Dictionary = entries
            .into_iter()
            .map(|(k, v)| (Name::from(k), Object::Integer(v)))
            .collect();
        let object = Object::Dictionary(dict);
        let text = ObjectSerializer::new().serialize(&object);
        prop_assert_eq!(parse_object(&text).unwrap(), object);
    }
}

#[test]
fn test_generation_survives_save() {
    let mut doc = sample_document();
    doc.set_object(ObjectRef::new(20, 3), Object::Boolean(true));
    let bytes = PdfWriter::new().to_bytes(&mut doc).unwrap();
    let mut reopened = Document::from_bytes(bytes).unwrap();
    assert_eq!(reopened.resolve(ObjectRef::new(20, 3)).unwrap().as_bool(), Some(true));
    assert_eq!(reopened.xref().get(20).map(|e| e.generation()), Some(3));
}
