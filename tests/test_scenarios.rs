//! End-to-end scenarios: files built byte by byte, opened, resolved and
//! interpreted.

use pdf_ferrite::content::{interpret_page, EventCollector, TextRenderEvent};
use pdf_ferrite::decoders::{FilterPipeline, FilterSpec};
use pdf_ferrite::dict;
use pdf_ferrite::document::Document;
use pdf_ferrite::fonts::CMap;
use pdf_ferrite::geometry::Point;
use pdf_ferrite::object::{Dictionary, Object, ObjectRef, Stream};
use pdf_ferrite::xref::XRefEntry;

/// Assemble a PDF with a correct xref table from `(number, body)` pairs.
fn build_pdf(objects: &[(u32, &str)], trailer: &str) -> Vec<u8> {
    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (num, body) in objects {
        offsets.push((*num, out.len()));
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", num, body).as_bytes());
    }
    let xref_at = out.len();
    let size = objects.iter().map(|(n, _)| *n).max().unwrap_or(0) + 1;
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", size).as_bytes());
    for n in 1..size {
        match offsets.iter().find(|(num, _)| *num == n) {
            Some((_, off)) => out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes()),
            None => out.extend_from_slice(b"0000000000 65535 f \n"),
        }
    }
    out.extend_from_slice(
        format!("trailer\n<< /Size {} {} >>\nstartxref\n{}\n%%EOF\n", size, trailer, xref_at).as_bytes(),
    );
    out
}

fn one_page_pdf(content: &str, resources: &str, extra: &[(u32, &str)]) -> Vec<u8> {
    let page = format!("<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources {} /Contents 4 0 R >>", resources);
    let stream = format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content);
    let mut objects: Vec<(u32, &str)> = vec![
        (1, "<< /Type /Catalog /Pages 2 0 R >>"),
        (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
        (3, page.as_str()),
        (4, stream.as_str()),
    ];
    objects.extend_from_slice(extra);
    build_pdf(&objects, "/Root 1 0 R")
}

fn page_text_events(doc: &mut Document) -> Vec<TextRenderEvent> {
    let page = doc.page(0).unwrap();
    let mut collector = EventCollector::new();
    interpret_page(doc, &page, &mut [&mut collector]).unwrap();
    collector.text_events().cloned().collect()
}

const HELVETICA: &str = "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>";

#[test]
fn test_minimal_hello_world() {
    let data = one_page_pdf(
        "BT /F1 12 Tf 100 700 Td (Hello) Tj ET",
        "<< /Font << /F1 5 0 R >> >>",
        &[(5, HELVETICA)],
    );
    let mut doc = Document::from_bytes(data).unwrap();
    let events = page_text_events(&mut doc);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].unicode, "Hello");
    assert!(events[0].baseline.0.approx_eq(&Point::new(100.0, 700.0), 1e-9));
    assert!(doc.warnings().is_empty(), "{:?}", doc.warnings());
}

#[test]
fn test_incremental_update_newer_section_wins() {
    let mut data = build_pdf(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [] /Count 0 >>"),
            (7, "(first)"),
        ],
        "/Root 1 0 R",
    );
    let prev = data.windows(5).rposition(|w| w == b"xref\n").unwrap();

    let obj_at = data.len();
    data.extend_from_slice(b"7 0 obj\n(second)\nendobj\n");
    let xref_at = data.len();
    data.extend_from_slice(
        format!(
            "xref\n7 1\n{:010} 00000 n \ntrailer\n<< /Size 8 /Root 1 0 R /Prev {} >>\nstartxref\n{}\n%%EOF\n",
            obj_at, prev, xref_at
        )
        .as_bytes(),
    );

    let mut doc = Document::from_bytes(data).unwrap();
    let value = doc.resolve(ObjectRef::new(7, 0)).unwrap();
    assert_eq!(value.as_string().map(|s| s.as_bytes().to_vec()), Some(b"second".to_vec()));
    assert_eq!(doc.xref().section_offsets(), &[xref_at as u64, prev as u64]);
}

/// A file whose objects 20-23 live in object stream 12, indexed by an
/// xref stream with `/W [1 2 1]`.
fn object_stream_pdf() -> Vec<u8> {
    let body = "42 /Foo [1 2] << /Hit true >>";
    let header = "20 0 21 3 22 8 23 14 ";
    let objstm = format!(
        "<< /Type /ObjStm /N 4 /First {} /Length {} >>\nstream\n{}{}\nendstream",
        header.len(),
        header.len() + body.len(),
        header,
        body
    );

    let mut out = b"%PDF-1.5\n".to_vec();
    let mut offsets = Vec::new();
    for (num, text) in [
        (1u32, "<< /Type /Catalog /Pages 2 0 R >>".to_string()),
        (2, "<< /Type /Pages /Kids [] /Count 0 >>".to_string()),
        (12, objstm),
    ] {
        offsets.push((num, out.len()));
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", num, text).as_bytes());
    }
    let xref_at = out.len();
    offsets.push((13, xref_at));

    let mut rows = Vec::new();
    for n in 0..14u32 {
        match offsets.iter().find(|(num, _)| *num == n) {
            Some((_, off)) => rows.extend_from_slice(&[1, (off >> 8) as u8, *off as u8, 0]),
            None => rows.extend_from_slice(&[0, 0, 0, 0]),
        }
    }
    for index in 0..4u8 {
        rows.extend_from_slice(&[2, 0, 12, index]);
    }

    out.extend_from_slice(
        format!(
            "13 0 obj\n<< /Type /XRef /Size 24 /W [1 2 1] /Index [0 14 20 4] /Root 1 0 R /Length {} >>\nstream\n",
            rows.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&rows);
    out.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{}\n%%EOF\n", xref_at).as_bytes());
    out
}

#[test]
fn test_object_stream_resolution() {
    let mut doc = Document::from_bytes(object_stream_pdf()).unwrap();
    assert_eq!(doc.xref().get(23), Some(&XRefEntry::Compressed { stream: 12, index: 3 }));

    let hit = doc.resolve(ObjectRef::new(23, 0)).unwrap();
    assert_eq!(hit.as_dict().and_then(|d| d.get("Hit")).and_then(Object::as_bool), Some(true));
    let foo = doc.resolve(ObjectRef::new(21, 0)).unwrap();
    assert_eq!(foo.as_name_str(), Some("Foo"));
    assert_eq!(doc.resolve(ObjectRef::new(20, 0)).unwrap().as_integer(), Some(42));
}

#[test]
fn test_xref_stream_w_1_2_1() {
    let doc = Document::from_bytes(object_stream_pdf()).unwrap();
    assert!(matches!(doc.xref().get(1), Some(XRefEntry::InUse { offset: 9, generation: 0 })));
    assert!(matches!(doc.xref().get(5), Some(XRefEntry::Free { .. }) | None));
    assert!(!doc.is_reconstructed());
}

#[test]
fn test_filter_chain_round_trip() {
    let input = [0u8, 1, 2, 3, 4, 5, 6, 7];
    let dict = dict! {
        "Filter" => vec![Object::from("ASCII85Decode"), Object::from("FlateDecode")],
        "DecodeParms" => vec![Object::Null, Object::Dictionary(dict! { "Predictor" => 12, "Columns" => 4 })],
    };
    let stream = Stream::from_decoded(dict, &input).unwrap();
    assert_ne!(stream.raw_data().as_ref(), &input[..]);

    let pipeline = FilterPipeline::default();
    let decoded = pipeline.decode(stream.raw_data(), &stream.filters(), false).unwrap();
    assert_eq!(decoded.data, input);
    let encoded = pipeline.encode(&decoded.data, &stream.filters()).unwrap();
    assert_eq!(encoded, stream.raw_data().as_ref());

    // Fresh decode, without the memoized result
    let reread = Stream::new(stream.dict.clone(), stream.raw_data().clone());
    assert_eq!(reread.decoded_data().unwrap().as_ref(), &input[..]);
}

#[test]
fn test_to_unicode_cmap_text() {
    let cmap = "/CIDInit /ProcSet findresource begin 12 dict begin begincmap\n\
                1 begincodespacerange <00> <FF> endcodespacerange\n\
                1 beginbfchar <01> <0041> endbfchar\n\
                endcmap CMapName currentdict /CMap defineresource pop end end";
    let cmap_obj = format!("<< /Length {} >>\nstream\n{}\nendstream", cmap.len(), cmap);
    let data = one_page_pdf(
        "BT /F1 12 Tf <01> Tj ET",
        "<< /Font << /F1 5 0 R >> >>",
        &[
            (5, "<< /Type /Font /Subtype /Type1 /BaseFont /Custom /ToUnicode 6 0 R >>"),
            (6, cmap_obj.as_str()),
        ],
    );
    let mut doc = Document::from_bytes(data).unwrap();
    let events = page_text_events(&mut doc);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].unicode, "A");
    assert_eq!(events[0].raw_bytes, vec![0x01]);
}

#[test]
fn test_form_xobject_positioned_by_ctm_and_matrix() {
    let form = "<< /Type /XObject /Subtype /Form /BBox [0 0 200 200] /Matrix [2 0 0 2 10 10] /Length 12 >>\nstream\nBT (X) Tj ET\nendstream";
    let data = one_page_pdf(
        "q 1 0 0 1 100 200 cm /Fm1 Do Q",
        "<< /XObject << /Fm1 5 0 R >> >>",
        &[(5, form)],
    );
    let mut doc = Document::from_bytes(data).unwrap();
    let events = page_text_events(&mut doc);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].unicode, "X");
    // Form matrix then page CTM: (0,0) -> (10,10) -> (110,210)
    assert!(events[0].baseline.0.approx_eq(&Point::new(110.0, 210.0), 1e-9));
    // Text space is scaled by the form matrix
    assert_eq!(events[0].state.ctm.a, 2.0);
}

#[test]
fn test_stream_length_forward_reference() {
    let data = build_pdf(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [] /Count 0 >>"),
            (5, "<< /Length 6 0 R >>\nstream\nBT ET\nendstream"),
            (6, "5"),
        ],
        "/Root 1 0 R",
    );
    let mut doc = Document::from_bytes(data).unwrap();
    let stream = doc.resolve(ObjectRef::new(5, 0)).unwrap();
    let stream = stream.as_stream().unwrap();
    assert_eq!(stream.raw_data().as_ref(), b"BT ET");
    assert!(doc.warnings().is_empty());
}

#[test]
fn test_bfrange_sequential() {
    let cmap = CMap::parse(
        b"begincmap 1 begincodespacerange <0000> <FFFF> endcodespacerange\n\
          1 beginbfrange <0041> <0043> <0061> endbfrange endcmap",
    );
    assert_eq!(cmap.lookup(0x41), Some("a"));
    assert_eq!(cmap.lookup(0x42), Some("b"));
    assert_eq!(cmap.lookup(0x43), Some("c"));
    assert_eq!(cmap.lookup(0x44), None);
}

#[test]
fn test_tj_adjustment_in_document() {
    let data = one_page_pdf(
        "BT /F1 10 Tf [(He) -50 (llo)] TJ ET",
        "<< /Font << /F1 5 0 R >> >>",
        &[(5, HELVETICA)],
    );
    let mut doc = Document::from_bytes(data).unwrap();
    let events = page_text_events(&mut doc);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].unicode, "Hello");
    // Hello = 2278 units at 10pt, plus 50/1000 * 10 for the adjustment
    assert!((events[0].width() - (22.78 + 0.5)).abs() < 1e-9);
}

#[test]
fn test_rotated_ctm_baseline() {
    // Courier: every glyph is 600 units; 10 glyphs at 1000/60 pt span 100
    let size = 1000.0 / 60.0;
    let content = format!("0 1 -1 0 0 0 cm BT /F1 {} Tf (0123456789) Tj ET", size);
    let data = one_page_pdf(
        &content,
        "<< /Font << /F1 5 0 R >> >>",
        &[(5, "<< /Type /Font /Subtype /Type1 /BaseFont /Courier >>")],
    );
    let mut doc = Document::from_bytes(data).unwrap();
    let events = page_text_events(&mut doc);
    let (start, end) = events[0].baseline;
    assert!(start.approx_eq(&Point::new(0.0, 0.0), 1e-6));
    assert!(end.approx_eq(&Point::new(0.0, 100.0), 1e-6));
}

#[test]
fn test_one_text_event_per_showing_operator() {
    let data = one_page_pdf(
        "BT /F1 10 Tf 12 TL (a) Tj [(b) 10 (c)] TJ (d) ' 1 2 (e) \" ET",
        "<< /Font << /F1 5 0 R >> >>",
        &[(5, HELVETICA)],
    );
    let mut doc = Document::from_bytes(data).unwrap();
    let events = page_text_events(&mut doc);
    assert_eq!(events.len(), 4);
    let text: String = events.iter().map(|e| e.unicode.as_str()).collect();
    assert_eq!(text, "abcde");
    // ' and " move to the next line first
    assert_eq!(events[2].baseline.0.y, -12.0);
    assert_eq!(events[3].baseline.0.y, -24.0);
}

#[test]
fn test_unbalanced_save_warns_at_page_end() {
    let data = one_page_pdf("q q 1 0 0 1 5 5 cm Q", "<< >>", &[]);
    let mut doc = Document::from_bytes(data).unwrap();
    page_text_events(&mut doc);
    assert!(doc
        .warnings()
        .iter()
        .any(|w| w.kind == pdf_ferrite::error::WarningKind::UnbalancedSaveRestore));
}

#[test]
fn test_font_registry_caches_by_reference() {
    let data = one_page_pdf("", "<< >>", &[(5, HELVETICA)]);
    let mut doc = Document::from_bytes(data).unwrap();
    let reference = Object::Reference(ObjectRef::new(5, 0));
    let first = doc.load_font(&reference).unwrap();
    let second = doc.load_font(&reference).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(first.base_font(), "Helvetica");

    // Replacing the font object invalidates the registry
    doc.set_object(
        ObjectRef::new(5, 0),
        Object::Dictionary(dict! { "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Courier" }),
    );
    let third = doc.load_font(&reference).unwrap();
    assert_eq!(third.base_font(), "Courier");

    let direct: Dictionary = dict! { "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Symbol" };
    assert_eq!(doc.load_font(&Object::Dictionary(direct)).unwrap().base_font(), "Symbol");
}

#[test]
fn test_filter_spec_from_dict_keeps_null_params_aligned() {
    let dict = dict! {
        "Filter" => vec![Object::from("AHx"), Object::from("Fl")],
        "DecodeParms" => vec![Object::Null, Object::Dictionary(dict! { "Predictor" => 2 })],
    };
    let chain = FilterSpec::chain_from_dict(&dict);
    assert_eq!(chain.len(), 2);
    assert!(chain[0].params.is_none());
    assert!(chain[1].params.is_some());
}
