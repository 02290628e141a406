use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pdf_ferrite::content::{interpret_page, parse_content_stream, EventCollector};
use pdf_ferrite::dict;
use pdf_ferrite::document::Document;
use pdf_ferrite::geometry::Rect;
use pdf_ferrite::lexer::Lexer;
use pdf_ferrite::object::{Dictionary, Object};
use pdf_ferrite::writer::{PdfWriter, WriterOptions};

fn text_content(lines: usize) -> Vec<u8> {
    let mut content = b"BT /F1 10 Tf 12 TL 72 720 Td\n".to_vec();
    for i in 0..lines {
        content.extend_from_slice(format!("[(Line {}) -120 (of sample text)] TJ T*\n", i).as_bytes());
    }
    content.extend_from_slice(b"ET\n");
    content
}

fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::new();
    let font = doc.add_object(Object::Dictionary(dict! {
        "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica"
    })).unwrap();
    let resources: Dictionary = dict! { "Font" => dict! { "F1" => font } };
    let content = text_content(50);
    for _ in 0..pages {
        doc.add_page(Rect::new(0.0, 0.0, 612.0, 792.0), resources.clone(), &content)
            .unwrap();
    }
    let writer = PdfWriter::with_options(WriterOptions::default().with_compress_streams(true));
    writer.to_bytes(&mut doc).unwrap()
}

fn bench_lexer(c: &mut Criterion) {
    let content = text_content(200);
    let mut group = c.benchmark_group("lexer");
    group.bench_function("tokens", |b| {
        b.iter(|| {
            let mut lexer = Lexer::new(black_box(&content));
            let mut count = 0usize;
            while let Ok(Some(_)) = lexer.next_significant() {
                count += 1;
            }
            count
        })
    });
    group.bench_function("content_operations", |b| {
        b.iter(|| parse_content_stream(black_box(&content)).unwrap().len())
    });
    group.finish();
}

fn bench_open_and_interpret(c: &mut Criterion) {
    let bytes = sample_pdf(20);
    let mut group = c.benchmark_group("document");
    group.bench_function("open", |b| b.iter(|| Document::from_bytes(black_box(bytes.clone())).unwrap()));
    group.bench_function("interpret_all_pages", |b| {
        b.iter(|| {
            let mut doc = Document::from_bytes(bytes.clone()).unwrap();
            let mut chars = 0usize;
            for page in doc.pages().unwrap() {
                let mut collector = EventCollector::new();
                interpret_page(&mut doc, &page, &mut [&mut collector]).unwrap();
                chars += collector.text().len();
            }
            chars
        })
    });
    group.finish();
}

fn bench_save(c: &mut Criterion) {
    let bytes = sample_pdf(20);
    let mut doc = Document::from_bytes(bytes).unwrap();
    let writer = PdfWriter::new();
    c.bench_function("writer/full_save", |b| b.iter(|| writer.to_bytes(&mut doc).unwrap().len()));
}

criterion_group!(benches, bench_lexer, bench_open_and_interpret, bench_save);
criterion_main!(benches);
