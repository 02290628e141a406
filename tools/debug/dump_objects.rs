//! Debug tool that prints a PDF's cross-reference entries and the
//! interpreter events of each page.
//!
//! Usage: `dump_objects <pdf_file> [--objects]`. Set `RUST_LOG=debug` for
//! parser and interpreter logging.

use std::env;

use pdf_ferrite::content::{
    interpret_page, ColorChangeEvent, EventListener, ImageRenderEvent, LineRenderEvent, MarkedContentEvent,
    PathRenderEvent, TextRenderEvent,
};
use pdf_ferrite::document::Document;
use pdf_ferrite::error::Result;
use pdf_ferrite::object::ObjectRef;
use pdf_ferrite::writer::ObjectSerializer;
use pdf_ferrite::xref::XRefEntry;

struct Printer;

impl EventListener for Printer {
    fn on_text(&mut self, e: &TextRenderEvent) {
        let (start, end) = e.baseline;
        println!(
            "  text  ({:8.2},{:8.2})-({:8.2},{:8.2}) {:?}",
            start.x, start.y, end.x, end.y, e.unicode
        );
    }

    fn on_image(&mut self, e: &ImageRenderEvent) {
        let b = e.bounds();
        let name = e.name.as_ref().map(|n| n.to_string()).unwrap_or_else(|| "inline".to_string());
        println!(
            "  image {} {}x{} at ({:.2},{:.2}) {:.2}x{:.2}",
            name,
            e.width().unwrap_or(0),
            e.height().unwrap_or(0),
            b.x,
            b.y,
            b.width,
            b.height
        );
    }

    fn on_line(&mut self, e: &LineRenderEvent) {
        println!(
            "  line  ({:.2},{:.2})-({:.2},{:.2}) w={}",
            e.start.x, e.start.y, e.end.x, e.end.y, e.line_width
        );
    }

    fn on_path(&mut self, e: &PathRenderEvent) {
        println!("  path  {:?} {:?} {} subpaths", e.paint, e.fill_rule, e.subpaths.len());
    }

    fn on_color_change(&mut self, e: &ColorChangeEvent) {
        let which = if e.stroke { "stroke" } else { "fill" };
        println!("  color {} {} {:?}", which, e.color.space.family(), e.color.components);
    }

    fn on_marked_content(&mut self, e: &MarkedContentEvent) {
        println!("  mark  {:?}", e);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <pdf_file> [--objects]", args[0]);
        std::process::exit(1);
    }
    let show_objects = args.iter().any(|a| a == "--objects");

    let mut doc = Document::from_bytes(std::fs::read(&args[1])?)?;
    let (major, minor) = doc.version();
    println!("PDF {}.{}{}", major, minor, if doc.is_reconstructed() { " (xref reconstructed)" } else { "" });

    println!("=== Cross-reference ({} entries) ===", doc.xref().len());
    let entries: Vec<(u32, XRefEntry)> = doc.xref().iter().map(|(n, e)| (n, *e)).collect();
    for (num, entry) in &entries {
        match entry {
            XRefEntry::Free { next_free, generation } => println!("{:6} free  next={} gen={}", num, next_free, generation),
            XRefEntry::InUse { offset, generation } => println!("{:6} inuse offset={} gen={}", num, offset, generation),
            XRefEntry::Compressed { stream, index } => println!("{:6} objstm stream={} index={}", num, stream, index),
        }
    }
    println!("trailer {}", ObjectSerializer::compact().serialize_to_string(&doc.trailer().clone().into()));

    if show_objects {
        let serializer = ObjectSerializer::new();
        for (num, entry) in entries.iter().filter(|(_, e)| e.is_in_use()) {
            let reference = ObjectRef::new(*num, entry.generation());
            match doc.resolve(reference) {
                Ok(obj) => {
                    // Stream payloads are summarized, not printed
                    let text = match obj.as_stream() {
                        Some(s) => format!("stream {} ({} bytes)", s.dict.len(), s.raw_data().len()),
                        None => serializer.serialize_to_string(&obj),
                    };
                    println!("{} {} obj {}", reference.id, reference.gen, text);
                },
                Err(e) => println!("{} {} obj <error: {}>", reference.id, reference.gen, e),
            }
        }
    }

    for page in doc.pages()? {
        println!("=== Page {} ({}) ===", page.index + 1, page.reference);
        if let Err(e) = interpret_page(&mut doc, &page, &mut [&mut Printer]) {
            println!("  error: {}", e);
        }
    }

    if !doc.warnings().is_empty() {
        println!("=== Warnings ===");
        for warning in doc.warnings() {
            println!("{}", warning);
        }
    }
    Ok(())
}
