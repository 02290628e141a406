//! PDF writing.
//!
//! ## Architecture
//!
//! ```text
//! Document (object graph, dirty set)
//!     ↓
//! [PdfWriter] (header, body, xref table or stream, trailer)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use pdf_ferrite::document::Document;
//! use pdf_ferrite::writer;
//!
//! let mut doc = Document::from_bytes(std::fs::read("in.pdf")?)?;
//! doc.set_info("Title", pdf_ferrite::object::PdfString::from_text("Edited"))?;
//!
//! let mut out = Vec::new();
//! writer::save_incremental(&mut doc, &mut out)?;
//! std::fs::write("out.pdf", out)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod object_serializer;
mod pdf_writer;

pub use object_serializer::{format_real, write_name, write_real, write_string, ObjectSerializer};
pub use pdf_writer::{save, save_incremental, PdfWriter, WriterOptions, XrefMode};
