// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::wrong_self_convention)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::redundant_guards)]
#![allow(clippy::match_like_matches_macro)]
#![allow(clippy::while_let_on_iterator)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]
#![cfg_attr(test, allow(unused_variables))]

//! # PDF Ferrite
//!
//! A PDF read/write engine: parses PDF 1.4–1.7 files into an object graph,
//! interprets page content streams into text, image and path events, and
//! serializes the graph back to conformant bytes.
//!
//! ## Reading
//! - **Tolerant parsing**: bare-CR line endings, wrong `/Length`, missing
//!   `%%EOF`, broken cross-reference offsets (rebuilt by scanning the file)
//! - **Cross-reference tables and streams**, incremental updates through
//!   `/Prev`, hybrid files, object streams
//! - **Filters**: FlateDecode, LZWDecode, ASCIIHexDecode, ASCII85Decode,
//!   RunLengthDecode and PNG/TIFF predictors; image codecs are pluggable
//! - **Warnings**: every recovery is recorded on the [`document::Document`]
//!
//! ## Interpreting
//! - **Fonts**: simple encodings, `/Differences`, the Adobe Glyph List,
//!   `ToUnicode` and Type0 CMaps, Standard 14 metrics, embedded TrueType
//! - **Events**: [`content::EventListener`] receives text with baselines,
//!   images, stroked segments, filled paths, color changes and marked
//!   content, in content stream order
//!
//! ## Writing
//! - **Full saves** with a table or stream cross-reference section
//! - **Incremental saves** that append only what changed
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_ferrite::content::EventCollector;
//! use pdf_ferrite::document::Document;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = Document::from_bytes(std::fs::read("paper.pdf")?)?;
//! for page in doc.pages()? {
//!     let mut collector = EventCollector::new();
//!     pdf_ferrite::content::interpret_page(&mut doc, &page, &mut [&mut collector])?;
//!     println!("{}", collector.text());
//! }
//! for warning in doc.warnings() {
//!     eprintln!("{}", warning);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Core PDF parsing
pub mod document;
pub mod lexer;
pub mod object;
pub mod objstm;
pub mod parser;
/// Parser configuration options
pub mod parser_config;
pub mod source;
pub mod xref;
pub mod xref_reconstruction;

// Stream decoders
pub mod decoders;

// Geometry primitives
pub mod geometry;

// Content interpretation
pub mod content;
pub mod fonts;

// PDF writing
pub mod writer;

// Re-exports
pub use document::{Document, Page};
pub use error::{Error, Result, Warning, WarningKind};
pub use object::{Dictionary, Name, Object, ObjectRef, PdfString, Stream};
pub use parser_config::ParserOptions;

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
