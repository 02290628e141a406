//! Fonts and encodings.
//!
//! Maps the bytes of text-showing operators to character codes, Unicode text
//! and glyph advances: predefined encodings and `/Differences`, the glyph
//! list, CMaps (`ToUnicode` and Type0 encodings), Standard 14 metrics and
//! embedded font programs.

pub mod cmap;
pub mod encodings;
pub mod font;
pub mod glyph_list;
pub mod metrics;
pub mod truetype_parser;

pub use cmap::CMap;
pub use encodings::{BaseEncoding, Encoding};
pub use font::{FontFlags, FontKind, Glyph, PdfFont};
pub use metrics::Standard14;
pub use truetype_parser::{FontFileKind, FontProgram, TrueTypeProgram};
