//! Embedded font programs.
//!
//! The font subsystem only needs one thing from an embedded font file: the
//! advance width of each named glyph. [`FontProgram`] is the seam for that;
//! [`TrueTypeProgram`] implements it for `FontFile2` (and OpenType
//! `FontFile3`) data with `ttf-parser`.

use std::collections::HashMap;

use ttf_parser::{Face, GlyphId};

use crate::fonts::glyph_list::unicode_to_glyph;

/// Error types for font program parsing.
#[derive(Debug, thiserror::Error)]
pub enum FontProgramError {
    /// Failed to parse font file
    #[error("Failed to parse font file: {0}")]
    ParseError(String),

    /// Font file is empty
    #[error("Font file is empty")]
    EmptyFont,

    /// The program kind is not handled by this loader
    #[error("Unsupported font program: {0:?}")]
    Unsupported(FontFileKind),
}

/// Which `/FontDescriptor` key held the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFileKind {
    /// `/FontFile`: Type 1
    Type1,
    /// `/FontFile2`: TrueType
    TrueType,
    /// `/FontFile3` with `/Subtype /OpenType`
    OpenType,
    /// `/FontFile3` with `/Subtype /Type1C` or `/CIDFontType0C`
    Cff,
}

/// Glyph name to advance width in 1/1000 em.
pub type GlyphWidths = HashMap<String, f64>;

/// Loader for embedded font files.
pub trait FontProgram: Send + Sync {
    /// Glyph-name to width map for an embedded font file.
    fn glyph_widths(&self, kind: FontFileKind, data: &[u8]) -> Result<GlyphWidths, FontProgramError>;
}

/// [`FontProgram`] for sfnt-wrapped fonts, built on `ttf-parser`.
///
/// Glyph names come from the `post` table. Fonts without glyph names
/// (`post` format 3) are named through their Unicode `cmap` subtable, using
/// the glyph list or `uniXXXX` names.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrueTypeProgram;

impl FontProgram for TrueTypeProgram {
    fn glyph_widths(&self, kind: FontFileKind, data: &[u8]) -> Result<GlyphWidths, FontProgramError> {
        if !matches!(kind, FontFileKind::TrueType | FontFileKind::OpenType) {
            return Err(FontProgramError::Unsupported(kind));
        }
        if data.is_empty() {
            return Err(FontProgramError::EmptyFont);
        }
        let face = Face::parse(data, 0).map_err(|e| FontProgramError::ParseError(e.to_string()))?;
        let units_per_em = f64::from(face.units_per_em().max(1));
        let scale = |advance: u16| f64::from(advance) * 1000.0 / units_per_em;

        let mut widths = GlyphWidths::new();
        for id in 0..face.number_of_glyphs() {
            let glyph = GlyphId(id);
            if let (Some(name), Some(advance)) = (face.glyph_name(glyph), face.glyph_hor_advance(glyph)) {
                widths.insert(name.to_string(), scale(advance));
            }
        }

        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables.into_iter().filter(|s| s.is_unicode()) {
                subtable.codepoints(|cp| {
                    let Some(ch) = char::from_u32(cp) else { return };
                    let Some(glyph) = subtable.glyph_index(cp) else { return };
                    let Some(advance) = face.glyph_hor_advance(glyph) else { return };
                    let name = unicode_to_glyph(ch)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("uni{:04X}", cp));
                    widths.entry(name).or_insert_with(|| scale(advance));
                });
            }
        }

        log::debug!("Font program: {} glyph widths", widths.len());
        Ok(widths)
    }
}
