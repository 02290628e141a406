//! Metrics of the Standard 14 fonts.
//!
//! Widths are from the Adobe Core 14 AFM files, in 1/1000 em. Latin fonts are
//! keyed by glyph name (codes 32..=126 in WinAnsi order plus common
//! punctuation); Symbol and ZapfDingbats are keyed by their built-in codes.

use crate::fonts::encodings::{strip_subset_prefix, BaseEncoding};

/// The Standard 14 fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Standard14 {
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Symbol,
    ZapfDingbats,
}

const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722, 722, 667,
    611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667,
    667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500,
    222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, 975, 722, 722, 722, 722, 667,
    611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667,
    667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556,
    278, 889, 611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278, 500, 500, 500,
    500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444, 921, 722, 667, 667, 722, 611,
    556, 722, 722, 333, 389, 722, 611, 889, 722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722,
    722, 611, 333, 278, 333, 469, 500, 333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500,
    278, 778, 500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278, 500, 500, 500,
    500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500, 930, 722, 667, 722, 722, 667,
    611, 778, 778, 389, 500, 778, 667, 944, 722, 778, 611, 778, 722, 556, 667, 722, 722, 1000, 722,
    722, 667, 333, 278, 333, 581, 500, 333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556,
    278, 833, 556, 500, 556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

const TIMES_ITALIC: [u16; 95] = [
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278, 500, 500, 500,
    500, 500, 500, 500, 500, 500, 500, 333, 333, 675, 675, 675, 500, 920, 611, 611, 667, 722, 611,
    611, 722, 722, 333, 444, 667, 556, 833, 667, 722, 611, 722, 611, 500, 556, 722, 611, 833, 611,
    556, 556, 389, 278, 389, 422, 500, 333, 500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444,
    278, 722, 500, 500, 500, 500, 389, 389, 278, 500, 444, 667, 444, 444, 389, 400, 275, 400, 541,
];

const TIMES_BOLD_ITALIC: [u16; 95] = [
    250, 389, 555, 500, 500, 833, 778, 278, 333, 333, 500, 570, 250, 333, 250, 278, 500, 500, 500,
    500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500, 832, 667, 667, 667, 722, 667,
    667, 722, 778, 389, 500, 667, 611, 889, 722, 722, 611, 722, 667, 556, 611, 722, 667, 889, 667,
    611, 611, 333, 278, 333, 570, 500, 333, 500, 500, 444, 500, 444, 333, 500, 556, 278, 278, 500,
    278, 778, 556, 500, 500, 500, 389, 389, 278, 556, 444, 667, 500, 444, 389, 348, 220, 348, 570,
];

const SYMBOL: [u16; 95] = [
    250, 333, 713, 500, 549, 833, 778, 439, 333, 333, 500, 549, 250, 549, 250, 278, 500, 500, 500,
    500, 500, 500, 500, 500, 500, 500, 278, 278, 549, 549, 549, 444, 549, 722, 667, 722, 612, 611,
    763, 603, 722, 333, 631, 722, 686, 889, 722, 722, 768, 741, 556, 592, 611, 690, 439, 768, 645,
    795, 611, 333, 863, 333, 658, 500, 500, 631, 549, 549, 494, 439, 521, 411, 603, 329, 603, 549,
    549, 576, 521, 549, 549, 521, 549, 603, 439, 576, 713, 686, 493, 686, 494, 480, 200, 480, 549,
];

const ZAPF_DINGBATS: [u16; 95] = [
    278, 974, 961, 974, 980, 719, 789, 790, 791, 690, 960, 939, 549, 855, 911, 933, 911, 945, 974,
    755, 846, 762, 761, 571, 677, 763, 760, 759, 754, 494, 552, 537, 577, 692, 786, 788, 788, 790,
    793, 794, 816, 823, 789, 841, 823, 833, 816, 831, 923, 744, 723, 749, 790, 792, 695, 776, 768,
    792, 759, 707, 708, 682, 701, 826, 815, 789, 789, 707, 687, 696, 689, 786, 787, 713, 791, 785,
    791, 873, 761, 762, 762, 759, 759, 892, 892, 788, 784, 438, 138, 277, 415, 392, 392, 668, 668,
];

/// Punctuation outside ASCII: Helvetica, Helvetica-Bold, Times-Roman,
/// Times-Bold, Times-Italic, Times-BoldItalic.
const PUNCTUATION: [(&str, [u16; 6]); 9] = [
    ("quoteright", [222, 278, 333, 333, 333, 333]),
    ("quoteleft", [222, 278, 333, 333, 333, 333]),
    ("quotedblleft", [333, 500, 444, 500, 556, 500]),
    ("quotedblright", [333, 500, 444, 500, 556, 500]),
    ("bullet", [350, 350, 350, 350, 350, 350]),
    ("endash", [556, 556, 500, 500, 500, 500]),
    ("emdash", [1000, 1000, 1000, 1000, 889, 1000]),
    ("ellipsis", [1000, 1000, 1000, 1000, 889, 1000]),
    ("Euro", [556, 556, 500, 500, 500, 500]),
];

/// Diacritic suffixes whose accented glyph shares the base letter's advance.
const ACCENTS: [&str; 9] = [
    "acute",
    "grave",
    "circumflex",
    "dieresis",
    "tilde",
    "ring",
    "cedilla",
    "caron",
    "slash",
];

impl Standard14 {
    /// All fourteen fonts.
    pub const ALL: [Standard14; 14] = [
        Self::Courier,
        Self::CourierBold,
        Self::CourierOblique,
        Self::CourierBoldOblique,
        Self::Helvetica,
        Self::HelveticaBold,
        Self::HelveticaOblique,
        Self::HelveticaBoldOblique,
        Self::TimesRoman,
        Self::TimesBold,
        Self::TimesItalic,
        Self::TimesBoldItalic,
        Self::Symbol,
        Self::ZapfDingbats,
    ];

    /// PostScript name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Symbol => "Symbol",
            Self::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Match a `/BaseFont`, including subset tags and the common Windows
    /// aliases (`Arial,Bold`, `TimesNewRoman`, `CourierNew`).
    pub fn from_base_font(base_font: &str) -> Option<Self> {
        let name = strip_subset_prefix(base_font);
        if let Some(font) = Self::ALL.iter().find(|f| f.name() == name) {
            return Some(*font);
        }

        let compact: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | ','))
            .collect::<String>()
            .to_ascii_lowercase();
        let bold = compact.contains("bold");
        let italic = compact.contains("italic") || compact.contains("oblique");
        let family = if compact.starts_with("arial") || compact.starts_with("helvetica") {
            [Self::Helvetica, Self::HelveticaBold, Self::HelveticaOblique, Self::HelveticaBoldOblique]
        } else if compact.starts_with("times") {
            [Self::TimesRoman, Self::TimesBold, Self::TimesItalic, Self::TimesBoldItalic]
        } else if compact.starts_with("courier") {
            [Self::Courier, Self::CourierBold, Self::CourierOblique, Self::CourierBoldOblique]
        } else if compact.starts_with("symbol") {
            return Some(Self::Symbol);
        } else if compact.starts_with("zapfdingbats") || compact.starts_with("dingbats") {
            return Some(Self::ZapfDingbats);
        } else {
            return None;
        };
        Some(family[usize::from(bold) + 2 * usize::from(italic)])
    }

    /// True for the fonts with a built-in non-Latin encoding.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Self::Symbol | Self::ZapfDingbats)
    }

    /// True for the Courier family.
    pub fn is_fixed_pitch(&self) -> bool {
        matches!(
            self,
            Self::Courier | Self::CourierBold | Self::CourierOblique | Self::CourierBoldOblique
        )
    }

    /// Encoding used when the font dictionary gives none.
    pub fn builtin_encoding(&self) -> BaseEncoding {
        match self {
            Self::Symbol => BaseEncoding::Symbol,
            Self::ZapfDingbats => BaseEncoding::ZapfDingbats,
            _ => BaseEncoding::Standard,
        }
    }

    fn latin_table(&self) -> Option<(&'static [u16; 95], usize)> {
        match self {
            Self::Helvetica | Self::HelveticaOblique => Some((&HELVETICA, 0)),
            Self::HelveticaBold | Self::HelveticaBoldOblique => Some((&HELVETICA_BOLD, 1)),
            Self::TimesRoman => Some((&TIMES_ROMAN, 2)),
            Self::TimesBold => Some((&TIMES_BOLD, 3)),
            Self::TimesItalic => Some((&TIMES_ITALIC, 4)),
            Self::TimesBoldItalic => Some((&TIMES_BOLD_ITALIC, 5)),
            _ => None,
        }
    }

    /// Advance width of a glyph, by name.
    ///
    /// ```
    /// use pdf_ferrite::fonts::metrics::Standard14;
    ///
    /// assert_eq!(Standard14::Helvetica.glyph_width("space"), Some(278.0));
    /// assert_eq!(Standard14::TimesRoman.glyph_width("eacute"), Some(444.0));
    /// assert_eq!(Standard14::Courier.glyph_width("anything"), Some(600.0));
    /// ```
    pub fn glyph_width(&self, glyph: &str) -> Option<f64> {
        if self.is_fixed_pitch() {
            return Some(600.0);
        }
        if self.is_symbolic() {
            let code = match self {
                Self::Symbol => symbol_code_for_glyph(glyph)?,
                _ => return None,
            };
            return self.code_width(code);
        }
        let (table, column) = self.latin_table()?;
        if let Some(pos) = ascii_position(glyph) {
            return Some(f64::from(table[pos]));
        }
        if let Some((_, widths)) = PUNCTUATION.iter().find(|(name, _)| *name == glyph) {
            return Some(f64::from(widths[column]));
        }
        ACCENTS
            .iter()
            .find_map(|accent| glyph.strip_suffix(accent))
            .filter(|base| base.len() == 1)
            .and_then(ascii_position)
            .map(|pos| f64::from(table[pos]))
    }

    /// Advance width by character code in the font's built-in encoding.
    pub fn code_width(&self, code: u8) -> Option<f64> {
        let index = usize::from(code.checked_sub(0x20)?);
        match self {
            Self::Symbol => SYMBOL.get(index).map(|w| f64::from(*w)),
            Self::ZapfDingbats => ZAPF_DINGBATS.get(index).map(|w| f64::from(*w)),
            _ => {
                let glyph = BaseEncoding::Standard.glyph_name(code)?;
                self.glyph_width(glyph)
            },
        }
    }

    /// Width of the space glyph.
    pub fn space_width(&self) -> f64 {
        self.code_width(0x20).unwrap_or(278.0)
    }
}

fn ascii_position(glyph: &str) -> Option<usize> {
    (0x20..=0x7Eu8)
        .position(|code| BaseEncoding::WinAnsi.glyph_name(code) == Some(glyph))
}

/// Codes 0x20..=0x7E of the Symbol font whose glyph names are the plain
/// ASCII ones.
fn symbol_code_for_glyph(glyph: &str) -> Option<u8> {
    let code = BaseEncoding::WinAnsi.code_for_glyph(glyph)?;
    let plain = matches!(code, 0x20 | 0x21 | 0x23 | 0x25 | 0x26 | 0x28..=0x29 | 0x2B | 0x2C | 0x2E..=0x3F | 0x5B | 0x5D | 0x5F | 0x7B..=0x7D);
    plain.then_some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_names() {
        for font in Standard14::ALL {
            assert_eq!(Standard14::from_base_font(font.name()), Some(font));
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(Standard14::from_base_font("Arial"), Some(Standard14::Helvetica));
        assert_eq!(Standard14::from_base_font("Arial,BoldItalic"), Some(Standard14::HelveticaBoldOblique));
        assert_eq!(Standard14::from_base_font("TimesNewRomanPS-BoldMT"), Some(Standard14::TimesBold));
        assert_eq!(Standard14::from_base_font("ABCDEF+CourierNew,Italic"), Some(Standard14::CourierOblique));
        assert_eq!(Standard14::from_base_font("Calibri"), None);
    }

    #[test]
    fn test_helvetica_widths() {
        let font = Standard14::Helvetica;
        assert_eq!(font.glyph_width("A"), Some(667.0));
        assert_eq!(font.glyph_width("quotesingle"), Some(191.0));
        assert_eq!(font.glyph_width("quoteright"), Some(222.0));
        assert_eq!(font.code_width(0x27), Some(222.0));
        assert_eq!(font.glyph_width("W"), Some(944.0));
        assert_eq!(font.glyph_width("unknownglyph"), None);
    }

    #[test]
    fn test_bold_and_italic_columns() {
        assert_eq!(Standard14::HelveticaBold.glyph_width("quotedblleft"), Some(500.0));
        assert_eq!(Standard14::TimesItalic.glyph_width("emdash"), Some(889.0));
        assert_eq!(Standard14::TimesBold.glyph_width("W"), Some(1000.0));
    }

    #[test]
    fn test_space_widths() {
        assert_eq!(Standard14::Helvetica.space_width(), 278.0);
        assert_eq!(Standard14::TimesRoman.space_width(), 250.0);
        assert_eq!(Standard14::Courier.space_width(), 600.0);
        assert_eq!(Standard14::ZapfDingbats.space_width(), 278.0);
    }

    #[test]
    fn test_symbolic_fonts_by_code() {
        assert_eq!(Standard14::Symbol.code_width(0x61), Some(631.0));
        assert_eq!(Standard14::ZapfDingbats.code_width(0x21), Some(974.0));
        assert_eq!(Standard14::Symbol.glyph_width("parenleft"), Some(333.0));
        assert!(Standard14::Symbol.builtin_encoding() == BaseEncoding::Symbol);
    }
}
