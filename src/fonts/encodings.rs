//! Predefined single-byte encodings.
//!
//! Latin encodings (Standard, WinAnsi, MacRoman, MacExpert) are tables of
//! glyph names so that `/Differences` and font metrics can work in glyph
//! space; Unicode is reached through the glyph list. Symbol, ZapfDingbats
//! and PDFDocEncoding map codes to Unicode directly.

use std::collections::BTreeMap;

use lazy_static::lazy_static;

use crate::fonts::glyph_list::glyph_to_unicode;
use crate::object::Object;

/// Glyph names for 0x20..=0x7E shared by Standard, WinAnsi and MacRoman.
const ASCII_NAMES: [&str; 95] = [
    "space", "exclam", "quotedbl", "numbersign", "dollar", "percent", "ampersand", "quotesingle",
    "parenleft", "parenright", "asterisk", "plus", "comma", "hyphen", "period", "slash", "zero",
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "colon", "semicolon",
    "less", "equal", "greater", "question", "at", "A", "B", "C", "D", "E", "F", "G", "H", "I", "J",
    "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z", "bracketleft",
    "backslash", "bracketright", "asciicircum", "underscore", "grave", "a", "b", "c", "d", "e",
    "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x",
    "y", "z", "braceleft", "bar", "braceright", "asciitilde",
];

/// ISO Latin-1 glyph names for 0xA0..=0xFF as used by WinAnsiEncoding.
const LATIN1_NAMES: [&str; 96] = [
    "space", "exclamdown", "cent", "sterling", "currency", "yen", "brokenbar", "section",
    "dieresis", "copyright", "ordfeminine", "guillemotleft", "logicalnot", "hyphen", "registered",
    "macron", "degree", "plusminus", "twosuperior", "threesuperior", "acute", "mu", "paragraph",
    "periodcentered", "cedilla", "onesuperior", "ordmasculine", "guillemotright", "onequarter",
    "onehalf", "threequarters", "questiondown", "Agrave", "Aacute", "Acircumflex", "Atilde",
    "Adieresis", "Aring", "AE", "Ccedilla", "Egrave", "Eacute", "Ecircumflex", "Edieresis",
    "Igrave", "Iacute", "Icircumflex", "Idieresis", "Eth", "Ntilde", "Ograve", "Oacute",
    "Ocircumflex", "Otilde", "Odieresis", "multiply", "Oslash", "Ugrave", "Uacute", "Ucircumflex",
    "Udieresis", "Yacute", "Thorn", "germandbls", "agrave", "aacute", "acircumflex", "atilde",
    "adieresis", "aring", "ae", "ccedilla", "egrave", "eacute", "ecircumflex", "edieresis",
    "igrave", "iacute", "icircumflex", "idieresis", "eth", "ntilde", "ograve", "oacute",
    "ocircumflex", "otilde", "odieresis", "divide", "oslash", "ugrave", "uacute", "ucircumflex",
    "udieresis", "yacute", "thorn", "ydieresis",
];

const WIN_ANSI_HIGH: [(u8, &str); 27] = [
    (0x80, "Euro"),
    (0x82, "quotesinglbase"),
    (0x83, "florin"),
    (0x84, "quotedblbase"),
    (0x85, "ellipsis"),
    (0x86, "dagger"),
    (0x87, "daggerdbl"),
    (0x88, "circumflex"),
    (0x89, "perthousand"),
    (0x8A, "Scaron"),
    (0x8B, "guilsinglleft"),
    (0x8C, "OE"),
    (0x8E, "Zcaron"),
    (0x91, "quoteleft"),
    (0x92, "quoteright"),
    (0x93, "quotedblleft"),
    (0x94, "quotedblright"),
    (0x95, "bullet"),
    (0x96, "endash"),
    (0x97, "emdash"),
    (0x98, "tilde"),
    (0x99, "trademark"),
    (0x9A, "scaron"),
    (0x9B, "guilsinglright"),
    (0x9C, "oe"),
    (0x9E, "zcaron"),
    (0x9F, "Ydieresis"),
];

const STANDARD_HIGH: [(u8, &str); 58] = [
    (0x27, "quoteright"),
    (0x60, "quoteleft"),
    (0xA1, "exclamdown"),
    (0xA2, "cent"),
    (0xA3, "sterling"),
    (0xA4, "fraction"),
    (0xA5, "yen"),
    (0xA6, "florin"),
    (0xA7, "section"),
    (0xA8, "currency"),
    (0xA9, "quotesingle"),
    (0xAA, "quotedblleft"),
    (0xAB, "guillemotleft"),
    (0xAC, "guilsinglleft"),
    (0xAD, "guilsinglright"),
    (0xAE, "fi"),
    (0xAF, "fl"),
    (0xB1, "endash"),
    (0xB2, "dagger"),
    (0xB3, "daggerdbl"),
    (0xB4, "periodcentered"),
    (0xB6, "paragraph"),
    (0xB7, "bullet"),
    (0xB8, "quotesinglbase"),
    (0xB9, "quotedblbase"),
    (0xBA, "quotedblright"),
    (0xBB, "guillemotright"),
    (0xBC, "ellipsis"),
    (0xBD, "perthousand"),
    (0xBF, "questiondown"),
    (0xC1, "grave"),
    (0xC2, "acute"),
    (0xC3, "circumflex"),
    (0xC4, "tilde"),
    (0xC5, "macron"),
    (0xC6, "breve"),
    (0xC7, "dotaccent"),
    (0xC8, "dieresis"),
    (0xCA, "ring"),
    (0xCB, "cedilla"),
    (0xCD, "hungarumlaut"),
    (0xCE, "ogonek"),
    (0xCF, "caron"),
    (0xD0, "emdash"),
    (0xE1, "AE"),
    (0xE3, "ordfeminine"),
    (0xE8, "Lslash"),
    (0xE9, "Oslash"),
    (0xEA, "OE"),
    (0xEB, "ordmasculine"),
    (0xF1, "ae"),
    (0xF5, "dotlessi"),
    (0xF8, "lslash"),
    (0xF9, "oslash"),
    (0xFA, "oe"),
    (0xFB, "germandbls"),
    (0xF0, ""),
    (0xFF, ""),
];

const MAC_ROMAN_HIGH: [&str; 128] = [
    "Adieresis", "Aring", "Ccedilla", "Eacute", "Ntilde", "Odieresis", "Udieresis", "aacute",
    "agrave", "acircumflex", "adieresis", "atilde", "aring", "ccedilla", "eacute", "egrave",
    "ecircumflex", "edieresis", "iacute", "igrave", "icircumflex", "idieresis", "ntilde", "oacute",
    "ograve", "ocircumflex", "odieresis", "otilde", "uacute", "ugrave", "ucircumflex", "udieresis",
    "dagger", "degree", "cent", "sterling", "section", "bullet", "paragraph", "germandbls",
    "registered", "copyright", "trademark", "acute", "dieresis", "notequal", "AE", "Oslash",
    "infinity", "plusminus", "lessequal", "greaterequal", "yen", "mu", "partialdiff", "summation",
    "product", "pi", "integral", "ordfeminine", "ordmasculine", "Omega", "ae", "oslash",
    "questiondown", "exclamdown", "logicalnot", "radical", "florin", "approxequal", "Delta",
    "guillemotleft", "guillemotright", "ellipsis", "space", "Agrave", "Atilde", "Otilde", "OE",
    "oe", "endash", "emdash", "quotedblleft", "quotedblright", "quoteleft", "quoteright", "divide",
    "lozenge", "ydieresis", "Ydieresis", "fraction", "currency", "guilsinglleft", "guilsinglright",
    "fi", "fl", "daggerdbl", "periodcentered", "quotesinglbase", "quotedblbase", "perthousand",
    "Acircumflex", "Ecircumflex", "Aacute", "Edieresis", "Egrave", "Iacute", "Icircumflex",
    "Idieresis", "Igrave", "Oacute", "Ocircumflex", "apple", "Ograve", "Uacute", "Ucircumflex",
    "Ugrave", "dotlessi", "circumflex", "tilde", "macron", "breve", "dotaccent", "ring", "cedilla",
    "hungarumlaut", "ogonek", "caron",
];

/// MacExpertEncoding, lower half only.
const MAC_EXPERT: [(u8, &str); 86] = [
    (0x20, "space"),
    (0x21, "exclamsmall"),
    (0x22, "Hungarumlautsmall"),
    (0x23, "centoldstyle"),
    (0x24, "dollaroldstyle"),
    (0x25, "dollarsuperior"),
    (0x26, "ampersandsmall"),
    (0x27, "Acutesmall"),
    (0x28, "parenleftsuperior"),
    (0x29, "parenrightsuperior"),
    (0x2A, "twodotenleader"),
    (0x2B, "onedotenleader"),
    (0x2C, "comma"),
    (0x2D, "hyphen"),
    (0x2E, "period"),
    (0x2F, "fraction"),
    (0x30, "zerooldstyle"),
    (0x31, "oneoldstyle"),
    (0x32, "twooldstyle"),
    (0x33, "threeoldstyle"),
    (0x34, "fouroldstyle"),
    (0x35, "fiveoldstyle"),
    (0x36, "sixoldstyle"),
    (0x37, "sevenoldstyle"),
    (0x38, "eightoldstyle"),
    (0x39, "nineoldstyle"),
    (0x3A, "colon"),
    (0x3B, "semicolon"),
    (0x3D, "threequartersemdash"),
    (0x3F, "questionsmall"),
    (0x44, "Ethsmall"),
    (0x47, "onequarter"),
    (0x48, "onehalf"),
    (0x49, "threequarters"),
    (0x4A, "oneeighth"),
    (0x4B, "threeeighths"),
    (0x4C, "fiveeighths"),
    (0x4D, "seveneighths"),
    (0x4E, "onethird"),
    (0x4F, "twothirds"),
    (0x56, "ff"),
    (0x57, "fi"),
    (0x58, "fl"),
    (0x59, "ffi"),
    (0x5A, "ffl"),
    (0x5B, "parenleftinferior"),
    (0x5D, "parenrightinferior"),
    (0x5E, "Circumflexsmall"),
    (0x5F, "hypheninferior"),
    (0x60, "Gravesmall"),
    (0x61, "Asmall"),
    (0x62, "Bsmall"),
    (0x63, "Csmall"),
    (0x64, "Dsmall"),
    (0x65, "Esmall"),
    (0x66, "Fsmall"),
    (0x67, "Gsmall"),
    (0x68, "Hsmall"),
    (0x69, "Ismall"),
    (0x6A, "Jsmall"),
    (0x6B, "Ksmall"),
    (0x6C, "Lsmall"),
    (0x6D, "Msmall"),
    (0x6E, "Nsmall"),
    (0x6F, "Osmall"),
    (0x70, "Psmall"),
    (0x71, "Qsmall"),
    (0x72, "Rsmall"),
    (0x73, "Ssmall"),
    (0x74, "Tsmall"),
    (0x75, "Usmall"),
    (0x76, "Vsmall"),
    (0x77, "Wsmall"),
    (0x78, "Xsmall"),
    (0x79, "Ysmall"),
    (0x7A, "Zsmall"),
    (0x7B, "colonmonetary"),
    (0x7C, "onefitted"),
    (0x7D, "rupiah"),
    (0x7E, "Tildesmall"),
    (0xD0, ""),
    (0xD1, ""),
    (0xE0, ""),
    (0xF0, ""),
    (0xFE, ""),
    (0xFF, ""),
];

type NameTable = [Option<&'static str>; 256];

fn build_table(ascii: bool, latin1: bool, overrides: &[(u8, &'static str)]) -> NameTable {
    let mut table: NameTable = [None; 256];
    if ascii {
        for (i, name) in ASCII_NAMES.iter().enumerate() {
            table[0x20 + i] = Some(*name);
        }
    }
    if latin1 {
        for (i, name) in LATIN1_NAMES.iter().enumerate() {
            table[0xA0 + i] = Some(*name);
        }
    }
    for (code, name) in overrides {
        table[*code as usize] = if name.is_empty() { None } else { Some(*name) };
    }
    table
}

lazy_static! {
    static ref STANDARD_TABLE: NameTable = build_table(true, false, &STANDARD_HIGH);
    static ref WIN_ANSI_TABLE: NameTable = build_table(true, true, &WIN_ANSI_HIGH);
    static ref MAC_ROMAN_TABLE: NameTable = {
        let mut table = build_table(true, false, &[]);
        for (i, name) in MAC_ROMAN_HIGH.iter().enumerate() {
            table[0x80 + i] = Some(*name);
        }
        table
    };
    static ref MAC_EXPERT_TABLE: NameTable = build_table(false, false, &MAC_EXPERT);
}

/// A predefined simple-font encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseEncoding {
    /// Adobe StandardEncoding, the default for Type 1 fonts
    Standard,
    /// Windows code page 1252 layout
    WinAnsi,
    /// Mac OS Roman layout
    MacRoman,
    /// Expert glyph set (small caps, old-style figures)
    MacExpert,
    /// Built-in encoding of the Symbol font
    Symbol,
    /// Built-in encoding of the ZapfDingbats font
    ZapfDingbats,
    /// Encoding for text strings outside content streams
    PdfDoc,
}

impl BaseEncoding {
    /// Parse an `/Encoding` or `/BaseEncoding` name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "StandardEncoding" => Self::Standard,
            "WinAnsiEncoding" => Self::WinAnsi,
            "MacRomanEncoding" => Self::MacRoman,
            "MacExpertEncoding" => Self::MacExpert,
            "PDFDocEncoding" => Self::PdfDoc,
            _ => return None,
        })
    }

    /// The built-in encoding of a Standard 14 font, if it has its own.
    pub fn builtin_for(base_font: &str) -> Option<Self> {
        let name = strip_subset_prefix(base_font);
        if name.starts_with("Symbol") {
            Some(Self::Symbol)
        } else if name.starts_with("ZapfDingbats") || name.starts_with("Dingbats") {
            Some(Self::ZapfDingbats)
        } else {
            None
        }
    }

    /// PDF name of the encoding.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Standard => "StandardEncoding",
            Self::WinAnsi => "WinAnsiEncoding",
            Self::MacRoman => "MacRomanEncoding",
            Self::MacExpert => "MacExpertEncoding",
            Self::Symbol => "SymbolEncoding",
            Self::ZapfDingbats => "ZapfDingbatsEncoding",
            Self::PdfDoc => "PDFDocEncoding",
        }
    }

    /// Glyph name for `code` (Latin encodings only).
    pub fn glyph_name(&self, code: u8) -> Option<&'static str> {
        let table: &NameTable = match self {
            Self::Standard => &STANDARD_TABLE,
            Self::WinAnsi => &WIN_ANSI_TABLE,
            Self::MacRoman => &MAC_ROMAN_TABLE,
            Self::MacExpert => &MAC_EXPERT_TABLE,
            Self::Symbol | Self::ZapfDingbats | Self::PdfDoc => return None,
        };
        table[code as usize]
    }

    /// Unicode for `code`.
    ///
    /// ```
    /// use pdf_ferrite::fonts::encodings::BaseEncoding;
    ///
    /// assert_eq!(BaseEncoding::WinAnsi.to_unicode(0x80).as_deref(), Some("€"));
    /// assert_eq!(BaseEncoding::Standard.to_unicode(0x27).as_deref(), Some("\u{2019}"));
    /// assert_eq!(BaseEncoding::Symbol.to_unicode(0x61).as_deref(), Some("α"));
    /// ```
    pub fn to_unicode(&self, code: u8) -> Option<String> {
        match self {
            Self::Symbol => symbol_to_unicode(code).map(String::from),
            Self::ZapfDingbats => dingbats_to_unicode(code).map(String::from),
            Self::PdfDoc => pdfdoc_to_unicode(code).map(String::from),
            _ => self.glyph_name(code).and_then(glyph_to_unicode),
        }
    }

    /// Code for a glyph name, searching the table.
    pub fn code_for_glyph(&self, glyph: &str) -> Option<u8> {
        (0..=255u8).find(|c| self.glyph_name(*c) == Some(glyph))
    }
}

/// Encoding of a simple font: a base encoding modified by `/Differences`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Encoding {
    /// Base encoding; `None` means the font program's built-in encoding
    pub base: Option<BaseEncoding>,
    /// Code to glyph-name overrides
    pub differences: BTreeMap<u8, String>,
}

impl Encoding {
    /// An encoding with no differences.
    pub fn new(base: BaseEncoding) -> Self {
        Self {
            base: Some(base),
            differences: BTreeMap::new(),
        }
    }

    /// Apply a `/Differences` array: `[code /name /name ... code /name ...]`.
    pub fn apply_differences(&mut self, differences: &[Object]) {
        let mut code: Option<i64> = None;
        for item in differences {
            match item {
                Object::Integer(n) => code = Some(*n),
                Object::Real(r) => code = Some(*r as i64),
                Object::Name(name) => {
                    if let Some(c) = code {
                        if (0..=255).contains(&c) {
                            self.differences.insert(c as u8, name.to_string_lossy());
                        }
                        code = Some(c + 1);
                    }
                },
                other => log::debug!("Ignoring {} in /Differences", other.type_name()),
            }
        }
    }

    /// Glyph name for `code`, after differences.
    pub fn glyph_name(&self, code: u8) -> Option<&str> {
        if let Some(name) = self.differences.get(&code) {
            return Some(name.as_str());
        }
        self.base.and_then(|b| b.glyph_name(code))
    }

    /// Unicode for `code`, after differences.
    pub fn to_unicode(&self, code: u8) -> Option<String> {
        if let Some(name) = self.differences.get(&code) {
            return glyph_to_unicode(name);
        }
        self.base.unwrap_or(BaseEncoding::Standard).to_unicode(code)
    }
}

/// Remove a `ABCDEF+` subset tag from a font name.
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

/// PDFDocEncoding to Unicode (ISO 32000-1 Annex D.2).
pub fn pdfdoc_to_unicode(code: u8) -> Option<char> {
    Some(match code {
        0x18 => '\u{02D8}',
        0x19 => '\u{02C7}',
        0x1A => '\u{02C6}',
        0x1B => '\u{02D9}',
        0x1C => '\u{02DD}',
        0x1D => '\u{02DB}',
        0x1E => '\u{02DA}',
        0x1F => '\u{02DC}',
        0x00..=0x7E => code as char,
        0x7F => return None,
        0x80 => '\u{2022}',
        0x81 => '\u{2020}',
        0x82 => '\u{2021}',
        0x83 => '\u{2026}',
        0x84 => '\u{2014}',
        0x85 => '\u{2013}',
        0x86 => '\u{0192}',
        0x87 => '\u{2044}',
        0x88 => '\u{2039}',
        0x89 => '\u{203A}',
        0x8A => '\u{2212}',
        0x8B => '\u{2030}',
        0x8C => '\u{201E}',
        0x8D => '\u{201C}',
        0x8E => '\u{201D}',
        0x8F => '\u{2018}',
        0x90 => '\u{2019}',
        0x91 => '\u{201A}',
        0x92 => '\u{2122}',
        0x93 => '\u{FB01}',
        0x94 => '\u{FB02}',
        0x95 => '\u{0141}',
        0x96 => '\u{0152}',
        0x97 => '\u{0160}',
        0x98 => '\u{0178}',
        0x99 => '\u{017D}',
        0x9A => '\u{0131}',
        0x9B => '\u{0142}',
        0x9C => '\u{0153}',
        0x9D => '\u{0161}',
        0x9E => '\u{017E}',
        0x9F => return None,
        0xA0 => '\u{20AC}',
        0xAD => return None,
        0xA1..=0xFF => code as char,
    })
}

/// Encode `text` in PDFDocEncoding, or `None` if some character has no code.
pub fn encode_pdfdoc(text: &str) -> Option<Vec<u8>> {
    text.chars()
        .map(|c| {
            let direct = u32::from(c);
            let latin1 = (0xA1..=0xFF).contains(&direct) && direct != 0xAD;
            if direct < 0x18 || (0x20..0x7F).contains(&direct) || latin1 {
                return Some(direct as u8);
            }
            (0x18..=0xA0u8).find(|b| pdfdoc_to_unicode(*b) == Some(c))
        })
        .collect()
}

/// Symbol font built-in encoding.
fn symbol_to_unicode(code: u8) -> Option<char> {
    Some(match code {
        0x22 => '∀',
        0x24 => '∃',
        0x27 => '∋',
        0x2A => '∗',
        0x2D => '−',
        0x40 => '≅',
        0x41 => 'Α',
        0x42 => 'Β',
        0x43 => 'Χ',
        0x44 => 'Δ',
        0x45 => 'Ε',
        0x46 => 'Φ',
        0x47 => 'Γ',
        0x48 => 'Η',
        0x49 => 'Ι',
        0x4A => 'ϑ',
        0x4B => 'Κ',
        0x4C => 'Λ',
        0x4D => 'Μ',
        0x4E => 'Ν',
        0x4F => 'Ο',
        0x50 => 'Π',
        0x51 => 'Θ',
        0x52 => 'Ρ',
        0x53 => 'Σ',
        0x54 => 'Τ',
        0x55 => 'Υ',
        0x56 => 'ς',
        0x57 => 'Ω',
        0x58 => 'Ξ',
        0x59 => 'Ψ',
        0x5A => 'Ζ',
        0x5C => '∴',
        0x5E => '⊥',
        0x60 => '\u{F8E5}',
        0x61 => 'α',
        0x62 => 'β',
        0x63 => 'χ',
        0x64 => 'δ',
        0x65 => 'ε',
        0x66 => 'φ',
        0x67 => 'γ',
        0x68 => 'η',
        0x69 => 'ι',
        0x6A => 'ϕ',
        0x6B => 'κ',
        0x6C => 'λ',
        0x6D => 'μ',
        0x6E => 'ν',
        0x6F => 'ο',
        0x70 => 'π',
        0x71 => 'θ',
        0x72 => 'ρ',
        0x73 => 'σ',
        0x74 => 'τ',
        0x75 => 'υ',
        0x76 => 'ϖ',
        0x77 => 'ω',
        0x78 => 'ξ',
        0x79 => 'ψ',
        0x7A => 'ζ',
        0x7E => '∼',
        0x20..=0x7D => code as char,
        0xA0 => '€',
        0xA1 => 'ϒ',
        0xA2 => '′',
        0xA3 => '≤',
        0xA4 => '⁄',
        0xA5 => '∞',
        0xA6 => 'ƒ',
        0xA7 => '♣',
        0xA8 => '♦',
        0xA9 => '♥',
        0xAA => '♠',
        0xAB => '↔',
        0xAC => '←',
        0xAD => '↑',
        0xAE => '→',
        0xAF => '↓',
        0xB0 => '°',
        0xB1 => '±',
        0xB2 => '″',
        0xB3 => '≥',
        0xB4 => '×',
        0xB5 => '∝',
        0xB6 => '∂',
        0xB7 => '•',
        0xB8 => '÷',
        0xB9 => '≠',
        0xBA => '≡',
        0xBB => '≈',
        0xBC => '…',
        0xBD => '⏐',
        0xBE => '⎯',
        0xBF => '↵',
        0xC0 => 'ℵ',
        0xC1 => 'ℑ',
        0xC2 => 'ℜ',
        0xC3 => '℘',
        0xC4 => '⊗',
        0xC5 => '⊕',
        0xC6 => '∅',
        0xC7 => '∩',
        0xC8 => '∪',
        0xC9 => '⊃',
        0xCA => '⊇',
        0xCB => '⊄',
        0xCC => '⊂',
        0xCD => '⊆',
        0xCE => '∈',
        0xCF => '∉',
        0xD0 => '∠',
        0xD1 => '∇',
        0xD2 => '®',
        0xD3 => '©',
        0xD4 => '™',
        0xD5 => '∏',
        0xD6 => '√',
        0xD7 => '⋅',
        0xD8 => '¬',
        0xD9 => '∧',
        0xDA => '∨',
        0xDB => '⇔',
        0xDC => '⇐',
        0xDD => '⇑',
        0xDE => '⇒',
        0xDF => '⇓',
        0xE0 => '◊',
        0xE1 => '〈',
        0xE2 => '®',
        0xE3 => '©',
        0xE4 => '™',
        0xE5 => '∑',
        0xF1 => '〉',
        0xF2 => '∫',
        0xF3 => '⌠',
        0xF4 => '⎮',
        0xF5 => '⌡',
        _ => return None,
    })
}

/// ZapfDingbats built-in encoding.
fn dingbats_to_unicode(code: u8) -> Option<char> {
    let scalar = match code {
        0x20 => 0x20,
        0x25 => 0x260E,
        0x2A => 0x261B,
        0x2B => 0x261E,
        0x48 => 0x2605,
        0x6C => 0x25CF,
        0x6E => 0x25A0,
        0x73 => 0x25B2,
        0x74 => 0x25BC,
        0x75 => 0x25C6,
        0x77 => 0x25D7,
        0x21..=0x7E => 0x26E0 + code as u32,
        0xA1..=0xA7 => 0x2761 + (code - 0xA1) as u32,
        0xA8 => 0x2663,
        0xA9 => 0x2666,
        0xAA => 0x2665,
        0xAB => 0x2660,
        0xAC..=0xB5 => 0x2460 + (code - 0xAC) as u32,
        0xB6..=0xD4 => 0x2776 + (code - 0xB6) as u32,
        0xD5 => 0x2192,
        0xD6 => 0x2194,
        0xD7 => 0x2195,
        0xD8..=0xEF => 0x2798 + (code - 0xD8) as u32,
        0xF1..=0xFE => 0x27B1 + (code - 0xF1) as u32,
        _ => return None,
    };
    char::from_u32(scalar)
}
