//! Font dictionaries.
//!
//! [`PdfFont`] gathers everything the content interpreter needs from a font
//! dictionary: how to split a shown string into character codes, the Unicode
//! text of each code and its advance width.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::document::Document;
use crate::error::{Error, Result, Warning, WarningKind};
use crate::fonts::cmap::CMap;
use crate::fonts::encodings::{BaseEncoding, Encoding};
use crate::fonts::metrics::Standard14;
use crate::fonts::truetype_parser::{FontFileKind, FontProgram, GlyphWidths};
use crate::geometry::Matrix;
use crate::object::{Dictionary, Object};

bitflags! {
    /// `/Flags` of a font descriptor (ISO 32000-1 Table 123).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FontFlags: u32 {
        const FIXED_PITCH = 1 << 0;
        const SERIF = 1 << 1;
        const SYMBOLIC = 1 << 2;
        const SCRIPT = 1 << 3;
        const NONSYMBOLIC = 1 << 5;
        const ITALIC = 1 << 6;
        const ALL_CAP = 1 << 16;
        const SMALL_CAP = 1 << 17;
        const FORCE_BOLD = 1 << 18;
    }
}

/// Font dictionary `/Subtype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontKind {
    Type1,
    TrueType,
    Type3,
    /// Composite font with a CIDFont descendant
    Type0,
}

impl FontKind {
    fn from_subtype(subtype: &str) -> Self {
        match subtype {
            "TrueType" => Self::TrueType,
            "Type3" => Self::Type3,
            "Type0" => Self::Type0,
            _ => Self::Type1,
        }
    }
}

/// One character code of a shown string.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Character code
    pub code: u32,
    /// Number of bytes the code occupied
    pub len: usize,
    /// Unicode text, if the font maps the code
    pub unicode: Option<String>,
    /// Horizontal advance in 1/1000 text space units
    pub width: f64,
}

impl Glyph {
    /// True when word spacing applies: the code maps to U+0020.
    pub fn is_space(&self) -> bool {
        self.unicode.as_deref() == Some(" ")
    }
}

/// A loaded font.
#[derive(Debug, Clone)]
pub struct PdfFont {
    base_font: String,
    kind: FontKind,
    flags: FontFlags,
    standard: Option<Standard14>,
    /// Simple fonts only
    encoding: Encoding,
    /// Type0 `/Encoding`
    cmap: Option<CMap>,
    to_unicode: Option<CMap>,
    /// Simple fonts: code to width; Type0: CID to width
    widths: HashMap<u32, f64>,
    /// `/DW` for Type0, `/MissingWidth` for simple fonts
    default_width: Option<f64>,
    avg_width: Option<f64>,
    program_widths: GlyphWidths,
    /// Type3 glyph space to text space
    font_matrix: Matrix,
}

impl PdfFont {
    /// Load a font dictionary, reading embedded TrueType programs with `program`.
    pub fn load(doc: &mut Document, font: &Object, program: &dyn FontProgram) -> Result<Self> {
        let dict = doc.resolve_object(font)?;
        let dict = dict.try_dict()?;
        let subtype = dict.get_name("Subtype").unwrap_or("Type1");
        let kind = FontKind::from_subtype(subtype);
        let base_font = dict.get_name("BaseFont").unwrap_or("Unknown").to_string();

        let mut font = PdfFont {
            standard: Standard14::from_base_font(&base_font),
            base_font,
            kind,
            flags: FontFlags::empty(),
            encoding: Encoding::default(),
            cmap: None,
            to_unicode: None,
            widths: HashMap::new(),
            default_width: None,
            avg_width: None,
            program_widths: GlyphWidths::new(),
            font_matrix: Matrix::new(0.001, 0.0, 0.0, 0.001, 0.0, 0.0),
        };

        if let Some(to_unicode) = dict.get("ToUnicode") {
            font.to_unicode = load_cmap_stream(doc, to_unicode)?;
            if let Some(cmap) = &font.to_unicode {
                log::debug!("ToUnicode for font '{}': {} mappings", font.base_font, cmap.len());
            }
        }

        if kind == FontKind::Type0 {
            font.load_composite(doc, dict, program)?;
        } else {
            font.load_simple(doc, dict, program)?;
        }
        Ok(font)
    }

    fn load_simple(&mut self, doc: &mut Document, dict: &Dictionary, program: &dyn FontProgram) -> Result<()> {
        if let Some(descriptor) = dict.get("FontDescriptor") {
            let descriptor = doc.resolve_object(descriptor)?;
            if let Some(descriptor) = descriptor.as_dict() {
                self.read_descriptor(doc, descriptor, program)?;
            }
        }

        if self.kind == FontKind::Type3 {
            if let Some(matrix) = dict.get("FontMatrix") {
                let matrix = doc.resolve_object(matrix)?;
                if let Some(m) = matrix.as_array().and_then(|a| Matrix::from_array(a)) {
                    self.font_matrix = m;
                }
            }
        }

        let first_char = match dict.get("FirstChar") {
            Some(obj) => doc.resolve_object(obj)?.as_integer().unwrap_or(0),
            None => 0,
        };
        if let Some(widths) = dict.get("Widths") {
            let widths = doc.resolve_object(widths)?;
            for (i, width) in widths.as_array().map(Vec::as_slice).unwrap_or_default().iter().enumerate() {
                let width = doc.resolve_object(width)?;
                if let (Some(w), Ok(code)) = (width.as_number(), u32::try_from(first_char + i as i64)) {
                    self.widths.insert(code, w);
                }
            }
        }

        self.encoding = self.simple_encoding(doc, dict)?;
        Ok(())
    }

    fn simple_encoding(&self, doc: &mut Document, dict: &Dictionary) -> Result<Encoding> {
        let builtin = BaseEncoding::builtin_for(&self.base_font);
        let default_base = builtin.or_else(|| self.standard.map(|s| s.builtin_encoding()));
        let mut encoding = Encoding {
            base: default_base,
            ..Encoding::default()
        };

        let Some(entry) = dict.get("Encoding") else {
            return Ok(encoding);
        };
        match doc.resolve_object(entry)? {
            Object::Name(name) => match (builtin, BaseEncoding::from_name(&name.to_string_lossy())) {
                (Some(_), _) => {},
                (None, Some(base)) => encoding.base = Some(base),
                (None, None) => self.fallback(doc, format!("unknown encoding /{}", name)),
            },
            Object::Dictionary(enc) => {
                if let (None, Some(base)) = (builtin, enc.get_name("BaseEncoding")) {
                    match BaseEncoding::from_name(base) {
                        Some(base) => encoding.base = Some(base),
                        None => self.fallback(doc, format!("unknown base encoding /{}", base)),
                    }
                }
                if let Some(differences) = enc.get("Differences") {
                    let differences = doc.resolve_object(differences)?;
                    encoding.apply_differences(differences.as_array().map(Vec::as_slice).unwrap_or_default());
                }
            },
            other => self.fallback(doc, format!("/Encoding is a {}", other.type_name())),
        }
        Ok(encoding)
    }

    fn load_composite(&mut self, doc: &mut Document, dict: &Dictionary, program: &dyn FontProgram) -> Result<()> {
        self.cmap = match dict.get("Encoding") {
            Some(entry) => match doc.resolve_object(entry)? {
                Object::Name(name) => {
                    let cmap = CMap::predefined(&name.to_string_lossy());
                    if cmap.is_none() {
                        self.fallback(doc, format!("unknown CMap /{}, using Identity-H", name));
                    }
                    cmap
                },
                Object::Stream(_) => load_cmap_stream(doc, entry)?,
                other => {
                    self.fallback(doc, format!("Type0 /Encoding is a {}", other.type_name()));
                    None
                },
            },
            None => None,
        };
        if self.cmap.is_none() {
            self.cmap = Some(CMap::identity(false));
        }

        let descendant = match dict.get("DescendantFonts") {
            Some(fonts) => doc.resolve_object(fonts)?,
            None => return Err(Error::Resolve(format!("Type0 font '{}' has no /DescendantFonts", self.base_font))),
        };
        let Some(first) = descendant.as_array().and_then(|a| a.first()) else {
            return Err(Error::Resolve(format!("Type0 font '{}' has empty /DescendantFonts", self.base_font)));
        };
        let cid_font = doc.resolve_object(first)?;
        let cid_font = cid_font.try_dict()?;

        if let Some(descriptor) = cid_font.get("FontDescriptor") {
            let descriptor = doc.resolve_object(descriptor)?;
            if let Some(descriptor) = descriptor.as_dict() {
                self.read_descriptor(doc, descriptor, program)?;
            }
        }

        self.default_width = Some(match cid_font.get("DW") {
            Some(dw) => doc.resolve_object(dw)?.as_number().unwrap_or(1000.0),
            None => 1000.0,
        });
        if let Some(w) = cid_font.get("W") {
            let w = doc.resolve_references(w, 2)?;
            self.widths = parse_cid_widths(w.as_array().map(Vec::as_slice).unwrap_or_default());
        }
        Ok(())
    }

    fn read_descriptor(&mut self, doc: &mut Document, descriptor: &Dictionary, program: &dyn FontProgram) -> Result<()> {
        if let Some(flags) = descriptor.get_integer("Flags") {
            self.flags = FontFlags::from_bits_truncate(flags as u32);
        }
        self.default_width = self.default_width.or(descriptor.get_number("MissingWidth"));
        self.avg_width = descriptor.get_number("AvgWidth");

        let file = [
            ("FontFile2", FontFileKind::TrueType),
            ("FontFile3", FontFileKind::Cff),
            ("FontFile", FontFileKind::Type1),
        ]
        .into_iter()
        .find_map(|(key, kind)| descriptor.get(key).map(|obj| (obj.clone(), kind)));
        let Some((file, mut kind)) = file else {
            return Ok(());
        };
        let stream = doc.resolve_object(&file)?;
        let Some(stream) = stream.as_stream() else {
            return Ok(());
        };
        if kind == FontFileKind::Cff && stream.dict.get_name("Subtype") == Some("OpenType") {
            kind = FontFileKind::OpenType;
        }
        let data = match doc.decode_stream(stream) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Embedded font of '{}' could not be decoded: {}", self.base_font, e);
                return Ok(());
            },
        };
        match program.glyph_widths(kind, &data) {
            Ok(widths) => self.program_widths = widths,
            Err(e) => log::debug!("Font program of '{}' not used: {}", self.base_font, e),
        }
        Ok(())
    }

    fn fallback(&self, doc: &mut Document, message: String) {
        doc.report(Warning::new(
            WarningKind::EncodingFallback,
            format!("font '{}': {}", self.base_font, message),
        ));
    }

    /// `/BaseFont`.
    pub fn base_font(&self) -> &str {
        &self.base_font
    }

    /// Font type.
    pub fn kind(&self) -> FontKind {
        self.kind
    }

    /// Descriptor flags.
    pub fn flags(&self) -> FontFlags {
        self.flags
    }

    /// Standard 14 font this font names, if any.
    pub fn standard14(&self) -> Option<Standard14> {
        self.standard
    }

    /// Encoding of a simple font.
    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    /// True for Type0 fonts.
    pub fn is_composite(&self) -> bool {
        self.kind == FontKind::Type0
    }

    /// True for vertical writing mode.
    pub fn is_vertical(&self) -> bool {
        self.cmap.as_ref().is_some_and(CMap::is_vertical)
    }

    /// Split shown bytes into character codes: one byte each for simple
    /// fonts, CMap-driven for composite fonts.
    pub fn codes(&self, bytes: &[u8]) -> Vec<(u32, usize)> {
        match &self.cmap {
            Some(cmap) => cmap.segment(bytes),
            None => bytes.iter().map(|b| (u32::from(*b), 1)).collect(),
        }
    }

    /// Unicode for a code: the ToUnicode CMap first, then the encoding.
    pub fn to_unicode(&self, code: u32) -> Option<String> {
        if let Some(text) = self.to_unicode.as_ref().and_then(|c| c.lookup(code)) {
            return Some(text.to_string());
        }
        if self.is_composite() {
            return None;
        }
        let code = u8::try_from(code).ok()?;
        self.encoding.to_unicode(code)
    }

    /// Like [`PdfFont::to_unicode`] but unmapped codes are an error.
    pub fn to_unicode_strict(&self, code: u32) -> Result<String> {
        self.to_unicode(code).ok_or_else(|| Error::Encoding {
            code,
            font: self.base_font.clone(),
        })
    }

    /// Advance width of a code in 1/1000 text space units.
    pub fn width(&self, code: u32) -> f64 {
        if let Some(cmap) = &self.cmap {
            let cid = cmap.cid(code);
            return self.widths.get(&cid).copied().or(self.default_width).unwrap_or(1000.0);
        }
        if let Some(w) = self.widths.get(&code) {
            return match self.kind {
                FontKind::Type3 => w * self.font_matrix.a * 1000.0,
                _ => *w,
            };
        }
        self.metric_width(code)
            .or(self.default_width)
            .unwrap_or(if self.flags.contains(FontFlags::FIXED_PITCH) { 600.0 } else { 500.0 })
    }

    /// Width from the embedded program or the Standard 14 metrics.
    fn metric_width(&self, code: u32) -> Option<f64> {
        let code = u8::try_from(code).ok()?;
        let glyph = self.encoding.glyph_name(code);
        if let Some(w) = glyph.and_then(|g| self.program_widths.get(g)) {
            return Some(*w);
        }
        let standard = self.standard?;
        if standard.is_symbolic() && self.encoding.differences.get(&code).is_none() {
            return standard.code_width(code);
        }
        glyph.and_then(|g| standard.glyph_width(g))
    }

    /// Width estimate for a space: the glyph for U+0020, else
    /// `/MissingWidth`/2, else `/AvgWidth`/2, else 278.
    pub fn space_width(&self) -> f64 {
        if let Some(w) = self.space_code().map(|code| self.width(code)) {
            return w;
        }
        if let Some(w) = self.default_width.filter(|w| *w > 0.0) {
            return w / 2.0;
        }
        if let Some(w) = self.avg_width.filter(|w| *w > 0.0) {
            return w / 2.0;
        }
        278.0
    }

    /// A code that maps to U+0020 and has a known width.
    fn space_code(&self) -> Option<u32> {
        if let Some(to_unicode) = &self.to_unicode {
            if let Some(code) = to_unicode.code_for(" ") {
                if self.widths.contains_key(&code) || !self.is_composite() {
                    return Some(code);
                }
            }
        }
        if self.is_composite() {
            return None;
        }
        let code = 0x20;
        let known = self.widths.contains_key(&code) || self.metric_width(code).is_some();
        (known && self.encoding.to_unicode(0x20).as_deref() == Some(" ")).then_some(code)
    }

    /// Decode shown bytes into glyphs.
    pub fn glyphs(&self, bytes: &[u8]) -> Vec<Glyph> {
        self.codes(bytes)
            .into_iter()
            .map(|(code, len)| Glyph {
                code,
                len,
                unicode: self.to_unicode(code),
                width: self.width(code),
            })
            .collect()
    }

    /// Text used when a code has no mapping: the byte as Latin-1 for
    /// simple fonts, U+FFFD otherwise.
    pub fn fallback_text(&self, code: u32) -> String {
        match u8::try_from(code) {
            Ok(byte) if !self.is_composite() && !byte.is_ascii_control() => char::from(byte).to_string(),
            _ => '\u{FFFD}'.to_string(),
        }
    }
}

/// Parse a CIDFont `/W` array: `[c [w1 w2 ...]]` and `[c1 c2 w]` forms.
pub fn parse_cid_widths(items: &[Object]) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < items.len() {
        let Some(first) = items[i].as_integer().and_then(|c| u32::try_from(c).ok()) else {
            log::debug!("Skipping {} in /W", items[i].type_name());
            i += 1;
            continue;
        };
        match items.get(i + 1) {
            Some(Object::Array(list)) => {
                for (offset, w) in list.iter().enumerate() {
                    if let Some(w) = w.as_number() {
                        widths.insert(first + offset as u32, w);
                    }
                }
                i += 2;
            },
            Some(last) => {
                let last = last.as_integer().and_then(|c| u32::try_from(c).ok());
                let width = items.get(i + 2).and_then(Object::as_number);
                if let (Some(last), Some(width)) = (last, width) {
                    if last >= first && last - first <= 0xFFFF {
                        for cid in first..=last {
                            widths.insert(cid, width);
                        }
                    }
                }
                i += 3;
            },
            None => break,
        }
    }
    widths
}

/// Resolve and parse a CMap stream; an unreadable CMap is a warning.
fn load_cmap_stream(doc: &mut Document, entry: &Object) -> Result<Option<CMap>> {
    let object = doc.resolve_object(entry)?;
    let Some(stream) = object.as_stream() else {
        if let Object::Name(name) = &object {
            return Ok(CMap::predefined(&name.to_string_lossy()));
        }
        return Ok(None);
    };
    match doc.decode_stream(stream) {
        Ok(data) => {
            let mut cmap = CMap::parse(&data);
            if let Some(Object::Name(parent)) = stream.dict.get("UseCMap") {
                if let Some(base) = CMap::predefined(&parent.to_string_lossy()) {
                    cmap.inherit(&base);
                }
            }
            Ok(Some(cmap))
        },
        Err(e) => {
            doc.report(Warning::new(WarningKind::EncodingFallback, format!("unreadable CMap stream: {}", e)));
            Ok(None)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;
    use crate::fonts::truetype_parser::TrueTypeProgram;
    use crate::object::{Name, Stream};

    fn load(doc: &mut Document, font: Dictionary) -> PdfFont {
        PdfFont::load(doc, &Object::Dictionary(font), &TrueTypeProgram).unwrap()
    }

    #[test]
    fn test_standard14_without_widths() {
        let mut doc = Document::new();
        let font = load(&mut doc, dict! { "Type" => Name::from("Font"), "Subtype" => Name::from("Type1"), "BaseFont" => Name::from("Helvetica") });
        assert_eq!(font.standard14(), Some(Standard14::Helvetica));
        let glyphs = font.glyphs(b"Hi ");
        assert_eq!(glyphs.len(), 3);
        assert_eq!(glyphs[0].unicode.as_deref(), Some("H"));
        assert_eq!(glyphs[0].width, 722.0);
        assert!(glyphs[2].is_space());
        assert_eq!(font.space_width(), 278.0);
    }

    #[test]
    fn test_widths_and_first_char() {
        let mut doc = Document::new();
        let font = load(
            &mut doc,
            dict! {
                "Subtype" => Name::from("TrueType"),
                "BaseFont" => Name::from("Custom"),
                "FirstChar" => 65,
                "Widths" => vec![Object::from(600), Object::from(650)],
                "Encoding" => Name::from("WinAnsiEncoding"),
            },
        );
        assert_eq!(font.width(65), 600.0);
        assert_eq!(font.width(66), 650.0);
        assert_eq!(font.width(67), 500.0);
        assert_eq!(font.to_unicode(0x80).as_deref(), Some("€"));
    }

    #[test]
    fn test_differences_and_tounicode_priority() {
        let mut doc = Document::new();
        let cmap = Stream::new(Dictionary::new(), b"beginbfchar <41> <0058> endbfchar".to_vec());
        let cmap_ref = doc.add_object(Object::Stream(cmap)).unwrap();
        let font = load(
            &mut doc,
            dict! {
                "Subtype" => Name::from("Type1"),
                "BaseFont" => Name::from("Times-Roman"),
                "Encoding" => dict! {
                    "Differences" => vec![Object::from(66), Object::Name(Name::from("eacute"))],
                },
                "ToUnicode" => cmap_ref,
            },
        );
        assert_eq!(font.to_unicode(0x41).as_deref(), Some("X"));
        assert_eq!(font.to_unicode(0x42).as_deref(), Some("é"));
        assert_eq!(font.width(0x42), 444.0);
    }

    #[test]
    fn test_symbol_uses_builtin_encoding() {
        let mut doc = Document::new();
        let font = load(
            &mut doc,
            dict! { "Subtype" => Name::from("Type1"), "BaseFont" => Name::from("Symbol"), "Encoding" => Name::from("WinAnsiEncoding") },
        );
        assert_eq!(font.to_unicode(0x61).as_deref(), Some("α"));
        assert_eq!(font.width(0x61), 631.0);
    }

    #[test]
    fn test_unknown_encoding_warns() {
        let mut doc = Document::new();
        let font = load(
            &mut doc,
            dict! { "Subtype" => Name::from("Type1"), "BaseFont" => Name::from("Helvetica"), "Encoding" => Name::from("FooEncoding") },
        );
        assert_eq!(font.to_unicode(0x41).as_deref(), Some("A"));
        assert!(doc.warnings().iter().any(|w| w.kind == WarningKind::EncodingFallback));
    }

    #[test]
    fn test_type0_identity_with_w_array() {
        let mut doc = Document::new();
        let descendant = dict! {
            "Subtype" => Name::from("CIDFontType2"),
            "BaseFont" => Name::from("Noto"),
            "DW" => 900,
            "W" => vec![
                Object::from(1), Object::Array(vec![Object::from(500), Object::from(510)]),
                Object::from(10), Object::from(12), Object::from(250),
            ],
        };
        let cmap = Stream::new(Dictionary::new(), b"beginbfrange <0001> <0002> <0041> endbfrange".to_vec());
        let cmap_ref = doc.add_object(Object::Stream(cmap)).unwrap();
        let font = load(
            &mut doc,
            dict! {
                "Subtype" => Name::from("Type0"),
                "BaseFont" => Name::from("Noto"),
                "Encoding" => Name::from("Identity-H"),
                "DescendantFonts" => vec![Object::Dictionary(descendant)],
                "ToUnicode" => cmap_ref,
            },
        );
        let glyphs = font.glyphs(&[0, 1, 0, 2, 0, 11, 0, 99]);
        let widths: Vec<f64> = glyphs.iter().map(|g| g.width).collect();
        assert_eq!(widths, vec![500.0, 510.0, 250.0, 900.0]);
        assert_eq!(glyphs[0].unicode.as_deref(), Some("A"));
        assert_eq!(glyphs[1].unicode.as_deref(), Some("B"));
        assert_eq!(glyphs[3].unicode, None);
        assert!(font.to_unicode_strict(99).is_err());
        assert_eq!(font.fallback_text(99), "\u{FFFD}");
    }

    #[test]
    fn test_type0_without_descendants_is_error() {
        let mut doc = Document::new();
        let font = dict! { "Subtype" => Name::from("Type0"), "BaseFont" => Name::from("X") };
        assert!(PdfFont::load(&mut doc, &Object::Dictionary(font), &TrueTypeProgram).is_err());
    }

    #[test]
    fn test_space_width_chain() {
        let mut doc = Document::new();
        let descriptor = dict! { "Type" => Name::from("FontDescriptor"), "MissingWidth" => 400, "AvgWidth" => 300 };
        let font = load(
            &mut doc,
            dict! { "Subtype" => Name::from("TrueType"), "BaseFont" => Name::from("Custom"), "FontDescriptor" => descriptor },
        );
        assert_eq!(font.space_width(), 200.0);

        let descriptor = dict! { "Type" => Name::from("FontDescriptor"), "AvgWidth" => 300 };
        let font = load(
            &mut doc,
            dict! { "Subtype" => Name::from("TrueType"), "BaseFont" => Name::from("Custom"), "FontDescriptor" => descriptor },
        );
        assert_eq!(font.space_width(), 150.0);

        let font = load(&mut doc, dict! { "Subtype" => Name::from("TrueType"), "BaseFont" => Name::from("Custom") });
        assert_eq!(font.space_width(), 278.0);
    }

    #[test]
    fn test_type3_font_matrix_scales_widths() {
        let mut doc = Document::new();
        let font = load(
            &mut doc,
            dict! {
                "Subtype" => Name::from("Type3"),
                "FontMatrix" => vec![Object::from(0.01), Object::from(0), Object::from(0), Object::from(0.01), Object::from(0), Object::from(0)],
                "FirstChar" => 65,
                "Widths" => vec![Object::from(50)],
            },
        );
        assert!((font.width(65) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_flags() {
        let flags = FontFlags::from_bits_truncate(4 | 32);
        assert!(flags.contains(FontFlags::SYMBOLIC));
        assert!(flags.contains(FontFlags::NONSYMBOLIC));
        assert!(!flags.contains(FontFlags::ITALIC));
    }

    #[test]
    fn test_parse_cid_widths_forms() {
        let widths = parse_cid_widths(&[
            Object::from(3),
            Object::Array(vec![Object::from(100), Object::Real(200.5)]),
            Object::from(7),
            Object::from(8),
            Object::from(50),
        ]);
        assert_eq!(widths.get(&3), Some(&100.0));
        assert_eq!(widths.get(&4), Some(&200.5));
        assert_eq!(widths.get(&8), Some(&50.0));
        assert_eq!(widths.get(&9), None);
    }
}
