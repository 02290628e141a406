//! CMap parser.
//!
//! Handles both kinds of CMap found in PDF files:
//! - `ToUnicode` CMaps (`bfchar`/`bfrange`), mapping character codes to Unicode
//! - encoding CMaps of Type0 fonts (`codespacerange`, `cidchar`/`cidrange`),
//!   which segment byte strings into codes and map codes to CIDs
//!
//! Sections are located textually and their entries extracted with regular
//! expressions, so entries may span lines or share a line.

use regex::Regex;
use std::collections::HashMap;

/// One `begincodespacerange` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodespaceRange {
    /// Code length in bytes (1 to 4)
    pub len: usize,
    /// Lower bound, big-endian
    pub low: u32,
    /// Upper bound, big-endian
    pub high: u32,
}

impl CodespaceRange {
    /// Whether the first `n` bytes of `bytes` fit this range's byte-wise bounds.
    fn matches_prefix(&self, bytes: &[u8], n: usize) -> bool {
        if bytes.len() < n {
            return false;
        }
        (0..n).all(|i| {
            let shift = 8 * (self.len - 1 - i);
            let lo = ((self.low >> shift) & 0xFF) as u8;
            let hi = ((self.high >> shift) & 0xFF) as u8;
            (lo..=hi).contains(&bytes[i])
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CidRange {
    low: u32,
    high: u32,
    cid: u32,
}

/// A parsed CMap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CMap {
    name: Option<String>,
    vertical: bool,
    identity: bool,
    codespaces: Vec<CodespaceRange>,
    unicode: HashMap<u32, String>,
    cid_chars: HashMap<u32, u32>,
    cid_ranges: Vec<CidRange>,
    /// Longest source code seen in `bfchar`/`bfrange`, used when no codespace is declared
    max_source_len: usize,
}

/// Largest range expanded entry by entry.
const MAX_RANGE_SPAN: u32 = 0x1_0000;

impl CMap {
    /// The predefined `Identity-H` (or `Identity-V`) CMap: two-byte codes, CID = code.
    pub fn identity(vertical: bool) -> Self {
        Self {
            name: Some(if vertical { "Identity-V" } else { "Identity-H" }.to_string()),
            vertical,
            identity: true,
            codespaces: vec![CodespaceRange {
                len: 2,
                low: 0,
                high: 0xFFFF,
            }],
            ..Self::default()
        }
    }

    /// Look up a predefined CMap by name.
    ///
    /// Only the identity CMaps are bundled. Other registered CMaps
    /// (`UniGB-UCS2-H` and the like) fall back to a two-byte identity, keeping
    /// code segmentation right for the common two-byte encodings.
    pub fn predefined(name: &str) -> Option<Self> {
        match name {
            "Identity-H" => Some(Self::identity(false)),
            "Identity-V" => Some(Self::identity(true)),
            _ if name.ends_with("-H") || name.ends_with("-V") => {
                log::debug!("Predefined CMap {} not bundled, using two-byte identity", name);
                let mut cmap = Self::identity(name.ends_with("-V"));
                cmap.name = Some(name.to_string());
                Some(cmap)
            },
            _ => None,
        }
    }

    /// Parse CMap program text.
    ///
    /// ```
    /// use pdf_ferrite::fonts::cmap::CMap;
    ///
    /// let cmap = CMap::parse(b"1 beginbfchar\n<01> <0041>\nendbfchar");
    /// assert_eq!(cmap.lookup(0x01), Some("A"));
    /// ```
    pub fn parse(data: &[u8]) -> Self {
        lazy_static::lazy_static! {
            static ref CMAP_NAME: Regex = Regex::new(r"/CMapName\s*/([^\s/\[\]<>()]+)").unwrap();
            static ref WMODE: Regex = Regex::new(r"/WMode\s+(\d)").unwrap();
            static ref USECMAP: Regex = Regex::new(r"/([^\s/\[\]<>()]+)\s+usecmap").unwrap();
            static ref PAIR: Regex = Regex::new(r"<([0-9A-Fa-f\s]*)>\s*<([0-9A-Fa-f\s]*)>").unwrap();
        }

        let content = String::from_utf8_lossy(data);
        let content = strip_comments(&content);
        let mut cmap = CMap::default();

        if let Some(caps) = USECMAP.captures(&content) {
            if let Some(parent) = CMap::predefined(&caps[1]) {
                cmap = parent;
                cmap.name = None;
            } else {
                log::debug!("usecmap /{} not available", &caps[1]);
            }
        }
        if let Some(caps) = CMAP_NAME.captures(&content) {
            cmap.name = Some(caps[1].to_string());
        }
        if let Some(caps) = WMODE.captures(&content) {
            cmap.vertical = &caps[1] == "1";
        }

        for section in extract_sections(&content, "begincodespacerange", "endcodespacerange") {
            for caps in PAIR.captures_iter(section) {
                let (Some(low), Some(high)) = (hex_bytes(&caps[1]), hex_bytes(&caps[2])) else {
                    continue;
                };
                if low.is_empty() || low.len() > 4 || low.len() != high.len() {
                    log::debug!("Ignoring malformed codespace range {}", &caps[0]);
                    continue;
                }
                cmap.codespaces.push(CodespaceRange {
                    len: low.len(),
                    low: be_value(&low),
                    high: be_value(&high),
                });
                cmap.identity = false;
            }
        }

        for section in extract_sections(&content, "beginbfchar", "endbfchar") {
            cmap.parse_bfchar(section);
        }
        for section in extract_sections(&content, "beginbfrange", "endbfrange") {
            cmap.parse_bfrange(section);
        }
        for section in extract_sections(&content, "begincidchar", "endcidchar") {
            cmap.parse_cidchar(section);
        }
        for section in extract_sections(&content, "begincidrange", "endcidrange") {
            cmap.parse_cidrange(section);
        }

        log::trace!(
            "Parsed CMap {:?}: {} codespaces, {} unicode entries, {} cid ranges",
            cmap.name,
            cmap.codespaces.len(),
            cmap.unicode.len(),
            cmap.cid_ranges.len()
        );
        cmap
    }

    /// `<src> <dst>` pairs; `dst` may also be a glyph name.
    fn parse_bfchar(&mut self, section: &str) {
        lazy_static::lazy_static! {
            static ref BFCHAR: Regex =
                Regex::new(r"<([0-9A-Fa-f\s]*)>\s*(?:<([0-9A-Fa-f\s]*)>|/([^\s/\[\]<>()]+))").unwrap();
        }
        for caps in BFCHAR.captures_iter(section) {
            let Some(src) = hex_bytes(&caps[1]) else { continue };
            let dst = match (caps.get(2), caps.get(3)) {
                (Some(hex), _) => hex_bytes(hex.as_str()).map(|b| utf16_string(&b)),
                (None, Some(name)) => crate::fonts::glyph_list::glyph_to_unicode(name.as_str()),
                (None, None) => None,
            };
            if let Some(dst) = dst {
                log::trace!("bfchar {:02X?} -> {:?}", src, dst);
                self.note_source(&src);
                self.unicode.insert(be_value(&src), dst);
            }
        }
    }

    /// `<lo> <hi> <dst>` (incrementing target) and `<lo> <hi> [<d0> <d1> ...]`.
    fn parse_bfrange(&mut self, section: &str) {
        lazy_static::lazy_static! {
            static ref BFRANGE: Regex = Regex::new(
                r"<([0-9A-Fa-f\s]*)>\s*<([0-9A-Fa-f\s]*)>\s*(?:<([0-9A-Fa-f\s]*)>|\[([^\]]*)\])"
            ).unwrap();
            static ref HEX: Regex = Regex::new(r"<([0-9A-Fa-f\s]*)>").unwrap();
        }
        for caps in BFRANGE.captures_iter(section) {
            let (Some(lo_bytes), Some(hi_bytes)) = (hex_bytes(&caps[1]), hex_bytes(&caps[2])) else {
                continue;
            };
            let (lo, hi) = (be_value(&lo_bytes), be_value(&hi_bytes));
            if hi < lo || hi - lo >= MAX_RANGE_SPAN {
                log::debug!("Ignoring bfrange {:#X}..{:#X}", lo, hi);
                continue;
            }
            self.note_source(&lo_bytes);

            if let Some(dst) = caps.get(3) {
                let Some(dst) = hex_bytes(dst.as_str()) else { continue };
                let units = utf16_units(&dst);
                if units.is_empty() {
                    continue;
                }
                for offset in 0..=(hi - lo) {
                    let mut target = units.clone();
                    if let Some(last) = target.last_mut() {
                        *last = last.wrapping_add(offset as u16);
                    }
                    self.unicode.insert(lo + offset, String::from_utf16_lossy(&target));
                }
            } else if let Some(array) = caps.get(4) {
                let targets: Vec<String> = HEX
                    .captures_iter(array.as_str())
                    .filter_map(|c| hex_bytes(&c[1]))
                    .map(|b| utf16_string(&b))
                    .collect();
                let span = (hi - lo + 1) as usize;
                if targets.len() != span {
                    log::warn!(
                        "bfrange array for {:#X}..{:#X} has {} entries, expected {}",
                        lo,
                        hi,
                        targets.len(),
                        span
                    );
                }
                for (i, target) in targets.into_iter().take(span).enumerate() {
                    self.unicode.insert(lo + i as u32, target);
                }
            }
        }
    }

    fn parse_cidchar(&mut self, section: &str) {
        lazy_static::lazy_static! {
            static ref CIDCHAR: Regex = Regex::new(r"<([0-9A-Fa-f\s]*)>\s*(\d+)").unwrap();
        }
        for caps in CIDCHAR.captures_iter(section) {
            let (Some(src), Ok(cid)) = (hex_bytes(&caps[1]), caps[2].parse::<u32>()) else {
                continue;
            };
            self.cid_chars.insert(be_value(&src), cid);
        }
    }

    fn parse_cidrange(&mut self, section: &str) {
        lazy_static::lazy_static! {
            static ref CIDRANGE: Regex =
                Regex::new(r"<([0-9A-Fa-f\s]*)>\s*<([0-9A-Fa-f\s]*)>\s*(\d+)").unwrap();
        }
        for caps in CIDRANGE.captures_iter(section) {
            let (Some(lo), Some(hi), Ok(cid)) =
                (hex_bytes(&caps[1]), hex_bytes(&caps[2]), caps[3].parse::<u32>())
            else {
                continue;
            };
            let (low, high) = (be_value(&lo), be_value(&hi));
            if high >= low {
                self.cid_ranges.push(CidRange { low, high, cid });
            }
        }
    }

    fn note_source(&mut self, src: &[u8]) {
        self.max_source_len = self.max_source_len.max(src.len().min(4));
    }

    /// CMap name from `/CMapName` or the predefined name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// True for vertical writing mode (`/WMode 1`).
    pub fn is_vertical(&self) -> bool {
        self.vertical
    }

    /// Declared codespace ranges.
    pub fn codespaces(&self) -> &[CodespaceRange] {
        &self.codespaces
    }

    /// Unicode text for a code, if mapped.
    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.unicode.get(&code).map(String::as_str)
    }

    /// Lowest code mapped to `text`.
    pub fn code_for(&self, text: &str) -> Option<u32> {
        self.unicode
            .iter()
            .filter(|(_, v)| v.as_str() == text)
            .map(|(k, _)| *k)
            .min()
    }

    /// Take codespaces and the identity CID mapping from `parent` when this
    /// CMap declares none (`/UseCMap`).
    pub fn inherit(&mut self, parent: &CMap) {
        if self.codespaces.is_empty() {
            self.codespaces = parent.codespaces.clone();
            self.identity = parent.identity;
        }
    }

    /// Number of code-to-Unicode entries.
    pub fn len(&self) -> usize {
        self.unicode.len()
    }

    /// True when the CMap maps nothing to Unicode.
    pub fn is_empty(&self) -> bool {
        self.unicode.is_empty()
    }

    /// CID for a code. Unmapped codes of an identity CMap map to themselves;
    /// otherwise they map to CID 0 (`.notdef`).
    pub fn cid(&self, code: u32) -> u32 {
        if let Some(cid) = self.cid_chars.get(&code) {
            return *cid;
        }
        if let Some(range) = self.cid_ranges.iter().find(|r| (r.low..=r.high).contains(&code)) {
            return range.cid + (code - range.low);
        }
        if self.identity || (self.cid_chars.is_empty() && self.cid_ranges.is_empty()) {
            code
        } else {
            0
        }
    }

    /// Split a byte string into `(code, byte length)` pairs.
    ///
    /// Codes are matched against the codespace ranges, shortest first. A byte
    /// sequence matching no range consumes the length of the shortest range,
    /// as the PDF reference prescribes for invalid codes.
    pub fn segment(&self, bytes: &[u8]) -> Vec<(u32, usize)> {
        let mut codes = Vec::with_capacity(bytes.len());
        let fallback_len = self
            .codespaces
            .iter()
            .map(|c| c.len)
            .min()
            .unwrap_or(self.max_source_len.max(1));
        let mut pos = 0;
        while pos < bytes.len() {
            let rest = &bytes[pos..];
            let matched = (1..=4).find(|n| {
                self.codespaces
                    .iter()
                    .any(|cs| cs.len == *n && cs.matches_prefix(rest, *n))
            });
            let len = matched.unwrap_or(fallback_len).min(rest.len());
            codes.push((be_value(&rest[..len]), len));
            pos += len;
        }
        codes
    }
}

/// Drop `%` comments outside of strings and hex strings.
fn strip_comments(content: &str) -> String {
    content
        .lines()
        .map(|line| match line.find('%') {
            Some(pos) => &line[..pos],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract sections between begin and end markers.
fn extract_sections<'a>(content: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut sections = Vec::new();
    let mut remaining = content;

    while let Some(begin_pos) = remaining.find(begin) {
        let after_begin = &remaining[begin_pos + begin.len()..];
        match after_begin.find(end) {
            Some(end_pos) => {
                sections.push(&after_begin[..end_pos]);
                remaining = &after_begin[end_pos + end.len()..];
            },
            None => {
                log::debug!("Unterminated {} section", begin);
                sections.push(after_begin);
                break;
            },
        }
    }

    sections
}

/// Hex digits (whitespace allowed) to bytes; an odd final digit is padded with 0.
fn hex_bytes(hex: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = hex
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|b| (b as char).to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;
    Some(
        digits
            .chunks(2)
            .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
            .collect(),
    )
}

fn be_value(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

/// Destination bytes as UTF-16BE code units. A lone byte is a single unit.
fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    if bytes.len() == 1 {
        return vec![u16::from(bytes[0])];
    }
    bytes
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
        .collect()
}

/// Destination bytes decoded as UTF-16BE, surrogate pairs and ligatures included.
fn utf16_string(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}
