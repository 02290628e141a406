//! Content stream tokenizer.
//!
//! Reads the same token grammar as the object parser, except that bare
//! keywords other than `true`, `false` and `null` are operators. Operands
//! accumulate until an operator arrives; each [`Operation`] carries the
//! operand list and the operator's offset.
//!
//! Inline images (`BI … ID … EI`) are returned as a single `BI` operation
//! holding the expanded dictionary and the raw image bytes.

use bytes::Bytes;

use crate::error::{Error, Result, Warning, WarningKind};
use crate::lexer::{is_delimiter, is_whitespace, Token, TokenKind};
use crate::object::{Dictionary, Name, Object};
use crate::parser::Parser;
use crate::parser_config::ParserOptions;

/// One operator with its operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Operator keyword, e.g. `Tj`
    pub operator: String,
    /// Operands in source order
    pub operands: Vec<Object>,
    /// Offset of the operator keyword in the content stream
    pub offset: usize,
    /// Dictionary and data for `BI`
    pub inline_image: Option<InlineImage>,
}

impl Operation {
    /// An operation without inline image data.
    pub fn new(operator: impl Into<String>, operands: Vec<Object>, offset: usize) -> Self {
        Self {
            operator: operator.into(),
            operands,
            offset,
            inline_image: None,
        }
    }
}

/// An inline image: `BI <dict> ID <data> EI`.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    /// Image dictionary with abbreviated keys and values expanded
    pub dict: Dictionary,
    /// Image bytes as stored, still encoded by any `/Filter`
    pub data: Bytes,
}

/// Iterator over the operations of a content stream.
///
/// In lenient mode a malformed token is skipped: the pending operands are
/// dropped, a warning is recorded and reading resumes after the bad byte.
/// In strict mode the syntax error ends the iteration.
pub struct ContentReader<'a> {
    parser: Parser<'a>,
    data: &'a [u8],
    strict: bool,
    warnings: Vec<Warning>,
    done: bool,
}

impl<'a> ContentReader<'a> {
    /// Read `data` with default (lenient) options.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_options(data, ParserOptions::default())
    }

    /// Read `data` with `options`.
    pub fn with_options(data: &'a [u8], options: ParserOptions) -> Self {
        Self {
            parser: Parser::new(data).with_options(options),
            data,
            strict: options.strict,
            warnings: Vec::new(),
            done: false,
        }
    }

    /// Drain warnings recorded so far.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    fn read_operation(&mut self) -> Result<Option<Operation>> {
        let mut operands = Vec::new();
        loop {
            let start = self.parser.lexer().position();
            let step = self.step(&mut operands);
            match step {
                Ok(Some(op)) => return Ok(Some(op)),
                Ok(None) if self.parser.lexer().at_end() => {
                    if !operands.is_empty() {
                        log::debug!("{} trailing operands without an operator", operands.len());
                    }
                    return Ok(None);
                },
                Ok(None) => continue,
                Err(e) if self.strict => return Err(e),
                Err(e) => {
                    self.warnings.push(
                        Warning::new(WarningKind::Other, format!("skipped malformed content: {}", e))
                            .at(start as u64),
                    );
                    operands.clear();
                    let resume = (start + 1).max(self.skip_point(&e)).min(self.data.len());
                    self.parser.lexer().set_position(resume);
                },
            }
        }
    }

    /// Where to resume after `error`: just past its offset, so a bad
    /// token inside an array does not restart the scan at the array.
    fn skip_point(&self, error: &Error) -> usize {
        match error {
            Error::Syntax { offset, .. } => offset + 1,
            _ => self.data.len(),
        }
    }

    /// Consume one token. Returns an operation when the token was an
    /// operator; pushes an operand otherwise.
    fn step(&mut self, operands: &mut Vec<Object>) -> Result<Option<Operation>> {
        let Some(token) = self.parser.lexer().next_significant()? else {
            return Ok(None);
        };
        if let TokenKind::Keyword(kw) = &token.kind {
            if !matches!(kw.as_slice(), b"true" | b"false" | b"null") {
                let name = String::from_utf8_lossy(kw).into_owned();
                let mut op = Operation::new(name, std::mem::take(operands), token.offset);
                if op.operator == "BI" {
                    op.inline_image = Some(self.read_inline_image(token.offset)?);
                }
                return Ok(Some(op));
            }
        }
        let operand = self.parser.parse_from_token(token, 0)?;
        operands.push(operand);
        Ok(None)
    }

    fn read_inline_image(&mut self, offset: usize) -> Result<InlineImage> {
        let mut dict = Dictionary::new();
        loop {
            let token = self
                .parser
                .lexer()
                .next_significant()?
                .ok_or(Error::UnexpectedEof { offset })?;
            let key = match token.kind {
                TokenKind::Keyword(ref kw) if kw == b"ID" => break,
                TokenKind::Name(name) => name,
                other => return Err(Error::syntax(token.offset, format!("inline image key expected, found {:?}", other))),
            };
            let value_token: Token = self
                .parser
                .lexer()
                .next_significant()?
                .ok_or(Error::UnexpectedEof { offset })?;
            let value = self.parser.parse_from_token(value_token, 0)?;
            dict.set(expand_key(&key), expand_value(&key, value));
        }

        // A single whitespace byte separates ID from the data
        let mut start = self.parser.lexer().position();
        if self.data.get(start).copied().is_some_and(is_whitespace) {
            start += 1;
        }
        let (end, resume) = find_image_end(self.data, start, &dict)
            .ok_or_else(|| Error::syntax(offset, "inline image without EI"))?;
        self.parser.lexer().set_position(resume);
        Ok(InlineImage {
            dict,
            data: Bytes::copy_from_slice(&self.data[start..end]),
        })
    }
}

impl Iterator for ContentReader<'_> {
    type Item = Result<Operation>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_operation() {
            Ok(Some(op)) => Some(Ok(op)),
            Ok(None) => {
                self.done = true;
                None
            },
            Err(e) => {
                self.done = true;
                Some(Err(e))
            },
        }
    }
}

/// Parse a whole content stream into operations.
///
/// # Example
///
/// ```
/// use pdf_ferrite::content::parse_content_stream;
///
/// let ops = parse_content_stream(b"BT /F1 12 Tf (Hi) Tj ET").unwrap();
/// let names: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
/// assert_eq!(names, ["BT", "Tf", "Tj", "ET"]);
/// assert_eq!(ops[1].operands.len(), 2);
/// ```
pub fn parse_content_stream(data: &[u8]) -> Result<Vec<Operation>> {
    ContentReader::new(data).collect()
}

/// Full key for an abbreviated inline image key.
fn expand_key(key: &Name) -> Name {
    let full = match key.as_bytes() {
        b"BPC" => "BitsPerComponent",
        b"CS" => "ColorSpace",
        b"D" => "Decode",
        b"DP" => "DecodeParms",
        b"F" => "Filter",
        b"H" => "Height",
        b"IM" => "ImageMask",
        b"I" => "Interpolate",
        b"L" => "Length",
        b"W" => "Width",
        _ => return key.clone(),
    };
    Name::from(full)
}

/// Expand abbreviated color space and filter names.
fn expand_value(key: &Name, value: Object) -> Object {
    let expand_name = |name: &Name| -> Name {
        let full = match name.as_bytes() {
            b"G" => "DeviceGray",
            b"RGB" => "DeviceRGB",
            b"CMYK" => "DeviceCMYK",
            b"I" => "Indexed",
            b"AHx" => "ASCIIHexDecode",
            b"A85" => "ASCII85Decode",
            b"LZW" => "LZWDecode",
            b"Fl" => "FlateDecode",
            b"RL" => "RunLengthDecode",
            b"CCF" => "CCITTFaxDecode",
            b"DCT" => "DCTDecode",
            _ => return name.clone(),
        };
        Name::from(full)
    };
    if !matches!(key.as_bytes(), b"CS" | b"ColorSpace" | b"F" | b"Filter") {
        return value;
    }
    match value {
        Object::Name(n) => Object::Name(expand_name(&n)),
        Object::Array(items) => Object::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Object::Name(n) => Object::Name(expand_name(&n)),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

/// Byte size of unfiltered image data, when the dictionary determines it.
fn expected_length(dict: &Dictionary) -> Option<usize> {
    if let Some(len) = dict.get_integer("Length") {
        return usize::try_from(len).ok();
    }
    if dict.contains_key("Filter") {
        return None;
    }
    let width = usize::try_from(dict.get_integer("Width")?).ok()?;
    let height = usize::try_from(dict.get_integer("Height")?).ok()?;
    let mask = dict.get("ImageMask").and_then(Object::as_bool).unwrap_or(false);
    let (components, bpc) = if mask {
        (1, 1)
    } else {
        let components = match dict.get("ColorSpace") {
            Some(Object::Name(n)) => match n.as_bytes() {
                b"DeviceGray" | b"CalGray" | b"Indexed" => 1,
                b"DeviceRGB" | b"CalRGB" | b"Lab" => 3,
                b"DeviceCMYK" => 4,
                _ => return None,
            },
            Some(Object::Array(a)) if a.first().and_then(Object::as_name_str) == Some("Indexed") => 1,
            _ => return None,
        };
        (components, usize::try_from(dict.get_integer("BitsPerComponent").unwrap_or(8)).ok()?)
    };
    let row = (width.checked_mul(components)?.checked_mul(bpc)? + 7) / 8;
    row.checked_mul(height)
}

fn is_ei_at(data: &[u8], pos: usize) -> bool {
    data.get(pos..pos + 2) == Some(b"EI")
        && data.get(pos + 2).map_or(true, |&b| is_whitespace(b) || is_delimiter(b))
}

/// Locate the end of inline image data starting at `start`.
///
/// Returns the end of the data and the position just past `EI`. The
/// computed length is tried first; otherwise the first `EI` preceded by
/// whitespace and followed by whitespace, a delimiter or the end wins.
fn find_image_end(data: &[u8], start: usize, dict: &Dictionary) -> Option<(usize, usize)> {
    if let Some(len) = expected_length(dict) {
        let end = start.checked_add(len)?;
        if end <= data.len() {
            let mut pos = end;
            while data.get(pos).copied().is_some_and(is_whitespace) {
                pos += 1;
            }
            if is_ei_at(data, pos) {
                return Some((end, pos + 2));
            }
        }
        log::debug!("Inline image length {} does not end at EI; scanning", len);
    }

    let mut pos = start;
    while pos + 2 <= data.len() {
        if pos > start && is_whitespace(data[pos - 1]) && is_ei_at(data, pos) {
            return Some((pos - 1, pos + 2));
        }
        pos += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(ops: &[Operation]) -> Vec<&str> {
        ops.iter().map(|op| op.operator.as_str()).collect()
    }

    #[test]
    fn test_parse_simple_text() {
        let ops = parse_content_stream(b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET").unwrap();
        assert_eq!(names(&ops), ["BT", "Tf", "Td", "Tj", "ET"]);
        assert_eq!(ops[1].operands, vec![Object::from("F1"), Object::Integer(12)]);
        assert_eq!(ops[3].operands[0].as_string().unwrap().as_bytes(), b"Hello");
        assert_eq!(ops[4].offset, 35);
    }

    #[test]
    fn test_parse_tj_array_and_booleans() {
        let ops = parse_content_stream(b"[(He) -50 (llo)] TJ true null /P <</MCID 3>> BDC").unwrap();
        assert_eq!(ops[0].operands[0].as_array().unwrap().len(), 3);
        assert_eq!(ops[1].operator, "BDC");
        assert_eq!(ops[1].operands.len(), 4);
        assert_eq!(ops[1].operands[0], Object::Boolean(true));
    }

    #[test]
    fn test_quote_operators_and_star() {
        let ops = parse_content_stream(b"T* (a) ' 1 2 (b) \"").unwrap();
        assert_eq!(names(&ops), ["T*", "'", "\""]);
        assert_eq!(ops[2].operands.len(), 3);
    }

    #[test]
    fn test_integers_are_not_references_without_r() {
        let ops = parse_content_stream(b"1 0 0 1 0 0 cm 0 0 1 rg").unwrap();
        assert_eq!(ops[0].operands.len(), 6);
        assert_eq!(ops[1].operands.len(), 3);
    }

    #[test]
    fn test_inline_image_by_length() {
        // The data itself contains " EI"; the computed length skips it
        let data = b"q BI /W 2 /H 2 /CS /G /BPC 8 ID \x00 EI EI Q";
        let ops = parse_content_stream(data).unwrap();
        assert_eq!(names(&ops), ["q", "BI", "Q"]);
        let image = ops[1].inline_image.as_ref().unwrap();
        assert_eq!(image.dict.get_integer("Width"), Some(2));
        assert_eq!(image.dict.get_name("ColorSpace"), Some("DeviceGray"));
        assert_eq!(&image.data[..], b"\x00 EI");
    }

    #[test]
    fn test_inline_image_by_scan() {
        let data = b"BI /W 4 /H 1 /F /AHx ID 0A0B0C0D> EI 10 w";
        let ops = parse_content_stream(data).unwrap();
        assert_eq!(names(&ops), ["BI", "w"]);
        let image = ops[0].inline_image.as_ref().unwrap();
        assert_eq!(image.dict.get_name("Filter"), Some("ASCIIHexDecode"));
        assert_eq!(&image.data[..], b"0A0B0C0D>");
    }

    #[test]
    fn test_inline_image_without_ei_is_error() {
        let mut reader = ContentReader::with_options(b"BI /W 1 /H 1 ID abc", ParserOptions::strict());
        assert!(reader.next().unwrap().is_err());
    }

    #[test]
    fn test_lenient_skips_garbage() {
        let mut reader = ContentReader::new(b"1 w ) 2 w");
        let ops: Vec<Operation> = reader.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(names(&ops), ["w", "w"]);
        assert_eq!(ops[1].operands, vec![Object::Integer(2)]);
        assert_eq!(reader.take_warnings().len(), 1);
    }

    #[test]
    fn test_strict_reports_garbage() {
        let result: Result<Vec<Operation>> = ContentReader::with_options(b"1 w ) 2 w", ParserOptions::strict()).collect();
        assert!(matches!(result, Err(Error::Syntax { .. })));
    }

    #[test]
    fn test_empty_and_comments() {
        assert!(parse_content_stream(b"").unwrap().is_empty());
        assert!(parse_content_stream(b"  % only a comment\n").unwrap().is_empty());
    }
}
