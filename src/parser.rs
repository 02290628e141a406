//! PDF object parser.
//!
//! Assembles tokens from the [`Lexer`] into objects. Grammar:
//!
//! ```text
//! object       := null | bool | number | name | string | array | dict | stream | indirect_ref
//! array        := '[' object* ']'
//! dict         := '<<' (name object)* '>>'
//! indirect_ref := int int 'R'
//! indirect_obj := int int 'obj' object 'endobj'
//! ```
//!
//! A stream is a dictionary followed by `stream`, an end-of-line, the
//! payload and `endstream`. The payload length comes from `/Length`, which may
//! be an indirect reference resolved through a caller-supplied callback. When
//! the declared length does not land on `endstream`, the scanned position wins
//! and a [`WarningKind::LengthMismatch`] warning is recorded.

use bytes::Bytes;

use crate::error::{Error, Result, Warning, WarningKind};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::object::{Dictionary, Name, Object, ObjectRef, PdfString, Stream};
use crate::parser_config::ParserOptions;

/// Callback used to resolve an indirect `/Length`.
pub type LengthResolver<'r> = &'r mut dyn FnMut(ObjectRef) -> Option<i64>;

/// An `N G obj ... endobj` construct.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    /// Object number and generation from the header
    pub reference: ObjectRef,
    /// The object body
    pub object: Object,
    /// Absolute offset just past `endobj` (or past the body if `endobj` is missing)
    pub end_offset: usize,
}

/// Recursive-descent parser over a byte slice.
#[derive(Debug)]
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    options: ParserOptions,
    at_eof: bool,
    warnings: Vec<Warning>,
}

impl<'a> Parser<'a> {
    /// Parse `data` with default options.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Parse `data` whose first byte lies at absolute offset `base`.
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self {
            lexer: Lexer::with_base(data, base),
            options: ParserOptions::default(),
            at_eof: true,
            warnings: Vec::new(),
        }
    }

    /// Replace parser options.
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Declare whether `data` ends at the end of the file. When it does not,
    /// running out of bytes is reported as [`Error::UnexpectedEof`] so that the
    /// caller can retry with a larger window.
    pub fn with_file_end(mut self, at_eof: bool) -> Self {
        self.at_eof = at_eof;
        self
    }

    /// Access the underlying lexer.
    pub fn lexer(&mut self) -> &mut Lexer<'a> {
        &mut self.lexer
    }

    /// Drain warnings recorded so far.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    fn eof(&self) -> Error {
        Error::UnexpectedEof {
            offset: self.lexer.absolute_position(),
        }
    }

    fn next(&mut self) -> Result<Token> {
        match self.lexer.next_significant()? {
            Some(token) => Ok(token),
            None => Err(self.eof()),
        }
    }

    /// Parse one direct object. A dictionary followed by `stream` is read as a
    /// stream whose `/Length` must be direct (or is found by scanning).
    pub fn parse_object(&mut self) -> Result<Object> {
        let token = self.next()?;
        let object = self.parse_from_token(token, 0)?;
        self.maybe_stream(object, None)
    }

    /// Parse an object starting from an already-read token. Streams are not
    /// recognized here; content-stream readers use this for operands.
    pub fn parse_from_token(&mut self, token: Token, depth: usize) -> Result<Object> {
        if depth > self.options.max_nesting {
            return Err(Error::RecursionLimitExceeded(self.options.max_nesting as u32));
        }
        match token.kind {
            TokenKind::Integer(i) => self.integer_or_reference(i),
            TokenKind::Real(r) => Ok(Object::Real(r)),
            TokenKind::Name(n) => Ok(Object::Name(n)),
            TokenKind::LiteralString(bytes) => Ok(Object::String(PdfString::literal(bytes))),
            TokenKind::HexString(bytes) => Ok(Object::String(PdfString::hex(bytes))),
            TokenKind::StartArray => self.parse_array(depth),
            TokenKind::StartDict => self.parse_dictionary(depth).map(Object::Dictionary),
            TokenKind::Keyword(kw) => match kw.as_slice() {
                b"null" => Ok(Object::Null),
                b"true" => Ok(Object::Boolean(true)),
                b"false" => Ok(Object::Boolean(false)),
                other => Err(Error::syntax(
                    token.offset,
                    format!("unexpected keyword '{}'", String::from_utf8_lossy(other)),
                )),
            },
            TokenKind::EndArray => Err(Error::syntax(token.offset, "unexpected ']'")),
            TokenKind::EndDict => Err(Error::syntax(token.offset, "unexpected '>>'")),
            TokenKind::Comment(_) => Err(Error::syntax(token.offset, "unexpected comment")),
        }
    }

    /// `int` or `int int R`.
    fn integer_or_reference(&mut self, first: i64) -> Result<Object> {
        let saved = self.lexer.position();
        // Lookahead failures (including running off the end) just mean "not a reference"
        if let Ok(Some(Token {
            kind: TokenKind::Integer(gen),
            ..
        })) = self.lexer.next_significant()
        {
            if let Ok(Some(t)) = self.lexer.next_significant() {
                if t.kind.is_keyword(b"R")
                    && (0..=u32::MAX as i64).contains(&first)
                    && (0..=u16::MAX as i64).contains(&gen)
                {
                    return Ok(Object::Reference(ObjectRef::new(first as u32, gen as u16)));
                }
            }
        }
        self.lexer.set_position(saved);
        Ok(Object::Integer(first))
    }

    fn parse_array(&mut self, depth: usize) -> Result<Object> {
        let mut items = Vec::new();
        loop {
            let token = self.next()?;
            if token.kind == TokenKind::EndArray {
                return Ok(Object::Array(items));
            }
            items.push(self.parse_from_token(token, depth + 1)?);
        }
    }

    fn parse_dictionary(&mut self, depth: usize) -> Result<Dictionary> {
        let mut dict = Dictionary::new();
        loop {
            let token = self.next()?;
            let key: Name = match token.kind {
                TokenKind::EndDict => return Ok(dict),
                TokenKind::Name(n) => n,
                other => {
                    return Err(Error::syntax(
                        token.offset,
                        format!("dictionary key must be a name, found {:?}", other),
                    ));
                },
            };
            let value_token = self.next()?;
            if value_token.kind == TokenKind::EndDict {
                // `/Key >>`: a key without a value reads as null
                if self.options.strict {
                    return Err(Error::syntax(value_token.offset, "dictionary key without value"));
                }
                dict.set(key, Object::Null);
                return Ok(dict);
            }
            let value = self.parse_from_token(value_token, depth + 1)?;
            dict.set(key, value);
        }
    }

    /// Parse `N G obj <object> endobj` at the current position.
    pub fn parse_indirect_object(
        &mut self,
        length_resolver: Option<LengthResolver<'_>>,
    ) -> Result<IndirectObject> {
        let header = self.next()?;
        let header_offset = header.offset;
        let TokenKind::Integer(num) = header.kind else {
            return Err(Error::syntax(header_offset, "expected object number"));
        };
        let gen = match self.next()?.kind {
            TokenKind::Integer(g) => g,
            _ => return Err(Error::syntax(header_offset, "expected generation number")),
        };
        let obj_kw = self.next()?;
        if !obj_kw.kind.is_keyword(b"obj") {
            return Err(Error::syntax(obj_kw.offset, "expected 'obj'"));
        }
        if !(0..=u32::MAX as i64).contains(&num) || !(0..=u16::MAX as i64).contains(&gen) {
            return Err(Error::syntax(header_offset, "object number out of range"));
        }
        let reference = ObjectRef::new(num as u32, gen as u16);

        let object = match self.lexer.peek_significant()? {
            // `N G obj endobj` is an empty (null) object
            Some(t) if t.kind.is_keyword(b"endobj") => Object::Null,
            _ => {
                let token = self.next()?;
                let body = self.parse_from_token(token, 0)?;
                self.maybe_stream(body, length_resolver)?
            },
        };

        let before_end = self.lexer.position();
        match self.lexer.next_significant() {
            Ok(Some(t)) if t.kind.is_keyword(b"endobj") => {},
            _ => {
                self.lexer.set_position(before_end);
                if self.options.strict || !self.options.allow_missing_endobj {
                    return Err(Error::syntax(self.lexer.absolute_position(), "missing 'endobj'"));
                }
                log::debug!("Object {} has no 'endobj'", reference);
            },
        }

        Ok(IndirectObject {
            reference,
            object,
            end_offset: self.lexer.absolute_position(),
        })
    }

    /// If `object` is a dictionary followed by `stream`, read the payload.
    fn maybe_stream(
        &mut self,
        object: Object,
        length_resolver: Option<LengthResolver<'_>>,
    ) -> Result<Object> {
        let Object::Dictionary(dict) = object else {
            return Ok(object);
        };
        let saved = self.lexer.position();
        match self.lexer.next_significant() {
            Ok(Some(t)) if t.kind.is_keyword(b"stream") => {},
            _ => {
                self.lexer.set_position(saved);
                return Ok(Object::Dictionary(dict));
            },
        }
        let stream = self.read_stream_payload(dict, length_resolver)?;
        Ok(Object::Stream(stream))
    }

    fn read_stream_payload(
        &mut self,
        dict: Dictionary,
        length_resolver: Option<LengthResolver<'_>>,
    ) -> Result<Stream> {
        let data = self.lexer.data();
        let mut start = self.lexer.position();

        // Tolerate spaces between `stream` and the end-of-line
        while matches!(data.get(start), Some(b' ') | Some(b'\t')) {
            start += 1;
        }
        match (data.get(start), data.get(start + 1)) {
            (Some(b'\r'), Some(b'\n')) => start += 2,
            (Some(b'\n'), _) => start += 1,
            (Some(b'\r'), _) => {
                if self.options.strict {
                    return Err(Error::syntax(
                        self.lexer.base() + start,
                        "'stream' followed by bare CR",
                    ));
                }
                log::warn!("'stream' keyword followed by bare CR at {}", self.lexer.base() + start);
                start += 1;
            },
            (None, _) => return Err(self.eof()),
            _ => {
                log::debug!("No end-of-line after 'stream' at {}", self.lexer.base() + start);
            },
        }

        let declared = match dict.get("Length") {
            Some(Object::Integer(n)) if *n >= 0 => Some(*n as usize),
            Some(Object::Reference(r)) => match length_resolver {
                Some(resolve) => resolve(*r).filter(|n| *n >= 0).map(|n| n as usize),
                None => None,
            },
            _ => None,
        };

        let abs_start = self.lexer.base() + start;

        // Trust /Length when `endstream` follows it
        if let Some(len) = declared {
            if let Some(end) = start.checked_add(len) {
                if end <= data.len() {
                    if let Some(after) = endstream_at(data, end) {
                        self.lexer.set_position(after);
                        let payload = Bytes::copy_from_slice(&data[start..end]);
                        return Ok(Stream::from_parts(dict, payload));
                    }
                } else if !self.at_eof {
                    return Err(Error::UnexpectedEof { offset: abs_start + len });
                }
            }
        }

        // Fall back to scanning for `endstream`
        match find_endstream(&data[start..]) {
            Some((payload_len, after)) => {
                if let Some(len) = declared {
                    if !self.options.allow_malformed_streams {
                        return Err(Error::syntax(
                            abs_start,
                            format!("/Length {} does not match stream payload {}", len, payload_len),
                        ));
                    }
                    self.warnings.push(
                        Warning::new(
                            WarningKind::LengthMismatch,
                            format!("declared /Length {}, found {} bytes", len, payload_len),
                        )
                        .at(abs_start as u64),
                    );
                } else if dict.contains_key("Length") {
                    self.warnings.push(
                        Warning::new(
                            WarningKind::LengthMismatch,
                            format!("unusable /Length, found {} bytes", payload_len),
                        )
                        .at(abs_start as u64),
                    );
                }
                self.lexer.set_position(start + after);
                let payload = Bytes::copy_from_slice(&data[start..start + payload_len]);
                Ok(Stream::from_parts(dict, payload))
            },
            None if !self.at_eof => Err(Error::UnexpectedEof { offset: data.len() + self.lexer.base() }),
            None => {
                if self.options.strict {
                    return Err(Error::syntax(abs_start, "stream without 'endstream'"));
                }
                let end = declared
                    .and_then(|len| start.checked_add(len))
                    .unwrap_or(data.len())
                    .min(data.len());
                self.warnings.push(
                    Warning::new(WarningKind::LengthMismatch, "stream has no 'endstream'")
                        .at(abs_start as u64),
                );
                self.lexer.set_position(end);
                Ok(Stream::from_parts(dict, Bytes::copy_from_slice(&data[start..end])))
            },
        }
    }
}

/// If `endstream` follows position `pos` (after optional whitespace), return
/// the position just past it.
fn endstream_at(data: &[u8], pos: usize) -> Option<usize> {
    let mut i = pos;
    while i < data.len() && crate::lexer::is_whitespace(data[i]) {
        i += 1;
    }
    if data[i..].starts_with(b"endstream") {
        Some(i + b"endstream".len())
    } else {
        None
    }
}

/// Scan for `endstream`. Returns the payload length (excluding the EOL that
/// precedes the keyword) and the position just past the keyword.
fn find_endstream(data: &[u8]) -> Option<(usize, usize)> {
    let keyword = b"endstream";
    let pos = data.windows(keyword.len()).position(|w| w == keyword)?;
    let mut end = pos;
    if end > 0 && data[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && data[end - 1] == b'\r' {
            end -= 1;
        }
    } else if end > 0 && data[end - 1] == b'\r' {
        end -= 1;
    }
    Some((end, pos + keyword.len()))
}

/// Parse a single direct object from `data`.
pub fn parse_object(data: &[u8]) -> Result<Object> {
    Parser::new(data).parse_object()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::StringFormat;

    fn parse(data: &[u8]) -> Object {
        parse_object(data).unwrap()
    }

    #[test]
    fn test_parse_primitives() {
        assert_eq!(parse(b"null"), Object::Null);
        assert_eq!(parse(b"true"), Object::Boolean(true));
        assert_eq!(parse(b"false"), Object::Boolean(false));
        assert_eq!(parse(b"-17"), Object::Integer(-17));
        assert_eq!(parse(b"2.5"), Object::Real(2.5));
        assert_eq!(parse(b"/Name"), Object::from("Name"));
    }

    #[test]
    fn test_parse_string_flavors() {
        let lit = parse(b"(Hello)");
        let hex = parse(b"<48656C6C6F>");
        assert_eq!(lit.as_string().unwrap().bytes, b"Hello");
        assert_eq!(lit.as_string().unwrap().format, StringFormat::Literal);
        assert_eq!(hex.as_string().unwrap().bytes, b"Hello");
        assert_eq!(hex.as_string().unwrap().format, StringFormat::Hex);
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse(b"10 0 R"), Object::Reference(ObjectRef::new(10, 0)));
        assert_eq!(parse(b"5 2 R"), Object::Reference(ObjectRef::new(5, 2)));
    }

    #[test]
    fn test_integer_not_reference() {
        let mut p = Parser::new(b"10 0 obj");
        assert_eq!(p.parse_object().unwrap(), Object::Integer(10));
        assert_eq!(p.parse_object().unwrap(), Object::Integer(0));
    }

    #[test]
    fn test_parse_array_mixed() {
        let obj = parse(b"[1 2.0 /N (s) [3] 4 0 R]");
        let arr = obj.as_array().unwrap();
        assert_eq!(arr.len(), 6);
        assert_eq!(arr[4], Object::Array(vec![Object::Integer(3)]));
        assert_eq!(arr[5], Object::Reference(ObjectRef::new(4, 0)));
    }

    #[test]
    fn test_parse_dictionary_keeps_order() {
        let obj = parse(b"<< /Type /Page /Parent 3 0 R /Count 2 >>");
        let d = obj.as_dict().unwrap();
        let keys: Vec<String> = d.keys().map(|k| k.to_string_lossy()).collect();
        assert_eq!(keys, vec!["Type", "Parent", "Count"]);
        assert_eq!(d.get("Parent").unwrap().as_reference(), Some(ObjectRef::new(3, 0)));
    }

    #[test]
    fn test_non_name_key_is_syntax_error() {
        match parse_object(b"<< 1 2 >>") {
            Err(Error::Syntax { offset, .. }) => assert_eq!(offset, 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_array_is_eof() {
        assert!(matches!(parse_object(b"[1 2"), Err(Error::UnexpectedEof { .. })));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = "[".repeat(300) + &"]".repeat(300);
        assert!(matches!(
            parse_object(deep.as_bytes()),
            Err(Error::RecursionLimitExceeded(_))
        ));
    }

    #[test]
    fn test_stream_with_direct_length() {
        let obj = parse(b"<< /Length 5 >>\nstream\nHello\nendstream");
        let s = obj.as_stream().unwrap();
        assert_eq!(&s.raw_data()[..], b"Hello");
    }

    #[test]
    fn test_stream_crlf_after_keyword() {
        let obj = parse(b"<< /Length 3 >> stream\r\nabc\r\nendstream");
        assert_eq!(&obj.as_stream().unwrap().raw_data()[..], b"abc");
    }

    #[test]
    fn test_stream_bare_cr_accepted_leniently() {
        let obj = parse(b"<< /Length 3 >> stream\rabc endstream");
        assert_eq!(&obj.as_stream().unwrap().raw_data()[..], b"abc");
    }

    #[test]
    fn test_stream_bare_cr_rejected_strictly() {
        let result = Parser::new(b"<< /Length 3 >> stream\rabc endstream")
            .with_options(ParserOptions::strict())
            .parse_object();
        assert!(matches!(result, Err(Error::Syntax { .. })));
    }

    #[test]
    fn test_stream_length_mismatch_scanned_wins() {
        let mut p = Parser::new(b"<< /Length 2 >>\nstream\nHello\nendstream");
        let obj = p.parse_object().unwrap();
        assert_eq!(&obj.as_stream().unwrap().raw_data()[..], b"Hello");
        let warnings = p.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::LengthMismatch);
    }

    #[test]
    fn test_stream_payload_may_contain_keyword_when_length_correct() {
        let obj = parse(b"<< /Length 9 >>\nstream\nendstream\nendstream");
        assert_eq!(&obj.as_stream().unwrap().raw_data()[..], b"endstream");
    }

    #[test]
    fn test_indirect_object() {
        let mut p = Parser::with_base(b"7 0 obj\n<< /A 1 >>\nendobj\n", 100);
        let ind = p.parse_indirect_object(None).unwrap();
        assert_eq!(ind.reference, ObjectRef::new(7, 0));
        assert_eq!(ind.object.as_dict().unwrap().get_integer("A"), Some(1));
        assert_eq!(ind.end_offset, 100 + 25);
    }

    #[test]
    fn test_indirect_object_length_by_reference() {
        let data = b"4 0 obj << /Length 8 0 R >> stream\nabcdef\nendstream endobj";
        let mut p = Parser::new(data);
        let mut lookups = Vec::new();
        let mut resolver = |r: ObjectRef| {
            lookups.push(r);
            Some(6)
        };
        let ind = p.parse_indirect_object(Some(&mut resolver)).unwrap();
        assert_eq!(&ind.object.as_stream().unwrap().raw_data()[..], b"abcdef");
        assert_eq!(lookups, vec![ObjectRef::new(8, 0)]);
        assert!(p.take_warnings().is_empty());
    }

    #[test]
    fn test_indirect_object_missing_endobj_lenient() {
        let mut p = Parser::new(b"1 0 obj 42 2 0 obj");
        let ind = p.parse_indirect_object(None).unwrap();
        assert_eq!(ind.object, Object::Integer(42));
    }

    #[test]
    fn test_empty_indirect_object() {
        let ind = Parser::new(b"3 0 obj endobj").parse_indirect_object(None).unwrap();
        assert_eq!(ind.object, Object::Null);
    }

    #[test]
    fn test_partial_window_reports_eof() {
        let data = b"1 0 obj << /Length 100 >> stream\nabc";
        let result = Parser::new(data).with_file_end(false).parse_indirect_object(None);
        assert!(matches!(result, Err(Error::UnexpectedEof { .. })));
    }

    #[test]
    fn test_find_endstream_strips_eol() {
        assert_eq!(find_endstream(b"ab\r\nendstream"), Some((2, 13)));
        assert_eq!(find_endstream(b"ab endstream"), Some((3, 12)));
        assert_eq!(find_endstream(b"no keyword"), None);
    }
}
