//! PDF lexer (tokenizer).
//!
//! This module turns PDF bytes into typed tokens. Each token records the byte
//! offset where it starts so that higher layers can report precise syntax
//! errors and locate stream payloads.
//!
//! # PDF Syntax Overview
//!
//! - Numbers: integers (42, -123) and reals (3.14, -2.5, .5)
//! - Strings: literal ((Hello)) and hexadecimal (<48656C6C6F>)
//! - Names: identifiers starting with / (/Type, /A#20B)
//! - Delimiters: `[`, `]`, `<<`, `>>`
//! - Comments: `%` to end of line (`%PDF-1.7` and `%%EOF` are comments too)
//! - Keywords: every other run of regular characters (`obj`, `R`, `true`, `Tj`)
//!
//! Whitespace is 0, 9, 10, 12, 13 and 32.

use nom::{
    IResult,
    bytes::complete::{take_till, take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{opt, recognize},
    sequence::{pair, preceded},
};

use crate::error::{Error, Result};
use crate::object::Name;

/// True for the six PDF whitespace bytes.
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

/// True for the PDF delimiter bytes.
pub fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// True for bytes that are neither whitespace nor delimiters.
pub fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Token payload.
#[derive(Debug, PartialEq, Clone)]
pub enum TokenKind {
    /// Integer number
    Integer(i64),
    /// Real number
    Real(f64),
    /// Name with `#xx` escapes decoded
    Name(Name),
    /// Literal string with escapes decoded
    LiteralString(Vec<u8>),
    /// Hex string decoded to bytes
    HexString(Vec<u8>),
    /// `[`
    StartArray,
    /// `]`
    EndArray,
    /// `<<`
    StartDict,
    /// `>>`
    EndDict,
    /// Comment text after `%`, without the line terminator
    Comment(Vec<u8>),
    /// Any other run of regular characters, plus `{` and `}`
    Keyword(Vec<u8>),
}

impl TokenKind {
    /// True if this is the keyword `kw`.
    pub fn is_keyword(&self, kw: &[u8]) -> bool {
        matches!(self, TokenKind::Keyword(k) if k == kw)
    }
}

/// A token and the byte offset where it starts.
#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    /// Kind and payload
    pub kind: TokenKind,
    /// Absolute byte offset
    pub offset: usize,
}

// ============================================================================
// nom primitives
// ============================================================================

fn comment(input: &[u8]) -> IResult<&[u8], &[u8]> {
    preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n'))(input)
}

fn whitespace(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while(is_whitespace)(input)
}

/// Recognize the text of a number: optional sign, digits, optional fraction.
fn number_text(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (rest, text) = recognize(pair(
        opt(one_of("+-")),
        pair(opt(digit1), opt(preceded(char('.'), opt(digit1)))),
    ))(input)?;

    let digits = text.iter().filter(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit)));
    }
    Ok((rest, text))
}

fn parse_number(input: &[u8]) -> IResult<&[u8], TokenKind> {
    let (rest, text) = number_text(input)?;
    // number_text only admits ASCII
    let s = std::str::from_utf8(text).unwrap_or("0");
    if text.contains(&b'.') {
        let normalized = if s.ends_with('.') { format!("{}0", s) } else { s.to_string() };
        let value = normalized.parse::<f64>().map_err(|_| {
            nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Float))
        })?;
        Ok((rest, TokenKind::Real(value)))
    } else {
        match s.parse::<i64>() {
            Ok(value) => Ok((rest, TokenKind::Integer(value))),
            // Too large for i64; keep the magnitude as a real
            Err(_) => {
                let value = s.parse::<f64>().map_err(|_| {
                    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
                })?;
                Ok((rest, TokenKind::Real(value)))
            },
        }
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decode `#xx` escapes in a raw name. Malformed escapes are kept verbatim.
///
/// ```
/// # use pdf_ferrite::lexer::decode_name_escapes;
/// assert_eq!(decode_name_escapes(b"A#20B#23C"), b"A B#C");
/// assert_eq!(decode_name_escapes(b"A#"), b"A#");
/// ```
pub fn decode_name_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            if let (Some(h), Some(l)) = (hex_value(raw[i + 1]), hex_value(raw[i + 2])) {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    out
}

fn parse_name(input: &[u8]) -> IResult<&[u8], TokenKind> {
    let (rest, raw) = preceded(char('/'), take_while(is_regular))(input)?;
    Ok((rest, TokenKind::Name(Name::new(decode_name_escapes(raw)))))
}

fn parse_keyword(input: &[u8]) -> IResult<&[u8], TokenKind> {
    let (rest, word) = take_while1(is_regular)(input)?;
    Ok((rest, TokenKind::Keyword(word.to_vec())))
}

/// Outcome of scanning a string body, independent of nom's error type.
enum Scan {
    Done(usize, Vec<u8>),
    Eof,
    Bad(usize, &'static str),
}

/// Scan a literal string body starting just after `(`.
///
/// Returns the number of bytes consumed (including the closing `)`) and the
/// decoded bytes.
fn scan_literal_string(input: &[u8]) -> Scan {
    let mut out = Vec::new();
    let mut depth = 1usize;
    let mut i = 0;
    while i < input.len() {
        let c = input[i];
        match c {
            b'\\' => {
                i += 1;
                let Some(&e) = input.get(i) else {
                    return Scan::Eof;
                };
                match e {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0C),
                    b'(' | b')' | b'\\' => out.push(e),
                    b'0'..=b'7' => {
                        let mut value: u32 = 0;
                        let mut n = 0;
                        while n < 3 {
                            match input.get(i + n) {
                                Some(&d @ b'0'..=b'7') => {
                                    value = value * 8 + (d - b'0') as u32;
                                    n += 1;
                                },
                                _ => break,
                            }
                        }
                        out.push((value & 0xFF) as u8);
                        i += n;
                        continue;
                    },
                    // Line continuation
                    b'\r' => {
                        if input.get(i + 1) == Some(&b'\n') {
                            i += 1;
                        }
                    },
                    b'\n' => {},
                    // Unknown escape: the backslash is dropped
                    other => out.push(other),
                }
                i += 1;
            },
            b'(' => {
                depth += 1;
                out.push(c);
                i += 1;
            },
            b')' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return Scan::Done(i, out);
                }
                out.push(c);
            },
            // Unescaped end-of-line markers read as a single LF
            b'\r' => {
                out.push(b'\n');
                i += 1;
                if input.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            _ => {
                out.push(c);
                i += 1;
            },
        }
    }
    Scan::Eof
}

/// Scan a hex string body starting just after `<`.
fn scan_hex_string(input: &[u8]) -> Scan {
    let mut out = Vec::new();
    let mut high: Option<u8> = None;
    for (i, &c) in input.iter().enumerate() {
        if c == b'>' {
            if let Some(h) = high {
                out.push(h << 4);
            }
            return Scan::Done(i + 1, out);
        }
        if is_whitespace(c) {
            continue;
        }
        let Some(v) = hex_value(c) else {
            return Scan::Bad(i, "invalid character in hex string");
        };
        match high.take() {
            Some(h) => out.push(h << 4 | v),
            None => high = Some(v),
        }
    }
    Scan::Eof
}

/// Decode a hex string body (without angle brackets). Odd digit counts pad
/// with a trailing zero nibble; non-hex characters are skipped.
pub fn decode_hex(body: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = body.iter().filter_map(|&c| hex_value(c)).collect();
    digits
        .chunks(2)
        .map(|pair| pair[0] << 4 | pair.get(1).copied().unwrap_or(0))
        .collect()
}

// ============================================================================
// Lexer
// ============================================================================

/// Streaming tokenizer over a byte slice.
///
/// `base` is the absolute file offset of `data[0]`; token offsets and errors
/// are reported in absolute terms.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Lexer<'a> {
    /// Tokenize `data`, reporting offsets relative to its start.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, base: 0 }
    }

    /// Tokenize `data` whose first byte sits at absolute offset `base`.
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Underlying bytes.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Position relative to the start of `data`.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Absolute offset of the current position.
    pub fn absolute_position(&self) -> usize {
        self.base + self.pos
    }

    /// Base offset of the slice.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Move to a position relative to the start of `data`.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    /// Bytes from the current position on.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// True once only whitespace and comments remain.
    pub fn at_end(&mut self) -> bool {
        self.skip_whitespace_and_comments();
        self.pos >= self.data.len()
    }

    /// Skip whitespace only.
    pub fn skip_whitespace(&mut self) {
        if let Ok((rest, _)) = whitespace(self.remaining()) {
            self.pos = self.data.len() - rest.len();
        }
    }

    /// Skip whitespace and comments.
    pub fn skip_whitespace_and_comments(&mut self) {
        loop {
            self.skip_whitespace();
            match comment(self.remaining()) {
                Ok((rest, _)) => self.pos = self.data.len() - rest.len(),
                Err(_) => break,
            }
        }
    }

    fn syntax(&self, at: usize, reason: &str) -> Error {
        Error::syntax(self.base + at, reason)
    }

    /// Produce the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();
        let start = self.pos;
        let input = self.remaining();
        let Some(&first) = input.first() else {
            return Ok(None);
        };
        let offset = self.base + start;

        let (consumed, kind) = match first {
            b'%' => {
                let (rest, text) =
                    comment(input).map_err(|_| self.syntax(start, "malformed comment"))?;
                (input.len() - rest.len(), TokenKind::Comment(text.to_vec()))
            },
            b'/' => {
                let (rest, kind) =
                    parse_name(input).map_err(|_| self.syntax(start, "malformed name"))?;
                (input.len() - rest.len(), kind)
            },
            b'(' => match scan_literal_string(&input[1..]) {
                Scan::Done(n, bytes) => (n + 1, TokenKind::LiteralString(bytes)),
                Scan::Eof => return Err(Error::UnexpectedEof { offset }),
                Scan::Bad(at, reason) => return Err(self.syntax(start + 1 + at, reason)),
            },
            b'<' => {
                if input.get(1) == Some(&b'<') {
                    (2, TokenKind::StartDict)
                } else {
                    match scan_hex_string(&input[1..]) {
                        Scan::Done(n, bytes) => (n + 1, TokenKind::HexString(bytes)),
                        Scan::Eof => return Err(Error::UnexpectedEof { offset }),
                        Scan::Bad(at, reason) => return Err(self.syntax(start + 1 + at, reason)),
                    }
                }
            },
            b'>' => {
                if input.get(1) == Some(&b'>') {
                    (2, TokenKind::EndDict)
                } else {
                    return Err(self.syntax(start, "unexpected '>'"));
                }
            },
            b'[' => (1, TokenKind::StartArray),
            b']' => (1, TokenKind::EndArray),
            b'{' | b'}' => (1, TokenKind::Keyword(vec![first])),
            b')' => return Err(self.syntax(start, "unbalanced ')'")),
            b'0'..=b'9' | b'+' | b'-' | b'.' => match parse_number(input) {
                Ok((rest, kind)) => (input.len() - rest.len(), kind),
                // A lone sign or dot: read it as a keyword so callers can decide
                Err(_) => {
                    let (rest, kind) =
                        parse_keyword(input).map_err(|_| self.syntax(start, "malformed number"))?;
                    (input.len() - rest.len(), kind)
                },
            },
            _ => {
                let (rest, kind) =
                    parse_keyword(input).map_err(|_| self.syntax(start, "unexpected byte"))?;
                (input.len() - rest.len(), kind)
            },
        };

        self.pos = start + consumed;
        Ok(Some(Token { kind, offset }))
    }

    /// Next token that is not a comment.
    pub fn next_significant(&mut self) -> Result<Option<Token>> {
        loop {
            match self.next_token()? {
                Some(Token {
                    kind: TokenKind::Comment(_),
                    ..
                }) => continue,
                other => return Ok(other),
            }
        }
    }

    /// Look at the next non-comment token without consuming it.
    pub fn peek_significant(&mut self) -> Result<Option<Token>> {
        let saved = self.pos;
        let token = self.next_significant();
        self.pos = saved;
        token
    }
}

/// Tokenize a whole buffer, skipping nothing.
pub fn tokenize(data: &[u8]) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(data);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(data: &[u8]) -> Vec<TokenKind> {
        tokenize(data).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn one(data: &[u8]) -> TokenKind {
        let mut all = kinds(data);
        assert_eq!(all.len(), 1, "expected one token in {:?}", data);
        all.remove(0)
    }

    // ========================================================================
    // Numbers
    // ========================================================================

    #[test]
    fn test_integers() {
        assert_eq!(one(b"42"), TokenKind::Integer(42));
        assert_eq!(one(b"-123"), TokenKind::Integer(-123));
        assert_eq!(one(b"+17"), TokenKind::Integer(17));
        assert_eq!(one(b"0"), TokenKind::Integer(0));
    }

    #[test]
    fn test_reals() {
        assert_eq!(one(b"3.14"), TokenKind::Real(3.14));
        assert_eq!(one(b"-2.5"), TokenKind::Real(-2.5));
        assert_eq!(one(b".5"), TokenKind::Real(0.5));
        assert_eq!(one(b"-.002"), TokenKind::Real(-0.002));
        assert_eq!(one(b"5."), TokenKind::Real(5.0));
    }

    #[test]
    fn test_integer_overflow_becomes_real() {
        assert_eq!(one(b"99999999999999999999"), TokenKind::Real(1e20));
    }

    #[test]
    fn test_lone_sign_is_keyword() {
        assert_eq!(one(b"-"), TokenKind::Keyword(b"-".to_vec()));
    }

    // ========================================================================
    // Strings
    // ========================================================================

    #[test]
    fn test_literal_string_simple() {
        assert_eq!(one(b"(Hello)"), TokenKind::LiteralString(b"Hello".to_vec()));
        assert_eq!(one(b"()"), TokenKind::LiteralString(vec![]));
    }

    #[test]
    fn test_literal_string_nested_parens() {
        assert_eq!(one(b"(a (b) c)"), TokenKind::LiteralString(b"a (b) c".to_vec()));
    }

    #[test]
    fn test_literal_string_escapes() {
        assert_eq!(
            one(br"(\n\r\t\b\f\\\(\))"),
            TokenKind::LiteralString(b"\n\r\t\x08\x0C\\()".to_vec())
        );
    }

    #[test]
    fn test_literal_string_octal() {
        assert_eq!(one(br"(\101\0532)"), TokenKind::LiteralString(b"A+2".to_vec()));
        assert_eq!(one(br"(\7)"), TokenKind::LiteralString(vec![7]));
    }

    #[test]
    fn test_literal_string_line_continuation() {
        assert_eq!(one(b"(ab\\\ncd)"), TokenKind::LiteralString(b"abcd".to_vec()));
        assert_eq!(one(b"(ab\\\r\ncd)"), TokenKind::LiteralString(b"abcd".to_vec()));
    }

    #[test]
    fn test_literal_string_eol_normalized() {
        assert_eq!(one(b"(a\r\nb\rc)"), TokenKind::LiteralString(b"a\nb\nc".to_vec()));
    }

    #[test]
    fn test_unterminated_literal_string() {
        assert!(matches!(tokenize(b"(abc"), Err(Error::UnexpectedEof { offset: 0 })));
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(one(b"<48656C6C6F>"), TokenKind::HexString(b"Hello".to_vec()));
        assert_eq!(one(b"<48 65\n6c>"), TokenKind::HexString(b"Hel".to_vec()));
    }

    #[test]
    fn test_hex_string_odd_digits() {
        assert_eq!(one(b"<901FA>"), TokenKind::HexString(vec![0x90, 0x1F, 0xA0]));
    }

    #[test]
    fn test_hex_string_invalid_char() {
        match tokenize(b"<4G>") {
            Err(Error::Syntax { offset, .. }) => assert_eq!(offset, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    // ========================================================================
    // Names, delimiters, keywords, comments
    // ========================================================================

    #[test]
    fn test_names() {
        assert_eq!(one(b"/Type"), TokenKind::Name(Name::from("Type")));
        assert_eq!(one(b"/Foo#20Bar"), TokenKind::Name(Name::from("Foo Bar")));
        assert_eq!(one(b"/"), TokenKind::Name(Name::from("")));
        assert_eq!(one(b"/A#FF"), TokenKind::Name(Name::new(vec![b'A', 0xFF])));
    }

    #[test]
    fn test_name_terminated_by_delimiter() {
        assert_eq!(
            kinds(b"/Type/Page"),
            vec![TokenKind::Name(Name::from("Type")), TokenKind::Name(Name::from("Page"))]
        );
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(
            kinds(b"[ ] << >>"),
            vec![
                TokenKind::StartArray,
                TokenKind::EndArray,
                TokenKind::StartDict,
                TokenKind::EndDict
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds(b"1 0 obj true null endobj"),
            vec![
                TokenKind::Integer(1),
                TokenKind::Integer(0),
                TokenKind::Keyword(b"obj".to_vec()),
                TokenKind::Keyword(b"true".to_vec()),
                TokenKind::Keyword(b"null".to_vec()),
                TokenKind::Keyword(b"endobj".to_vec()),
            ]
        );
    }

    #[test]
    fn test_header_and_eof_are_comments() {
        assert_eq!(
            kinds(b"%PDF-1.7\n%%EOF"),
            vec![
                TokenKind::Comment(b"PDF-1.7".to_vec()),
                TokenKind::Comment(b"%EOF".to_vec()),
            ]
        );
    }

    #[test]
    fn test_token_offsets() {
        let tokens = tokenize(b"  /A  (x) 12").unwrap();
        let offsets: Vec<usize> = tokens.iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![2, 6, 10]);
    }

    #[test]
    fn test_base_offset_applied() {
        let mut lexer = Lexer::with_base(b"  42", 100);
        let t = lexer.next_token().unwrap().unwrap();
        assert_eq!(t.offset, 102);
        assert_eq!(lexer.absolute_position(), 104);
    }

    #[test]
    fn test_stray_close_paren_is_syntax_error() {
        assert!(matches!(tokenize(b"abc )"), Err(Error::Syntax { offset: 4, .. })));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut lexer = Lexer::new(b"% c\n/X 1");
        let peeked = lexer.peek_significant().unwrap().unwrap();
        assert_eq!(peeked.kind, TokenKind::Name(Name::from("X")));
        let next = lexer.next_significant().unwrap().unwrap();
        assert_eq!(next, peeked);
    }

    #[test]
    fn test_decode_hex_helper() {
        assert_eq!(decode_hex(b"4 8 6"), vec![0x48, 0x60]);
    }
}
