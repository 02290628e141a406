//! Object stream parsing (PDF 1.5+).
//!
//! Object streams (`/Type /ObjStm`) store many small objects in one
//! compressed stream:
//!
//! ```text
//! 12 0 obj
//! << /Type /ObjStm /N 4 /First 20 /Filter /FlateDecode >>
//! stream
//! 10 0 11 15 13 28 14 42    % N pairs: (obj_num, offset relative to /First)
//! <dict> <array> ...         % object bodies
//! endstream
//! endobj
//! ```
//!
//! Resolving `Compressed(12, 3)` decodes stream 12, reads its header and
//! parses the fourth body from the slice between its offset and the next.

use bytes::Bytes;

use crate::decoders::FilterPipeline;
use crate::error::{Error, Result};
use crate::lexer::{Lexer, TokenKind};
use crate::object::{Object, Stream};
use crate::parser::Parser;
use crate::parser_config::ParserOptions;

/// A decoded object stream with its header index.
#[derive(Debug, Clone)]
pub struct ObjectStream {
    /// (object number, offset relative to `/First`) pairs in header order
    pairs: Vec<(u32, usize)>,
    /// Decoded stream body
    data: Bytes,
    /// Offset of the first object body
    first: usize,
}

impl ObjectStream {
    /// Decode `stream` and read its header.
    pub fn parse(stream: &Stream, pipeline: &FilterPipeline) -> Result<Self> {
        let dict = &stream.dict;
        if let Some(t) = dict.get_name("Type") {
            if t != "ObjStm" {
                return Err(Error::Resolve(format!("expected /Type /ObjStm, got /{}", t)));
            }
        }

        let n = dict
            .get_integer("N")
            .filter(|n| (0..=1_000_000).contains(n))
            .ok_or_else(|| Error::Resolve("object stream has no valid /N".to_string()))?
            as usize;
        let first = dict
            .get_integer("First")
            .filter(|f| *f >= 0)
            .ok_or_else(|| Error::Resolve("object stream has no valid /First".to_string()))?
            as usize;

        let data = Bytes::from(pipeline.decode(stream.raw_data(), &stream.filters(), false)?.data);
        if data.len() < first {
            return Err(Error::Resolve(format!(
                "object stream body is {} bytes, /First is {}",
                data.len(),
                first
            )));
        }

        let pairs = parse_header(&data[..first], n)?;
        Ok(Self { pairs, data, first })
    }

    /// Number of objects in the header.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True if the header is empty.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Object number stored at `index`.
    pub fn object_number(&self, index: usize) -> Option<u32> {
        self.pairs.get(index).map(|(num, _)| *num)
    }

    /// Parse the object at header position `index`.
    pub fn object_at(&self, index: usize, options: &ParserOptions) -> Result<(u32, Object)> {
        let (num, rel) = *self.pairs.get(index).ok_or_else(|| {
            Error::Resolve(format!("object stream has {} objects, index {} requested", self.pairs.len(), index))
        })?;
        let start = self.first + rel;
        let end = self
            .pairs
            .get(index + 1)
            .map(|(_, next)| self.first + next)
            .filter(|e| *e > start)
            .unwrap_or(self.data.len())
            .min(self.data.len());
        if start >= end {
            return Err(Error::Resolve(format!(
                "object {} at offset {} lies outside the object stream",
                num, rel
            )));
        }
        let object = Parser::new(&self.data[start..end])
            .with_options(*options)
            .parse_object()?;
        Ok((num, object))
    }

    /// Find and parse object `num`, wherever it sits in the header.
    pub fn get(&self, num: u32, options: &ParserOptions) -> Option<Result<Object>> {
        let index = self.pairs.iter().position(|(n, _)| *n == num)?;
        Some(self.object_at(index, options).map(|(_, obj)| obj))
    }
}

/// Read `count` (object number, offset) pairs.
fn parse_header(data: &[u8], count: usize) -> Result<Vec<(u32, usize)>> {
    let mut lexer = Lexer::new(data);
    let mut pairs = Vec::with_capacity(count);
    while pairs.len() < count {
        let num = lexer.next_significant()?;
        let off = lexer.next_significant()?;
        match (num.map(|t| t.kind), off.map(|t| t.kind)) {
            (Some(TokenKind::Integer(n)), Some(TokenKind::Integer(o))) if n >= 0 && o >= 0 => {
                pairs.push((n as u32, o as usize));
            },
            (None, _) | (_, None) => {
                log::warn!("Object stream header has {} of {} pairs", pairs.len(), count);
                break;
            },
            _ => return Err(Error::Resolve("malformed object stream header".to_string())),
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::FilterSpec;
    use crate::dict;

    fn object_stream(header: &str, bodies: &str, n: i64, compress: bool) -> Stream {
        let mut content = header.as_bytes().to_vec();
        let first = content.len() as i64;
        content.extend_from_slice(bodies.as_bytes());
        let mut d = dict! { "Type" => "ObjStm", "N" => n, "First" => first };
        if compress {
            FilterSpec::write_chain(&mut d, &[FilterSpec::new("FlateDecode")]);
        }
        Stream::from_decoded(d, &content).unwrap()
    }

    #[test]
    fn test_object_at_index() {
        let stream = object_stream("10 0 11 8 13 16 14 20 ", "<</A 1>>[1 2 3] (x) /Name", 4, true);
        let objstm = ObjectStream::parse(&stream, &FilterPipeline::default()).unwrap();
        assert_eq!(objstm.len(), 4);

        let (num, obj) = objstm.object_at(3, &ParserOptions::default()).unwrap();
        assert_eq!(num, 14);
        assert_eq!(obj.as_name_str(), Some("Name"));

        let arr = objstm.get(11, &ParserOptions::default()).unwrap().unwrap();
        assert_eq!(arr.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_index_out_of_range() {
        let stream = object_stream("5 0 ", "null", 1, false);
        let objstm = ObjectStream::parse(&stream, &FilterPipeline::default()).unwrap();
        assert!(objstm.object_at(1, &ParserOptions::default()).is_err());
        assert!(objstm.get(6, &ParserOptions::default()).is_none());
    }

    #[test]
    fn test_first_beyond_body() {
        let d = dict! { "Type" => "ObjStm", "N" => 1, "First" => 100 };
        let stream = Stream::new(d, b"1 0 null".to_vec());
        assert!(ObjectStream::parse(&stream, &FilterPipeline::default()).is_err());
    }

    #[test]
    fn test_wrong_type_rejected() {
        let d = dict! { "Type" => "XRef", "N" => 0, "First" => 0 };
        let stream = Stream::new(d, Vec::new());
        assert!(ObjectStream::parse(&stream, &FilterPipeline::default()).is_err());
    }
}
