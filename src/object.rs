//! PDF object types.
//!
//! The object model is a closed tagged union ([`Object`]). Dictionaries keep
//! insertion order so that a parsed file re-serializes with its keys in the
//! order they were read. Names and strings carry raw bytes; textual
//! interpretation is left to the caller.

use std::borrow::Borrow;
use std::fmt;
use std::sync::OnceLock;

use bytes::Bytes;
use indexmap::IndexMap;

use crate::decoders::{FilterPipeline, FilterSpec};
use crate::error::{Error, Result};

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// Name (starting with / in the file)
    Name(Name),
    /// String, literal or hex
    String(PdfString),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dictionary),
    /// Stream (dictionary + data)
    Stream(Stream),
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

/// A PDF name. Compared by byte identity; `#xx` escapes are already decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Name(Vec<u8>);

impl Name {
    /// Create a name from raw (already unescaped) bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Name(bytes.into())
    }

    /// Raw bytes of the name.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The name as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// The name as text, replacing invalid UTF-8 sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    /// Consume into raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl Borrow<[u8]> for Name {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(s.as_bytes().to_vec())
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name(s.into_bytes())
    }
}

impl From<&[u8]> for Name {
    fn from(b: &[u8]) -> Self {
        Name(b.to_vec())
    }
}

impl From<Vec<u8>> for Name {
    fn from(b: Vec<u8>) -> Self {
        Name(b)
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", String::from_utf8_lossy(&self.0))
    }
}

/// How a string was written in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StringFormat {
    /// Parenthesized `( ... )`
    #[default]
    Literal,
    /// Angle-bracketed `< ... >`
    Hex,
}

/// A PDF string: raw bytes plus the flavor it was written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PdfString {
    /// Raw (unescaped) bytes
    pub bytes: Vec<u8>,
    /// Origin flavor, preserved on write
    pub format: StringFormat,
}

impl PdfString {
    /// A literal-flavored string.
    pub fn literal(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            format: StringFormat::Literal,
        }
    }

    /// A hex-flavored string.
    pub fn hex(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            format: StringFormat::Hex,
        }
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Interpret as a PDF text string.
    ///
    /// UTF-16BE and UTF-8 are recognized by their byte-order marks; anything
    /// else is PDFDocEncoding.
    pub fn to_text(&self) -> String {
        decode_text_string(&self.bytes)
    }

    /// Encode `text` as a PDF text string: PDFDocEncoding when every character
    /// is representable, otherwise UTF-16BE with a BOM.
    pub fn from_text(text: &str) -> Self {
        if let Some(bytes) = crate::fonts::encodings::encode_pdfdoc(text) {
            return PdfString::literal(bytes);
        }
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        PdfString::hex(bytes)
    }
}

/// Decode a PDF text string (ISO 32000-1 §7.9.2.2).
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if bytes.len() >= 3 && bytes[..3] == [0xEF, 0xBB, 0xBF] {
        return String::from_utf8_lossy(&bytes[3..]).into_owned();
    }
    bytes
        .iter()
        .map(|&b| crate::fonts::encodings::pdfdoc_to_unicode(b).unwrap_or('\u{FFFD}'))
        .collect()
}

/// An insertion-ordered dictionary keyed by [`Name`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary(IndexMap<Name, Object>);

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&Object> {
        self.0.get(key.as_bytes())
    }

    /// Look up a key by raw name bytes.
    pub fn get_by_name(&self, key: &Name) -> Option<&Object> {
        self.0.get(key)
    }

    /// Mutable lookup.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Object> {
        self.0.get_mut(key.as_bytes())
    }

    /// Insert or replace; a replaced key keeps its original position.
    pub fn set(&mut self, key: impl Into<Name>, value: impl Into<Object>) -> Option<Object> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a key, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Object> {
        self.0.shift_remove(key.as_bytes())
    }

    /// True if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key.as_bytes())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, Name, Object> {
        self.0.iter()
    }

    /// Iterate mutably in insertion order.
    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, Name, Object> {
        self.0.iter_mut()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Name> {
        self.0.keys()
    }

    /// Value of a Name entry as text.
    pub fn get_name(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Object::as_name_str)
    }

    /// Value of an Integer entry.
    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Object::as_integer)
    }

    /// Value of a numeric entry (Integer or Real).
    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Object::as_number)
    }

    /// True if `/Type` equals `type_name`.
    pub fn has_type(&self, type_name: &str) -> bool {
        self.get_name("Type") == Some(type_name)
    }
}

impl FromIterator<(Name, Object)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (Name, Object)>>(iter: I) -> Self {
        Dictionary(iter.into_iter().collect())
    }
}

impl IntoIterator for Dictionary {
    type Item = (Name, Object);
    type IntoIter = indexmap::map::IntoIter<Name, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a Name, &'a Object);
    type IntoIter = indexmap::map::Iter<'a, Name, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A stream: dictionary plus stored (encoded) payload.
///
/// Decoded bytes are computed on first request and memoized on the stream.
#[derive(Debug, Clone)]
pub struct Stream {
    /// Stream dictionary
    pub dict: Dictionary,
    data: Bytes,
    decoded: OnceLock<Bytes>,
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        self.dict == other.dict && self.data == other.data
    }
}

impl Stream {
    /// Create a stream from already-encoded bytes. `/Length` is set to match.
    pub fn new(mut dict: Dictionary, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        dict.set("Length", Object::Integer(data.len() as i64));
        Self {
            dict,
            data,
            decoded: OnceLock::new(),
        }
    }

    /// Create a stream exactly as read from a file, leaving `/Length` untouched.
    pub(crate) fn from_parts(dict: Dictionary, data: Bytes) -> Self {
        Self {
            dict,
            data,
            decoded: OnceLock::new(),
        }
    }

    /// Create a stream from decoded bytes, encoding them with the filter
    /// chain declared in `dict`.
    pub fn from_decoded(dict: Dictionary, decoded: &[u8]) -> Result<Self> {
        let filters = FilterSpec::chain_from_dict(&dict);
        let encoded = FilterPipeline::default().encode(decoded, &filters)?;
        let stream = Self::new(dict, encoded);
        let _ = stream.decoded.set(Bytes::copy_from_slice(decoded));
        Ok(stream)
    }

    /// Stored (encoded) payload.
    pub fn raw_data(&self) -> &Bytes {
        &self.data
    }

    /// Replace the stored payload; `/Length` follows.
    pub fn set_raw_data(&mut self, data: impl Into<Bytes>) {
        self.data = data.into();
        self.dict.set("Length", Object::Integer(self.data.len() as i64));
        self.decoded = OnceLock::new();
    }

    /// Replace the content, re-encoding it with the current filter chain.
    pub fn set_decoded_data(&mut self, decoded: &[u8]) -> Result<()> {
        let filters = self.filters();
        let encoded = FilterPipeline::default().encode(decoded, &filters)?;
        self.set_raw_data(encoded);
        let _ = self.decoded.set(Bytes::copy_from_slice(decoded));
        Ok(())
    }

    /// Filter chain from `/Filter` and `/DecodeParms`, in application order.
    pub fn filters(&self) -> Vec<FilterSpec> {
        FilterSpec::chain_from_dict(&self.dict)
    }

    /// True for image XObjects, whose filter failures truncate instead of propagating.
    pub fn is_image(&self) -> bool {
        self.dict.get_name("Subtype") == Some("Image")
    }

    /// Decoded payload, if it has already been computed.
    pub fn cached_decoded(&self) -> Option<&Bytes> {
        self.decoded.get()
    }

    /// Memoize `decoded` unless a result is already stored; returns the stored one.
    pub(crate) fn remember_decoded(&self, decoded: Bytes) -> Bytes {
        self.decoded.get_or_init(|| decoded).clone()
    }

    /// Decoded payload using the default pipeline.
    pub fn decoded_data(&self) -> Result<Bytes> {
        self.decode_with(&FilterPipeline::default())
    }

    /// Decoded payload using a configured pipeline. The first successful
    /// result is memoized and returned on later calls.
    pub fn decode_with(&self, pipeline: &FilterPipeline) -> Result<Bytes> {
        if let Some(cached) = self.decoded.get() {
            return Ok(cached.clone());
        }
        let outcome = pipeline.decode(&self.data, &self.filters(), self.is_image())?;
        if let Some(err) = &outcome.truncated_by {
            log::warn!("Image stream decode truncated: {}", err);
        }
        let bytes = Bytes::from(outcome.data);
        Ok(self.decoded.get_or_init(|| bytes).clone())
    }
}

impl Object {
    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream(_) => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// A literal string object.
    pub fn string_literal(bytes: impl Into<Vec<u8>>) -> Self {
        Object::String(PdfString::literal(bytes))
    }

    /// A hex string object.
    pub fn string_hex(bytes: impl Into<Vec<u8>>) -> Self {
        Object::String(PdfString::hex(bytes))
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer or Real as f64.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Name as UTF-8 text.
    pub fn as_name_str(&self) -> Option<&str> {
        self.as_name().and_then(Name::as_str)
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Mutable dictionary access for Dictionary and Stream objects.
    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&mut s.dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Mutable array access.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to stream.
    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to real number.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to string.
    pub fn as_string(&self) -> Option<&PdfString> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::InvalidObjectType {
            expected: expected.to_string(),
            found: self.type_name().to_string(),
        }
    }

    /// Dictionary or stream dictionary, or a typed error.
    pub fn try_dict(&self) -> Result<&Dictionary> {
        self.as_dict().ok_or_else(|| self.mismatch("Dictionary"))
    }

    /// Array, or a typed error.
    pub fn try_array(&self) -> Result<&Vec<Object>> {
        self.as_array().ok_or_else(|| self.mismatch("Array"))
    }

    /// Integer, or a typed error.
    pub fn try_integer(&self) -> Result<i64> {
        self.as_integer().ok_or_else(|| self.mismatch("Integer"))
    }

    /// Number, or a typed error.
    pub fn try_number(&self) -> Result<f64> {
        self.as_number().ok_or_else(|| self.mismatch("Number"))
    }

    /// Name, or a typed error.
    pub fn try_name(&self) -> Result<&Name> {
        self.as_name().ok_or_else(|| self.mismatch("Name"))
    }

    /// Stream, or a typed error.
    pub fn try_stream(&self) -> Result<&Stream> {
        self.as_stream().ok_or_else(|| self.mismatch("Stream"))
    }

    /// Reference, or a typed error.
    pub fn try_reference(&self) -> Result<ObjectRef> {
        self.as_reference().ok_or_else(|| self.mismatch("Reference"))
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Boolean(b)
    }
}

impl From<i64> for Object {
    fn from(i: i64) -> Self {
        Object::Integer(i)
    }
}

impl From<i32> for Object {
    fn from(i: i32) -> Self {
        Object::Integer(i as i64)
    }
}

impl From<u32> for Object {
    fn from(i: u32) -> Self {
        Object::Integer(i as i64)
    }
}

impl From<usize> for Object {
    fn from(i: usize) -> Self {
        Object::Integer(i as i64)
    }
}

impl From<f64> for Object {
    fn from(r: f64) -> Self {
        Object::Real(r)
    }
}

impl From<f32> for Object {
    fn from(r: f32) -> Self {
        Object::Real(r as f64)
    }
}

impl From<&str> for Object {
    fn from(s: &str) -> Self {
        Object::Name(Name::from(s))
    }
}

impl From<Name> for Object {
    fn from(n: Name) -> Self {
        Object::Name(n)
    }
}

impl From<PdfString> for Object {
    fn from(s: PdfString) -> Self {
        Object::String(s)
    }
}

impl From<Vec<Object>> for Object {
    fn from(v: Vec<Object>) -> Self {
        Object::Array(v)
    }
}

impl From<Dictionary> for Object {
    fn from(d: Dictionary) -> Self {
        Object::Dictionary(d)
    }
}

impl From<Stream> for Object {
    fn from(s: Stream) -> Self {
        Object::Stream(s)
    }
}

impl From<ObjectRef> for Object {
    fn from(r: ObjectRef) -> Self {
        Object::Reference(r)
    }
}

/// Build a [`Dictionary`] from `key => value` pairs.
///
/// ```
/// use pdf_ferrite::dict;
/// let d = dict! { "Type" => "Page", "Rotate" => 90 };
/// assert_eq!(d.get_name("Type"), Some("Page"));
/// ```
#[macro_export]
macro_rules! dict {
    () => { $crate::object::Dictionary::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut d = $crate::object::Dictionary::new();
        $( d.set($key, $crate::object::Object::from($value)); )+
        d
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_integer() {
        let obj = Object::Integer(42);
        assert_eq!(obj.as_integer(), Some(42));
        assert_eq!(obj.as_number(), Some(42.0));
        assert!(obj.as_name().is_none());
        assert!(!obj.is_null());
    }

    #[test]
    fn test_object_name() {
        let obj = Object::from("Type");
        assert_eq!(obj.as_name_str(), Some("Type"));
        assert!(obj.as_integer().is_none());
    }

    #[test]
    fn test_name_byte_identity() {
        let a = Name::new(b"Foo Bar".to_vec());
        let b = Name::from("Foo Bar");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "/Foo Bar");
        assert!(Name::new(vec![0xFF]).as_str().is_none());
    }

    #[test]
    fn test_string_flavors() {
        let lit = Object::string_literal(b"Hi".to_vec());
        let hex = Object::string_hex(b"Hi".to_vec());
        assert_eq!(lit.as_string().unwrap().format, StringFormat::Literal);
        assert_eq!(hex.as_string().unwrap().format, StringFormat::Hex);
        assert_ne!(lit, hex);
    }

    #[test]
    fn test_text_string_utf16() {
        let s = PdfString::hex(vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]);
        assert_eq!(s.to_text(), "Hi");
    }

    #[test]
    fn test_text_string_pdfdoc() {
        let s = PdfString::literal(vec![b'a', 0x84, b'b']);
        assert_eq!(s.to_text(), "a\u{2014}b");
    }

    #[test]
    fn test_from_text_picks_encoding() {
        assert_eq!(PdfString::from_text("plain").format, StringFormat::Literal);
        let wide = PdfString::from_text("\u{4E2D}");
        assert_eq!(wide.bytes, vec![0xFE, 0xFF, 0x4E, 0x2D]);
        assert_eq!(wide.to_text(), "\u{4E2D}");
    }

    #[test]
    fn test_dictionary_preserves_insertion_order() {
        let mut d = Dictionary::new();
        d.set("Zeta", 1);
        d.set("Alpha", 2);
        d.set("Mid", 3);
        let keys: Vec<String> = d.keys().map(|k| k.to_string_lossy()).collect();
        assert_eq!(keys, vec!["Zeta", "Alpha", "Mid"]);

        d.set("Zeta", 10);
        d.remove("Alpha");
        let keys: Vec<String> = d.keys().map(|k| k.to_string_lossy()).collect();
        assert_eq!(keys, vec!["Zeta", "Mid"]);
        assert_eq!(d.get_integer("Zeta"), Some(10));
    }

    #[test]
    fn test_dict_macro_and_type() {
        let d = dict! { "Type" => "Page", "Rotate" => 90 };
        assert!(d.has_type("Page"));
        assert_eq!(d.get_integer("Rotate"), Some(90));
    }

    #[test]
    fn test_object_stream_dict_access() {
        let s = Stream::new(dict! { "Foo" => 1 }, b"abc".to_vec());
        let obj = Object::Stream(s);
        let d = obj.as_dict().unwrap();
        assert_eq!(d.get_integer("Length"), Some(3));
        assert_eq!(d.get_integer("Foo"), Some(1));
    }

    #[test]
    fn test_try_accessors_report_types() {
        let obj = Object::Array(vec![]);
        match obj.try_dict() {
            Err(Error::InvalidObjectType { expected, found }) => {
                assert_eq!(expected, "Dictionary");
                assert_eq!(found, "Array");
            },
            other => panic!("unexpected {:?}", other),
        }
        assert!(obj.try_array().is_ok());
    }

    #[test]
    fn test_object_ref_display() {
        assert_eq!(ObjectRef::new(10, 2).to_string(), "10 2 R");
    }

    #[test]
    fn test_stream_decode_no_filter() {
        let s = Stream::new(Dictionary::new(), b"raw".to_vec());
        assert_eq!(&s.decoded_data().unwrap()[..], b"raw");
    }

    #[test]
    fn test_stream_from_decoded_roundtrip() {
        let dict = dict! { "Filter" => "ASCIIHexDecode" };
        let s = Stream::from_decoded(dict, b"Hello").unwrap();
        assert_eq!(&s.raw_data()[..], b"48656C6C6F>");
        assert_eq!(s.dict.get_integer("Length"), Some(11));
        assert_eq!(&s.decoded_data().unwrap()[..], b"Hello");
    }

    #[test]
    fn test_stream_set_decoded_updates_length() {
        let mut s = Stream::new(dict! { "Filter" => "ASCIIHexDecode" }, b"41>".to_vec());
        assert_eq!(&s.decoded_data().unwrap()[..], b"A");
        s.set_decoded_data(b"AB").unwrap();
        assert_eq!(s.dict.get_integer("Length"), Some(5));
        assert_eq!(&s.decoded_data().unwrap()[..], b"AB");
    }

    #[test]
    fn test_stream_equality_ignores_memo() {
        let a = Stream::new(Dictionary::new(), b"x".to_vec());
        let b = a.clone();
        let _ = a.decoded_data();
        assert_eq!(a, b);
    }
}
