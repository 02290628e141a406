//! PDF object serialization.
//!
//! Serializes [`Object`]s to their byte representation according to
//! ISO 32000-1:2008 §7.3. Output is deterministic: dictionaries emit in
//! insertion order and numbers use a fixed formatting rule.

use std::io::Write;

use crate::object::{Dictionary, Name, Object, ObjectRef, PdfString, Stream, StringFormat};

/// Serializer for PDF objects.
///
/// Converts objects to bytes following PDF syntax. Strings keep the flavor
/// they were read in, names re-escape bytes outside the regular character
/// set, and stream `/Length` always matches the bytes written.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Whether to use compact formatting (minimal whitespace)
    compact: bool,
}

impl ObjectSerializer {
    /// Create a serializer that puts each dictionary entry on its own line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact serializer (minimal whitespace).
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_object(&mut buf, obj);
        buf
    }

    /// Serialize an object to a string (for debugging).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).into_owned()
    }

    /// Serialize an indirect object definition.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn serialize_indirect(&self, reference: ObjectRef, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        let _ = self.write_indirect(&mut buf, reference, obj);
        buf
    }

    /// Write an indirect object definition.
    pub fn write_indirect<W: Write>(&self, w: &mut W, reference: ObjectRef, obj: &Object) -> std::io::Result<()> {
        writeln!(w, "{} {} obj", reference.id, reference.gen)?;
        self.write_object(w, obj)?;
        w.write_all(b"\nendobj\n")
    }

    /// Write an object.
    pub fn write_object<W: Write>(&self, w: &mut W, obj: &Object) -> std::io::Result<()> {
        match obj {
            Object::Null => w.write_all(b"null"),
            Object::Boolean(b) => w.write_all(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => write!(w, "{}", i),
            Object::Real(r) => write_real(w, *r),
            Object::String(s) => write_string(w, s),
            Object::Name(n) => write_name(w, n),
            Object::Array(arr) => self.write_array(w, arr),
            Object::Dictionary(dict) => self.write_dictionary(w, dict),
            Object::Stream(stream) => self.write_stream(w, stream),
            Object::Reference(r) => write!(w, "{} {} R", r.id, r.gen),
        }
    }

    /// Write a PDF array.
    fn write_array<W: Write>(&self, w: &mut W, arr: &[Object]) -> std::io::Result<()> {
        w.write_all(b"[")?;
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                w.write_all(b" ")?;
            }
            self.write_object(w, obj)?;
        }
        w.write_all(b"]")
    }

    /// Write a PDF dictionary in insertion order.
    fn write_dictionary<W: Write>(&self, w: &mut W, dict: &Dictionary) -> std::io::Result<()> {
        w.write_all(b"<<")?;
        for (i, (key, value)) in dict.iter().enumerate() {
            if !self.compact {
                w.write_all(b"\n  ")?;
            } else if i > 0 {
                w.write_all(b" ")?;
            }
            write_name(w, key)?;
            w.write_all(b" ")?;
            self.write_object(w, value)?;
        }
        if !self.compact && !dict.is_empty() {
            writeln!(w)?;
        }
        w.write_all(b">>")
    }

    /// Write a PDF stream with `/Length` set to the stored byte count.
    fn write_stream<W: Write>(&self, w: &mut W, stream: &Stream) -> std::io::Result<()> {
        let data = stream.raw_data();
        let mut dict = stream.dict.clone();
        dict.set("Length", Object::Integer(data.len() as i64));

        self.write_dictionary(w, &dict)?;
        w.write_all(b"\nstream\n")?;
        w.write_all(data)?;
        w.write_all(b"\nendstream")
    }
}

/// Write a real number.
///
/// Uses the shortest decimal that reads back as the same `f64`, never in
/// exponent form. Integral values keep a `.0` so they re-read as reals.
/// Non-finite values have no PDF syntax and are written as `0`.
pub fn write_real<W: Write>(w: &mut W, value: f64) -> std::io::Result<()> {
    if !value.is_finite() {
        log::warn!("Non-finite real {} written as 0", value);
        return w.write_all(b"0");
    }
    if value == 0.0 {
        return w.write_all(b"0.0");
    }
    if value.fract() == 0.0 {
        write!(w, "{}.0", value)
    } else {
        write!(w, "{}", value)
    }
}

/// Format a real number the way [`write_real`] does.
pub fn format_real(value: f64) -> String {
    let mut buf = Vec::new();
    let _ = write_real(&mut buf, value);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Write a PDF string in its original flavor.
///
/// Literal strings escape `(`, `)` and `\`, use the named escapes for
/// line feed, carriage return, tab, backspace and form feed, and write
/// other bytes below 0x20 or from 0x80 up as three-digit octal.
pub fn write_string<W: Write>(w: &mut W, s: &PdfString) -> std::io::Result<()> {
    match s.format {
        StringFormat::Hex => {
            w.write_all(b"<")?;
            for byte in s.as_bytes() {
                write!(w, "{:02X}", byte)?;
            }
            w.write_all(b">")
        },
        StringFormat::Literal => {
            w.write_all(b"(")?;
            for &byte in s.as_bytes() {
                match byte {
                    b'(' => w.write_all(b"\\(")?,
                    b')' => w.write_all(b"\\)")?,
                    b'\\' => w.write_all(b"\\\\")?,
                    b'\n' => w.write_all(b"\\n")?,
                    b'\r' => w.write_all(b"\\r")?,
                    b'\t' => w.write_all(b"\\t")?,
                    0x08 => w.write_all(b"\\b")?,
                    0x0C => w.write_all(b"\\f")?,
                    0x20..=0x7E => w.write_all(&[byte])?,
                    _ => write!(w, "\\{:03o}", byte)?,
                }
            }
            w.write_all(b")")
        },
    }
}

/// Write a PDF name.
///
/// Names start with `/`; bytes outside the regular character set (and `#`
/// itself) are written as `#xx`.
pub fn write_name<W: Write>(w: &mut W, name: &Name) -> std::io::Result<()> {
    w.write_all(b"/")?;
    for &byte in name.as_bytes() {
        if is_regular_name_byte(byte) {
            w.write_all(&[byte])?;
        } else {
            write!(w, "#{:02X}", byte)?;
        }
    }
    Ok(())
}

fn is_regular_name_byte(byte: u8) -> bool {
    matches!(byte, 0x21..=0x7E)
        && !matches!(
            byte,
            b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;

    #[test]
    fn test_serialize_null() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::Null), "null");
    }

    #[test]
    fn test_serialize_boolean() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::Boolean(true)), "true");
        assert_eq!(s.serialize_to_string(&Object::Boolean(false)), "false");
    }

    #[test]
    fn test_serialize_integer() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::Integer(42)), "42");
        assert_eq!(s.serialize_to_string(&Object::Integer(-123)), "-123");
    }

    #[test]
    fn test_serialize_real() {
        assert_eq!(format_real(3.14258), "3.14258");
        assert_eq!(format_real(1.0), "1.0");
        assert_eq!(format_real(-0.0), "0.0");
        assert_eq!(format_real(0.5), "0.5");
        assert_eq!(format_real(-12.75), "-12.75");
        assert_eq!(format_real(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_real(1e-7), "0.0000001");
        assert_eq!(format_real(f64::NAN), "0");
    }

    #[test]
    fn test_serialize_literal_string() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::String(PdfString::literal(b"Hello".to_vec()))), "(Hello)");
        assert_eq!(
            s.serialize_to_string(&Object::String(PdfString::literal(b"Test (parens)\\".to_vec()))),
            "(Test \\(parens\\)\\\\)"
        );
        assert_eq!(
            s.serialize_to_string(&Object::String(PdfString::literal(vec![b'a', b'\n', 0x01, 0xE9]))),
            "(a\\n\\001\\351)"
        );
    }

    #[test]
    fn test_serialize_hex_string_keeps_flavor() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::String(PdfString::hex(vec![0x00, 0xFF, 0x80]))), "<00FF80>");
        assert_eq!(s.serialize_to_string(&Object::String(PdfString::hex(b"AB".to_vec()))), "<4142>");
    }

    #[test]
    fn test_serialize_name() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::Name(Name::from("Type"))), "/Type");
        assert_eq!(
            s.serialize_to_string(&Object::Name(Name::from("Name With Space"))),
            "/Name#20With#20Space"
        );
        assert_eq!(s.serialize_to_string(&Object::Name(Name::from("A#B(C)"))), "/A#23B#28C#29");
        assert_eq!(s.serialize_to_string(&Object::Name(Name::new(vec![0xE9]))), "/#E9");
    }

    #[test]
    fn test_serialize_array() {
        let s = ObjectSerializer::compact();
        let arr = Object::Array(vec![Object::Integer(1), Object::Real(2.5), Object::Null]);
        assert_eq!(s.serialize_to_string(&arr), "[1 2.5 null]");
    }

    #[test]
    fn test_serialize_dictionary_insertion_order() {
        let s = ObjectSerializer::compact();
        let dict = dict! { "Type" => "Page", "Count" => 1, "Annots" => Vec::<Object>::new() };
        assert_eq!(s.serialize_to_string(&Object::Dictionary(dict.clone())), "<</Type /Page /Count 1 /Annots []>>");

        let pretty = ObjectSerializer::new().serialize_to_string(&Object::Dictionary(dict));
        assert_eq!(pretty, "<<\n  /Type /Page\n  /Count 1\n  /Annots []\n>>");
    }

    #[test]
    fn test_serialize_reference() {
        let s = ObjectSerializer::new();
        let r = Object::Reference(ObjectRef::new(10, 0));
        assert_eq!(s.serialize_to_string(&r), "10 0 R");
    }

    #[test]
    fn test_serialize_indirect() {
        let s = ObjectSerializer::new();
        let bytes = s.serialize_indirect(ObjectRef::new(1, 2), &Object::Integer(42));
        assert_eq!(bytes, b"1 2 obj\n42\nendobj\n");
    }

    #[test]
    fn test_serialize_stream_rewrites_length() {
        let s = ObjectSerializer::compact();
        let mut stream = Stream::new(dict! { "Filter" => "FlateDecode" }, b"stream data".to_vec());
        stream.dict.set("Length", 999);

        let result = s.serialize_to_string(&Object::Stream(stream));
        assert_eq!(result, "<</Filter /FlateDecode /Length 11>>\nstream\nstream data\nendstream");
    }
}
