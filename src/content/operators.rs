//! PDF content stream operators.
//!
//! [`Operator::from_operation`] turns a tokenized [`Operation`] into a typed
//! operator, checking operand count and kind. Missing operands are an
//! [`Error::Interpreter`]; surplus leading operands are dropped, as
//! producers occasionally leave stray values on the stack.

use crate::content::parser::{InlineImage, Operation};
use crate::error::{Error, Result};
use crate::geometry::Matrix;
use crate::object::{Name, Object};

/// A content stream operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    // Text positioning operators
    /// Move text position (Td)
    Td {
        /// Horizontal offset
        tx: f64,
        /// Vertical offset
        ty: f64,
    },
    /// Move text position and set leading (TD)
    TD {
        /// Horizontal offset
        tx: f64,
        /// Vertical offset
        ty: f64,
    },
    /// Set text matrix and text line matrix (Tm)
    Tm(Matrix),
    /// Move to start of next line (T*)
    TStar,

    // Text showing operators
    /// Show text string (Tj)
    Tj {
        /// Text to show (byte array)
        text: Vec<u8>,
    },
    /// Show text with individual glyph positioning (TJ)
    TJ {
        /// Array of text strings and positioning adjustments
        array: Vec<TextElement>,
    },
    /// Move to next line and show text (')
    Quote {
        /// Text to show
        text: Vec<u8>,
    },
    /// Set spacing, move to next line and show text (")
    DoubleQuote {
        /// Word spacing
        word_space: f64,
        /// Character spacing
        char_space: f64,
        /// Text to show
        text: Vec<u8>,
    },

    // Text state operators
    /// Set character spacing (Tc)
    Tc {
        /// Character spacing
        char_space: f64,
    },
    /// Set word spacing (Tw)
    Tw {
        /// Word spacing
        word_space: f64,
    },
    /// Set horizontal scaling percentage (Tz)
    Tz {
        /// Scale
        scale: f64,
    },
    /// Set leading (TL)
    TL {
        /// Leading
        leading: f64,
    },
    /// Set font and size (Tf)
    Tf {
        /// Font resource name
        font: Name,
        /// Font size
        size: f64,
    },
    /// Set rendering mode (Tr)
    Tr {
        /// Mode
        render: i64,
    },
    /// Set text rise (Ts)
    Ts {
        /// Rise
        rise: f64,
    },

    // Graphics state operators
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Concatenate matrix to CTM (cm)
    Cm(Matrix),
    /// Set line width (w)
    SetLineWidth {
        /// Width
        width: f64,
    },
    /// Set line cap (J)
    SetLineCap {
        /// Cap style
        cap_style: i64,
    },
    /// Set line join (j)
    SetLineJoin {
        /// Join style
        join_style: i64,
    },
    /// Set miter limit (M)
    SetMiterLimit {
        /// Limit
        limit: f64,
    },
    /// Set dash pattern (d)
    SetDash {
        /// Dash array
        array: Vec<f64>,
        /// Phase
        phase: f64,
    },
    /// Set rendering intent (ri)
    SetRenderingIntent {
        /// Intent name
        intent: Name,
    },
    /// Set flatness (i)
    SetFlatness {
        /// Tolerance
        tolerance: f64,
    },
    /// Apply an ExtGState resource (gs)
    SetExtGState {
        /// Resource name
        dict_name: Name,
    },

    // Color operators
    /// DeviceGray stroking color (G)
    SetStrokeGray {
        /// Gray level
        gray: f64,
    },
    /// DeviceGray non-stroking color (g)
    SetFillGray {
        /// Gray level
        gray: f64,
    },
    /// DeviceRGB stroking color (RG)
    SetStrokeRgb {
        /// Red
        r: f64,
        /// Green
        g: f64,
        /// Blue
        b: f64,
    },
    /// DeviceRGB non-stroking color (rg)
    SetFillRgb {
        /// Red
        r: f64,
        /// Green
        g: f64,
        /// Blue
        b: f64,
    },
    /// DeviceCMYK stroking color (K)
    SetStrokeCmyk {
        /// Cyan
        c: f64,
        /// Magenta
        m: f64,
        /// Yellow
        y: f64,
        /// Black
        k: f64,
    },
    /// DeviceCMYK non-stroking color (k)
    SetFillCmyk {
        /// Cyan
        c: f64,
        /// Magenta
        m: f64,
        /// Yellow
        y: f64,
        /// Black
        k: f64,
    },
    /// Stroking color space (CS)
    SetStrokeColorSpace {
        /// Color space name
        name: Name,
    },
    /// Non-stroking color space (cs)
    SetFillColorSpace {
        /// Color space name
        name: Name,
    },
    /// Stroking color (SC); arity depends on the current space
    SetStrokeColor {
        /// Components
        components: Vec<f64>,
    },
    /// Non-stroking color (sc); arity depends on the current space
    SetFillColor {
        /// Components
        components: Vec<f64>,
    },
    /// Stroking color with optional pattern (SCN)
    SetStrokeColorN {
        /// Components
        components: Vec<f64>,
        /// Pattern resource name
        pattern: Option<Name>,
    },
    /// Non-stroking color with optional pattern (scn)
    SetFillColorN {
        /// Components
        components: Vec<f64>,
        /// Pattern resource name
        pattern: Option<Name>,
    },

    // Text object operators
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,

    // XObject and image operators
    /// Paint an XObject (Do)
    Do {
        /// XObject resource name
        name: Name,
    },
    /// Paint a shading (sh)
    PaintShading {
        /// Shading resource name
        name: Name,
    },
    /// Inline image (BI … ID … EI)
    InlineImage(InlineImage),

    // Path construction operators
    /// Begin subpath (m)
    MoveTo {
        /// X
        x: f64,
        /// Y
        y: f64,
    },
    /// Line segment (l)
    LineTo {
        /// X
        x: f64,
        /// Y
        y: f64,
    },
    /// Cubic Bézier with two control points (c)
    CurveTo {
        /// First control point X
        x1: f64,
        /// First control point Y
        y1: f64,
        /// Second control point X
        x2: f64,
        /// Second control point Y
        y2: f64,
        /// End point X
        x3: f64,
        /// End point Y
        y3: f64,
    },
    /// Bézier whose first control point is the current point (v)
    CurveToV {
        /// Second control point X
        x2: f64,
        /// Second control point Y
        y2: f64,
        /// End point X
        x3: f64,
        /// End point Y
        y3: f64,
    },
    /// Bézier whose second control point is the end point (y)
    CurveToY {
        /// First control point X
        x1: f64,
        /// First control point Y
        y1: f64,
        /// End point X
        x3: f64,
        /// End point Y
        y3: f64,
    },
    /// Close subpath (h)
    ClosePath,
    /// Rectangle (re)
    Rectangle {
        /// X
        x: f64,
        /// Y
        y: f64,
        /// Width
        width: f64,
        /// Height
        height: f64,
    },

    // Path painting operators
    /// Stroke (S)
    Stroke,
    /// Close and stroke (s)
    CloseStroke,
    /// Fill, nonzero winding (f, F)
    Fill,
    /// Fill, even-odd (f*)
    FillEvenOdd,
    /// Fill and stroke (B)
    FillStroke,
    /// Fill even-odd and stroke (B*)
    FillStrokeEvenOdd,
    /// Close, fill and stroke (b)
    CloseFillStroke,
    /// Close, fill even-odd and stroke (b*)
    CloseFillStrokeEvenOdd,
    /// End path without painting (n)
    EndPath,
    /// Clip, nonzero winding (W)
    ClipNonZero,
    /// Clip, even-odd (W*)
    ClipEvenOdd,

    // Marked content operators
    /// Begin marked content (BMC)
    BeginMarkedContent {
        /// Tag
        tag: Name,
    },
    /// Begin marked content with properties (BDC)
    BeginMarkedContentDict {
        /// Tag
        tag: Name,
        /// Inline dictionary or `/Properties` resource name
        properties: Object,
    },
    /// End marked content (EMC)
    EndMarkedContent,
    /// Marked content point (MP)
    MarkPoint {
        /// Tag
        tag: Name,
    },
    /// Marked content point with properties (DP)
    MarkPointDict {
        /// Tag
        tag: Name,
        /// Inline dictionary or `/Properties` resource name
        properties: Object,
    },

    // Compatibility operators
    /// Begin compatibility section (BX)
    BeginCompatibility,
    /// End compatibility section (EX)
    EndCompatibility,

    // Type 3 glyph metrics
    /// Glyph width (d0)
    SetCharWidth {
        /// Horizontal width
        wx: f64,
        /// Vertical width
        wy: f64,
    },
    /// Glyph width and bounding box (d1)
    SetCacheDevice {
        /// Horizontal width
        wx: f64,
        /// Vertical width
        wy: f64,
    },

    /// Unknown operator, kept with its operands
    Other {
        /// Operator keyword
        name: String,
        /// Operands
        operands: Vec<Object>,
    },
}

/// Element of a TJ array.
#[derive(Debug, Clone, PartialEq)]
pub enum TextElement {
    /// Bytes to show
    String(Vec<u8>),
    /// Adjustment in thousandths of text space, subtracted from the advance
    Offset(f64),
}

/// Operand list with the operator name for error messages.
struct Operands<'a> {
    name: &'a str,
    items: &'a [Object],
}

impl<'a> Operands<'a> {
    /// Keep the last `n` operands; fail if there are fewer.
    fn take(name: &'a str, items: &'a [Object], n: usize) -> Result<Self> {
        if items.len() < n {
            return Err(Error::interpreter(
                name,
                format!("expected {} operands, found {}", n, items.len()),
            ));
        }
        if items.len() > n {
            log::debug!("Operator {} ignoring {} extra operands", name, items.len() - n);
        }
        Ok(Self {
            name,
            items: &items[items.len() - n..],
        })
    }

    fn wrong(&self, i: usize, expected: &str) -> Error {
        Error::interpreter(
            self.name,
            format!("operand {} should be {}, found {}", i, expected, self.items[i].type_name()),
        )
    }

    fn number(&self, i: usize) -> Result<f64> {
        self.items[i].as_number().ok_or_else(|| self.wrong(i, "a number"))
    }

    fn integer(&self, i: usize) -> Result<i64> {
        match &self.items[i] {
            Object::Integer(v) => Ok(*v),
            Object::Real(r) => Ok(r.round() as i64),
            _ => Err(self.wrong(i, "an integer")),
        }
    }

    fn name(&self, i: usize) -> Result<Name> {
        self.items[i].as_name().cloned().ok_or_else(|| self.wrong(i, "a name"))
    }

    fn string(&self, i: usize) -> Result<Vec<u8>> {
        self.items[i]
            .as_string()
            .map(|s| s.as_bytes().to_vec())
            .ok_or_else(|| self.wrong(i, "a string"))
    }

    fn array(&self, i: usize) -> Result<&'a Vec<Object>> {
        self.items[i].as_array().ok_or_else(|| self.wrong(i, "an array"))
    }

    fn matrix(&self) -> Result<Matrix> {
        Ok(Matrix::new(
            self.number(0)?,
            self.number(1)?,
            self.number(2)?,
            self.number(3)?,
            self.number(4)?,
            self.number(5)?,
        ))
    }
}

/// Numeric operands of SC/SCN, with an optional trailing pattern name.
fn color_operands(items: &[Object], allow_pattern: bool) -> (Vec<f64>, Option<Name>) {
    let (pattern, numbers) = match items.split_last() {
        Some((Object::Name(n), rest)) if allow_pattern => (Some(n.clone()), rest),
        _ => (None, items),
    };
    // Count back over the trailing run of numbers
    let start = numbers.iter().rposition(|o| o.as_number().is_none()).map_or(0, |p| p + 1);
    (numbers[start..].iter().filter_map(Object::as_number).collect(), pattern)
}

impl Operator {
    /// Build a typed operator from a tokenized operation.
    ///
    /// ```
    /// use pdf_ferrite::content::{parse_content_stream, Operator};
    ///
    /// let ops = parse_content_stream(b"100 700 Td").unwrap();
    /// let op = Operator::from_operation(&ops[0]).unwrap();
    /// assert_eq!(op, Operator::Td { tx: 100.0, ty: 700.0 });
    ///
    /// let short = parse_content_stream(b"100 Td").unwrap();
    /// assert!(Operator::from_operation(&short[0]).is_err());
    /// ```
    pub fn from_operation(op: &Operation) -> Result<Operator> {
        let name = op.operator.as_str();
        let items = op.operands.as_slice();
        let args = |n: usize| Operands::take(name, items, n);

        let operator = match name {
            // Text positioning
            "Td" => {
                let a = args(2)?;
                Operator::Td {
                    tx: a.number(0)?,
                    ty: a.number(1)?,
                }
            },
            "TD" => {
                let a = args(2)?;
                Operator::TD {
                    tx: a.number(0)?,
                    ty: a.number(1)?,
                }
            },
            "Tm" => Operator::Tm(args(6)?.matrix()?),
            "T*" => Operator::TStar,

            // Text showing
            "Tj" => Operator::Tj { text: args(1)?.string(0)? },
            "TJ" => {
                let a = args(1)?;
                let array = a
                    .array(0)?
                    .iter()
                    .filter_map(|obj| match obj {
                        Object::String(s) => Some(TextElement::String(s.as_bytes().to_vec())),
                        other => other.as_number().map(TextElement::Offset),
                    })
                    .collect();
                Operator::TJ { array }
            },
            "'" => Operator::Quote { text: args(1)?.string(0)? },
            "\"" => {
                let a = args(3)?;
                Operator::DoubleQuote {
                    word_space: a.number(0)?,
                    char_space: a.number(1)?,
                    text: a.string(2)?,
                }
            },

            // Text state
            "Tc" => Operator::Tc { char_space: args(1)?.number(0)? },
            "Tw" => Operator::Tw { word_space: args(1)?.number(0)? },
            "Tz" => Operator::Tz { scale: args(1)?.number(0)? },
            "TL" => Operator::TL { leading: args(1)?.number(0)? },
            "Tf" => {
                let a = args(2)?;
                Operator::Tf {
                    font: a.name(0)?,
                    size: a.number(1)?,
                }
            },
            "Tr" => Operator::Tr { render: args(1)?.integer(0)? },
            "Ts" => Operator::Ts { rise: args(1)?.number(0)? },

            // Graphics state
            "q" => Operator::SaveState,
            "Q" => Operator::RestoreState,
            "cm" => Operator::Cm(args(6)?.matrix()?),
            "w" => Operator::SetLineWidth { width: args(1)?.number(0)? },
            "J" => Operator::SetLineCap { cap_style: args(1)?.integer(0)? },
            "j" => Operator::SetLineJoin { join_style: args(1)?.integer(0)? },
            "M" => Operator::SetMiterLimit { limit: args(1)?.number(0)? },
            "d" => {
                let a = args(2)?;
                Operator::SetDash {
                    array: a.array(0)?.iter().filter_map(Object::as_number).collect(),
                    phase: a.number(1)?,
                }
            },
            "ri" => Operator::SetRenderingIntent { intent: args(1)?.name(0)? },
            "i" => Operator::SetFlatness { tolerance: args(1)?.number(0)? },
            "gs" => Operator::SetExtGState { dict_name: args(1)?.name(0)? },

            // Color
            "G" => Operator::SetStrokeGray { gray: args(1)?.number(0)? },
            "g" => Operator::SetFillGray { gray: args(1)?.number(0)? },
            "RG" | "rg" => {
                let a = args(3)?;
                let (r, g, b) = (a.number(0)?, a.number(1)?, a.number(2)?);
                if name == "RG" {
                    Operator::SetStrokeRgb { r, g, b }
                } else {
                    Operator::SetFillRgb { r, g, b }
                }
            },
            "K" | "k" => {
                let a = args(4)?;
                let (c, m, y, k) = (a.number(0)?, a.number(1)?, a.number(2)?, a.number(3)?);
                if name == "K" {
                    Operator::SetStrokeCmyk { c, m, y, k }
                } else {
                    Operator::SetFillCmyk { c, m, y, k }
                }
            },
            "CS" => Operator::SetStrokeColorSpace { name: args(1)?.name(0)? },
            "cs" => Operator::SetFillColorSpace { name: args(1)?.name(0)? },
            "SC" => Operator::SetStrokeColor { components: color_operands(items, false).0 },
            "sc" => Operator::SetFillColor { components: color_operands(items, false).0 },
            "SCN" => {
                let (components, pattern) = color_operands(items, true);
                Operator::SetStrokeColorN { components, pattern }
            },
            "scn" => {
                let (components, pattern) = color_operands(items, true);
                Operator::SetFillColorN { components, pattern }
            },

            // Text objects
            "BT" => Operator::BeginText,
            "ET" => Operator::EndText,

            // XObjects, shadings and inline images
            "Do" => Operator::Do { name: args(1)?.name(0)? },
            "sh" => Operator::PaintShading { name: args(1)?.name(0)? },
            "BI" => match &op.inline_image {
                Some(image) => Operator::InlineImage(image.clone()),
                None => return Err(Error::interpreter("BI", "inline image without data")),
            },
            "ID" | "EI" => return Err(Error::interpreter(name, "inline image operator outside BI")),

            // Path construction
            "m" => {
                let a = args(2)?;
                Operator::MoveTo {
                    x: a.number(0)?,
                    y: a.number(1)?,
                }
            },
            "l" => {
                let a = args(2)?;
                Operator::LineTo {
                    x: a.number(0)?,
                    y: a.number(1)?,
                }
            },
            "c" => {
                let a = args(6)?;
                Operator::CurveTo {
                    x1: a.number(0)?,
                    y1: a.number(1)?,
                    x2: a.number(2)?,
                    y2: a.number(3)?,
                    x3: a.number(4)?,
                    y3: a.number(5)?,
                }
            },
            "v" => {
                let a = args(4)?;
                Operator::CurveToV {
                    x2: a.number(0)?,
                    y2: a.number(1)?,
                    x3: a.number(2)?,
                    y3: a.number(3)?,
                }
            },
            "y" => {
                let a = args(4)?;
                Operator::CurveToY {
                    x1: a.number(0)?,
                    y1: a.number(1)?,
                    x3: a.number(2)?,
                    y3: a.number(3)?,
                }
            },
            "h" => Operator::ClosePath,
            "re" => {
                let a = args(4)?;
                Operator::Rectangle {
                    x: a.number(0)?,
                    y: a.number(1)?,
                    width: a.number(2)?,
                    height: a.number(3)?,
                }
            },

            // Path painting
            "S" => Operator::Stroke,
            "s" => Operator::CloseStroke,
            "f" | "F" => Operator::Fill,
            "f*" => Operator::FillEvenOdd,
            "B" => Operator::FillStroke,
            "B*" => Operator::FillStrokeEvenOdd,
            "b" => Operator::CloseFillStroke,
            "b*" => Operator::CloseFillStrokeEvenOdd,
            "n" => Operator::EndPath,
            "W" => Operator::ClipNonZero,
            "W*" => Operator::ClipEvenOdd,

            // Marked content
            "BMC" => Operator::BeginMarkedContent { tag: args(1)?.name(0)? },
            "BDC" => {
                let a = args(2)?;
                Operator::BeginMarkedContentDict {
                    tag: a.name(0)?,
                    properties: a.items[1].clone(),
                }
            },
            "EMC" => Operator::EndMarkedContent,
            "MP" => Operator::MarkPoint { tag: args(1)?.name(0)? },
            "DP" => {
                let a = args(2)?;
                Operator::MarkPointDict {
                    tag: a.name(0)?,
                    properties: a.items[1].clone(),
                }
            },

            // Compatibility
            "BX" => Operator::BeginCompatibility,
            "EX" => Operator::EndCompatibility,

            // Type 3 glyph descriptions
            "d0" => {
                let a = args(2)?;
                Operator::SetCharWidth {
                    wx: a.number(0)?,
                    wy: a.number(1)?,
                }
            },
            "d1" => {
                let a = args(6)?;
                Operator::SetCacheDevice {
                    wx: a.number(0)?,
                    wy: a.number(1)?,
                }
            },

            _ => Operator::Other {
                name: name.to_string(),
                operands: op.operands.clone(),
            },
        };
        Ok(operator)
    }

    /// True for operators that show text.
    pub fn is_text_showing(&self) -> bool {
        matches!(
            self,
            Operator::Tj { .. } | Operator::TJ { .. } | Operator::Quote { .. } | Operator::DoubleQuote { .. }
        )
    }

    /// True for operators that paint or discard the current path.
    pub fn is_path_painting(&self) -> bool {
        matches!(
            self,
            Operator::Stroke
                | Operator::CloseStroke
                | Operator::Fill
                | Operator::FillEvenOdd
                | Operator::FillStroke
                | Operator::FillStrokeEvenOdd
                | Operator::CloseFillStroke
                | Operator::CloseFillStrokeEvenOdd
                | Operator::EndPath
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::parser::parse_content_stream;

    fn typed(content: &[u8]) -> Vec<Operator> {
        parse_content_stream(content)
            .unwrap()
            .iter()
            .map(|op| Operator::from_operation(op).unwrap())
            .collect()
    }

    #[test]
    fn test_text_operators() {
        let ops = typed(b"BT /F1 12 Tf 1 0 0 1 72 720 Tm (Hi) Tj T* ET");
        assert_eq!(ops[0], Operator::BeginText);
        assert_eq!(ops[1], Operator::Tf {
            font: Name::from("F1"),
            size: 12.0
        });
        assert_eq!(ops[2], Operator::Tm(Matrix::new(1.0, 0.0, 0.0, 1.0, 72.0, 720.0)));
        assert_eq!(ops[3], Operator::Tj { text: b"Hi".to_vec() });
        assert_eq!(ops[4], Operator::TStar);
        assert!(ops[3].is_text_showing());
    }

    #[test]
    fn test_tj_array() {
        let ops = typed(b"[(He) -50 (llo) 2.5] TJ");
        assert_eq!(ops[0], Operator::TJ {
            array: vec![
                TextElement::String(b"He".to_vec()),
                TextElement::Offset(-50.0),
                TextElement::String(b"llo".to_vec()),
                TextElement::Offset(2.5),
            ]
        });
    }

    #[test]
    fn test_operand_underflow_is_interpreter_error() {
        let ops = parse_content_stream(b"1 0 0 cm").unwrap();
        let err = Operator::from_operation(&ops[0]).unwrap_err();
        assert!(matches!(err, Error::Interpreter { ref operator, .. } if operator == "cm"));
    }

    #[test]
    fn test_wrong_operand_kind() {
        let ops = parse_content_stream(b"12 /F1 Tf").unwrap();
        assert!(matches!(Operator::from_operation(&ops[0]), Err(Error::Interpreter { .. })));
    }

    #[test]
    fn test_extra_operands_use_last() {
        let ops = typed(b"9 1 2 Td");
        assert_eq!(ops[0], Operator::Td { tx: 1.0, ty: 2.0 });
    }

    #[test]
    fn test_color_operators() {
        let ops = typed(b"0.5 g 1 0 0 RG 0 0 0 1 k /P1 scn 0.2 0.3 /P2 SCN 0.1 0.2 0.3 0.4 sc");
        assert_eq!(ops[0], Operator::SetFillGray { gray: 0.5 });
        assert_eq!(ops[1], Operator::SetStrokeRgb { r: 1.0, g: 0.0, b: 0.0 });
        assert_eq!(ops[2], Operator::SetFillCmyk { c: 0.0, m: 0.0, y: 0.0, k: 1.0 });
        assert_eq!(ops[3], Operator::SetFillColorN {
            components: vec![],
            pattern: Some(Name::from("P1"))
        });
        assert_eq!(ops[4], Operator::SetStrokeColorN {
            components: vec![0.2, 0.3],
            pattern: Some(Name::from("P2"))
        });
        assert_eq!(ops[5], Operator::SetFillColor {
            components: vec![0.1, 0.2, 0.3, 0.4]
        });
    }

    #[test]
    fn test_path_operators() {
        let ops = typed(b"10 20 m 30 40 l 1 2 3 4 5 6 c 0 0 100 50 re h f* n W*");
        assert_eq!(ops[0], Operator::MoveTo { x: 10.0, y: 20.0 });
        assert_eq!(ops[3], Operator::Rectangle {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 50.0
        });
        assert_eq!(ops[5], Operator::FillEvenOdd);
        assert!(ops[6].is_path_painting());
        assert_eq!(ops[7], Operator::ClipEvenOdd);
    }

    #[test]
    fn test_marked_content_and_unknown() {
        let ops = typed(b"/Span <</MCID 0>> BDC EMC /Tag MP BX 1 2 zz EX");
        assert!(matches!(&ops[0], Operator::BeginMarkedContentDict { tag, .. } if tag == "Span"));
        assert_eq!(ops[1], Operator::EndMarkedContent);
        assert_eq!(ops[2], Operator::MarkPoint { tag: Name::from("Tag") });
        assert_eq!(ops[3], Operator::BeginCompatibility);
        assert!(matches!(&ops[4], Operator::Other { name, operands } if name == "zz" && operands.len() == 2));
        assert_eq!(ops[5], Operator::EndCompatibility);
    }

    #[test]
    fn test_dash_and_state() {
        let ops = typed(b"q [3 2] 1 d 2 J 1 j 4 M /GS0 gs Q");
        assert_eq!(ops[0], Operator::SaveState);
        assert_eq!(ops[1], Operator::SetDash {
            array: vec![3.0, 2.0],
            phase: 1.0
        });
        assert_eq!(ops[5], Operator::SetExtGState {
            dict_name: Name::from("GS0")
        });
        assert_eq!(ops[6], Operator::RestoreState);
    }
}
