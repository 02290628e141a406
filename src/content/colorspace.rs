//! Color spaces named by `CS`/`cs` and used by the color operators.
//!
//! A color space fixes the number of operands `SC`/`sc`/`SCN`/`scn` take
//! and the initial color set when it is selected.

use std::sync::OnceLock;

use crate::document::Document;
use crate::error::{Error, Result, Warning, WarningKind};
use crate::lexer::is_whitespace;
use crate::object::{Dictionary, Name, Object};

/// Nesting limit for base and alternate spaces.
const MAX_DEPTH: usize = 8;

/// A resolved color space.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    /// DeviceGray
    DeviceGray,
    /// DeviceRGB
    DeviceRGB,
    /// DeviceCMYK
    DeviceCMYK,
    /// CalGray
    CalGray,
    /// CalRGB
    CalRGB,
    /// Lab
    Lab,
    /// ICCBased with `/N` components
    IccBased {
        /// Number of components
        components: usize,
        /// `/Alternate` space, if present
        alternate: Option<Box<ColorSpace>>,
    },
    /// Indexed: one component selecting a base color from a lookup table
    Indexed {
        /// Base color space
        base: Box<ColorSpace>,
        /// Highest valid index
        hival: u32,
        /// Packed base-space colors, `hival + 1` entries
        lookup: Vec<u8>,
    },
    /// Pattern, optionally with an underlying space for uncolored patterns
    Pattern(Option<Box<ColorSpace>>),
    /// Separation: one tint component mapped into an alternate space
    Separation {
        /// Colorant name
        colorant: Name,
        /// Alternate space
        alternate: Box<ColorSpace>,
        /// Tint transform
        tint: TintTransform,
    },
    /// DeviceN: one tint per colorant mapped into an alternate space
    DeviceN {
        /// Colorant names
        colorants: Vec<Name>,
        /// Alternate space
        alternate: Box<ColorSpace>,
        /// Tint transform
        tint: TintTransform,
    },
}

impl ColorSpace {
    /// The device, calibration-free or pattern space called `name`.
    ///
    /// ```
    /// use pdf_ferrite::content::ColorSpace;
    ///
    /// assert_eq!(ColorSpace::from_name("DeviceRGB"), Some(ColorSpace::DeviceRGB));
    /// assert_eq!(ColorSpace::from_name("G"), Some(ColorSpace::DeviceGray));
    /// assert_eq!(ColorSpace::from_name("CS0"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "DeviceGray" | "G" => ColorSpace::DeviceGray,
            "DeviceRGB" | "RGB" => ColorSpace::DeviceRGB,
            "DeviceCMYK" | "CMYK" => ColorSpace::DeviceCMYK,
            "CalGray" => ColorSpace::CalGray,
            "CalRGB" => ColorSpace::CalRGB,
            "Lab" => ColorSpace::Lab,
            "Pattern" => ColorSpace::Pattern(None),
            _ => return None,
        })
    }

    /// Resolve a color space object: a name or an array such as
    /// `[/ICCBased 5 0 R]`. Named resource lookup is the caller's job.
    pub fn resolve(doc: &mut Document, object: &Object) -> Result<Self> {
        Self::resolve_at(doc, object, 0)
    }

    fn resolve_at(doc: &mut Document, object: &Object, depth: usize) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(Error::Resolve("color space nesting too deep".to_string()));
        }
        let object = doc.resolve_object(object)?;
        match &object {
            Object::Name(name) => Self::from_name(&name.to_string_lossy())
                .ok_or_else(|| Error::Resolve(format!("unknown color space /{}", name))),
            Object::Array(items) => Self::resolve_array(doc, items, depth),
            other => Err(Error::InvalidObjectType {
                expected: "Name or Array".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    fn resolve_array(doc: &mut Document, items: &[Object], depth: usize) -> Result<Self> {
        let family = items
            .first()
            .and_then(Object::as_name_str)
            .ok_or_else(|| Error::Resolve("color space array without a family name".to_string()))?;
        let operand = |i: usize| items.get(i).cloned().unwrap_or(Object::Null);

        match family {
            "ICCBased" => {
                let stream = doc.resolve_object(&operand(1))?;
                let dict = stream.as_stream().map(|s| s.dict.clone()).unwrap_or_default();
                let alternate = match dict.get("Alternate") {
                    Some(alt) => Some(Box::new(Self::resolve_at(doc, alt, depth + 1)?)),
                    None => None,
                };
                let components = dict
                    .get_integer("N")
                    .map(|n| n.clamp(1, 32) as usize)
                    .or_else(|| alternate.as_ref().map(|a| a.components()))
                    .unwrap_or(3);
                Ok(ColorSpace::IccBased { components, alternate })
            },
            "Indexed" | "I" => {
                let base = Self::resolve_at(doc, &operand(1), depth + 1)?;
                let hival = doc.resolve_object(&operand(2))?.as_integer().unwrap_or(0).clamp(0, 255) as u32;
                let lookup = match doc.resolve_object(&operand(3))? {
                    Object::String(s) => s.as_bytes().to_vec(),
                    Object::Stream(s) => doc.decode_stream(&s)?.to_vec(),
                    _ => Vec::new(),
                };
                Ok(ColorSpace::Indexed {
                    base: Box::new(base),
                    hival,
                    lookup,
                })
            },
            "Pattern" => {
                let underlying = match items.get(1) {
                    Some(base) => Some(Box::new(Self::resolve_at(doc, base, depth + 1)?)),
                    None => None,
                };
                Ok(ColorSpace::Pattern(underlying))
            },
            "Separation" => {
                let colorant = operand(1).as_name().cloned().unwrap_or_else(|| Name::from("None"));
                let alternate = Self::resolve_at(doc, &operand(2), depth + 1)?;
                let tint = TintTransform::resolve(doc, &operand(3))?;
                Ok(ColorSpace::Separation {
                    colorant,
                    alternate: Box::new(alternate),
                    tint,
                })
            },
            "DeviceN" => {
                let colorants = doc
                    .resolve_object(&operand(1))?
                    .as_array()
                    .map(|names| names.iter().filter_map(|n| n.as_name().cloned()).collect())
                    .unwrap_or_default();
                let alternate = Self::resolve_at(doc, &operand(2), depth + 1)?;
                let tint = TintTransform::resolve(doc, &operand(3))?;
                Ok(ColorSpace::DeviceN {
                    colorants,
                    alternate: Box::new(alternate),
                    tint,
                })
            },
            name => Self::from_name(name).ok_or_else(|| Error::Resolve(format!("unknown color space family /{}", name))),
        }
    }

    /// Family name as written in PDF.
    pub fn family(&self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRGB => "DeviceRGB",
            ColorSpace::DeviceCMYK => "DeviceCMYK",
            ColorSpace::CalGray => "CalGray",
            ColorSpace::CalRGB => "CalRGB",
            ColorSpace::Lab => "Lab",
            ColorSpace::IccBased { .. } => "ICCBased",
            ColorSpace::Indexed { .. } => "Indexed",
            ColorSpace::Pattern(_) => "Pattern",
            ColorSpace::Separation { .. } => "Separation",
            ColorSpace::DeviceN { .. } => "DeviceN",
        }
    }

    /// Number of color components an `SC`/`sc` operation takes. For a
    /// Pattern space this counts the underlying space only.
    pub fn components(&self) -> usize {
        match self {
            ColorSpace::DeviceGray | ColorSpace::CalGray => 1,
            ColorSpace::DeviceRGB | ColorSpace::CalRGB | ColorSpace::Lab => 3,
            ColorSpace::DeviceCMYK => 4,
            ColorSpace::IccBased { components, .. } => *components,
            ColorSpace::Indexed { .. } | ColorSpace::Separation { .. } => 1,
            ColorSpace::Pattern(base) => base.as_ref().map_or(0, |b| b.components()),
            ColorSpace::DeviceN { colorants, .. } => colorants.len(),
        }
    }

    /// Color set when this space is selected with `CS`/`cs`.
    pub fn initial_color(&self) -> Vec<f64> {
        match self {
            ColorSpace::DeviceCMYK => vec![0.0, 0.0, 0.0, 1.0],
            ColorSpace::Separation { .. } => vec![1.0],
            ColorSpace::DeviceN { colorants, .. } => vec![1.0; colorants.len()],
            ColorSpace::Pattern(_) => Vec::new(),
            other => vec![0.0; other.components()],
        }
    }

    /// True for the Pattern family.
    pub fn is_pattern(&self) -> bool {
        matches!(self, ColorSpace::Pattern(_))
    }

    /// Base-space components for an Indexed color.
    pub fn lookup_index(&self, index: f64) -> Option<Vec<f64>> {
        let ColorSpace::Indexed { base, hival, lookup } = self else {
            return None;
        };
        let n = base.components();
        let i = (index.round().max(0.0) as usize).min(*hival as usize);
        let entry = lookup.get(i * n..(i + 1) * n)?;
        Some(entry.iter().map(|&b| f64::from(b) / 255.0).collect())
    }

    /// Components in the alternate space for Separation and DeviceN colors.
    pub fn alternate_components(&self, components: &[f64]) -> Option<Vec<f64>> {
        match self {
            ColorSpace::Separation { alternate, tint, .. } | ColorSpace::DeviceN { alternate, tint, .. } => {
                let mut out = tint.evaluate(components);
                out.resize(alternate.components(), out.last().copied().unwrap_or(0.0));
                Some(out)
            },
            _ => None,
        }
    }
}

/// The function kinds a tint transform is evaluated with.
#[derive(Debug, Clone, PartialEq)]
pub enum TintFunction {
    /// Type 0 sample table, interpolated multilinearly
    Sampled(SampledFunction),
    /// Type 2 exponential interpolation between `c0` and `c1`
    Exponential {
        /// Output at input 0
        c0: Vec<f64>,
        /// Output at input 1
        c1: Vec<f64>,
        /// Exponent
        n: f64,
    },
    /// Type 3 stitching of one-input functions over adjacent subdomains
    Stitching {
        /// Input domain
        domain: (f64, f64),
        /// One function per subdomain
        functions: Vec<TintFunction>,
        /// Subdomain boundaries, one fewer than `functions`
        bounds: Vec<f64>,
        /// Range each subdomain is mapped onto before calling its function
        encode: Vec<(f64, f64)>,
    },
    /// Type 4 PostScript calculator program
    PostScript(CalculatorProgram),
    /// Inputs pass through unchanged
    Identity,
}

impl TintFunction {
    /// Read a function dictionary or stream.
    ///
    /// Returns `Ok(None)` for function objects that cannot be evaluated:
    /// unknown types, missing required entries, or a program that does not
    /// parse.
    pub fn parse(doc: &mut Document, object: &Object) -> Result<Option<Self>> {
        Self::parse_at(doc, object, 0)
    }

    fn parse_at(doc: &mut Document, object: &Object, depth: usize) -> Result<Option<Self>> {
        if depth > MAX_DEPTH {
            return Err(Error::Resolve("function nesting too deep".to_string()));
        }
        let object = doc.resolve_object(object)?;
        let (dict, stream) = match &object {
            Object::Dictionary(d) => (d, None),
            Object::Stream(s) => (&s.dict, Some(s)),
            _ => return Ok(None),
        };
        let numbers = |key: &str, default: Vec<f64>| {
            dict.get(key)
                .and_then(Object::as_array)
                .map(|a| a.iter().filter_map(Object::as_number).collect())
                .unwrap_or(default)
        };

        let function = match dict.get_integer("FunctionType") {
            Some(0) => {
                let Some(stream) = stream else { return Ok(None) };
                let samples = doc.decode_stream(stream)?;
                SampledFunction::new(dict, &samples).map(TintFunction::Sampled)
            },
            Some(2) => Some(TintFunction::Exponential {
                c0: numbers("C0", vec![0.0]),
                c1: numbers("C1", vec![1.0]),
                n: dict.get_number("N").unwrap_or(1.0),
            }),
            Some(3) => {
                let domain = pairs(dict, "Domain")
                    .and_then(|d| d.first().copied())
                    .unwrap_or((0.0, 1.0));
                let children = match dict.get("Functions") {
                    Some(f) => doc.resolve_object(f)?,
                    None => return Ok(None),
                };
                let Some(children) = children.as_array() else { return Ok(None) };
                let mut functions = Vec::with_capacity(children.len());
                for child in children {
                    match Self::parse_at(doc, child, depth + 1)? {
                        Some(f) => functions.push(f),
                        None => return Ok(None),
                    }
                }
                let bounds = numbers("Bounds", Vec::new());
                let encode = pairs(dict, "Encode").unwrap_or_else(|| vec![(0.0, 1.0); functions.len()]);
                if functions.is_empty() || bounds.len() + 1 != functions.len() || encode.len() < functions.len() {
                    None
                } else {
                    Some(TintFunction::Stitching {
                        domain,
                        functions,
                        bounds,
                        encode,
                    })
                }
            },
            Some(4) => {
                let Some(stream) = stream else { return Ok(None) };
                let code = doc.decode_stream(stream)?;
                CalculatorProgram::parse(
                    &code,
                    pairs(dict, "Domain").unwrap_or_default(),
                    pairs(dict, "Range").unwrap_or_default(),
                )
                .map(TintFunction::PostScript)
            },
            _ => None,
        };
        Ok(function)
    }

    /// Evaluate the function for `input`.
    pub fn evaluate(&self, input: &[f64]) -> Vec<f64> {
        match self {
            TintFunction::Sampled(f) => f.evaluate(input),
            TintFunction::Exponential { c0, c1, n } => {
                let x = input.first().copied().unwrap_or(0.0).clamp(0.0, 1.0);
                let t = x.powf(*n);
                c0.iter().zip(c1).map(|(a, b)| a + t * (b - a)).collect()
            },
            TintFunction::Stitching {
                domain,
                functions,
                bounds,
                encode,
            } => {
                let x = input
                    .first()
                    .copied()
                    .unwrap_or(domain.0)
                    .clamp(domain.0.min(domain.1), domain.0.max(domain.1));
                // Subdomain k covers [bounds[k-1], bounds[k]); the last one is closed
                let k = bounds.iter().take_while(|b| x >= **b).count();
                let low = if k == 0 { domain.0 } else { bounds[k - 1] };
                let high = bounds.get(k).copied().unwrap_or(domain.1);
                match (functions.get(k), encode.get(k)) {
                    (Some(function), Some(&(e0, e1))) => function.evaluate(&[interpolate(x, low, high, e0, e1)]),
                    _ => input.to_vec(),
                }
            },
            TintFunction::PostScript(program) => program.evaluate(input),
            TintFunction::Identity => input.to_vec(),
        }
    }
}

/// Linear map of `x` from `[x0, x1]` onto `[y0, y1]`.
fn interpolate(x: f64, x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    if x1 == x0 {
        y0
    } else {
        y0 + (x - x0) * (y1 - y0) / (x1 - x0)
    }
}

/// `[a0 b0 a1 b1 ...]` as `(a, b)` pairs.
fn pairs(dict: &Dictionary, key: &str) -> Option<Vec<(f64, f64)>> {
    let numbers: Vec<f64> = dict
        .get(key)?
        .as_array()?
        .iter()
        .filter_map(Object::as_number)
        .collect();
    Some(numbers.chunks_exact(2).map(|p| (p[0], p[1])).collect())
}

fn clamp_to(x: f64, (a, b): (f64, f64)) -> f64 {
    x.clamp(a.min(b), a.max(b))
}

/// A Type 0 function: a table of `Size[0] × … × Size[m-1]` samples, each
/// with one value per output.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledFunction {
    domain: Vec<(f64, f64)>,
    range: Vec<(f64, f64)>,
    size: Vec<usize>,
    bits: u32,
    encode: Vec<(f64, f64)>,
    decode: Vec<(f64, f64)>,
    samples: Vec<u32>,
}

impl SampledFunction {
    /// Inputs beyond this would need `2^m` corner lookups per evaluation.
    const MAX_INPUTS: usize = 8;

    fn new(dict: &Dictionary, data: &[u8]) -> Option<Self> {
        let domain = pairs(dict, "Domain")?;
        let range = pairs(dict, "Range")?;
        let size: Vec<usize> = dict
            .get("Size")?
            .as_array()?
            .iter()
            .map(|o| o.as_integer().filter(|n| (1..=65_536).contains(n)).map(|n| n as usize))
            .collect::<Option<_>>()?;
        if size.is_empty() || size.len() != domain.len() || size.len() > Self::MAX_INPUTS || range.is_empty() {
            return None;
        }
        let bits = dict
            .get_integer("BitsPerSample")
            .filter(|b| matches!(*b, 1 | 2 | 4 | 8 | 12 | 16 | 24 | 32))? as u32;
        let encode = pairs(dict, "Encode")
            .filter(|e| e.len() == size.len())
            .unwrap_or_else(|| size.iter().map(|s| (0.0, (*s - 1) as f64)).collect());
        let decode = pairs(dict, "Decode")
            .filter(|d| d.len() == range.len())
            .unwrap_or_else(|| range.clone());

        let total = size.iter().try_fold(range.len(), |acc, s| acc.checked_mul(*s))?;
        let samples = read_samples(data, bits, total);
        if samples.len() < total {
            log::debug!("Sampled function has {} of {} samples", samples.len(), total);
            return None;
        }
        Some(Self {
            domain,
            range,
            size,
            bits,
            encode,
            decode,
            samples,
        })
    }

    fn evaluate(&self, input: &[f64]) -> Vec<f64> {
        let outputs = self.range.len();
        let coords: Vec<f64> = self
            .domain
            .iter()
            .zip(&self.encode)
            .zip(&self.size)
            .enumerate()
            .map(|(i, ((&domain, &(e0, e1)), &size))| {
                let x = clamp_to(input.get(i).copied().unwrap_or(domain.0), domain);
                interpolate(x, domain.0, domain.1, e0, e1).clamp(0.0, (size - 1) as f64)
            })
            .collect();

        // Weighted sum over the 2^m corners of the enclosing cell
        let mut acc = vec![0.0; outputs];
        for corner in 0..(1usize << coords.len()) {
            let mut weight = 1.0;
            let mut index = 0;
            let mut stride = 1;
            for (i, (&c, &size)) in coords.iter().zip(&self.size).enumerate() {
                let lower = c.floor();
                let frac = c - lower;
                let upper = (corner >> i) & 1 == 1;
                let position = if upper { (lower as usize + 1).min(size - 1) } else { lower as usize };
                weight *= if upper { frac } else { 1.0 - frac };
                index += position * stride;
                stride *= size;
            }
            if weight == 0.0 {
                continue;
            }
            for (j, value) in acc.iter_mut().enumerate() {
                *value += weight * f64::from(self.samples[index * outputs + j]);
            }
        }

        let max_sample = ((1u64 << self.bits) - 1) as f64;
        acc.iter()
            .zip(&self.decode)
            .zip(&self.range)
            .map(|((&s, &(d0, d1)), &range)| clamp_to(interpolate(s, 0.0, max_sample, d0, d1), range))
            .collect()
    }
}

/// Read `count` big-endian samples of `bits` bits each.
fn read_samples(data: &[u8], bits: u32, count: usize) -> Vec<u32> {
    let mut out = Vec::with_capacity(count.min(data.len() * 8));
    let mut acc: u64 = 0;
    let mut held = 0u32;
    for &byte in data {
        if out.len() == count {
            break;
        }
        acc = (acc << 8) | u64::from(byte);
        held += 8;
        while held >= bits && out.len() < count {
            held -= bits;
            out.push(((acc >> held) & ((1u64 << bits) - 1)) as u32);
        }
        acc &= (1u64 << held) - 1;
    }
    out
}

/// A parsed Type 4 program.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatorProgram {
    ops: Vec<CalcOp>,
    domain: Vec<(f64, f64)>,
    range: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
enum CalcOp {
    Number(f64),
    Bool(bool),
    Operator(CalcOperator),
    If(Vec<CalcOp>),
    IfElse(Vec<CalcOp>, Vec<CalcOp>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CalcOperator {
    Abs,
    Add,
    Atan,
    Ceiling,
    Cos,
    Cvi,
    Cvr,
    Div,
    Exp,
    Floor,
    Idiv,
    Ln,
    Log,
    Mod,
    Mul,
    Neg,
    Round,
    Sin,
    Sqrt,
    Sub,
    Truncate,
    And,
    Bitshift,
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
    Ne,
    Not,
    Or,
    Xor,
    Copy,
    Dup,
    Exch,
    Index,
    Pop,
    Roll,
}

impl CalcOperator {
    fn from_name(name: &[u8]) -> Option<Self> {
        use CalcOperator::*;
        Some(match name {
            b"abs" => Abs,
            b"add" => Add,
            b"atan" => Atan,
            b"ceiling" => Ceiling,
            b"cos" => Cos,
            b"cvi" => Cvi,
            b"cvr" => Cvr,
            b"div" => Div,
            b"exp" => Exp,
            b"floor" => Floor,
            b"idiv" => Idiv,
            b"ln" => Ln,
            b"log" => Log,
            b"mod" => Mod,
            b"mul" => Mul,
            b"neg" => Neg,
            b"round" => Round,
            b"sin" => Sin,
            b"sqrt" => Sqrt,
            b"sub" => Sub,
            b"truncate" => Truncate,
            b"and" => And,
            b"bitshift" => Bitshift,
            b"eq" => Eq,
            b"ge" => Ge,
            b"gt" => Gt,
            b"le" => Le,
            b"lt" => Lt,
            b"ne" => Ne,
            b"not" => Not,
            b"or" => Or,
            b"xor" => Xor,
            b"copy" => Copy,
            b"dup" => Dup,
            b"exch" => Exch,
            b"index" => Index,
            b"pop" => Pop,
            b"roll" => Roll,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CalcValue {
    Number(f64),
    Bool(bool),
}

impl CalculatorProgram {
    const MAX_STACK: usize = 100;
    const MAX_NESTING: usize = 32;

    /// Parse `{ ... }` program text.
    fn parse(code: &[u8], domain: Vec<(f64, f64)>, range: Vec<(f64, f64)>) -> Option<Self> {
        let tokens = calculator_tokens(code);
        let mut tokens = tokens.iter().copied();
        if tokens.next()? != b"{" {
            return None;
        }
        let ops = parse_block(&mut tokens, 0)?;
        if range.is_empty() {
            return None;
        }
        Some(Self { ops, domain, range })
    }

    fn evaluate(&self, input: &[f64]) -> Vec<f64> {
        let mut stack: Vec<CalcValue> = input
            .iter()
            .enumerate()
            .map(|(i, &x)| CalcValue::Number(self.domain.get(i).map_or(x, |&d| clamp_to(x, d))))
            .collect();
        let outputs = self.range.len();
        let result = execute(&self.ops, &mut stack).and_then(|()| {
            let start = stack.len().checked_sub(outputs)?;
            stack[start..]
                .iter()
                .zip(&self.range)
                .map(|(value, &range)| match value {
                    CalcValue::Number(n) => Some(clamp_to(*n, range)),
                    CalcValue::Bool(_) => None,
                })
                .collect::<Option<Vec<f64>>>()
        });
        result.unwrap_or_else(|| {
            log::warn!("PostScript function failed; using range minimums");
            self.range.iter().map(|r| r.0.min(r.1)).collect()
        })
    }
}

fn calculator_tokens(code: &[u8]) -> Vec<&[u8]> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < code.len() {
        match code[i] {
            b'{' | b'}' => {
                tokens.push(&code[i..i + 1]);
                i += 1;
            },
            b'%' => {
                while i < code.len() && code[i] != b'\n' && code[i] != b'\r' {
                    i += 1;
                }
            },
            c if is_whitespace(c) => i += 1,
            _ => {
                let start = i;
                while i < code.len() && !is_whitespace(code[i]) && !matches!(code[i], b'{' | b'}' | b'%') {
                    i += 1;
                }
                tokens.push(&code[start..i]);
            },
        }
    }
    tokens
}

/// Parse up to the `}` closing a block whose `{` was already consumed.
fn parse_block<'a>(tokens: &mut impl Iterator<Item = &'a [u8]>, depth: usize) -> Option<Vec<CalcOp>> {
    if depth > CalculatorProgram::MAX_NESTING {
        return None;
    }
    let mut ops = Vec::new();
    loop {
        match tokens.next()? {
            b"}" => return Some(ops),
            b"{" => {
                let first = parse_block(tokens, depth + 1)?;
                match tokens.next()? {
                    b"if" => ops.push(CalcOp::If(first)),
                    b"{" => {
                        let second = parse_block(tokens, depth + 1)?;
                        if tokens.next()? != b"ifelse" {
                            return None;
                        }
                        ops.push(CalcOp::IfElse(first, second));
                    },
                    _ => return None,
                }
            },
            b"true" => ops.push(CalcOp::Bool(true)),
            b"false" => ops.push(CalcOp::Bool(false)),
            word => match CalcOperator::from_name(word) {
                Some(op) => ops.push(CalcOp::Operator(op)),
                None => {
                    let n = std::str::from_utf8(word).ok()?.parse::<f64>().ok().filter(|n| n.is_finite())?;
                    ops.push(CalcOp::Number(n));
                },
            },
        }
    }
}

fn execute(ops: &[CalcOp], stack: &mut Vec<CalcValue>) -> Option<()> {
    for op in ops {
        match op {
            CalcOp::Number(n) => stack.push(CalcValue::Number(*n)),
            CalcOp::Bool(b) => stack.push(CalcValue::Bool(*b)),
            CalcOp::If(then) => {
                if pop_bool(stack)? {
                    execute(then, stack)?;
                }
            },
            CalcOp::IfElse(then, otherwise) => {
                if pop_bool(stack)? {
                    execute(then, stack)?;
                } else {
                    execute(otherwise, stack)?;
                }
            },
            CalcOp::Operator(op) => apply(*op, stack)?,
        }
        if stack.len() > CalculatorProgram::MAX_STACK {
            return None;
        }
    }
    Some(())
}

fn pop_number(stack: &mut Vec<CalcValue>) -> Option<f64> {
    match stack.pop()? {
        CalcValue::Number(n) => Some(n),
        CalcValue::Bool(_) => None,
    }
}

fn pop_bool(stack: &mut Vec<CalcValue>) -> Option<bool> {
    match stack.pop()? {
        CalcValue::Bool(b) => Some(b),
        CalcValue::Number(_) => None,
    }
}

fn apply(op: CalcOperator, stack: &mut Vec<CalcValue>) -> Option<()> {
    use CalcOperator::*;
    match op {
        Dup => {
            let top = *stack.last()?;
            stack.push(top);
        },
        Pop => {
            stack.pop()?;
        },
        Exch => {
            let b = stack.pop()?;
            let a = stack.pop()?;
            stack.push(b);
            stack.push(a);
        },
        Copy => {
            let n = pop_number(stack)?.max(0.0) as usize;
            let start = stack.len().checked_sub(n)?;
            stack.extend_from_within(start..);
        },
        Index => {
            let n = pop_number(stack)?.max(0.0) as usize;
            let at = stack.len().checked_sub(n + 1)?;
            let value = stack[at];
            stack.push(value);
        },
        Roll => {
            let j = pop_number(stack)? as i64;
            let n = pop_number(stack)?.max(0.0) as usize;
            let start = stack.len().checked_sub(n)?;
            if n > 0 {
                stack[start..].rotate_right(j.rem_euclid(n as i64) as usize);
            }
        },
        Eq | Ne => {
            let b = stack.pop()?;
            let a = stack.pop()?;
            stack.push(CalcValue::Bool((a == b) == (op == Eq)));
        },
        Ge | Gt | Le | Lt => {
            let b = pop_number(stack)?;
            let a = pop_number(stack)?;
            let holds = match op {
                Ge => a >= b,
                Gt => a > b,
                Le => a <= b,
                _ => a < b,
            };
            stack.push(CalcValue::Bool(holds));
        },
        And | Or | Xor => {
            let b = stack.pop()?;
            let a = stack.pop()?;
            let value = match (a, b) {
                (CalcValue::Bool(x), CalcValue::Bool(y)) => CalcValue::Bool(match op {
                    And => x && y,
                    Or => x || y,
                    _ => x ^ y,
                }),
                (CalcValue::Number(x), CalcValue::Number(y)) => {
                    let (x, y) = (x as i64, y as i64);
                    CalcValue::Number(match op {
                        And => x & y,
                        Or => x | y,
                        _ => x ^ y,
                    } as f64)
                },
                _ => return None,
            };
            stack.push(value);
        },
        Not => {
            let value = match stack.pop()? {
                CalcValue::Bool(b) => CalcValue::Bool(!b),
                CalcValue::Number(n) => CalcValue::Number(!(n as i64) as f64),
            };
            stack.push(value);
        },
        Add | Sub | Mul | Div | Idiv | Mod | Exp | Atan | Bitshift => {
            let b = pop_number(stack)?;
            let a = pop_number(stack)?;
            let value = match op {
                Add => a + b,
                Sub => a - b,
                Mul => a * b,
                Div if b != 0.0 => a / b,
                Idiv | Mod => {
                    let (x, y) = (a as i64, b as i64);
                    if y == 0 {
                        return None;
                    }
                    if op == Idiv {
                        x.wrapping_div(y) as f64
                    } else {
                        x.wrapping_rem(y) as f64
                    }
                },
                Exp => a.powf(b),
                Atan => {
                    let degrees = a.atan2(b).to_degrees();
                    if degrees < 0.0 {
                        degrees + 360.0
                    } else {
                        degrees
                    }
                },
                Bitshift => {
                    let (x, shift) = (a as i64, (b as i64).clamp(-63, 63));
                    if shift >= 0 {
                        (x << shift) as f64
                    } else {
                        (x >> -shift) as f64
                    }
                },
                _ => return None,
            };
            stack.push(CalcValue::Number(value));
        },
        Abs | Ceiling | Cos | Cvi | Cvr | Floor | Ln | Log | Neg | Round | Sin | Sqrt | Truncate => {
            let x = pop_number(stack)?;
            let value = match op {
                Abs => x.abs(),
                Ceiling => x.ceil(),
                Cos => x.to_radians().cos(),
                Cvi | Truncate => x.trunc(),
                Floor => x.floor(),
                Ln => x.ln(),
                Log => x.log10(),
                Neg => -x,
                Round => (x + 0.5).floor(),
                Sin => x.to_radians().sin(),
                Sqrt => x.sqrt(),
                _ => x,
            };
            stack.push(CalcValue::Number(value));
        },
    }
    Some(())
}

/// Tint transform of a Separation or DeviceN space.
///
/// The first evaluation is cached and returned for every later input,
/// whatever that input is. Callers that need the tint of several distinct
/// values must resolve a fresh color space per value.
#[derive(Debug, Clone)]
pub struct TintTransform {
    function: TintFunction,
    cached: OnceLock<Vec<f64>>,
}

impl PartialEq for TintTransform {
    fn eq(&self, other: &Self) -> bool {
        self.function == other.function
    }
}

impl TintTransform {
    /// Wrap a function.
    pub fn new(function: TintFunction) -> Self {
        Self {
            function,
            cached: OnceLock::new(),
        }
    }

    /// Read a function dictionary or stream. A function that cannot be
    /// evaluated becomes [`TintFunction::Identity`] with an
    /// [`WarningKind::UnsupportedFunction`] warning.
    pub fn resolve(doc: &mut Document, object: &Object) -> Result<Self> {
        let function = match TintFunction::parse(doc, object)? {
            Some(function) => function,
            None => {
                doc.report(Warning::new(
                    WarningKind::UnsupportedFunction,
                    "tint transform cannot be evaluated; components pass through unchanged",
                ));
                TintFunction::Identity
            },
        };
        Ok(Self::new(function))
    }

    /// The function.
    pub fn function(&self) -> &TintFunction {
        &self.function
    }

    /// Evaluate, returning the first result ever computed.
    pub fn evaluate(&self, input: &[f64]) -> Vec<f64> {
        self.cached.get_or_init(|| self.function.evaluate(input)).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;
    use crate::object::{PdfString, Stream};

    #[test]
    fn test_device_arity() {
        assert_eq!(ColorSpace::DeviceGray.components(), 1);
        assert_eq!(ColorSpace::DeviceRGB.components(), 3);
        assert_eq!(ColorSpace::DeviceCMYK.components(), 4);
        assert_eq!(ColorSpace::DeviceCMYK.initial_color(), vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(ColorSpace::Pattern(None).components(), 0);
    }

    #[test]
    fn test_resolve_icc_by_n() {
        let mut doc = Document::new();
        let icc = doc.add_object(Object::Stream(Stream::new(dict! { "N" => 4 }, Vec::new()))).unwrap();
        let cs = ColorSpace::resolve(&mut doc, &Object::Array(vec![Object::from("ICCBased"), Object::Reference(icc)]))
            .unwrap();
        assert_eq!(cs.components(), 4);
        assert_eq!(cs.family(), "ICCBased");
    }

    #[test]
    fn test_resolve_indexed_lookup() {
        let mut doc = Document::new();
        let cs = ColorSpace::resolve(
            &mut doc,
            &Object::Array(vec![
                Object::from("Indexed"),
                Object::from("DeviceRGB"),
                Object::Integer(1),
                Object::String(PdfString::hex(vec![255, 0, 0, 0, 0, 255])),
            ]),
        )
        .unwrap();
        assert_eq!(cs.components(), 1);
        assert_eq!(cs.lookup_index(1.0), Some(vec![0.0, 0.0, 1.0]));
        assert_eq!(cs.lookup_index(9.0), Some(vec![0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_separation_caches_first_tint() {
        let mut doc = Document::new();
        let function = dict! {
            "FunctionType" => 2,
            "Domain" => vec![Object::Integer(0), Object::Integer(1)],
            "C0" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(0), Object::Integer(0)],
            "C1" => vec![Object::Integer(1), Object::Integer(0), Object::Integer(0), Object::Integer(0)],
            "N" => 1,
        };
        let cs = ColorSpace::resolve(
            &mut doc,
            &Object::Array(vec![
                Object::from("Separation"),
                Object::from("Spot"),
                Object::from("DeviceCMYK"),
                Object::Dictionary(function),
            ]),
        )
        .unwrap();
        assert_eq!(cs.initial_color(), vec![1.0]);
        assert_eq!(cs.alternate_components(&[0.5]), Some(vec![0.5, 0.0, 0.0, 0.0]));
        // Later inputs return the first result.
        assert_eq!(cs.alternate_components(&[1.0]), Some(vec![0.5, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_devicen_identity_fallback() {
        let mut doc = Document::new();
        let cs = ColorSpace::resolve(
            &mut doc,
            &Object::Array(vec![
                Object::from("DeviceN"),
                Object::Array(vec![Object::from("Cyan"), Object::from("Magenta")]),
                Object::from("DeviceRGB"),
                Object::Dictionary(dict! { "FunctionType" => 4 }),
            ]),
        )
        .unwrap();
        assert_eq!(cs.components(), 2);
        assert_eq!(cs.alternate_components(&[0.2, 0.4]), Some(vec![0.2, 0.4, 0.4]));
        assert!(doc.warnings().iter().any(|w| w.kind == WarningKind::UnsupportedFunction));
    }

    fn numbers(values: &[f64]) -> Object {
        Object::Array(values.iter().map(|v| Object::from(*v)).collect())
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{:?}", actual);
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{:?} != {:?}", actual, expected);
        }
    }

    fn calculator(doc: &mut Document, code: &str, outputs: usize) -> TintFunction {
        let stream = Stream::new(
            dict! {
                "FunctionType" => 4,
                "Domain" => numbers(&[0.0, 1.0]),
                "Range" => numbers(&[0.0, 10.0].repeat(outputs)),
            },
            code.as_bytes().to_vec(),
        );
        TintFunction::parse(doc, &Object::Stream(stream)).unwrap().unwrap()
    }

    #[test]
    fn test_sampled_function_interpolates() {
        let mut doc = Document::new();
        let stream = Stream::new(
            dict! {
                "FunctionType" => 0,
                "Domain" => numbers(&[0.0, 1.0]),
                "Range" => numbers(&[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]),
                "Size" => vec![Object::Integer(2)],
                "BitsPerSample" => 8,
            },
            vec![0, 0, 0, 0, 255, 128, 0, 0],
        );
        let function = TintFunction::parse(&mut doc, &Object::Stream(stream)).unwrap().unwrap();
        assert!(matches!(function, TintFunction::Sampled(_)));
        assert_close(&function.evaluate(&[0.5]), &[0.5, 64.0 / 255.0, 0.0, 0.0]);
        assert_close(&function.evaluate(&[1.0]), &[1.0, 128.0 / 255.0, 0.0, 0.0]);
        assert_close(&function.evaluate(&[2.0]), &[1.0, 128.0 / 255.0, 0.0, 0.0]);
    }

    #[test]
    fn test_sampled_function_short_table_is_unsupported() {
        let mut doc = Document::new();
        let stream = Stream::new(
            dict! {
                "FunctionType" => 0,
                "Domain" => numbers(&[0.0, 1.0]),
                "Range" => numbers(&[0.0, 1.0]),
                "Size" => vec![Object::Integer(4)],
                "BitsPerSample" => 8,
            },
            vec![0, 255],
        );
        assert_eq!(TintFunction::parse(&mut doc, &Object::Stream(stream)).unwrap(), None);
    }

    #[test]
    fn test_stitching_function_selects_subdomain() {
        let mut doc = Document::new();
        let rising = doc
            .add_object(Object::Dictionary(dict! {
                "FunctionType" => 2,
                "Domain" => numbers(&[0.0, 1.0]),
                "C0" => numbers(&[0.0]),
                "C1" => numbers(&[1.0]),
                "N" => 1,
            }))
            .unwrap();
        let falling = dict! {
            "FunctionType" => 2,
            "Domain" => numbers(&[0.0, 1.0]),
            "C0" => numbers(&[1.0]),
            "C1" => numbers(&[0.0]),
            "N" => 1,
        };
        let stitching = dict! {
            "FunctionType" => 3,
            "Domain" => numbers(&[0.0, 1.0]),
            "Functions" => vec![Object::Reference(rising), Object::Dictionary(falling)],
            "Bounds" => numbers(&[0.5]),
            "Encode" => numbers(&[0.0, 1.0, 0.0, 1.0]),
        };
        let function = TintFunction::parse(&mut doc, &Object::Dictionary(stitching)).unwrap().unwrap();
        assert_close(&function.evaluate(&[0.25]), &[0.5]);
        assert_close(&function.evaluate(&[0.5]), &[1.0]);
        assert_close(&function.evaluate(&[1.0]), &[0.0]);
    }

    #[test]
    fn test_stitching_with_unsupported_child_is_unsupported() {
        let mut doc = Document::new();
        let stitching = dict! {
            "FunctionType" => 3,
            "Domain" => numbers(&[0.0, 1.0]),
            "Functions" => vec![Object::Dictionary(dict! { "FunctionType" => 7 })],
            "Encode" => numbers(&[0.0, 1.0]),
        };
        assert_eq!(TintFunction::parse(&mut doc, &Object::Dictionary(stitching)).unwrap(), None);
    }

    #[test]
    fn test_calculator_stack_operators() {
        let mut doc = Document::new();
        let function = calculator(&mut doc, "{ dup 0.5 mul exch 0 exch 0 }", 4);
        assert_close(&function.evaluate(&[0.8]), &[0.4, 0.0, 0.8, 0.0]);

        let function = calculator(&mut doc, "{ pop 1 2 3 3 1 roll } % rotate", 3);
        assert_close(&function.evaluate(&[0.0]), &[3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_calculator_conditionals() {
        let mut doc = Document::new();
        let function = calculator(&mut doc, "{ 0.5 gt { 1 } { 0 } ifelse }", 1);
        assert_close(&function.evaluate(&[0.75]), &[1.0]);
        assert_close(&function.evaluate(&[0.25]), &[0.0]);

        let function = calculator(&mut doc, "{ dup 0.5 lt { pop 9 } if }", 1);
        assert_close(&function.evaluate(&[0.25]), &[9.0]);
        assert_close(&function.evaluate(&[0.75]), &[0.75]);
    }

    #[test]
    fn test_calculator_output_is_clamped_to_range() {
        let mut doc = Document::new();
        let function = calculator(&mut doc, "{ 100 mul 90 sin add }", 1);
        assert_close(&function.evaluate(&[0.05]), &[6.0]);
        assert_close(&function.evaluate(&[1.0]), &[10.0]);
    }

    #[test]
    fn test_calculator_rejects_unknown_operator() {
        let mut doc = Document::new();
        let stream = Stream::new(
            dict! { "FunctionType" => 4, "Domain" => numbers(&[0.0, 1.0]), "Range" => numbers(&[0.0, 1.0]) },
            b"{ dup moveto }".to_vec(),
        );
        assert_eq!(TintFunction::parse(&mut doc, &Object::Stream(stream)).unwrap(), None);
    }

    #[test]
    fn test_unknown_family_is_error() {
        let mut doc = Document::new();
        assert!(ColorSpace::resolve(&mut doc, &Object::from("Bogus")).is_err());
        assert!(ColorSpace::resolve(&mut doc, &Object::Integer(3)).is_err());
    }
}
