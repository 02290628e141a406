//! Content stream interpreter.
//!
//! Executes a page's operators against a graphics state stack and
//! reports what gets painted to [`EventListener`]s. Form XObjects are
//! interpreted recursively with their `/Matrix` concatenated to the CTM
//! and their `/Resources` searched before the enclosing ones.
//!
//! Inside a `BX`/`EX` compatibility section, interpreter errors and
//! unknown operators become [`WarningKind::CompatibilityDowngrade`]
//! warnings. Outside one, interpreter errors propagate and unknown
//! operators produce [`WarningKind::UnknownOperator`].

use std::sync::Arc;

use crate::content::colorspace::ColorSpace;
use crate::content::events::{
    ColorChangeEvent, Event, EventCollector, EventListener, FillRule, ImageRenderEvent, LineRenderEvent,
    MarkedContentEvent, PaintOp, PathRenderEvent, TextRenderEvent,
};
use crate::content::graphics_state::{ClipPath, Color, DashPattern, GraphicsStateStack, Segment, Subpath};
use crate::content::operators::{Operator, TextElement};
use crate::content::parser::{ContentReader, InlineImage};
use crate::dict;
use crate::document::{Document, Page};
use crate::error::{Error, Result, Warning, WarningKind};
use crate::fonts::PdfFont;
use crate::geometry::{Matrix, Point, Rect};
use crate::object::{Dictionary, Name, Object, ObjectRef, Stream};

/// An open marked content sequence.
#[derive(Debug, Clone)]
struct MarkedContent {
    tag: Name,
    mcid: Option<i64>,
}

/// Interpret one page, delivering events to `listeners` in source order.
///
/// # Errors
///
/// [`Error::Interpreter`] for operators that do not fit the graphics state
/// (for example `ET` without `BT`, or too few operands) outside a
/// compatibility section; [`Error::Syntax`] for malformed content in
/// strict mode; resolution and filter errors from the page's streams.
///
/// # Example
///
/// ```no_run
/// use pdf_ferrite::content::{interpret_page, EventCollector, EventListener};
/// use pdf_ferrite::document::Document;
///
/// let mut doc = Document::from_bytes(std::fs::read("sample.pdf")?)?;
/// let page = doc.page(0)?;
/// let mut collector = EventCollector::new();
/// interpret_page(&mut doc, &page, &mut [&mut collector])?;
/// println!("{}", collector.text());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn interpret_page(doc: &mut Document, page: &Page, listeners: &mut [&mut dyn EventListener]) -> Result<()> {
    let resources = doc.page_resources(page)?;
    let content = doc.page_contents(page)?;
    log::debug!("Interpreting page {} ({} content bytes)", page.index, content.len());
    Interpreter::new(doc, listeners).run(&content, resources)
}

/// Interpret one page and return its events.
pub fn page_events(doc: &mut Document, page: &Page) -> Result<Vec<Event>> {
    let mut collector = EventCollector::new();
    interpret_page(doc, page, &mut [&mut collector])?;
    Ok(collector.events)
}

/// Operator-dispatch loop over content streams.
pub struct Interpreter<'a, 'l> {
    doc: &'a mut Document,
    listeners: &'a mut [&'l mut dyn EventListener],
    stack: GraphicsStateStack,
    /// Resource dictionaries, innermost last
    resources: Vec<Dictionary>,
    /// Current path in user space
    path: Vec<Subpath>,
    /// `W` (false) or `W*` (true) waiting for the next painting operator
    pending_clip: Option<bool>,
    in_text: bool,
    compat_depth: usize,
    marked: Vec<MarkedContent>,
    /// Form XObjects being interpreted
    forms: Vec<ObjectRef>,
    /// `Q` cannot restore below this depth
    floor: usize,
    fallback_font: Option<Arc<PdfFont>>,
}

impl<'a, 'l> Interpreter<'a, 'l> {
    /// An interpreter starting from the initial graphics state.
    pub fn new(doc: &'a mut Document, listeners: &'a mut [&'l mut dyn EventListener]) -> Self {
        Self {
            doc,
            listeners,
            stack: GraphicsStateStack::new(),
            resources: Vec::new(),
            path: Vec::new(),
            pending_clip: None,
            in_text: false,
            compat_depth: 0,
            marked: Vec::new(),
            forms: Vec::new(),
            floor: 0,
            fallback_font: None,
        }
    }

    /// Start from `ctm` instead of the identity.
    pub fn with_ctm(mut self, ctm: Matrix) -> Self {
        self.stack.current_mut().ctm = ctm;
        self
    }

    /// Interpret `content` with `resources` as the outermost resource
    /// dictionary.
    pub fn run(&mut self, content: &[u8], resources: Dictionary) -> Result<()> {
        self.resources.push(resources);
        let result = self.execute(content);
        self.resources.pop();
        result?;

        if self.stack.depth() > 0 {
            self.warn(
                WarningKind::UnbalancedSaveRestore,
                format!("{} q without matching Q at end of content", self.stack.depth()),
            );
        }
        if !self.marked.is_empty() {
            self.warn(
                WarningKind::Other,
                format!("{} marked content sequences left open", self.marked.len()),
            );
        }
        Ok(())
    }

    fn execute(&mut self, content: &[u8]) -> Result<()> {
        let options = *self.doc.options();
        let mut reader = ContentReader::with_options(content, options);
        while let Some(next) = reader.next() {
            for warning in reader.take_warnings() {
                self.doc.report(warning);
            }
            let op = next?;
            log::trace!("{} {:?}", op.operator, op.operands);
            let result = Operator::from_operation(&op).and_then(|typed| self.apply(typed, op.offset));
            if let Err(e) = result {
                self.downgrade(e, &op.operator, op.offset)?;
            }
        }
        for warning in reader.take_warnings() {
            self.doc.report(warning);
        }
        Ok(())
    }

    /// Inside `BX`/`EX`, turn interpreter errors into warnings.
    fn downgrade(&mut self, error: Error, operator: &str, offset: usize) -> Result<()> {
        let recoverable = matches!(error, Error::Interpreter { .. } | Error::Encoding { .. });
        if self.compat_depth > 0 && recoverable {
            self.warn(
                WarningKind::CompatibilityDowngrade,
                format!("'{}' at content offset {}: {}", operator, offset, error),
            );
            return Ok(());
        }
        Err(error)
    }

    /// A missing resource: fatal in strict mode, a warning otherwise.
    fn missing(&mut self, operator: &str, reason: String) -> Result<()> {
        if self.doc.options().strict {
            return Err(Error::interpreter(operator, reason));
        }
        self.warn(WarningKind::Other, format!("'{}': {}", operator, reason));
        Ok(())
    }

    fn warn(&mut self, kind: WarningKind, message: String) {
        self.doc.report(Warning::new(kind, message));
    }

    fn emit(&mut self, event: Event) {
        for listener in self.listeners.iter_mut() {
            event.dispatch(&mut **listener);
        }
    }

    fn mcid(&self) -> Option<i64> {
        self.marked.iter().rev().find_map(|m| m.mcid)
    }

    fn require_text(&self, operator: &str) -> Result<()> {
        if self.in_text {
            Ok(())
        } else {
            Err(Error::interpreter(operator, "outside a BT/ET text object"))
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn apply(&mut self, op: Operator, offset: usize) -> Result<()> {
        match op {
            // Graphics state
            Operator::SaveState => self.stack.save(),
            Operator::RestoreState => {
                if self.stack.depth() > self.floor {
                    self.stack.restore();
                } else {
                    self.warn(
                        WarningKind::UnbalancedSaveRestore,
                        format!("Q without matching q at content offset {}", offset),
                    );
                }
            },
            Operator::Cm(m) => {
                let gs = self.stack.current_mut();
                gs.ctm = m.multiply(&gs.ctm);
            },
            Operator::SetLineWidth { width } => self.stack.current_mut().line_width = width,
            Operator::SetLineCap { cap_style } => self.stack.current_mut().line_cap = cap_style,
            Operator::SetLineJoin { join_style } => self.stack.current_mut().line_join = join_style,
            Operator::SetMiterLimit { limit } => self.stack.current_mut().miter_limit = limit,
            Operator::SetDash { array, phase } => self.stack.current_mut().dash = DashPattern { array, phase },
            Operator::SetRenderingIntent { intent } => self.stack.current_mut().rendering_intent = intent,
            Operator::SetFlatness { tolerance } => self.stack.current_mut().flatness = tolerance,
            Operator::SetExtGState { dict_name } => self.apply_ext_gstate(&dict_name)?,

            // Path construction
            Operator::MoveTo { x, y } => self.path.push(Subpath {
                start: Point::new(x, y),
                segments: Vec::new(),
                closed: false,
            }),
            Operator::LineTo { x, y } => self.extend_path("l", Segment::Line(Point::new(x, y)))?,
            Operator::CurveTo { x1, y1, x2, y2, x3, y3 } => self.extend_path(
                "c",
                Segment::Curve(Point::new(x1, y1), Point::new(x2, y2), Point::new(x3, y3)),
            )?,
            Operator::CurveToV { x2, y2, x3, y3 } => {
                let current = self.current_point("v")?;
                self.extend_path("v", Segment::Curve(current, Point::new(x2, y2), Point::new(x3, y3)))?;
            },
            Operator::CurveToY { x1, y1, x3, y3 } => {
                let end = Point::new(x3, y3);
                self.extend_path("y", Segment::Curve(Point::new(x1, y1), end, end))?;
            },
            Operator::ClosePath => {
                if let Some(last) = self.path.last_mut() {
                    last.closed = true;
                }
            },
            Operator::Rectangle { x, y, width, height } => self.path.push(Subpath {
                start: Point::new(x, y),
                segments: vec![
                    Segment::Line(Point::new(x + width, y)),
                    Segment::Line(Point::new(x + width, y + height)),
                    Segment::Line(Point::new(x, y + height)),
                ],
                closed: true,
            }),

            // Path painting
            Operator::Stroke => self.paint(false, None, true),
            Operator::CloseStroke => self.paint(true, None, true),
            Operator::Fill => self.paint(false, Some(FillRule::NonZero), false),
            Operator::FillEvenOdd => self.paint(false, Some(FillRule::EvenOdd), false),
            Operator::FillStroke => self.paint(false, Some(FillRule::NonZero), true),
            Operator::FillStrokeEvenOdd => self.paint(false, Some(FillRule::EvenOdd), true),
            Operator::CloseFillStroke => self.paint(true, Some(FillRule::NonZero), true),
            Operator::CloseFillStrokeEvenOdd => self.paint(true, Some(FillRule::EvenOdd), true),
            Operator::EndPath => self.paint(false, None, false),
            Operator::ClipNonZero => self.pending_clip = Some(false),
            Operator::ClipEvenOdd => self.pending_clip = Some(true),

            // Text objects
            Operator::BeginText => {
                if self.in_text {
                    self.warn(WarningKind::Other, format!("nested BT at content offset {}", offset));
                }
                self.in_text = true;
                let gs = self.stack.current_mut();
                gs.text_matrix = Matrix::identity();
                gs.text_line_matrix = Matrix::identity();
            },
            Operator::EndText => {
                if !self.in_text {
                    return Err(Error::interpreter("ET", "no text object is open"));
                }
                self.in_text = false;
            },

            // Text state
            Operator::Tc { char_space } => self.stack.current_mut().char_spacing = char_space,
            Operator::Tw { word_space } => self.stack.current_mut().word_spacing = word_space,
            Operator::Tz { scale } => self.stack.current_mut().horizontal_scaling = scale,
            Operator::TL { leading } => self.stack.current_mut().leading = leading,
            Operator::Tf { font, size } => self.set_font(&font, size)?,
            Operator::Tr { render } => self.stack.current_mut().render_mode = render,
            Operator::Ts { rise } => self.stack.current_mut().text_rise = rise,

            // Text positioning
            Operator::Td { tx, ty } => {
                self.require_text("Td")?;
                self.move_text(tx, ty);
            },
            Operator::TD { tx, ty } => {
                self.require_text("TD")?;
                self.stack.current_mut().leading = -ty;
                self.move_text(tx, ty);
            },
            Operator::Tm(m) => {
                self.require_text("Tm")?;
                let gs = self.stack.current_mut();
                gs.text_matrix = m;
                gs.text_line_matrix = m;
            },
            Operator::TStar => {
                self.require_text("T*")?;
                self.next_line();
            },

            // Text showing
            Operator::Tj { text } => {
                self.require_text("Tj")?;
                self.show_text("Tj", &[TextElement::String(text)], offset)?;
            },
            Operator::TJ { array } => {
                self.require_text("TJ")?;
                self.show_text("TJ", &array, offset)?;
            },
            Operator::Quote { text } => {
                self.require_text("'")?;
                self.next_line();
                self.show_text("'", &[TextElement::String(text)], offset)?;
            },
            Operator::DoubleQuote { word_space, char_space, text } => {
                self.require_text("\"")?;
                let gs = self.stack.current_mut();
                gs.word_spacing = word_space;
                gs.char_spacing = char_space;
                self.next_line();
                self.show_text("\"", &[TextElement::String(text)], offset)?;
            },

            // Color
            Operator::SetStrokeGray { gray } => self.set_device_color(true, ColorSpace::DeviceGray, vec![gray]),
            Operator::SetFillGray { gray } => self.set_device_color(false, ColorSpace::DeviceGray, vec![gray]),
            Operator::SetStrokeRgb { r, g, b } => self.set_device_color(true, ColorSpace::DeviceRGB, vec![r, g, b]),
            Operator::SetFillRgb { r, g, b } => self.set_device_color(false, ColorSpace::DeviceRGB, vec![r, g, b]),
            Operator::SetStrokeCmyk { c, m, y, k } => {
                self.set_device_color(true, ColorSpace::DeviceCMYK, vec![c, m, y, k])
            },
            Operator::SetFillCmyk { c, m, y, k } => {
                self.set_device_color(false, ColorSpace::DeviceCMYK, vec![c, m, y, k])
            },
            Operator::SetStrokeColorSpace { name } => self.set_color_space(true, &name)?,
            Operator::SetFillColorSpace { name } => self.set_color_space(false, &name)?,
            Operator::SetStrokeColor { components } => self.set_color(true, "SC", components, None)?,
            Operator::SetFillColor { components } => self.set_color(false, "sc", components, None)?,
            Operator::SetStrokeColorN { components, pattern } => self.set_color(true, "SCN", components, pattern)?,
            Operator::SetFillColorN { components, pattern } => self.set_color(false, "scn", components, pattern)?,

            // XObjects
            Operator::Do { name } => self.paint_xobject(&name)?,
            Operator::InlineImage(image) => self.paint_inline_image(image),
            Operator::PaintShading { name } => log::trace!("Shading /{} painted", name),

            // Marked content
            Operator::BeginMarkedContent { tag } => {
                self.marked.push(MarkedContent { tag: tag.clone(), mcid: None });
                self.emit(Event::MarkedContent(MarkedContentEvent::Begin { tag, properties: None }));
            },
            Operator::BeginMarkedContentDict { tag, properties } => {
                let properties = self.property_list(&properties)?;
                let mcid = properties.as_ref().and_then(|p| p.get_integer("MCID"));
                self.marked.push(MarkedContent { tag: tag.clone(), mcid });
                self.emit(Event::MarkedContent(MarkedContentEvent::Begin { tag, properties }));
            },
            Operator::EndMarkedContent => match self.marked.pop() {
                Some(open) => self.emit(Event::MarkedContent(MarkedContentEvent::End { tag: open.tag })),
                None => self.warn(WarningKind::Other, format!("EMC without BMC at content offset {}", offset)),
            },
            Operator::MarkPoint { tag } => {
                self.emit(Event::MarkedContent(MarkedContentEvent::Point { tag, properties: None }));
            },
            Operator::MarkPointDict { tag, properties } => {
                let properties = self.property_list(&properties)?;
                self.emit(Event::MarkedContent(MarkedContentEvent::Point { tag, properties }));
            },

            // Compatibility
            Operator::BeginCompatibility => self.compat_depth += 1,
            Operator::EndCompatibility => self.compat_depth = self.compat_depth.saturating_sub(1),

            // Type 3 glyph metrics carry no state the events need
            Operator::SetCharWidth { .. } | Operator::SetCacheDevice { .. } => {},

            Operator::Other { name, .. } => {
                if self.compat_depth > 0 {
                    self.warn(
                        WarningKind::CompatibilityDowngrade,
                        format!("unknown operator '{}' in compatibility section", name),
                    );
                } else {
                    self.warn(
                        WarningKind::UnknownOperator,
                        format!("unknown operator '{}' at content offset {}", name, offset),
                    );
                }
            },
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------

    /// Find `name` in resource `category`, innermost dictionary first.
    fn lookup_resource(&mut self, category: &str, name: &Name) -> Result<Option<Object>> {
        for i in (0..self.resources.len()).rev() {
            let Some(entries) = self.resources[i].get(category).cloned() else {
                continue;
            };
            let entries = self.doc.resolve_object(&entries)?;
            if let Some(entry) = entries.as_dict().and_then(|d| d.get_by_name(name)) {
                return Ok(Some(entry.clone()));
            }
        }
        Ok(None)
    }

    /// Property list operand of `BDC`/`DP`: inline, or named in `/Properties`.
    fn property_list(&mut self, operand: &Object) -> Result<Option<Dictionary>> {
        match operand {
            Object::Dictionary(d) => Ok(Some(d.clone())),
            Object::Name(name) => match self.lookup_resource("Properties", name)? {
                Some(entry) => Ok(self.doc.resolve_object(&entry)?.as_dict().cloned()),
                None => {
                    self.missing("BDC", format!("property list /{} not in resources", name))?;
                    Ok(None)
                },
            },
            _ => Ok(None),
        }
    }

    fn apply_ext_gstate(&mut self, name: &Name) -> Result<()> {
        let Some(entry) = self.lookup_resource("ExtGState", name)? else {
            return self.missing("gs", format!("ExtGState /{} not in resources", name));
        };
        let params = self.doc.resolve_object(&entry)?;
        let Some(params) = params.as_dict() else {
            return self.missing("gs", format!("ExtGState /{} is not a dictionary", name));
        };

        let font = match params.get("Font").and_then(Object::as_array) {
            Some(pair) if pair.len() == 2 => {
                let size = pair[1].as_number().unwrap_or(0.0);
                Some((self.doc.load_font(&pair[0])?, size))
            },
            _ => None,
        };

        let gs = self.stack.current_mut();
        if let Some(width) = params.get_number("LW") {
            gs.line_width = width;
        }
        if let Some(cap) = params.get_integer("LC") {
            gs.line_cap = cap;
        }
        if let Some(join) = params.get_integer("LJ") {
            gs.line_join = join;
        }
        if let Some(limit) = params.get_number("ML") {
            gs.miter_limit = limit;
        }
        if let Some([array, phase]) = params.get("D").and_then(Object::as_array).map(Vec::as_slice) {
            gs.dash = DashPattern {
                array: array
                    .as_array()
                    .map(|a| a.iter().filter_map(Object::as_number).collect())
                    .unwrap_or_default(),
                phase: phase.as_number().unwrap_or(0.0),
            };
        }
        if let Some((font, size)) = font {
            gs.font_name = None;
            gs.font = Some(font);
            gs.font_size = size;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Paths
    // ------------------------------------------------------------------

    fn current_point(&self, operator: &str) -> Result<Point> {
        self.path
            .last()
            .map(Subpath::current_point)
            .ok_or_else(|| Error::interpreter(operator, "no current point"))
    }

    fn extend_path(&mut self, operator: &str, segment: Segment) -> Result<()> {
        let last = self.path.last_mut().ok_or_else(|| Error::interpreter(operator, "no current point"))?;
        if last.closed {
            // A segment after `h` starts a new subpath at the closed one's start
            let start = last.start;
            self.path.push(Subpath {
                start,
                segments: vec![segment],
                closed: false,
            });
        } else {
            last.segments.push(segment);
        }
        Ok(())
    }

    /// Paint and clear the current path, applying any pending clip.
    fn paint(&mut self, close: bool, fill: Option<FillRule>, stroke: bool) {
        let mut path = std::mem::take(&mut self.path);
        if close {
            if let Some(last) = path.last_mut() {
                last.closed = true;
            }
        }
        let ctm = self.stack.current().ctm;
        let device: Vec<Subpath> = path.iter().map(|sp| sp.transform(&ctm)).collect();

        if let Some(even_odd) = self.pending_clip.take() {
            self.stack.current_mut().clip.push(ClipPath {
                subpaths: device.clone(),
                even_odd,
            });
        }
        if device.is_empty() {
            return;
        }

        if let Some(fill_rule) = fill {
            let paint = if stroke { PaintOp::FillAndStroke } else { PaintOp::Fill };
            let state = self.stack.current().clone();
            self.emit(Event::Path(PathRenderEvent {
                subpaths: device.clone(),
                paint,
                fill_rule,
                state,
            }));
        }
        if stroke {
            self.stroke_segments(&device);
        }
    }

    fn stroke_segments(&mut self, subpaths: &[Subpath]) {
        let gs = self.stack.current();
        let (line_width, color, dash) = (gs.line_width, gs.stroke_color.clone(), gs.dash.clone());
        let mut events = Vec::new();
        for subpath in subpaths {
            let mut from = subpath.start;
            for segment in &subpath.segments {
                let (end, controls) = match *segment {
                    Segment::Line(p) => (p, None),
                    Segment::Curve(c1, c2, p) => (p, Some((c1, c2))),
                };
                events.push((from, end, controls));
                from = end;
            }
            if subpath.closed && from != subpath.start {
                events.push((from, subpath.start, None));
            }
        }
        for (start, end, controls) in events {
            self.emit(Event::Line(LineRenderEvent {
                start,
                end,
                controls,
                line_width,
                color: color.clone(),
                dash: dash.clone(),
            }));
        }
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    fn move_text(&mut self, tx: f64, ty: f64) {
        let gs = self.stack.current_mut();
        gs.text_line_matrix = Matrix::translation(tx, ty).multiply(&gs.text_line_matrix);
        gs.text_matrix = gs.text_line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.stack.current().leading;
        self.move_text(0.0, -leading);
    }

    fn set_font(&mut self, name: &Name, size: f64) -> Result<()> {
        let font = match self.lookup_resource("Font", name)? {
            Some(entry) => Some(self.doc.load_font(&entry)?),
            None => {
                self.missing("Tf", format!("font /{} not in resources", name))?;
                None
            },
        };
        let gs = self.stack.current_mut();
        gs.font_name = Some(name.clone());
        gs.font = font;
        gs.font_size = size;
        Ok(())
    }

    /// The current font, or Helvetica when none was selected.
    fn text_font(&mut self) -> Result<Arc<PdfFont>> {
        if let Some(font) = &self.stack.current().font {
            return Ok(Arc::clone(font));
        }
        if let Some(font) = &self.fallback_font {
            return Ok(Arc::clone(font));
        }
        self.warn(WarningKind::Other, "text shown without a font; using Helvetica".to_string());
        let helvetica = dict! { "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica" };
        let font = self.doc.load_font(&Object::Dictionary(helvetica))?;
        self.fallback_font = Some(Arc::clone(&font));
        Ok(font)
    }

    /// Show strings and apply `TJ` adjustments, emitting one event.
    fn show_text(&mut self, operator: &str, elements: &[TextElement], offset: usize) -> Result<()> {
        let font = self.text_font()?;
        let strict = self.doc.options().strict;
        let snapshot = self.stack.current().clone();
        let rise = snapshot.text_rise;
        let start = snapshot.text_to_page(0.0, rise);

        let size = snapshot.font_size;
        let hscale = snapshot.horizontal_scaling / 100.0;
        let (char_spacing, word_spacing) = (snapshot.char_spacing, snapshot.word_spacing);
        let mut tm = snapshot.text_matrix;
        let mut raw_bytes = Vec::new();
        let mut unicode = String::new();
        let mut unmapped = 0usize;

        for element in elements {
            match element {
                TextElement::String(bytes) => {
                    raw_bytes.extend_from_slice(bytes);
                    for glyph in font.glyphs(bytes) {
                        match &glyph.unicode {
                            Some(text) => unicode.push_str(text),
                            None if strict => {
                                return Err(Error::Encoding {
                                    code: glyph.code,
                                    font: font.base_font().to_string(),
                                })
                            },
                            None => {
                                unmapped += 1;
                                unicode.push_str(&font.fallback_text(glyph.code));
                            },
                        }
                        let spacing = if glyph.is_space() { word_spacing } else { 0.0 };
                        let advance = (glyph.width / 1000.0 * size + char_spacing + spacing) * hscale;
                        tm = Matrix::translation(advance, 0.0).multiply(&tm);
                    }
                },
                TextElement::Offset(n) => {
                    let advance = -n / 1000.0 * size * hscale;
                    tm = Matrix::translation(advance, 0.0).multiply(&tm);
                },
            }
        }

        if unmapped > 0 {
            self.warn(
                WarningKind::EncodingFallback,
                format!(
                    "'{}': {} codes without Unicode mapping in font {}",
                    operator,
                    unmapped,
                    font.base_font()
                ),
            );
        }

        self.stack.current_mut().text_matrix = tm;
        let end = self.stack.current().text_to_page(0.0, rise);
        let mcid = self.mcid();
        self.emit(Event::Text(TextRenderEvent {
            state: snapshot,
            raw_bytes,
            unicode,
            baseline: (start, end),
            mcid,
            offset,
        }));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Color
    // ------------------------------------------------------------------

    fn color_mut(&mut self, stroke: bool) -> &mut Color {
        let gs = self.stack.current_mut();
        if stroke {
            &mut gs.stroke_color
        } else {
            &mut gs.fill_color
        }
    }

    fn emit_color(&mut self, stroke: bool) {
        let color = self.color_mut(stroke).clone();
        let alternate = color.space.alternate_components(&color.components);
        self.emit(Event::Color(ColorChangeEvent { stroke, color, alternate }));
    }

    fn set_device_color(&mut self, stroke: bool, space: ColorSpace, components: Vec<f64>) {
        *self.color_mut(stroke) = Color {
            space: Arc::new(space),
            components,
            pattern: None,
        };
        self.emit_color(stroke);
    }

    fn set_color_space(&mut self, stroke: bool, name: &Name) -> Result<()> {
        let operator = if stroke { "CS" } else { "cs" };
        let space = match ColorSpace::from_name(&name.to_string_lossy()) {
            Some(space) => space,
            None => match self.lookup_resource("ColorSpace", name)? {
                Some(entry) => ColorSpace::resolve(self.doc, &entry)
                    .map_err(|e| Error::interpreter(operator, format!("color space /{}: {}", name, e)))?,
                None => {
                    self.missing(operator, format!("color space /{} not in resources", name))?;
                    ColorSpace::DeviceGray
                },
            },
        };
        *self.color_mut(stroke) = Color::initial(space);
        self.emit_color(stroke);
        Ok(())
    }

    fn set_color(&mut self, stroke: bool, operator: &str, components: Vec<f64>, pattern: Option<Name>) -> Result<()> {
        let space = Arc::clone(&self.color_mut(stroke).space);
        if space.is_pattern() && pattern.is_none() {
            return Err(Error::interpreter(operator, "Pattern color space needs a pattern name"));
        }
        let needed = space.components();
        if components.len() < needed {
            return Err(Error::interpreter(
                operator,
                format!(
                    "{} needs {} components, found {}",
                    space.family(),
                    needed,
                    components.len()
                ),
            ));
        }
        let components = components[components.len() - needed..].to_vec();
        let pattern = if space.is_pattern() { pattern } else { None };
        *self.color_mut(stroke) = Color {
            space,
            components,
            pattern,
        };
        self.emit_color(stroke);
        Ok(())
    }

    // ------------------------------------------------------------------
    // XObjects and images
    // ------------------------------------------------------------------

    fn paint_xobject(&mut self, name: &Name) -> Result<()> {
        let Some(entry) = self.lookup_resource("XObject", name)? else {
            return self.missing("Do", format!("XObject /{} not in resources", name));
        };
        let reference = entry.as_reference();
        let object = self.doc.resolve_object(&entry)?;
        let Some(stream) = object.as_stream() else {
            return self.missing("Do", format!("XObject /{} is not a stream", name));
        };

        match stream.dict.get_name("Subtype") {
            Some("Image") => {
                let event = ImageRenderEvent {
                    ctm: self.stack.current().ctm,
                    name: Some(name.clone()),
                    reference,
                    dict: stream.dict.clone(),
                    inline: false,
                    data: None,
                    mcid: self.mcid(),
                };
                self.emit(Event::Image(event));
                Ok(())
            },
            Some("Form") => self.run_form(name, reference, stream),
            other => {
                log::debug!("Ignoring XObject /{} with subtype {:?}", name, other);
                Ok(())
            },
        }
    }

    fn run_form(&mut self, name: &Name, reference: Option<ObjectRef>, form: &Stream) -> Result<()> {
        if let Some(r) = reference {
            if self.forms.contains(&r) {
                self.warn(
                    WarningKind::ResolutionCycle,
                    format!("Form XObject /{} ({}) invokes itself; skipped", name, r),
                );
                return Ok(());
            }
        }
        let limit = self.doc.options().max_recursion_depth as usize;
        if self.forms.len() >= limit {
            return Err(Error::RecursionLimitExceeded(limit as u32));
        }

        let content = self.doc.decode_stream(form)?;
        let resources = match form.dict.get("Resources") {
            Some(res) => self.doc.resolve_object(res)?.as_dict().cloned().unwrap_or_default(),
            None => Dictionary::new(),
        };
        let matrix = form
            .dict
            .get("Matrix")
            .and_then(Object::as_array)
            .and_then(|m| Matrix::from_array(m))
            .unwrap_or_else(Matrix::identity);
        let bbox = form.dict.get("BBox").and_then(Object::as_array).and_then(|b| Rect::from_array(b));

        log::debug!("Entering Form XObject /{} ({} bytes)", name, content.len());
        self.stack.save();
        {
            let gs = self.stack.current_mut();
            gs.ctm = matrix.multiply(&gs.ctm);
            if let Some(bbox) = bbox {
                let clip = Subpath {
                    start: Point::new(bbox.left(), bbox.bottom()),
                    segments: vec![
                        Segment::Line(Point::new(bbox.right(), bbox.bottom())),
                        Segment::Line(Point::new(bbox.right(), bbox.top())),
                        Segment::Line(Point::new(bbox.left(), bbox.top())),
                    ],
                    closed: true,
                };
                gs.clip.push(ClipPath {
                    subpaths: vec![clip.transform(&gs.ctm)],
                    even_odd: false,
                });
            }
        }
        let saved_floor = std::mem::replace(&mut self.floor, self.stack.depth());
        let saved_text = std::mem::replace(&mut self.in_text, false);
        let saved_path = std::mem::take(&mut self.path);
        if let Some(r) = reference {
            self.forms.push(r);
        }
        self.resources.push(resources);

        let result = self.execute(&content);

        self.resources.pop();
        if reference.is_some() {
            self.forms.pop();
        }
        if self.stack.depth() > self.floor {
            self.warn(
                WarningKind::UnbalancedSaveRestore,
                format!("Form XObject /{} left {} q unmatched", name, self.stack.depth() - self.floor),
            );
            while self.stack.depth() > self.floor {
                self.stack.restore();
            }
        }
        self.path = saved_path;
        self.in_text = saved_text;
        self.floor = saved_floor;
        self.stack.restore();
        result
    }

    fn paint_inline_image(&mut self, image: InlineImage) {
        let event = ImageRenderEvent {
            ctm: self.stack.current().ctm,
            name: None,
            reference: None,
            dict: image.dict,
            inline: true,
            data: Some(image.data),
            mcid: self.mcid(),
        };
        self.emit(Event::Image(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_config::ParserOptions;

    fn run(doc: &mut Document, content: &[u8], resources: Dictionary) -> Result<EventCollector> {
        let mut collector = EventCollector::new();
        Interpreter::new(doc, &mut [&mut collector]).run(content, resources)?;
        Ok(collector)
    }

    fn helvetica_resources(doc: &mut Document) -> Dictionary {
        let font = doc.add_object(Object::Dictionary(dict! {
            "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica"
        })).unwrap();
        dict! { "Font" => dict! { "F1" => font } }
    }

    #[test]
    fn test_hello_world_baseline() {
        let mut doc = Document::new();
        let resources = helvetica_resources(&mut doc);
        let events = run(&mut doc, b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET", resources).unwrap();
        let texts: Vec<_> = events.text_events().collect();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].unicode, "Hello");
        assert_eq!(texts[0].raw_bytes, b"Hello");
        assert!(texts[0].baseline.0.approx_eq(&Point::new(100.0, 700.0), 1e-9));
        // Helvetica H e l l o = 722 + 556 + 222 + 222 + 556
        let expected = 2278.0 / 1000.0 * 12.0;
        assert!((texts[0].baseline.1.x - (100.0 + expected)).abs() < 1e-9);
        assert_eq!(texts[0].baseline.1.y, 700.0);
    }

    #[test]
    fn test_tj_adjustment_between_chunks() {
        let mut doc = Document::new();
        let resources = helvetica_resources(&mut doc);
        let plain = run(&mut doc, b"BT /F1 10 Tf (Hello) Tj ET", resources.clone()).unwrap();
        let adjusted = run(&mut doc, b"BT /F1 10 Tf [(He) -50 (llo)] TJ ET", resources).unwrap();
        let plain = plain.text_events().next().unwrap().clone();
        let adjusted = adjusted.text_events().next().unwrap().clone();
        assert_eq!(adjusted.unicode, "Hello");
        // -50/1000 * 10 moves the end right by 0.5
        assert!((adjusted.width() - plain.width() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_word_and_char_spacing_with_scaling() {
        let mut doc = Document::new();
        let resources = helvetica_resources(&mut doc);
        let events = run(&mut doc, b"BT /F1 10 Tf 2 Tw 1 Tc 50 Tz ( ) Tj ET", resources).unwrap();
        let text = events.text_events().next().unwrap();
        // (278/1000*10 + 1 + 2) * 0.5
        assert!((text.width() - (2.78 + 3.0) * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_rotated_ctm_baseline() {
        let mut doc = Document::new();
        let font = doc.add_object(Object::Dictionary(dict! {
            "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Courier"
        })).unwrap();
        let resources = dict! { "Font" => dict! { "F1" => font } };
        let content = b"0 1 -1 0 0 0 cm BT /F1 10 Tf (ABCDEFGHIJKLMNOP) Tj ET";
        let events = run(&mut doc, &content[..], resources).unwrap();
        let text = events.text_events().next().unwrap();
        let (start, end) = text.baseline;
        assert!(start.approx_eq(&Point::new(0.0, 0.0), 1e-9));
        // 16 glyphs * 600/1000 * 10 = 96 along +y
        assert!(end.approx_eq(&Point::new(0.0, 96.0), 1e-9));
    }

    #[test]
    fn test_et_without_bt_is_error() {
        let mut doc = Document::new();
        let err = run(&mut doc, b"ET", Dictionary::new()).unwrap_err();
        assert!(matches!(err, Error::Interpreter { ref operator, .. } if operator == "ET"));
    }

    #[test]
    fn test_underflow_is_error_outside_compat() {
        let mut doc = Document::new();
        assert!(matches!(run(&mut doc, b"1 0 0 cm", Dictionary::new()), Err(Error::Interpreter { .. })));
    }

    #[test]
    fn test_compat_section_downgrades() {
        let mut doc = Document::new();
        run(&mut doc, b"BX 1 0 0 cm foo ET EX q Q", Dictionary::new()).unwrap();
        let kinds: Vec<WarningKind> = doc.warnings().iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::CompatibilityDowngrade; 3]);
    }

    #[test]
    fn test_unknown_operator_warns() {
        let mut doc = Document::new();
        run(&mut doc, b"1 2 zz", Dictionary::new()).unwrap();
        assert_eq!(doc.warnings()[0].kind, WarningKind::UnknownOperator);
    }

    #[test]
    fn test_unbalanced_q_warns() {
        let mut doc = Document::new();
        run(&mut doc, b"q q Q", Dictionary::new()).unwrap();
        assert_eq!(doc.warnings().len(), 1);
        assert_eq!(doc.warnings()[0].kind, WarningKind::UnbalancedSaveRestore);

        let mut doc = Document::new();
        run(&mut doc, b"Q", Dictionary::new()).unwrap();
        assert_eq!(doc.warnings()[0].kind, WarningKind::UnbalancedSaveRestore);
    }

    #[test]
    fn test_stroke_emits_line_per_segment() {
        let mut doc = Document::new();
        let events = run(&mut doc, b"2 w 10 10 m 20 10 l 20 20 l h S", Dictionary::new()).unwrap();
        let lines: Vec<&LineRenderEvent> = events
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Line(l) => Some(l),
                _ => None,
            })
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].start, Point::new(20.0, 20.0));
        assert_eq!(lines[2].end, Point::new(10.0, 10.0));
        assert_eq!(lines[0].line_width, 2.0);
    }

    #[test]
    fn test_fill_emits_one_path_event() {
        let mut doc = Document::new();
        let events = run(&mut doc, b"2 0 0 2 0 0 cm 0 0 10 10 re 20 20 5 5 re f*", Dictionary::new()).unwrap();
        let paths: Vec<&PathRenderEvent> = events
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Path(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].subpaths.len(), 2);
        assert_eq!(paths[0].fill_rule, FillRule::EvenOdd);
        assert_eq!(paths[0].bounds(), Some(Rect::new(0.0, 0.0, 50.0, 50.0)));
    }

    #[test]
    fn test_clip_recorded_and_restored() {
        let mut doc = Document::new();
        let mut collector = EventCollector::new();
        let mut listeners: [&mut dyn EventListener; 1] = [&mut collector];
        let mut interp = Interpreter::new(&mut doc, &mut listeners);
        interp.run(b"q 0 0 10 10 re W n", Dictionary::new()).unwrap();
        assert_eq!(interp.stack.current().clip.len(), 1);
        interp.run(b"Q", Dictionary::new()).unwrap();
        assert!(interp.stack.current().clip.is_empty());
    }

    #[test]
    fn test_color_operators_and_arity() {
        let mut doc = Document::new();
        let events = run(&mut doc, b"1 0 0 rg /DeviceCMYK CS 0.1 0.2 0.3 0.4 SC", Dictionary::new()).unwrap();
        let colors: Vec<&ColorChangeEvent> = events
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Color(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(colors.len(), 3);
        assert_eq!(*colors[0].color.space, ColorSpace::DeviceRGB);
        assert!(colors[1].stroke);
        assert_eq!(colors[1].color.components, vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(colors[2].color.components, vec![0.1, 0.2, 0.3, 0.4]);

        let mut doc = Document::new();
        assert!(matches!(
            run(&mut doc, b"/DeviceRGB cs 0.5 sc", Dictionary::new()),
            Err(Error::Interpreter { .. })
        ));
    }

    #[test]
    fn test_named_separation_space() {
        let mut doc = Document::new();
        let sep = Object::Array(vec![
            Object::from("Separation"),
            Object::from("Gold"),
            Object::from("DeviceGray"),
            Object::Dictionary(dict! { "FunctionType" => 2, "N" => 1 }),
        ]);
        let resources = dict! { "ColorSpace" => dict! { "CS0" => sep } };
        let events = run(&mut doc, b"/CS0 cs 0.25 scn", resources).unwrap();
        let Some(Event::Color(last)) = events.events.last() else {
            panic!("expected a color event");
        };
        assert_eq!(last.color.components, vec![0.25]);
        assert_eq!(last.alternate.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_form_xobject_recursion() {
        let mut doc = Document::new();
        let form = doc.add_object(Object::Stream(Stream::new(
            dict! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(100), Object::Integer(100)],
                "Matrix" => vec![
                    Object::Integer(1), Object::Integer(0), Object::Integer(0),
                    Object::Integer(1), Object::Integer(50), Object::Integer(60),
                ],
            },
            b"BT (X) Tj ET".to_vec(),
        ))).unwrap();
        let resources = dict! { "XObject" => dict! { "Fm1" => form } };
        let events = run(&mut doc, b"1 0 0 1 10 20 cm /Fm1 Do", resources).unwrap();
        let texts: Vec<_> = events.text_events().collect();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].unicode, "X");
        assert!(texts[0].baseline.0.approx_eq(&Point::new(60.0, 80.0), 1e-9));
    }

    #[test]
    fn test_self_invoking_form_is_skipped() {
        let mut doc = Document::new();
        let form_ref = ObjectRef::new(doc.next_object_number(), 0);
        let form = Stream::new(
            dict! {
                "Subtype" => "Form",
                "Resources" => dict! { "XObject" => dict! { "Me" => form_ref } },
            },
            b"/Me Do".to_vec(),
        );
        doc.set_object(form_ref, Object::Stream(form));
        let resources = dict! { "XObject" => dict! { "Me" => form_ref } };
        run(&mut doc, b"/Me Do", resources).unwrap();
        assert!(doc.warnings().iter().any(|w| w.kind == WarningKind::ResolutionCycle));
    }

    #[test]
    fn test_image_and_inline_image() {
        let mut doc = Document::new();
        let image = doc.add_object(Object::Stream(Stream::new(
            dict! { "Subtype" => "Image", "Width" => 2, "Height" => 1 },
            vec![0u8; 2],
        ))).unwrap();
        let resources = dict! { "XObject" => dict! { "Im0" => image } };
        let content = b"q 100 0 0 50 10 10 cm /Im0 Do Q BI /W 1 /H 1 /CS /G /BPC 8 ID \x80 EI";
        let events = run(&mut doc, &content[..], resources).unwrap();
        let images: Vec<&ImageRenderEvent> = events.events.iter().filter_map(Event::as_image).collect();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].reference, Some(image));
        assert_eq!(images[0].bounds(), Rect::new(10.0, 10.0, 100.0, 50.0));
        assert!(images[1].inline);
        assert_eq!(images[1].data.as_deref(), Some(&b"\x80"[..]));
    }

    #[test]
    fn test_marked_content_mcid() {
        let mut doc = Document::new();
        let resources = dict! { "Properties" => dict! { "P0" => dict! { "MCID" => 7 } } };
        let events = run(&mut doc, b"/Span /P0 BDC BT (a) Tj ET EMC", resources).unwrap();
        let text = events.text_events().next().unwrap();
        assert_eq!(text.mcid, Some(7));
        assert!(matches!(events.events.last(), Some(Event::MarkedContent(MarkedContentEvent::End { .. }))));
    }

    #[test]
    fn test_ext_gstate() {
        let mut doc = Document::new();
        let resources = dict! {
            "ExtGState" => dict! {
                "GS0" => dict! {
                    "LW" => 3.5,
                    "D" => vec![Object::Array(vec![Object::Integer(4)]), Object::Integer(1)],
                },
            },
        };
        let events = run(&mut doc, b"/GS0 gs 0 0 m 1 1 l S", resources).unwrap();
        let Some(Event::Line(line)) = events.events.first() else {
            panic!("expected a line event");
        };
        assert_eq!(line.line_width, 3.5);
        assert_eq!(line.dash.array, vec![4.0]);
    }

    #[test]
    fn test_unmapped_codes_fall_back_with_warning() {
        let mut doc = Document::new();
        let font = doc.add_object(Object::Dictionary(dict! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Custom",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Dictionary(dict! {
                "Type" => "Font", "Subtype" => "CIDFontType2", "BaseFont" => "Custom",
            })],
        })).unwrap();
        let resources = dict! { "Font" => dict! { "F1" => font } };
        let content = b"BT /F1 10 Tf <0041> Tj ET";
        let events = run(&mut doc, &content[..], resources.clone()).unwrap();
        assert_eq!(events.text(), "\u{FFFD}");
        assert!(doc.warnings().iter().any(|w| w.kind == WarningKind::EncodingFallback));
    }

    #[test]
    fn test_unmapped_codes_fail_in_strict_mode() {
        let mut doc = Document::new();
        doc.set_options(ParserOptions::strict());
        let font = doc.add_object(Object::Dictionary(dict! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Custom",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Dictionary(dict! {
                "Type" => "Font", "Subtype" => "CIDFontType2", "BaseFont" => "Custom",
            })],
        })).unwrap();
        let resources = dict! { "Font" => dict! { "F1" => font } };
        let err = run(&mut doc, b"BT /F1 10 Tf <0041> Tj ET", resources).unwrap_err();
        assert!(matches!(err, Error::Encoding { code: 0x41, .. }));
    }
}
