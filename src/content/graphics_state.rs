//! Graphics state management for content stream execution.
//!
//! Tracks the parameters that `q`/`Q` save and restore: transformation,
//! text state, colors, line style and the clipping path.

use std::sync::Arc;

use crate::content::colorspace::ColorSpace;
use crate::fonts::PdfFont;
use crate::geometry::{Matrix, Point};
use crate::object::Name;

/// A color: components in a color space, or a pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Color {
    /// Color space the components are in
    pub space: Arc<ColorSpace>,
    /// Color components
    pub components: Vec<f64>,
    /// Pattern resource name for the Pattern color space
    pub pattern: Option<Name>,
}

impl Color {
    /// The initial color of `space`.
    pub fn initial(space: ColorSpace) -> Self {
        Self {
            components: space.initial_color(),
            space: Arc::new(space),
            pattern: None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::initial(ColorSpace::DeviceGray)
    }
}

/// A path segment after its start point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    /// Straight line to a point
    Line(Point),
    /// Cubic Bézier: two control points and the end point
    Curve(Point, Point, Point),
}

impl Segment {
    /// End point of the segment.
    pub fn end(&self) -> Point {
        match self {
            Segment::Line(p) | Segment::Curve(_, _, p) => *p,
        }
    }

    fn transform(&self, m: &Matrix) -> Segment {
        let t = |p: &Point| m.transform_point(p.x, p.y);
        match self {
            Segment::Line(p) => Segment::Line(t(p)),
            Segment::Curve(c1, c2, p) => Segment::Curve(t(c1), t(c2), t(p)),
        }
    }
}

/// A subpath: a start point and connected segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Subpath {
    /// Start point
    pub start: Point,
    /// Segments in order
    pub segments: Vec<Segment>,
    /// Closed by `h`, `s`, `b`, `b*` or `re`
    pub closed: bool,
}

impl Subpath {
    /// Map all points through `m`.
    pub fn transform(&self, m: &Matrix) -> Subpath {
        Subpath {
            start: m.transform_point(self.start.x, self.start.y),
            segments: self.segments.iter().map(|s| s.transform(m)).collect(),
            closed: self.closed,
        }
    }

    /// Current point: the end of the last segment.
    pub fn current_point(&self) -> Point {
        self.segments.last().map(Segment::end).unwrap_or(self.start)
    }
}

/// One `W`/`W*` intersection, recorded in user space of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPath {
    /// Subpaths, already transformed by the CTM in effect
    pub subpaths: Vec<Subpath>,
    /// `W*` rather than `W`
    pub even_odd: bool,
}

/// Line dash pattern.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashPattern {
    /// Dash and gap lengths; empty for a solid line
    pub array: Vec<f64>,
    /// Phase
    pub phase: f64,
}

/// Graphics state parameters.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    /// Current transformation matrix (user space to page space)
    pub ctm: Matrix,
    /// Text matrix; meaningful only inside `BT`/`ET`
    pub text_matrix: Matrix,
    /// Text line matrix; meaningful only inside `BT`/`ET`
    pub text_line_matrix: Matrix,

    /// Character spacing (Tc)
    pub char_spacing: f64,
    /// Word spacing (Tw)
    pub word_spacing: f64,
    /// Horizontal scaling percentage (Tz)
    pub horizontal_scaling: f64,
    /// Text leading (TL)
    pub leading: f64,
    /// Font resource name (Tf)
    pub font_name: Option<Name>,
    /// Loaded font
    pub font: Option<Arc<PdfFont>>,
    /// Font size (Tf)
    pub font_size: f64,
    /// Text rise (Ts)
    pub text_rise: f64,
    /// Text rendering mode (Tr)
    pub render_mode: i64,

    /// Non-stroking color
    pub fill_color: Color,
    /// Stroking color
    pub stroke_color: Color,

    /// Line width (w)
    pub line_width: f64,
    /// Line cap style (J)
    pub line_cap: i64,
    /// Line join style (j)
    pub line_join: i64,
    /// Miter limit (M)
    pub miter_limit: f64,
    /// Dash pattern (d)
    pub dash: DashPattern,
    /// Rendering intent (ri)
    pub rendering_intent: Name,
    /// Flatness tolerance (i)
    pub flatness: f64,

    /// Clipping path intersections since the page began
    pub clip: Vec<ClipPath>,
}

impl GraphicsState {
    /// Initial state at the start of a page.
    ///
    /// ```
    /// use pdf_ferrite::content::GraphicsState;
    ///
    /// let state = GraphicsState::new();
    /// assert_eq!(state.horizontal_scaling, 100.0);
    /// assert_eq!(state.line_width, 1.0);
    /// ```
    pub fn new() -> Self {
        Self {
            ctm: Matrix::identity(),
            text_matrix: Matrix::identity(),
            text_line_matrix: Matrix::identity(),
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 100.0,
            leading: 0.0,
            font_name: None,
            font: None,
            font_size: 0.0,
            text_rise: 0.0,
            render_mode: 0,
            fill_color: Color::default(),
            stroke_color: Color::default(),
            line_width: 1.0,
            line_cap: 0,
            line_join: 0,
            miter_limit: 10.0,
            dash: DashPattern::default(),
            rendering_intent: Name::from("RelativeColorimetric"),
            flatness: 1.0,
            clip: Vec::new(),
        }
    }

    /// Text rendering matrix: font size, scaling and rise applied to the
    /// text matrix, then the CTM.
    pub fn text_rendering_matrix(&self) -> Matrix {
        let params = Matrix::new(
            self.font_size * self.horizontal_scaling / 100.0,
            0.0,
            0.0,
            self.font_size,
            0.0,
            self.text_rise,
        );
        params.multiply(&self.text_matrix).multiply(&self.ctm)
    }

    /// Map a text-space point (before font size scaling) to page space.
    pub fn text_to_page(&self, x: f64, y: f64) -> Point {
        self.text_matrix.multiply(&self.ctm).transform_point(x, y)
    }
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self::new()
    }
}

/// Stack of graphics states for `q`/`Q`.
#[derive(Debug, Clone)]
pub struct GraphicsStateStack {
    current: GraphicsState,
    saved: Vec<GraphicsState>,
}

impl GraphicsStateStack {
    /// A stack holding one initial state.
    pub fn new() -> Self {
        Self::with_state(GraphicsState::new())
    }

    /// A stack starting from `state`.
    pub fn with_state(state: GraphicsState) -> Self {
        Self {
            current: state,
            saved: Vec::new(),
        }
    }

    /// The current graphics state.
    pub fn current(&self) -> &GraphicsState {
        &self.current
    }

    /// The current graphics state, mutably.
    pub fn current_mut(&mut self) -> &mut GraphicsState {
        &mut self.current
    }

    /// Save the current state (`q`).
    ///
    /// ```
    /// use pdf_ferrite::content::GraphicsStateStack;
    ///
    /// let mut stack = GraphicsStateStack::new();
    /// stack.save();
    /// stack.current_mut().line_width = 4.0;
    /// assert!(stack.restore());
    /// assert_eq!(stack.current().line_width, 1.0);
    /// assert!(!stack.restore());
    /// ```
    pub fn save(&mut self) {
        self.saved.push(self.current.clone());
    }

    /// Restore the last saved state (`Q`). Returns false, leaving the state
    /// unchanged, when nothing was saved.
    pub fn restore(&mut self) -> bool {
        match self.saved.pop() {
            Some(state) => {
                self.current = state;
                true
            },
            None => false,
        }
    }

    /// Number of saved states.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}

impl Default for GraphicsStateStack {
    fn default() -> Self {
        Self::new()
    }
}
