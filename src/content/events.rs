//! Events emitted by the content stream interpreter.
//!
//! Listeners implement [`EventListener`] and override only the callbacks
//! they care about. Events arrive synchronously in content stream order;
//! a listener sees immutable snapshots and cannot affect interpretation.

use bytes::Bytes;

use crate::content::graphics_state::{Color, DashPattern, GraphicsState, Subpath};
use crate::geometry::{Matrix, Point, Rect};
use crate::object::{Dictionary, Name, ObjectRef};

/// One text-showing operator (`Tj`, `TJ`, `'` or `"`).
#[derive(Debug, Clone)]
pub struct TextRenderEvent {
    /// Graphics state when the operator began
    pub state: GraphicsState,
    /// Bytes shown, concatenated across `TJ` strings
    pub raw_bytes: Vec<u8>,
    /// Unicode text
    pub unicode: String,
    /// Start and end of the baseline in page space
    pub baseline: (Point, Point),
    /// Marked content identifier of the innermost `BDC` carrying `/MCID`
    pub mcid: Option<i64>,
    /// Operator offset in the content stream
    pub offset: usize,
}

impl TextRenderEvent {
    /// Baseline length in page space.
    pub fn width(&self) -> f64 {
        let (start, end) = self.baseline;
        (end.x - start.x).hypot(end.y - start.y)
    }
}

/// An image painted by `Do` or an inline image.
#[derive(Debug, Clone)]
pub struct ImageRenderEvent {
    /// CTM mapping the unit square to the image's placement
    pub ctm: Matrix,
    /// XObject resource name; `None` for inline images
    pub name: Option<Name>,
    /// Image XObject reference, when indirect
    pub reference: Option<ObjectRef>,
    /// Image dictionary (inline abbreviations expanded)
    pub dict: Dictionary,
    /// True for `BI … ID … EI`
    pub inline: bool,
    /// Raw data of inline images
    pub data: Option<Bytes>,
    /// Marked content identifier of the innermost `BDC` carrying `/MCID`
    pub mcid: Option<i64>,
}

impl ImageRenderEvent {
    /// Width in samples.
    pub fn width(&self) -> Option<i64> {
        self.dict.get_integer("Width")
    }

    /// Height in samples.
    pub fn height(&self) -> Option<i64> {
        self.dict.get_integer("Height")
    }

    /// Page-space bounding box of the placed unit square.
    pub fn bounds(&self) -> Rect {
        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        Rect::bounding(corners.iter().map(|&(x, y)| self.ctm.transform_point(x, y))).unwrap_or_default()
    }
}

/// One stroked segment.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRenderEvent {
    /// Start in page space
    pub start: Point,
    /// End in page space
    pub end: Point,
    /// Bézier control points, for curve segments
    pub controls: Option<(Point, Point)>,
    /// Line width in user space
    pub line_width: f64,
    /// Stroking color
    pub color: Color,
    /// Dash pattern
    pub dash: DashPattern,
}

/// How a path is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintOp {
    /// Filled only
    Fill,
    /// Filled and stroked
    FillAndStroke,
}

/// Winding rule for fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    /// Nonzero winding number
    NonZero,
    /// Even-odd
    EvenOdd,
}

/// A filled path.
#[derive(Debug, Clone)]
pub struct PathRenderEvent {
    /// Subpaths in page space
    pub subpaths: Vec<Subpath>,
    /// Paint operation
    pub paint: PaintOp,
    /// Fill rule
    pub fill_rule: FillRule,
    /// Graphics state at painting time
    pub state: GraphicsState,
}

impl PathRenderEvent {
    /// Page-space bounding box of all points, control points included.
    pub fn bounds(&self) -> Option<Rect> {
        use crate::content::graphics_state::Segment;
        let points = self.subpaths.iter().flat_map(|sp| {
            std::iter::once(sp.start).chain(sp.segments.iter().flat_map(|s| match *s {
                Segment::Line(p) => vec![p],
                Segment::Curve(a, b, c) => vec![a, b, c],
            }))
        });
        Rect::bounding(points)
    }
}

/// A color operator took effect.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorChangeEvent {
    /// True for stroking color, false for non-stroking
    pub stroke: bool,
    /// New color with its resolved space
    pub color: Color,
    /// Components in the alternate space, for Separation and DeviceN
    pub alternate: Option<Vec<f64>>,
}

/// Marked content boundaries and points.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkedContentEvent {
    /// `BMC` or `BDC`
    Begin {
        /// Tag
        tag: Name,
        /// Property list, resolved through `/Properties` when named
        properties: Option<Dictionary>,
    },
    /// `EMC`
    End {
        /// Tag of the sequence that ended
        tag: Name,
    },
    /// `MP` or `DP`
    Point {
        /// Tag
        tag: Name,
        /// Property list
        properties: Option<Dictionary>,
    },
}

/// Any interpreter event.
#[derive(Debug, Clone)]
pub enum Event {
    /// Text was shown
    Text(TextRenderEvent),
    /// An image was painted
    Image(ImageRenderEvent),
    /// A segment was stroked
    Line(LineRenderEvent),
    /// A path was filled
    Path(PathRenderEvent),
    /// A color changed
    Color(ColorChangeEvent),
    /// Marked content
    MarkedContent(MarkedContentEvent),
}

impl Event {
    /// Deliver this event to the matching listener callback.
    pub fn dispatch(&self, listener: &mut dyn EventListener) {
        match self {
            Event::Text(e) => listener.on_text(e),
            Event::Image(e) => listener.on_image(e),
            Event::Line(e) => listener.on_line(e),
            Event::Path(e) => listener.on_path(e),
            Event::Color(e) => listener.on_color_change(e),
            Event::MarkedContent(e) => listener.on_marked_content(e),
        }
    }

    /// The text event, if this is one.
    pub fn as_text(&self) -> Option<&TextRenderEvent> {
        match self {
            Event::Text(e) => Some(e),
            _ => None,
        }
    }

    /// The image event, if this is one.
    pub fn as_image(&self) -> Option<&ImageRenderEvent> {
        match self {
            Event::Image(e) => Some(e),
            _ => None,
        }
    }
}

/// Callback interface for interpreter events.
///
/// All methods default to no-ops.
pub trait EventListener {
    /// Text was shown.
    fn on_text(&mut self, _event: &TextRenderEvent) {}

    /// An image was painted.
    fn on_image(&mut self, _event: &ImageRenderEvent) {}

    /// A path segment was stroked.
    fn on_line(&mut self, _event: &LineRenderEvent) {}

    /// A path was filled.
    fn on_path(&mut self, _event: &PathRenderEvent) {}

    /// A color operator took effect.
    fn on_color_change(&mut self, _event: &ColorChangeEvent) {}

    /// Marked content began, ended or was marked at a point.
    fn on_marked_content(&mut self, _event: &MarkedContentEvent) {}
}

/// Listener that records every event in order.
#[derive(Debug, Default, Clone)]
pub struct EventCollector {
    /// Events received so far
    pub events: Vec<Event>,
}

impl EventCollector {
    /// An empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Text events only.
    pub fn text_events(&self) -> impl Iterator<Item = &TextRenderEvent> {
        self.events.iter().filter_map(Event::as_text)
    }

    /// Concatenated Unicode of all text events.
    pub fn text(&self) -> String {
        self.text_events().map(|e| e.unicode.as_str()).collect()
    }
}

impl EventListener for EventCollector {
    fn on_text(&mut self, event: &TextRenderEvent) {
        self.events.push(Event::Text(event.clone()));
    }

    fn on_image(&mut self, event: &ImageRenderEvent) {
        self.events.push(Event::Image(event.clone()));
    }

    fn on_line(&mut self, event: &LineRenderEvent) {
        self.events.push(Event::Line(event.clone()));
    }

    fn on_path(&mut self, event: &PathRenderEvent) {
        self.events.push(Event::Path(event.clone()));
    }

    fn on_color_change(&mut self, event: &ColorChangeEvent) {
        self.events.push(Event::Color(event.clone()));
    }

    fn on_marked_content(&mut self, event: &MarkedContentEvent) {
        self.events.push(Event::MarkedContent(event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TextOnly(Vec<String>);

    impl EventListener for TextOnly {
        fn on_text(&mut self, event: &TextRenderEvent) {
            self.0.push(event.unicode.clone());
        }
    }

    fn text_event(s: &str) -> Event {
        Event::Text(TextRenderEvent {
            state: GraphicsState::new(),
            raw_bytes: s.as_bytes().to_vec(),
            unicode: s.to_string(),
            baseline: (Point::new(0.0, 0.0), Point::new(3.0, 4.0)),
            mcid: None,
            offset: 0,
        })
    }

    #[test]
    fn test_dispatch_reaches_only_overridden_callbacks() {
        let mut listener = TextOnly(Vec::new());
        text_event("Hi").dispatch(&mut listener);
        Event::MarkedContent(MarkedContentEvent::End { tag: Name::from("P") }).dispatch(&mut listener);
        assert_eq!(listener.0, vec!["Hi".to_string()]);
    }

    #[test]
    fn test_collector_text() {
        let mut collector = EventCollector::new();
        text_event("Hel").dispatch(&mut collector);
        text_event("lo").dispatch(&mut collector);
        assert_eq!(collector.text(), "Hello");
        assert_eq!(collector.text_events().next().map(|e| e.width()), Some(5.0));
    }

    #[test]
    fn test_image_bounds() {
        let event = ImageRenderEvent {
            ctm: Matrix::new(200.0, 0.0, 0.0, 100.0, 50.0, 60.0),
            name: Some(Name::from("Im0")),
            reference: None,
            dict: Dictionary::new(),
            inline: false,
            data: None,
            mcid: None,
        };
        assert_eq!(event.bounds(), Rect::new(50.0, 60.0, 200.0, 100.0));
    }
}
