//! Content stream parsing and execution.
//!
//! [`parser`] tokenizes a content stream into [`Operation`]s,
//! [`operators`] gives them types, and [`interpreter`] executes them
//! against a [`GraphicsStateStack`], reporting text, images, paths,
//! color changes and marked content to [`EventListener`]s.

pub mod colorspace;
pub mod events;
pub mod graphics_state;
pub mod interpreter;
pub mod operators;
pub mod parser;

pub use colorspace::{CalculatorProgram, ColorSpace, SampledFunction, TintFunction, TintTransform};
pub use events::{
    ColorChangeEvent, Event, EventCollector, EventListener, FillRule, ImageRenderEvent, LineRenderEvent,
    MarkedContentEvent, PaintOp, PathRenderEvent, TextRenderEvent,
};
pub use graphics_state::{ClipPath, Color, DashPattern, GraphicsState, GraphicsStateStack, Segment, Subpath};
pub use interpreter::{interpret_page, page_events, Interpreter};
pub use operators::{Operator, TextElement};
pub use parser::{parse_content_stream, ContentReader, InlineImage, Operation};
