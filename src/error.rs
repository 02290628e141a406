//! Error types for the PDF engine.
//!
//! Every fallible operation returns [`Result`]. Non-fatal conditions that the
//! engine recovers from are reported through the [`Warning`] side channel
//! instead of failing the operation.

use std::fmt;

/// Result type alias for PDF engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading, interpreting, or writing a PDF.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Malformed token or object at a byte offset
    #[error("Syntax error at byte {offset}: {reason}")]
    Syntax {
        /// Byte offset where the error occurred
        offset: usize,
        /// Reason for the failure
        reason: String,
    },

    /// Input ended in the middle of a token or object
    #[error("End of input reached unexpectedly at byte {offset}")]
    UnexpectedEof {
        /// Byte offset where more input was expected
        offset: usize,
    },

    /// Cross-reference data is unusable
    #[error("Invalid cross-reference data: {0}")]
    InvalidXref(String),

    /// Referenced object not present in the merged cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Any other failure to resolve an indirect object
    #[error("Failed to resolve object: {0}")]
    Resolve(String),

    /// Object has the wrong kind for the requested access
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object kind
        expected: String,
        /// Actual object kind found
        found: String,
    },

    /// A stream filter failed while encoding or decoding
    #[error("{filter} failed at byte {offset}: {reason}")]
    Filter {
        /// Filter name, e.g. "FlateDecode"
        filter: String,
        /// Offset within the stream data where the failure was detected
        offset: usize,
        /// Reason for failure
        reason: String,
    },

    /// Filter name is not known to the pipeline
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Decoded output exceeded configured limits
    #[error("Decompression limit exceeded: {0}")]
    DecompressionLimit(String),

    /// An injected image codec reported a failure
    #[error("Image codec error: {0}")]
    Codec(String),

    /// Operator invocation inconsistent with the current graphics state
    #[error("Operator '{operator}' failed: {reason}")]
    Interpreter {
        /// Operator name
        operator: String,
        /// Reason for failure
        reason: String,
    },

    /// A character code has no Unicode mapping
    #[error("No Unicode mapping for code {code:#x} in font {font}")]
    Encoding {
        /// Character code
        code: u32,
        /// Font base name
        font: String,
    },

    /// Recursion depth limit exceeded
    #[error("Recursion depth limit exceeded (max: {0})")]
    RecursionLimitExceeded(u32),

    /// IO error from the byte source or sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Syntax`] error.
    pub fn syntax(offset: usize, reason: impl Into<String>) -> Self {
        Error::Syntax {
            offset,
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`Error::Filter`] error.
    pub fn filter(filter: &str, offset: usize, reason: impl Into<String>) -> Self {
        Error::Filter {
            filter: filter.to_string(),
            offset,
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`Error::Interpreter`] error.
    pub fn interpreter(operator: &str, reason: impl Into<String>) -> Self {
        Error::Interpreter {
            operator: operator.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors raised by a stream filter.
    pub fn is_filter_error(&self) -> bool {
        matches!(
            self,
            Error::Filter { .. } | Error::UnsupportedFilter(_) | Error::DecompressionLimit(_)
        )
    }
}

/// Category of a non-fatal condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// The cross-reference table was rebuilt by scanning the file
    RecoveredXref,
    /// A stream's declared /Length disagreed with the `endstream` position
    LengthMismatch,
    /// Unknown content operator outside a compatibility section
    UnknownOperator,
    /// A character code fell back to a default mapping
    EncodingFallback,
    /// `q`/`Q` operators did not balance
    UnbalancedSaveRestore,
    /// An interpreter error inside `BX`/`EX` was downgraded
    CompatibilityDowngrade,
    /// An indirect object depended on itself during resolution
    ResolutionCycle,
    /// A filter failure truncated an image stream
    FilterTruncated,
    /// The document is encrypted and its contents are returned as stored
    Encrypted,
    /// A function object could not be evaluated and was treated as identity
    UnsupportedFunction,
    /// Anything else worth reporting
    Other,
}

/// A non-fatal condition recovered from while processing a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    /// Category
    pub kind: WarningKind,
    /// Byte offset in the file, when known
    pub offset: Option<u64>,
    /// Human-readable description
    pub message: String,
}

impl Warning {
    /// Create a warning without a file offset.
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            offset: None,
            message: message.into(),
        }
    }

    /// Attach a byte offset.
    pub fn at(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{:?} at byte {}: {}", self.kind, offset, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

/// Receiver for warnings emitted while reading or interpreting a document.
pub trait WarningSink {
    /// Called once per warning, in the order the conditions were detected.
    fn warn(&mut self, warning: &Warning);
}

impl<F: FnMut(&Warning)> WarningSink for F {
    fn warn(&mut self, warning: &Warning) {
        self(warning)
    }
}
