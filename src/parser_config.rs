//! Parser configuration for controlling lenient/strict reading.

/// Parser options for controlling error handling and recovery behavior.
///
/// These options trade strict PDF compliance for broader compatibility with
/// malformed or non-standard files.
///
/// # Example
///
/// ```
/// use pdf_ferrite::parser_config::ParserOptions;
///
/// // Strict mode - fail on first error
/// let strict = ParserOptions::strict();
///
/// // Lenient mode (default) - recover where possible and warn
/// let lenient = ParserOptions::lenient();
///
/// // Custom configuration
/// let custom = ParserOptions {
///     max_decompressed_size: 16 * 1024 * 1024,
///     ..ParserOptions::lenient()
/// };
/// assert!(!custom.strict);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParserOptions {
    /// Fail on the first error instead of recovering.
    ///
    /// In strict mode a broken cross-reference table is fatal (no linear
    /// rebuild), bare-CR stream headers are rejected and keys without values
    /// are syntax errors.
    pub strict: bool,

    /// Maximum object nesting depth.
    ///
    /// Prevents stack overflow from deeply nested arrays/dictionaries.
    /// ISO 32000-1:2008, Annex C recommends no more than 100 levels.
    pub max_nesting: usize,

    /// Allow objects without the `endobj` keyword.
    pub allow_missing_endobj: bool,

    /// Allow streams whose `/Length` disagrees with the `endstream` position.
    ///
    /// When true the scanned position wins and a warning is recorded; when
    /// false the mismatch is a syntax error.
    pub allow_malformed_streams: bool,

    /// Maximum decompression ratio (decoded:encoded).
    ///
    /// Default: 100. Set to 0 to disable the check.
    pub max_decompression_ratio: u32,

    /// Maximum decoded stream size in bytes.
    ///
    /// Default: 100 MB. Set to 0 to disable the check.
    pub max_decompressed_size: usize,

    /// Maximum depth of nested indirect-object resolution.
    pub max_recursion_depth: u32,

    /// Number of warnings kept in the document's warning log.
    pub max_warnings: usize,
}

impl Default for ParserOptions {
    /// Default configuration: lenient mode
    fn default() -> Self {
        Self::lenient()
    }
}

impl ParserOptions {
    /// Strict mode: fail on any parsing error.
    pub fn strict() -> Self {
        Self {
            strict: true,
            max_nesting: 100,
            allow_missing_endobj: false,
            allow_malformed_streams: false,
            max_decompression_ratio: 100,
            max_decompressed_size: 100 * 1024 * 1024, // 100 MB
            max_recursion_depth: 100,
            max_warnings: 1000,
        }
    }

    /// Lenient mode: recover from common producer mistakes.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            max_nesting: 100,
            allow_missing_endobj: true,
            allow_malformed_streams: true,
            max_decompression_ratio: 100,
            max_decompressed_size: 100 * 1024 * 1024, // 100 MB
            max_recursion_depth: 100,
            max_warnings: 1000,
        }
    }

    /// Very lenient mode: maximum compatibility for heavily damaged files.
    pub fn very_lenient() -> Self {
        Self {
            max_nesting: 200,
            max_decompression_ratio: 0,
            max_decompressed_size: 200 * 1024 * 1024, // 200 MB
            max_recursion_depth: 200,
            max_warnings: 10_000,
            ..Self::lenient()
        }
    }

    /// True if the cross-reference table may be rebuilt by scanning the file.
    pub fn allows_xref_recovery(&self) -> bool {
        !self.strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_mode() {
        let opts = ParserOptions::strict();
        assert!(opts.strict);
        assert!(!opts.allow_missing_endobj);
        assert!(!opts.allow_malformed_streams);
        assert!(!opts.allows_xref_recovery());
    }

    #[test]
    fn test_lenient_mode_is_default() {
        let opts = ParserOptions::default();
        assert_eq!(opts, ParserOptions::lenient());
        assert!(opts.allow_missing_endobj);
        assert!(opts.allows_xref_recovery());
    }

    #[test]
    fn test_very_lenient_relaxes_limits() {
        let opts = ParserOptions::very_lenient();
        assert!(!opts.strict);
        assert_eq!(opts.max_decompression_ratio, 0);
        assert!(opts.max_nesting > ParserOptions::lenient().max_nesting);
    }
}
