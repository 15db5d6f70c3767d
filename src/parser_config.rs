//! Parser configuration for lenient and strict loading.

/// Options controlling error tolerance and resource limits while loading.
///
/// # Example
///
/// ```
/// use pdf_handler::parser_config::ParserOptions;
///
/// // Reject anything that needs recovery
/// let strict = ParserOptions::strict();
/// assert!(strict.strict);
///
/// // Custom limits on top of the lenient defaults
/// let custom = ParserOptions {
///     max_decompressed_size: 10 * 1024 * 1024,
///     ..ParserOptions::default()
/// };
/// assert!(!custom.strict);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Fail instead of attempting recovery.
    ///
    /// In strict mode a missing header, a wrong stream `/Length` or a broken
    /// cross-reference table is an error. In lenient mode the parser warns and
    /// falls back to scanning.
    pub strict: bool,

    /// Maximum nesting depth of arrays and dictionaries.
    ///
    /// PDF Spec: ISO 32000-1:2008, Annex C - Implementation Limits
    pub max_nesting: usize,

    /// Maximum depth when walking the object graph (page tree, form XObjects,
    /// deep copies).
    pub max_recursion_depth: u32,

    /// Maximum decompressed-to-compressed size ratio per stream. 0 disables the check.
    pub max_decompression_ratio: u32,

    /// Maximum decompressed stream size in bytes. 0 disables the check.
    pub max_decompressed_size: usize,

    /// Accept streams whose `/Length` is missing or wrong by scanning for `endstream`.
    pub allow_malformed_streams: bool,

    /// Maximum number of `/Prev` sections followed in the cross-reference chain.
    pub max_xref_chain: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self::lenient()
    }
}

impl ParserOptions {
    /// Strict mode: fail on any structural error.
    pub fn strict() -> Self {
        Self {
            strict: true,
            allow_malformed_streams: false,
            ..Self::lenient()
        }
    }

    /// Lenient mode: recover from damage wherever possible.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            max_nesting: 100,
            max_recursion_depth: 100,
            max_decompression_ratio: 1000,
            max_decompressed_size: 256 * 1024 * 1024,
            allow_malformed_streams: true,
            max_xref_chain: 100,
        }
    }
}
