//! Error types for the font engine.
//!
//! This module defines all error types that can occur while parsing font
//! sources, loading definitions, registering fonts, and emitting PDF objects.

/// Result type alias for font engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during font processing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Byte reader access outside the buffer
    #[error("Read of {len} bytes at offset {offset} is out of bounds (buffer is {size} bytes)")]
    Bounds {
        /// Offset of the attempted read
        offset: usize,
        /// Number of bytes requested
        len: usize,
        /// Total buffer size
        size: usize,
    },

    /// Invalid sfnt version or head magic number
    #[error("Bad magic number: expected {expected:#010x}, found {found:#010x}")]
    BadMagic {
        /// The magic value required at this position
        expected: u32,
        /// The value actually read
        found: u32,
    },

    /// cmap subtable format outside the supported set
    #[error("Unsupported cmap subtable format: {0}")]
    UnsupportedCmapFormat(u16),

    /// OS/2 fsType forbids embedding
    #[error("Font license does not allow embedding (OS/2 fsType == 2)")]
    LicenseRestricted,

    /// Name record cannot be decoded, or the decoded name is empty
    #[error("Cannot decode font name: {0}")]
    EncodingDecode(String),

    /// Required sfnt table is missing
    #[error("Required font table is missing: {0}")]
    MissingTable(&'static str),

    /// A table is present but its contents are inconsistent
    #[error("Malformed {table} table: {reason}")]
    MalformedTable {
        /// Tag of the offending table
        table: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Font definition JSON is missing a mandatory field
    #[error("Bad font definition: missing {0}")]
    BadDefinition(&'static str),

    /// Font definition declares a type outside the allowed set
    #[error("Unknown font type: {0}")]
    UnknownFontType(String),

    /// CID Type 0 fonts cannot be used in PDF/A documents
    #[error("CID Type 0 fonts are not allowed in PDF/A mode")]
    CidFontOnPdfa,

    /// Lookup of a key that was never registered
    #[error("Font not registered: {0}")]
    MissingFont(String),

    /// Registration with an empty family name
    #[error("Font family name is empty")]
    EmptyFamily,

    /// Definition or font file could not be read
    #[error("Cannot read font resource: {0}")]
    NotReadable(String),

    /// Compression or decompression failed while embedding a subset
    #[error("Stream compression error: {0}")]
    Compress(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding error in a font definition
    #[error("Font definition JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
