// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![cfg_attr(test, allow(dead_code))]

//! # font_oxide
//!
//! Font embedding engine for PDF generation.
//!
//! Given font sources (AFM metric files, Type 1 printer binaries, TrueType
//! fonts, or CID Type 0 references) the engine parses structure and
//! metrics, optionally subsets TrueType fonts down to the glyphs actually
//! used, and emits the byte block of PDF indirect objects forming a complete
//! font dictionary chain (font resource, descriptor, font file, width
//! arrays, encoding differences, CIDToGIDMap, ToUnicode CMap).
//!
//! ## Pipeline
//!
//! 1. **Import**: [`fonts::afm`], [`fonts::type1`] and
//!    [`sfnt::TrueTypeParser`] turn a font source into a normalized
//!    [`fonts::FontDefinition`], persisted as JSON.
//! 2. **Load & register**: [`writer::FontRegistry`] finds definitions on the
//!    configured search path, deduplicates fonts by key and pools encoding
//!    differences and font files.
//! 3. **Select & measure**: [`writer::FontStack`] tracks the active
//!    `(font, size, spacing, stretching)` frame and caches scaled metrics.
//! 4. **Emit**: [`writer::FontRegistry::emit_fonts`] writes every
//!    font-related indirect object, running the [`sfnt::subset_font`]
//!    subsetter for subset-embedded files and delegating stream encryption
//!    to the enclosing writer.
//!
//! ## Example
//!
//! ```ignore
//! use font_oxide::{FontConfig, FontStack, IdentityEncrypt};
//!
//! # fn main() -> font_oxide::Result<()> {
//! let config = FontConfig::default().with_font_dir("fonts").with_subset(true);
//! let mut stack = FontStack::new(config, 1, 1.0);
//! stack.push("dejavusans,helvetica", "B", Some(12.0), None, None, None)?;
//! let width = stack.text_width(&"Hello".chars().map(|c| c as u32).collect::<Vec<_>>())?;
//! let block = stack.registry_mut().emit_fonts(&IdentityEncrypt)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Font sources and definitions
pub mod fonts;

// sfnt parsing and subsetting
pub mod sfnt;

// Registration, measurement, emission
pub mod writer;

// Re-exports
pub use config::FontConfig;
pub use error::{Error, Result};
pub use fonts::{FontDefinition, FontEntry, FontType};
pub use sfnt::{subset_font, ParsedFont, TrueTypeParser};
pub use writer::{FontRegistry, FontStack, IdentityEncrypt, StreamEncrypt};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
