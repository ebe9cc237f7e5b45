//! Font sources, metrics and definitions.
//!
//! This module covers everything up to registration: the AFM and PFB
//! importers, the central [`FontEntry`] data model, and the persisted JSON
//! definition format with its loader.

pub mod afm;
pub mod definition;
pub mod entry;
pub mod type1;

pub use definition::{core_font_name, FontDefinition};
pub use entry::{CidInfo, FontDescriptor, FontEntry, FontType, StyleFlags};
pub use type1::{parse_pfb, Type1Font};
