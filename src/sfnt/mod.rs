//! sfnt container parsing and subsetting.
//!
//! Big-endian table decoding for the TrueType flavor of the sfnt format,
//! cmap traversal, and production of standalone subset fonts with
//! recomputed checksums.

pub mod cmap;
pub mod parser;
pub mod reader;
pub mod subset;
pub mod tables;

pub use parser::{ParsedFont, TrueTypeParser};
pub use reader::ByteReader;
pub use subset::subset_font;
pub use tables::{table_checksum, SfntTable, Tag, TtfTables};
