//! sfnt table directory model.
//!
//! An sfnt file starts with a 12-byte offset table followed by 16-byte
//! directory records, one per table. The directory is decoded once into a
//! [`TtfTables`] map; table payloads are attached lazily by whoever needs to
//! keep them (the subsetter loads the tables it rewrites, the parser reads the
//! rest in place).

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use crate::error::{Error, Result};
use crate::sfnt::reader::ByteReader;

/// sfnt version for TrueType outlines.
pub const SFNT_VERSION_TRUETYPE: u32 = 0x0001_0000;

/// Magic number stored in every `head` table.
pub const HEAD_MAGIC: u32 = 0x5F0F_3CF5;

/// The whole-file checksum plus `checkSumAdjustment` must equal this value.
pub const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;

/// A 4-byte table tag.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// `head` table tag.
    pub const HEAD: Tag = Tag(*b"head");
    /// `hhea` table tag.
    pub const HHEA: Tag = Tag(*b"hhea");
    /// `hmtx` table tag.
    pub const HMTX: Tag = Tag(*b"hmtx");
    /// `maxp` table tag.
    pub const MAXP: Tag = Tag(*b"maxp");
    /// `post` table tag.
    pub const POST: Tag = Tag(*b"post");
    /// `OS/2` table tag.
    pub const OS2: Tag = Tag(*b"OS/2");
    /// `name` table tag.
    pub const NAME: Tag = Tag(*b"name");
    /// `loca` table tag.
    pub const LOCA: Tag = Tag(*b"loca");
    /// `glyf` table tag.
    pub const GLYF: Tag = Tag(*b"glyf");
    /// `cmap` table tag.
    pub const CMAP: Tag = Tag(*b"cmap");
    /// `cvt ` table tag.
    pub const CVT: Tag = Tag(*b"cvt ");
    /// `fpgm` table tag.
    pub const FPGM: Tag = Tag(*b"fpgm");
    /// `prep` table tag.
    pub const PREP: Tag = Tag(*b"prep");

    /// The tag as a big-endian integer, used for directory ordering.
    pub fn as_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// One table directory record, with an optionally attached payload.
#[derive(Debug, Clone, Default)]
pub struct SfntTable {
    /// Declared table checksum.
    pub checksum: u32,
    /// Byte offset of the table from the start of the file.
    pub offset: u32,
    /// Table length in bytes (without padding).
    pub length: u32,
    /// Table payload, attached when the table will be rewritten.
    pub data: Option<Vec<u8>>,
}

/// The decoded table directory of an sfnt file.
#[derive(Debug, Clone, Default)]
pub struct TtfTables {
    map: BTreeMap<Tag, SfntTable>,
}

impl TtfTables {
    /// Decode the offset table and table directory.
    ///
    /// Rejects any sfnt version other than `0x00010000`: OpenType/CFF
    /// (`OTTO`) and TrueType collections are not TrueType outline fonts.
    pub fn parse(reader: &ByteReader<'_>) -> Result<Self> {
        let version = reader.u32(0)?;
        if version != SFNT_VERSION_TRUETYPE {
            return Err(Error::BadMagic {
                expected: SFNT_VERSION_TRUETYPE,
                found: version,
            });
        }
        let num_tables = reader.u16(4)? as usize;
        // searchRange, entrySelector and rangeShift are redundant; skip them.
        let mut map = BTreeMap::new();
        for i in 0..num_tables {
            let rec = 12 + i * 16;
            let tag = Tag(reader.tag(rec)?);
            map.insert(
                tag,
                SfntTable {
                    checksum: reader.u32(rec + 4)?,
                    offset: reader.u32(rec + 8)?,
                    length: reader.u32(rec + 12)?,
                    data: None,
                },
            );
        }
        Ok(Self { map })
    }

    /// Number of tables in the directory.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Look up a table record.
    pub fn get(&self, tag: Tag) -> Option<&SfntTable> {
        self.map.get(&tag)
    }

    /// Look up a table record mutably.
    pub fn get_mut(&mut self, tag: Tag) -> Option<&mut SfntTable> {
        self.map.get_mut(&tag)
    }

    /// Look up a table required by the caller.
    pub fn require(&self, tag: Tag, name: &'static str) -> Result<&SfntTable> {
        self.map.get(&tag).ok_or(Error::MissingTable(name))
    }

    /// Insert or replace a table record.
    pub fn insert(&mut self, tag: Tag, table: SfntTable) {
        self.map.insert(tag, table);
    }

    /// Drop every table whose tag is not in `keep`.
    pub fn retain_tags(&mut self, keep: &[Tag]) {
        self.map.retain(|tag, _| keep.contains(tag));
    }

    /// Iterate the directory in tag order.
    pub fn iter(&self) -> btree_map::Iter<'_, Tag, SfntTable> {
        self.map.iter()
    }

    /// Iterate the directory mutably in tag order.
    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, Tag, SfntTable> {
        self.map.iter_mut()
    }
}

/// Checksum of a table: the wrapping sum of its big-endian u32 words, with
/// the trailing partial word zero-padded.
pub fn table_checksum(data: &[u8]) -> u32 {
    let mut sum = 0u32;
    let mut chunks = data.chunks_exact(4);
    for word in &mut chunks {
        sum = sum.wrapping_add(u32::from_be_bytes([word[0], word[1], word[2], word[3]]));
    }
    let rem = chunks.remainder();
    if !rem.is_empty() {
        let mut last = [0u8; 4];
        last[..rem.len()].copy_from_slice(rem);
        sum = sum.wrapping_add(u32::from_be_bytes(last));
    }
    sum
}
