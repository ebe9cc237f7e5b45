//! TrueType font parser for PDF embedding.
//!
//! Decodes the sfnt tables needed to build a PDF FontDescriptor and width
//! arrays: `head`, `hhea`, `hmtx`, `maxp`, `post`, `OS/2`, `name`, `loca`,
//! `glyf` and `cmap`. All FWord metrics are normalized to the PDF text-space
//! convention of 1000 units per em before they are stored, so downstream code
//! never sees raw design units.
//!
//! Parsing is strictly phased: the table directory is decoded first, then
//! `head` (which fixes the scale factor and the `loca` format), then the
//! remaining tables, and finally the character map and per-character widths
//! which depend on everything before them.

use std::collections::BTreeMap;

use crate::config::FontConfig;
use crate::error::{Error, Result};
use crate::fonts::entry::FontType;
use crate::sfnt::cmap::{self, GlyphMap};
use crate::sfnt::reader::ByteReader;
use crate::sfnt::tables::{Tag, TtfTables, HEAD_MAGIC};

/// Default FontDescriptor flags for a non-symbolic text font.
const FLAG_NONSYMBOLIC: u32 = 32;
/// FontDescriptor flag for fixed-pitch fonts.
const FLAG_FIXED_PITCH: u32 = 1;
/// FontDescriptor flag for italic fonts.
const FLAG_ITALIC: u32 = 64;

/// One cmap encoding record: `(platformID, encodingID, subtable offset)`.
#[derive(Debug, Clone, Copy)]
pub struct EncodingRecord {
    /// Platform identifier.
    pub platform_id: u16,
    /// Platform-specific encoding identifier.
    pub encoding_id: u16,
    /// Subtable offset relative to the start of the cmap table.
    pub offset: u32,
}

/// Normalized result of parsing a TrueType font.
///
/// Metric fields are in 1/1000 em units. The raw table directory, the
/// glyph-offset index and the glyph count are retained for the subsetter.
#[derive(Debug, Clone)]
pub struct ParsedFont {
    /// Sanitized PostScript name (nameID 6).
    pub name: String,
    /// Resolved font type, after the 256-mapping downgrade rule.
    pub font_type: FontType,
    /// Design units per em, guaranteed to be in `16..=16384`.
    pub units_per_em: u16,
    /// Font bounding box `[xMin, yMin, xMax, yMax]`.
    pub bbox: [i32; 4],
    /// FontDescriptor flags bitset.
    pub flags: u32,
    /// Typographic ascender.
    pub ascent: i32,
    /// Typographic descender (negative).
    pub descent: i32,
    /// Line gap.
    pub leading: i32,
    /// Height of capital letters, measured from the `H` glyph when present.
    pub cap_height: i32,
    /// x-height, measured from the `x` glyph when present.
    pub x_height: i32,
    /// Italic angle in degrees.
    pub italic_angle: i32,
    /// Estimated vertical stem width.
    pub stem_v: i32,
    /// Estimated horizontal stem width.
    pub stem_h: i32,
    /// Average advance width.
    pub avg_width: i32,
    /// Maximum advance width.
    pub max_width: i32,
    /// Advance width of glyph 0, used for unmapped characters.
    pub missing_width: i32,
    /// Underline position.
    pub underline_position: i32,
    /// Underline thickness.
    pub underline_thickness: i32,
    /// Per-character advance widths.
    pub cw: BTreeMap<u32, i32>,
    /// Per-character glyph bounding boxes.
    pub cbbox: BTreeMap<u32, [i32; 4]>,
    /// Character code to glyph ID map.
    pub ctg: GlyphMap,
    /// Table directory of the source font.
    pub tables: TtfTables,
    /// Whether `loca` uses the short (u16, halved) format.
    pub short_loca: bool,
    /// Glyph index to `glyf` byte offset. Glyphs without an outline are
    /// absent.
    pub index_to_loc: BTreeMap<u32, u32>,
    /// Number of `loca` entries read (numGlyphs + 1 in the file).
    pub tot_num_glyphs: u32,
}

/// TrueType font parser.
pub struct TrueTypeParser<'a> {
    reader: ByteReader<'a>,
}

impl<'a> TrueTypeParser<'a> {
    /// Create a parser over raw font bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: ByteReader::new(data),
        }
    }

    /// Parse the font, selecting the cmap subtable named by `config` and
    /// importing as Unicode or byte-oriented per `config.unicode`.
    pub fn parse(&self, config: &FontConfig) -> Result<ParsedFont> {
        let tables = TtfTables::parse(&self.reader)?;
        log::debug!("sfnt directory: {} tables", tables.len());

        let mut flags = FLAG_NONSYMBOLIC;

        // head: scale factor, bbox, style bits, loca format
        let head = tables.require(Tag::HEAD, "head")?;
        let head_offset = head.offset as usize;
        let magic = self.reader.u32(head_offset + 12)?;
        if magic != HEAD_MAGIC {
            return Err(Error::BadMagic {
                expected: HEAD_MAGIC,
                found: magic,
            });
        }
        let units_per_em = self.reader.u16(head_offset + 18)?;
        if !(16..=16384).contains(&units_per_em) {
            return Err(Error::MalformedTable {
                table: "head",
                reason: format!("unitsPerEm {} outside 16..=16384", units_per_em),
            });
        }
        let urk = 1000.0 / units_per_em as f64;
        let scale = |v: i16| -> i32 { (v as f64 * urk).round() as i32 };
        let uscale = |v: u16| -> i32 { (v as f64 * urk).round() as i32 };

        let bbox = [
            scale(self.reader.fword(head_offset + 36)?),
            scale(self.reader.fword(head_offset + 38)?),
            scale(self.reader.fword(head_offset + 40)?),
            scale(self.reader.fword(head_offset + 42)?),
        ];
        let mac_style = self.reader.u16(head_offset + 44)?;
        if mac_style & 2 != 0 {
            flags |= FLAG_ITALIC;
        }
        let short_loca = self.reader.u16(head_offset + 50)? == 0;

        // loca: glyph offsets; an offset equal to its predecessor means the
        // preceding glyph has no outline and is dropped from the index
        let loca = tables.require(Tag::LOCA, "loca")?;
        let entry_size = if short_loca { 2 } else { 4 };
        let tot_num_glyphs = loca.length / entry_size;
        let mut index_to_loc: BTreeMap<u32, u32> = BTreeMap::new();
        let mut prev: Option<u32> = None;
        for i in 0..tot_num_glyphs {
            let pos = (loca.offset + i * entry_size) as usize;
            let off = if short_loca {
                self.reader.u16(pos)? as u32 * 2
            } else {
                self.reader.u32(pos)?
            };
            if prev == Some(off) && i > 0 {
                index_to_loc.remove(&(i - 1));
            }
            index_to_loc.insert(i, off);
            prev = Some(off);
        }

        // cmap directory
        let cmap_table = tables.require(Tag::CMAP, "cmap")?;
        let cmap_offset = cmap_table.offset as usize;
        let num_subtables = self.reader.u16(cmap_offset + 2)? as usize;
        let mut encoding_records = Vec::with_capacity(num_subtables);
        for i in 0..num_subtables {
            let rec = cmap_offset + 4 + i * 8;
            encoding_records.push(EncodingRecord {
                platform_id: self.reader.u16(rec)?,
                encoding_id: self.reader.u16(rec + 2)?,
                offset: self.reader.u32(rec + 4)?,
            });
        }

        // OS/2: average width, stem estimates, embedding license
        let mut avg_width = 0;
        let mut stem_v = 70;
        let mut stem_h = 30;
        if let Some(os2) = tables.get(Tag::OS2) {
            let os2_offset = os2.offset as usize;
            avg_width = scale(self.reader.fword(os2_offset + 2)?);
            let weight = self.reader.u16(os2_offset + 4)? as f64;
            stem_v = (70.0 * weight / 400.0).round() as i32;
            stem_h = (30.0 * weight / 400.0).round() as i32;
            let fs_type = self.reader.u16(os2_offset + 8)?;
            if fs_type == 2 {
                return Err(Error::LicenseRestricted);
            }
        }

        // name: PostScript name (nameID 6)
        let name = self.read_postscript_name(&tables)?;

        // post: italic angle, underline metrics, pitch
        let post = tables.require(Tag::POST, "post")?;
        let post_offset = post.offset as usize;
        let italic_angle = self.reader.fixed(post_offset + 4)?.round() as i32;
        let underline_position = scale(self.reader.fword(post_offset + 8)?);
        let underline_thickness = scale(self.reader.fword(post_offset + 10)?);
        if self.reader.u32(post_offset + 12)? != 0 {
            flags |= FLAG_FIXED_PITCH;
        }

        // hhea: vertical metrics and the hmtx entry count
        let hhea = tables.require(Tag::HHEA, "hhea")?;
        let hhea_offset = hhea.offset as usize;
        let ascent = scale(self.reader.fword(hhea_offset + 4)?);
        let descent = scale(self.reader.fword(hhea_offset + 6)?);
        let leading = scale(self.reader.fword(hhea_offset + 8)?);
        let max_width = uscale(self.reader.ufword(hhea_offset + 10)?);
        let num_h_metrics = self.reader.u16(hhea_offset + 34)? as u32;

        // maxp: glyph count
        let maxp = tables.require(Tag::MAXP, "maxp")?;
        let num_glyphs = self.reader.u16(maxp.offset as usize + 4)? as u32;

        // cmap: decode every subtable matching the configured pair
        let mut ctg = GlyphMap::new();
        for rec in &encoding_records {
            if rec.platform_id == config.platform_id && rec.encoding_id == config.encoding_id {
                cmap::decode_subtable(&self.reader, cmap_offset + rec.offset as usize, &mut ctg)?;
            }
        }
        ctg.entry(0).or_insert(0);

        let mut font_type = if config.unicode {
            FontType::TrueTypeUnicode
        } else {
            FontType::TrueType
        };
        if font_type == FontType::TrueTypeUnicode && ctg.len() == 256 {
            log::debug!("cmap covers exactly 256 codes, downgrading to byte-oriented TrueType");
            font_type = FontType::TrueType;
        }

        // heights: prefer measuring the x and H glyphs over hhea-derived
        // defaults
        let glyf = tables.require(Tag::GLYF, "glyf")?;
        let mut x_height = ascent + descent;
        if let Some(h) = self.glyph_height(glyf.offset, &index_to_loc, &ctg, 'x' as u32, urk)? {
            x_height = h;
        }
        let mut cap_height = ascent;
        if let Some(h) = self.glyph_height(glyf.offset, &index_to_loc, &ctg, 'H' as u32, urk)? {
            cap_height = h;
        }

        // widths: hmtx advances, padded with the last entry up to numGlyphs
        let hmtx = tables.require(Tag::HMTX, "hmtx")?;
        let mut widths = Vec::with_capacity(num_glyphs as usize);
        for i in 0..num_h_metrics.min(num_glyphs) {
            let advance = self.reader.ufword((hmtx.offset + i * 4) as usize)?;
            widths.push(uscale(advance));
        }
        if widths.is_empty() {
            return Err(Error::MalformedTable {
                table: "hmtx",
                reason: "no horizontal metrics".to_string(),
            });
        }
        if (widths.len() as u32) < num_glyphs {
            log::warn!(
                "hmtx has {} metrics for {} glyphs, padding with the last width",
                widths.len(),
                num_glyphs
            );
            let last = *widths.last().expect("checked non-empty");
            widths.resize(num_glyphs as usize, last);
        }
        let missing_width = widths[0];

        let mut cw = BTreeMap::new();
        let mut cbbox = BTreeMap::new();
        for (&cid, &gid) in &ctg {
            if cid > 0xFFFF {
                continue;
            }
            if let Some(&w) = widths.get(gid as usize) {
                cw.insert(cid, w);
            }
            if index_to_loc.contains_key(&gid) {
                let g = (glyf.offset + index_to_loc[&gid]) as usize;
                cbbox.insert(
                    cid,
                    [
                        scale(self.reader.fword(g + 2)?),
                        scale(self.reader.fword(g + 4)?),
                        scale(self.reader.fword(g + 6)?),
                        scale(self.reader.fword(g + 8)?),
                    ],
                );
            }
        }

        log::debug!(
            "parsed {}: {} glyphs, {} mapped codes, type {:?}",
            name,
            num_glyphs,
            ctg.len(),
            font_type
        );

        Ok(ParsedFont {
            name,
            font_type,
            units_per_em,
            bbox,
            flags,
            ascent,
            descent,
            leading,
            cap_height,
            x_height,
            italic_angle,
            stem_v,
            stem_h,
            avg_width,
            max_width,
            missing_width,
            underline_position,
            underline_thickness,
            cw,
            cbbox,
            ctg,
            tables,
            short_loca,
            index_to_loc,
            tot_num_glyphs,
        })
    }

    /// Height of the glyph mapped by `code`, from its header bbox, or `None`
    /// when the character is unmapped or has no outline.
    fn glyph_height(
        &self,
        glyf_offset: u32,
        index_to_loc: &BTreeMap<u32, u32>,
        ctg: &GlyphMap,
        code: u32,
        urk: f64,
    ) -> Result<Option<i32>> {
        let Some(&gid) = ctg.get(&code) else {
            return Ok(None);
        };
        let Some(&loc) = index_to_loc.get(&gid) else {
            return Ok(None);
        };
        let offset = (glyf_offset + loc) as usize;
        let y_min = self.reader.fword(offset + 4)?;
        let y_max = self.reader.fword(offset + 8)?;
        Ok(Some(((y_max - y_min) as f64 * urk).round() as i32))
    }

    /// Find and decode the first PostScript name record (nameID 6).
    fn read_postscript_name(&self, tables: &TtfTables) -> Result<String> {
        let name_table = tables.require(Tag::NAME, "name")?;
        let base = name_table.offset as usize;
        let count = self.reader.u16(base + 2)? as usize;
        let storage = base + self.reader.u16(base + 4)? as usize;
        for i in 0..count {
            let rec = base + 6 + i * 12;
            let platform_id = self.reader.u16(rec)?;
            let encoding_id = self.reader.u16(rec + 2)?;
            let name_id = self.reader.u16(rec + 6)?;
            if name_id != 6 {
                continue;
            }
            let length = self.reader.u16(rec + 8)? as usize;
            let offset = self.reader.u16(rec + 10)? as usize;
            let raw = self.reader.slice(storage + offset, length)?;
            let decoded = decode_name_record(platform_id, encoding_id, raw);
            let name: String = decoded
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect();
            if name.is_empty() {
                return Err(Error::EncodingDecode(format!(
                    "PostScript name record (platform {}, encoding {}) decodes to an empty name",
                    platform_id, encoding_id
                )));
            }
            return Ok(name);
        }
        Err(Error::EncodingDecode(
            "no PostScript name record in name table".to_string(),
        ))
    }
}

/// Decode a name-table string to UTF-8 according to its platform/encoding.
///
/// Platform 0 and the Windows Unicode encodings are UTF-16BE; platform 1 is
/// MacRoman; the Windows CJK codepages keep their ASCII units (double-byte
/// pairs are skipped, which is lossless for names that survive the
/// `[A-Za-z0-9_-]` sanitization applied by callers).
fn decode_name_record(platform_id: u16, encoding_id: u16, raw: &[u8]) -> String {
    match (platform_id, encoding_id) {
        (1, _) => raw.iter().map(|&b| mac_roman_char(b)).collect(),
        (3, 3) | (3, 4) | (3, 5) => {
            let mut out = String::with_capacity(raw.len());
            let mut i = 0;
            while i < raw.len() {
                let b = raw[i];
                if b < 0x80 {
                    out.push(b as char);
                    i += 1;
                } else {
                    // lead byte of a double-byte character
                    i += 2;
                }
            }
            out
        }
        _ => {
            let units: Vec<u16> = raw
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
    }
}

/// MacRoman byte to char. The low half is ASCII; the high half uses the
/// MacRoman repertoire.
fn mac_roman_char(byte: u8) -> char {
    const HIGH: [char; 128] = [
        'Ä', 'Å', 'Ç', 'É', 'Ñ', 'Ö', 'Ü', 'á', 'à', 'â', 'ä', 'ã', 'å', 'ç', 'é', 'è', 'ê', 'ë',
        'í', 'ì', 'î', 'ï', 'ñ', 'ó', 'ò', 'ô', 'ö', 'õ', 'ú', 'ù', 'û', 'ü', '†', '°', '¢', '£',
        '§', '•', '¶', 'ß', '®', '©', '™', '´', '¨', '≠', 'Æ', 'Ø', '∞', '±', '≤', '≥', '¥', 'µ',
        '∂', '∑', '∏', 'π', '∫', 'ª', 'º', 'Ω', 'æ', 'ø', '¿', '¡', '¬', '√', 'ƒ', '≈', '∆', '«',
        '»', '…', '\u{A0}', 'À', 'Ã', 'Õ', 'Œ', 'œ', '–', '—', '“', '”', '‘', '’', '÷', '◊', 'ÿ',
        'Ÿ', '⁄', '€', '‹', '›', 'ﬁ', 'ﬂ', '‡', '·', '‚', '„', '‰', 'Â', 'Ê', 'Á', 'Ë', 'È', 'Í',
        'Î', 'Ï', 'Ì', 'Ó', 'Ô', '\u{F8FF}', 'Ò', 'Ú', 'Û', 'Ù', 'ı', 'ˆ', '˜', '¯', '˘', '˙',
        '˚', '¸', '˝', '˛', 'ˇ',
    ];
    if byte < 0x80 {
        byte as char
    } else {
        HIGH[(byte - 0x80) as usize]
    }
}
