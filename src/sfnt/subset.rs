//! TrueType subsetter.
//!
//! Produces a standalone sfnt containing only the glyphs reachable from a set
//! of character codes. Glyph IDs are deliberately *not* remapped: excluded
//! glyphs become zero-length `loca` ranges, so the character-to-glyph mapping
//! delivered through CIDToGIDMap stays valid against the subset file.
//!
//! The output keeps `head`, `hhea`, `hmtx`, `maxp`, the hinting tables
//! (`cvt `, `fpgm`, `prep`) and the rewritten `glyf`/`loca` pair. `cmap` is
//! dropped; the mapping is supplied externally.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::sfnt::parser::ParsedFont;
use crate::sfnt::reader::ByteReader;
use crate::sfnt::tables::{table_checksum, Tag, CHECKSUM_MAGIC, SFNT_VERSION_TRUETYPE};

// Composite glyph component flags.
const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

/// Tables preserved in a subset font, in addition to the rewritten
/// `glyf`/`loca` pair.
const KEPT_TABLES: [Tag; 9] = [
    Tag::HEAD,
    Tag::HHEA,
    Tag::HMTX,
    Tag::MAXP,
    Tag::CVT,
    Tag::FPGM,
    Tag::PREP,
    Tag::GLYF,
    Tag::LOCA,
];

/// Build a subset sfnt from `data` containing only the glyphs needed to
/// render `chars` (plus `.notdef` and transitively referenced composite
/// components).
pub fn subset_font(data: &[u8], parsed: &ParsedFont, chars: &BTreeSet<u32>) -> Result<Vec<u8>> {
    let reader = ByteReader::new(data);
    let glyf = parsed.tables.require(Tag::GLYF, "glyf")?;

    // Seed with .notdef and every glyph the characters map to.
    let mut subglyphs: BTreeSet<u32> = BTreeSet::new();
    subglyphs.insert(0);
    for code in chars {
        if let Some(&gid) = parsed.ctg.get(code) {
            subglyphs.insert(gid);
        }
    }
    composite_closure(&reader, glyf.offset, &parsed.index_to_loc, &mut subglyphs)?;
    log::debug!(
        "subsetting {} chars -> {} glyphs of {}",
        chars.len(),
        subglyphs.len(),
        parsed.tot_num_glyphs.saturating_sub(1)
    );

    // Rewrite glyf, emitting one loca entry per iteration; excluded glyphs
    // contribute a zero-length range.
    let mut new_glyf: Vec<u8> = Vec::new();
    let mut new_loca: Vec<u8> = Vec::new();
    let mut offset = 0u32;
    for i in 0..parsed.tot_num_glyphs {
        let mut length = 0u32;
        if subglyphs.contains(&i) {
            if let (Some(&start), Some(&end)) = (
                parsed.index_to_loc.get(&i),
                parsed.index_to_loc.get(&(i + 1)),
            ) {
                length = end.saturating_sub(start);
                let slice = reader.slice((glyf.offset + start) as usize, length as usize)?;
                new_glyf.extend_from_slice(slice);
            }
        }
        if parsed.short_loca {
            new_loca.extend_from_slice(&((offset / 2) as u16).to_be_bytes());
        } else {
            new_loca.extend_from_slice(&offset.to_be_bytes());
        }
        offset += length;
    }

    // Keep only the subset tables, attaching payloads padded to four bytes.
    let mut tables = parsed.tables.clone();
    tables.retain_tags(&KEPT_TABLES);
    for (tag, table) in tables.iter_mut() {
        let mut payload = match *tag {
            Tag::GLYF => std::mem::take(&mut new_glyf),
            Tag::LOCA => std::mem::take(&mut new_loca),
            _ => reader
                .slice(table.offset as usize, table.length as usize)?
                .to_vec(),
        };
        if *tag == Tag::HEAD && payload.len() >= 12 {
            // checkSumAdjustment participates in the whole-file checksum and
            // must be zero while the per-table sums are taken.
            payload[8..12].fill(0);
        }
        while payload.len() % 4 != 0 {
            payload.push(0);
        }
        table.length = payload.len() as u32;
        table.checksum = table_checksum(&payload);
        table.data = Some(payload);
    }

    // Assign final offsets past the header and directory.
    let num_tables = tables.len() as u16;
    let entry_selector = (num_tables as f64).log2().floor() as u16;
    let search_range = (1u16 << entry_selector) * 16;
    let range_shift = num_tables * 16 - search_range;

    let mut data_offset = 12 + num_tables as u32 * 16;
    let mut head_offset = 0usize;
    for (tag, table) in tables.iter_mut() {
        table.offset = data_offset;
        if *tag == Tag::HEAD {
            head_offset = data_offset as usize;
        }
        data_offset += table.length;
    }

    let mut font = Vec::with_capacity(data_offset as usize);
    font.extend_from_slice(&SFNT_VERSION_TRUETYPE.to_be_bytes());
    font.extend_from_slice(&num_tables.to_be_bytes());
    font.extend_from_slice(&search_range.to_be_bytes());
    font.extend_from_slice(&entry_selector.to_be_bytes());
    font.extend_from_slice(&range_shift.to_be_bytes());
    for (tag, table) in tables.iter() {
        font.extend_from_slice(&tag.0);
        font.extend_from_slice(&table.checksum.to_be_bytes());
        font.extend_from_slice(&table.offset.to_be_bytes());
        font.extend_from_slice(&table.length.to_be_bytes());
    }
    for (_, table) in tables.iter() {
        font.extend_from_slice(table.data.as_deref().unwrap_or_default());
    }

    // The file checksum plus the adjustment must equal the checksum magic.
    let file_sum = table_checksum(&font);
    let adjustment = CHECKSUM_MAGIC.wrapping_sub(file_sum);
    font[head_offset + 8..head_offset + 12].copy_from_slice(&adjustment.to_be_bytes());

    Ok(font)
}

/// Grow `subglyphs` with every glyph transitively referenced by composite
/// glyphs already in the set.
fn composite_closure(
    reader: &ByteReader<'_>,
    glyf_offset: u32,
    index_to_loc: &BTreeMap<u32, u32>,
    subglyphs: &mut BTreeSet<u32>,
) -> Result<()> {
    let mut worklist: Vec<u32> = subglyphs.iter().copied().collect();
    while let Some(gid) = worklist.pop() {
        let Some(&loc) = index_to_loc.get(&gid) else {
            continue;
        };
        let glyph = (glyf_offset + loc) as usize;
        if reader.i16(glyph)? >= 0 {
            continue; // simple glyph
        }
        let mut pos = glyph + 10;
        loop {
            let flags = reader.u16(pos)?;
            let component = reader.u16(pos + 2)? as u32;
            pos += 4;
            pos += if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
            if flags & WE_HAVE_A_SCALE != 0 {
                pos += 2;
            } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
                pos += 4;
            } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
                pos += 8;
            }
            if subglyphs.insert(component) {
                worklist.push(component);
            }
            if flags & MORE_COMPONENTS == 0 {
                break;
            }
        }
    }
    Ok(())
}
