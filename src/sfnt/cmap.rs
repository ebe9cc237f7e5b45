//! cmap subtable decoding.
//!
//! Decodes a single cmap subtable into a character-code to glyph-ID map.
//! Formats 0, 2, 4, 6, 8, 10 and 12 are fully decoded; formats 13 and 14 are
//! accepted and skipped. Any other format is rejected.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::sfnt::reader::ByteReader;

/// Character code to glyph ID map (`ctgdata`).
pub type GlyphMap = BTreeMap<u32, u32>;

// UTF-16 surrogate recombination constants.
// See https://www.unicode.org/faq/utf_bom.html#utf16-4
const LEAD_OFFSET: i64 = 0xD800 - (0x10000 >> 10);
const SURROGATE_OFFSET: i64 = 0x10000 - (0xD800 << 10) - 0xDC00;

/// Decode the cmap subtable at `offset` into `ctg`.
///
/// `offset` is the absolute position of the subtable (table offset plus the
/// encoding record offset). Existing entries are overwritten by later
/// subtables, matching a last-writer-wins merge across encoding records.
pub fn decode_subtable(reader: &ByteReader<'_>, offset: usize, ctg: &mut GlyphMap) -> Result<()> {
    let format = reader.u16(offset)?;
    log::debug!("decoding cmap subtable format {} at offset {}", format, offset);
    match format {
        0 => decode_format0(reader, offset, ctg),
        2 => decode_format2(reader, offset, ctg),
        4 => decode_format4(reader, offset, ctg),
        6 => decode_format6(reader, offset, ctg),
        8 => decode_format8(reader, offset, ctg),
        10 => decode_format10(reader, offset, ctg),
        12 => decode_format12(reader, offset, ctg),
        13 | 14 => {
            // Many-to-one ranges and variation sequences are recognized but
            // contribute no mappings.
            log::warn!("cmap subtable format {} is not decoded", format);
            Ok(())
        }
        other => Err(Error::UnsupportedCmapFormat(other)),
    }
}

/// Format 0: 256 single-byte glyph IDs.
fn decode_format0(reader: &ByteReader<'_>, offset: usize, ctg: &mut GlyphMap) -> Result<()> {
    let mut pos = offset + 6; // skip format, length, language
    for chr in 0u32..256 {
        ctg.insert(chr, reader.u8(pos)? as u32);
        pos += 1;
    }
    Ok(())
}

/// Format 2: high-byte mapping through sub-headers, for mixed 8/16-bit CJK
/// encodings.
fn decode_format2(reader: &ByteReader<'_>, offset: usize, ctg: &mut GlyphMap) -> Result<()> {
    let mut pos = offset + 6; // skip format, length, language

    let mut sub_header_keys = [0usize; 256];
    let mut num_sub_headers = 0usize;
    for key in sub_header_keys.iter_mut() {
        *key = (reader.u16(pos)? / 8) as usize;
        pos += 2;
        if *key > num_sub_headers {
            num_sub_headers = *key;
        }
    }
    num_sub_headers += 1;

    struct SubHeader {
        first_code: u32,
        entry_count: u32,
        id_delta: u32,
        id_range_offset: i64,
    }

    let mut sub_headers = Vec::with_capacity(num_sub_headers);
    let mut num_glyph_index_array = 0usize;
    for ish in 0..num_sub_headers {
        let first_code = reader.u16(pos)? as u32;
        let entry_count = reader.u16(pos + 2)? as u32;
        let id_delta = reader.u16(pos + 4)? as u32;
        let raw_range_offset = reader.u16(pos + 6)? as i64;
        pos += 8;
        // Rebase the range offset: it is expressed relative to its own field,
        // so subtract the remaining sub-header bytes and scale to u16 units.
        let id_range_offset = (raw_range_offset - (2 + (num_sub_headers - ish - 1) as i64 * 8)) / 2;
        num_glyph_index_array += entry_count as usize;
        sub_headers.push(SubHeader {
            first_code,
            entry_count,
            id_delta,
            id_range_offset,
        });
    }

    let mut glyph_index_array = Vec::with_capacity(num_glyph_index_array);
    for _ in 0..num_glyph_index_array {
        glyph_index_array.push(reader.u16(pos)? as u32);
        pos += 2;
    }

    for chr in 0u32..256 {
        let shk = sub_header_keys[chr as usize];
        if shk == 0 {
            // one-byte code
            let glyph = glyph_index_array.first().copied().unwrap_or(0);
            ctg.insert(chr, glyph);
        } else if let Some(sh) = sub_headers.get(shk) {
            // two-byte code: chr is the high byte
            for low in sh.first_code..(sh.first_code + sh.entry_count) {
                let code = (chr << 8) | low;
                let idx = sh.id_range_offset + (low - sh.first_code) as i64;
                let base = if idx >= 0 {
                    glyph_index_array.get(idx as usize).copied().unwrap_or(0)
                } else {
                    0
                };
                let glyph = (base + sh.id_delta) % 65536;
                ctg.insert(code, glyph);
            }
        }
    }
    Ok(())
}

/// Format 4: segment mapping to delta values, the standard BMP format.
fn decode_format4(reader: &ByteReader<'_>, offset: usize, ctg: &mut GlyphMap) -> Result<()> {
    let length = reader.u16(offset + 2)? as usize;
    let seg_count = (reader.u16(offset + 6)? / 2) as usize;
    let mut pos = offset + 14; // skip searchRange, entrySelector, rangeShift

    let mut end_count = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        end_count.push(reader.u16(pos)? as u32);
        pos += 2;
    }
    pos += 2; // reservedPad
    let mut start_count = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        start_count.push(reader.u16(pos)? as u32);
        pos += 2;
    }
    let mut id_delta = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        id_delta.push(reader.u16(pos)? as u32);
        pos += 2;
    }
    let mut id_range_offset = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        id_range_offset.push(reader.u16(pos)? as u32);
        pos += 2;
    }

    let gid_len = (length / 2).saturating_sub(8 + 4 * seg_count);
    let mut glyph_id_array = Vec::with_capacity(gid_len);
    for _ in 0..gid_len {
        glyph_id_array.push(reader.u16(pos)? as u32);
        pos += 2;
    }

    for k in 0..seg_count {
        for chr in start_count[k]..=end_count[k] {
            let glyph = if id_range_offset[k] == 0 {
                (id_delta[k] + chr) % 65536
            } else {
                let gid = (id_range_offset[k] / 2) as i64 + (chr - start_count[k]) as i64
                    - (seg_count - k) as i64;
                let base = if gid >= 0 {
                    glyph_id_array.get(gid as usize).copied().unwrap_or(0)
                } else {
                    0
                };
                (base + id_delta[k]) % 65536
            };
            ctg.insert(chr, glyph);
            if chr == 0xFFFF {
                break;
            }
        }
    }
    Ok(())
}

/// Format 6: trimmed table mapping a dense code range.
fn decode_format6(reader: &ByteReader<'_>, offset: usize, ctg: &mut GlyphMap) -> Result<()> {
    let first_code = reader.u16(offset + 6)? as u32;
    let entry_count = reader.u16(offset + 8)? as u32;
    let mut pos = offset + 10;
    for k in 0..entry_count {
        ctg.insert(first_code + k, reader.u16(pos)? as u32);
        pos += 2;
    }
    Ok(())
}

/// Format 8: mixed 16-bit and 32-bit coverage.
fn decode_format8(reader: &ByteReader<'_>, offset: usize, ctg: &mut GlyphMap) -> Result<()> {
    let mut pos = offset + 12; // skip format, reserved, length, language
    let is32 = reader.slice(pos, 8192)?;
    pos += 8192;
    let n_groups = reader.u32(pos)?;
    pos += 4;
    for _ in 0..n_groups {
        let start_char = reader.u32(pos)?;
        let end_char = reader.u32(pos + 4)?;
        let start_glyph = reader.u32(pos + 8)?;
        pos += 12;
        for (step, k) in (start_char..=end_char).enumerate() {
            let is32_idx = (k / 8) as usize;
            let is32_shift = k % 8;
            let code = if is32
                .get(is32_idx)
                .map_or(true, |byte| byte & (1 << (7 - is32_shift)) == 0)
            {
                k as i64
            } else {
                // Recombine as a UTF-16 surrogate pair.
                ((LEAD_OFFSET + (k >> 10) as i64) << 10) + ((k & 0x3FF) + 0xDC00) as i64
                    + SURROGATE_OFFSET
            };
            let code = code as u32;
            ctg.insert(code, start_glyph.wrapping_add(step as u32));
            // Compatibility quirk: format 8 assignments are immediately
            // neutralized to .notdef.
            ctg.insert(code, 0);
        }
    }
    Ok(())
}

/// Format 10: trimmed array over a dense 32-bit code range.
fn decode_format10(reader: &ByteReader<'_>, offset: usize, ctg: &mut GlyphMap) -> Result<()> {
    let start_char = reader.u32(offset + 12)?;
    let num_chars = reader.u32(offset + 16)?;
    let mut pos = offset + 20;
    for k in 0..num_chars {
        ctg.insert(start_char + k, reader.u16(pos)? as u32);
        pos += 2;
    }
    Ok(())
}

/// Format 12: segmented coverage with sequential glyph ranges.
fn decode_format12(reader: &ByteReader<'_>, offset: usize, ctg: &mut GlyphMap) -> Result<()> {
    let n_groups = reader.u32(offset + 12)?;
    let mut pos = offset + 16;
    for _ in 0..n_groups {
        let start_char = reader.u32(pos)?;
        let end_char = reader.u32(pos + 4)?;
        let mut glyph = reader.u32(pos + 8)?;
        pos += 12;
        for code in start_char..=end_char {
            ctg.insert(code, glyph);
            glyph = glyph.wrapping_add(1);
        }
    }
    Ok(())
}
