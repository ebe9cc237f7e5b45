//! PostScript Type 1 printer font binary (PFB) decoder.
//!
//! A PFB file is a sequence of segments, each introduced by a 0x80 marker, a
//! type byte (1 = ASCII, 2 = binary, 3 = end) and a little-endian 32-bit
//! length. A Type 1 program has an ASCII header, an eexec-encrypted binary
//! body and an ASCII trailer of zeros. The embedded PDF payload is the header
//! plus the body; the trailer is declared as `/Length3 0` and regenerated by
//! the consumer.

use crate::error::{Error, Result};

const SEGMENT_MARKER: u8 = 0x80;
const SEGMENT_ASCII: u8 = 1;
const SEGMENT_BINARY: u8 = 2;
const SEGMENT_END: u8 = 3;

/// Decoded PFB payload.
#[derive(Debug, Clone)]
pub struct Type1Font {
    /// Embedded payload: ASCII header followed by the encrypted body.
    pub data: Vec<u8>,
    /// Size of the ASCII header (`/Length1`).
    pub length1: usize,
    /// Size of the encrypted body (`/Length2`).
    pub length2: usize,
    /// ASCII trailer, kept for completeness but not embedded.
    pub trailer: Vec<u8>,
}

/// Decode a PFB buffer into its segments.
pub fn parse_pfb(data: &[u8]) -> Result<Type1Font> {
    let (header, next) = read_segment(data, 0, SEGMENT_ASCII)?;
    let (body, next) = read_segment(data, next, SEGMENT_BINARY)?;
    let trailer = match read_segment(data, next, SEGMENT_ASCII) {
        Ok((trailer, _)) => trailer.to_vec(),
        // the trailer segment is optional; some files end right after the body
        Err(_) => Vec::new(),
    };

    let mut payload = Vec::with_capacity(header.len() + body.len());
    payload.extend_from_slice(header);
    payload.extend_from_slice(body);
    log::debug!(
        "PFB segments: header {} bytes, body {} bytes, trailer {} bytes",
        header.len(),
        body.len(),
        trailer.len()
    );
    Ok(Type1Font {
        length1: header.len(),
        length2: body.len(),
        data: payload,
        trailer,
    })
}

/// Read one segment at `offset`, requiring the given segment type.
fn read_segment(data: &[u8], offset: usize, expected_type: u8) -> Result<(&[u8], usize)> {
    let header = data.get(offset..offset + 6).ok_or(Error::Bounds {
        offset,
        len: 6,
        size: data.len(),
    })?;
    if header[0] != SEGMENT_MARKER {
        return Err(Error::BadMagic {
            expected: SEGMENT_MARKER as u32,
            found: header[0] as u32,
        });
    }
    let seg_type = header[1];
    if seg_type == SEGMENT_END || seg_type != expected_type {
        return Err(Error::MalformedTable {
            table: "pfb",
            reason: format!(
                "segment type {} at offset {}, expected {}",
                seg_type, offset, expected_type
            ),
        });
    }
    let length = u32::from_le_bytes([header[2], header[3], header[4], header[5]]) as usize;
    let start = offset + 6;
    let payload = data.get(start..start + length).ok_or(Error::Bounds {
        offset: start,
        len: length,
        size: data.len(),
    })?;
    Ok((payload, start + length))
}
