//! Shared fixtures: a synthetic TrueType font built in memory.
//!
//! The font uses 1000 units per em so design units equal PDF text-space
//! units, which keeps the expected values in assertions readable.
//!
//! Glyph inventory:
//!
//! | GID | char | advance | bbox                |
//! |-----|------|---------|---------------------|
//! | 0   | .notdef | 500  | (0, 0, 500, 500)    |
//! | 1   | A    | 600     | (10, 0, 600, 700)   |
//! | 2   | x    | 450     | (10, -10, 450, 510) |
//! | 3   | H    | 650     | (0, 0, 600, 730)    |
//! | 4   | C    | 620     | composite of GID 1  |
//! | 5   | B    | 550     | (0, 0, 550, 700)    |

// not every test crate exercises every fixture
#![allow(dead_code)]

/// Advance widths, indexed by glyph ID.
pub const ADVANCES: [u16; 6] = [500, 600, 450, 650, 620, 550];

fn u16be(v: u16) -> [u8; 2] {
    v.to_be_bytes()
}

fn simple_glyph(bbox: [i16; 4]) -> Vec<u8> {
    let mut g = Vec::with_capacity(12);
    g.extend_from_slice(&1i16.to_be_bytes());
    for v in bbox {
        g.extend_from_slice(&v.to_be_bytes());
    }
    g.extend_from_slice(&[0, 0]); // keeps every glyph offset even
    g
}

fn build_glyf() -> (Vec<u8>, Vec<u16>) {
    let mut glyf = Vec::new();
    let mut offsets = Vec::new();

    for bbox in [
        [0, 0, 500, 500],   // 0 .notdef
        [10, 0, 600, 700],  // 1 A
        [10, -10, 450, 510], // 2 x
        [0, 0, 600, 730],   // 3 H
    ] {
        offsets.push(glyf.len() as u16);
        glyf.extend_from_slice(&simple_glyph(bbox));
    }

    // 4: composite referencing glyph 1 with word arguments
    offsets.push(glyf.len() as u16);
    glyf.extend_from_slice(&(-1i16).to_be_bytes());
    for v in [10i16, 0, 600, 700] {
        glyf.extend_from_slice(&v.to_be_bytes());
    }
    glyf.extend_from_slice(&u16be(0x0001)); // ARG_1_AND_2_ARE_WORDS
    glyf.extend_from_slice(&u16be(1)); // component glyph
    glyf.extend_from_slice(&[0u8; 4]); // two word arguments

    // 5: B
    offsets.push(glyf.len() as u16);
    glyf.extend_from_slice(&simple_glyph([0, 0, 550, 700]));

    offsets.push(glyf.len() as u16); // end sentinel
    (glyf, offsets)
}

fn build_head() -> Vec<u8> {
    let mut head = Vec::new();
    head.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // version
    head.extend_from_slice(&0u32.to_be_bytes()); // fontRevision
    head.extend_from_slice(&0u32.to_be_bytes()); // checkSumAdjustment
    head.extend_from_slice(&0x5F0F_3CF5u32.to_be_bytes()); // magic
    head.extend_from_slice(&u16be(0)); // flags
    head.extend_from_slice(&u16be(1000)); // unitsPerEm
    head.extend_from_slice(&[0u8; 16]); // created, modified
    for v in [0i16, -200, 1000, 900] {
        head.extend_from_slice(&v.to_be_bytes()); // font bbox
    }
    head.extend_from_slice(&u16be(0)); // macStyle
    head.extend_from_slice(&u16be(8)); // lowestRecPPEM
    head.extend_from_slice(&u16be(2)); // fontDirectionHint
    head.extend_from_slice(&u16be(0)); // indexToLocFormat: short
    head.extend_from_slice(&u16be(0)); // glyphDataFormat
    head
}

fn build_hhea() -> Vec<u8> {
    let mut hhea = Vec::new();
    hhea.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    hhea.extend_from_slice(&800i16.to_be_bytes()); // ascender
    hhea.extend_from_slice(&(-200i16).to_be_bytes()); // descender
    hhea.extend_from_slice(&90i16.to_be_bytes()); // lineGap
    hhea.extend_from_slice(&u16be(650)); // advanceWidthMax
    hhea.extend_from_slice(&[0u8; 22]); // bearings, slope, reserved, format
    hhea.extend_from_slice(&u16be(6)); // numberOfHMetrics
    hhea
}

fn build_hmtx() -> Vec<u8> {
    let mut hmtx = Vec::new();
    for advance in ADVANCES {
        hmtx.extend_from_slice(&u16be(advance));
        hmtx.extend_from_slice(&u16be(0)); // lsb
    }
    hmtx
}

fn build_maxp() -> Vec<u8> {
    let mut maxp = Vec::new();
    maxp.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    maxp.extend_from_slice(&u16be(6)); // numGlyphs
    maxp.extend_from_slice(&[0u8; 26]);
    maxp
}

fn build_post() -> Vec<u8> {
    let mut post = Vec::new();
    post.extend_from_slice(&0x0003_0000u32.to_be_bytes());
    post.extend_from_slice(&0i32.to_be_bytes()); // italicAngle
    post.extend_from_slice(&(-75i16).to_be_bytes()); // underlinePosition
    post.extend_from_slice(&50i16.to_be_bytes()); // underlineThickness
    post.extend_from_slice(&0u32.to_be_bytes()); // isFixedPitch
    post.extend_from_slice(&[0u8; 16]);
    post
}

fn build_os2() -> Vec<u8> {
    let mut os2 = Vec::new();
    os2.extend_from_slice(&u16be(4)); // version
    os2.extend_from_slice(&500i16.to_be_bytes()); // xAvgCharWidth
    os2.extend_from_slice(&u16be(400)); // usWeightClass
    os2.extend_from_slice(&u16be(5)); // usWidthClass
    os2.extend_from_slice(&u16be(0)); // fsType
    os2.extend_from_slice(&[0u8; 86]);
    os2
}

fn build_name() -> Vec<u8> {
    let ps_name: Vec<u8> = "TestFont-Regular"
        .encode_utf16()
        .flat_map(|u| u.to_be_bytes())
        .collect();
    let mut name = Vec::new();
    name.extend_from_slice(&u16be(0)); // format
    name.extend_from_slice(&u16be(1)); // count
    name.extend_from_slice(&u16be(18)); // stringOffset
    name.extend_from_slice(&u16be(3)); // platformID
    name.extend_from_slice(&u16be(1)); // encodingID
    name.extend_from_slice(&u16be(0x0409)); // languageID
    name.extend_from_slice(&u16be(6)); // nameID: PostScript name
    name.extend_from_slice(&u16be(ps_name.len() as u16));
    name.extend_from_slice(&u16be(0)); // offset
    name.extend_from_slice(&ps_name);
    name
}

/// Format 4 subtable: A..C through the glyph-index array, H and x via
/// idDelta, plus the 0xFFFF sentinel.
fn build_cmap_format4() -> Vec<u8> {
    let glyph_id_array: [u16; 3] = [1, 5, 4]; // A, B, C
    let seg_count = 4u16;
    let mut sub = Vec::new();
    sub.extend_from_slice(&u16be(4)); // format
    sub.extend_from_slice(&u16be(0)); // length, patched below
    sub.extend_from_slice(&u16be(0)); // language
    sub.extend_from_slice(&u16be(seg_count * 2));
    sub.extend_from_slice(&[0u8; 6]); // search params, unused
    for end in [67u16, 72, 120, 0xFFFF] {
        sub.extend_from_slice(&u16be(end));
    }
    sub.extend_from_slice(&u16be(0)); // reservedPad
    for start in [65u16, 72, 120, 0xFFFF] {
        sub.extend_from_slice(&u16be(start));
    }
    for delta in [0i16, 3 - 72, 2 - 120, 1] {
        sub.extend_from_slice(&delta.to_be_bytes());
    }
    // idRangeOffset: segment 0 points at glyphIdArray[0]
    for range_offset in [8u16, 0, 0, 0] {
        sub.extend_from_slice(&u16be(range_offset));
    }
    for gid in glyph_id_array {
        sub.extend_from_slice(&u16be(gid));
    }
    let len = sub.len() as u16;
    sub[2..4].copy_from_slice(&len.to_be_bytes());

    let mut cmap = Vec::new();
    cmap.extend_from_slice(&u16be(0)); // version
    cmap.extend_from_slice(&u16be(1)); // numTables
    cmap.extend_from_slice(&u16be(3)); // platformID
    cmap.extend_from_slice(&u16be(1)); // encodingID
    cmap.extend_from_slice(&12u32.to_be_bytes()); // subtable offset
    cmap.extend_from_slice(&sub);
    cmap
}

/// Format 6 subtable covering codes 0..=255, for the 256-mapping downgrade.
fn build_cmap_format6() -> Vec<u8> {
    let mut sub = Vec::new();
    sub.extend_from_slice(&u16be(6)); // format
    sub.extend_from_slice(&u16be(10 + 512)); // length
    sub.extend_from_slice(&u16be(0)); // language
    sub.extend_from_slice(&u16be(0)); // firstCode
    sub.extend_from_slice(&u16be(256)); // entryCount
    for code in 0u16..256 {
        sub.extend_from_slice(&u16be(code % 6));
    }

    let mut cmap = Vec::new();
    cmap.extend_from_slice(&u16be(0));
    cmap.extend_from_slice(&u16be(1));
    cmap.extend_from_slice(&u16be(3));
    cmap.extend_from_slice(&u16be(1));
    cmap.extend_from_slice(&12u32.to_be_bytes());
    cmap.extend_from_slice(&sub);
    cmap
}

fn assemble(tables: Vec<([u8; 4], Vec<u8>)>) -> Vec<u8> {
    let mut tables = tables;
    tables.sort_by_key(|(tag, _)| u32::from_be_bytes(*tag));
    let num_tables = tables.len() as u16;

    let mut font = Vec::new();
    font.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    font.extend_from_slice(&u16be(num_tables));
    font.extend_from_slice(&[0u8; 6]); // search params, unused by the parser

    let mut offset = 12 + num_tables as u32 * 16;
    let mut directory = Vec::new();
    let mut body = Vec::new();
    for (tag, mut data) in tables {
        directory.extend_from_slice(&tag);
        directory.extend_from_slice(&0u32.to_be_bytes()); // checksum unused
        directory.extend_from_slice(&offset.to_be_bytes());
        directory.extend_from_slice(&(data.len() as u32).to_be_bytes());
        while data.len() % 4 != 0 {
            data.push(0);
        }
        offset += data.len() as u32;
        body.extend_from_slice(&data);
    }
    font.extend_from_slice(&directory);
    font.extend_from_slice(&body);
    font
}

fn build_with_cmap(cmap: Vec<u8>) -> Vec<u8> {
    let (glyf, loca_offsets) = build_glyf();
    let mut loca = Vec::new();
    for off in loca_offsets {
        loca.extend_from_slice(&u16be(off / 2));
    }
    assemble(vec![
        (*b"head", build_head()),
        (*b"hhea", build_hhea()),
        (*b"hmtx", build_hmtx()),
        (*b"maxp", build_maxp()),
        (*b"post", build_post()),
        (*b"OS/2", build_os2()),
        (*b"name", build_name()),
        (*b"cmap", cmap),
        (*b"loca", loca),
        (*b"glyf", glyf),
    ])
}

/// The standard test font with a format 4 cmap mapping A, B, C, H, x.
pub fn build_test_font() -> Vec<u8> {
    build_with_cmap(build_cmap_format4())
}

/// A variant whose cmap maps exactly the 256 single-byte codes.
pub fn build_test_font_256() -> Vec<u8> {
    build_with_cmap(build_cmap_format6())
}
