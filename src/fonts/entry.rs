//! Core font data model.
//!
//! [`FontEntry`] is the central record: one per registered font instance,
//! immutable after emission starts except for the grown subset-character set
//! and the late-bound PDF object numbers.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported font types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontType {
    /// One of the 14 standard non-embedded fonts.
    Core,
    /// Embedded PostScript Type 1 font.
    Type1,
    /// Byte-oriented (single-byte encoded) TrueType font.
    TrueType,
    /// Composite Type 0 TrueType font with Identity-H encoding.
    TrueTypeUnicode,
    /// CID Type 0 font referencing an external character collection.
    CidFont0,
}

impl FontType {
    /// Parse the JSON spelling of a font type.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "Core" => Ok(FontType::Core),
            "Type1" => Ok(FontType::Type1),
            "TrueType" => Ok(FontType::TrueType),
            "TrueTypeUnicode" => Ok(FontType::TrueTypeUnicode),
            "cidfont0" => Ok(FontType::CidFont0),
            other => Err(Error::UnknownFontType(other.to_string())),
        }
    }

    /// The JSON spelling of this font type.
    pub fn as_name(self) -> &'static str {
        match self {
            FontType::Core => "Core",
            FontType::Type1 => "Type1",
            FontType::TrueType => "TrueType",
            FontType::TrueTypeUnicode => "TrueTypeUnicode",
            FontType::CidFont0 => "cidfont0",
        }
    }
}

/// Style mode flags parsed from a style string (`B I U D O`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleFlags {
    /// Bold.
    pub bold: bool,
    /// Italic / oblique.
    pub italic: bool,
    /// Underline.
    pub underline: bool,
    /// Line-through.
    pub linethrough: bool,
    /// Overline.
    pub overline: bool,
}

impl StyleFlags {
    /// Parse a style string; unknown letters are ignored.
    pub fn parse(style: &str) -> Self {
        let mut flags = Self::default();
        for c in style.chars() {
            match c.to_ascii_uppercase() {
                'B' => flags.bold = true,
                'I' => flags.italic = true,
                'U' => flags.underline = true,
                'D' => flags.linethrough = true,
                'O' => flags.overline = true,
                _ => {}
            }
        }
        flags
    }

    /// Canonical style string, letters in `BIUDO` order.
    pub fn as_style(&self) -> String {
        let mut s = String::new();
        if self.bold {
            s.push('B');
        }
        if self.italic {
            s.push('I');
        }
        if self.underline {
            s.push('U');
        }
        if self.linethrough {
            s.push('D');
        }
        if self.overline {
            s.push('O');
        }
        s
    }

    /// The registry key suffix: only bold and italic participate, `B` first.
    pub fn key_suffix(&self) -> String {
        let mut s = String::new();
        if self.bold {
            s.push('B');
        }
        if self.italic {
            s.push('I');
        }
        s
    }
}

/// PDF FontDescriptor metrics, in 1/1000 em units.
///
/// Zero stands for "not provided" where the format allows omission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FontDescriptor {
    /// Typographic ascender.
    pub ascent: i32,
    /// Typographic descender (negative).
    pub descent: i32,
    /// Line gap.
    pub leading: i32,
    /// Height of capital letters.
    pub cap_height: i32,
    /// x-height.
    pub x_height: i32,
    /// Italic angle in degrees.
    pub italic_angle: i32,
    /// PDF font flags bitset.
    pub flags: u32,
    /// Font bounding box `[llx, lly, urx, ury]`.
    #[serde(rename = "FontBBox")]
    pub font_bbox: [i32; 4],
    /// Vertical stem width.
    pub stem_v: i32,
    /// Horizontal stem width.
    pub stem_h: i32,
    /// Average advance width.
    pub avg_width: i32,
    /// Maximum advance width.
    pub max_width: i32,
    /// Advance width used for characters without a metric.
    pub missing_width: i32,
}

/// CID system information for composite fonts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CidInfo {
    /// Issuer of the character collection.
    pub registry: String,
    /// Name of the character collection.
    pub ordering: String,
    /// Supplement number of the collection.
    pub supplement: i32,
    /// Unicode-to-CID remap for predefined collections.
    #[serde(rename = "uni2cid")]
    pub uni2cid: BTreeMap<u32, u32>,
}

/// One registered font instance.
#[derive(Debug, Clone)]
pub struct FontEntry {
    /// Registry key: lowercase family plus `B`/`I` suffix.
    pub key: String,
    /// Normalized family name.
    pub family: String,
    /// PDF font name (PostScript name).
    pub name: String,
    /// Style suffix, subset of `BIUDO`.
    pub style: String,
    /// Resolved font type.
    pub font_type: FontType,
    /// Imported with full Unicode coverage.
    pub unicode: bool,
    /// PDF/A mode at registration time.
    pub pdfa: bool,
    /// Subset-embed the font file.
    pub subset: bool,
    /// Flate-compress generated streams.
    pub compress: bool,
    /// Style was synthesized because no style-variant definition exists.
    pub fakestyle: bool,
    /// Decomposed style flags.
    pub mode: StyleFlags,
    /// FontDescriptor metrics.
    pub desc: FontDescriptor,
    /// Character code to advance width.
    pub cw: BTreeMap<u32, i32>,
    /// Character code to glyph bounding box.
    pub cbbox: BTreeMap<u32, [i32; 4]>,
    /// Character code to glyph ID (TrueType Unicode fonts).
    pub ctg: BTreeMap<u32, u32>,
    /// Default advance width.
    pub dw: i32,
    /// Underline position.
    pub up: i32,
    /// Underline thickness.
    pub ut: i32,
    /// Encoding name (e.g. `WinAnsiEncoding`, `Identity-H`).
    pub enc: String,
    /// Encoding differences string, empty when the base encoding is used.
    pub diff: String,
    /// 1-based index of `diff` in the registry pool.
    pub diff_n: Option<usize>,
    /// CID system information, present for `cidfont0`.
    pub cidinfo: Option<CidInfo>,
    /// Characters used with this font, for subsetting.
    pub subsetchars: BTreeSet<u32>,
    /// Embedded font file name, empty for non-embedded fonts.
    pub file: String,
    /// Directory the definition (and font file) were loaded from.
    pub dir: PathBuf,
    /// Uncompressed size of the embedded data (`/Length1`).
    pub length1: i64,
    /// Size of the encrypted Type 1 section (`/Length2`), Type 1 only.
    pub length2: Option<i64>,
    /// Original font file size.
    pub originalsize: i64,
    /// Object number of the pooled font-file stream, set at emission.
    pub file_n: Option<u32>,
    /// 1-based font index, used in the `/F<i>` resource name.
    pub i: usize,
    /// Object number of the Font resource, set at registration.
    pub n: Option<u32>,
}

impl FontEntry {
    /// Six-uppercase-letter subset tag, derived deterministically from the
    /// subset character set so identical subsets name identically.
    pub fn subset_tag(&self) -> String {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.name.hash(&mut hasher);
        for code in &self.subsetchars {
            code.hash(&mut hasher);
        }
        let mut h = hasher.finish();
        let mut tag = String::with_capacity(6);
        for _ in 0..6 {
            tag.push(((h % 26) as u8 + b'A') as char);
            h /= 26;
        }
        tag
    }
}

#[cfg(test)]
impl FontEntry {
    /// A minimal valid entry for in-crate tests.
    pub(crate) fn test_entry(key: &str) -> Self {
        Self {
            key: key.to_string(),
            family: key.to_string(),
            name: key.to_string(),
            style: String::new(),
            font_type: FontType::TrueType,
            unicode: false,
            pdfa: false,
            subset: false,
            compress: true,
            fakestyle: false,
            mode: StyleFlags::default(),
            desc: FontDescriptor::default(),
            cw: BTreeMap::new(),
            cbbox: BTreeMap::new(),
            ctg: BTreeMap::new(),
            dw: 600,
            up: -100,
            ut: 50,
            enc: String::new(),
            diff: String::new(),
            diff_n: None,
            cidinfo: None,
            subsetchars: BTreeSet::new(),
            file: String::new(),
            dir: PathBuf::new(),
            length1: 0,
            length2: None,
            originalsize: 0,
            file_n: None,
            i: 0,
            n: None,
        }
    }
}
