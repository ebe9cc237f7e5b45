//! Font definition loading.
//!
//! A font definition is the persisted JSON form of an imported font: its
//! type, metrics, widths and (for embedded fonts) the font file reference.
//! This module loads definitions from a search path, validates them, applies
//! the default-width rule and synthesizes artificial styles when no real
//! style variant exists.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::FontConfig;
use crate::error::{Error, Result};
use crate::fonts::entry::{CidInfo, FontDescriptor, FontEntry, FontType, StyleFlags};
use crate::sfnt::parser::ParsedFont;

/// The 14 standard font keys and their canonical PostScript names.
const CORE_FONT_NAMES: [(&str, &str); 14] = [
    ("courier", "Courier"),
    ("courierB", "Courier-Bold"),
    ("courierI", "Courier-Oblique"),
    ("courierBI", "Courier-BoldOblique"),
    ("helvetica", "Helvetica"),
    ("helveticaB", "Helvetica-Bold"),
    ("helveticaI", "Helvetica-Oblique"),
    ("helveticaBI", "Helvetica-BoldOblique"),
    ("times", "Times-Roman"),
    ("timesB", "Times-Bold"),
    ("timesI", "Times-Italic"),
    ("timesBI", "Times-BoldItalic"),
    ("symbol", "Symbol"),
    ("zapfdingbats", "ZapfDingbats"),
];

/// Families covered by the standard 14 fonts.
pub const CORE_FAMILIES: [&str; 5] = ["courier", "helvetica", "times", "symbol", "zapfdingbats"];

/// Canonical PostScript name for a standard font key.
pub fn core_font_name(key: &str) -> Option<&'static str> {
    CORE_FONT_NAMES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, name)| *name)
}

fn default_up() -> i32 {
    -100
}

fn default_ut() -> i32 {
    50
}

/// Persisted font definition.
///
/// This is the JSON record written by the importers and read back by the
/// loader. Width and glyph maps use integer keys, serialized as JSON object
/// keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontDefinition {
    /// Font type name (`Core`, `Type1`, `TrueType`, `TrueTypeUnicode`,
    /// `cidfont0`).
    #[serde(rename = "type")]
    pub font_type: String,
    /// PostScript font name.
    pub name: String,
    /// Underline position.
    #[serde(default = "default_up")]
    pub up: i32,
    /// Underline thickness.
    #[serde(default = "default_ut")]
    pub ut: i32,
    /// Explicit default width; 0 means unset.
    pub dw: i32,
    /// Encoding name.
    pub enc: String,
    /// Encoding differences string.
    pub diff: String,
    /// Embedded font file name, relative to the definition directory.
    pub file: String,
    /// Uncompressed size of the original font.
    pub originalsize: i64,
    /// `/Length1` of the embedded stream.
    pub size1: i64,
    /// `/Length2` of the embedded stream (Type 1 only).
    pub size2: Option<i64>,
    /// FontDescriptor metrics.
    pub desc: FontDescriptor,
    /// CID system information (`cidfont0` only).
    pub cidinfo: Option<CidInfo>,
    /// Character code to advance width.
    pub cw: BTreeMap<u32, i32>,
    /// Character code to glyph bounding box.
    pub cbbox: BTreeMap<u32, [i32; 4]>,
    /// Character code to glyph ID (TrueType Unicode fonts).
    pub ctg: BTreeMap<u32, u32>,
}

impl Default for FontDefinition {
    fn default() -> Self {
        Self {
            font_type: String::new(),
            name: String::new(),
            up: default_up(),
            ut: default_ut(),
            dw: 0,
            enc: String::new(),
            diff: String::new(),
            file: String::new(),
            originalsize: 0,
            size1: 0,
            size2: None,
            desc: FontDescriptor::default(),
            cidinfo: None,
            cw: BTreeMap::new(),
            cbbox: BTreeMap::new(),
            ctg: BTreeMap::new(),
        }
    }
}

impl FontDefinition {
    /// Parse a definition from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the definition to JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Build a definition from a parsed TrueType font.
    ///
    /// `file` names the compressed font file stored next to the definition
    /// and `originalsize` is the size of the uncompressed sfnt.
    pub fn from_truetype(parsed: &ParsedFont, file: impl Into<String>, originalsize: i64) -> Self {
        Self {
            font_type: parsed.font_type.as_name().to_string(),
            name: parsed.name.clone(),
            up: parsed.underline_position,
            ut: parsed.underline_thickness,
            enc: if parsed.font_type == FontType::TrueTypeUnicode {
                "Identity-H".to_string()
            } else {
                String::new()
            },
            file: file.into(),
            originalsize,
            size1: originalsize,
            desc: FontDescriptor {
                ascent: parsed.ascent,
                descent: parsed.descent,
                leading: parsed.leading,
                cap_height: parsed.cap_height,
                x_height: parsed.x_height,
                italic_angle: parsed.italic_angle,
                flags: parsed.flags,
                font_bbox: parsed.bbox,
                stem_v: parsed.stem_v,
                stem_h: parsed.stem_h,
                avg_width: parsed.avg_width,
                max_width: parsed.max_width,
                missing_width: parsed.missing_width,
            },
            cw: parsed.cw.clone(),
            cbbox: parsed.cbbox.clone(),
            ctg: parsed.ctg.clone(),
            ..Default::default()
        }
    }
}

/// Locate and load a font definition, producing a registry-ready entry.
///
/// `ifile` short-circuits the search with an explicit definition path. The
/// search tries `<key>.json` in every directory, then falls back to
/// `<family>.json`; using the fallback for a styled request marks the entry
/// `fakestyle`, which triggers artificial style synthesis.
pub fn load_font(
    key: &str,
    family: &str,
    mode: StyleFlags,
    subset: bool,
    ifile: Option<&Path>,
    config: &FontConfig,
) -> Result<FontEntry> {
    let (path, fakestyle) = find_definition(key, family, ifile, config)?;
    let json = std::fs::read_to_string(&path)
        .map_err(|_| Error::NotReadable(path.display().to_string()))?;
    let def = FontDefinition::from_json(&json)?;
    let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    build_entry(def, key, family, mode, fakestyle, subset, dir, config)
}

/// Resolve the definition path and whether the style had to be faked.
fn find_definition(
    key: &str,
    family: &str,
    ifile: Option<&Path>,
    config: &FontConfig,
) -> Result<(PathBuf, bool)> {
    if let Some(path) = ifile {
        if path.is_file() {
            return Ok((path.to_path_buf(), false));
        }
        return Err(Error::NotReadable(path.display().to_string()));
    }
    // definition files are named after the lowercased key
    let key_file = format!("{}.json", key.to_lowercase());
    for dir in &config.font_dirs {
        let path = dir.join(&key_file);
        if path.is_file() {
            return Ok((path, false));
        }
    }
    if key != family {
        let family_file = format!("{}.json", family);
        for dir in &config.font_dirs {
            let path = dir.join(&family_file);
            if path.is_file() {
                log::debug!("no definition for {}, faking style from {}", key, family);
                return Ok((path, true));
            }
        }
    }
    Err(Error::NotReadable(key_file))
}

/// Validate a definition and build the font entry.
///
/// Applies, in order: the mandatory-field checks, the type check, the PDF/A
/// restriction, the default-width rule, name resolution and artificial style
/// synthesis.
#[allow(clippy::too_many_arguments)]
pub fn build_entry(
    def: FontDefinition,
    key: &str,
    family: &str,
    mode: StyleFlags,
    fakestyle: bool,
    subset: bool,
    dir: PathBuf,
    config: &FontConfig,
) -> Result<FontEntry> {
    if def.font_type.is_empty() {
        return Err(Error::BadDefinition("type"));
    }
    if def.cw.is_empty() {
        return Err(Error::BadDefinition("cw"));
    }
    let font_type = FontType::from_name(&def.font_type)?;
    if font_type == FontType::CidFont0 && config.pdfa {
        return Err(Error::CidFontOnPdfa);
    }

    // default width rule
    let dw = if def.dw > 0 {
        def.dw
    } else if def.desc.missing_width > 0 {
        def.desc.missing_width
    } else if def.cw.get(&32).copied().unwrap_or(0) > 0 {
        def.cw[&32]
    } else {
        600
    };

    // name resolution
    let mut name = if def.name.is_empty() {
        family.to_string()
    } else {
        def.name.clone()
    };
    let mut enc = def.enc.clone();
    match font_type {
        FontType::Core => {
            if let Some(canonical) = core_font_name(key) {
                name = canonical.to_string();
            }
        }
        FontType::TrueTypeUnicode => {
            enc = "Identity-H".to_string();
        }
        _ => {}
    }

    let mut desc = def.desc;
    if fakestyle {
        if mode.bold {
            name.push_str("Bold");
            desc.stem_v = if desc.stem_v == 0 {
                123
            } else {
                (desc.stem_v as f64 * 1.75).round() as i32
            };
        }
        if mode.italic {
            name.push_str("Italic");
            desc.italic_angle = if desc.italic_angle == 0 {
                -11
            } else {
                desc.italic_angle - 11
            };
            desc.flags |= 64;
        }
    }

    // only TrueType outlines can be subset-embedded
    let subset = subset
        && matches!(
            font_type,
            FontType::TrueType | FontType::TrueTypeUnicode
        );

    let length1 = if def.size1 > 0 {
        def.size1
    } else {
        def.originalsize
    };

    Ok(FontEntry {
        key: key.to_string(),
        family: family.to_string(),
        name,
        style: mode.as_style(),
        font_type,
        unicode: config.unicode,
        pdfa: config.pdfa,
        subset,
        compress: config.compress,
        fakestyle,
        mode,
        desc,
        cw: def.cw,
        cbbox: def.cbbox,
        ctg: def.ctg,
        dw,
        up: def.up,
        ut: def.ut,
        enc,
        diff: def.diff,
        diff_n: None,
        cidinfo: def.cidinfo,
        subsetchars: BTreeSet::new(),
        file: def.file,
        dir,
        length1,
        length2: def.size2,
        originalsize: def.originalsize,
        file_n: None,
        i: 0,
        n: None,
    })
}
