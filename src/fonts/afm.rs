//! Adobe Font Metrics (AFM) parser.
//!
//! Parses the line-oriented AFM text format into a metrics record suitable
//! for building a font definition: global metrics, per-character widths from
//! `C … ;` lines, and the PDF FontDescriptor flags bitset.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::fonts::definition::FontDefinition;
use crate::fonts::entry::FontDescriptor;

/// Parsed AFM metrics, before post-processing.
#[derive(Debug, Clone, Default)]
pub struct AfmFont {
    /// `FontName` value.
    pub font_name: String,
    /// `FullName` value.
    pub full_name: String,
    /// `FamilyName` value.
    pub family_name: String,
    /// `Weight` value.
    pub weight: String,
    /// `CharacterSet` value.
    pub character_set: String,
    /// `Version` value.
    pub version: String,
    /// `EncodingScheme` value.
    pub encoding_scheme: String,
    /// `ItalicAngle` value.
    pub italic_angle: Option<i32>,
    /// `UnderlinePosition` value.
    pub underline_position: Option<i32>,
    /// `UnderlineThickness` value.
    pub underline_thickness: Option<i32>,
    /// `CapHeight` value.
    pub cap_height: Option<i32>,
    /// `XHeight` value.
    pub x_height: Option<i32>,
    /// `Ascender` value.
    pub ascender: Option<i32>,
    /// `Descender` value.
    pub descender: Option<i32>,
    /// `StdHW` value.
    pub std_hw: Option<i32>,
    /// `StdVW` value.
    pub std_vw: Option<i32>,
    /// `IsFixedPitch` flag.
    pub is_fixed_pitch: bool,
    /// `FontBBox` values.
    pub font_bbox: [i32; 4],
    /// Character widths from `C` lines, keyed by character code. Unencoded
    /// glyphs (code -1) participate in the width statistics only.
    pub cwidths: BTreeMap<i64, i32>,
    /// Character bounding boxes from `C` lines.
    pub cbbox: BTreeMap<i64, [i32; 4]>,
}

/// Parse an AFM buffer.
pub fn parse(data: &[u8]) -> Result<AfmFont> {
    let text = String::from_utf8_lossy(data);
    let mut afm = AfmFont::default();

    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&keyword) = tokens.first() else {
            continue;
        };
        match keyword {
            "FontName" => afm.font_name = token_text(&tokens),
            "FullName" => afm.full_name = token_text(&tokens),
            "FamilyName" => afm.family_name = token_text(&tokens),
            "Weight" => afm.weight = token_text(&tokens),
            "CharacterSet" => afm.character_set = token_text(&tokens),
            "Version" => afm.version = token_text(&tokens),
            "EncodingScheme" => afm.encoding_scheme = token_text(&tokens),
            "ItalicAngle" => afm.italic_angle = token_int(&tokens),
            "UnderlinePosition" => afm.underline_position = token_int(&tokens),
            "UnderlineThickness" => afm.underline_thickness = token_int(&tokens),
            "CapHeight" => afm.cap_height = token_int(&tokens),
            "XHeight" => afm.x_height = token_int(&tokens),
            "Ascender" => afm.ascender = token_int(&tokens),
            "Descender" => afm.descender = token_int(&tokens),
            "StdHW" => afm.std_hw = token_int(&tokens),
            "StdVW" => afm.std_vw = token_int(&tokens),
            "IsFixedPitch" => afm.is_fixed_pitch = tokens.get(1) == Some(&"true"),
            "FontBBox" => {
                for (i, slot) in afm.font_bbox.iter_mut().enumerate() {
                    *slot = parse_int(tokens.get(i + 1)).unwrap_or(0);
                }
            }
            "C" => afm.parse_char_metric(&tokens),
            _ => {}
        }
    }
    log::debug!(
        "parsed AFM {}: {} char metrics",
        afm.font_name,
        afm.cwidths.len()
    );
    Ok(afm)
}

impl AfmFont {
    /// Decode a `C cid ; WX w ; N name ; B x0 y0 x1 y1 ;` line.
    ///
    /// The bounding box is taken only when the fourteenth token is present.
    fn parse_char_metric(&mut self, tokens: &[&str]) {
        let Some(cid) = parse_int(tokens.get(1)).map(i64::from) else {
            return;
        };
        if tokens.get(3) != Some(&"WX") {
            return;
        }
        let Some(width) = parse_int(tokens.get(4)) else {
            return;
        };
        self.cwidths.insert(cid, width);
        if tokens.get(13).is_some() {
            let bbox = [
                parse_int(tokens.get(10)).unwrap_or(0),
                parse_int(tokens.get(11)).unwrap_or(0),
                parse_int(tokens.get(12)).unwrap_or(0),
                parse_int(tokens.get(13)).unwrap_or(0),
            ];
            self.cbbox.insert(cid, bbox);
        }
    }

    /// FontDescriptor flags: symbolic for Symbol and ZapfDingbats, fixed
    /// pitch and italic from the parsed attributes.
    pub fn flags(&self) -> u32 {
        let mut flags = 0u32;
        if self.font_name == "Symbol" || self.font_name == "ZapfDingbats" {
            flags |= 4;
        } else {
            flags |= 32;
        }
        if self.is_fixed_pitch {
            flags |= 1;
        }
        if self.italic_angle.unwrap_or(0) != 0 {
            flags |= 64;
        }
        flags
    }

    /// Build the persistable definition record.
    ///
    /// Fills `cw` for every code 0..=255, computes the width statistics and
    /// derives the descriptor. The ascender and descender always come from
    /// the font bounding box, and the cap height falls back to the ascender.
    pub fn to_definition(&self) -> Result<FontDefinition> {
        let source_name = if self.full_name.is_empty() {
            &self.font_name
        } else {
            &self.full_name
        };
        let name: String = source_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        if name.is_empty() {
            return Err(Error::EncodingDecode(
                "AFM font name is empty after sanitization".to_string(),
            ));
        }

        let missing_width = self.cwidths.get(&32).copied().unwrap_or(600);
        let mut cw = BTreeMap::new();
        for cid in 0i64..=255 {
            let width = self.cwidths.get(&cid).copied().unwrap_or(missing_width);
            cw.insert(cid as u32, width);
        }
        let max_width = self
            .cwidths
            .values()
            .copied()
            .fold(missing_width, i32::max);
        let avg_width = if self.cwidths.is_empty() {
            0
        } else {
            let sum: i64 = self.cwidths.values().map(|&w| w as i64).sum();
            (sum as f64 / self.cwidths.len() as f64).round() as i32
        };

        let mut cbbox = BTreeMap::new();
        for (&cid, &bbox) in &self.cbbox {
            if (0..=255).contains(&cid) {
                cbbox.insert(cid as u32, bbox);
            }
        }

        let ascent = self.font_bbox[3];
        let descent = self.font_bbox[1];
        let desc = FontDescriptor {
            ascent,
            descent,
            leading: 0,
            cap_height: self.cap_height.unwrap_or(ascent),
            x_height: self.x_height.unwrap_or(0),
            italic_angle: self.italic_angle.unwrap_or(0),
            flags: self.flags(),
            font_bbox: self.font_bbox,
            stem_v: self.std_vw.unwrap_or(0),
            stem_h: self.std_hw.unwrap_or(0),
            avg_width,
            max_width,
            missing_width,
        };

        Ok(FontDefinition {
            font_type: "Core".to_string(),
            name,
            up: self.underline_position.unwrap_or(-100),
            ut: self.underline_thickness.unwrap_or(50),
            cw,
            cbbox,
            desc,
            ..Default::default()
        })
    }
}

fn token_text(tokens: &[&str]) -> String {
    tokens.get(1).copied().unwrap_or_default().to_string()
}

fn token_int(tokens: &[&str]) -> Option<i32> {
    parse_int(tokens.get(1))
}

fn parse_int(token: Option<&&str>) -> Option<i32> {
    token.and_then(|t| t.parse::<f64>().ok()).map(|v| v.round() as i32)
}
