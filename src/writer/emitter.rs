//! PDF font object emission.
//!
//! Produces the byte block of every font-related indirect object: pooled
//! encoding-difference dictionaries, embedded font-file streams, and the
//! per-type font dictionary chains (Font, FontDescriptor, widths, ToUnicode,
//! CIDToGIDMap). Objects are numbered strictly in emission order from the
//! registry's shared counter; Font resources keep the numbers allocated at
//! registration.
//!
//! Stream payloads are Flate-compressed where configured and always routed
//! through the [`StreamEncrypt`] collaborator before framing.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{Error, Result};
use crate::fonts::entry::{CidInfo, FontEntry, FontType};
use crate::sfnt::parser::TrueTypeParser;
use crate::sfnt::subset::subset_font;
use crate::writer::encrypt::StreamEncrypt;
use crate::writer::registry::FontRegistry;

/// Inflate a zlib-wrapped (RFC 1950) byte stream.
fn zlib_decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Deflate a byte stream into zlib (RFC 1950) framing at the default
/// compression level.
fn zlib_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

impl FontRegistry {
    /// Emit every font-related indirect object as one concatenated block.
    ///
    /// Encoding-difference objects come first, then font-file streams, then
    /// the font dictionaries. The registry's object counter advances by one
    /// per emitted object; the final value is readable via
    /// [`FontRegistry::object_number`].
    pub fn emit_fonts(&mut self, encrypt: &dyn StreamEncrypt) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let diff_objects = self.emit_encoding_diffs(&mut out)?;
        self.emit_font_files(&mut out, encrypt)?;
        self.emit_font_defs(&mut out, encrypt, &diff_objects)?;
        log::debug!(
            "emitted font block: {} bytes, object counter at {}",
            out.len(),
            self.pon
        );
        Ok(out)
    }

    /// Phase 1: one Encoding object per pooled difference string. Also folds
    /// every font's subset characters into its file group, so shared files
    /// embed the union.
    fn emit_encoding_diffs(&mut self, out: &mut Vec<u8>) -> Result<Vec<u32>> {
        let mut diff_objects = vec![0u32; self.enc_diffs.len()];
        for fi in 0..self.fonts.len() {
            if let Some(diff_n) = self.fonts[fi].diff_n {
                let idx = diff_n - 1;
                if diff_objects[idx] == 0 {
                    self.pon += 1;
                    diff_objects[idx] = self.pon;
                    let object = format!(
                        "{} 0 obj\n<< /Type /Encoding /BaseEncoding /WinAnsiEncoding \
                         /Differences [{}] >>\nendobj\n",
                        self.pon, self.enc_diffs[idx]
                    );
                    out.extend_from_slice(object.as_bytes());
                }
            }
            let (path_key, chars) = {
                let font = &self.fonts[fi];
                if font.file.is_empty() {
                    continue;
                }
                (
                    font.dir.join(&font.file).display().to_string(),
                    font.subsetchars.clone(),
                )
            };
            if let Some(&gi) = self.file_index.get(&path_key) {
                self.files[gi].subsetchars.extend(chars);
            }
        }
        Ok(diff_objects)
    }

    /// Phase 2: one stream object per unique font file. A file is
    /// subset-embedded only when every alias opted in; the subset covers the
    /// union of their characters.
    fn emit_font_files(&mut self, out: &mut Vec<u8>, encrypt: &dyn StreamEncrypt) -> Result<()> {
        if self.config.linked {
            log::debug!("linked mode: font files are not embedded");
            return Ok(());
        }
        for gi in 0..self.files.len() {
            let (path, subset, length2, chars) = {
                let group = &self.files[gi];
                (
                    group.dir.join(&group.file),
                    group.subset,
                    group.length2,
                    group.subsetchars.clone(),
                )
            };
            let mut stream = std::fs::read(&path)
                .map_err(|_| Error::NotReadable(path.display().to_string()))?;
            let mut length1 = self.files[gi].length1;

            if subset && length2.is_none() {
                let raw = zlib_decompress(&stream)?;
                let parsed = TrueTypeParser::new(&raw).parse(&self.config)?;
                let subset_bytes = subset_font(&raw, &parsed, &chars)?;
                log::debug!(
                    "subset {}: {} -> {} bytes for {} chars",
                    path.display(),
                    raw.len(),
                    subset_bytes.len(),
                    chars.len()
                );
                length1 = subset_bytes.len() as i64;
                stream = zlib_compress(&subset_bytes)?;
            }

            self.pon += 1;
            let n = self.pon;
            self.files[gi].n = Some(n);
            let stream = encrypt.encrypt_stream(stream, n);

            let mut header = format!(
                "{} 0 obj\n<< /Filter /FlateDecode /Length {} /Length1 {}",
                n,
                stream.len(),
                length1
            );
            if let Some(l2) = length2 {
                header.push_str(&format!(" /Length2 {} /Length3 0", l2));
            }
            header.push_str(" >>\nstream\n");
            out.extend_from_slice(header.as_bytes());
            out.extend_from_slice(&stream);
            out.extend_from_slice(b"\nendstream\nendobj\n");

            for key in self.files[gi].keys.clone() {
                if let Some(&i) = self.by_key.get(&key) {
                    self.fonts[i].file_n = Some(n);
                }
            }
        }
        Ok(())
    }

    /// Phase 3: the font dictionary chain of every registered font.
    fn emit_font_defs(
        &mut self,
        out: &mut Vec<u8>,
        encrypt: &dyn StreamEncrypt,
        diff_objects: &[u32],
    ) -> Result<()> {
        for fi in 0..self.fonts.len() {
            let font = self.fonts[fi].clone();
            match font.font_type {
                FontType::Core => self.emit_core(out, &font),
                FontType::Type1 | FontType::TrueType => {
                    self.emit_simple(out, &font, diff_objects)
                }
                FontType::TrueTypeUnicode => self.emit_truetype_unicode(out, encrypt, &font)?,
                FontType::CidFont0 => self.emit_cid0(out, &font),
            }
        }
        Ok(())
    }

    /// A standard non-embedded font: a single Type1 dictionary.
    fn emit_core(&mut self, out: &mut Vec<u8>, font: &FontEntry) {
        let mut object = format!(
            "{} 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /{} /Name /F{}",
            font.n.expect("font numbered at registration"),
            font.name,
            font.i
        );
        if font.key != "symbol" && font.key != "zapfdingbats" {
            object.push_str(" /Encoding /WinAnsiEncoding");
        }
        object.push_str(" >>\nendobj\n");
        out.extend_from_slice(object.as_bytes());
    }

    /// A byte-oriented embedded font (Type1 or TrueType): the Font
    /// dictionary, a 32..255 widths array and the FontDescriptor.
    fn emit_simple(&mut self, out: &mut Vec<u8>, font: &FontEntry, diff_objects: &[u32]) {
        let widths_n = self.pon + 1;
        let desc_n = self.pon + 2;
        self.pon += 2;

        let mut object = format!(
            "{} 0 obj\n<< /Type /Font /Subtype /{} /BaseFont /{} /Name /F{} \
             /FirstChar 32 /LastChar 255 /Widths {} 0 R /FontDescriptor {} 0 R",
            font.n.expect("font numbered at registration"),
            font.font_type.as_name(),
            font.name,
            font.i,
            widths_n,
            desc_n
        );
        if !font.enc.is_empty() {
            if let Some(diff_n) = font.diff_n {
                object.push_str(&format!(" /Encoding {} 0 R", diff_objects[diff_n - 1]));
            } else {
                object.push_str(&format!(" /Encoding /{}", font.enc));
            }
        }
        object.push_str(" >>\nendobj\n");
        out.extend_from_slice(object.as_bytes());

        let widths: Vec<String> = (32u32..=255)
            .map(|c| font.cw.get(&c).copied().unwrap_or(font.dw).to_string())
            .collect();
        out.extend_from_slice(
            format!("{} 0 obj\n[ {} ]\nendobj\n", widths_n, widths.join(" ")).as_bytes(),
        );

        let file_key = match font.font_type {
            FontType::Type1 => "FontFile",
            _ => "FontFile2",
        };
        out.extend_from_slice(self.descriptor_object(desc_n, font, Some(file_key)).as_bytes());
    }

    /// A composite Unicode TrueType font: Type0 dictionary, CIDFontType2
    /// descendant, identity ToUnicode CMap, FontDescriptor and the
    /// CIDToGIDMap stream.
    fn emit_truetype_unicode(
        &mut self,
        out: &mut Vec<u8>,
        encrypt: &dyn StreamEncrypt,
        font: &FontEntry,
    ) -> Result<()> {
        let cid_n = self.pon + 1;
        let tounicode_n = self.pon + 2;
        let desc_n = self.pon + 3;
        let ctg_n = self.pon + 4;
        self.pon += 4;

        let basefont = if font.subset {
            format!("{}+{}", font.subset_tag(), font.name)
        } else {
            font.name.clone()
        };

        out.extend_from_slice(
            format!(
                "{} 0 obj\n<< /Type /Font /Subtype /Type0 /BaseFont /{} /Name /F{} \
                 /Encoding /{} /ToUnicode {} 0 R /DescendantFonts [{} 0 R] >>\nendobj\n",
                font.n.expect("font numbered at registration"),
                basefont,
                font.i,
                font.enc,
                tounicode_n,
                cid_n
            )
            .as_bytes(),
        );

        let w = width_ranges(&font.cw, font.dw, font.subset, &font.subsetchars, 0);
        out.extend_from_slice(
            format!(
                "{} 0 obj\n<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
                 /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
                 /FontDescriptor {} 0 R /DW {} {} /CIDToGIDMap {} 0 R >>\nendobj\n",
                cid_n, basefont, desc_n, font.dw, w, ctg_n
            )
            .as_bytes(),
        );

        self.write_stream(
            out,
            tounicode_n,
            identity_tounicode_cmap().into_bytes(),
            font.compress,
            encrypt,
        )?;

        out.extend_from_slice(
            self.descriptor_object(desc_n, font, Some("FontFile2"))
                .as_bytes(),
        );

        let mut cid_to_gid = vec![0u8; 131072];
        for (&cid, &gid) in &font.ctg {
            if cid <= 0xFFFF {
                cid_to_gid[2 * cid as usize] = (gid >> 8) as u8;
                cid_to_gid[2 * cid as usize + 1] = gid as u8;
            }
        }
        self.write_stream(out, ctg_n, cid_to_gid, font.compress, encrypt)?;
        Ok(())
    }

    /// A CID Type 0 font referencing an external character collection:
    /// Type0 dictionary, CIDFontType0 descendant and FontDescriptor.
    fn emit_cid0(&mut self, out: &mut Vec<u8>, font: &FontEntry) {
        let cid_n = self.pon + 1;
        let desc_n = self.pon + 2;
        self.pon += 2;

        // remap widths from Unicode to CIDs; single-byte codes pass through
        let cidoffset: u32 = if font.cw.contains_key(&1) { 0 } else { 31 };
        let cidinfo = font.cidinfo.clone().unwrap_or_else(|| CidInfo {
            registry: "Adobe".to_string(),
            ordering: "Identity".to_string(),
            supplement: 0,
            uni2cid: BTreeMap::new(),
        });
        let cw: BTreeMap<u32, i32> = if cidinfo.uni2cid.is_empty() {
            font.cw.clone()
        } else {
            let mut remapped = BTreeMap::new();
            for (&uni, &width) in &font.cw {
                if let Some(&cid) = cidinfo.uni2cid.get(&uni) {
                    remapped.insert(cid + cidoffset, width);
                } else if uni < 256 {
                    remapped.insert(uni, width);
                }
            }
            remapped
        };

        let longname = if font.enc.is_empty() {
            font.name.clone()
        } else {
            format!("{}-{}", font.name, font.enc)
        };
        let mut object = format!(
            "{} 0 obj\n<< /Type /Font /Subtype /Type0 /BaseFont /{} /Name /F{}",
            font.n.expect("font numbered at registration"),
            longname,
            font.i
        );
        if !font.enc.is_empty() {
            object.push_str(&format!(" /Encoding /{}", font.enc));
        }
        object.push_str(&format!(" /DescendantFonts [{} 0 R] >>\nendobj\n", cid_n));
        out.extend_from_slice(object.as_bytes());

        let w = width_ranges(&cw, font.dw, font.subset, &font.subsetchars, cidoffset as i64);
        out.extend_from_slice(
            format!(
                "{} 0 obj\n<< /Type /Font /Subtype /CIDFontType0 /BaseFont /{} \
                 /CIDSystemInfo << /Registry ({}) /Ordering ({}) /Supplement {} >> \
                 /FontDescriptor {} 0 R /DW {} {} >>\nendobj\n",
                cid_n,
                font.name,
                cidinfo.registry,
                cidinfo.ordering,
                cidinfo.supplement,
                desc_n,
                font.dw,
                w
            )
            .as_bytes(),
        );

        out.extend_from_slice(self.descriptor_object(desc_n, font, None).as_bytes());
    }

    /// Serialize a FontDescriptor object. `file_key` names the FontFile
    /// entry to reference when the font has an embedded stream.
    fn descriptor_object(&self, n: u32, font: &FontEntry, file_key: Option<&str>) -> String {
        let d = &font.desc;
        let mut object = format!(
            "{} 0 obj\n<< /Type /FontDescriptor /FontName /{} \
             /Ascent {} /Descent {} /Leading {} /CapHeight {} /XHeight {} \
             /ItalicAngle {} /Flags {} /FontBBox [{} {} {} {}] /StemV {} /StemH {} \
             /AvgWidth {} /MaxWidth {} /MissingWidth {}",
            n,
            font.name,
            d.ascent,
            d.descent,
            d.leading,
            d.cap_height,
            d.x_height,
            d.italic_angle,
            d.flags,
            d.font_bbox[0],
            d.font_bbox[1],
            d.font_bbox[2],
            d.font_bbox[3],
            d.stem_v,
            d.stem_h,
            d.avg_width,
            d.max_width,
            d.missing_width
        );
        if let (Some(key), Some(file_n)) = (file_key, font.file_n) {
            object.push_str(&format!(" /{} {} 0 R", key, file_n));
        }
        object.push_str(" >>\nendobj\n");
        object
    }

    /// Frame a stream object, compressing and encrypting the payload.
    fn write_stream(
        &mut self,
        out: &mut Vec<u8>,
        n: u32,
        data: Vec<u8>,
        compress: bool,
        encrypt: &dyn StreamEncrypt,
    ) -> Result<()> {
        let (payload, filter) = if compress {
            (zlib_compress(&data)?, " /Filter /FlateDecode")
        } else {
            (data, "")
        };
        let payload = encrypt.encrypt_stream(payload, n);
        out.extend_from_slice(
            format!("{} 0 obj\n<<{} /Length {} >>\nstream\n", n, filter, payload.len()).as_bytes(),
        );
        out.extend_from_slice(&payload);
        out.extend_from_slice(b"\nendstream\nendobj\n");
        Ok(())
    }
}

/// The identity ToUnicode CMap: under Identity-H the CIDs are the Unicode
/// code points, so the BMP maps straight through, 100 ranges per block.
fn identity_tounicode_cmap() -> String {
    let mut cmap = String::new();
    cmap.push_str("/CIDInit /ProcSet findresource begin\n");
    cmap.push_str("12 dict begin\n");
    cmap.push_str("begincmap\n");
    cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
    cmap.push_str("/CMapType 2 def\n");
    cmap.push_str("1 begincodespacerange\n");
    cmap.push_str("<0000> <FFFF>\n");
    cmap.push_str("endcodespacerange\n");
    let mut block = 0usize;
    while block < 256 {
        let chunk = (256 - block).min(100);
        cmap.push_str(&format!("{} beginbfrange\n", chunk));
        for high in block..block + chunk {
            cmap.push_str(&format!("<{:02X}00> <{:02X}FF> <{:02X}00>\n", high, high, high));
        }
        cmap.push_str("endbfrange\n");
        block += chunk;
    }
    cmap.push_str("endcmap\n");
    cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
    cmap.push_str("end\n");
    cmap.push_str("end\n");
    cmap
}

/// One segment of the compacted `/W` array.
#[derive(Debug, Default, Clone)]
struct WidthSegment {
    widths: Vec<i32>,
    interval: bool,
}

/// Compact a width map into the `/W [ … ]` array form.
///
/// Runs of consecutive CIDs with one shared width become `first last width`
/// segments; mixed-width runs become `first [ w1 w2 … ]` segments. Widths
/// equal to the default are dropped, and under subsetting so are characters
/// outside the subset. A post-pass merges adjacent list segments when the
/// junction allows it.
pub(crate) fn width_ranges(
    cw: &BTreeMap<u32, i32>,
    dw: i32,
    subset: bool,
    subsetchars: &BTreeSet<u32>,
    cidoffset: i64,
) -> String {
    let mut ranges: BTreeMap<i64, WidthSegment> = BTreeMap::new();
    let mut rangeid: i64 = 0;
    let mut prevcid: i64 = -2;
    let mut prevwidth: i32 = -1;
    let mut interval = false;

    for (&raw_cid, &width) in cw {
        if subset && !subsetchars.contains(&raw_cid) {
            continue;
        }
        if width == dw {
            continue;
        }
        let cid = raw_cid as i64 - cidoffset;
        if cid == prevcid + 1 {
            if width == prevwidth {
                let first = ranges[&rangeid].widths[0];
                if width == first {
                    ranges.get_mut(&rangeid).expect("segment exists").widths.push(width);
                } else {
                    // split the tail into a fresh run starting at prevcid
                    ranges.get_mut(&rangeid).expect("segment exists").widths.pop();
                    rangeid = prevcid;
                    ranges.insert(
                        rangeid,
                        WidthSegment {
                            widths: vec![prevwidth, width],
                            interval: false,
                        },
                    );
                }
                interval = true;
                ranges.get_mut(&rangeid).expect("segment exists").interval = true;
            } else {
                if interval {
                    rangeid = cid;
                    ranges.insert(
                        rangeid,
                        WidthSegment {
                            widths: vec![width],
                            interval: false,
                        },
                    );
                } else {
                    ranges.get_mut(&rangeid).expect("segment exists").widths.push(width);
                }
                interval = false;
            }
        } else {
            rangeid = cid;
            ranges.insert(
                rangeid,
                WidthSegment {
                    widths: vec![width],
                    interval: false,
                },
            );
            interval = false;
        }
        prevcid = cid;
        prevwidth = width;
    }

    // merge adjacent segments where the junction allows it
    let keys: Vec<i64> = ranges.keys().copied().collect();
    let mut prevk: i64 = -1;
    let mut nextk: i64 = -1;
    let mut prevint = false;
    for k in keys {
        let (len, had_interval) = {
            let seg = &ranges[&k];
            (seg.widths.len(), seg.interval)
        };
        let cws = len + usize::from(had_interval);
        if k == nextk && !prevint && (!had_interval || cws < 4) && ranges.contains_key(&prevk) {
            let mut seg = ranges.remove(&k).expect("segment exists");
            ranges
                .get_mut(&prevk)
                .expect("merge target exists")
                .widths
                .append(&mut seg.widths);
        } else {
            prevk = k;
        }
        nextk = k + cws as i64;
        if had_interval {
            prevint = len > 2;
            if let Some(seg) = ranges.get_mut(&k) {
                seg.interval = false;
            }
            nextk -= 1;
        } else {
            prevint = false;
        }
    }

    let mut w = String::new();
    for (k, seg) in &ranges {
        let uniform = seg.widths.windows(2).all(|pair| pair[0] == pair[1]);
        if uniform {
            w.push_str(&format!(
                " {} {} {}",
                k,
                k + seg.widths.len() as i64 - 1,
                seg.widths[0]
            ));
        } else {
            let list: Vec<String> = seg.widths.iter().map(|v| v.to_string()).collect();
            w.push_str(&format!(" {} [ {} ]", k, list.join(" ")));
        }
    }
    format!("/W [{} ]", w)
}
