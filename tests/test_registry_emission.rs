//! Integration tests for registration and emission over a fixture font
//! directory written into a temp dir by the tests themselves.

mod common;

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use font_oxide::writer::IdentityEncrypt;
use font_oxide::{Error, FontConfig, FontRegistry};

static DIR_SEQ: AtomicU32 = AtomicU32::new(0);

/// Create a unique fixture directory under the system temp dir.
fn fixture_dir(label: &str) -> PathBuf {
    let seq = DIR_SEQ.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "font_oxide_{}_{}_{}",
        label,
        std::process::id(),
        seq
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

fn write_core_defs(dir: &PathBuf) {
    for (key, name) in [
        ("helvetica", "Helvetica"),
        ("helveticab", "Helvetica-Bold"),
        ("helveticai", "Helvetica-Oblique"),
        ("helveticabi", "Helvetica-BoldOblique"),
    ] {
        let def = format!(
            r#"{{"type":"Core","name":"{}","cw":{{"32":278,"65":667,"66":667}},
                "desc":{{"Ascent":718,"Descent":-207,"CapHeight":718,"Flags":32,
                "FontBBox":[-166,-225,1000,931],"StemV":88,"MissingWidth":278}}}}"#,
            name
        );
        fs::write(dir.join(format!("{}.json", key)), def).unwrap();
    }
}

fn write_type1_def(dir: &PathBuf) {
    // a Type1 font with an encoding difference and an embedded file
    let def = r#"{"type":"Type1","name":"PdfaSymbol","enc":"WinAnsiEncoding",
        "diff":"32 /space 33 /exclam 34 /universal",
        "file":"pdfasymbol.z","size1":392,"size2":1024,"originalsize":1416,
        "cw":{"32":250,"33":333,"34":713},
        "desc":{"Ascent":1010,"Descent":-293,"Flags":4,"FontBBox":[-180,-293,1090,1010],
        "StemV":85,"MissingWidth":250}}"#;
    fs::write(dir.join("pdfasymbol.json"), def).unwrap();
    let mut payload = Vec::new();
    payload.extend_from_slice(b"%!PS-AdobeFont-1.0: PdfaSymbol");
    payload.extend_from_slice(&[0xAA; 128]);
    fs::write(dir.join("pdfasymbol.z"), zlib(&payload)).unwrap();
}

fn write_freesans_defs(dir: &PathBuf) {
    let ttf = common::build_test_font();
    for (key, name) in [
        ("freesans", "FreeSans"),
        ("freesansb", "FreeSansBold"),
        ("freesansi", "FreeSansOblique"),
        ("freesansbi", "FreeSansBoldOblique"),
    ] {
        let def = format!(
            r#"{{"type":"TrueTypeUnicode","name":"{}","enc":"Identity-H",
                "file":"{}.z","originalsize":{},
                "cw":{{"32":500,"65":600,"66":550,"67":620,"72":650,"120":450}},
                "ctg":{{"65":1,"66":5,"67":4,"72":3,"120":2}},
                "desc":{{"Ascent":800,"Descent":-200,"CapHeight":730,"XHeight":520,
                "Flags":32,"FontBBox":[0,-200,1000,900],"StemV":70,"MissingWidth":500}}}}"#,
            name,
            key,
            ttf.len()
        );
        fs::write(dir.join(format!("{}.json", key)), def).unwrap();
        fs::write(dir.join(format!("{}.z", key)), zlib(&ttf)).unwrap();
    }
}

fn write_cid0_def(dir: &PathBuf) {
    let def = r#"{"type":"cidfont0","name":"KozMinPro-Regular-Acro","enc":"UniJIS-UCS2-H",
        "cidinfo":{"Registry":"Adobe","Ordering":"Japan1","Supplement":5,
        "uni2cid":{"19968":1200,"19969":1201}},
        "cw":{"32":231,"33":250,"19968":1000,"19969":1000},"dw":1000,
        "desc":{"Ascent":880,"Descent":-120,"Flags":4,"FontBBox":[-195,-272,1110,1075],
        "StemV":86,"MissingWidth":500}}"#;
    fs::write(dir.join("cid0jp.json"), def).unwrap();
}

/// Write the full fixture set and return the directory.
fn full_fixture_dir(label: &str) -> PathBuf {
    let dir = fixture_dir(label);
    write_core_defs(&dir);
    write_type1_def(&dir);
    write_freesans_defs(&dir);
    write_cid0_def(&dir);
    dir
}

fn registry_for(dir: &PathBuf, object_number: u32) -> FontRegistry {
    let config = FontConfig::default().with_font_dir(dir.clone());
    FontRegistry::new(config, object_number)
}

#[test]
fn test_ten_registrations_emit_to_object_37() {
    let dir = full_fixture_dir("s5");
    let mut registry = registry_for(&dir, 1);

    registry.register("pdfasymbol", "").unwrap();
    registry.register("helvetica", "B").unwrap();
    registry.register("helvetica", "I").unwrap();
    registry.register("HelveticaBI", "").unwrap();
    registry.register("helvetica", "").unwrap();
    registry.register("freesans", "").unwrap();
    registry.register("freesans", "B").unwrap();
    registry.register("freesans", "I").unwrap();
    registry.register("freesansB", "I").unwrap();
    registry.register("cid0jp", "").unwrap();

    assert_eq!(registry.fonts().len(), 10);
    assert_eq!(registry.object_number(), 11);

    let block = registry.emit_fonts(&IdentityEncrypt).unwrap();
    assert!(!block.is_empty());
    assert_eq!(registry.object_number(), 37);
}

#[test]
fn test_emission_object_count_matches_counter() {
    let dir = full_fixture_dir("count");
    let initial = 1u32;
    let mut registry = registry_for(&dir, initial);
    registry.register("pdfasymbol", "").unwrap();
    registry.register("freesans", "").unwrap();
    registry.register("helvetica", "").unwrap();

    let block = registry.emit_fonts(&IdentityEncrypt).unwrap();
    let text = String::from_utf8_lossy(&block);
    // every allocated number since the initial counter value corresponds to
    // exactly one object in the block
    let emitted = text.matches("endobj\n").count();
    assert_eq!(registry.object_number(), initial + emitted as u32);
}

#[test]
fn test_emission_section_ordering() {
    let dir = full_fixture_dir("order");
    let mut registry = registry_for(&dir, 1);
    registry.register("pdfasymbol", "").unwrap();
    registry.register("freesans", "").unwrap();

    let block = registry.emit_fonts(&IdentityEncrypt).unwrap();
    let text = String::from_utf8_lossy(&block);
    let diff_pos = text.find("/Type /Encoding").unwrap();
    let file_pos = text.find("/Length1").unwrap();
    let font_pos = text.find("/Type /Font").unwrap();
    assert!(diff_pos < file_pos);
    assert!(file_pos < font_pos);
}

#[test]
fn test_family_suffix_key_folding() {
    let dir = full_fixture_dir("s6");
    let registry = registry_for(&dir, 1);
    let (key, family, mode) = registry.font_key("HelveticaBI", "").unwrap();
    assert_eq!(key, "helveticaBI");
    assert_eq!(family, "helvetica");
    assert_eq!(mode.key_suffix(), "BI");
}

#[test]
fn test_empty_family_is_rejected() {
    let dir = fixture_dir("s8");
    let mut registry = registry_for(&dir, 1);
    assert!(matches!(
        registry.register("", "B"),
        Err(Error::EmptyFamily)
    ));
}

#[test]
fn test_reregistration_is_deduplicated() {
    let dir = full_fixture_dir("dedup");
    let mut registry = registry_for(&dir, 1);
    let first = registry.register("freesans", "BI").unwrap();
    // BIUDO reduces to the same B/I key
    let second = registry.register("freesans", "BIUDO").unwrap();
    assert_eq!(first, second);
    assert_eq!(registry.fonts().len(), 1);
    assert_eq!(registry.object_number(), 2);
}

#[test]
fn test_missing_definition_is_not_readable() {
    let dir = fixture_dir("missing");
    let mut registry = registry_for(&dir, 1);
    assert!(matches!(
        registry.register("nosuchfamily", ""),
        Err(Error::NotReadable(_))
    ));
}

#[test]
fn test_encoding_diff_pooling() {
    let dir = fixture_dir("diffpool");
    // two distinct Type1 fonts carrying the same diff string
    for key in ["alpha", "beta"] {
        let def = format!(
            r#"{{"type":"Type1","name":"{}","enc":"WinAnsiEncoding",
                "diff":"32 /space 164 /currency","cw":{{"32":250}},
                "desc":{{"MissingWidth":250}}}}"#,
            key
        );
        fs::write(dir.join(format!("{}.json", key)), def).unwrap();
    }
    let mut registry = registry_for(&dir, 1);
    registry.register("alpha", "").unwrap();
    registry.register("beta", "").unwrap();

    let a = registry.get("alpha").unwrap().diff_n;
    let b = registry.get("beta").unwrap().diff_n;
    assert_eq!(a, Some(1));
    assert_eq!(a, b);
    assert_eq!(registry.enc_diffs().len(), 1);

    // one Encoding object, referenced by both font dictionaries
    let block = registry.emit_fonts(&IdentityEncrypt).unwrap();
    let text = String::from_utf8_lossy(&block);
    assert_eq!(text.matches("/Type /Encoding").count(), 1);
    assert_eq!(text.matches("/Encoding 4 0 R").count(), 2);
}

#[test]
fn test_font_file_pooling_across_aliases() {
    let dir = fixture_dir("filepool");
    let ttf = common::build_test_font();
    fs::write(dir.join("shared.z"), zlib(&ttf)).unwrap();
    for key in ["sharedfont", "sharedfontB"] {
        let def = format!(
            r#"{{"type":"TrueTypeUnicode","name":"Shared{}","file":"shared.z",
                "originalsize":{},"cw":{{"65":600}},"ctg":{{"65":1}},
                "desc":{{"MissingWidth":500}}}}"#,
            key, ttf.len()
        );
        fs::write(dir.join(format!("{}.json", key)), def).unwrap();
    }
    let mut registry = registry_for(&dir, 1);
    registry.register("sharedfont", "").unwrap();
    registry.register("sharedfont", "B").unwrap();
    assert_eq!(registry.files().len(), 1);

    registry.emit_fonts(&IdentityEncrypt).unwrap();
    let a = registry.get("sharedfont").unwrap().file_n;
    let b = registry.get("sharedfontB").unwrap().file_n;
    assert!(a.is_some());
    assert_eq!(a, b);
}

#[test]
fn test_subset_union_and_agreement_across_aliases() {
    let dir = fixture_dir("subsetunion");
    let ttf = common::build_test_font();
    fs::write(dir.join("shared.z"), zlib(&ttf)).unwrap();
    for key in ["unionfont", "unionfontB"] {
        let def = format!(
            r#"{{"type":"TrueTypeUnicode","name":"Union{}","file":"shared.z",
                "originalsize":{},
                "cw":{{"65":600,"66":550,"72":650}},"ctg":{{"65":1,"66":5,"72":3}},
                "desc":{{"MissingWidth":500}}}}"#,
            key, ttf.len()
        );
        fs::write(dir.join(format!("{}.json", key)), def).unwrap();
    }
    let config = FontConfig::default()
        .with_font_dir(dir.clone())
        .with_subset(true);
    let mut registry = FontRegistry::new(config, 1);
    registry.register("unionfont", "").unwrap();
    registry.register("unionfont", "B").unwrap();
    registry.mark_chars("unionfont", [65]).unwrap();
    registry.mark_chars("unionfontB", [66]).unwrap();

    registry.emit_fonts(&IdentityEncrypt).unwrap();
    let group = &registry.files()[0];
    assert!(group.subset);
    let union: Vec<u32> = group.subsetchars.iter().copied().collect();
    assert_eq!(union, vec![65, 66]);
}

#[test]
fn test_subset_disagreement_embeds_full_file() {
    let dir = fixture_dir("subsetveto");
    let ttf = common::build_test_font();
    fs::write(dir.join("shared.z"), zlib(&ttf)).unwrap();
    for key in ["vetofont", "vetofontB"] {
        let def = format!(
            r#"{{"type":"TrueTypeUnicode","name":"Veto{}","file":"shared.z",
                "originalsize":{},"cw":{{"65":600}},"ctg":{{"65":1}},
                "desc":{{"MissingWidth":500}}}}"#,
            key, ttf.len()
        );
        fs::write(dir.join(format!("{}.json", key)), def).unwrap();
    }
    let config = FontConfig::default().with_font_dir(dir.clone());
    let mut registry = FontRegistry::new(config, 1);
    // one alias opts in, the other does not: the file must not be subset
    registry
        .register_with("vetofont", "", None, Some(true))
        .unwrap();
    registry
        .register_with("vetofont", "B", None, Some(false))
        .unwrap();

    let block = registry.emit_fonts(&IdentityEncrypt).unwrap();
    assert!(!registry.files()[0].subset);
    let text = String::from_utf8_lossy(&block);
    // full embedding keeps the original uncompressed length
    assert!(text.contains(&format!("/Length1 {}", ttf.len())));
}

#[test]
fn test_subset_embedding_rewrites_file_stream() {
    let dir = fixture_dir("subsetfile");
    let ttf = common::build_test_font();
    fs::write(dir.join("solo.z"), zlib(&ttf)).unwrap();
    let def = format!(
        r#"{{"type":"TrueTypeUnicode","name":"Solo","file":"solo.z",
            "originalsize":{},
            "cw":{{"65":600,"66":550,"67":620,"72":650,"120":450}},
            "ctg":{{"65":1,"66":5,"67":4,"72":3,"120":2}},
            "desc":{{"MissingWidth":500}}}}"#,
        ttf.len()
    );
    fs::write(dir.join("solofont.json"), def).unwrap();

    let config = FontConfig::default()
        .with_font_dir(dir.clone())
        .with_subset(true);
    let mut registry = FontRegistry::new(config, 1);
    registry.register("solofont", "").unwrap();
    registry.mark_chars("solofont", [65]).unwrap();

    let block = registry.emit_fonts(&IdentityEncrypt).unwrap();
    let text = String::from_utf8_lossy(&block);
    // the subset sfnt is smaller than the original
    let length1: usize = text
        .split("/Length1 ")
        .nth(1)
        .unwrap()
        .split(' ')
        .next()
        .unwrap()
        .parse()
        .unwrap();
    assert!(length1 < ttf.len());
    // the subset tag prefixes the base font name
    let base = text.split("/BaseFont /").nth(1).unwrap();
    assert_eq!(base.as_bytes()[6], b'+');
    assert!(base.starts_with(|c: char| c.is_ascii_uppercase()));
}

#[test]
fn test_truetype_unicode_dictionary_chain() {
    let dir = full_fixture_dir("ttuchain");
    let mut registry = registry_for(&dir, 1);
    registry.register("freesans", "").unwrap();

    let block = registry.emit_fonts(&IdentityEncrypt).unwrap();
    let text = String::from_utf8_lossy(&block);
    assert!(text.contains("/Subtype /Type0"));
    assert!(text.contains("/Encoding /Identity-H"));
    assert!(text.contains("/Subtype /CIDFontType2"));
    assert!(text.contains("/CIDToGIDMap"));
    assert!(text.contains("/ToUnicode"));
    assert!(text.contains("beginbfrange"));
    assert!(text.contains("/FontFile2"));
    assert!(text.contains("/W ["));
}

#[test]
fn test_cid0_dictionary_chain() {
    let dir = full_fixture_dir("cid0chain");
    let mut registry = registry_for(&dir, 1);
    registry.register("cid0jp", "").unwrap();

    let block = registry.emit_fonts(&IdentityEncrypt).unwrap();
    let text = String::from_utf8_lossy(&block);
    assert!(text.contains("/BaseFont /KozMinPro-Regular-Acro-UniJIS-UCS2-H"));
    assert!(text.contains("/Subtype /CIDFontType0"));
    assert!(text.contains("/Registry (Adobe) /Ordering (Japan1) /Supplement 5"));
    assert!(text.contains("/DW 1000"));
    // no embedded file for an external collection
    assert!(!text.contains("/FontFile"));
}

#[test]
fn test_linked_mode_skips_font_files() {
    let dir = full_fixture_dir("linked");
    let config = FontConfig::default()
        .with_font_dir(dir.clone())
        .with_linked(true);
    let mut registry = FontRegistry::new(config, 1);
    registry.register("freesans", "").unwrap();

    let block = registry.emit_fonts(&IdentityEncrypt).unwrap();
    let text = String::from_utf8_lossy(&block);
    assert!(!text.contains("/Length1"));
    assert!(!text.contains("/FontFile2"));
}
