//! Font registry and pooled resources.
//!
//! The registry deduplicates fonts by a normalized key, pools encoding
//! difference strings, and groups fonts that embed the same font file so the
//! file stream is emitted once. It also owns the shared PDF object-number
//! counter: each registration allocates the number of its Font resource, and
//! emission continues from the same counter.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::config::FontConfig;
use crate::error::{Error, Result};
use crate::fonts::definition::{self, CORE_FAMILIES};
use crate::fonts::entry::{FontEntry, StyleFlags};

/// Fonts sharing one embedded font file.
#[derive(Debug, Clone)]
pub struct FileGroup {
    /// Registry keys of the fonts using this file.
    pub keys: Vec<String>,
    /// Directory the file lives in.
    pub dir: PathBuf,
    /// File name within `dir`.
    pub file: String,
    /// `/Length1` of the embedded stream.
    pub length1: i64,
    /// `/Length2` of the embedded stream (Type 1 only).
    pub length2: Option<i64>,
    /// Subset-embed the file; true only when every alias agrees.
    pub subset: bool,
    /// Union of the subset characters of every alias, filled at emission.
    pub subsetchars: BTreeSet<u32>,
    /// Object number of the emitted stream.
    pub n: Option<u32>,
}

/// Keyed font registry with pooled encoding differences and font files.
#[derive(Debug)]
pub struct FontRegistry {
    pub(crate) config: FontConfig,
    pub(crate) fonts: Vec<FontEntry>,
    pub(crate) by_key: HashMap<String, usize>,
    pub(crate) enc_diffs: Vec<String>,
    pub(crate) files: Vec<FileGroup>,
    pub(crate) file_index: HashMap<String, usize>,
    pub(crate) pon: u32,
}

impl FontRegistry {
    /// Create a registry whose object numbering continues from
    /// `object_number`.
    pub fn new(config: FontConfig, object_number: u32) -> Self {
        Self {
            config,
            fonts: Vec::new(),
            by_key: HashMap::new(),
            enc_diffs: Vec::new(),
            files: Vec::new(),
            file_index: HashMap::new(),
            pon: object_number,
        }
    }

    /// The configuration this registry was created with.
    pub fn config(&self) -> &FontConfig {
        &self.config
    }

    /// Current value of the shared object-number counter.
    pub fn object_number(&self) -> u32 {
        self.pon
    }

    /// Registered fonts, in registration order.
    pub fn fonts(&self) -> &[FontEntry] {
        &self.fonts
    }

    /// Pooled encoding-difference strings.
    pub fn enc_diffs(&self) -> &[String] {
        &self.enc_diffs
    }

    /// Pooled font-file groups, in first-reference order.
    pub fn files(&self) -> &[FileGroup] {
        &self.files
    }

    /// Derive the registry key for a family and style.
    ///
    /// The family is lowercased and reduced to `[a-z0-9_-]`. A trailing `I`
    /// or `B` folds into the style, the standard symbolic families ignore
    /// styles entirely, and under PDF/A the standard families are redirected
    /// to their embedded `pdfa`-prefixed variants. The key is the family plus
    /// a `B`/`I` suffix in canonical order.
    pub fn font_key(&self, family: &str, style: &str) -> Result<(String, String, StyleFlags)> {
        let mut family: String = family
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
            .collect();
        if family.is_empty() {
            return Err(Error::EmptyFamily);
        }
        let mut mode = StyleFlags::parse(style);
        if family == "symbol" || family == "zapfdingbats" {
            mode = StyleFlags::default();
        } else {
            if family.ends_with('i') && family.len() > 1 {
                family.pop();
                mode.italic = true;
            }
            if family.ends_with('b') && family.len() > 1 {
                family.pop();
                mode.bold = true;
            }
        }
        if self.config.pdfa && CORE_FAMILIES.contains(&family.as_str()) {
            family.insert_str(0, "pdfa");
        }
        let key = format!("{}{}", family, mode.key_suffix());
        Ok((key, family, mode))
    }

    /// Register a font, returning its key. Re-registering an existing key is
    /// a no-op returning the same key.
    pub fn register(&mut self, family: &str, style: &str) -> Result<String> {
        self.register_with(family, style, None, None)
    }

    /// Register a font with an explicit definition file and/or subset
    /// override.
    pub fn register_with(
        &mut self,
        family: &str,
        style: &str,
        ifile: Option<&Path>,
        subset: Option<bool>,
    ) -> Result<String> {
        let (key, family, mode) = self.font_key(family, style)?;
        if self.by_key.contains_key(&key) {
            return Ok(key);
        }
        let subset = subset.unwrap_or(self.config.subset);
        let entry = definition::load_font(&key, &family, mode, subset, ifile, &self.config)?;
        Ok(self.add_entry(entry))
    }

    /// Run the registration bookkeeping for a loaded entry: allocate its
    /// index and object number and pool its diff string and font file.
    fn add_entry(&mut self, mut entry: FontEntry) -> String {
        let key = entry.key.clone();
        entry.i = self.fonts.len() + 1;
        self.pon += 1;
        entry.n = Some(self.pon);

        if !entry.diff.is_empty() {
            let idx = match self.enc_diffs.iter().position(|d| d == &entry.diff) {
                Some(idx) => idx,
                None => {
                    self.enc_diffs.push(entry.diff.clone());
                    self.enc_diffs.len() - 1
                }
            };
            entry.diff_n = Some(idx + 1);
        }

        if !entry.file.is_empty() {
            let path_key = entry.dir.join(&entry.file).display().to_string();
            match self.file_index.get(&path_key) {
                Some(&fi) => {
                    let group = &mut self.files[fi];
                    group.keys.push(key.clone());
                    group.subset = group.subset && entry.subset;
                }
                None => {
                    self.file_index.insert(path_key, self.files.len());
                    self.files.push(FileGroup {
                        keys: vec![key.clone()],
                        dir: entry.dir.clone(),
                        file: entry.file.clone(),
                        length1: entry.length1,
                        length2: entry.length2,
                        subset: entry.subset,
                        subsetchars: BTreeSet::new(),
                        n: None,
                    });
                }
            }
        }

        log::debug!(
            "registered font {} as /F{} object {}",
            key,
            entry.i,
            self.pon
        );
        self.by_key.insert(key.clone(), self.fonts.len());
        self.fonts.push(entry);
        key
    }

    /// Insert a ready-made entry, running the same pooling bookkeeping as
    /// [`FontRegistry::register_with`]. Test-only: production entries come
    /// from loaded definitions.
    #[cfg(test)]
    pub(crate) fn insert_entry(&mut self, entry: FontEntry) -> String {
        self.add_entry(entry)
    }

    /// Look up a registered font.
    pub fn get(&self, key: &str) -> Result<&FontEntry> {
        self.by_key
            .get(key)
            .map(|&i| &self.fonts[i])
            .ok_or_else(|| Error::MissingFont(key.to_string()))
    }

    /// Record characters as used with a font, growing its subset set.
    pub fn mark_chars<I: IntoIterator<Item = u32>>(&mut self, key: &str, codes: I) -> Result<()> {
        let &i = self
            .by_key
            .get(key)
            .ok_or_else(|| Error::MissingFont(key.to_string()))?;
        self.fonts[i].subsetchars.extend(codes);
        Ok(())
    }
}
