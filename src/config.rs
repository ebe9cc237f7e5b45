//! Configuration for font import and embedding.

use std::path::PathBuf;

/// Font engine configuration.
///
/// Controls how fonts are imported, which cmap subtable is selected for
/// TrueType parsing, and how embedded streams are produced.
#[derive(Debug, Clone)]
pub struct FontConfig {
    /// Embed only the glyphs actually used in the document.
    pub subset: bool,

    /// Import TrueType fonts with full Unicode coverage (Identity-H).
    pub unicode: bool,

    /// PDF/A mode: force embedding, forbid CID Type 0 references.
    pub pdfa: bool,

    /// Flate-compress generated streams.
    pub compress: bool,

    /// cmap platform ID to select (3 = Windows).
    pub platform_id: u16,

    /// cmap encoding ID to select (1 = Unicode BMP).
    pub encoding_id: u16,

    /// Link the original font file instead of embedding a copy.
    ///
    /// Only meant for testing and workflows that cannot be PDF/A.
    pub linked: bool,

    /// Directory where imported font definitions are written.
    pub output_path: Option<PathBuf>,

    /// Directories searched for font definition JSON files.
    pub font_dirs: Vec<PathBuf>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FontConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self {
            subset: false,
            unicode: true,
            pdfa: false,
            compress: true,
            platform_id: 3,
            encoding_id: 1,
            linked: false,
            output_path: None,
            font_dirs: Vec::new(),
        }
    }

    /// Enable or disable glyph subsetting.
    pub fn with_subset(mut self, enable: bool) -> Self {
        self.subset = enable;
        self
    }

    /// Enable or disable Unicode (Identity-H) import.
    pub fn with_unicode(mut self, enable: bool) -> Self {
        self.unicode = enable;
        self
    }

    /// Enable or disable PDF/A mode.
    pub fn with_pdfa(mut self, enable: bool) -> Self {
        self.pdfa = enable;
        self
    }

    /// Enable or disable stream compression.
    pub fn with_compress(mut self, enable: bool) -> Self {
        self.compress = enable;
        self
    }

    /// Select the cmap subtable to process.
    pub fn with_cmap_encoding(mut self, platform_id: u16, encoding_id: u16) -> Self {
        self.platform_id = platform_id;
        self.encoding_id = encoding_id;
        self
    }

    /// Link font files instead of embedding them.
    pub fn with_linked(mut self, enable: bool) -> Self {
        self.linked = enable;
        self
    }

    /// Set the output directory for imported definitions.
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Add a directory to the definition search path.
    pub fn with_font_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.font_dirs.push(dir.into());
        self
    }
}
