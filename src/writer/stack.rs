//! Active-font stack with derived-metric caching.
//!
//! Text producers push a `(font, size, spacing, stretching)` frame before
//! writing and pop it afterwards. Omitted frame values inherit from the
//! frame below (or the 10pt / 0 / 1 defaults on an empty stack). Scaled
//! metrics are cached per full frame tuple and survive pops, so alternating
//! between two fonts does not recompute their widths.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use crate::config::FontConfig;
use crate::error::{Error, Result};
use crate::writer::registry::FontRegistry;

/// Default font size in points.
const DEFAULT_SIZE: f64 = 10.0;
/// Soft hyphen, rendered zero-width.
const SOFT_HYPHEN: u32 = 173;

/// One active-font frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StackFrame {
    /// Registry key of the selected font.
    pub key: String,
    /// Canonical style string of the selected font.
    pub style: String,
    /// Font size in points.
    pub size: f64,
    /// Extra inter-character spacing.
    pub spacing: f64,
    /// Horizontal stretching factor.
    pub stretching: f64,
}

/// Metrics of a font scaled to a specific frame tuple.
///
/// Horizontal quantities are multiplied by `wratio`
/// (`size / 1000 * stretching`), vertical quantities by `cratio`
/// (`size / 1000`).
#[derive(Debug, Clone)]
pub struct ScaledMetrics {
    /// The text-object font selection command.
    pub out: String,
    /// Font size in user units (`size / kunit`).
    pub unit_size: f64,
    /// Vertical scale ratio.
    pub cratio: f64,
    /// Horizontal scale ratio.
    pub wratio: f64,
    /// Scaled character widths.
    pub cw: BTreeMap<u32, f64>,
    /// Scaled character bounding boxes.
    pub cbbox: BTreeMap<u32, [f64; 4]>,
    /// Scaled font bounding box.
    pub fbbox: [f64; 4],
    /// Scaled default width.
    pub dw: f64,
    /// Scaled ascent.
    pub ascent: f64,
    /// Scaled descent.
    pub descent: f64,
    /// Scaled underline position.
    pub up: f64,
    /// Scaled underline thickness.
    pub ut: f64,
    /// Scaled average width.
    pub avg_width: f64,
    /// Scaled maximum width.
    pub max_width: f64,
    /// Scaled missing-character width.
    pub missing_width: f64,
    /// Frame spacing, for width accumulation.
    pub spacing: f64,
    /// Frame stretching, for width accumulation.
    pub stretching: f64,
}

/// LIFO stack of active fonts over a [`FontRegistry`].
#[derive(Debug)]
pub struct FontStack {
    registry: FontRegistry,
    stack: Vec<StackFrame>,
    cache: HashMap<String, Arc<ScaledMetrics>>,
    kunit: f64,
}

impl FontStack {
    /// Create a stack over a fresh registry.
    ///
    /// `kunit` is the document unit in points and scales `unit_size`.
    pub fn new(config: FontConfig, object_number: u32, kunit: f64) -> Self {
        Self::with_registry(FontRegistry::new(config, object_number), kunit)
    }

    /// Create a stack over an existing registry.
    pub fn with_registry(registry: FontRegistry, kunit: f64) -> Self {
        Self {
            registry,
            stack: Vec::new(),
            cache: HashMap::new(),
            kunit: if kunit > 0.0 { kunit } else { 1.0 },
        }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }

    /// The underlying registry, mutably (for emission).
    pub fn registry_mut(&mut self) -> &mut FontRegistry {
        &mut self.registry
    }

    /// The current top frame.
    pub fn current(&self) -> Option<&StackFrame> {
        self.stack.last()
    }

    /// Push a font frame.
    ///
    /// `families` may list several comma-separated families; the first one
    /// that registers wins. `None` for size, spacing or stretching inherits
    /// from the current top frame, or the defaults on an empty stack.
    pub fn push(
        &mut self,
        families: &str,
        style: &str,
        size: Option<f64>,
        spacing: Option<f64>,
        stretching: Option<f64>,
        subset: Option<bool>,
    ) -> Result<&StackFrame> {
        let size = size.unwrap_or_else(|| self.current().map_or(DEFAULT_SIZE, |f| f.size));
        let spacing = spacing.unwrap_or_else(|| self.current().map_or(0.0, |f| f.spacing));
        let stretching = stretching.unwrap_or_else(|| self.current().map_or(1.0, |f| f.stretching));

        let mut selected = None;
        let mut last_err = Error::EmptyFamily;
        for family in families.split(',') {
            match self
                .registry
                .register_with(family.trim(), style, None, subset)
            {
                Ok(key) => {
                    selected = Some(key);
                    break;
                }
                Err(err) => {
                    log::debug!("font {} unavailable: {}", family.trim(), err);
                    last_err = err;
                }
            }
        }
        let Some(key) = selected else {
            return Err(last_err);
        };
        let style = self.registry.get(&key)?.style.clone();
        self.stack.push(StackFrame {
            key,
            style,
            size,
            spacing,
            stretching,
        });
        Ok(self.stack.last().expect("frame just pushed"))
    }

    /// Pop the top frame.
    pub fn pop(&mut self) -> Option<StackFrame> {
        self.stack.pop()
    }

    /// Scaled metrics of the current frame.
    pub fn metrics(&mut self) -> Result<Arc<ScaledMetrics>> {
        let frame = self
            .stack
            .last()
            .cloned()
            .ok_or_else(|| Error::MissingFont("font stack is empty".to_string()))?;
        self.metrics_for(&frame)
    }

    /// Scaled metrics for an arbitrary frame, cached by the frame tuple.
    pub fn metrics_for(&mut self, frame: &StackFrame) -> Result<Arc<ScaledMetrics>> {
        let cache_key = format!(
            "{}:{}:{}:{}",
            frame.key, frame.size, frame.spacing, frame.stretching
        );
        if let Some(metrics) = self.cache.get(&cache_key) {
            return Ok(Arc::clone(metrics));
        }

        let font = self.registry.get(&frame.key)?;
        let unit_size = frame.size / self.kunit;
        let cratio = frame.size / 1000.0;
        let wratio = cratio * frame.stretching;

        let cw = font
            .cw
            .iter()
            .map(|(&c, &w)| (c, w as f64 * wratio))
            .collect();
        let cbbox = font
            .cbbox
            .iter()
            .map(|(&c, &b)| {
                (
                    c,
                    [
                        b[0] as f64 * wratio,
                        b[1] as f64 * cratio,
                        b[2] as f64 * wratio,
                        b[3] as f64 * cratio,
                    ],
                )
            })
            .collect();
        let fb = font.desc.font_bbox;
        let metrics = Arc::new(ScaledMetrics {
            out: format!("BT /F{} {:.6} Tf ET\r", font.i, frame.size),
            unit_size,
            cratio,
            wratio,
            cw,
            cbbox,
            fbbox: [
                fb[0] as f64 * wratio,
                fb[1] as f64 * cratio,
                fb[2] as f64 * wratio,
                fb[3] as f64 * cratio,
            ],
            dw: font.dw as f64 * wratio,
            ascent: font.desc.ascent as f64 * cratio,
            descent: font.desc.descent as f64 * cratio,
            up: font.up as f64 * cratio,
            ut: font.ut as f64 * cratio,
            avg_width: font.desc.avg_width as f64 * wratio,
            max_width: font.desc.max_width as f64 * wratio,
            missing_width: font.desc.missing_width as f64 * wratio,
            spacing: frame.spacing,
            stretching: frame.stretching,
        });
        self.cache.insert(cache_key, Arc::clone(&metrics));
        Ok(metrics)
    }

    /// Width of a single code point in the current frame.
    ///
    /// The soft hyphen measures zero; unmapped characters take the default
    /// width.
    pub fn char_width(&mut self, code: u32) -> Result<f64> {
        let metrics = self.metrics()?;
        Ok(scaled_char_width(&metrics, code))
    }

    /// Total width of a code-point sequence, including inter-character
    /// spacing.
    pub fn text_width(&mut self, codes: &[u32]) -> Result<f64> {
        let metrics = self.metrics()?;
        let mut width: f64 = codes.iter().map(|&c| scaled_char_width(&metrics, c)).sum();
        if codes.len() > 1 {
            width += metrics.spacing * metrics.stretching * (codes.len() - 1) as f64;
        }
        Ok(width)
    }

    /// Width taken by the spaces of a code-point sequence, including the
    /// spacing between them.
    pub fn spaces_width(&mut self, codes: &[u32]) -> Result<f64> {
        let metrics = self.metrics()?;
        let spaces = codes.iter().filter(|&&c| c == 32).count();
        let mut width = spaces as f64 * scaled_char_width(&metrics, 32);
        if spaces > 1 {
            width += metrics.spacing * metrics.stretching * (spaces - 1) as f64;
        }
        Ok(width)
    }

    /// Whether the current font defines a metric for `code`.
    pub fn is_char_defined(&self, code: u32) -> Result<bool> {
        let frame = self
            .stack
            .last()
            .ok_or_else(|| Error::MissingFont("font stack is empty".to_string()))?;
        Ok(self.registry.get(&frame.key)?.cw.contains_key(&code))
    }

    /// Replace characters missing from the current font using a substitution
    /// table. The first alternate the font defines wins; codes with no
    /// defined alternate are kept.
    pub fn replace_missing_chars(
        &self,
        codes: &mut [u32],
        subs: &BTreeMap<u32, Vec<u32>>,
    ) -> Result<()> {
        let frame = self
            .stack
            .last()
            .ok_or_else(|| Error::MissingFont("font stack is empty".to_string()))?;
        let cw = &self.registry.get(&frame.key)?.cw;
        for code in codes.iter_mut() {
            if !cw.contains_key(code) {
                if let Some(alternates) = subs.get(code) {
                    if let Some(&alt) = alternates.iter().find(|alt| cw.contains_key(alt)) {
                        *code = alt;
                    }
                }
            }
        }
        Ok(())
    }

    /// Record the characters of `codes` as used with the current font, for
    /// subsetting.
    pub fn mark_used(&mut self, codes: &[u32]) -> Result<()> {
        let key = self
            .stack
            .last()
            .map(|f| f.key.clone())
            .ok_or_else(|| Error::MissingFont("font stack is empty".to_string()))?;
        self.registry.mark_chars(&key, codes.iter().copied())
    }

    /// Register a font without pushing it, forwarding to the registry.
    pub fn register(&mut self, family: &str, style: &str) -> Result<String> {
        self.registry.register(family, style)
    }

    /// Register a font from an explicit definition file.
    pub fn register_file(&mut self, family: &str, style: &str, ifile: &Path) -> Result<String> {
        self.registry.register_with(family, style, Some(ifile), None)
    }
}

fn scaled_char_width(metrics: &ScaledMetrics, code: u32) -> f64 {
    if code == SOFT_HYPHEN {
        return 0.0;
    }
    metrics.cw.get(&code).copied().unwrap_or(metrics.dw)
}
