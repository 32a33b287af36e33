// SPDX-License-Identifier: GPL-3.0-or-later
//! Text rendering using the [fontdue] crate.
//!
//! Text is rendered to opacity masks ([`GrayImage`]) which are then flattened onto rasters with
//! [`super::layer::blend_mask`].
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context as _};
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};
use image::{GrayImage, Luma};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

pub(crate) const DEFAULT_FONT_SIZE: f32 = 12.0;

// The hot spot label changes a few times a second, but tends to bounce between a handful of
// values, so a small cache covers it.
const MASK_CACHE_SIZE: usize = 32;

/// DejaVu Sans, so there's always something to draw labels and messages with.
pub(super) const DEJA_VU_SANS: &[u8] = include_bytes!("DejaVuSans.ttf");

/// Key for cached masks: the text, and how many blank lines and spaces it's padded with.
type MaskKey = (String, usize, usize);

pub(crate) struct TextRenderer {
    font: Font,
    size: f32,
    layout: Mutex<Layout>,
    cache: Mutex<LruCache<MaskKey, Arc<GrayImage>>>,
}

impl TextRenderer {
    pub(crate) fn from_bytes(data: Vec<u8>, size: f32) -> anyhow::Result<Self> {
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|err| anyhow!("Unable to parse font: {}", err))?;
        Ok(Self {
            font,
            size,
            layout: Mutex::new(Layout::new(CoordinateSystem::PositiveYDown)),
            cache: Mutex::new(LruCache::new(MASK_CACHE_SIZE)),
        })
    }

    /// The built in font at the given size.
    pub(crate) fn bundled(size: f32) -> anyhow::Result<Self> {
        Self::from_bytes(DEJA_VU_SANS.to_vec(), size)
    }

    pub(crate) fn from_path(path: &Path, size: f32) -> anyhow::Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Unable to read font file {}", path.display()))?;
        let renderer = Self::from_bytes(data, size)
            .with_context(|| format!("Invalid font file {}", path.display()))?;
        debug!(path = %path.display(), size, "loaded font");
        Ok(renderer)
    }

    /// The height of a single line of text.
    pub(crate) fn line_height(&self) -> f32 {
        self.font
            .horizontal_line_metrics(self.size)
            .map(|metrics| metrics.new_line_size)
            .unwrap_or(self.size)
    }

    fn space_width(&self) -> f32 {
        self.font.metrics(' ', self.size).advance_width
    }

    /// Render `text` into an opacity mask just large enough to hold it.
    pub(crate) fn render(&self, text: &str) -> Arc<GrayImage> {
        self.render_padded(text, 0, 0)
    }

    /// Render `text` with `lines` blank lines above it and `spaces` spaces before it.
    ///
    /// The padding is part of the mask, so it shifts the text away from whatever point the mask
    /// is later centered on.
    pub(crate) fn render_padded(&self, text: &str, lines: usize, spaces: usize) -> Arc<GrayImage> {
        let key = (text.to_string(), lines, spaces);
        let mut cache = self.cache.lock();
        if let Some(mask) = cache.get(&key) {
            return Arc::clone(mask);
        }
        trace!(text, "text mask cache miss");
        let mask = Arc::new(self.rasterize(
            text,
            spaces as f32 * self.space_width(),
            lines as f32 * self.line_height(),
        ));
        cache.put(key, Arc::clone(&mask));
        mask
    }

    fn rasterize(&self, text: &str, offset_x: f32, offset_y: f32) -> GrayImage {
        let mut layout = self.layout.lock();
        layout.reset(&LayoutSettings {
            x: offset_x,
            y: offset_y,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(text, self.size, 0));
        let glyphs = layout.glyphs().clone();
        let width = glyphs
            .iter()
            .map(|glyph| glyph.x.max(0.0) + glyph.width as f32)
            .fold(offset_x, f32::max)
            .ceil()
            .max(1.0) as u32;
        let height = glyphs
            .iter()
            .map(|glyph| glyph.y.max(0.0) + glyph.height as f32)
            .fold(offset_y + layout.height(), f32::max)
            .ceil()
            .max(1.0) as u32;
        let mut mask = GrayImage::new(width, height);
        for glyph in glyphs.iter() {
            let (metrics, bitmap) = self.font.rasterize_config(glyph.key);
            let origin_x = glyph.x.max(0.0) as u32;
            let origin_y = glyph.y.max(0.0) as u32;
            for (index, coverage) in bitmap.iter().enumerate() {
                let x = origin_x + (index % metrics.width) as u32;
                let y = origin_y + (index / metrics.width) as u32;
                if x < width && y < height {
                    let Luma([existing]) = mask.get_pixel(x, y);
                    let merged = (*existing).max(*coverage);
                    mask.put_pixel(x, y, Luma([merged]));
                }
            }
        }
        mask
    }
}

impl fmt::Debug for TextRenderer {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        // fontdue::layout::Layout doesn't implement Debug.
        fmt.debug_struct("TextRenderer")
            .field("font", &self.font)
            .field("size", &self.size)
            .field("layout", &"Mutex<Layout>")
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::path::Path;
    use std::sync::Arc;

    use super::{TextRenderer, DEFAULT_FONT_SIZE};

    /// The built in font at the default size.
    pub(crate) fn bundled_renderer() -> TextRenderer {
        TextRenderer::bundled(DEFAULT_FONT_SIZE).unwrap()
    }

    #[test]
    fn garbage_font() {
        assert!(TextRenderer::from_bytes(vec![0, 1, 2, 3], DEFAULT_FONT_SIZE).is_err());
    }

    #[test]
    fn missing_font_file() {
        let missing = Path::new("/nonexistent/font.ttf");
        assert!(TextRenderer::from_path(missing, DEFAULT_FONT_SIZE).is_err());
    }

    #[test]
    fn full_font_file() {
        // A font with a complete character map, loaded the same way a configured font is.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DejaVuSans.ttf");
        std::fs::write(&path, super::DEJA_VU_SANS).unwrap();
        let renderer = TextRenderer::from_path(&path, DEFAULT_FONT_SIZE).unwrap();
        let mask = renderer.render("Screenshot saved as 0001.png");
        assert!(mask.pixels().any(|pixel| pixel.0[0] > 0));
    }

    #[test]
    fn mask_has_ink() {
        let renderer = bundled_renderer();
        let mask = renderer.render("36.6C");
        assert!(mask.width() > 1);
        assert!(mask.pixels().any(|pixel| pixel.0[0] > 0));
    }

    #[test]
    fn unmapped_characters() {
        // Characters the font doesn't have map to glyph zero.
        let renderer = bundled_renderer();
        let mask = renderer.render("\u{e000}\u{10fffd}");
        assert!(mask.width() >= 1);
    }

    #[test]
    fn padding_grows_mask() {
        let renderer = bundled_renderer();
        let plain = renderer.render("40.0C");
        let padded = renderer.render_padded("40.0C", 1, 6);
        assert!(padded.width() > plain.width());
        assert!(padded.height() > plain.height());
    }

    #[test]
    fn cached() {
        let renderer = bundled_renderer();
        let first = renderer.render("12.3C");
        let second = renderer.render("12.3C");
        assert!(Arc::ptr_eq(&first, &second));
    }
}
