//! The pre-provider font layout: a fixed ASCII page plus 256-character unicode pages.

use crate::mask::{BitmapMask, Rect};
use crate::provider::{self, ResourceId, ResourceRoot, load_atlas, register_or_warn};
use crate::registry::GlyphRegistry;
use fs_err as fs;
use log::{debug, warn};
use std::io::ErrorKind;

pub const NAMESPACE: &str = "minecraft";
pub const HEIGHT: u32 = 8;
pub const ASCENT: i32 = 7;
pub const SPACE_WIDTH: f64 = 4.0;

/// Pages of UTF-16 surrogates never have a texture.
const SURROGATE_PAGES: std::ops::RangeInclusive<u32> = 0xD8..=0xDF;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegacyStats {
    pub ascii: usize,
    pub unicode: usize,
}

/// Horizontal ink span of a unicode-page cell, packed as `start << 4 | end` in sixteenths.
///
/// Returns the crop `[start, end)` in cell pixels, or `None` if the byte has no usable span.
pub fn glyph_span(byte: u8, cell_width: u32) -> Option<(u32, u32)> {
    let start = (byte >> 4) as u32;
    let end = (byte & 0xF) as u32;
    if end <= start {
        return None;
    }
    Some((start * cell_width / 16, (end + 1) * cell_width / 16))
}

fn cell(atlas: &BitmapMask, index: u32) -> (Rect, u32) {
    let (cell_w, cell_h) = (atlas.width() / 16, atlas.height() / 16);
    let rect = Rect::new((index % 16) * cell_w, (index / 16) * cell_h, cell_w, cell_h);
    (rect, cell_w)
}

fn id(path: String) -> ResourceId {
    ResourceId::new(NAMESPACE, path)
}

/// Register every glyph of the legacy layout under `root`.
pub fn load_legacy(
    registry: &mut GlyphRegistry,
    root: &ResourceRoot,
) -> anyhow::Result<LegacyStats> {
    provider::register_notdef(registry)?;
    registry.register_space(' ', SPACE_WIDTH);

    let mut stats = LegacyStats::default();

    let ascii_path = root.texture(&id("font/ascii.png".into()));
    let ascii = if ascii_path.is_file() {
        load_atlas(&ascii_path)
            .inspect_err(|e| warn!("Skipping ASCII page: {e:#}"))
            .ok()
    } else {
        warn!("Missing ASCII page {}", ascii_path.display());
        None
    };
    if let Some(atlas) = ascii {
        for index in 0..256u32 {
            if index == 32 {
                continue;
            }
            let Some(c) = char::from_u32(index) else {
                continue;
            };
            let (rect, _) = cell(&atlas, index);
            let glyph = atlas.crop(rect);
            if !glyph.is_empty() && register_or_warn(registry, c, &glyph, HEIGHT, ASCENT) {
                stats.ascii += 1;
            }
        }
    }
    debug!("Loaded {} ASCII characters", stats.ascii);

    let sizes_path = root.asset(&id("font/glyph_sizes.bin".into()));
    let glyph_sizes = match fs::read(&sizes_path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Ignoring glyph sizes: {e}");
            None
        }
    };

    for page in 0x01..=0xFFu32 {
        if SURROGATE_PAGES.contains(&page) {
            continue;
        }
        let path = root.texture(&id(format!("font/unicode_page_{page:02x}.png")));
        if !path.is_file() {
            continue;
        }
        let atlas = match load_atlas(&path) {
            Ok(atlas) => atlas,
            Err(e) => {
                warn!("Skipping unicode page {page:02x}: {e:#}");
                continue;
            }
        };

        for index in 0..256u32 {
            let code_point = page * 256 + index;
            let Some(c) = char::from_u32(code_point) else {
                continue;
            };
            if registry.contains(c.into()) {
                continue;
            }

            let (mut rect, cell_w) = cell(&atlas, index);
            let span = glyph_sizes
                .as_ref()
                .and_then(|sizes| sizes.get(code_point as usize))
                .and_then(|byte| glyph_span(*byte, cell_w));
            if let Some((start, end)) = span {
                rect.x += start;
                rect.w = end - start;
            }

            let glyph = atlas.crop(rect);
            if !glyph.is_empty() && register_or_warn(registry, c, &glyph, HEIGHT, ASCENT) {
                stats.unicode += 1;
            }
        }
    }
    debug!("Loaded {} unicode characters", stats.unicode);

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CharacterKey;
    use crate::style::StyleVariant;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use image::{Rgba, RgbaImage};

    const INK: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn texture_root() -> TempDir {
        let tmp = TempDir::new().unwrap();
        tmp.child("minecraft/textures/font").create_dir_all().unwrap();
        tmp.child("minecraft/font").create_dir_all().unwrap();
        tmp
    }

    /// A 128x128 page with a full-height bar at `x_in_cell` in the cell for `index`.
    fn page_with_bar(index: u32, x_in_cell: u32) -> RgbaImage {
        let mut image = RgbaImage::new(128, 128);
        let (x0, y0) = ((index % 16) * 8, (index / 16) * 8);
        for y in 0..7 {
            image.put_pixel(x0 + x_in_cell, y0 + y, INK);
        }
        image
    }

    #[test]
    fn glyph_span_uses_sixteenths_of_the_cell() {
        assert_eq!(glyph_span(0x0F, 16), Some((0, 16)));
        assert_eq!(glyph_span(0x27, 16), Some((2, 8)));
        assert_eq!(glyph_span(0x27, 8), Some((1, 4)));
        assert_eq!(glyph_span(0x00, 16), None);
        assert_eq!(glyph_span(0x52, 16), None);
    }

    #[test]
    fn loads_ascii_and_unicode_pages() {
        let tmp = texture_root();
        page_with_bar(b'!' as u32, 0)
            .save(tmp.child("minecraft/textures/font/ascii.png").path())
            .unwrap();
        // U+0141 on page 01, bar in the right half of its cell.
        page_with_bar(0x41, 6)
            .save(tmp.child("minecraft/textures/font/unicode_page_01.png").path())
            .unwrap();
        let mut sizes = vec![0u8; 0x142];
        sizes[0x141] = 0x8F;
        tmp.child("minecraft/font/glyph_sizes.bin")
            .write_binary(&sizes)
            .unwrap();

        let mut registry = GlyphRegistry::new();
        let stats = load_legacy(&mut registry, &ResourceRoot::new(tmp.path())).unwrap();

        assert_eq!(stats, LegacyStats { ascii: 1, unicode: 1 });
        assert_eq!(registry.keys()[0], CharacterKey::NotDef);
        assert_eq!(registry.keys()[1], ' '.into());

        let space = registry.get(' '.into(), StyleVariant::Regular).unwrap();
        assert_eq!(space.advance, 400.0);

        // Cropped to x in [4, 8): the bar at x=6 ends at corner 3.
        let glyph = registry.get('\u{141}'.into(), StyleVariant::Regular).unwrap();
        assert_eq!(glyph.advance, 400.0);
    }

    #[test]
    fn missing_ascii_page_is_not_fatal() {
        let tmp = texture_root();
        let mut registry = GlyphRegistry::new();
        let stats = load_legacy(&mut registry, &ResourceRoot::new(tmp.path())).unwrap();

        assert_eq!(stats, LegacyStats::default());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn corrupt_ascii_page_is_skipped() {
        let tmp = texture_root();
        tmp.child("minecraft/textures/font/ascii.png")
            .write_binary(b"\x89PNG\r\n\x1a\nnot really a png")
            .unwrap();
        page_with_bar(0x41, 0)
            .save(tmp.child("minecraft/textures/font/unicode_page_01.png").path())
            .unwrap();

        let mut registry = GlyphRegistry::new();
        let stats = load_legacy(&mut registry, &ResourceRoot::new(tmp.path())).unwrap();

        assert_eq!(stats, LegacyStats { ascii: 0, unicode: 1 });
        assert!(registry.contains('\u{141}'.into()));
        assert!(!registry.contains('A'.into()));
    }
}
