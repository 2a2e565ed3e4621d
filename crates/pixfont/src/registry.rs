use crate::mask::BitmapMask;
use crate::outline::{self, Outline, Transform};
use crate::style::StyleVariant;
use crate::PIXEL_SCALE;
use anyhow::{Context, bail};
use std::collections::HashMap;
use std::fmt;

/// Highest code point representable in the format-4 character map.
pub const MAX_CODE_POINT: u32 = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterKey {
    NotDef,
    Null,
    Char(char),
}

impl CharacterKey {
    pub fn code_point(self) -> Option<u32> {
        match self {
            CharacterKey::Char(c) => Some(c as u32),
            _ => None,
        }
    }

    fn is_representable(self) -> bool {
        self.code_point().is_none_or(|cp| cp <= MAX_CODE_POINT)
    }
}

impl From<char> for CharacterKey {
    fn from(c: char) -> Self {
        CharacterKey::Char(c)
    }
}

impl fmt::Display for CharacterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacterKey::NotDef => f.write_str(".notdef"),
            CharacterKey::Null => f.write_str(".null"),
            CharacterKey::Char(c) => write!(f, "U+{:04X}", *c as u32),
        }
    }
}

/// One style's rendition of a character.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphEntry {
    /// Advance width in design units.
    pub advance: f64,
    pub outline: Option<Outline>,
    /// Inked height in design units; `None` for width-only entries.
    pub height: Option<f64>,
}

impl GlyphEntry {
    pub fn width_only(advance: f64) -> Self {
        Self {
            advance,
            outline: None,
            height: None,
        }
    }
}

/// Run the outline builder for one style of `mask`.
pub fn compute_entry(
    mask: &BitmapMask,
    target_height: u32,
    ascent: i32,
    style: StyleVariant,
) -> anyhow::Result<GlyphEntry> {
    if target_height == 0 || mask.height() == 0 {
        bail!(
            "cannot place a {}x{} glyph at height {target_height}",
            mask.width(),
            mask.height()
        );
    }

    let dilated;
    let mask = if style.is_bold() {
        dilated = mask.dilate_right();
        &dilated
    } else {
        mask
    };

    let transform = Transform::new(mask.height(), target_height, ascent, style.is_italic());
    let (outline, extent) = outline::vectorize(mask, &transform)?;

    let compensation = mask.height() as f64 / target_height as f64;
    Ok(GlyphEntry {
        advance: (extent.width as f64 + compensation) * transform.scale(),
        outline,
        height: Some(extent.height as f64 * transform.scale()),
    })
}

/// Per-style glyph entries in registration order. The first registration of a key wins.
#[derive(Debug, Default)]
pub struct GlyphRegistry {
    keys: Vec<CharacterKey>,
    entries: Vec<[GlyphEntry; 4]>,
    index: HashMap<CharacterKey, usize>,
}

impl GlyphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: CharacterKey) -> bool {
        self.index.contains_key(&key)
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> &[CharacterKey] {
        &self.keys
    }

    pub fn get(&self, key: CharacterKey, style: StyleVariant) -> Option<&GlyphEntry> {
        let i = *self.index.get(&key)?;
        Some(&self.entries[i][style.index()])
    }

    /// Entries for one style, in registration order.
    pub fn entries(
        &self,
        style: StyleVariant,
    ) -> impl Iterator<Item = (CharacterKey, &GlyphEntry)> + '_ {
        self.keys
            .iter()
            .zip(&self.entries)
            .map(move |(key, styles)| (*key, &styles[style.index()]))
    }

    fn should_register(&self, key: CharacterKey) -> bool {
        key.is_representable() && !self.contains(key)
    }

    /// `styles` is in [`StyleVariant::ALL`] order, which is also [`StyleVariant::index`] order.
    fn insert(&mut self, key: CharacterKey, styles: [GlyphEntry; 4]) {
        self.index.insert(key, self.keys.len());
        self.keys.push(key);
        self.entries.push(styles);
    }

    /// Register a width-only character. Bold styles are one pixel wider to match the dilation
    /// applied to drawn glyphs. Returns `false` if the key was skipped.
    pub fn register_space(&mut self, key: impl Into<CharacterKey>, width: f64) -> bool {
        let key = key.into();
        if !self.should_register(key) {
            return false;
        }

        let regular = width * PIXEL_SCALE;
        let bold = (width + 1.0) * PIXEL_SCALE;
        let styles = StyleVariant::ALL.map(|style| {
            GlyphEntry::width_only(if style.is_bold() { bold } else { regular })
        });
        self.insert(key, styles);
        true
    }

    /// Trace `mask` in all four styles and register the result.
    ///
    /// Returns `Ok(false)` if the key was skipped. On error nothing is registered.
    pub fn register_glyph(
        &mut self,
        key: impl Into<CharacterKey>,
        mask: &BitmapMask,
        target_height: u32,
        ascent: i32,
    ) -> anyhow::Result<bool> {
        let key = key.into();
        if !self.should_register(key) {
            return Ok(false);
        }

        let mut styles = Vec::with_capacity(StyleVariant::ALL.len());
        for style in StyleVariant::ALL {
            let entry = compute_entry(mask, target_height, ascent, style)
                .with_context(|| format!("Failed to trace {key} ({style})"))?;
            styles.push(entry);
        }

        let styles: [GlyphEntry; 4] = match styles.try_into() {
            Ok(styles) => styles,
            Err(_) => bail!("expected one entry per style for {key}"),
        };
        self.insert(key, styles);
        Ok(true)
    }
}
