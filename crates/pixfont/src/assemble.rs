//! Turns a finished [`GlyphRegistry`] into one TrueType font per style.

use crate::names::{GlyphNames, fallback_name};
use crate::outline::Outline;
use crate::registry::{CharacterKey, GlyphRegistry};
use crate::style::StyleVariant;
use crate::{ASCENT, CAP_HEIGHT, DESCENT, UNITS_PER_EM, X_HEIGHT};
use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use fs_err as fs;
use log::debug;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use write_fonts::FontBuilder;
use write_fonts::tables::cmap::Cmap;
use write_fonts::tables::glyf::{GlyfLocaBuilder, Glyph, SimpleGlyph};
use write_fonts::tables::head::{Head, MacStyle};
use write_fonts::tables::hhea::Hhea;
use write_fonts::tables::hmtx::{Hmtx, LongMetric};
use write_fonts::tables::maxp::Maxp;
use write_fonts::tables::name::{Name, NameRecord};
use write_fonts::tables::os2::{Os2, SelectionFlags};
use write_fonts::tables::post::Post;
use write_fonts::types::{FWord, Fixed, GlyphId, LongDateTime, NameId, Tag, UfWord};

pub const DEFAULT_COPYRIGHT: &str = "Copyright (c) Mojang AB";
pub const VERSION_STRING: &str = "Version 1.0";
pub const ITALIC_ANGLE: f64 = -14.05598;

/// 2009-05-16T00:00:00Z, the creation date stamped into every font.
pub const CREATED_UNIX: i64 = 1_242_432_000;

/// Seconds between 1904-01-01 (the `head` table epoch) and the unix epoch.
const MAC_EPOCH_OFFSET: i64 = 2_082_844_800;

const NOTDEF: &str = ".notdef";
const NULL: &str = ".null";

// Windows, Unicode BMP, US English.
const PLATFORM_WINDOWS: u16 = 3;
const ENCODING_UNICODE_BMP: u16 = 1;
const LANGUAGE_EN_US: u16 = 0x409;

/// Family-wide naming and dates shared by every style.
#[derive(Debug, Clone)]
pub struct FontInfo {
    pub family: String,
    pub copyright: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl FontInfo {
    pub fn new(family: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            family: family.into(),
            copyright: DEFAULT_COPYRIGHT.to_string(),
            created: DateTime::from_timestamp(CREATED_UNIX, 0).unwrap_or_default(),
            modified,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledGlyph {
    pub name: String,
    pub advance: f64,
    pub outline: Option<Outline>,
    pub height: f64,
}

impl AssembledGlyph {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            advance: 0.0,
            outline: None,
            height: 0.0,
        }
    }
}

/// Everything needed to serialize one style of a family.
#[derive(Debug, Clone)]
pub struct FontAsset {
    pub style: StyleVariant,
    pub info: FontInfo,
    /// Glyphs in glyph-id order, starting with `.notdef` and `.null`.
    pub glyphs: Vec<AssembledGlyph>,
    /// Character to glyph id.
    pub char_map: BTreeMap<char, u32>,
}

/// Fold every registry entry of `style` into a [`FontAsset`].
///
/// `.notdef` and `.null` are always empty with zero advance, whatever was registered for them.
pub fn assemble(
    registry: &GlyphRegistry,
    style: StyleVariant,
    names: &GlyphNames,
    info: &FontInfo,
) -> FontAsset {
    let mut glyphs = vec![AssembledGlyph::empty(NOTDEF), AssembledGlyph::empty(NULL)];
    let mut used: HashSet<String> = [NOTDEF.to_string(), NULL.to_string()].into();
    let mut char_map = BTreeMap::new();

    for (key, entry) in registry.entries(style) {
        let CharacterKey::Char(c) = key else {
            continue;
        };
        let name = unique_name(names.name_for(c), c, &used);
        used.insert(name.clone());
        char_map.insert(c, glyphs.len() as u32);
        glyphs.push(AssembledGlyph {
            name,
            advance: entry.advance,
            outline: entry.outline.clone(),
            height: entry.height.unwrap_or(0.0),
        });
    }

    FontAsset {
        style,
        info: info.clone(),
        glyphs,
        char_map,
    }
}

fn unique_name(preferred: String, c: char, used: &HashSet<String>) -> String {
    if !used.contains(&preferred) {
        return preferred;
    }
    let base = fallback_name(c);
    if !used.contains(&base) {
        return base;
    }
    (1..)
        .map(|n| format!("{base}.{n}"))
        .find(|name| !used.contains(name))
        .unwrap_or(base)
}

fn mac_timestamp(time: &DateTime<Utc>) -> LongDateTime {
    LongDateTime::new(time.timestamp() + MAC_EPOCH_OFFSET)
}

fn design_units(value: f64) -> u16 {
    value.round().clamp(0.0, u16::MAX as f64) as u16
}

fn table_error(e: impl std::fmt::Debug) -> anyhow::Error {
    anyhow!("{e:?}")
}

impl FontAsset {
    pub fn glyph_order(&self) -> impl Iterator<Item = &str> {
        self.glyphs.iter().map(|g| g.name.as_str())
    }

    pub fn family(&self) -> &str {
        &self.info.family
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.info.family, self.style.style_name())
    }

    pub fn postscript_name(&self) -> String {
        format!("{}{}", self.info.family, self.style.style_name()).replace(' ', "")
    }

    pub fn unique_id(&self) -> String {
        format!(
            "{}.{}",
            self.info.family.replace(' ', ""),
            self.style.style_name().replace(' ', "")
        )
    }

    /// Serialize to a TrueType binary.
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let style = self.style;
        let num_glyphs = u16::try_from(self.glyphs.len())
            .map_err(|_| anyhow!("{} glyphs do not fit in one font", self.glyphs.len()))?;

        let mut glyf_builder = GlyfLocaBuilder::new();
        let mut metrics = Vec::with_capacity(self.glyphs.len());
        let mut max_points = 0;
        let mut max_contours = 0;
        let mut min_lsb = i16::MAX;
        let mut min_rsb = i16::MAX;
        let mut max_extent = i16::MIN;

        for glyph in &self.glyphs {
            let advance = design_units(glyph.advance);
            let (encoded, lsb) = match &glyph.outline {
                Some(outline) => {
                    let simple = SimpleGlyph::from_bezpath(&outline.to_bezpath())
                        .map_err(table_error)
                        .with_context(|| format!("Failed to encode glyph {}", glyph.name))?;
                    let bbox = simple.bbox;
                    min_lsb = min_lsb.min(bbox.x_min);
                    min_rsb = min_rsb.min((advance as i32 - bbox.x_max as i32) as i16);
                    max_extent = max_extent.max(bbox.x_max);
                    max_points = max_points.max(outline.point_count());
                    max_contours = max_contours.max(outline.contours.len());
                    (Glyph::Simple(simple), bbox.x_min)
                }
                None => (Glyph::Empty, 0),
            };
            glyf_builder
                .add_glyph(&encoded)
                .map_err(table_error)
                .with_context(|| format!("Failed to add glyph {}", glyph.name))?;
            metrics.push(LongMetric::new(advance, lsb));
        }
        let (glyf, loca, loca_format) = glyf_builder.build();

        let has_ink = max_extent != i16::MIN;
        let (min_lsb, min_rsb, max_extent) = if has_ink {
            (min_lsb, min_rsb, max_extent)
        } else {
            (0, 0, 0)
        };

        // Reserved glyphs do not count towards the font bounds.
        let registered = &self.glyphs[2..];
        let max_advance = self
            .glyphs
            .iter()
            .map(|g| design_units(g.advance))
            .max()
            .unwrap_or(0);
        let x_max = registered.iter().map(|g| g.advance).fold(0.0, f64::max);
        // Extent heights run to the bottom edge of the last ink row, not the glyph's top edge.
        let y_max = registered.iter().map(|g| g.height).fold(0.0, f64::max);

        let cmap = Cmap::from_mappings(
            self.char_map
                .iter()
                .map(|(c, gid)| (*c, GlyphId::new(*gid))),
        )
        .map_err(table_error)
        .context("Failed to build character map")?;

        let mut mac_style = MacStyle::empty();
        if style.is_bold() {
            mac_style |= MacStyle::BOLD;
        }
        if style.is_italic() {
            mac_style |= MacStyle::ITALIC;
        }

        let head = Head {
            font_revision: Fixed::from_f64(1.0),
            units_per_em: UNITS_PER_EM,
            created: mac_timestamp(&self.info.created),
            modified: mac_timestamp(&self.info.modified),
            x_min: 0,
            y_min: -DESCENT,
            x_max: x_max.min(i16::MAX as f64) as i16,
            y_max: y_max.min(i16::MAX as f64) as i16,
            mac_style,
            lowest_rec_ppem: 8,
            index_to_loc_format: loca_format as i16,
            ..Default::default()
        };

        let hhea = Hhea {
            ascender: FWord::new(ASCENT),
            descender: FWord::new(-DESCENT),
            line_gap: FWord::new(0),
            advance_width_max: UfWord::new(max_advance),
            min_left_side_bearing: FWord::new(min_lsb),
            min_right_side_bearing: FWord::new(min_rsb),
            x_max_extent: FWord::new(max_extent),
            caret_slope_rise: 1,
            number_of_h_metrics: num_glyphs,
            ..Default::default()
        };

        let maxp = Maxp {
            num_glyphs,
            max_points: Some(max_points.min(u16::MAX as usize) as u16),
            max_contours: Some(max_contours.min(u16::MAX as usize) as u16),
            max_composite_points: Some(0),
            max_composite_contours: Some(0),
            max_zones: Some(2),
            max_twilight_points: Some(0),
            max_storage: Some(0),
            max_function_defs: Some(0),
            max_instruction_defs: Some(0),
            max_stack_elements: Some(0),
            max_size_of_instructions: Some(0),
            max_component_elements: Some(0),
            max_component_depth: Some(0),
            ..Default::default()
        };

        let hmtx = Hmtx::new(metrics, Vec::new());
        let os2 = self.os2(max_advance);
        let name = self.name_table();

        let mut post = Post::new_v2(self.glyph_order());
        post.italic_angle = Fixed::from_f64(if style.is_italic() { ITALIC_ANGLE } else { 0.0 });
        post.underline_position = FWord::new(-(UNITS_PER_EM as i16) / 12);
        post.underline_thickness = FWord::new(UNITS_PER_EM as i16 / 12);

        let bytes = FontBuilder::new()
            .add_table(&head)
            .map_err(table_error)?
            .add_table(&hhea)
            .map_err(table_error)?
            .add_table(&maxp)
            .map_err(table_error)?
            .add_table(&os2)
            .map_err(table_error)?
            .add_table(&hmtx)
            .map_err(table_error)?
            .add_table(&cmap)
            .map_err(table_error)?
            .add_table(&loca)
            .map_err(table_error)?
            .add_table(&glyf)
            .map_err(table_error)?
            .add_table(&name)
            .map_err(table_error)?
            .add_table(&post)
            .map_err(table_error)?
            .build();
        Ok(bytes)
    }

    fn os2(&self, max_advance: u16) -> Os2 {
        let style = self.style;
        let mut fs_selection = SelectionFlags::empty();
        if style.is_bold() {
            fs_selection |= SelectionFlags::BOLD;
        }
        if style.is_italic() {
            fs_selection |= SelectionFlags::ITALIC;
        }
        if fs_selection.is_empty() {
            fs_selection = SelectionFlags::REGULAR;
        }

        let inked: Vec<u16> = self
            .glyphs
            .iter()
            .map(|g| design_units(g.advance))
            .filter(|advance| *advance > 0)
            .collect();
        let avg_width = if inked.is_empty() {
            0
        } else {
            inked.iter().map(|a| *a as u32).sum::<u32>() / inked.len() as u32
        };

        let first_char = self.char_map.keys().next().map_or(0xFFFF, |c| *c as u32);
        let last_char = self.char_map.keys().next_back().map_or(0, |c| *c as u32);

        Os2 {
            x_avg_char_width: avg_width.min(max_advance as u32) as i16,
            us_weight_class: if style.is_bold() { 700 } else { 400 },
            us_width_class: 5,
            y_strikeout_size: UNITS_PER_EM as i16 / 12,
            y_strikeout_position: UNITS_PER_EM as i16 * 4 / 12,
            ach_vend_id: Tag::new(b"    "),
            fs_selection,
            us_first_char_index: first_char.min(0xFFFF) as u16,
            us_last_char_index: last_char.min(0xFFFF) as u16,
            s_typo_ascender: ASCENT,
            s_typo_descender: -DESCENT,
            s_typo_line_gap: 0,
            us_win_ascent: ASCENT as u16,
            us_win_descent: DESCENT as u16,
            ul_code_page_range_1: Some(1),
            ul_code_page_range_2: Some(0),
            sx_height: Some(X_HEIGHT),
            s_cap_height: Some(CAP_HEIGHT),
            us_default_char: Some(0),
            us_break_char: Some(' ' as u16),
            us_max_context: Some(0),
            ..Default::default()
        }
    }

    fn name_table(&self) -> Name {
        let records = [
            (NameId::COPYRIGHT_NOTICE, self.info.copyright.clone()),
            (NameId::FAMILY_NAME, self.info.family.clone()),
            (NameId::SUBFAMILY_NAME, self.style.style_name().to_string()),
            (NameId::UNIQUE_ID, self.unique_id()),
            (NameId::FULL_NAME, self.full_name()),
            (NameId::VERSION_STRING, VERSION_STRING.to_string()),
            (NameId::POSTSCRIPT_NAME, self.postscript_name()),
        ];
        Name::new(
            records
                .into_iter()
                .map(|(id, value)| {
                    NameRecord::new(
                        PLATFORM_WINDOWS,
                        ENCODING_UNICODE_BMP,
                        LANGUAGE_EN_US,
                        id,
                        value.into(),
                    )
                })
                .collect(),
        )
    }
}

/// Assemble and write one `.ttf` per style into `output_dir`, named after `base_name`.
pub fn write_family(
    registry: &GlyphRegistry,
    names: &GlyphNames,
    info: &FontInfo,
    styles: &[StyleVariant],
    output_dir: &Path,
    base_name: &str,
) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let mut written = Vec::with_capacity(styles.len());
    for &style in styles {
        let asset = assemble(registry, style, names, info);
        debug!(
            "Assembled {} with {} glyphs",
            asset.full_name(),
            asset.glyphs.len()
        );

        let bytes = asset
            .to_bytes()
            .with_context(|| format!("Failed to serialize {}", asset.full_name()))?;
        let path = output_dir.join(style.file_name(base_name));
        let len = bytes.len();
        fs::write(&path, bytes)?;
        debug!("Wrote {} ({} bytes)", path.display(), len);
        written.push(path);
    }
    Ok(written)
}
