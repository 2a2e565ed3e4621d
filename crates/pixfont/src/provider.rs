//! Glyph sources described by JSON font definitions.
//!
//! A definition `namespace:path` lives at `<root>/<namespace>/font/<path>.json` and holds an
//! ordered `providers` list. Providers are applied in order and the first one to register a
//! character wins.

use crate::mask::{BitmapMask, Rect};
use crate::registry::{CharacterKey, GlyphRegistry};
use crate::unihex;
use anyhow::{Context, bail};
use fs_err as fs;
use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

pub const DEFAULT_NAMESPACE: &str = "minecraft";
pub const MAX_REFERENCE_DEPTH: usize = 16;
pub const DEFAULT_BITMAP_HEIGHT: u32 = 8;

/// Pixel height and ascent unihex glyphs are placed at.
pub const UNIHEX_HEIGHT: u32 = 8;
pub const UNIHEX_ASCENT: i32 = 7;

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("trailing comma pattern is valid"));

/// Parse JSON that may contain trailing commas before `}` or `]`.
pub fn parse_lenient_json<T: DeserializeOwned>(text: &str) -> anyhow::Result<T> {
    let cleaned = TRAILING_COMMA.replace_all(text, "$1");
    Ok(serde_json::from_str(&cleaned)?)
}

/// A `namespace:path` resource location. The namespace defaults to `minecraft`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    pub namespace: String,
    pub path: String,
}

impl ResourceId {
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
        }
    }
}

impl FromStr for ResourceId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, path) = match s.split_once(':') {
            Some((namespace, path)) => (namespace, path),
            None => (DEFAULT_NAMESPACE, s),
        };
        if path.is_empty() {
            bail!("resource id '{s}' has an empty path");
        }
        if path.contains(':') {
            bail!("resource id '{s}' has more than one namespace separator");
        }
        let namespace = if namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            namespace
        };
        Ok(Self::new(namespace, path))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

/// Directory holding `<namespace>/font` and `<namespace>/textures` trees.
#[derive(Debug, Clone)]
pub struct ResourceRoot {
    root: PathBuf,
}

impl ResourceRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn font_definition(&self, id: &ResourceId) -> PathBuf {
        self.root
            .join(&id.namespace)
            .join("font")
            .join(format!("{}.json", id.path))
    }

    pub fn texture(&self, id: &ResourceId) -> PathBuf {
        self.root.join(&id.namespace).join("textures").join(&id.path)
    }

    pub fn asset(&self, id: &ResourceId) -> PathBuf {
        self.root.join(&id.namespace).join(&id.path)
    }
}

fn default_bitmap_height() -> u32 {
    DEFAULT_BITMAP_HEIGHT
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Provider {
    Space {
        /// Single-character string to advance width in pixels.
        advances: serde_json::Map<String, Value>,
    },
    Bitmap {
        file: String,
        #[serde(default = "default_bitmap_height")]
        height: u32,
        ascent: i32,
        chars: Vec<String>,
    },
    Unihex {
        hex_file: String,
    },
    Reference {
        id: String,
    },
    #[serde(other)]
    Unsupported,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Space { advances } => write!(f, "space ({} advances)", advances.len()),
            Provider::Bitmap { file, .. } => write!(f, "bitmap {file}"),
            Provider::Unihex { hex_file } => write!(f, "unihex {hex_file}"),
            Provider::Reference { id } => write!(f, "reference {id}"),
            Provider::Unsupported => f.write_str("unsupported provider"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FontDefinition {
    #[serde(default)]
    providers: Vec<Value>,
}

fn read_definition(root: &ResourceRoot, id: &ResourceId) -> anyhow::Result<Vec<Value>> {
    let path = root.font_definition(id);
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read font definition {id}"))?;
    let definition: FontDefinition = parse_lenient_json(&text)
        .with_context(|| format!("Failed to parse font definition {}", path.display()))?;
    Ok(definition.providers)
}

/// Read the definition `id` and splice every `reference` provider in place, recursively.
///
/// Only a failure to read `id` itself is an error. Malformed providers, unreadable references,
/// reference cycles and chains deeper than [`MAX_REFERENCE_DEPTH`] are skipped with a warning.
pub fn expand(root: &ResourceRoot, id: &ResourceId) -> anyhow::Result<Vec<Provider>> {
    let providers = read_definition(root, id)?;
    let mut chain = vec![id.clone()];
    let mut out = Vec::new();
    expand_into(root, providers, &mut chain, &mut out);
    Ok(out)
}

fn expand_into(
    root: &ResourceRoot,
    providers: Vec<Value>,
    chain: &mut Vec<ResourceId>,
    out: &mut Vec<Provider>,
) {
    let source = chain.last().map(ToString::to_string).unwrap_or_default();
    for (index, value) in providers.into_iter().enumerate() {
        let provider: Provider = match serde_json::from_value(value) {
            Ok(provider) => provider,
            Err(e) => {
                warn!("Skipping malformed provider #{index} in {source}: {e}");
                continue;
            }
        };

        let Provider::Reference { id } = &provider else {
            out.push(provider);
            continue;
        };

        let target = match id.parse::<ResourceId>() {
            Ok(target) => target,
            Err(e) => {
                warn!("Skipping reference '{id}': {e}");
                continue;
            }
        };
        if chain.contains(&target) {
            let path: Vec<String> = chain.iter().map(ToString::to_string).collect();
            warn!(
                "Skipping reference cycle {} -> {target}",
                path.join(" -> ")
            );
            continue;
        }
        if chain.len() >= MAX_REFERENCE_DEPTH {
            warn!("Skipping reference {target}: nested deeper than {MAX_REFERENCE_DEPTH} levels");
            continue;
        }

        match read_definition(root, &target) {
            Ok(nested) => {
                debug!("Expanding reference {target}");
                chain.push(target);
                expand_into(root, nested, chain, out);
                chain.pop();
            }
            Err(e) => warn!("Skipping reference {target}: {e:#}"),
        }
    }
}

/// Register the fallback `.notdef` box: a 5x8 ring drawn at height 8, ascent 8.
pub fn register_notdef(registry: &mut GlyphRegistry) -> anyhow::Result<bool> {
    registry.register_glyph(CharacterKey::NotDef, &BitmapMask::ring(5, 8), 8, 8)
}

pub(crate) fn load_atlas(path: &Path) -> anyhow::Result<BitmapMask> {
    let image = image::open(path)
        .with_context(|| format!("Failed to load image {}", path.display()))?
        .to_rgba8();
    Ok(BitmapMask::from_rgba(&image))
}

/// Register a glyph, logging instead of failing when it cannot be traced.
pub(crate) fn register_or_warn(
    registry: &mut GlyphRegistry,
    c: char,
    mask: &BitmapMask,
    height: u32,
    ascent: i32,
) -> bool {
    match registry.register_glyph(c, mask, height, ascent) {
        Ok(added) => added,
        Err(e) => {
            warn!("{e:#}");
            false
        }
    }
}

/// Register every character `provider` supplies. Returns how many were newly registered.
///
/// An error means the whole provider was unusable (for example a missing asset); characters
/// that fail individually are logged and skipped.
pub fn apply_provider(
    registry: &mut GlyphRegistry,
    root: &ResourceRoot,
    provider: &Provider,
) -> anyhow::Result<usize> {
    match provider {
        Provider::Space { advances } => {
            let mut added = 0;
            for (key, width) in advances {
                let mut chars = key.chars();
                let (Some(c), None) = (chars.next(), chars.next()) else {
                    warn!("Skipping space advance for '{key}': not a single character");
                    continue;
                };
                let Some(width) = width.as_f64() else {
                    warn!("Skipping space advance for '{key}': width is not a number");
                    continue;
                };
                if registry.register_space(c, width) {
                    added += 1;
                }
            }
            Ok(added)
        }
        Provider::Bitmap {
            file,
            height,
            ascent,
            chars,
        } => {
            let id: ResourceId = file.parse()?;
            let path = root.texture(&id);
            if !path.is_file() {
                bail!("missing texture {id} ({})", path.display());
            }
            let atlas = load_atlas(&path)?;
            apply_bitmap(registry, &atlas, chars, *height, *ascent)
        }
        Provider::Unihex { hex_file } => {
            let id: ResourceId = hex_file.parse()?;
            let path = root.asset(&id);
            if !path.exists() {
                bail!("missing hex source {id} ({})", path.display());
            }
            let glyphs = unihex::read_glyphs(&path)?;
            debug!("Loaded {} glyphs from {id}", glyphs.len());

            let mut added = 0;
            for (c, mask) in &glyphs {
                if register_or_warn(registry, *c, mask, UNIHEX_HEIGHT, UNIHEX_ASCENT) {
                    added += 1;
                }
            }
            Ok(added)
        }
        Provider::Reference { id } => bail!("reference {id} was not expanded"),
        Provider::Unsupported => {
            warn!("Skipping provider of unsupported type");
            Ok(0)
        }
    }
}

fn apply_bitmap(
    registry: &mut GlyphRegistry,
    atlas: &BitmapMask,
    chars: &[String],
    height: u32,
    ascent: i32,
) -> anyhow::Result<usize> {
    let Some(first_row) = chars.first() else {
        bail!("bitmap provider has no character rows");
    };
    let columns = first_row.chars().count() as u32;
    if columns == 0 {
        bail!("bitmap provider has an empty character row");
    }
    let cell_w = atlas.width() / columns;
    let cell_h = atlas.height() / chars.len() as u32;
    if cell_w == 0 || cell_h == 0 {
        bail!(
            "{}x{} atlas is too small for a {columns}x{} grid",
            atlas.width(),
            atlas.height(),
            chars.len()
        );
    }

    let mut added = 0;
    for (y, row) in chars.iter().enumerate() {
        for (x, c) in row.chars().enumerate() {
            if c == '\0' {
                continue;
            }
            let cell = atlas.crop(Rect::new(
                x as u32 * cell_w,
                y as u32 * cell_h,
                cell_w,
                cell_h,
            ));
            if register_or_warn(registry, c, &cell, height, ascent) {
                added += 1;
            }
        }
    }
    Ok(added)
}

/// Register the fallback `.notdef`, then apply `providers` in order.
///
/// A provider that fails as a whole is logged and skipped. `on_applied` runs after each
/// provider with the number of characters it added. Returns the total added.
pub fn apply_providers(
    registry: &mut GlyphRegistry,
    root: &ResourceRoot,
    providers: &[Provider],
    mut on_applied: impl FnMut(&Provider, usize),
) -> anyhow::Result<usize> {
    register_notdef(registry)?;

    let mut added = 0;
    for provider in providers {
        let n = match apply_provider(registry, root, provider) {
            Ok(n) => n,
            Err(e) => {
                warn!("Skipping {provider}: {e:#}");
                0
            }
        };
        added += n;
        on_applied(provider, n);
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleVariant;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use image::{Rgba, RgbaImage};

    const INK: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn write(tmp: &TempDir, relative: &str, contents: &str) {
        tmp.child(relative).write_str(contents).unwrap();
    }

    fn save_png(tmp: &TempDir, relative: &str, image: &RgbaImage) {
        let path = tmp.child(relative);
        std::fs::create_dir_all(path.path().parent().unwrap()).unwrap();
        image.save(path.path()).unwrap();
    }

    fn root(tmp: &TempDir) -> ResourceRoot {
        ResourceRoot::new(tmp.path())
    }

    fn id(s: &str) -> ResourceId {
        s.parse().unwrap()
    }

    #[test]
    fn resource_ids_default_to_minecraft() {
        assert_eq!(id("default"), ResourceId::new("minecraft", "default"));
        assert_eq!(id("custom:font/a.png"), ResourceId::new("custom", "font/a.png"));
        assert_eq!(id("custom:x").to_string(), "custom:x");
        assert!("minecraft:".parse::<ResourceId>().is_err());
        assert!("a:b:c".parse::<ResourceId>().is_err());
    }

    #[test]
    fn resource_paths_follow_pack_layout() {
        let root = ResourceRoot::new("assets");
        assert_eq!(
            root.font_definition(&id("minecraft:alt")),
            Path::new("assets/minecraft/font/alt.json")
        );
        assert_eq!(
            root.texture(&id("minecraft:font/ascii.png")),
            Path::new("assets/minecraft/textures/font/ascii.png")
        );
        assert_eq!(
            root.asset(&id("minecraft:font/unifont.hex")),
            Path::new("assets/minecraft/font/unifont.hex")
        );
    }

    #[test]
    fn lenient_json_accepts_trailing_commas() {
        let value: Value = parse_lenient_json(r#"{"a": [1, 2, 3, ], "b": {"c": 1,  },}"#).unwrap();
        assert_eq!(value["a"].as_array().unwrap().len(), 3);
        assert_eq!(value["b"]["c"], 1);
    }

    #[test]
    fn providers_deserialize_by_type() {
        let providers: Vec<Provider> = parse_lenient_json(
            r#"[
                {"type": "space", "advances": {" ": 4}},
                {"type": "bitmap", "file": "minecraft:font/ascii.png", "ascent": 7, "chars": ["ab"]},
                {"type": "unihex", "hex_file": "minecraft:font/unifont.zip", "size_overrides": []},
                {"type": "ttf", "file": "x.ttf"},
            ]"#,
        )
        .unwrap();

        assert!(matches!(providers[0], Provider::Space { .. }));
        assert!(matches!(
            &providers[1],
            Provider::Bitmap { height: 8, ascent: 7, .. }
        ));
        assert!(matches!(providers[2], Provider::Unihex { .. }));
        assert_eq!(providers[3], Provider::Unsupported);
    }

    #[test]
    fn references_are_spliced_in_place() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp,
            "minecraft/font/default.json",
            r#"{"providers": [
                {"type": "space", "advances": {"a": 1}},
                {"type": "reference", "id": "minecraft:include/space"},
                {"type": "space", "advances": {"c": 3}},
            ]}"#,
        );
        write(
            &tmp,
            "minecraft/font/include/space.json",
            r#"{"providers": [{"type": "space", "advances": {"b": 2}}]}"#,
        );

        let providers = expand(&root(&tmp), &id("minecraft:default")).unwrap();
        let keys: Vec<String> = providers
            .iter()
            .map(|p| match p {
                Provider::Space { advances } => advances.keys().cloned().collect(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn reference_cycles_terminate() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp,
            "minecraft/font/a.json",
            r#"{"providers": [{"type": "reference", "id": "b"}, {"type": "space", "advances": {"x": 1}}]}"#,
        );
        write(
            &tmp,
            "minecraft/font/b.json",
            r#"{"providers": [{"type": "reference", "id": "a"}, {"type": "space", "advances": {"y": 1}}]}"#,
        );

        let providers = expand(&root(&tmp), &id("a")).unwrap();
        assert_eq!(providers.len(), 2);
    }

    #[test]
    fn self_reference_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp,
            "minecraft/font/loop.json",
            r#"{"providers": [{"type": "reference", "id": "minecraft:loop"}]}"#,
        );
        assert!(expand(&root(&tmp), &id("loop")).unwrap().is_empty());
    }

    #[test]
    fn missing_reference_is_skipped_but_missing_top_level_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp,
            "minecraft/font/default.json",
            r#"{"providers": [{"type": "reference", "id": "nowhere"}, {"type": "space", "advances": {"x": 1}}]}"#,
        );

        assert_eq!(expand(&root(&tmp), &id("default")).unwrap().len(), 1);
        assert!(expand(&root(&tmp), &id("absent")).is_err());
    }

    #[test]
    fn bitmap_provider_registers_cells() {
        let tmp = TempDir::new().unwrap();
        let mut image = RgbaImage::new(16, 8);
        for y in 0..7 {
            image.put_pixel(0, y, INK);
            image.put_pixel(8, y, INK);
            image.put_pixel(9, y, INK);
        }
        save_png(&tmp, "minecraft/textures/font/test.png", &image);

        let provider = Provider::Bitmap {
            file: "minecraft:font/test.png".into(),
            height: 8,
            ascent: 7,
            chars: vec!["l\u{0}".into()],
        };
        let mut registry = GlyphRegistry::new();
        let added = apply_provider(&mut registry, &root(&tmp), &provider).unwrap();

        assert_eq!(added, 1);
        assert!(!registry.contains('\0'.into()));
        let l = registry.get('l'.into(), StyleVariant::Regular).unwrap();
        assert_eq!(l.advance, 200.0);
        assert!(l.outline.is_some());
    }

    #[test]
    fn double_resolution_cells_are_scaled_to_height() {
        let tmp = TempDir::new().unwrap();
        // One 16x16 cell drawn at height 8: a 4-wide block, 14 rows tall.
        let mut image = RgbaImage::new(16, 16);
        for y in 0..14 {
            for x in 0..4 {
                image.put_pixel(x, y, INK);
            }
        }
        save_png(&tmp, "minecraft/textures/font/hd.png", &image);

        let provider = Provider::Bitmap {
            file: "minecraft:font/hd.png".into(),
            height: 8,
            ascent: 7,
            chars: vec!["H".into()],
        };
        let mut registry = GlyphRegistry::new();
        assert_eq!(apply_provider(&mut registry, &root(&tmp), &provider).unwrap(), 1);

        // Scale is 8/16 * 100 = 50 per pixel; the gap is 16/8 = 2 source pixels.
        let regular = registry.get('H'.into(), StyleVariant::Regular).unwrap();
        assert_eq!(regular.advance, 300.0);
        let bold = registry.get('H'.into(), StyleVariant::Bold).unwrap();
        assert_eq!(bold.advance, 350.0);
    }

    #[test]
    fn missing_texture_is_a_provider_error() {
        let tmp = TempDir::new().unwrap();
        let provider = Provider::Bitmap {
            file: "minecraft:font/none.png".into(),
            height: 8,
            ascent: 7,
            chars: vec!["a".into()],
        };
        let mut registry = GlyphRegistry::new();
        assert!(apply_provider(&mut registry, &root(&tmp), &provider).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn unihex_provider_reads_zip_archives() {
        let tmp = TempDir::new().unwrap();
        tmp.child("minecraft/font").create_dir_all().unwrap();
        let row = "18".repeat(16);
        let entry = format!("0049:{row}\n");
        unihex::write_zip(
            tmp.child("minecraft/font/unifont.zip").path(),
            &[("plane00.hex", entry.as_str())],
        );

        let provider = Provider::Unihex {
            hex_file: "minecraft:font/unifont.zip".into(),
        };
        let mut registry = GlyphRegistry::new();
        assert_eq!(apply_provider(&mut registry, &root(&tmp), &provider).unwrap(), 1);
        assert!(registry.contains('I'.into()));
    }

    #[test]
    fn apply_providers_continues_past_bad_providers() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp,
            "minecraft/font/default.json",
            r#"{"providers": [
                {"type": "bitmap", "file": "minecraft:font/gone.png", "ascent": 7, "chars": ["a"]},
                {"type": "bitmap"},
                {"type": "space", "advances": {" ": 4, "\u200c": 0}},
            ]}"#,
        );

        let providers = expand(&root(&tmp), &id("default")).unwrap();
        assert_eq!(providers.len(), 2);

        let mut applied = Vec::new();
        let mut registry = GlyphRegistry::new();
        let added = apply_providers(&mut registry, &root(&tmp), &providers, |provider, n| {
            applied.push((provider.to_string(), n));
        })
        .unwrap();

        assert_eq!(added, 2);
        assert_eq!(
            applied,
            vec![
                ("bitmap minecraft:font/gone.png".to_string(), 0),
                ("space (2 advances)".to_string(), 2),
            ]
        );
        assert_eq!(registry.keys()[0], CharacterKey::NotDef);
        assert!(registry.contains(' '.into()));
    }

    #[test]
    fn reserved_notdef_is_registered_before_any_provider() {
        let tmp = TempDir::new().unwrap();
        let mut image = RgbaImage::new(8, 8);
        for y in 0..8 {
            image.put_pixel(0, y, INK);
        }
        save_png(&tmp, "minecraft/textures/font/nul.png", &image);

        // A NUL cell is the atlas placeholder and never reaches the registry.
        let providers = vec![Provider::Bitmap {
            file: "minecraft:font/nul.png".into(),
            height: 8,
            ascent: 8,
            chars: vec!["\u{0}".into()],
        }];
        let mut registry = GlyphRegistry::new();
        let added = apply_providers(&mut registry, &root(&tmp), &providers, |_, _| {}).unwrap();
        assert_eq!(added, 0);
        assert_eq!(registry.keys(), vec![CharacterKey::NotDef]);

        let ring = registry.get(CharacterKey::NotDef, StyleVariant::Regular).unwrap().clone();
        let bar = BitmapMask::from_fn(1, 8, |_, _| true);
        assert!(!registry.register_glyph(CharacterKey::NotDef, &bar, 8, 8).unwrap());
        assert_eq!(
            registry.get(CharacterKey::NotDef, StyleVariant::Regular),
            Some(&ring)
        );
    }
}
