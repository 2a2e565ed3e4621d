use anyhow::{Context, Result, bail};
use fs_err as fs;
use pixfont::StyleVariant;
use pixfont::assemble::DEFAULT_COPYRIGHT;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const FILE_NAME: &str = "pixfont.toml";

/// Project configuration read from pixfont.toml
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PixfontConfig {
    /// Directory the .ttf files are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Copyright notice stored in every font's name table
    #[serde(default = "default_copyright")]
    pub copyright: String,

    /// AGLFN-format file replacing the built-in glyph name table
    #[serde(default)]
    pub glyph_names: Option<PathBuf>,

    /// Fonts to build, in order
    #[serde(default)]
    pub fonts: Vec<FontConfig>,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

/// One font family to build
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FontConfig {
    /// Output base name: `<name>.ttf`, `<name>-bold.ttf`, ...
    pub name: String,

    /// Family name; defaults to the title-cased output name
    #[serde(default)]
    pub family: Option<String>,

    /// Resource root holding `<namespace>/font` and `<namespace>/textures`
    #[serde(default = "default_root")]
    pub root: PathBuf,

    pub source: SourceConfig,

    /// Styles to write
    #[serde(default = "default_styles")]
    pub styles: Vec<StyleVariant>,
}

/// Where a font's glyphs come from
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A JSON font definition and its providers
    Providers {
        #[serde(default = "default_definition")]
        definition: String,
    },
    /// The fixed ascii.png / unicode_page_XX.png layout
    Legacy,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("fonts")
}

fn default_copyright() -> String {
    DEFAULT_COPYRIGHT.to_string()
}

fn default_root() -> PathBuf {
    PathBuf::from("assets")
}

fn default_definition() -> String {
    "minecraft:default".to_string()
}

fn default_styles() -> Vec<StyleVariant> {
    StyleVariant::ALL.to_vec()
}

/// `enchanting` -> `Enchanting`, `small_caps-font` -> `Small Caps Font`
pub fn title_case(name: &str) -> String {
    name.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

impl FontConfig {
    pub fn family_name(&self) -> String {
        self.family
            .clone()
            .unwrap_or_else(|| title_case(&self.name))
    }
}

impl Default for PixfontConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            copyright: default_copyright(),
            glyph_names: None,
            fonts: Vec::new(),
            base_dir: PathBuf::new(),
        }
    }
}

impl PixfontConfig {
    /// Read pixfont.toml from the current directory
    pub fn read() -> Result<Self> {
        Self::read_from(Path::new(FILE_NAME))
    }

    /// Read a config file; relative paths inside it resolve against its directory
    pub fn read_from(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut config = Self::parse(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self> {
        let config: PixfontConfig = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for font in &self.fonts {
            if font.name.trim().is_empty() {
                bail!("font names must not be empty");
            }
            if !seen.insert(font.name.as_str()) {
                bail!("font '{}' is configured more than once", font.name);
            }
            if font.styles.is_empty() {
                bail!("font '{}' has no styles", font.name);
            }
        }
        Ok(())
    }

    /// Resolve a configured path against the config file's directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_minimal_config() {
        let config = PixfontConfig::parse(
            r#"
            [[fonts]]
            name = "minecraft"
            source = { kind = "providers" }
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("fonts"));
        assert_eq!(config.copyright, DEFAULT_COPYRIGHT);
        assert!(config.glyph_names.is_none());

        let font = &config.fonts[0];
        assert_eq!(font.root, PathBuf::from("assets"));
        assert_eq!(font.styles, StyleVariant::ALL.to_vec());
        assert_eq!(
            font.source,
            SourceConfig::Providers {
                definition: "minecraft:default".into()
            }
        );
        assert_eq!(font.family_name(), "Minecraft");
    }

    #[test]
    fn parses_legacy_source_and_style_subset() {
        let config = PixfontConfig::parse(
            r#"
            output_dir = "out"

            [[fonts]]
            name = "legacy"
            family = "Minecraft Legacy"
            source = { kind = "legacy" }
            styles = ["regular", "bold-italic"]
            "#,
        )
        .unwrap();

        let font = &config.fonts[0];
        assert_eq!(font.source, SourceConfig::Legacy);
        assert_eq!(
            font.styles,
            vec![StyleVariant::Regular, StyleVariant::BoldItalic]
        );
        assert_eq!(font.family_name(), "Minecraft Legacy");
    }

    #[test]
    fn rejects_duplicate_font_names() {
        let result = PixfontConfig::parse(
            r#"
            [[fonts]]
            name = "a"
            source = { kind = "legacy" }

            [[fonts]]
            name = "a"
            source = { kind = "legacy" }
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_source_kind() {
        let result = PixfontConfig::parse(
            r#"
            [[fonts]]
            name = "a"
            source = { kind = "ttf" }
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn title_case_splits_on_separators() {
        assert_eq!(title_case("enchanting"), "Enchanting");
        assert_eq!(title_case("small_caps-font"), "Small Caps Font");
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let mut config = PixfontConfig::default();
        config.base_dir = PathBuf::from("project");
        assert_eq!(
            config.resolve_path(Path::new("assets")),
            PathBuf::from("project/assets")
        );
        assert_eq!(
            config.resolve_path(Path::new("/abs/assets")),
            PathBuf::from("/abs/assets")
        );
    }
}
