use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleVariant {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl StyleVariant {
    /// Fixed processing order for the four styles of a glyph.
    pub const ALL: [StyleVariant; 4] = [
        StyleVariant::Regular,
        StyleVariant::Italic,
        StyleVariant::Bold,
        StyleVariant::BoldItalic,
    ];

    pub fn is_bold(self) -> bool {
        matches!(self, StyleVariant::Bold | StyleVariant::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, StyleVariant::Italic | StyleVariant::BoldItalic)
    }

    /// Name used in the font's naming table.
    pub fn style_name(self) -> &'static str {
        match self {
            StyleVariant::Regular => "Regular",
            StyleVariant::Bold => "Bold",
            StyleVariant::Italic => "Italic",
            StyleVariant::BoldItalic => "Bold Italic",
        }
    }

    /// Suffix appended to the family base name for this style's file.
    pub fn file_suffix(self) -> &'static str {
        match self {
            StyleVariant::Regular => "",
            StyleVariant::Bold => "-bold",
            StyleVariant::Italic => "-italic",
            StyleVariant::BoldItalic => "-bold-italic",
        }
    }

    pub fn file_name(self, base: &str) -> String {
        format!("{base}{}.ttf", self.file_suffix())
    }

    pub(crate) fn index(self) -> usize {
        match self {
            StyleVariant::Regular => 0,
            StyleVariant::Italic => 1,
            StyleVariant::Bold => 2,
            StyleVariant::BoldItalic => 3,
        }
    }
}

impl fmt::Display for StyleVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.style_name())
    }
}

impl FromStr for StyleVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '_'], "-").as_str() {
            "regular" => Ok(StyleVariant::Regular),
            "bold" => Ok(StyleVariant::Bold),
            "italic" => Ok(StyleVariant::Italic),
            "bold-italic" => Ok(StyleVariant::BoldItalic),
            other => Err(format!(
                "unknown style '{other}' (expected regular, bold, italic or bold-italic)"
            )),
        }
    }
}
