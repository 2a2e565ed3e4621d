use anyhow::Context;
use fs_err as fs;
use log::warn;
use std::collections::HashMap;
use std::path::Path;

const BUILTIN: &str = include_str!("aglfn.txt");

/// Canonical PostScript glyph names keyed by character.
#[derive(Debug, Clone, Default)]
pub struct GlyphNames {
    names: HashMap<char, String>,
}

/// `uniXXXX` name for characters without a canonical one.
pub fn fallback_name(c: char) -> String {
    format!("uni{:04X}", c as u32)
}

impl GlyphNames {
    pub fn builtin() -> Self {
        Self::parse(BUILTIN)
    }

    /// Parse AGLFN-format text: `XXXX;name;description` lines, `#` comments.
    ///
    /// Malformed lines are skipped with a warning.
    pub fn parse(text: &str) -> Self {
        let mut names = HashMap::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split(';');
            let (Some(code), Some(name)) = (fields.next(), fields.next()) else {
                warn!("Skipping glyph name line {}: expected CODE;NAME", number + 1);
                continue;
            };
            let Some(c) = u32::from_str_radix(code.trim(), 16)
                .ok()
                .and_then(char::from_u32)
            else {
                warn!("Skipping glyph name line {}: bad code point '{code}'", number + 1);
                continue;
            };
            names.insert(c, name.trim().to_string());
        }
        Self { names }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read glyph names from {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, c: char) -> Option<&str> {
        self.names.get(&c).map(String::as_str)
    }

    pub fn name_for(&self, c: char) -> String {
        self.get(c).map_or_else(|| fallback_name(c), str::to_string)
    }
}
