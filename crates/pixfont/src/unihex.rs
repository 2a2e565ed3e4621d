//! GNU Unifont `.hex` glyph sources: one `CODEPOINT:HEXDATA` line per glyph.
//!
//! Sources are usually a zip archive of `.hex` files. A single `.hex` file or a directory of
//! extracted ones is accepted as well.

use crate::mask::BitmapMask;
use crate::registry::MAX_CODE_POINT;
use anyhow::{Context, bail};
use fs_err as fs;
use log::warn;
use std::io::Read;
use std::path::Path;
use walkdir::WalkDir;
use zip::ZipArchive;

/// Every unihex glyph is 16 rows tall.
pub const ROWS: u32 = 16;

/// Decode one `CODEPOINT:HEXDATA` line into a code point and its 16-row mask.
///
/// The glyph width is `len(HEXDATA) / 4` pixels and must be a positive multiple of 8. In each
/// row the most significant bit is the leftmost pixel.
pub fn parse_line(line: &str) -> anyhow::Result<(u32, BitmapMask)> {
    let Some((code, data)) = line.trim().split_once(':') else {
        bail!("missing ':' separator");
    };
    let code_point = u32::from_str_radix(code.trim(), 16)
        .with_context(|| format!("invalid code point '{code}'"))?;

    let data = data.trim();
    let width = (data.len() / 4) as u32;
    if data.len() % 4 != 0 || width == 0 || width % 8 != 0 {
        bail!("{} hex digits do not describe 16 rows of whole bytes", data.len());
    }

    let bytes = (0..data.len())
        .step_by(2)
        .map(|i| {
            data.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .with_context(|| format!("invalid hex data at offset {i}"))
        })
        .collect::<anyhow::Result<Vec<u8>>>()?;

    let bytes_per_row = (width / 8) as usize;
    let mask = BitmapMask::from_fn(width, ROWS, |x, y| {
        let byte = bytes[y as usize * bytes_per_row + (x / 8) as usize];
        byte & (0x80 >> (x % 8)) != 0
    });
    Ok((code_point, mask))
}

/// Decode every line of a `.hex` file in order.
///
/// Malformed lines are skipped with a warning. Code points outside the Basic Multilingual Plane
/// are dropped silently.
pub fn parse(text: &str, source: &str) -> Vec<(char, BitmapMask)> {
    let mut glyphs = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (code_point, mask) = match parse_line(line) {
            Ok(glyph) => glyph,
            Err(e) => {
                warn!("Skipping {source}:{}: {e}", number + 1);
                continue;
            }
        };
        if code_point > MAX_CODE_POINT {
            continue;
        }
        match char::from_u32(code_point) {
            Some(c) => glyphs.push((c, mask)),
            None => warn!("Skipping {source}:{}: U+{code_point:04X} is not a character", number + 1),
        }
    }
    glyphs
}

fn is_hex(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".hex")
}

/// Read glyphs from a zip archive of `.hex` files (in entry order), a single `.hex` file, or
/// every `.hex` file under a directory (in name order).
pub fn read_glyphs(path: &Path) -> anyhow::Result<Vec<(char, BitmapMask)>> {
    let is_zip = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    if is_zip {
        return read_zip(path);
    }
    if !path.is_dir() {
        return read_file(path);
    }

    let mut glyphs = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
        if entry.file_type().is_file() && is_hex(&entry.file_name().to_string_lossy()) {
            glyphs.extend(read_file(entry.path())?);
        }
    }
    Ok(glyphs)
}

fn read_file(path: &Path) -> anyhow::Result<Vec<(char, BitmapMask)>> {
    let text = fs::read_to_string(path)?;
    Ok(parse(&text, &path.display().to_string()))
}

fn read_zip(path: &Path) -> anyhow::Result<Vec<(char, BitmapMask)>> {
    let file = fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to open zip archive {}", path.display()))?;

    let mut glyphs = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .with_context(|| format!("Failed to read entry #{index} of {}", path.display()))?;
        if !entry.is_file() || !is_hex(entry.name()) {
            continue;
        }

        let source = format!("{}!{}", path.display(), entry.name());
        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .with_context(|| format!("Failed to read {source}"))?;
        glyphs.extend(parse(&text, &source));
    }
    Ok(glyphs)
}

/// Write a zip archive holding `(entry name, contents)` pairs.
#[cfg(test)]
pub(crate) fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    use std::io::Write;
    use zip::write::{SimpleFileOptions, ZipWriter};

    let mut zip = ZipWriter::new(std::fs::File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, contents) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
            continue;
        }
        zip.start_file(*name, options).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}
