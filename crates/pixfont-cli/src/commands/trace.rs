use anyhow::Context;
use clap::Parser;
use pixfont::outline::Contour;
use pixfont::registry::compute_entry;
use pixfont::{BitmapMask, StyleVariant};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Trace a single glyph image and print its outline as JSON")]
pub struct TraceArgs {
    /// Glyph image; pixels with non-zero alpha are ink
    #[arg(value_name = "PNG")]
    pub input: PathBuf,

    /// Nominal pixel height the image is drawn at
    #[arg(long, default_value = "8")]
    pub height: u32,

    /// Pixels above the baseline at that height
    #[arg(long, default_value = "7", allow_negative_numbers = true)]
    pub ascent: i32,

    /// Style to trace (regular, bold, italic, bold-italic)
    #[arg(long, default_value = "regular")]
    pub style: StyleVariant,
}

#[derive(Debug, Serialize)]
struct TraceReport {
    style: StyleVariant,
    width: u32,
    height: u32,
    ink_extent: [u32; 2],
    advance: f64,
    ink_height: f64,
    contours: Vec<Contour>,
}

pub fn run(args: TraceArgs) -> bool {
    match run_impl(args) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("[trace] ERROR: {e:#}");
            false
        }
    }
}

fn run_impl(args: TraceArgs) -> anyhow::Result<()> {
    let image = image::open(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?
        .to_rgba8();
    let mask = BitmapMask::from_rgba(&image);

    let entry = compute_entry(&mask, args.height, args.ascent, args.style)?;
    let (ink_w, ink_h) = mask.extent();

    let report = TraceReport {
        style: args.style,
        width: mask.width(),
        height: mask.height(),
        ink_extent: [ink_w, ink_h],
        advance: entry.advance,
        ink_height: entry.height.unwrap_or(0.0),
        contours: entry.outline.map(|o| o.contours).unwrap_or_default(),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
