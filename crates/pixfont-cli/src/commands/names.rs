use clap::Parser;
use pixfont::GlyphNames;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Print the glyph name assigned to each character of a string")]
pub struct NamesArgs {
    /// AGLFN-format glyph name file. Defaults to the built-in table.
    #[arg(long, value_name = "FILE")]
    pub glyph_names: Option<PathBuf>,

    /// Characters to look up
    #[arg(value_name = "TEXT")]
    pub text: String,
}

pub fn run(args: NamesArgs) -> bool {
    match run_impl(args) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("[names] ERROR: {e:#}");
            false
        }
    }
}

fn run_impl(args: NamesArgs) -> anyhow::Result<()> {
    let names = match &args.glyph_names {
        Some(path) => GlyphNames::load(path)?,
        None => GlyphNames::builtin(),
    };

    for c in args.text.chars() {
        println!("U+{:04X}\t{}", c as u32, names.name_for(c));
    }
    Ok(())
}
