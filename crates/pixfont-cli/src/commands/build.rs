use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, info};
use pixfont::provider::{self, ResourceId, ResourceRoot};
use pixfont::{FontInfo, GlyphNames, GlyphRegistry, StyleVariant, legacy, write_family};
use pixfont_config::{FontConfig, PixfontConfig, SourceConfig};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(about = "Build every configured font into one .ttf per style")]
pub struct BuildArgs {
    /// Path to the config file. Defaults to pixfont.toml in the current directory.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Resource root of a single font described on the command line (skips the config file)
    #[arg(long, value_name = "DIR", requires = "name")]
    pub root: Option<PathBuf>,

    /// Font definition to build from --root
    #[arg(long, default_value = "minecraft:default", value_name = "ID")]
    pub definition: String,

    /// Read the legacy ascii.png / unicode_page_XX.png layout from --root
    #[arg(long, requires = "root")]
    pub legacy: bool,

    /// Output base name of the font given with --root
    #[arg(long, requires = "root")]
    pub name: Option<String>,

    /// Family name of the font given with --root
    #[arg(long, requires = "root")]
    pub family: Option<String>,

    /// Directory to write fonts to (overrides output_dir)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Modification time as unix seconds, for reproducible output
    #[arg(long, value_name = "UNIX_SECONDS")]
    pub timestamp: Option<i64>,

    /// Only write these styles (repeatable)
    #[arg(long = "style", value_name = "STYLE")]
    pub styles: Vec<StyleVariant>,

    /// AGLFN-format glyph name file (overrides glyph_names)
    #[arg(long, value_name = "FILE")]
    pub glyph_names: Option<PathBuf>,
}

pub fn run(args: BuildArgs, multi: &MultiProgress) -> bool {
    match run_impl(args, multi) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("[build] ERROR: {e:#}");
            false
        }
    }
}

fn run_impl(args: BuildArgs, multi: &MultiProgress) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    if config.fonts.is_empty() {
        bail!("no fonts configured");
    }

    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => config.resolve_path(&config.output_dir),
    };

    let modified = match args.timestamp {
        Some(seconds) => DateTime::from_timestamp(seconds, 0)
            .with_context(|| format!("--timestamp {seconds} is out of range"))?,
        None => Utc::now(),
    };

    let names = match args
        .glyph_names
        .clone()
        .or_else(|| config.glyph_names.as_deref().map(|p| config.resolve_path(p)))
    {
        Some(path) => GlyphNames::load(&path)?,
        None => GlyphNames::builtin(),
    };

    for font in &config.fonts {
        let styles = if args.styles.is_empty() {
            font.styles.clone()
        } else {
            args.styles.clone()
        };

        println!("[build] Converting {} …", font.name);
        let root = ResourceRoot::new(config.resolve_path(&font.root));
        let registry = load_glyphs(font, &root, multi)
            .with_context(|| format!("Failed to load glyphs for {}", font.name))?;
        info!("{} characters registered for {}", registry.len(), font.name);

        let mut font_info = FontInfo::new(font.family_name(), modified);
        font_info.copyright = config.copyright.clone();

        let written = write_family(&registry, &names, &font_info, &styles, &output_dir, &font.name)?;
        for path in written {
            println!("[build] Wrote {}", path.display());
        }
    }

    println!("[build] Done");
    Ok(())
}

fn load_config(args: &BuildArgs) -> anyhow::Result<PixfontConfig> {
    let Some(root) = &args.root else {
        return match &args.config {
            Some(path) => PixfontConfig::read_from(path),
            None => PixfontConfig::read(),
        };
    };

    let mut config = match &args.config {
        Some(path) => PixfontConfig::read_from(path)?,
        None => PixfontConfig::default(),
    };

    let Some(name) = args.name.clone() else {
        bail!("--root requires --name");
    };
    let source = if args.legacy {
        SourceConfig::Legacy
    } else {
        SourceConfig::Providers {
            definition: args.definition.clone(),
        }
    };
    config.fonts = vec![FontConfig {
        name,
        family: args.family.clone(),
        root: absolute(root),
        source,
        styles: StyleVariant::ALL.to_vec(),
    }];
    Ok(config)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn load_glyphs(
    font: &FontConfig,
    root: &ResourceRoot,
    multi: &MultiProgress,
) -> anyhow::Result<GlyphRegistry> {
    let mut registry = GlyphRegistry::new();

    match &font.source {
        SourceConfig::Legacy => {
            let stats = legacy::load_legacy(&mut registry, root)?;
            println!(
                "[build] Loaded {} ASCII and {} unicode characters",
                stats.ascii, stats.unicode
            );
        }
        SourceConfig::Providers { definition } => {
            let id: ResourceId = definition.parse()?;
            let providers = provider::expand(root, &id)?;

            let bar = multi.add(ProgressBar::new(providers.len() as u64));
            bar.set_style(
                ProgressStyle::with_template("{prefix:.bold} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")?
                    .progress_chars("=> "),
            );
            bar.set_prefix(font.name.clone());

            let added = provider::apply_providers(&mut registry, root, &providers, |provider, _| {
                bar.set_message(provider.to_string());
                bar.inc(1);
            })?;
            bar.finish_and_clear();
            debug!("{added} characters registered from {id}");
            multi.remove(&bar);
        }
    }

    Ok(registry)
}
