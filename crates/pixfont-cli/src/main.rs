mod commands;

use clap::{Parser, Subcommand, builder::styling};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;

#[derive(Parser)]
#[command(name = "pixfont")]
#[command(about = "Compile bitmap glyph atlases into TrueType fonts")]
#[command(version = env!("PIXFONT_VERSION"))]
#[command(long_version = env!("PIXFONT_VERSION"))]
#[command(
    styles = styling::Styles::styled()
        .header(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(styling::AnsiColor::Cyan.on_default() | styling::Effects::BOLD)
        .placeholder(styling::AnsiColor::Cyan.on_default())
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every configured font into one .ttf per style
    Build(commands::build::BuildArgs),
    /// Trace a single glyph image and print its outline as JSON
    Trace(commands::trace::TraceArgs),
    /// Print the glyph name assigned to each character of a string
    Names(commands::names::NamesArgs),
}

fn main() {
    let cli = Cli::parse();
    let multi = MultiProgress::new();
    init_logging(&cli.verbose, &multi);

    let result = match cli.command {
        Commands::Build(args) => commands::build::run(args, &multi),
        Commands::Trace(args) => commands::trace::run(args),
        Commands::Names(args) => commands::names::run(args),
    };

    std::process::exit(if result { 0 } else { 1 });
}

/// Route log output through the progress bars so lines don't tear them
fn init_logging(verbose: &Verbosity<InfoLevel>, multi: &MultiProgress) {
    let logger = env_logger::Builder::new()
        .filter_level(verbose.log_level_filter())
        .parse_default_env()
        .format_timestamp(None)
        .format_module_path(false)
        .build();
    let level = logger.filter();

    if let Err(e) = LogWrapper::new(multi.clone(), logger).try_init() {
        eprintln!("[pixfont] ERROR: failed to initialize logging: {e}");
    }
    log::set_max_level(level);
}
