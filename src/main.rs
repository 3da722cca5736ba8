use eyre::Result;
use gumdrop::Options;
use log::{info, warn};
use logseq_to_obsidian::{Converter, TasksFormat};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Options)]
struct Opts {
    #[options(help = "Display program help")]
    help: bool,

    #[options(help = "Display program version", no_short, help_flag)]
    version: bool,

    #[options(
        help = "Path to the Logseq graph to convert",
        no_short,
        required,
        meta = "DIR"
    )]
    input: PathBuf,

    #[options(
        help = "Path of the Obsidian vault to write",
        no_short,
        required,
        meta = "DIR"
    )]
    output: PathBuf,

    #[options(help = "Move journal pages into this folder", no_short, meta = "NAME")]
    daily_folder: Option<String>,

    #[options(
        help = "Format of task metadata (one of: emoji, inline-field)",
        no_short,
        meta = "FORMAT",
        default = "emoji"
    )]
    tasks_format: TasksFormat,

    #[options(
        help = "Turn [[KEY/value]] links into [KEY::value] inline fields (repeatable)",
        no_short,
        meta = "KEY"
    )]
    field_key: Vec<String>,

    #[options(help = "Show what would be written without touching the output", no_short)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = Opts::parse_args_default(&raw).unwrap_or_else(|err| {
        eprintln!("{}: {err}", env!("CARGO_BIN_NAME"));
        process::exit(2);
    });
    // Both flags skip the check for required options.
    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if args.help_requested() {
        println!("Usage: {} [OPTIONS]\n\n{}", env!("CARGO_BIN_NAME"), Opts::usage());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut converter = Converter::new(args.input, args.output);
    converter
        .tasks_format(args.tasks_format)
        .daily_folder(args.daily_folder)
        .field_keys(args.field_key)
        .dry_run(args.dry_run);
    let report = converter.run()?;

    for warning in &report.warnings {
        warn!("{warning}");
    }
    if !report.warnings.is_empty() {
        warn!("Conversion completed with {} warning(s)", report.warnings.len());
    }
    if args.dry_run {
        info!("Dry run complete, no files were written");
    }
    Ok(())
}
