use std::path::PathBuf;
use std::process;

use anyhow::anyhow;
use clap::Parser;
use colored::Colorize;

use xmlsplit::{ChunkSplitter, MatchMode, Preset, SplitError, SplitOptions, DEFAULT_CHUNK_SIZE};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "xmlsplit",
    version,
    about = "Split an XML file into chunk files of matched elements"
)]
struct Cli {
    /// XML file to split
    #[arg(value_name = "INPUT")]
    input_pos: Option<PathBuf>,

    /// Directory receiving the chunk files (created if missing)
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir_pos: Option<PathBuf>,

    /// Tag name of the elements to distribute over chunks
    #[arg(value_name = "ELEMENT")]
    element_pos: Option<String>,

    #[arg(short, long, value_name = "PATH", conflicts_with = "input_pos")]
    input: Option<PathBuf>,

    #[arg(short, long, value_name = "DIR", conflicts_with = "output_dir_pos")]
    output_dir: Option<PathBuf>,

    #[arg(short, long, value_name = "TAG", conflicts_with = "element_pos")]
    element: Option<String>,

    /// Maximum matched elements per chunk file [default: 500]
    #[arg(short = 'n', long, value_name = "N")]
    chunk_size: Option<usize>,

    /// Which matches count: `all` descendants, or `outermost` only [default: all]
    #[arg(long, value_name = "MODE")]
    mode: Option<MatchMode>,

    /// Refuse to overwrite existing chunk files
    #[arg(long)]
    no_clobber: bool,

    /// Report the chunk files that would be written, write nothing
    #[arg(long)]
    dry_run: bool,

    /// Suppress progress messages
    #[arg(short, long)]
    quiet: bool,

    /// Disable colored error output
    #[arg(long)]
    no_color: bool,

    /// TOML preset supplying default arguments
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            process::exit(usage_exit_code(&e));
        }
    };

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(err) = run(cli) {
        eprintln!("{} {}", "error:".red().bold(), err);
        process::exit(exit_code(&err));
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let preset = match &cli.config {
        Some(path) => Preset::load(path)?,
        None => Preset::default(),
    };
    let quiet = cli.quiet;

    let report = ChunkSplitter::new(resolve_options(cli, preset)?)?.run()?;
    if !report.written && !quiet {
        println!("Dry run: {} file(s) would be written", report.chunks.len());
    }
    Ok(())
}

/// Merge command line, preset and built-in defaults, in that order
fn resolve_options(cli: Cli, preset: Preset) -> anyhow::Result<SplitOptions> {
    let preset_mode = preset.match_mode().map_err(anyhow::Error::msg)?;

    let input = cli
        .input
        .or(cli.input_pos)
        .or(preset.input)
        .ok_or_else(|| anyhow!("no input file given (INPUT or --input)"))?;
    let output_dir = cli
        .output_dir
        .or(cli.output_dir_pos)
        .or(preset.output_dir)
        .ok_or_else(|| anyhow!("no output directory given (OUTPUT_DIR or --output-dir)"))?;
    let element = cli
        .element
        .or(cli.element_pos)
        .or(preset.element)
        .ok_or_else(|| anyhow!("no element tag given (ELEMENT or --element)"))?;

    let mut options = SplitOptions::new(input, output_dir, element);
    options.chunk_size = cli.chunk_size.or(preset.chunk_size).unwrap_or(DEFAULT_CHUNK_SIZE);
    options.mode = cli.mode.or(preset_mode).unwrap_or_default();
    options.no_clobber = cli.no_clobber || preset.no_clobber.unwrap_or(false);
    options.dry_run = cli.dry_run;
    options.quiet = cli.quiet;
    Ok(options)
}

/// clap reports usage errors with 2, which is reserved for malformed input
fn usage_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<SplitError>().map_or(1, SplitError::exit_code)
}
