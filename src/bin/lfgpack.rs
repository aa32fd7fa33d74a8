//! `lfgpack`: create LFG archives.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context};
use clap::Parser;

use lfg::archive::writer::{pack_archive, DictChoice, PackOptions};
use lfg::cli::{read_list_file, set_display_level};
use lfg::codec::{DictSize, Strategy};
use lfg::display;

#[derive(Parser, Debug)]
#[command(
    name = "lfgpack",
    version = lfg::VERSION_STRING,
    about = "Creates LFG archives, imploding each input file",
    arg_required_else_help = true
)]
struct Args {
    /// Output archive path (continuation volumes advance the pre-extension
    /// letter: NAME___A.XXX, NAME___B.XXX, ...)
    #[arg(value_name = "ARCHIVE")]
    archive: PathBuf,

    /// Files to pack
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Read input paths from a list file (one per line)
    #[arg(short, long, value_name = "LIST", conflicts_with = "files")]
    file_list: Option<PathBuf>,

    /// Dictionary (window) size in KiB: 1, 2, 4, or auto by file size
    #[arg(short, long, value_name = "SIZE", default_value = "auto", value_parser = parse_dict)]
    dictionary: DictChoice,

    /// Literal coding mode (only mode 0 is supported)
    #[arg(short = 'm', long, value_name = "MODE", default_value_t = 0)]
    literal_mode: u8,

    /// Byte budget of the first volume file
    #[arg(long, value_name = "BYTES")]
    first_disk_size: Option<u64>,

    /// Byte budget of each later volume file (defaults to the first's)
    #[arg(long, value_name = "BYTES")]
    disk_size: Option<u64>,

    /// Optimization level: 1 = greedy, 3 = lazy, 5 = try everything
    #[arg(short = 'O', long, value_name = "LEVEL", default_value_t = 3)]
    optimize: u8,

    /// Show per-file codec statistics and timing
    #[arg(short, long)]
    verbose: bool,

    /// Errors only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_dict(value: &str) -> Result<DictChoice, String> {
    match value {
        "auto" => Ok(DictChoice::Auto),
        "1" => Ok(DictChoice::Fixed(DictSize::K1)),
        "2" => Ok(DictChoice::Fixed(DictSize::K2)),
        "4" => Ok(DictChoice::Fixed(DictSize::K4)),
        _ => Err("expected 1, 2, 4 or auto".to_owned()),
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if args.literal_mode != 0 {
        bail!("literal mode {} is not supported (only mode 0)", args.literal_mode);
    }

    let (strategy, exhaustive) = match args.optimize {
        1 => (Strategy::Greedy, false),
        3 => (Strategy::Lazy, false),
        5 => (Strategy::Lazy, true),
        other => bail!("optimization level {other} is not supported (use 1, 3 or 5)"),
    };

    let inputs: Vec<PathBuf> = match &args.file_list {
        Some(list) => read_list_file(list)
            .with_context(|| format!("reading list file {}", list.display()))?
            .into_iter()
            .map(PathBuf::from)
            .collect(),
        None => args.files.clone(),
    };
    if inputs.is_empty() {
        bail!("no input files given");
    }

    let first_disk_size = args.first_disk_size.unwrap_or(u64::from(u32::MAX));
    let opts = PackOptions {
        dict: args.dictionary,
        strategy,
        exhaustive,
        first_disk_size,
        disk_size: args.disk_size.unwrap_or(first_disk_size),
        show_stats: args.verbose,
    };

    pack_archive(&args.archive, &inputs, &opts)
        .map(|_| ())
        .map_err(|e| anyhow!("{}: {e}", args.archive.display()))
}

fn main() -> ExitCode {
    let args = Args::parse();
    set_display_level(if args.quiet { 1 } else { 2 });

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display!("lfgpack: {e:#}\n");
            ExitCode::FAILURE
        }
    }
}
