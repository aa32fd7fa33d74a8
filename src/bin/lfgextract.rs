//! `lfgextract`: list or extract LFG archives.
//!
//! Archives are processed sequentially; each run reports how many entries of
//! the path list it consumed (continuation volumes resolved through the list
//! count too), and the loop resumes after them.  Per-archive and per-file
//! failures are reported without aborting the remaining work, and the exit
//! code stays 0 whenever the tool itself ran to completion.

use std::path::PathBuf;

use clap::Parser;

use lfg::archive::reader::{extract_archive, ExtractOptions};
use lfg::cli::set_display_level;
use lfg::displaylevel;

#[derive(Parser, Debug)]
#[command(
    name = "lfgextract",
    version = lfg::VERSION_STRING,
    about = "Extracts files from LFG archives used by older LucasFilm Games installers (.XXX)",
    arg_required_else_help = true
)]
struct Args {
    /// Archive volume(s); later paths also serve as continuation volumes
    #[arg(required = true, value_name = "ARCHIVE")]
    archives: Vec<PathBuf>,

    /// Show archive info only (do not extract)
    #[arg(short, long)]
    info: bool,

    /// Show per-file codec statistics and timing
    #[arg(short, long)]
    stats: bool,

    /// Overwrite output files that already exist
    #[arg(short, long)]
    force: bool,

    /// Directory to extract into
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// More detail (per-volume progress)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Errors only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.quiet {
        1
    } else {
        2 + u32::from(args.verbose)
    };
    set_display_level(level);

    let opts = ExtractOptions {
        info_only: args.info,
        show_stats: args.stats,
        overwrite: args.force,
        output_dir: args.output_dir,
    };

    let mut index = 0;
    while index < args.archives.len() {
        let remaining = &args.archives[index..];
        match extract_archive(remaining, &opts) {
            Ok(summary) => index += summary.paths_consumed.max(1),
            Err(e) => {
                displaylevel!(1, "lfgextract: {}: {e}", remaining[0].display());
                index += 1;
            }
        }
    }
}
