//! fpmatch - score two fingerprints against each other
//!
//! Usage: fpmatch <fingerprint_a> <fingerprint_b>

use anyhow::{Context, Result};
use clap::Parser;
use fprint_cli::output::{print_json, MatchReport};
use fprint_core::matching::{is_eq, is_match, match_chromab, match_cpfm, match_fooid};
use fprint_core::record::FPrint;
use fprint_fp::text::fprint_from_string;

#[derive(Parser, Debug)]
#[command(name = "fpmatch")]
#[command(about = "Compare two music fingerprints", long_about = None)]
struct Args {
    /// First fingerprint file (canonical text form)
    file_a: String,

    /// Second fingerprint file
    file_b: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    let a = read_fingerprint(&args.file_a)?;
    let b = read_fingerprint(&args.file_b)?;

    log::info!(
        "Comparing {} ({}s) with {} ({}s)",
        args.file_a,
        a.songlen,
        args.file_b,
        b.songlen
    );

    let score = match_cpfm(&a, &b);
    let report = MatchReport {
        file_a: args.file_a,
        file_b: args.file_b,
        score,
        fooid: match_fooid(&a.r, &a.dom, &b.r, &b.dom),
        chroma: match_chromab(a.cprint(), b.cprint()),
        equal: is_eq(score),
        matched: is_match(score),
    };

    print_json(&report);

    Ok(())
}

fn read_fingerprint(path: &str) -> Result<FPrint> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fingerprint file: {}", path))?;
    fprint_from_string(text.trim()).with_context(|| format!("{}: invalid fingerprint", path))
}
