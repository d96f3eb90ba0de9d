//! fpindex - build an in-memory fingerprint index and query it
//!
//! Usage: fpindex <collection_file> <query_file> [--strategy match]

use anyhow::{Context, Result};
use clap::Parser;
use fprint_cli::output::{print_json, QueryHit, QueryReport};
use fprint_core::matching::match_cpfm;
use fprint_fp::text::fprint_from_string;
use fprint_fp::FpReader;
use fprint_index::key::compress_record;
use fprint_index::{IndexConfig, RTreeIndex, Strategy};
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "fpindex")]
#[command(about = "Index a fingerprint collection and search it", long_about = None)]
struct Args {
    /// Collection file: one text fingerprint per line
    collection: String,

    /// Query fingerprint file
    query: String,

    /// Search strategy: eq, match, or neq
    #[arg(short, long, default_value = "match")]
    strategy: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    let strategy = parse_strategy(&args.strategy)?;

    let config = match &args.config {
        Some(path) => IndexConfig::load(Path::new(path))?,
        None => IndexConfig::default(),
    };

    let records = FpReader::read_text(Path::new(&args.collection))?;
    if records.is_empty() {
        anyhow::bail!("collection {} holds no fingerprints", args.collection);
    }

    let mut index = RTreeIndex::new(&config);
    for fp in &records {
        index
            .insert(fp)
            .with_context(|| format!("inserting into index from {}", args.collection))?;
    }
    log::info!("Indexed {} fingerprints", index.len());

    let query_text = std::fs::read_to_string(&args.query)
        .with_context(|| format!("Failed to read query file: {}", args.query))?;
    let query = fprint_from_string(query_text.trim())
        .with_context(|| format!("{}: invalid fingerprint", args.query))?;

    let hits = index
        .search(&query, strategy)
        .context("index search failed")?;

    let query_key = compress_record(&query);
    let results: Vec<QueryHit> = hits
        .iter()
        .map(|h| QueryHit {
            songlen: h.songlen,
            bit_rate: h.bit_rate,
            num_errors: h.num_errors,
            score: match_cpfm(&query_key, h),
        })
        .collect();

    let report = QueryReport {
        collection: args.collection,
        strategy: args.strategy,
        indexed: index.len(),
        detections: results.len(),
        results,
    };

    print_json(&report);

    Ok(())
}

fn parse_strategy(s: &str) -> Result<Strategy> {
    match s.to_lowercase().as_str() {
        "eq" => Ok(Strategy::Eq),
        "match" => Ok(Strategy::Match),
        "neq" => Ok(Strategy::Neq),
        other => match other.parse::<u16>().ok().and_then(Strategy::from_number) {
            Some(st) => Ok(st),
            None => anyhow::bail!("unknown strategy '{}' (use eq, match, or neq)", s),
        },
    }
}
