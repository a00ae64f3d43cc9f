//! evidence-dedup command line
//!
//! Reads a JSON array of evidence records from a file or stdin and prints
//! either the deduplicated batch or the list of potential duplicate pairs.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use evidence_dedup::{
    deduplicate_detailed, find_potential_duplicates, CandidateStrategy, DedupError,
    DeduplicationOptions, EvidenceRecord, OverflowPolicy,
};

#[derive(Parser)]
#[command(name = "evidence-dedup", version, about = "Find and collapse near-duplicate evidence records")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deduplicate a batch of evidence records
    Dedupe(DedupeArgs),
    /// List record pairs at or above a similarity threshold
    Report {
        /// JSON file of records, or "-" for stdin
        input: PathBuf,
        /// Minimum similarity to report
        #[arg(long, default_value_t = 0.8)]
        threshold: f64,
    },
}

#[derive(Args)]
struct DedupeArgs {
    /// JSON file of records, or "-" for stdin
    input: PathBuf,
    /// Options file (.toml or .json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the similarity threshold
    #[arg(long)]
    threshold: Option<f64>,
    /// Merge groups instead of keeping the best record
    #[arg(long)]
    merge: bool,
    /// Rank by relevance instead of quality when selecting
    #[arg(long)]
    prefer_relevance: bool,
    /// Override the number of groups resolved
    #[arg(long)]
    max_groups: Option<usize>,
    /// Handling of groups past the cap
    #[arg(long, value_enum)]
    overflow: Option<OverflowArg>,
    /// Only score pairs that share a token
    #[arg(long)]
    shared_token: bool,
    /// Print groups and counters along with the records
    #[arg(long)]
    detailed: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OverflowArg {
    PassThrough,
    Drop,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Dedupe(args) => {
            let records = read_records(&args.input)?;
            let options = build_options(&args)?;
            let outcome = deduplicate_detailed(&records, &options)?;
            if args.detailed {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&outcome.records)?);
            }
        }
        Command::Report { input, threshold } => {
            let records = read_records(&input)?;
            let pairs = find_potential_duplicates(&records, threshold)?;
            println!("{}", serde_json::to_string_pretty(&pairs)?);
        }
    }

    Ok(())
}

fn build_options(args: &DedupeArgs) -> Result<DeduplicationOptions, Box<dyn std::error::Error>> {
    let mut options = match &args.config {
        Some(path) => load_options(path)?,
        None => DeduplicationOptions::default(),
    };

    if let Some(threshold) = args.threshold {
        options.similarity_threshold = threshold;
    }
    if args.merge {
        options.merge_similar_items = true;
    }
    if args.prefer_relevance {
        options.preserve_highest_quality = false;
    }
    if let Some(max_groups) = args.max_groups {
        options.max_similarity_groups = max_groups;
    }
    if let Some(overflow) = args.overflow {
        options.overflow_policy = match overflow {
            OverflowArg::PassThrough => OverflowPolicy::PassThrough,
            OverflowArg::Drop => OverflowPolicy::Drop,
        };
    }
    if args.shared_token {
        options.candidate_strategy = CandidateStrategy::SharedToken;
    }

    options.validate()?;
    Ok(options)
}

fn load_options(path: &Path) -> Result<DeduplicationOptions, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let options = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => DeduplicationOptions::from_toml(&content)?,
        _ => DeduplicationOptions::from_json(&content)?,
    };
    tracing::debug!("Loaded options from {:?}", path);
    Ok(options)
}

fn read_records(input: &Path) -> Result<Vec<EvidenceRecord>, Box<dyn std::error::Error>> {
    let content = if input == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(input)?
    };

    let records: Vec<EvidenceRecord> =
        serde_json::from_str(&content).map_err(|e| DedupError::Records(e.to_string()))?;
    tracing::debug!(records = records.len(), "Read evidence batch");
    Ok(records)
}
