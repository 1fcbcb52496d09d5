use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use varitree::store::{DEFAULT_INNER_RANK, DEFAULT_LEAF_RANK};
use varitree::{GenomeVariantStore, Position, RecordRef, StoreConfig, Variant};

#[derive(Parser, Debug)]
#[command(name = "varitree", about = "Position-indexed variant store for VCF/BCF files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Variant file (VCF, bgzipped VCF or BCF).
    variants: PathBuf,
    /// Max children per inner node.
    #[arg(long, default_value_t = DEFAULT_INNER_RANK)]
    inner_rank: usize,
    /// Max entries per leaf node.
    #[arg(long, default_value_t = DEFAULT_LEAF_RANK)]
    leaf_rank: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a variant file and report per-chromosome tree statistics.
    Stats {
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Print records at or after a position.
    Query {
        #[command(flatten)]
        index: IndexArgs,
        /// Chromosome name as written in the CHROM column.
        chrom: String,
        /// 1-based start position.
        pos: Position,
        /// Maximum number of records to print.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print records inside a half-open window [start, end).
    Range {
        #[command(flatten)]
        index: IndexArgs,
        /// Chromosome name as written in the CHROM column.
        chrom: String,
        /// 1-based window start (inclusive).
        start: Position,
        /// 1-based window end (exclusive).
        end: Position,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { index } => run_stats(index)?,
        Commands::Query {
            index,
            chrom,
            pos,
            limit,
        } => run_query(index, &chrom, pos, limit)?,
        Commands::Range {
            index,
            chrom,
            start,
            end,
        } => run_range(index, &chrom, start, end)?,
    }

    Ok(())
}

fn load_store(args: &IndexArgs) -> Result<GenomeVariantStore> {
    let config = StoreConfig::new(args.inner_rank, args.leaf_rank)
        .context("invalid tree ranks")?;
    let (store, _) = GenomeVariantStore::from_path(&args.variants, config)
        .with_context(|| format!("failed to index {}", args.variants.display()))?;
    Ok(store)
}

fn run_stats(args: IndexArgs) -> Result<()> {
    let store = load_store(&args)?;

    println!("chrom\trecords\tpositions\theight\tleaves\tinner");
    for chrom in store.chromosomes() {
        let stats = chrom.stats();
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            chrom.name(),
            stats.records,
            stats.distinct_positions,
            stats.height,
            stats.leaf_nodes,
            stats.inner_nodes
        );
    }
    println!("total\t{}", store.total_record_count());
    Ok(())
}

fn run_query(args: IndexArgs, chrom: &str, pos: Position, limit: usize) -> Result<()> {
    let store = load_store(&args)?;

    let mut cursor = store.record_at_or_after(chrom, pos);
    let mut printed = 0;
    while let Some(record) = cursor {
        if printed == limit {
            break;
        }
        print_record(record);
        printed += 1;
        cursor = store.next_record(record);
    }

    if printed == 0 {
        println!("No variants at or after {chrom}:{pos}.");
    }
    Ok(())
}

fn run_range(args: IndexArgs, chrom: &str, start: Position, end: Position) -> Result<()> {
    anyhow::ensure!(start < end, "empty window {start}..{end}");
    let store = load_store(&args)?;

    let mut printed = 0;
    for record in store.records_in_range(chrom, start..end) {
        print_record(record);
        printed += 1;
    }
    if printed == 0 {
        println!("No variants in {chrom}:{start}-{end}.");
    }
    Ok(())
}

fn print_record(record: RecordRef<'_, Variant>) {
    let variant = record.payload();
    let alternates: Vec<&str> = variant.alternates().collect();
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        variant.chrom,
        variant.position,
        variant.id.as_deref().unwrap_or("."),
        variant.reference(),
        alternates.join(","),
        variant
            .quality
            .map(|q| format!("{q:.2}"))
            .unwrap_or_else(|| ".".to_string())
    );
}
