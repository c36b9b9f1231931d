//! Thin CLI driver over the simulator harness. Not part of the algorithmic
//! core (see SPEC_FULL.md §1's non-goals) — parses arguments, builds a
//! generator config or snapshot loader, runs the harness, and prints a
//! report.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rand::SeedableRng;

use region_balance::generator::GeneratorConfig;
use region_balance::harness::{self, SnapshotSource};
use region_balance::solvers::Algorithm;

/// Region-to-store migration planner for a sharded, load-balanced storage
/// cluster.
#[derive(Parser)]
#[command(name = "region-balance", version, about)]
struct Cli {
    /// Number of stores in the synthetic cluster.
    store_nums: usize,

    /// Fractional half-width of the acceptable load band around the mean.
    tolerant_rate: f64,

    /// Number of independent simulation runs to aggregate.
    #[arg(default_value_t = 1)]
    repeat: usize,

    /// Balancing algorithm tag (case-insensitive). One of ILP,
    /// GREEDY-SINGLE, GREEDY-GLOBAL, GREEDY-GLOBAL-SPLIT, GREEDY-MULTI,
    /// GREEDY-MULTI-GREEDY, GREEDY-MULTI-GREEDY-GENERAL.
    #[arg(default_value = "GREEDY-GLOBAL")]
    alg: String,

    /// Seed the RNG for reproducible generation.
    #[arg(long)]
    seed: Option<u64>,

    /// Load a snapshot dump instead of generating one (disables `repeat`
    /// re-generation; every run reuses the same file).
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Dimensionality of a loaded snapshot (ignored when generating).
    #[arg(long, default_value_t = 2)]
    dims: usize,

    /// Disable region splitting during balancing.
    #[arg(long)]
    no_split: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let algorithm: Algorithm = cli
        .alg
        .parse()
        .with_context(|| format!("unrecognized algorithm tag {:?}", cli.alg))?;

    let mut rng = match cli.seed {
        Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
        None => rand::rngs::StdRng::from_entropy(),
    };

    let source = match cli.snapshot {
        Some(path) => SnapshotSource::Load { path, dims: cli.dims },
        None => {
            let region_nums_per_store = 10.0;
            let target_load = cli.store_nums as f64 * region_nums_per_store;
            let migrate_nums = (cli.store_nums as f64 * region_nums_per_store * 0.5) as usize;
            SnapshotSource::Generate(GeneratorConfig::uniform(
                cli.dims,
                target_load,
                cli.store_nums,
                migrate_nums,
                cli.tolerant_rate,
            ))
        }
    };

    let report = harness::run_repeated(algorithm, &source, cli.tolerant_rate, !cli.no_split, cli.repeat, &mut rng)
        .context("balancing run failed")?;

    println!("algorithm: {}", algorithm.tag());
    println!("runs: {}", report.runs);
    println!("migrate_nums: max {:.2}, avg {:.2}", report.migrate_nums.max, report.migrate_nums.mean);
    println!("pre_max_mean: max {:.4}, avg {:.4}", report.pre_max_mean.max, report.pre_max_mean.mean);
    println!("pre_min_mean: max {:.4}, avg {:.4}", report.pre_min_mean.max, report.pre_min_mean.mean);
    println!("aft_max_mean: max {:.4}, avg {:.4}", report.aft_max_mean.max, report.aft_max_mean.mean);
    println!("aft_min_mean: max {:.4}, avg {:.4}", report.aft_min_mean.max, report.aft_min_mean.mean);
    println!("used_time: max {:.6}s, avg {:.6}s", report.used_time.max, report.used_time.mean);

    Ok(())
}
