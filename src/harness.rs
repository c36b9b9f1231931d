//! Simulator harness: generate (or load) a snapshot, dispatch to a solver,
//! and report pre/post imbalance metrics alongside timing. See
//! SPEC_FULL.md §4.8.

use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;

use crate::error::Error;
use crate::generator::{self, GeneratorConfig};
use crate::snapshot::Snapshot;
use crate::solvers::{self, Algorithm};

/// One run's outcome: the inputs that shaped it plus the metrics the
/// reference CLI prints per iteration.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub migrate_nums: usize,
    pub pre_max_mean: Vec<f64>,
    pub pre_min_mean: Vec<f64>,
    pub aft_max_mean: Vec<f64>,
    pub aft_min_mean: Vec<f64>,
    pub used_time: Duration,
}

/// Where a run's input snapshot comes from.
pub enum SnapshotSource {
    Generate(GeneratorConfig),
    Load { path: PathBuf, dims: usize },
}

/// Run one solver pass against a fresh (or loaded) snapshot.
pub fn run_once(
    algorithm: Algorithm,
    source: &SnapshotSource,
    ratio: f64,
    allow_split: bool,
    rng: &mut impl Rng,
) -> Result<RunRecord, Error> {
    let snapshot: Snapshot = match source {
        SnapshotSource::Generate(config) => generator::generate(config, rng),
        SnapshotSource::Load { path, dims } => generator::load_snapshot(path, *dims)?,
    };

    let pre_max_mean = snapshot.max_mean_ratios();
    let pre_min_mean = snapshot.min_mean_ratios();

    let (outcome, used_time) = solvers::balance(algorithm, &snapshot, ratio, allow_split)?;

    Ok(RunRecord {
        migrate_nums: outcome.plan.len(),
        pre_max_mean,
        pre_min_mean,
        aft_max_mean: outcome.aft_max_mean,
        aft_min_mean: outcome.aft_min_mean,
        used_time,
    })
}

/// Aggregate of `repeat` independent [`run_once`] calls: max and mean of
/// every metric across the batch, matching the reference CLI's
/// `greedyTest` summary loop.
#[derive(Debug, Clone)]
pub struct AggregateReport {
    pub runs: usize,
    pub migrate_nums: MinMaxMean,
    pub pre_max_mean: MinMaxMean,
    pub pre_min_mean: MinMaxMean,
    pub aft_max_mean: MinMaxMean,
    pub aft_min_mean: MinMaxMean,
    pub used_time: MinMaxMean,
}

#[derive(Debug, Clone, Copy)]
pub struct MinMaxMean {
    pub max: f64,
    pub mean: f64,
}

fn summarize(values: &[f64]) -> MinMaxMean {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    MinMaxMean { max, mean }
}

/// Run `repeat` fresh simulations (each generating its own snapshot unless
/// `source` is a fixed load) and aggregate their metrics.
pub fn run_repeated(
    algorithm: Algorithm,
    source: &SnapshotSource,
    ratio: f64,
    allow_split: bool,
    repeat: usize,
    rng: &mut impl Rng,
) -> Result<AggregateReport, Error> {
    assert!(repeat > 0, "repeat count must be at least one");
    let mut records = Vec::with_capacity(repeat);
    for i in 0..repeat {
        let record = run_once(algorithm, source, ratio, allow_split, rng)?;
        log::debug!(
            "run {i}: migrate_nums={} used_time={:?}",
            record.migrate_nums,
            record.used_time
        );
        records.push(record);
    }

    let migrate_nums: Vec<f64> = records.iter().map(|r| r.migrate_nums as f64).collect();
    let used_time: Vec<f64> = records.iter().map(|r| r.used_time.as_secs_f64()).collect();
    let pre_max_mean: Vec<f64> = records.iter().flat_map(|r| r.pre_max_mean.iter().cloned()).collect();
    let pre_min_mean: Vec<f64> = records.iter().flat_map(|r| r.pre_min_mean.iter().cloned()).collect();
    let aft_max_mean: Vec<f64> = records.iter().flat_map(|r| r.aft_max_mean.iter().cloned()).collect();
    let aft_min_mean: Vec<f64> = records.iter().flat_map(|r| r.aft_min_mean.iter().cloned()).collect();

    Ok(AggregateReport {
        runs: repeat,
        migrate_nums: summarize(&migrate_nums),
        pre_max_mean: summarize(&pre_max_mean),
        pre_min_mean: summarize(&pre_min_mean),
        aft_max_mean: summarize(&aft_max_mean),
        aft_min_mean: summarize(&aft_min_mean),
        used_time: summarize(&used_time),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn run_once_reports_pre_and_post_metrics() {
        let source = SnapshotSource::Generate(GeneratorConfig::uniform(2, 100.0, 4, 6, 1.0));
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let record = run_once(Algorithm::GreedyGlobal, &source, 0.1, false, &mut rng).expect("solves");
        assert_eq!(record.pre_max_mean.len(), 2);
        assert_eq!(record.aft_max_mean.len(), 2);
    }

    #[test]
    fn run_repeated_aggregates_every_metric() {
        let source = SnapshotSource::Generate(GeneratorConfig::uniform(2, 60.0, 3, 3, 1.0));
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let report = run_repeated(Algorithm::GreedyGlobal, &source, 0.1, false, 4, &mut rng).expect("solves");
        assert_eq!(report.runs, 4);
        assert!(report.used_time.mean >= 0.0);
    }
}
