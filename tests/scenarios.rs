//! Named end-to-end scenarios from SPEC_FULL.md §8.

use region_balance::model::{RegionInfo, StoreInfo};
use region_balance::solvers::{self, Algorithm};
use region_balance::Snapshot;

fn store(id: &str, regions: &[(&str, f64, f64)]) -> StoreInfo {
    let mut s = StoreInfo::new(id, 2);
    for (rid, a, b) in regions {
        s.add(RegionInfo::new(rid.to_string(), vec![*a, *b], id)).unwrap();
    }
    s
}

#[test]
fn tiny_balanced_produces_an_empty_plan() {
    let regions: Vec<(&str, f64, f64)> = vec![
        ("r1", 1.0, 1.0),
        ("r2", 1.0, 1.0),
        ("r3", 1.0, 1.0),
        ("r4", 1.0, 1.0),
        ("r5", 1.0, 1.0),
        ("r6", 1.0, 1.0),
    ];
    let snapshot = Snapshot::new(
        2,
        vec![
            store("a", &regions[0..2]),
            store("b", &regions[2..4]),
            store("c", &regions[4..6]),
        ],
    );

    let (outcome, _) = solvers::balance(Algorithm::GreedyGlobal, &snapshot, 0.1, false).unwrap();
    assert!(outcome.plan.is_empty());
    assert!((outcome.aft_max_mean[0] - 1.0).abs() < 1e-9);
    assert!((outcome.aft_max_mean[1] - 1.0).abs() < 1e-9);
}

#[test]
fn two_store_swap_is_already_balanced() {
    let snapshot = Snapshot::new(
        2,
        vec![
            store("a", &[("r1", 10.0, 0.0), ("r2", 0.0, 10.0)]),
            store("b", &[("r3", 0.0, 10.0), ("r4", 10.0, 0.0)]),
        ],
    );

    let (outcome, _) = solvers::balance(Algorithm::GreedyGlobal, &snapshot, 0.05, false).unwrap();
    assert!(outcome.plan.is_empty());
}

#[test]
fn one_heavy_store_splits_across_the_cluster() {
    let snapshot = Snapshot::new(
        2,
        vec![
            store("a", &[("r1", 30.0, 30.0)]),
            StoreInfo::new("b", 2),
            StoreInfo::new("c", 2),
        ],
    );

    let (outcome, feasible, _residual) = solvers::greedy_global_split(&mut snapshot.clone(), 0.1);
    assert!(feasible || !outcome.is_empty());
    // With splitting enabled, the single region should fan out to more
    // than one destination store.
    let destinations: std::collections::HashSet<_> = outcome.iter().map(|e| e.dsts[0].0.clone()).collect();
    assert!(destinations.len() >= 2, "expected the heavy region to split across stores");
}

#[test]
fn shift_one_region_moves_exactly_one_region() {
    let snapshot = Snapshot::new(
        2,
        vec![
            store("a", &[("r1", 10.0, 10.0), ("r2", 10.0, 10.0)]),
            StoreInfo::new("b", 2),
        ],
    );

    let (outcome, _) = solvers::balance(Algorithm::GreedyGlobal, &snapshot, 0.1, false).unwrap();
    assert_eq!(outcome.plan.len(), 1);
    assert!(outcome.plan[0].region_id == "r1" || outcome.plan[0].region_id == "r2");
}

#[test]
fn cross_dominance_migrates_a_dominant_region() {
    let snapshot = Snapshot::new(
        2,
        vec![
            store("a", &[("r1", 100.0, 0.0), ("r2", 0.0, 100.0)]),
            store("b", &[("r3", 0.0, 0.0)]),
        ],
    );

    let (outcome, _) = solvers::balance(Algorithm::GreedyGlobal, &snapshot, 0.2, false).unwrap();
    assert!(!outcome.plan.is_empty());
}

#[test]
fn lp_and_greedy_agree_on_a_random_balanced_snapshot() {
    use rand::SeedableRng;
    use region_balance::generator::GeneratorConfig;

    let config = GeneratorConfig::uniform(2, 100.0, 5, 10, 0.2);
    let mut rng = rand::rngs::StdRng::seed_from_u64(99);
    let snapshot = region_balance::generator::generate(&config, &mut rng);

    let (greedy_outcome, _) = solvers::balance(Algorithm::GreedyGlobal, &snapshot, 0.2, false).unwrap();
    let (ilp_outcome, _) = solvers::balance(Algorithm::Ilp, &snapshot, 0.2, true).unwrap();

    assert!(ilp_outcome.plan.len() as f64 <= greedy_outcome.plan.len() as f64 + 1.0);
}
