//! End-to-end tests driving the built binary, mirroring the reference
//! CLI's `greedyTest`/`ILPTest` entry points.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn reports_a_greedy_run_with_exit_code_zero() {
    Command::cargo_bin("region-balance")
        .unwrap()
        .args(["6", "0.1", "2", "GREEDY-GLOBAL", "--seed", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("algorithm: GREEDY-GLOBAL"))
        .stdout(predicate::str::contains("aft_max_mean"));
}

#[test]
fn reports_an_ilp_run_with_exit_code_zero() {
    Command::cargo_bin("region-balance")
        .unwrap()
        .args(["4", "0.2", "1", "ILP", "--seed", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("algorithm: ILP"));
}

#[test]
fn rejects_an_unknown_algorithm_tag() {
    Command::cargo_bin("region-balance")
        .unwrap()
        .args(["4", "0.1", "1", "NOT-AN-ALGORITHM"])
        .assert()
        .failure();
}

#[test]
fn loads_a_fixed_snapshot_instead_of_generating_one() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("region-balance-cli-test-{}.snap", std::process::id()));
    std::fs::write(
        &path,
        "2\ns1\n2\nr1\n[10.0, 10.0]\nr2\n[10.0, 10.0]\ns2\n1\nr3\n[10.0, 10.0]\n",
    )
    .unwrap();

    Command::cargo_bin("region-balance")
        .unwrap()
        .args(["2", "0.1", "1", "GREEDY-GLOBAL", "--snapshot"])
        .arg(&path)
        .assert()
        .success();

    std::fs::remove_file(&path).ok();
}
