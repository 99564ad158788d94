//! Tests for `compare` module - paired significance testing.

use std::collections::BTreeMap;

use crate::compare::{Comparator, DEFAULT_SEED};

const EPS: f64 = 1e-9;

fn scores(values: &[(&str, f64)]) -> BTreeMap<String, f64> {
    values.iter().map(|(q, v)| ((*q).to_string(), *v)).collect()
}

#[test]
fn test_only_shared_queries_are_compared() {
    let baseline = scores(&[("q1", 0.2), ("q2", 0.4), ("q3", 0.9)]);
    let treatment = scores(&[("q2", 0.6), ("q3", 0.9), ("q4", 1.0)]);
    let cmp = Comparator::new(&baseline, &treatment);

    assert_eq!(cmp.len(), 2);
    assert_eq!(cmp.queries().collect::<Vec<_>>(), vec!["q2", "q3"]);
    assert!((cmp.mean_baseline_metric() - 0.65).abs() < EPS);
    assert!((cmp.mean_treatment_metric() - 0.75).abs() < EPS);
}

#[test]
fn test_win_loss_tie_counts_sum_to_n() {
    let baseline = scores(&[("a", 0.5), ("b", 0.5), ("c", 0.5), ("d", 0.3)]);
    let treatment = scores(&[("a", 0.6), ("b", 0.500_000_1), ("c", 0.4), ("d", 0.3)]);
    let cmp = Comparator::new(&baseline, &treatment);

    assert_eq!(cmp.count_treatment_better(), 1);
    assert_eq!(cmp.count_baseline_better(), 1);
    assert_eq!(cmp.count_equal(), 2);
    assert_eq!(
        cmp.count_baseline_better() + cmp.count_treatment_better() + cmp.count_equal(),
        cmp.len()
    );
}

#[test]
fn test_custom_epsilon() {
    let baseline = scores(&[("a", 0.50)]);
    let treatment = scores(&[("a", 0.51)]);
    let cmp = Comparator::new(&baseline, &treatment).with_epsilon(0.05);
    assert_eq!(cmp.count_equal(), 1);
}

#[test]
fn test_paired_t_test_statistic() {
    let baseline = scores(&[("q1", 0.1), ("q2", 0.2), ("q3", 0.3)]);
    let treatment = scores(&[("q1", 0.2), ("q2", 0.4), ("q3", 0.5)]);
    let result = Comparator::new(&baseline, &treatment).paired_t_test();

    assert!((result.t_statistic - 5.0).abs() < 1e-6);
    assert_eq!(result.degrees_of_freedom, 2);
    let expected_p = 1.0 - 5.0 / 27f64.sqrt();
    assert!((result.p_value - expected_p).abs() < 1e-6);
}

#[test]
fn test_paired_t_test_undefined_cases() {
    let single = Comparator::new(&scores(&[("q", 0.1)]), &scores(&[("q", 0.9)]));
    let result = single.paired_t_test();
    assert!(result.t_statistic.abs() < EPS);
    assert!((result.p_value - 1.0).abs() < EPS);

    // constant difference: zero spread
    let constant = Comparator::new(
        &scores(&[("a", 0.25), ("b", 0.5)]),
        &scores(&[("a", 0.5), ("b", 0.75)]),
    );
    assert!(constant.paired_t_test().t_statistic.abs() < EPS);
}

#[test]
fn test_sign_test() {
    let ids = ["a", "b", "c", "d", "e"];
    let mut baseline: BTreeMap<String, f64> = ids.iter().map(|q| ((*q).to_string(), 0.0)).collect();
    let mut treatment: BTreeMap<String, f64> = ids.iter().map(|q| ((*q).to_string(), 1.0)).collect();
    baseline.insert("f".to_string(), 0.5);
    treatment.insert("f".to_string(), 0.5);
    let cmp = Comparator::new(&baseline, &treatment);
    // five wins, no losses, one tie excluded
    assert!((cmp.sign_test() - 0.0625).abs() < EPS);
}

#[test]
fn test_sign_test_all_ties() {
    let values = scores(&[("a", 0.3), ("b", 0.7)]);
    let cmp = Comparator::new(&values, &values);
    assert!((cmp.sign_test() - 1.0).abs() < EPS);
}

#[test]
fn test_randomized_test_is_reproducible() {
    let baseline = scores(&[("a", 0.1), ("b", 0.4), ("c", 0.35), ("d", 0.8), ("e", 0.2)]);
    let treatment = scores(&[("a", 0.3), ("b", 0.5), ("c", 0.3), ("d", 0.9), ("e", 0.6)]);
    let cmp = Comparator::new(&baseline, &treatment);

    let first = cmp.randomized_test(2_000, DEFAULT_SEED);
    let second = cmp.randomized_test(2_000, DEFAULT_SEED);
    assert!((first - second).abs() < f64::EPSILON);
    assert!((0.0..=1.0).contains(&first));
}

#[test]
fn test_randomized_test_identical_systems() {
    let values = scores(&[("a", 0.3), ("b", 0.7), ("c", 0.1)]);
    let cmp = Comparator::new(&values, &values);
    // every relabeling reproduces the zero observed difference
    assert!((cmp.randomized_test(500, 7) - 1.0).abs() < EPS);
}

#[test]
fn test_randomized_test_strong_effect() {
    let n = 20;
    let baseline: BTreeMap<String, f64> = (0..n).map(|i| (format!("q{i:02}"), 0.1)).collect();
    let treatment: BTreeMap<String, f64> = (0..n).map(|i| (format!("q{i:02}"), 0.9)).collect();
    let cmp = Comparator::new(&baseline, &treatment);
    // only the two all-same labelings reach the observed difference: 2 / 2^20
    assert!(cmp.randomized_test(10_000, DEFAULT_SEED) < 0.01);
}

#[test]
fn test_empty_comparison() {
    let cmp = Comparator::new(&scores(&[("a", 0.1)]), &scores(&[("b", 0.2)]));
    assert!(cmp.is_empty());
    assert!(cmp.mean_baseline_metric().abs() < EPS);
    assert_eq!(cmp.count_equal(), 0);
    assert!((cmp.randomized_test(100, 1) - 1.0).abs() < EPS);
    assert!((cmp.sign_test() - 1.0).abs() < EPS);
}
