use super::distribution::{correlation_p_value, incomplete_beta, ln_gamma};
use super::*;

fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

#[test]
fn test_ln_gamma_known_values() {
    assert!(approx(ln_gamma(1.0), 0.0, 1e-12));
    assert!(approx(ln_gamma(2.0), 0.0, 1e-12));
    assert!(approx(ln_gamma(5.0), 24f64.ln(), 1e-10));
    assert!(approx(ln_gamma(0.5), std::f64::consts::PI.sqrt().ln(), 1e-10));
}

#[test]
fn test_incomplete_beta_bounds_and_symmetry() {
    assert_eq!(incomplete_beta(2.0, 3.0, 0.0), 0.0);
    assert_eq!(incomplete_beta(2.0, 3.0, 1.0), 1.0);
    // I_x(1, 1) = x
    assert!(approx(incomplete_beta(1.0, 1.0, 0.3), 0.3, 1e-12));
    let lhs = incomplete_beta(2.5, 1.5, 0.4);
    let rhs = 1.0 - incomplete_beta(1.5, 2.5, 0.6);
    assert!(approx(lhs, rhs, 1e-12));
}

#[test]
fn test_p_value_closed_form_df1() {
    // df = 1: p = 1 - (2 / pi) * atan(|t|); r = 0.5 gives t = 1/sqrt(3)
    assert!(approx(correlation_p_value(0.5, 3), 2.0 / 3.0, 1e-9));
    assert!(approx(correlation_p_value(-0.5, 3), 2.0 / 3.0, 1e-9));
}

#[test]
fn test_p_value_edges() {
    assert_eq!(correlation_p_value(1.0, 10), 0.0);
    assert_eq!(correlation_p_value(-1.0, 10), 0.0);
    assert!(approx(correlation_p_value(0.0, 10), 1.0, 1e-12));
    assert_eq!(correlation_p_value(0.3, 2), 1.0);
}

#[test]
fn test_pearson_reference_sample() {
    let x = [1.0, 2.0, 3.0, 4.0, 5.0];
    let y = [2.0, 4.0, 5.0, 4.0, 5.0];
    let c = pearson(&x, &y).unwrap();
    assert!(approx(c.r, 0.774_596_669_241_483_4, 1e-12));
    assert!(approx(c.p_value, 0.124_027_062_657_554_6, 1e-9));
}

#[test]
fn test_pearson_perfect_lines() {
    let x = [1.0, 2.0, 3.0, 4.0];
    let up = pearson(&x, &[2.0, 4.0, 6.0, 8.0]).unwrap();
    assert!(approx(up.r, 1.0, 1e-12));
    assert!(up.p_value < 1e-6);
    let down = pearson(&x, &[8.0, 6.0, 4.0, 2.0]).unwrap();
    assert!(approx(down.r, -1.0, 1e-12));
    assert!(down.p_value < 1e-6);
}

#[test]
fn test_pearson_undefined_inputs() {
    assert!(pearson(&[1.0, 2.0], &[3.0, 4.0]).is_none());
    assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
    assert!(pearson(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]).is_none());
    assert!(pearson(&[1.0, 2.0, 3.0], &[1.0, 2.0]).is_none());
}

#[test]
fn test_average_ranks_ties() {
    assert_eq!(average_ranks(&[10.0, 20.0, 20.0, 30.0]), vec![1.0, 2.5, 2.5, 4.0]);
    assert_eq!(average_ranks(&[3.0, 1.0, 2.0]), vec![3.0, 1.0, 2.0]);
    assert_eq!(average_ranks(&[7.0, 7.0, 7.0]), vec![2.0, 2.0, 2.0]);
    assert!(average_ranks(&[]).is_empty());
}

#[test]
fn test_spearman_with_ties() {
    let x = [1.0, 2.0, 3.0, 4.0, 5.0];
    let y = [2.0, 4.0, 5.0, 4.0, 5.0];
    let c = spearman(&x, &y).unwrap();
    assert!(approx(c.r, 0.737_864_787_372_621_8, 1e-12));
    assert!(approx(c.p_value, 0.154_618_523_128_449_15, 1e-9));
}

#[test]
fn test_spearman_monotone_nonlinear() {
    let x = [1.0, 2.0, 3.0, 4.0];
    let y = [1.0, 8.0, 27.0, 64.0];
    let c = spearman(&x, &y).unwrap();
    assert!(approx(c.r, 1.0, 1e-12));
    assert!(pearson(&x, &y).unwrap().r < 1.0);
}

#[test]
fn test_correlate_dispatches_by_kind() {
    let x = [1.0, 2.0, 3.0, 4.0];
    let y = [1.0, 8.0, 27.0, 64.0];
    assert_eq!(correlate(StatisticKind::Pearson, &x, &y), pearson(&x, &y));
    assert_eq!(correlate(StatisticKind::Spearman, &x, &y), spearman(&x, &y));
}

#[test]
fn test_is_constant() {
    assert!(is_constant(&[]));
    assert!(is_constant(&[0.5, 0.5]));
    assert!(!is_constant(&[0.5, 0.6]));
}
