//! Bonferroni family-wise error rate correction.

/// `min(1, p * m)` where `m` counts the non-NaN p-values. NaN stays NaN.
pub fn correct_bonferroni(p_values: &[f64]) -> Vec<f64> {
    let m = p_values.iter().filter(|p| !p.is_nan()).count() as f64;
    p_values
        .iter()
        .map(|&p| if p.is_nan() { p } else { (p * m).min(1.0) })
        .collect()
}
