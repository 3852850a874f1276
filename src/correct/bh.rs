//! Benjamini-Hochberg false discovery rate correction.

/// Apply Benjamini-Hochberg FDR correction.
///
/// The adjusted p-value of the test at ascending rank `i` among `m` testable
/// p-values is `q[i] = min(p[i] * m / i, q[i+1])`, capped at 1.0.
///
/// NaN p-values mark untestable features: they keep their position, come
/// back as NaN, and are not counted in `m`.
///
/// # Arguments
/// * `p_values` - Raw p-values in feature order
///
/// # Returns
/// Adjusted p-values (q-values) in the same order.
pub fn correct_bh(p_values: &[f64]) -> Vec<f64> {
    let mut q_values = vec![f64::NAN; p_values.len()];

    // Sorted index over testable p-values only
    let mut indices: Vec<usize> = (0..p_values.len())
        .filter(|&i| !p_values[i].is_nan())
        .collect();
    let m = indices.len();
    if m == 0 {
        return q_values;
    }
    indices.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    let m_f64 = m as f64;

    // Work backwards from the largest p-value
    let mut running_min = f64::INFINITY;
    for (i, &orig_idx) in indices.iter().enumerate().rev() {
        let rank = (i + 1) as f64;
        let adjusted = p_values[orig_idx] * m_f64 / rank;
        running_min = running_min.min(adjusted).min(1.0);
        q_values[orig_idx] = running_min;
    }

    q_values
}

/// Count q-values below `alpha`.
pub fn n_significant(q_values: &[f64], alpha: f64) -> usize {
    q_values.iter().filter(|&&q| q < alpha).count()
}
