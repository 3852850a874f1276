//! Multiple testing correction.

pub mod bh;
pub mod bonferroni;

pub use bh::{correct_bh, n_significant};
pub use bonferroni::correct_bonferroni;

use serde::{Deserialize, Serialize};

/// FDR and Bonferroni adjustments of one vector of raw p-values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corrected {
    pub fdr: Vec<f64>,
    pub bonferroni: Vec<f64>,
    /// Number of non-NaN p-values, the `m` of both corrections.
    pub n_tests: usize,
}

/// Apply both corrections, preserving input order.
pub fn correct_pvalues(p_values: &[f64]) -> Corrected {
    Corrected {
        fdr: correct_bh(p_values),
        bonferroni: correct_bonferroni(p_values),
        n_tests: p_values.iter().filter(|p| !p.is_nan()).count(),
    }
}
