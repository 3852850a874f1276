//! Single-feature association test: one statistic and one raw p-value.

use crate::data::FeatureStatus;
use crate::error::{GradientError, Result};
use crate::test::correlation::{
    fisher_z_pvalue, kendall_normal_pvalue, statistic, t_distribution_pvalue,
};
use crate::test::kind::{check_compatibility, PValueMethod, TestKind};
use crate::test::permutation::{permutation_test, PermutationConfig};
use serde::{Deserialize, Serialize};

/// Fewest paired observations a feature needs to be tested at all.
pub const MIN_OBSERVATIONS: usize = 3;

/// Statistic, raw p-value and status for one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
    /// Number of paired observations used.
    pub n_obs: usize,
    pub status: FeatureStatus,
}

impl TestOutcome {
    /// Outcome for a feature that could not be tested.
    pub fn untested(n_obs: usize, status: FeatureStatus) -> Self {
        Self {
            statistic: f64::NAN,
            p_value: f64::NAN,
            n_obs,
            status,
        }
    }
}

/// A validated (test kind, p-value method) pair.
///
/// Construction is the only place the compatibility table is consulted, so
/// an engine that exists can always run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticEngine {
    kind: TestKind,
    method: PValueMethod,
    permutations: PermutationConfig,
}

impl StatisticEngine {
    pub fn new(kind: TestKind, method: PValueMethod, permutations: PermutationConfig) -> Result<Self> {
        check_compatibility(kind, method)?;
        if method == PValueMethod::Bootstrapped && permutations.n_permutations == 0 {
            return Err(GradientError::InvalidConfiguration(
                "bootstrapped p-values need at least one permutation".to_string(),
            ));
        }
        Ok(Self {
            kind,
            method,
            permutations,
        })
    }

    pub fn kind(&self) -> TestKind {
        self.kind
    }

    pub fn method(&self) -> PValueMethod {
        self.method
    }

    pub fn permutations(&self) -> &PermutationConfig {
        &self.permutations
    }

    /// Test association between `a` (abundances) and `b` (gradient).
    ///
    /// `feature_index` selects the feature's random stream for
    /// bootstrapped p-values.
    pub fn compute(&self, feature_index: usize, a: &[f64], b: &[f64]) -> TestOutcome {
        let n = a.len();
        if n != b.len() {
            return TestOutcome::untested(n.min(b.len()), FeatureStatus::Degenerate);
        }
        if n < MIN_OBSERVATIONS {
            return TestOutcome::untested(n, FeatureStatus::InsufficientData);
        }

        let (stat, p_value) = match self.method {
            PValueMethod::Bootstrapped => {
                let mut rng = self.permutations.feature_rng(feature_index);
                let perm =
                    permutation_test(self.kind, a, b, self.permutations.n_permutations, &mut rng);
                (perm.observed, perm.p_value)
            }
            method => {
                let stat = statistic(self.kind, a, b);
                (stat, parametric_pvalue(self.kind, method, stat, n))
            }
        };

        let status = if stat.is_nan() {
            FeatureStatus::Degenerate
        } else if p_value.is_nan() {
            // e.g. Fisher z needs n > 3 (n > 4 for Kendall)
            FeatureStatus::InsufficientData
        } else {
            FeatureStatus::Tested
        };
        if status != FeatureStatus::Tested {
            return TestOutcome::untested(n, status);
        }

        TestOutcome {
            statistic: stat,
            p_value,
            n_obs: n,
            status,
        }
    }
}

/// Closed-form p-value for an already computed statistic.
fn parametric_pvalue(kind: TestKind, method: PValueMethod, stat: f64, n: usize) -> f64 {
    match method {
        PValueMethod::FisherZTransform => fisher_z_pvalue(kind, stat, n),
        PValueMethod::ParametricT => t_distribution_pvalue(stat, n),
        PValueMethod::KendallNormal => kendall_normal_pvalue(stat, n),
        PValueMethod::Bootstrapped => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn engine(kind: TestKind, method: PValueMethod) -> StatisticEngine {
        StatisticEngine::new(kind, method, PermutationConfig::quick()).unwrap()
    }

    #[test]
    fn test_cscore_with_fisher_z_rejected() {
        let result = StatisticEngine::new(
            TestKind::CScore,
            PValueMethod::FisherZTransform,
            PermutationConfig::default(),
        );
        assert!(matches!(result, Err(GradientError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_zero_permutations_rejected() {
        let config = PermutationConfig {
            n_permutations: 0,
            seed: 1,
        };
        let result = StatisticEngine::new(TestKind::Pearson, PValueMethod::Bootstrapped, config);
        assert!(matches!(result, Err(GradientError::InvalidConfiguration(_))));

        // Parametric methods never draw permutations
        assert!(StatisticEngine::new(TestKind::Pearson, PValueMethod::FisherZTransform, config).is_ok());
    }

    #[test]
    fn test_identical_vectors_fisher_z() {
        let x: Vec<f64> = (1..=10).map(|i| i as f64 * 1.5).collect();
        let outcome = engine(TestKind::Pearson, PValueMethod::FisherZTransform).compute(0, &x, &x);

        assert_eq!(outcome.status, FeatureStatus::Tested);
        assert_relative_eq!(outcome.statistic, 1.0, epsilon = 1e-12);
        assert!(outcome.p_value < 1e-10);
        assert_eq!(outcome.n_obs, 10);
    }

    #[test]
    fn test_too_few_observations() {
        let outcome = engine(TestKind::Spearman, PValueMethod::FisherZTransform).compute(
            0,
            &[1.0, 2.0],
            &[3.0, 4.0],
        );
        assert_eq!(outcome.status, FeatureStatus::InsufficientData);
        assert!(outcome.statistic.is_nan() && outcome.p_value.is_nan());
    }

    #[test]
    fn test_fisher_z_needs_four_points() {
        // Three points are enough for r but not for its z variance
        let outcome = engine(TestKind::Pearson, PValueMethod::FisherZTransform).compute(
            0,
            &[1.0, 2.0, 4.0],
            &[1.0, 3.0, 2.0],
        );
        assert_eq!(outcome.status, FeatureStatus::InsufficientData);

        let outcome = engine(TestKind::Pearson, PValueMethod::ParametricT).compute(
            0,
            &[1.0, 2.0, 4.0],
            &[1.0, 3.0, 2.0],
        );
        assert_eq!(outcome.status, FeatureStatus::Tested);
    }

    #[test]
    fn test_zero_variance_is_degenerate() {
        let outcome = engine(TestKind::Pearson, PValueMethod::FisherZTransform).compute(
            0,
            &[0.0, 0.0, 0.0, 0.0, 0.0],
            &[1.0, 2.0, 3.0, 4.0, 5.0],
        );
        assert_eq!(outcome.status, FeatureStatus::Degenerate);
        assert!(outcome.statistic.is_nan() && outcome.p_value.is_nan());
    }

    #[test]
    fn test_bootstrap_reproducible_per_feature() {
        let a = [3.0, 0.0, 5.0, 2.0, 8.0, 1.0, 9.0, 4.0];
        let b = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let e = engine(TestKind::Spearman, PValueMethod::Bootstrapped);

        let first = e.compute(7, &a, &b);
        let second = e.compute(7, &a, &b);
        assert_eq!(first, second);
        assert!(first.p_value >= 1.0 / 101.0 && first.p_value <= 1.0);
    }

    #[test]
    fn test_kendall_normal_method() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let b = [2.0, 1.0, 4.0, 3.0, 6.0, 5.0, 8.0, 7.0, 10.0, 9.0];
        let outcome = engine(TestKind::Kendall, PValueMethod::KendallNormal).compute(0, &a, &b);
        assert_eq!(outcome.status, FeatureStatus::Tested);
        assert!(outcome.statistic > 0.7);
        assert!(outcome.p_value < 0.01);
    }
}
