//! Association and paired-difference tests.

pub mod engine;

pub use engine::{StatisticEngine, TestOutcome, MIN_OBSERVATIONS};
pub use kind::{check_compatibility, PValueMethod, TestKind, COMPATIBILITY};
pub use longitudinal::{CombinedOutcome, LongitudinalCombiner, DEFAULT_HOMOGENEITY_ALPHA};
pub use paired_t::PairedDifferenceEngine;
pub use permutation::{permutation_test, PermutationConfig, PermutationResult};
