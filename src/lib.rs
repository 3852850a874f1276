//! OTU Gradient Association Library
//!
//! This library tests association between feature (OTU) abundances and a
//! continuous or ordered sample variable, such as pH, depth or days since
//! a treatment.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (AbundanceMatrix, Metadata, results)
//! - **feed**: Per-feature input vectors for each analysis mode
//! - **test**: Statistics, p-values, longitudinal combination, paired t test
//! - **correct**: Multiple testing correction (Benjamini-Hochberg, Bonferroni)
//! - **rank**: Ordering of results by significance
//! - **pipeline**: Configuration and execution
//!
//! # Example
//!
//! ```no_run
//! use otu_gradient::prelude::*;
//!
//! // Load data
//! let otus = AbundanceMatrix::from_tsv("otu_table.tsv").unwrap();
//! let metadata = Metadata::from_tsv("mapping.tsv").unwrap();
//!
//! // Spearman correlation with pH, permutation p-values
//! let report = Pipeline::new()
//!     .correlate("pH")
//!     .test(TestKind::Spearman)
//!     .pvalue_method(PValueMethod::Bootstrapped)
//!     .permutations(1000)
//!     .run(&otus, &metadata)
//!     .unwrap();
//!
//! report.results.write_tsv(std::io::stdout()).unwrap();
//! ```

pub mod correct;
pub mod data;
pub mod error;
pub mod feed;
pub mod pipeline;
pub mod rank;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::correct::{correct_bh, correct_bonferroni, correct_pvalues, Corrected};
    pub use crate::data::{
        align_samples, individuals_from_metadata, AbundanceMatrix, AlignedData,
        CorrelationResultSet, CorrelationRow, FeatureStatus, FeatureWarning, Individual,
        LongitudinalResult, LongitudinalResultSet, LongitudinalRow, Metadata, NonOverlap,
        PairedSamples, TestResult,
    };
    pub use crate::error::{GradientError, Result};
    pub use crate::feed::{
        CorrelationFeeder, CorrelationInput, LongitudinalFeeder, LongitudinalInput, PairedFeeder,
        PairedInput, RowFeeder,
    };
    pub use crate::pipeline::{AnalysisMode, Pipeline, PipelineConfig, Report, ResultSet};
    pub use crate::rank::{rank_by, rank_indices};
    pub use crate::test::{
        check_compatibility, CombinedOutcome, LongitudinalCombiner, PValueMethod,
        PairedDifferenceEngine, PermutationConfig, StatisticEngine, TestKind, TestOutcome,
    };
}
