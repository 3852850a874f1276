//! Data structures for gradient association analysis.

mod abundance_matrix;
mod align;
mod individual;
mod metadata;
mod pairs;
mod result;

pub use abundance_matrix::AbundanceMatrix;
pub use align::{align_samples, AlignedData, NonOverlap};
pub use individual::{individuals_from_metadata, Individual};
pub use metadata::Metadata;
pub use pairs::PairedSamples;
pub use result::{
    CorrelationResultSet, CorrelationRow, FeatureStatus, FeatureWarning, LongitudinalResult,
    LongitudinalResultSet, LongitudinalRow, TestResult,
};
