//! Sample alignment between an abundance matrix and its metadata.

use crate::data::{AbundanceMatrix, Metadata};
use crate::error::{GradientError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Samples present in only one of the two inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonOverlap {
    /// In the abundance matrix, absent from the metadata.
    pub matrix_only: Vec<String>,
    /// In the metadata, absent from the abundance matrix.
    pub metadata_only: Vec<String>,
}

impl NonOverlap {
    /// True when both inputs list exactly the same samples.
    pub fn is_empty(&self) -> bool {
        self.matrix_only.is_empty() && self.metadata_only.is_empty()
    }
}

/// Matrix and metadata restricted to their shared samples, same order.
#[derive(Debug, Clone)]
pub struct AlignedData {
    pub matrix: AbundanceMatrix,
    pub metadata: Metadata,
    pub non_overlap: NonOverlap,
}

/// Intersect samples of `matrix` and `metadata`.
///
/// Shared samples keep the matrix column order. Metadata-only samples are
/// dropped silently. Matrix-only samples are an error unless
/// `matrix_is_superset` is set, in which case they are dropped too.
pub fn align_samples(
    matrix: &AbundanceMatrix,
    metadata: &Metadata,
    matrix_is_superset: bool,
) -> Result<AlignedData> {
    let matrix_samples: HashSet<&str> = matrix.sample_ids().iter().map(String::as_str).collect();

    let mut shared_idx = Vec::new();
    let mut non_overlap = NonOverlap::default();
    for (i, sid) in matrix.sample_ids().iter().enumerate() {
        if metadata.has_sample(sid) {
            shared_idx.push(i);
        } else {
            non_overlap.matrix_only.push(sid.clone());
        }
    }
    non_overlap.metadata_only = metadata
        .sample_ids()
        .iter()
        .filter(|sid| !matrix_samples.contains(sid.as_str()))
        .cloned()
        .collect();

    if !non_overlap.matrix_only.is_empty() && !matrix_is_superset {
        return Err(GradientError::SampleMismatch(format!(
            "{} sample(s) in the abundance matrix are missing from the metadata: {}",
            non_overlap.matrix_only.len(),
            non_overlap.matrix_only.join(", ")
        )));
    }
    if shared_idx.is_empty() {
        return Err(GradientError::EmptyData(
            "No samples shared between abundance matrix and metadata".to_string(),
        ));
    }

    let matrix = matrix.subset_samples(&shared_idx)?;
    let metadata = metadata.subset_samples(matrix.sample_ids())?;

    Ok(AlignedData {
        matrix,
        metadata,
        non_overlap,
    })
}
