//! Cross-sectional inputs: abundance and gradient over all usable samples.

use super::{gradient_by_sample, RowFeeder};
use crate::data::{AbundanceMatrix, Metadata};
use crate::error::{GradientError, Result};

/// One feature's paired vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationInput {
    pub index: usize,
    pub feature_id: String,
    pub abundances: Vec<f64>,
    pub gradient: Vec<f64>,
}

/// Pairs each feature with the gradient over samples that have both a
/// matrix column and a non-missing gradient value.
#[derive(Debug, Clone)]
pub struct CorrelationFeeder<'a> {
    matrix: &'a AbundanceMatrix,
    columns: Vec<usize>,
    gradient: Vec<f64>,
}

impl<'a> CorrelationFeeder<'a> {
    pub fn new(matrix: &'a AbundanceMatrix, metadata: &Metadata, category: &str) -> Result<Self> {
        let by_sample = gradient_by_sample(metadata, category)?;

        let (columns, gradient): (Vec<usize>, Vec<f64>) = matrix
            .sample_ids()
            .iter()
            .enumerate()
            .filter_map(|(col, sid)| by_sample.get(sid).copied().flatten().map(|g| (col, g)))
            .unzip();

        if columns.is_empty() {
            return Err(GradientError::EmptyData(format!(
                "No samples with a value for category '{}'",
                category
            )));
        }
        Ok(Self {
            matrix,
            columns,
            gradient,
        })
    }

    /// Number of samples that enter every feature's test.
    pub fn n_samples(&self) -> usize {
        self.columns.len()
    }

    pub fn gradient(&self) -> &[f64] {
        &self.gradient
    }
}

impl RowFeeder for CorrelationFeeder<'_> {
    type Row = CorrelationInput;

    fn n_features(&self) -> usize {
        self.matrix.n_features()
    }

    fn row(&self, index: usize) -> CorrelationInput {
        CorrelationInput {
            index,
            feature_id: self.matrix.feature_ids()[index].clone(),
            abundances: self.matrix.row_at(index, &self.columns),
            gradient: self.gradient.clone(),
        }
    }
}
