//! Before/after abundance vectors for the paired t test.

use super::RowFeeder;
use crate::data::{AbundanceMatrix, PairedSamples};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct PairedInput {
    pub index: usize,
    pub feature_id: String,
    pub before: Vec<f64>,
    pub after: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct PairedFeeder<'a> {
    matrix: &'a AbundanceMatrix,
    before: Vec<usize>,
    after: Vec<usize>,
}

impl<'a> PairedFeeder<'a> {
    /// Resolve both sample lists against the matrix; unknown samples are a
    /// [`SampleMismatch`](crate::error::GradientError::SampleMismatch).
    pub fn new(matrix: &'a AbundanceMatrix, pairs: &PairedSamples) -> Result<Self> {
        Ok(Self {
            matrix,
            before: matrix.sample_indices(pairs.before())?,
            after: matrix.sample_indices(pairs.after())?,
        })
    }

    pub fn n_pairs(&self) -> usize {
        self.before.len()
    }
}

impl RowFeeder for PairedFeeder<'_> {
    type Row = PairedInput;

    fn n_features(&self) -> usize {
        self.matrix.n_features()
    }

    fn row(&self, index: usize) -> PairedInput {
        let dense = self.matrix.row_dense(index);
        PairedInput {
            index,
            feature_id: self.matrix.feature_ids()[index].clone(),
            before: self.before.iter().map(|&c| dense[c]).collect(),
            after: self.after.iter().map(|&c| dense[c]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GradientError;

    fn matrix() -> AbundanceMatrix {
        AbundanceMatrix::from_rows(
            &[vec![1.0, 2.0, 3.0, 4.0]],
            vec!["otu1".to_string()],
            ["S1", "S2", "S3", "S4"].iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_paired_vectors() {
        let matrix = matrix();
        let pairs = PairedSamples::new(
            vec!["S1".to_string(), "S2".to_string()],
            vec!["S4".to_string(), "S3".to_string()],
        )
        .unwrap();
        let feeder = PairedFeeder::new(&matrix, &pairs).unwrap();

        let input = feeder.row(0);
        assert_eq!(input.before, vec![1.0, 2.0]);
        assert_eq!(input.after, vec![4.0, 3.0]);
    }

    #[test]
    fn test_unknown_sample() {
        let matrix = matrix();
        let pairs = PairedSamples::new(vec!["S1".to_string()], vec!["S9".to_string()]).unwrap();
        assert!(matches!(
            PairedFeeder::new(&matrix, &pairs),
            Err(GradientError::SampleMismatch(_))
        ));
    }
}
