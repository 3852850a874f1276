//! Within-individual inputs for longitudinal correlation.

use super::{gradient_by_sample, RowFeeder};
use crate::data::{individuals_from_metadata, AbundanceMatrix, Metadata};
use crate::error::Result;
use log::debug;

/// One feature's `(abundances, gradient)` per individual, in the order of
/// [`LongitudinalFeeder::individual_ids`].
#[derive(Debug, Clone, PartialEq)]
pub struct LongitudinalInput {
    pub index: usize,
    pub feature_id: String,
    pub groups: Vec<(Vec<f64>, Vec<f64>)>,
}

#[derive(Debug, Clone)]
struct IndividualColumns {
    id: String,
    columns: Vec<usize>,
    gradient: Vec<f64>,
}

/// Splits each feature by individual, keeping only samples with a
/// gradient value.
#[derive(Debug, Clone)]
pub struct LongitudinalFeeder<'a> {
    matrix: &'a AbundanceMatrix,
    individuals: Vec<IndividualColumns>,
}

impl<'a> LongitudinalFeeder<'a> {
    pub fn new(
        matrix: &'a AbundanceMatrix,
        metadata: &Metadata,
        category: &str,
        individual_column: &str,
    ) -> Result<Self> {
        let by_sample = gradient_by_sample(metadata, category)?;
        let individuals = individuals_from_metadata(metadata, individual_column, matrix)?
            .into_iter()
            .map(|ind| {
                let (columns, gradient): (Vec<usize>, Vec<f64>) = ind
                    .sample_ids
                    .iter()
                    .zip(&ind.sample_indices)
                    .filter_map(|(sid, &col)| {
                        by_sample.get(sid).copied().flatten().map(|g| (col, g))
                    })
                    .unzip();
                debug!(
                    "individual '{}': {} samples, {} with '{}'",
                    ind.id,
                    ind.sample_ids.len(),
                    columns.len(),
                    category
                );
                IndividualColumns {
                    id: ind.id,
                    columns,
                    gradient,
                }
            })
            .collect();

        Ok(Self {
            matrix,
            individuals,
        })
    }

    pub fn individual_ids(&self) -> Vec<String> {
        self.individuals.iter().map(|i| i.id.clone()).collect()
    }

    pub fn n_individuals(&self) -> usize {
        self.individuals.len()
    }
}

impl RowFeeder for LongitudinalFeeder<'_> {
    type Row = LongitudinalInput;

    fn n_features(&self) -> usize {
        self.matrix.n_features()
    }

    fn row(&self, index: usize) -> LongitudinalInput {
        let dense = self.matrix.row_dense(index);
        let groups = self
            .individuals
            .iter()
            .map(|ind| {
                let abundances = ind.columns.iter().map(|&c| dense[c]).collect();
                (abundances, ind.gradient.clone())
            })
            .collect();
        LongitudinalInput {
            index,
            feature_id: self.matrix.feature_ids()[index].clone(),
            groups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_per_individual() {
        let matrix = AbundanceMatrix::from_rows(
            &[vec![1.0, 2.0, 3.0, 4.0, 5.0]],
            vec!["otu1".to_string()],
            ["A1", "A2", "B1", "B2", "B3"].iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        let rows = [
            ("A1", "0", "alice"),
            ("A2", "1", "alice"),
            ("B1", "0", "bob"),
            ("B2", "", "bob"),
            ("B3", "2", "bob"),
        ];
        let metadata = Metadata::from_rows(
            vec!["day".to_string(), "subject".to_string()],
            rows.iter()
                .map(|(s, d, p)| (s.to_string(), vec![d.to_string(), p.to_string()]))
                .collect(),
        )
        .unwrap();

        let feeder = LongitudinalFeeder::new(&matrix, &metadata, "day", "subject").unwrap();
        assert_eq!(feeder.individual_ids(), vec!["alice", "bob"]);

        let input = feeder.row(0);
        assert_eq!(input.groups[0], (vec![1.0, 2.0], vec![0.0, 1.0]));
        // B2 has no day value
        assert_eq!(input.groups[1], (vec![3.0, 5.0], vec![0.0, 2.0]));
    }
}
