//! Grouping of samples into individuals for longitudinal analysis.

use crate::data::{AbundanceMatrix, Metadata};
use crate::error::{GradientError, Result};
use serde::{Deserialize, Serialize};

/// Samples believed to come from one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    /// Value of the individual column shared by these samples.
    pub id: String,
    /// Sample IDs in metadata order.
    pub sample_ids: Vec<String>,
    /// Matrix column index of each sample in `sample_ids`.
    pub sample_indices: Vec<usize>,
}

/// Build individuals from a metadata column, resolved against `matrix`.
///
/// Samples that are not columns of the matrix are skipped; an individual
/// left with no samples is dropped.
pub fn individuals_from_metadata(
    metadata: &Metadata,
    individual_column: &str,
    matrix: &AbundanceMatrix,
) -> Result<Vec<Individual>> {
    let groups = metadata.sample_groups(individual_column)?;

    let individuals: Vec<Individual> = groups
        .into_iter()
        .filter_map(|(id, samples)| {
            let (sample_ids, sample_indices): (Vec<String>, Vec<usize>) = samples
                .into_iter()
                .filter_map(|sid| matrix.sample_index(&sid).map(|idx| (sid, idx)))
                .unzip();
            if sample_ids.is_empty() {
                None
            } else {
                Some(Individual {
                    id,
                    sample_ids,
                    sample_indices,
                })
            }
        })
        .collect();

    if individuals.is_empty() {
        return Err(GradientError::EmptyData(format!(
            "No individuals found in column '{}'",
            individual_column
        )));
    }
    Ok(individuals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_individuals_from_metadata() {
        let matrix = AbundanceMatrix::from_rows(
            &[vec![1.0, 2.0, 3.0, 4.0]],
            vec!["otu1".to_string()],
            ["S1", "S2", "S3", "S4"].iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        let metadata = Metadata::from_rows(
            vec!["hsid".to_string()],
            vec![
                ("S3".to_string(), vec!["p2".to_string()]),
                ("S1".to_string(), vec!["p1".to_string()]),
                ("S4".to_string(), vec!["p2".to_string()]),
                ("S2".to_string(), vec!["p1".to_string()]),
                ("S9".to_string(), vec!["p3".to_string()]),
            ],
        )
        .unwrap();

        let individuals = individuals_from_metadata(&metadata, "hsid", &matrix).unwrap();

        assert_eq!(individuals.len(), 2);
        assert_eq!(individuals[0].id, "p1");
        assert_eq!(individuals[0].sample_ids, vec!["S1", "S2"]);
        assert_eq!(individuals[0].sample_indices, vec![0, 1]);
        assert_eq!(individuals[1].sample_ids, vec!["S3", "S4"]);
        assert_eq!(individuals[1].sample_indices, vec![2, 3]);
    }
}
