//! Sparse abundance matrix (features × samples) for OTU tables.

use crate::error::{GradientError, Result};
use sprs::{CsMat, TriMat};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Header names recognised as a trailing taxonomy column.
const TAXONOMY_HEADERS: [&str; 2] = ["taxonomy", "consensus lineage"];

/// A sparse matrix of non-negative feature abundances across samples.
///
/// Rows represent features (OTUs), columns represent samples.
/// Uses CSR (Compressed Sparse Row) format for efficient row-wise access,
/// which is the only access pattern the correlation tests need.
#[derive(Debug, Clone)]
pub struct AbundanceMatrix {
    /// Sparse matrix in CSR format (features × samples)
    data: CsMat<f64>,
    /// Feature identifiers (row names)
    feature_ids: Vec<String>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
    /// Optional taxonomy per feature (ordered ranks)
    taxonomy: Option<Vec<Vec<String>>>,
}

impl AbundanceMatrix {
    /// Create a new AbundanceMatrix from a sparse matrix and identifiers.
    pub fn new(
        data: CsMat<f64>,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
        taxonomy: Option<Vec<Vec<String>>>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != feature_ids.len() {
            return Err(GradientError::DimensionMismatch {
                expected: nrows,
                actual: feature_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(GradientError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        if let Some(tax) = &taxonomy {
            if tax.len() != nrows {
                return Err(GradientError::DimensionMismatch {
                    expected: nrows,
                    actual: tax.len(),
                });
            }
        }
        Ok(Self {
            data,
            feature_ids,
            sample_ids,
            taxonomy,
        })
    }

    /// Build a matrix from dense rows (one `Vec` per feature).
    pub fn from_rows(
        rows: &[Vec<f64>],
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let n_samples = sample_ids.len();
        let mut tri_mat = TriMat::new((rows.len(), n_samples));
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != n_samples {
                return Err(GradientError::DimensionMismatch {
                    expected: n_samples,
                    actual: row.len(),
                });
            }
            for (col_idx, &value) in row.iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(GradientError::InvalidAbundance {
                        value: value.to_string(),
                        row: row_idx,
                        col: col_idx,
                    });
                }
                if value > 0.0 {
                    tri_mat.add_triplet(row_idx, col_idx, value);
                }
            }
        }
        Self::new(tri_mat.to_csr(), feature_ids, sample_ids, None)
    }

    /// Attach taxonomy labels, one per feature.
    pub fn with_taxonomy(mut self, taxonomy: Vec<Vec<String>>) -> Result<Self> {
        if taxonomy.len() != self.n_features() {
            return Err(GradientError::DimensionMismatch {
                expected: self.n_features(),
                actual: taxonomy.len(),
            });
        }
        self.taxonomy = Some(taxonomy);
        Ok(self)
    }

    /// Load an abundance matrix from a classic tab-separated OTU table.
    ///
    /// Expected format:
    /// - Optional comment lines starting with `# `
    /// - Header: feature ID header (may start with `#`, e.g. `#OTU ID`),
    ///   then sample IDs, then optionally a `taxonomy` column
    /// - Subsequent rows: feature ID, abundances, optional `;`-separated taxonomy
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse an OTU table from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader
            .lines()
            .filter(|l| match l {
                Ok(line) => !(line.trim().is_empty() || line.starts_with("# ")),
                Err(_) => true,
            });

        // Parse header
        let header_line = lines
            .next()
            .ok_or_else(|| GradientError::EmptyData("Empty OTU table".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').map(str::trim).collect();
        let has_taxonomy = header
            .last()
            .map(|h| TAXONOMY_HEADERS.contains(&h.to_lowercase().as_str()))
            .unwrap_or(false);
        let sample_end = if has_taxonomy { header.len() - 1 } else { header.len() };
        if sample_end < 2 {
            return Err(GradientError::EmptyData(
                "OTU table must have at least one sample".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header[1..sample_end].iter().map(|s| s.to_string()).collect();
        let n_samples = sample_ids.len();

        // Parse data rows into triplets for sparse matrix construction
        let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
        let mut feature_ids: Vec<String> = Vec::new();
        let mut taxonomy: Vec<Vec<String>> = Vec::new();

        for (row_idx, line_result) in lines.enumerate() {
            let line = line_result?;
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < n_samples + 1 {
                return Err(GradientError::DimensionMismatch {
                    expected: n_samples + 1,
                    actual: fields.len(),
                });
            }

            feature_ids.push(fields[0].trim().to_string());

            for (col_idx, value_str) in fields[1..=n_samples].iter().enumerate() {
                let value: f64 = value_str
                    .trim()
                    .parse()
                    .ok()
                    .filter(|v: &f64| v.is_finite() && *v >= 0.0)
                    .ok_or_else(|| GradientError::InvalidAbundance {
                        value: value_str.to_string(),
                        row: row_idx,
                        col: col_idx,
                    })?;
                if value > 0.0 {
                    triplets.push((row_idx, col_idx, value));
                }
            }

            if has_taxonomy {
                let lineage = fields.get(n_samples + 1).copied().unwrap_or("");
                taxonomy.push(parse_taxonomy(lineage));
            }
        }

        let n_features = feature_ids.len();
        if n_features == 0 {
            return Err(GradientError::EmptyData("No features in OTU table".to_string()));
        }

        let mut tri_mat = TriMat::new((n_features, n_samples));
        for (row, col, val) in triplets {
            tri_mat.add_triplet(row, col, val);
        }
        let data: CsMat<f64> = tri_mat.to_csr();

        Self::new(
            data,
            feature_ids,
            sample_ids,
            if has_taxonomy { Some(taxonomy) } else { None },
        )
    }

    /// Write the matrix as a tab-separated OTU table.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "#OTU ID")?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        if self.taxonomy.is_some() {
            write!(writer, "\ttaxonomy")?;
        }
        writeln!(writer)?;

        for (row_idx, feature_id) in self.feature_ids.iter().enumerate() {
            write!(writer, "{}", feature_id)?;
            for value in self.row_dense(row_idx) {
                write!(writer, "\t{}", value)?;
            }
            if let Some(lineage) = self.taxonomy(row_idx) {
                write!(writer, "\t{}", lineage.join("; "))?;
            }
            writeln!(writer)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Get the value at (row, col), returning 0 for missing entries.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data.get(row, col).copied().unwrap_or(0.0)
    }

    /// Number of features (rows).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.rows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.cols()
    }

    /// Feature identifiers.
    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Whether the table carries taxonomy labels.
    pub fn has_taxonomy(&self) -> bool {
        self.taxonomy.is_some()
    }

    /// Taxonomy of a feature, if the table has any.
    pub fn taxonomy(&self, row: usize) -> Option<&[String]> {
        self.taxonomy
            .as_ref()
            .and_then(|t| t.get(row))
            .map(Vec::as_slice)
    }

    /// Taxonomy of every feature in row order.
    pub fn taxonomy_labels(&self) -> Option<&[Vec<String>]> {
        self.taxonomy.as_deref()
    }

    /// Column index of a sample.
    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|s| s == sample_id)
    }

    /// Column indices of several samples, failing on the first unknown ID.
    pub fn sample_indices(&self, sample_ids: &[String]) -> Result<Vec<usize>> {
        let lookup: HashMap<&str, usize> = self
            .sample_ids
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        sample_ids
            .iter()
            .map(|sid| {
                lookup.get(sid.as_str()).copied().ok_or_else(|| {
                    GradientError::SampleMismatch(format!(
                        "Sample '{}' not found in abundance matrix",
                        sid
                    ))
                })
            })
            .collect()
    }

    /// Get a dense vector for a specific row (feature).
    pub fn row_dense(&self, row: usize) -> Vec<f64> {
        let mut dense = vec![0.0; self.n_samples()];
        if let Some(row_vec) = self.data.outer_view(row) {
            for (col, &val) in row_vec.iter() {
                dense[col] = val;
            }
        }
        dense
    }

    /// Values of one row at the given columns, in the given order.
    pub fn row_at(&self, row: usize, columns: &[usize]) -> Vec<f64> {
        let dense = self.row_dense(row);
        columns.iter().map(|&c| dense[c]).collect()
    }

    /// Subset the matrix to include only specified samples (by index).
    pub fn subset_samples(&self, indices: &[usize]) -> Result<Self> {
        let n_features = self.n_features();
        let n_samples = indices.len();

        let col_map: HashMap<usize, usize> = indices
            .iter()
            .enumerate()
            .map(|(new_idx, &old_idx)| (old_idx, new_idx))
            .collect();

        let mut new_sample_ids = Vec::with_capacity(n_samples);
        for &old_col in indices {
            if old_col >= self.n_samples() {
                return Err(GradientError::InvalidParameter(format!(
                    "Sample index {} out of bounds",
                    old_col
                )));
            }
            new_sample_ids.push(self.sample_ids[old_col].clone());
        }

        let mut tri_mat = TriMat::new((n_features, n_samples));
        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            for (old_col, &val) in row_vec.iter() {
                if let Some(&new_col) = col_map.get(&old_col) {
                    tri_mat.add_triplet(row, new_col, val);
                }
            }
        }

        Self::new(
            tri_mat.to_csr(),
            self.feature_ids.clone(),
            new_sample_ids,
            self.taxonomy.clone(),
        )
    }
}

fn parse_taxonomy(lineage: &str) -> Vec<String> {
    lineage
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
