//! Sample metadata (mapping file) handling.

use crate::error::{GradientError, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Markers treated as a missing value rather than a coercion failure.
const MISSING_MARKERS: [&str; 3] = ["", "NA", "na"];

/// Sample metadata: sample ID -> column name -> raw string value.
///
/// Values are kept as strings; numeric interpretation happens only when a
/// column is requested as a gradient via [`Metadata::gradient`].
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Sample IDs in file order.
    sample_ids: Vec<String>,
    /// Column names (excluding the sample ID column).
    column_names: Vec<String>,
    /// Data stored as sample_id -> column_name -> value.
    data: HashMap<String, HashMap<String, String>>,
}

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build metadata from column names and `(sample_id, values)` rows.
    pub fn from_rows(column_names: Vec<String>, rows: Vec<(String, Vec<String>)>) -> Result<Self> {
        let mut sample_ids = Vec::with_capacity(rows.len());
        let mut data = HashMap::with_capacity(rows.len());

        for (sample_id, values) in rows {
            if data.contains_key(&sample_id) {
                return Err(GradientError::SampleMismatch(format!(
                    "Duplicate sample '{}' in metadata",
                    sample_id
                )));
            }
            let sample_data: HashMap<String, String> = column_names
                .iter()
                .enumerate()
                .map(|(i, col)| (col.clone(), values.get(i).cloned().unwrap_or_default()))
                .collect();
            sample_ids.push(sample_id.clone());
            data.insert(sample_id, sample_data);
        }

        Ok(Self {
            sample_ids,
            column_names,
            data,
        })
    }

    /// Load a tab-separated mapping file.
    ///
    /// Expected format:
    /// - First non-comment row: header (`#SampleID`, then column names)
    /// - Further lines starting with `#` are comments
    /// - Subsequent rows: sample ID followed by values
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse a mapping file from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut header: Option<Vec<String>> = None;
        let mut rows: Vec<(String, Vec<String>)> = Vec::new();

        for line_result in reader.lines() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            match &header {
                None => {
                    let fields: Vec<String> = line
                        .split('\t')
                        .map(|s| s.trim().to_string())
                        .collect();
                    if fields.len() < 2 {
                        return Err(GradientError::EmptyData(
                            "Metadata must have at least one variable column".to_string(),
                        ));
                    }
                    header = Some(fields[1..].to_vec());
                }
                Some(_) => {
                    if line.starts_with('#') {
                        continue;
                    }
                    let fields: Vec<&str> = line.split('\t').collect();
                    let sample_id = fields[0].trim().to_string();
                    let values: Vec<String> =
                        fields[1..].iter().map(|s| s.trim().to_string()).collect();
                    rows.push((sample_id, values));
                }
            }
        }

        let column_names = header
            .ok_or_else(|| GradientError::EmptyData("Empty metadata file".to_string()))?;
        if rows.is_empty() {
            return Err(GradientError::EmptyData("No samples in metadata".to_string()));
        }
        Self::from_rows(column_names, rows)
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get the raw value for a sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&str> {
        self.data
            .get(sample_id)
            .and_then(|m| m.get(column))
            .map(String::as_str)
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.data.contains_key(sample_id)
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Coerce a column to gradient values, in sample order.
    ///
    /// Missing markers (empty, `NA`, `na`) become `None`. Any other value
    /// that does not parse as a finite real aborts with
    /// [`GradientError::InputCoercion`]: a category that cannot be read as
    /// numbers is invalid as a whole, not per sample.
    pub fn gradient(&self, column: &str) -> Result<Vec<Option<f64>>> {
        if !self.has_column(column) {
            return Err(GradientError::MissingColumn(column.to_string()));
        }
        self.sample_ids
            .iter()
            .map(|sid| {
                let raw = self.get(sid, column).unwrap_or("");
                if MISSING_MARKERS.contains(&raw) {
                    return Ok(None);
                }
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(Some)
                    .ok_or_else(|| GradientError::InputCoercion {
                        column: column.to_string(),
                        sample: sid.clone(),
                        value: raw.to_string(),
                    })
            })
            .collect()
    }

    /// Group samples by the value of a column.
    ///
    /// Returns value -> sample IDs (in metadata order); groups are ordered
    /// by value. Samples with a missing value are left out.
    pub fn sample_groups(&self, column: &str) -> Result<BTreeMap<String, Vec<String>>> {
        if !self.has_column(column) {
            return Err(GradientError::MissingColumn(column.to_string()));
        }
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for sid in &self.sample_ids {
            let value = self.get(sid, column).unwrap_or("");
            if MISSING_MARKERS.contains(&value) {
                continue;
            }
            groups.entry(value.to_string()).or_default().push(sid.clone());
        }
        Ok(groups)
    }

    /// Subset metadata to only include specified samples, in that order.
    pub fn subset_samples(&self, sample_ids: &[String]) -> Result<Self> {
        let mut new_data = HashMap::with_capacity(sample_ids.len());
        let mut new_sample_ids = Vec::with_capacity(sample_ids.len());

        for sid in sample_ids {
            let sample_data = self.data.get(sid).ok_or_else(|| {
                GradientError::SampleMismatch(format!("Sample '{}' not found in metadata", sid))
            })?;
            new_data.insert(sid.clone(), sample_data.clone());
            new_sample_ids.push(sid.clone());
        }

        Ok(Self {
            sample_ids: new_sample_ids,
            column_names: self.column_names.clone(),
            data: new_data,
        })
    }
}
