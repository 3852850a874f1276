//! Paired sample map for the paired t test.

use crate::error::{GradientError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Matched "before" and "after" samples; entry `i` of each list is a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedSamples {
    before: Vec<String>,
    after: Vec<String>,
}

impl PairedSamples {
    /// Create a pairing, rejecting lists of different length.
    pub fn new(before: Vec<String>, after: Vec<String>) -> Result<Self> {
        if before.len() != after.len() {
            return Err(GradientError::InvalidConfiguration(format!(
                "Paired sample lists differ in length: {} before vs {} after",
                before.len(),
                after.len()
            )));
        }
        if before.is_empty() {
            return Err(GradientError::EmptyData("No sample pairs".to_string()));
        }
        Ok(Self { before, after })
    }

    /// Load a two-column, header-less, tab-separated map (`before\tafter`).
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse a paired sample map from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut before = Vec::new();
        let mut after = Vec::new();
        for (line_no, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if fields.len() != 2 {
                return Err(GradientError::InvalidParameter(format!(
                    "Paired sample map line {} must have exactly 2 columns, found {}",
                    line_no + 1,
                    fields.len()
                )));
            }
            before.push(fields[0].to_string());
            after.push(fields[1].to_string());
        }
        Self::new(before, after)
    }

    /// Samples of the first condition.
    pub fn before(&self) -> &[String] {
        &self.before
    }

    /// Samples of the second condition.
    pub fn after(&self) -> &[String] {
        &self.after
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.before.len()
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty()
    }
}
