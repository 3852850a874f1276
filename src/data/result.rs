//! Result types for gradient association runs.

use crate::correct::correct_pvalues;
use crate::error::Result;
use crate::rank::rank_by;
use crate::test::{CombinedOutcome, TestOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Whether a feature was actually tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    /// Statistic and p-value computed.
    Tested,
    /// Too few paired observations.
    InsufficientData,
    /// Undefined statistic: zero variance, all ranks tied, and the like.
    Degenerate,
}

impl FeatureStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tested => "tested",
            Self::InsufficientData => "insufficient_data",
            Self::Degenerate => "degenerate",
        }
    }

    pub fn is_tested(&self) -> bool {
        matches!(self, Self::Tested)
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Uncorrected result for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub feature_id: String,
    pub statistic: f64,
    pub p_value: f64,
    /// Paired observations behind the statistic.
    pub n_obs: usize,
    pub status: FeatureStatus,
}

impl TestResult {
    pub fn new(feature_id: impl Into<String>, outcome: TestOutcome) -> Self {
        Self {
            feature_id: feature_id.into(),
            statistic: outcome.statistic,
            p_value: outcome.p_value,
            n_obs: outcome.n_obs,
            status: outcome.status,
        }
    }
}

/// Uncorrected longitudinal result for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongitudinalResult {
    pub feature_id: String,
    /// One coefficient per individual, NaN where not computable.
    pub individual_statistics: Vec<f64>,
    pub combined_statistic: f64,
    pub p_value: f64,
    pub homogeneity_p: Option<f64>,
    pub homogeneous: Option<bool>,
    pub status: FeatureStatus,
}

impl LongitudinalResult {
    pub fn new(feature_id: impl Into<String>, outcome: CombinedOutcome) -> Self {
        Self {
            feature_id: feature_id.into(),
            individual_statistics: outcome.per_individual,
            combined_statistic: outcome.combined_statistic,
            p_value: outcome.p_value,
            homogeneity_p: outcome.homogeneity_p,
            homogeneous: outcome.homogeneous,
            status: outcome.status,
        }
    }
}

/// A feature that could not be tested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureWarning {
    pub feature_id: String,
    pub status: FeatureStatus,
    pub message: String,
}

impl fmt::Display for FeatureWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.feature_id, self.message)
    }
}

/// Corrected correlation or paired-t result for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRow {
    pub feature_id: String,
    pub statistic: f64,
    pub p_value: f64,
    pub fdr_p: f64,
    pub bonferroni_p: f64,
    pub status: FeatureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<Vec<String>>,
}

/// Correlation or paired-t results, ranked by raw p-value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationResultSet {
    /// Test that produced the statistic, e.g. `spearman` or `paired_t`.
    pub test: String,
    /// P-value method, e.g. `fisher_z_transform`.
    pub pvalue_method: String,
    pub rows: Vec<CorrelationRow>,
    /// Number of p-values counted by the corrections.
    pub n_tests: usize,
    pub warnings: Vec<FeatureWarning>,
}

impl CorrelationResultSet {
    /// Correct the raw p-values, attach taxonomy and rank by raw p-value.
    ///
    /// `taxonomy`, when given, holds one lineage per result in the same order.
    pub fn assemble(
        test: impl Into<String>,
        pvalue_method: impl Into<String>,
        results: Vec<TestResult>,
        taxonomy: Option<Vec<Vec<String>>>,
    ) -> Self {
        let raw: Vec<f64> = results.iter().map(|r| r.p_value).collect();
        let corrected = correct_pvalues(&raw);
        let warnings = collect_warnings(
            results.iter().map(|r| (&r.feature_id, r.status, r.n_obs)),
            "observations",
        );

        let mut taxonomy = taxonomy.map(|t| t.into_iter());
        let mut rows: Vec<CorrelationRow> = results
            .into_iter()
            .enumerate()
            .map(|(i, r)| CorrelationRow {
                feature_id: r.feature_id,
                statistic: r.statistic,
                p_value: r.p_value,
                fdr_p: corrected.fdr[i],
                bonferroni_p: corrected.bonferroni[i],
                status: r.status,
                taxonomy: taxonomy.as_mut().and_then(|t| t.next()),
            })
            .collect();
        rank_by(&mut rows, |row| row.p_value);

        Self {
            test: test.into(),
            pvalue_method: pvalue_method.into(),
            rows,
            n_tests: corrected.n_tests,
            warnings,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_taxonomy(&self) -> bool {
        self.rows.iter().any(|r| r.taxonomy.is_some())
    }

    pub fn get_feature(&self, feature_id: &str) -> Option<&CorrelationRow> {
        self.rows.iter().find(|r| r.feature_id == feature_id)
    }

    /// Rows with FDR p-value below `alpha`.
    pub fn significant_at(&self, alpha: f64) -> Vec<&CorrelationRow> {
        self.rows.iter().filter(|r| r.fdr_p < alpha).collect()
    }

    /// Write results to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_tsv(BufWriter::new(file))
    }

    /// Write tab-separated results with columns `OTU`, `Test-Statistic`,
    /// `P`, `FDR_P`, `Bonferroni_P` and, when present, `Taxonomy`.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let with_taxonomy = self.has_taxonomy();
        let mut wtr = tsv_writer(writer);

        let mut header = vec!["OTU", "Test-Statistic", "P", "FDR_P", "Bonferroni_P"];
        if with_taxonomy {
            header.push("Taxonomy");
        }
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![
                row.feature_id.clone(),
                format_float(row.statistic),
                format_float(row.p_value),
                format_float(row.fdr_p),
                format_float(row.bonferroni_p),
            ];
            if with_taxonomy {
                record.push(format_taxonomy(row.taxonomy.as_deref()));
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_json(BufWriter::new(file))
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Corrected longitudinal result for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongitudinalRow {
    pub feature_id: String,
    pub individual_statistics: Vec<f64>,
    pub combined_statistic: f64,
    pub p_value: f64,
    pub fdr_p: f64,
    pub bonferroni_p: f64,
    pub homogeneity_p: Option<f64>,
    pub homogeneous: Option<bool>,
    pub status: FeatureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<Vec<String>>,
}

/// Longitudinal results, ranked by FDR p-value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongitudinalResultSet {
    pub test: String,
    /// Individual ids, in the column order of `individual_statistics`.
    pub individuals: Vec<String>,
    pub rows: Vec<LongitudinalRow>,
    pub n_tests: usize,
    pub warnings: Vec<FeatureWarning>,
}

impl LongitudinalResultSet {
    /// Correct the combined p-values, attach taxonomy and rank by FDR.
    pub fn assemble(
        test: impl Into<String>,
        individuals: Vec<String>,
        results: Vec<LongitudinalResult>,
        taxonomy: Option<Vec<Vec<String>>>,
    ) -> Self {
        let raw: Vec<f64> = results.iter().map(|r| r.p_value).collect();
        let corrected = correct_pvalues(&raw);
        let warnings = collect_warnings(
            results.iter().map(|r| {
                let n_usable = r.individual_statistics.iter().filter(|s| !s.is_nan()).count();
                (&r.feature_id, r.status, n_usable)
            }),
            "individuals",
        );

        let mut taxonomy = taxonomy.map(|t| t.into_iter());
        let mut rows: Vec<LongitudinalRow> = results
            .into_iter()
            .enumerate()
            .map(|(i, r)| LongitudinalRow {
                feature_id: r.feature_id,
                individual_statistics: r.individual_statistics,
                combined_statistic: r.combined_statistic,
                p_value: r.p_value,
                fdr_p: corrected.fdr[i],
                bonferroni_p: corrected.bonferroni[i],
                homogeneity_p: r.homogeneity_p,
                homogeneous: r.homogeneous,
                status: r.status,
                taxonomy: taxonomy.as_mut().and_then(|t| t.next()),
            })
            .collect();
        rank_by(&mut rows, |row| row.fdr_p);

        Self {
            test: test.into(),
            individuals,
            rows,
            n_tests: corrected.n_tests,
            warnings,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_taxonomy(&self) -> bool {
        self.rows.iter().any(|r| r.taxonomy.is_some())
    }

    pub fn get_feature(&self, feature_id: &str) -> Option<&LongitudinalRow> {
        self.rows.iter().find(|r| r.feature_id == feature_id)
    }

    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_tsv(BufWriter::new(file))
    }

    /// Columns: `OTU`, one `Individual:<id> stat` per individual,
    /// `Combined stat`, `P`, `FDR_P`, `Bonferroni_P`, `Homogeneous` and,
    /// when present, `Taxonomy`.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let with_taxonomy = self.has_taxonomy();
        let mut wtr = tsv_writer(writer);

        let mut header = vec!["OTU".to_string()];
        header.extend(self.individuals.iter().map(|id| format!("Individual:{} stat", id)));
        for col in ["Combined stat", "P", "FDR_P", "Bonferroni_P", "Homogeneous"] {
            header.push(col.to_string());
        }
        if with_taxonomy {
            header.push("Taxonomy".to_string());
        }
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.feature_id.clone()];
            record.extend(row.individual_statistics.iter().map(|&s| format_float(s)));
            record.push(format_float(row.combined_statistic));
            record.push(format_float(row.p_value));
            record.push(format_float(row.fdr_p));
            record.push(format_float(row.bonferroni_p));
            record.push(match row.homogeneous {
                Some(true) => "True".to_string(),
                Some(false) => "False".to_string(),
                None => "nan".to_string(),
            });
            if with_taxonomy {
                record.push(format_taxonomy(row.taxonomy.as_deref()));
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_json(BufWriter::new(file))
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// `unit` names what the usable count counts.
fn collect_warnings<'a, I>(results: I, unit: &str) -> Vec<FeatureWarning>
where
    I: Iterator<Item = (&'a String, FeatureStatus, usize)>,
{
    results
        .filter(|(_, status, _)| !status.is_tested())
        .map(|(feature_id, status, n)| FeatureWarning {
            feature_id: feature_id.clone(),
            status,
            message: match status {
                FeatureStatus::InsufficientData => {
                    format!("insufficient data ({} usable {})", n, unit)
                }
                _ => "degenerate input, statistic undefined".to_string(),
            },
        })
        .collect()
}

fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer)
}

/// Plain decimal formatting with `nan`, `inf` and `-inf` for the specials.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        value.to_string()
    }
}

fn format_taxonomy(taxonomy: Option<&[String]>) -> String {
    taxonomy.map(|t| t.join("; ")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, statistic: f64, p_value: f64, status: FeatureStatus) -> TestResult {
        TestResult {
            feature_id: id.to_string(),
            statistic,
            p_value,
            n_obs: 10,
            status,
        }
    }

    fn example_set() -> CorrelationResultSet {
        CorrelationResultSet::assemble(
            "pearson",
            "fisher_z_transform",
            vec![
                result("A", 0.1, 0.5, FeatureStatus::Tested),
                result("B", 0.9, 0.01, FeatureStatus::Tested),
                result("C", f64::NAN, f64::NAN, FeatureStatus::Degenerate),
                result("D", -0.8, 0.02, FeatureStatus::Tested),
            ],
            None,
        )
    }

    #[test]
    fn test_assemble_ranks_and_corrects() {
        let set = example_set();
        let order: Vec<&str> = set.rows.iter().map(|r| r.feature_id.as_str()).collect();
        assert_eq!(order, vec!["B", "D", "A", "C"]);
        assert_eq!(set.n_tests, 3);

        let b = set.get_feature("B").unwrap();
        assert!((b.bonferroni_p - 0.03).abs() < 1e-12);
        assert!((b.fdr_p - 0.03).abs() < 1e-12);
        assert!(set.get_feature("C").unwrap().fdr_p.is_nan());
    }

    #[test]
    fn test_warnings_for_untested_features() {
        let set = example_set();
        assert_eq!(set.warnings.len(), 1);
        assert_eq!(set.warnings[0].feature_id, "C");
        assert_eq!(set.warnings[0].status, FeatureStatus::Degenerate);
    }

    #[test]
    fn test_write_tsv_without_taxonomy() {
        let mut buf = Vec::new();
        example_set().write_tsv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "OTU\tTest-Statistic\tP\tFDR_P\tBonferroni_P");
        assert!(lines[1].starts_with("B\t0.9\t0.01\t"));
        assert_eq!(lines[4], "C\tnan\tnan\tnan\tnan");
    }

    #[test]
    fn test_write_tsv_with_taxonomy() {
        let set = CorrelationResultSet::assemble(
            "spearman",
            "bootstrapped",
            vec![result("otu1", 0.5, 0.2, FeatureStatus::Tested)],
            Some(vec![vec!["k__Bacteria".to_string(), "p__Firmicutes".to_string()]]),
        );
        let mut buf = Vec::new();
        set.write_tsv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.lines().next().unwrap().ends_with("\tTaxonomy"));
        assert!(text.contains("k__Bacteria; p__Firmicutes"));
    }

    #[test]
    fn test_longitudinal_ranked_by_fdr() {
        let make = |id: &str, p: f64| LongitudinalResult {
            feature_id: id.to_string(),
            individual_statistics: vec![0.5, 0.6],
            combined_statistic: 0.55,
            p_value: p,
            homogeneity_p: Some(0.8),
            homogeneous: Some(true),
            status: FeatureStatus::Tested,
        };
        let set = LongitudinalResultSet::assemble(
            "pearson",
            vec!["p1".to_string(), "p2".to_string()],
            vec![make("x", 0.04), make("y", 0.001)],
            None,
        );
        assert_eq!(set.rows[0].feature_id, "y");

        let mut buf = Vec::new();
        set.write_tsv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "OTU\tIndividual:p1 stat\tIndividual:p2 stat\tCombined stat\tP\tFDR_P\tBonferroni_P\tHomogeneous"
        );
        assert!(text.lines().nth(1).unwrap().ends_with("\tTrue"));
    }

    #[test]
    fn test_longitudinal_warning_counts_individuals() {
        let set = LongitudinalResultSet::assemble(
            "kendall",
            vec!["p1".to_string(), "p2".to_string()],
            vec![LongitudinalResult {
                feature_id: "sparse".to_string(),
                individual_statistics: vec![0.8, f64::NAN],
                combined_statistic: 0.8,
                p_value: f64::NAN,
                homogeneity_p: None,
                homogeneous: None,
                status: FeatureStatus::InsufficientData,
            }],
            None,
        );
        assert_eq!(set.warnings.len(), 1);
        assert_eq!(
            set.warnings[0].message,
            "insufficient data (1 usable individuals)"
        );
    }

    #[test]
    fn test_correlation_warning_counts_observations() {
        let set = CorrelationResultSet::assemble(
            "pearson",
            "fisher_z_transform",
            vec![result("short", f64::NAN, f64::NAN, FeatureStatus::InsufficientData)],
            None,
        );
        assert_eq!(
            set.warnings[0].message,
            "insufficient data (10 usable observations)"
        );
    }

    #[test]
    fn test_format_float_specials() {
        assert_eq!(format_float(f64::NAN), "nan");
        assert_eq!(format_float(f64::INFINITY), "inf");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_float(0.25), "0.25");
    }

    #[test]
    fn test_json_output() {
        let mut buf = Vec::new();
        example_set().write_json(&mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["test"], "pearson");
        assert_eq!(value["rows"].as_array().unwrap().len(), 4);
        // NaN has no JSON form
        assert!(value["rows"][3]["p_value"].is_null());
    }
}
