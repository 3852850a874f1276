//! Pipeline runner: configuration, validation and execution of one analysis.

use crate::data::{
    align_samples, AbundanceMatrix, CorrelationResultSet, LongitudinalResult,
    LongitudinalResultSet, Metadata, NonOverlap, PairedSamples, TestResult,
};
use crate::error::{GradientError, Result};
use crate::feed::{CorrelationFeeder, LongitudinalFeeder, PairedFeeder, RowFeeder};
use crate::test::{
    check_compatibility, LongitudinalCombiner, PValueMethod, PairedDifferenceEngine,
    PermutationConfig, StatisticEngine, TestKind, DEFAULT_HOMOGENEITY_ALPHA,
};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Label used for paired t results in place of a correlation test name.
pub const PAIRED_T_LABEL: &str = "paired_t";

/// What to test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Every feature against a gradient across all samples.
    Correlation { category: String },
    /// Within-individual correlation, combined across individuals.
    Longitudinal {
        category: String,
        individual_column: String,
    },
    /// Mean abundance difference between matched sample pairs.
    PairedT,
}

impl AnalysisMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Correlation { .. } => "correlation",
            Self::Longitudinal { .. } => "longitudinal",
            Self::PairedT => "paired_t",
        }
    }
}

fn default_test() -> TestKind {
    TestKind::Spearman
}

fn default_pvalue_method() -> PValueMethod {
    PValueMethod::FisherZTransform
}

fn default_permutations() -> usize {
    PermutationConfig::default().n_permutations
}

fn default_seed() -> u64 {
    PermutationConfig::default().seed
}

fn default_parallel() -> bool {
    true
}

fn default_homogeneity_alpha() -> f64 {
    DEFAULT_HOMOGENEITY_ALPHA
}

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    pub mode: AnalysisMode,
    #[serde(default = "default_test")]
    pub test: TestKind,
    #[serde(default = "default_pvalue_method")]
    pub pvalue_method: PValueMethod,
    /// Permutations for bootstrapped p-values.
    #[serde(default = "default_permutations")]
    pub permutations: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Spread per-feature work over the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Significance level of the longitudinal homogeneity test.
    #[serde(default = "default_homogeneity_alpha")]
    pub homogeneity_alpha: f64,
    /// Drop matrix samples that have no metadata instead of failing.
    #[serde(default)]
    pub matrix_samples_are_superset: bool,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(GradientError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(GradientError::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_yaml(&fs::read_to_string(path)?)
    }

    /// A commented starting point for new configurations.
    pub fn example() -> Self {
        Self {
            name: "ph-gradient".to_string(),
            description: Some("Spearman correlation of every OTU with soil pH".to_string()),
            mode: AnalysisMode::Correlation {
                category: "pH".to_string(),
            },
            test: TestKind::Spearman,
            pvalue_method: PValueMethod::Bootstrapped,
            permutations: default_permutations(),
            seed: default_seed(),
            parallel: true,
            homogeneity_alpha: DEFAULT_HOMOGENEITY_ALPHA,
            matrix_samples_are_superset: false,
        }
    }
}

/// Results of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultSet {
    Correlation(CorrelationResultSet),
    Longitudinal(LongitudinalResultSet),
}

impl ResultSet {
    pub fn len(&self) -> usize {
        match self {
            Self::Correlation(set) => set.len(),
            Self::Longitudinal(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn warnings(&self) -> &[crate::data::FeatureWarning] {
        match self {
            Self::Correlation(set) => &set.warnings,
            Self::Longitudinal(set) => &set.warnings,
        }
    }

    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        match self {
            Self::Correlation(set) => set.write_tsv(writer),
            Self::Longitudinal(set) => set.write_tsv(writer),
        }
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        match self {
            Self::Correlation(set) => set.write_json(writer),
            Self::Longitudinal(set) => set.write_json(writer),
        }
    }
}

/// Ranked results plus the sample alignment diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub results: ResultSet,
    pub non_overlap: NonOverlap,
    /// Samples shared by the matrix and metadata.
    pub n_samples: usize,
}

impl Report {
    pub fn correlation(&self) -> Option<&CorrelationResultSet> {
        match &self.results {
            ResultSet::Correlation(set) => Some(set),
            ResultSet::Longitudinal(_) => None,
        }
    }

    pub fn longitudinal(&self) -> Option<&LongitudinalResultSet> {
        match &self.results {
            ResultSet::Longitudinal(set) => Some(set),
            ResultSet::Correlation(_) => None,
        }
    }
}

/// Builder for configuring and running an analysis.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    mode: Option<AnalysisMode>,
    test: TestKind,
    pvalue_method: PValueMethod,
    permutations: PermutationConfig,
    parallel: bool,
    homogeneity_alpha: f64,
    matrix_samples_are_superset: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a pipeline with default settings and no mode.
    pub fn new() -> Self {
        Self {
            name: "unnamed".to_string(),
            mode: None,
            test: default_test(),
            pvalue_method: default_pvalue_method(),
            permutations: PermutationConfig::default(),
            parallel: true,
            homogeneity_alpha: DEFAULT_HOMOGENEITY_ALPHA,
            matrix_samples_are_superset: false,
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            name: config.name.clone(),
            mode: Some(config.mode.clone()),
            test: config.test,
            pvalue_method: config.pvalue_method,
            permutations: PermutationConfig {
                n_permutations: config.permutations,
                seed: config.seed,
            },
            parallel: config.parallel,
            homogeneity_alpha: config.homogeneity_alpha,
            matrix_samples_are_superset: config.matrix_samples_are_superset,
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Correlate every feature with `category`.
    pub fn correlate(mut self, category: &str) -> Self {
        self.mode = Some(AnalysisMode::Correlation {
            category: category.to_string(),
        });
        self
    }

    /// Correlate within each value of `individual_column`, then combine.
    pub fn longitudinal(mut self, category: &str, individual_column: &str) -> Self {
        self.mode = Some(AnalysisMode::Longitudinal {
            category: category.to_string(),
            individual_column: individual_column.to_string(),
        });
        self
    }

    /// Paired t test; run with [`Pipeline::run_paired`].
    pub fn paired_t(mut self) -> Self {
        self.mode = Some(AnalysisMode::PairedT);
        self
    }

    pub fn test(mut self, test: TestKind) -> Self {
        self.test = test;
        self
    }

    pub fn pvalue_method(mut self, method: PValueMethod) -> Self {
        self.pvalue_method = method;
        self
    }

    pub fn permutations(mut self, n_permutations: usize) -> Self {
        self.permutations.n_permutations = n_permutations;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.permutations.seed = seed;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn homogeneity_alpha(mut self, alpha: f64) -> Self {
        self.homogeneity_alpha = alpha;
        self
    }

    pub fn matrix_samples_are_superset(mut self, superset: bool) -> Self {
        self.matrix_samples_are_superset = superset;
        self
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            mode: self.mode()?.clone(),
            test: self.test,
            pvalue_method: self.pvalue_method,
            permutations: self.permutations.n_permutations,
            seed: self.permutations.seed,
            parallel: self.parallel,
            homogeneity_alpha: self.homogeneity_alpha,
            matrix_samples_are_superset: self.matrix_samples_are_superset,
        })
    }

    fn mode(&self) -> Result<&AnalysisMode> {
        self.mode
            .as_ref()
            .ok_or_else(|| GradientError::Pipeline("No analysis mode selected".to_string()))
    }

    fn engine(&self) -> Result<StatisticEngine> {
        StatisticEngine::new(self.test, self.pvalue_method, self.permutations)
    }

    fn combiner(&self) -> Result<LongitudinalCombiner> {
        check_compatibility(self.test, self.pvalue_method)?;
        LongitudinalCombiner::new(self.test, self.homogeneity_alpha)
    }

    /// Check the configuration without touching any data.
    pub fn validate(&self) -> Result<()> {
        match self.mode()? {
            AnalysisMode::Correlation { .. } => self.engine().map(|_| ()),
            AnalysisMode::Longitudinal { .. } => self.combiner().map(|_| ()),
            AnalysisMode::PairedT => Ok(()),
        }
    }

    /// Run a correlation or longitudinal analysis.
    pub fn run(&self, matrix: &AbundanceMatrix, metadata: &Metadata) -> Result<Report> {
        self.validate()?;
        let mode = self.mode()?;

        let aligned = align_samples(matrix, metadata, self.matrix_samples_are_superset)?;
        log_alignment(&aligned.non_overlap, aligned.matrix.n_samples());
        info!(
            "Pipeline '{}': {} mode, test {}, p-values {}, {} features",
            self.name,
            mode.name(),
            self.test,
            self.pvalue_method,
            aligned.matrix.n_features()
        );

        let taxonomy = aligned.matrix.taxonomy_labels().map(|t| t.to_vec());
        let results = match mode {
            AnalysisMode::Correlation { category } => {
                let engine = self.engine()?;
                let feeder = CorrelationFeeder::new(&aligned.matrix, &aligned.metadata, category)?;
                info!("{} samples have a value for '{}'", feeder.n_samples(), category);

                let results: Vec<TestResult> = map_rows(&feeder, self.parallel, |input| {
                    let outcome = engine.compute(input.index, &input.abundances, &input.gradient);
                    TestResult::new(input.feature_id, outcome)
                });
                let set = CorrelationResultSet::assemble(
                    self.test.name(),
                    self.pvalue_method.name(),
                    results,
                    taxonomy,
                );
                log_warnings(&set.warnings);
                ResultSet::Correlation(set)
            }
            AnalysisMode::Longitudinal {
                category,
                individual_column,
            } => {
                let combiner = self.combiner()?;
                if self.pvalue_method != PValueMethod::FisherZTransform {
                    info!(
                        "Longitudinal p-values come from the Fisher z combination; '{}' is not used",
                        self.pvalue_method
                    );
                }
                let feeder = LongitudinalFeeder::new(
                    &aligned.matrix,
                    &aligned.metadata,
                    category,
                    individual_column,
                )?;
                info!(
                    "{} individuals in column '{}'",
                    feeder.n_individuals(),
                    individual_column
                );

                let results: Vec<LongitudinalResult> = map_rows(&feeder, self.parallel, |input| {
                    LongitudinalResult::new(input.feature_id, combiner.compute(&input.groups))
                });
                let set = LongitudinalResultSet::assemble(
                    self.test.name(),
                    feeder.individual_ids(),
                    results,
                    taxonomy,
                );
                log_warnings(&set.warnings);
                ResultSet::Longitudinal(set)
            }
            AnalysisMode::PairedT => {
                return Err(GradientError::Pipeline(
                    "paired_t mode takes a paired sample map; use run_paired".to_string(),
                ));
            }
        };

        Ok(Report {
            results,
            n_samples: aligned.matrix.n_samples(),
            non_overlap: aligned.non_overlap,
        })
    }

    /// Run the paired t test over matched sample pairs.
    ///
    /// The test kind and p-value method settings do not apply.
    pub fn run_paired(&self, matrix: &AbundanceMatrix, pairs: &PairedSamples) -> Result<Report> {
        if let Some(mode) = &self.mode {
            if *mode != AnalysisMode::PairedT {
                return Err(GradientError::Pipeline(format!(
                    "run_paired called on a {} pipeline",
                    mode.name()
                )));
            }
        }

        let feeder = PairedFeeder::new(matrix, pairs)?;
        info!(
            "Pipeline '{}': paired t test, {} pairs, {} features",
            self.name,
            feeder.n_pairs(),
            matrix.n_features()
        );

        let engine = PairedDifferenceEngine::new();
        let results: Vec<TestResult> = map_rows(&feeder, self.parallel, |input| {
            TestResult::new(input.feature_id, engine.compute(&input.before, &input.after))
        });
        let set = CorrelationResultSet::assemble(
            PAIRED_T_LABEL,
            "t_distribution",
            results,
            matrix.taxonomy_labels().map(|t| t.to_vec()),
        );
        log_warnings(&set.warnings);

        Ok(Report {
            results: ResultSet::Correlation(set),
            non_overlap: NonOverlap::default(),
            n_samples: 2 * pairs.len(),
        })
    }
}

/// Apply `f` to every feature row, in matrix order.
fn map_rows<F, T, G>(feeder: &F, parallel: bool, f: G) -> Vec<T>
where
    F: RowFeeder,
    T: Send,
    G: Fn(F::Row) -> T + Sync,
{
    if parallel {
        (0..feeder.n_features())
            .into_par_iter()
            .map(|i| f(feeder.row(i)))
            .collect()
    } else {
        feeder.rows().map(&f).collect()
    }
}

fn log_alignment(non_overlap: &NonOverlap, n_shared: usize) {
    info!("{} samples shared by the abundance table and metadata", n_shared);
    if !non_overlap.matrix_only.is_empty() {
        warn!(
            "{} abundance table samples have no metadata and were dropped",
            non_overlap.matrix_only.len()
        );
    }
    if !non_overlap.metadata_only.is_empty() {
        info!(
            "{} metadata samples are not in the abundance table",
            non_overlap.metadata_only.len()
        );
    }
}

fn log_warnings(warnings: &[crate::data::FeatureWarning]) {
    for w in warnings {
        warn!("{}", w);
    }
}
