//! otugrad - OTU gradient association CLI
//!
//! Command-line interface for correlating OTU abundances with sample
//! gradients, within individuals over time, or between paired samples.

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use otu_gradient::data::{AbundanceMatrix, Metadata, PairedSamples};
use otu_gradient::error::{GradientError, Result};
use otu_gradient::pipeline::{AnalysisMode, Pipeline, PipelineConfig, Report};
use otu_gradient::test::{PValueMethod, TestKind};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// CLI-friendly test kind enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTest {
    /// Pearson product-moment correlation
    Pearson,
    /// Spearman rank correlation
    Spearman,
    /// Kendall's tau-b
    Kendall,
    /// Checkerboard score on presence/absence (bootstrapped only)
    Cscore,
}

impl From<CliTest> for TestKind {
    fn from(test: CliTest) -> Self {
        match test {
            CliTest::Pearson => TestKind::Pearson,
            CliTest::Spearman => TestKind::Spearman,
            CliTest::Kendall => TestKind::Kendall,
            CliTest::Cscore => TestKind::CScore,
        }
    }
}

/// CLI-friendly p-value method enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPValueMethod {
    /// Normal approximation on the Fisher z-transformed coefficient
    FisherZTransform,
    /// Student t with n - 2 degrees of freedom (pearson, spearman)
    ParametricTDistribution,
    /// Normal approximation of Kendall's tau (kendall)
    Kendall,
    /// Permutation null distribution
    Bootstrapped,
}

impl From<CliPValueMethod> for PValueMethod {
    fn from(method: CliPValueMethod) -> Self {
        match method {
            CliPValueMethod::FisherZTransform => PValueMethod::FisherZTransform,
            CliPValueMethod::ParametricTDistribution => PValueMethod::ParametricT,
            CliPValueMethod::Kendall => PValueMethod::KendallNormal,
            CliPValueMethod::Bootstrapped => PValueMethod::Bootstrapped,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Tsv,
    Json,
}

/// OTU gradient association analysis
#[derive(Parser)]
#[command(name = "otugrad")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// Path to the tab-separated OTU table
    #[arg(short = 'i', long)]
    otu_table: PathBuf,

    /// Path to the mapping file
    #[arg(short, long)]
    mapping: PathBuf,

    /// Drop OTU table samples missing from the mapping file instead of failing
    #[arg(long)]
    table_samples_are_superset: bool,

    /// Print samples found in only one of the two inputs
    #[arg(long)]
    print_non_overlap: bool,
}

#[derive(Args)]
struct TestArgs {
    /// Mapping file column holding the gradient
    #[arg(short, long)]
    category: String,

    /// Association statistic
    #[arg(short = 's', long, value_enum, default_value = "spearman")]
    test: CliTest,

    /// How p-values are assigned
    #[arg(long, value_enum, default_value = "fisher-z-transform")]
    pval_assignment_method: CliPValueMethod,

    /// Permutations for bootstrapped p-values
    #[arg(long, default_value = "1000")]
    permutations: usize,

    /// Random seed for bootstrapped p-values
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Run on a single thread
    #[arg(long)]
    sequential: bool,
}

#[derive(Args)]
struct OutputArgs {
    /// Output path for results
    #[arg(short, long)]
    output: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "tsv")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Correlate every OTU with a gradient across all samples
    Correlate {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        test: TestArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Correlate within each individual, then combine across individuals
    Longitudinal {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        test: TestArgs,

        /// Mapping file column identifying the individual
        #[arg(long)]
        individual_column: String,

        /// Significance level of the homogeneity test
        #[arg(long, default_value = "0.05")]
        homogeneity_alpha: f64,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Paired t test between matched before/after samples
    PairedT {
        /// Path to the tab-separated OTU table
        #[arg(short = 'i', long)]
        otu_table: PathBuf,

        /// Two-column map of paired samples (before, after)
        #[arg(short, long)]
        paired_samples: PathBuf,

        /// Run on a single thread
        #[arg(long)]
        sequential: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run a pipeline from a YAML configuration file
    Run {
        /// Path to pipeline configuration YAML
        #[arg(long)]
        config: PathBuf,

        /// Path to the tab-separated OTU table
        #[arg(short = 'i', long)]
        otu_table: PathBuf,

        /// Path to the mapping file (correlation and longitudinal modes)
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Paired sample map (paired_t mode)
        #[arg(short, long)]
        paired_samples: Option<PathBuf>,

        /// Print samples found in only one of the two inputs
        #[arg(long)]
        print_non_overlap: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate an example pipeline configuration
    Example {
        /// Output path for the YAML file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Correlate { data, test, output } => {
            let pipeline = configure(Pipeline::new().correlate(&test.category), &test, &data);
            cmd_analyze(pipeline, &data, &output)
        }

        Commands::Longitudinal {
            data,
            test,
            individual_column,
            homogeneity_alpha,
            output,
        } => {
            let pipeline = configure(
                Pipeline::new().longitudinal(&test.category, &individual_column),
                &test,
                &data,
            )
            .homogeneity_alpha(homogeneity_alpha);
            cmd_analyze(pipeline, &data, &output)
        }

        Commands::PairedT {
            otu_table,
            paired_samples,
            sequential,
            output,
        } => cmd_paired(
            Pipeline::new().paired_t().parallel(!sequential),
            &otu_table,
            &paired_samples,
            &output,
        ),

        Commands::Run {
            config,
            otu_table,
            mapping,
            paired_samples,
            print_non_overlap,
            output,
        } => cmd_run(
            &config,
            &otu_table,
            mapping.as_deref(),
            paired_samples.as_deref(),
            print_non_overlap,
            &output,
        ),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn configure(pipeline: Pipeline, test: &TestArgs, data: &DataArgs) -> Pipeline {
    pipeline
        .name("otugrad")
        .test(test.test.into())
        .pvalue_method(test.pval_assignment_method.into())
        .permutations(test.permutations)
        .seed(test.seed)
        .parallel(!test.sequential)
        .matrix_samples_are_superset(data.table_samples_are_superset)
}

/// Run a correlation or longitudinal analysis
fn cmd_analyze(pipeline: Pipeline, data: &DataArgs, output: &OutputArgs) -> Result<()> {
    // Reject bad test/method pairs before reading any input
    pipeline.validate()?;

    let (matrix, metadata) = load_inputs(&data.otu_table, &data.mapping)?;
    let report = pipeline.run(&matrix, &metadata)?;
    finish(&report, data.print_non_overlap, output)
}

/// Run the paired t test
fn cmd_paired(
    pipeline: Pipeline,
    otu_table: &Path,
    paired_samples: &Path,
    output: &OutputArgs,
) -> Result<()> {
    let pairs = PairedSamples::from_tsv(paired_samples)?;
    info!("Loaded {} sample pairs", pairs.len());
    let matrix = load_matrix(otu_table)?;

    let report = pipeline.run_paired(&matrix, &pairs)?;
    finish(&report, false, output)
}

/// Run a pipeline from configuration
fn cmd_run(
    config_path: &Path,
    otu_table: &Path,
    mapping: Option<&Path>,
    paired_samples: Option<&Path>,
    print_non_overlap: bool,
    output: &OutputArgs,
) -> Result<()> {
    info!("Loading pipeline configuration from {:?}", config_path);
    let config = PipelineConfig::from_file(config_path)?;
    let pipeline = Pipeline::from_config(&config);
    pipeline.validate()?;

    match (&config.mode, mapping, paired_samples) {
        (AnalysisMode::PairedT, _, Some(pairs)) => {
            cmd_paired(pipeline, otu_table, pairs, output)
        }
        (AnalysisMode::PairedT, _, None) => Err(
            GradientError::InvalidParameter("paired_t mode needs --paired-samples".to_string()),
        ),
        (_, Some(mapping), _) => {
            let (matrix, metadata) = load_inputs(otu_table, mapping)?;
            let report = pipeline.run(&matrix, &metadata)?;
            finish(&report, print_non_overlap, output)
        }
        (_, None, _) => Err(GradientError::InvalidParameter(format!(
            "{} mode needs --mapping",
            config.mode.name()
        ))),
    }
}

/// Generate example pipeline configuration
fn cmd_example(output_path: &Path) -> Result<()> {
    let yaml = PipelineConfig::example().to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example pipeline to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}

fn load_matrix(path: &Path) -> Result<AbundanceMatrix> {
    let matrix = AbundanceMatrix::from_tsv(path)?;
    info!(
        "Loaded {} OTUs x {} samples",
        matrix.n_features(),
        matrix.n_samples()
    );
    Ok(matrix)
}

fn load_inputs(otu_table: &Path, mapping: &Path) -> Result<(AbundanceMatrix, Metadata)> {
    let matrix = load_matrix(otu_table)?;
    let metadata = Metadata::from_tsv(mapping)?;
    info!("Loaded mapping file with {} samples", metadata.n_samples());
    Ok((matrix, metadata))
}

fn finish(report: &Report, print_non_overlap: bool, output: &OutputArgs) -> Result<()> {
    if print_non_overlap {
        let overlap = &report.non_overlap;
        eprintln!("Samples only in the OTU table: {}", overlap.matrix_only.join(", "));
        eprintln!("Samples only in the mapping file: {}", overlap.metadata_only.join(", "));
    }

    let writer = BufWriter::new(File::create(&output.output)?);
    match output.format {
        OutputFormat::Tsv => report.results.write_tsv(writer)?,
        OutputFormat::Json => report.results.write_json(writer)?,
    }

    eprintln!(
        "Done! {} OTUs written to {:?}",
        report.results.len(),
        output.output
    );
    let n_skipped = report.results.warnings().len();
    if n_skipped > 0 {
        eprintln!("  {} OTUs could not be tested", n_skipped);
    }
    Ok(())
}
