//! Pipeline configuration and execution for gradient association analysis.

mod runner;

pub use runner::{AnalysisMode, Pipeline, PipelineConfig, Report, ResultSet, PAIRED_T_LABEL};
