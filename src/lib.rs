//! C++ performance and memory-safety audit core.
//!
//! Takes already-discovered, already-classified C++ source files, packs them
//! into size-bounded batches, asks a hosted language model to review each
//! batch, and folds the returned findings into a scored report. Discovery,
//! CLI handling and rendering live outside this crate.

pub mod analyzer;
pub mod batch;
pub mod config;
pub mod llm;
pub mod model;
pub mod report;
pub mod score;
mod util;

pub use analyzer::{AnalysisError, AnalysisEvent, AnalyzeOptions, Analyzer, ProgressSink};
pub use batch::{create_batches, BatchBudget};
pub use config::Config;
pub use model::{
    sort_by_priority, BuildSystem, DependencyRef, FileCategory, Finding, ProjectDescriptor,
    Severity, SourceFile,
};
pub use report::AnalysisReport;
pub use score::{compute_score, AnalysisSummary, ScoreBand};
