//! Drives a full audit run: batch the files, send each batch to the model
//! one at a time, and fold the findings into a single report.
//!
//! Batches are processed strictly in sequence. Findings keep batch order,
//! and a single request in flight keeps the retry backoff meaningful.

use crate::batch::{create_batches, BatchBudget};
use crate::config::Config;
use crate::llm::client::{CompletionClient, CompletionMode, CompletionTransport};
use crate::llm::error::CompletionError;
use crate::llm::parse::parse_findings;
use crate::llm::prompts::{build_analysis_prompt, SYSTEM_PROMPT};
use crate::model::{Finding, ProjectDescriptor, SourceFile};
use crate::report::AnalysisReport;
use crate::score::AnalysisSummary;
use chrono::Utc;
use std::time::Instant;
use thiserror::Error;

/// Progress notifications emitted during a run.
///
/// `Token` events are only sent in streaming mode and may repeat text when
/// a batch is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisEvent<'a> {
    /// A batch is about to be sent (1-based)
    BatchStarted {
        batch: usize,
        total: usize,
        files: usize,
    },
    Token(&'a str),
    BatchFinished {
        batch: usize,
        total: usize,
        findings: usize,
    },
}

pub type ProgressSink<'a> = dyn FnMut(AnalysisEvent<'_>) + Send + 'a;

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeOptions {
    /// Stream tokens from the service instead of waiting for the full reply
    pub stream: bool,
}

/// A run aborted because one batch could not be completed.
#[derive(Debug, Error)]
#[error("Analysis failed on batch {batch}/{total}: {source}")]
pub struct AnalysisError {
    pub batch: usize,
    pub total: usize,
    /// Findings from the batches that completed before the failure, for diagnostics
    pub partial_findings: Vec<Finding>,
    #[source]
    pub source: CompletionError,
}

pub struct Analyzer<T: CompletionTransport> {
    client: CompletionClient<T>,
    budget: BatchBudget,
}

impl Analyzer<crate::llm::anthropic::AnthropicTransport> {
    /// Build an analyzer talking to the configured service.
    ///
    /// Fails before any network call when the credential is missing.
    pub fn from_config(config: &Config) -> Result<Self, CompletionError> {
        let client = CompletionClient::from_config(config)?;
        Ok(Self::new(client, config.batch_budget()))
    }
}

impl<T: CompletionTransport> Analyzer<T> {
    pub fn new(client: CompletionClient<T>, budget: BatchBudget) -> Self {
        Self { client, budget }
    }

    pub fn client(&self) -> &CompletionClient<T> {
        &self.client
    }

    /// Run the audit. Any batch failure aborts the whole run.
    pub async fn analyze(
        &self,
        project: &ProjectDescriptor,
        files: &[SourceFile],
        options: AnalyzeOptions,
        mut progress: Option<&mut ProgressSink<'_>>,
    ) -> Result<AnalysisReport, AnalysisError> {
        let started = Instant::now();
        let batches = create_batches(files, self.budget.max_chars());
        let total = batches.len();
        let dependency_names = project.dependency_names();
        let mut findings: Vec<Finding> = Vec::new();

        tracing::info!(
            project = %project.name,
            files = files.len(),
            batches = total,
            stream = options.stream,
            "starting analysis"
        );

        for (idx, batch) in batches.iter().enumerate() {
            let number = idx + 1;
            if let Some(sink) = progress.as_deref_mut() {
                sink(AnalysisEvent::BatchStarted {
                    batch: number,
                    total,
                    files: batch.len(),
                });
            }
            tracing::info!(batch = number, total, files = batch.len(), "analyzing batch");

            let prompt = build_analysis_prompt(batch, &project.standard, &dependency_names);
            let result = if options.stream {
                let mut on_token = |token: &str| {
                    if let Some(sink) = progress.as_deref_mut() {
                        sink(AnalysisEvent::Token(token));
                    }
                };
                self.client
                    .complete(SYSTEM_PROMPT, &prompt, CompletionMode::Streaming(&mut on_token))
                    .await
            } else {
                self.client
                    .complete(SYSTEM_PROMPT, &prompt, CompletionMode::Buffered)
                    .await
            };

            let text = match result {
                Ok(text) => text,
                Err(source) => {
                    tracing::warn!(batch = number, total, error = %source, "batch failed, aborting run");
                    return Err(AnalysisError {
                        batch: number,
                        total,
                        partial_findings: findings,
                        source,
                    });
                }
            };

            let batch_findings = parse_findings(&text);
            tracing::info!(batch = number, total, findings = batch_findings.len(), "batch complete");
            if let Some(sink) = progress.as_deref_mut() {
                sink(AnalysisEvent::BatchFinished {
                    batch: number,
                    total,
                    findings: batch_findings.len(),
                });
            }
            findings.extend(batch_findings);
        }

        let summary = AnalysisSummary::from_findings(&findings, files.len());
        let duration = started.elapsed().as_secs_f64();
        tracing::info!(
            findings = findings.len(),
            score = summary.score,
            duration_secs = duration,
            "analysis complete"
        );

        Ok(AnalysisReport {
            project: project.clone(),
            files: files.to_vec(),
            findings,
            summary,
            timestamp: Utc::now(),
            duration,
        })
    }
}
