//! The final, renderer-facing result of an audit run.

use crate::model::{Finding, ProjectDescriptor, Severity, SourceFile};
use crate::score::AnalysisSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub project: ProjectDescriptor,
    pub files: Vec<SourceFile>,
    /// Batch order, then the model's order within each batch
    pub findings: Vec<Finding>,
    pub summary: AnalysisSummary,
    /// When the run completed
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration of the run in seconds
    pub duration: f64,
}

impl AnalysisReport {
    /// Drop findings less severe than `min`.
    ///
    /// `good` findings are always kept so positive patterns stay visible at
    /// any threshold. The summary is not recomputed; it describes the whole run.
    pub fn retain_min_severity(&mut self, min: Severity) {
        self.findings
            .retain(|f| f.severity == Severity::Good || f.severity.rank() <= min.rank());
    }

    /// Findings grouped per severity, most severe first, each group in report order.
    pub fn findings_by_severity(&self) -> Vec<(Severity, Vec<&Finding>)> {
        Severity::ALL
            .iter()
            .map(|severity| {
                let group = self
                    .findings
                    .iter()
                    .filter(|f| f.severity == *severity)
                    .collect();
                (*severity, group)
            })
            .collect()
    }

    /// CI gate: any critical finding fails the run
    pub fn has_critical(&self) -> bool {
        self.summary.critical > 0
    }
}
