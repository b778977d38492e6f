use crate::model::{Finding, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score every run starts from before penalties
pub const MAX_SCORE: u8 = 100;

/// Coarse health band for the safety score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreBand {
    Healthy,
    Fair,
    AtRisk,
}

impl ScoreBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => ScoreBand::Healthy,
            60..=79 => ScoreBand::Fair,
            _ => ScoreBand::AtRisk,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::Healthy => "healthy",
            ScoreBand::Fair => "fair",
            ScoreBand::AtRisk => "at-risk",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScoreBand::Healthy => "Few safety or performance concerns",
            ScoreBand::Fair => "Needs attention",
            ScoreBand::AtRisk => "Significant safety issues",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-severity counts and the derived score for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub critical: usize,
    pub warning: usize,
    pub suggestion: usize,
    pub good: usize,
    pub files_analyzed: usize,
    /// 0-100; see [`compute_score`]
    pub score: u8,
}

impl AnalysisSummary {
    pub fn from_findings(findings: &[Finding], files_analyzed: usize) -> Self {
        let mut summary = AnalysisSummary {
            files_analyzed,
            ..Default::default()
        };
        for finding in findings {
            match finding.severity {
                Severity::Critical => summary.critical += 1,
                Severity::Warning => summary.warning += 1,
                Severity::Suggestion => summary.suggestion += 1,
                Severity::Good => summary.good += 1,
            }
        }
        summary.score = compute_score(findings);
        summary
    }

    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::Warning => self.warning,
            Severity::Suggestion => self.suggestion,
            Severity::Good => self.good,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.warning + self.suggestion + self.good
    }

    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.score)
    }
}

/// 100 minus 15 per critical, 5 per warning and 1 per suggestion, clamped to 0..=100.
pub fn compute_score(findings: &[Finding]) -> u8 {
    let penalty: i64 = findings.iter().map(|f| f.severity.penalty()).sum();
    let score = (MAX_SCORE as i64).saturating_sub(penalty);
    score.clamp(0, MAX_SCORE as i64) as u8
}
