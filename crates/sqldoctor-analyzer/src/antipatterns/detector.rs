//! Antipattern detector
//!
//! Runs every rule in [`RULES`](super::rules::RULES) order over one query and
//! folds their outcomes into a report.

use super::finding::{AntipatternReport, RewritePriority};
use super::rules::{QueryText, RULES};
use crate::config::AnalyzerConfig;
use crate::showplan::ParsedPlan;

/// Score of a query with no findings
pub const BASE_COMPLEXITY: f64 = 1.0;
/// Upper bound of the complexity score
pub const MAX_COMPLEXITY: f64 = 10.0;

/// Detects query antipatterns
#[derive(Debug, Clone, Default)]
pub struct AntipatternDetector {
    config: AnalyzerConfig,
}

impl AntipatternDetector {
    /// Creates a detector with default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Scans `query` (and `plan`, when available) for antipatterns
    pub fn detect(&self, query: &str, plan: Option<&ParsedPlan>) -> AntipatternReport {
        let text = QueryText::new(query);
        let mut findings = Vec::new();
        let mut score = BASE_COMPLEXITY;

        for (_, rule) in RULES.iter() {
            let outcome = rule(&text, plan, &self.config);
            score += outcome.score_delta;
            findings.extend(outcome.findings);
        }

        let rewrite_priority = RewritePriority::from_findings(&findings);
        AntipatternReport {
            findings,
            complexity_score: score.clamp(BASE_COMPLEXITY, MAX_COMPLEXITY),
            rewrite_priority,
        }
    }
}

/// Detects antipatterns using the default thresholds
pub fn detect_antipatterns(query: &str, plan: Option<&ParsedPlan>) -> AntipatternReport {
    AntipatternDetector::new().detect(query, plan)
}

/// Detects antipatterns with custom thresholds
pub fn detect_antipatterns_with_config(
    query: &str,
    plan: Option<&ParsedPlan>,
    config: &AnalyzerConfig,
) -> AntipatternReport {
    AntipatternDetector::with_config(config.clone()).detect(query, plan)
}

#[cfg(test)]
mod tests;
