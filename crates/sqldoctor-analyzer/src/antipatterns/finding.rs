//! Antipattern findings and reports

use serde::{Deserialize, Serialize};

/// Kind of inefficient construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AntipatternCategory {
    SelectStar,
    NonSargablePredicate,
    LeadingWildcard,
    CorrelatedSubquery,
    /// Aggregate evaluated in a row filter
    ScalarUdf,
    MissingStatistics,
}

impl AntipatternCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelectStar => "SELECT_STAR",
            Self::NonSargablePredicate => "NON_SARGABLE_PREDICATE",
            Self::LeadingWildcard => "LEADING_WILDCARD",
            Self::CorrelatedSubquery => "CORRELATED_SUBQUERY",
            Self::ScalarUdf => "SCALAR_UDF",
            Self::MissingStatistics => "MISSING_STATISTICS",
        }
    }
}

impl std::fmt::Display for AntipatternCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How urgently a query should be rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewritePriority {
    High,
    Medium,
    Low,
    None,
}

impl RewritePriority {
    /// Derives the priority from the most severe finding
    pub fn from_findings(findings: &[AntipatternFinding]) -> Self {
        let has = |severity: Severity| findings.iter().any(|f| f.severity == severity);
        if has(Severity::High) {
            Self::High
        } else if has(Severity::Medium) {
            Self::Medium
        } else if findings.is_empty() {
            Self::None
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::None => "NONE",
        }
    }
}

impl std::fmt::Display for RewritePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected antipattern. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntipatternFinding {
    category: AntipatternCategory,
    severity: Severity,
    location: String,
    issue: String,
    recommendation: String,
    estimated_impact: String,
}

impl AntipatternFinding {
    pub fn new(
        category: AntipatternCategory,
        severity: Severity,
        location: impl Into<String>,
        issue: impl Into<String>,
        recommendation: impl Into<String>,
        estimated_impact: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            location: location.into(),
            issue: issue.into(),
            recommendation: recommendation.into(),
            estimated_impact: estimated_impact.into(),
        }
    }

    pub fn category(&self) -> AntipatternCategory {
        self.category
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The matched query fragment
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn issue(&self) -> &str {
        &self.issue
    }

    pub fn recommendation(&self) -> &str {
        &self.recommendation
    }

    pub fn estimated_impact(&self) -> &str {
        &self.estimated_impact
    }
}

/// Output of a single detection rule
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    pub findings: Vec<AntipatternFinding>,
    pub score_delta: f64,
}

impl RuleOutcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(finding: AntipatternFinding, score_delta: f64) -> Self {
        Self {
            findings: vec![finding],
            score_delta,
        }
    }
}

/// Result of antipattern detection for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntipatternReport {
    pub findings: Vec<AntipatternFinding>,
    /// Composite score in `[1.0, 10.0]`
    pub complexity_score: f64,
    pub rewrite_priority: RewritePriority,
}

impl AntipatternReport {
    /// Number of findings with the given severity
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity() == severity)
            .count()
    }

    /// Returns the findings of one category
    pub fn by_category(&self, category: AntipatternCategory) -> Vec<&AntipatternFinding> {
        self.findings
            .iter()
            .filter(|f| f.category() == category)
            .collect()
    }

    /// One-line human-readable summary
    pub fn summary(&self) -> String {
        if self.findings.is_empty() {
            return format!(
                "No antipatterns detected (complexity {:.1}/10)",
                self.complexity_score
            );
        }
        format!(
            "Found {} antipattern(s): {} high, {} medium, {} low; complexity {:.1}/10, rewrite priority {}",
            self.findings.len(),
            self.count_by_severity(Severity::High),
            self.count_by_severity(Severity::Medium),
            self.count_by_severity(Severity::Low),
            self.complexity_score,
            self.rewrite_priority
        )
    }
}
