//! Tests for the antipattern detector

use super::*;
use crate::antipatterns::{AntipatternCategory, Severity};
use crate::showplan::{PlanOperator, PlanWarning, WarningKind};

fn categories(report: &AntipatternReport) -> Vec<AntipatternCategory> {
    report.findings.iter().map(|f| f.category()).collect()
}

mod scoring_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_select_star_alone() {
        let report = detect_antipatterns("SELECT * FROM T", None);
        assert_eq!(categories(&report), vec![AntipatternCategory::SelectStar]);
        assert_eq!(report.findings[0].severity(), Severity::Medium);
        assert_eq!(report.complexity_score, 1.5);
        assert_eq!(report.rewrite_priority, RewritePriority::Medium);
    }

    #[test]
    fn test_clean_query() {
        let report = detect_antipatterns("SELECT o.Id, o.Total FROM dbo.Orders o WHERE o.Id = @id", None);
        assert!(report.findings.is_empty());
        assert_eq!(report.complexity_score, 1.0);
        assert_eq!(report.rewrite_priority, RewritePriority::None);
        assert!(report.summary().starts_with("No antipatterns"));
    }

    #[test]
    fn test_empty_query() {
        let report = detect_antipatterns("", None);
        assert!(report.findings.is_empty());
        assert_eq!(report.complexity_score, 1.0);
    }

    #[test]
    fn test_score_is_clamped() {
        let query = (0..10)
            .map(|i| format!("UPPER(t.c{}) = 'x'", i))
            .collect::<Vec<_>>()
            .join(" AND ");
        let report = detect_antipatterns(&format!("SELECT * FROM t WHERE {}", query), None);

        assert_eq!(report.by_category(AntipatternCategory::NonSargablePredicate).len(), 10);
        assert_eq!(report.complexity_score, 10.0);
        assert_eq!(report.rewrite_priority, RewritePriority::High);
    }

    #[test]
    fn test_score_bounds_over_assorted_queries() {
        let queries = [
            "",
            "   ",
            "SELECT",
            "((((",
            "))) SELECT * FROM",
            "WHERE LIKE '%",
            "SELECT * FROM t WHERE YEAR(t.d) = 1 AND t.n LIKE '%x' AND EXISTS (SELECT 1 FROM u WHERE u.a = t.a)",
            "/* unterminated comment SELECT * FROM t",
            "SELECT 'unterminated",
        ];
        for query in queries {
            let report = detect_antipatterns(query, None);
            assert!(
                (1.0..=10.0).contains(&report.complexity_score),
                "score {} out of range for {:?}",
                report.complexity_score,
                query
            );
        }
    }
}

mod pipeline_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_findings_follow_rule_order() {
        let query = "SELECT * FROM Customers c \
                     WHERE UPPER(c.Name) = 'ACME' \
                       AND c.Email LIKE '%@acme.com' \
                       AND EXISTS (SELECT 1 FROM Orders o WHERE o.CustomerId = c.Id) \
                       AND SUM(c.Balance) > 0";
        let report = detect_antipatterns(query, None);

        assert_eq!(
            categories(&report),
            vec![
                AntipatternCategory::SelectStar,
                AntipatternCategory::NonSargablePredicate,
                AntipatternCategory::LeadingWildcard,
                AntipatternCategory::CorrelatedSubquery,
                AntipatternCategory::ScalarUdf,
            ]
        );
        // 1.0 + 0.5 + 1.5 + 1.0 + 2.0 + 1.0
        assert_eq!(report.complexity_score, 7.0);
        assert_eq!(report.rewrite_priority, RewritePriority::High);
        assert_eq!(report.count_by_severity(Severity::High), 3);
        assert_eq!(report.count_by_severity(Severity::Medium), 2);
    }

    #[test]
    fn test_apostrophe_in_bracketed_identifier() {
        let report = detect_antipatterns(
            "SELECT t.[Owner's Name] FROM dbo.T t WHERE YEAR(t.Created) = 2024",
            None,
        );
        assert_eq!(categories(&report), vec![AntipatternCategory::NonSargablePredicate]);
        assert_eq!(report.complexity_score, 2.5);
    }

    #[test]
    fn test_plan_contributes_findings_and_score() {
        let plan = ParsedPlan::new()
            .with_warning(
                PlanWarning::new(WarningKind::ColumnsWithNoStatistics, "no stats", "")
                    .with_column("Orders.Status"),
            )
            .with_operator(PlanOperator::new("Table Scan", "Table Scan").with_estimated_rows(50_000.0));

        let report = detect_antipatterns("SELECT o.Id FROM Orders o", Some(&plan));
        assert_eq!(categories(&report), vec![AntipatternCategory::MissingStatistics]);
        // 1.0 + 1.5 + 0.5
        assert_eq!(report.complexity_score, 3.0);
        assert_eq!(report.rewrite_priority, RewritePriority::High);
    }

    #[test]
    fn test_custom_scan_threshold() {
        let plan = ParsedPlan::new()
            .with_operator(PlanOperator::new("Table Scan", "Table Scan").with_estimated_rows(500.0));
        let config = AnalyzerConfig::new().with_large_scan_rows(100.0);

        let report = detect_antipatterns_with_config("SELECT a FROM t", Some(&plan), &config);
        assert!(report.findings.is_empty());
        assert_eq!(report.complexity_score, 1.5);
        assert_eq!(report.rewrite_priority, RewritePriority::None);
    }

    #[test]
    fn test_deterministic() {
        let query = "SELECT * FROM t WHERE LOWER(t.a) = 'x' AND UPPER(t.b) = 'y'";
        assert_eq!(detect_antipatterns(query, None), detect_antipatterns(query, None));
    }
}

mod report_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_summary() {
        let report = detect_antipatterns("SELECT * FROM t WHERE t.a LIKE '%x'", None);
        assert_eq!(
            report.summary(),
            "Found 2 antipattern(s): 1 high, 1 medium, 0 low; complexity 2.5/10, rewrite priority HIGH"
        );
    }

    #[test]
    fn test_serialization() {
        let report = detect_antipatterns("SELECT * FROM T", None);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["complexity_score"], 1.5);
        assert_eq!(json["rewrite_priority"], "MEDIUM");
        assert_eq!(json["findings"][0]["category"], "SELECT_STAR");
        assert_eq!(json["findings"][0]["severity"], "MEDIUM");
        assert_eq!(json["findings"][0]["location"], "SELECT * FROM");
    }
}
