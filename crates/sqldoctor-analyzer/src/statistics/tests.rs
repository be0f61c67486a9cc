//! Tests for statistics health

use super::*;
use chrono::NaiveDate;
use sqldoctor_core::{MemorySink, NullSink};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn assess(row: StatisticsRow) -> StatisticsRecord {
    assess_row(&row, now(), &AnalyzerConfig::default())
}

mod severity_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fresh_statistics_are_ok() {
        let record = assess(StatisticsRow::new("dbo.Orders", 1_000).with_days_old(5).with_modification_counter(50));
        assert!(!record.needs_update);
        assert_eq!(record.severity, StatisticsSeverity::Ok);
        assert_eq!(record.recommendation, None);
    }

    #[test]
    fn test_heavily_modified_recent_statistics_are_high() {
        let record = assess(
            StatisticsRow::new("dbo.Orders", 1_000)
                .with_stat_name("IX_Orders_Date")
                .with_days_old(10)
                .with_modification_percent(55.0),
        );
        assert!(record.needs_update);
        assert_eq!(record.severity, StatisticsSeverity::High);
        assert_eq!(
            record.recommendation.as_deref(),
            Some("UPDATE STATISTICS [dbo].[Orders] [IX_Orders_Date] WITH FULLSCAN;")
        );
    }

    #[test]
    fn test_update_command_quotes_table() {
        let record = assess(
            StatisticsRow::new("[Sales].[Order Details]", 1_000)
                .with_stat_name("PK_Order_Details")
                .with_days_old(120),
        );
        assert_eq!(
            record.recommendation.as_deref(),
            Some("UPDATE STATISTICS [Sales].[Order Details] [PK_Order_Details] WITH FULLSCAN;")
        );
    }

    #[test]
    fn test_stale_by_age_is_warning() {
        let record = assess(
            StatisticsRow::new("dbo.Orders", 1_000)
                .with_stat_name("[_WA_Sys_0001]")
                .with_days_old(31),
        );
        assert_eq!(record.severity, StatisticsSeverity::Warning);
        assert_eq!(
            record.recommendation.as_deref(),
            Some("UPDATE STATISTICS [dbo].[Orders] [_WA_Sys_0001];")
        );
    }

    #[test]
    fn test_boundaries_are_strict() {
        let at_threshold = assess(
            StatisticsRow::new("t", 100)
                .with_days_old(30)
                .with_modification_percent(20.0),
        );
        assert!(!at_threshold.needs_update);

        let at_critical = assess(
            StatisticsRow::new("t", 100)
                .with_days_old(90)
                .with_modification_percent(50.0),
        );
        assert_eq!(at_critical.severity, StatisticsSeverity::Warning);

        let past_critical = assess(StatisticsRow::new("t", 100).with_days_old(91));
        assert_eq!(past_critical.severity, StatisticsSeverity::High);
    }

    #[test]
    fn test_custom_thresholds() {
        let config = AnalyzerConfig::new()
            .with_stale_stats(7, 10.0)
            .with_critical_stats(14, 30.0);
        let record = assess_row(&StatisticsRow::new("t", 100).with_days_old(8), now(), &config);
        assert_eq!(record.severity, StatisticsSeverity::Warning);
    }
}

mod age_and_modification_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_days_from_timestamp() {
        let updated = NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        let record = assess(StatisticsRow::new("t", 10).with_last_updated(updated));
        // 60 days and 18 hours
        assert_eq!(record.days_old, 60);
        assert_eq!(record.severity, StatisticsSeverity::Warning);
    }

    #[test]
    fn test_never_updated() {
        let record = assess(StatisticsRow::new("t", 10));
        assert_eq!(record.days_old, 9_999);
        assert_eq!(record.severity, StatisticsSeverity::High);
    }

    #[test]
    fn test_modification_percent_from_counter() {
        let row = StatisticsRow::new("t", 400).with_modification_counter(100);
        assert_eq!(row.modification_percent(), 25.0);
        assert_eq!(StatisticsRow::new("t", 0).with_modification_counter(5).modification_percent(), 0.0);
    }

    #[test]
    fn test_from_row() {
        let updated = NaiveDate::from_ymd_opt(2024, 5, 30)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let row = Row::from_pairs([
            ("table_name", Value::from("dbo.Orders")),
            ("stat_name", Value::from("PK_Orders")),
            ("last_updated", Value::DateTime(updated)),
            ("rows", Value::Int64(200)),
            ("modification_counter", Value::Int64(50)),
        ]);
        let parsed = StatisticsRow::from_row(&row).unwrap();

        assert_eq!(parsed.days_old, None);
        assert_eq!(parsed.last_updated, Some(updated));
        let record = assess(parsed);
        assert_eq!(record.days_old, 2);
        assert_eq!(record.modification_percent, 25.0);
        assert_eq!(record.severity, StatisticsSeverity::Warning);
    }
}

mod table_selection_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows() -> Vec<StatisticsRow> {
        vec![
            StatisticsRow::new("dbo.Orders", 100).with_stat_name("PK_Orders").with_days_old(1),
            StatisticsRow::new("dbo.Orders", 100).with_stat_name("IX_Orders_Date").with_days_old(45),
            StatisticsRow::new("Sales.Lines", 100).with_stat_name("PK_Lines").with_days_old(1),
        ]
    }

    #[test]
    fn test_skipped_tables_are_reported() {
        let sink = MemorySink::new();
        let requested = vec!["[dbo].[Orders]".to_string(), "dbo.Missing".to_string()];
        let assessment = assess_tables(&requested, &rows(), now(), &sink);

        assert_eq!(assessment.records.len(), 2);
        assert_eq!(assessment.needing_update().count(), 1);
        assert_eq!(assessment.skipped_tables, vec!["dbo.Missing"]);

        let warnings = sink.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, "statistics.table_skipped");
        assert_eq!(warnings[0].field("table"), Some("dbo.Missing"));
    }

    #[test]
    fn test_unqualified_name_matches_any_schema() {
        let assessment = assess_tables(&["lines".to_string()], &rows(), now(), &NullSink);
        assert_eq!(assessment.records.len(), 1);
        assert_eq!(assessment.records[0].table, "Sales.Lines");
        assert!(assessment.skipped_tables.is_empty());
    }

    #[test]
    fn test_qualified_name_must_match_schema() {
        let assessment = assess_tables(&["dbo.Lines".to_string()], &rows(), now(), &NullSink);
        assert!(assessment.records.is_empty());
        assert_eq!(assessment.skipped_tables, vec!["dbo.Lines"]);
    }

    #[test]
    fn test_assess_statistics_emits_summary() {
        let sink = MemorySink::new();
        let records = assess_statistics(&rows(), now(), &sink);
        assert_eq!(records.len(), 3);
        assert!(sink.has_code("statistics.assessed"));
        assert!(sink.warnings().is_empty());
    }
}
