//! Tests for index usage review

use super::*;
use pretty_assertions::assert_eq;
use sqldoctor_core::Value;

fn usage(seeks: u64, scans: u64, lookups: u64, updates: u64) -> IndexUsageRow {
    IndexUsageRow {
        table: "dbo.Orders".to_string(),
        index_name: "IX_Orders_Status".to_string(),
        user_seeks: seeks,
        user_scans: scans,
        user_lookups: lookups,
        user_updates: updates,
        size_mb: 12.5,
    }
}

#[test]
fn test_unused_index_is_drop_candidate() {
    let records = review_index_usage(&[usage(0, 0, 0, 150)], &AnalyzerConfig::default());
    assert!(records[0].is_drop_candidate());
    assert_eq!(
        records[0].action.as_deref(),
        Some("DROP INDEX [IX_Orders_Status] ON [dbo].[Orders];")
    );
}

#[test]
fn test_unused_index_with_few_updates_is_kept() {
    let records = review_index_usage(&[usage(0, 0, 0, 100)], &AnalyzerConfig::default());
    assert_eq!(records[0].recommendation, None);
    assert_eq!(records[0].action, None);
}

#[test]
fn test_rarely_read_index_is_reviewed() {
    let records = review_index_usage(&[usage(3, 2, 4, 5_000)], &AnalyzerConfig::default());
    assert!(!records[0].is_drop_candidate());
    assert!(records[0].recommendation.as_deref().unwrap().contains("9 reads vs 5000 updates"));
}

#[test]
fn test_healthy_index() {
    let records = review_index_usage(&[usage(500, 0, 0, 5_000)], &AnalyzerConfig::default());
    assert_eq!(records[0].recommendation, None);
    assert_eq!(records[0].seeks, 500);
    assert_eq!(records[0].size_mb, 12.5);
}

#[test]
fn test_from_row() {
    let row = Row::from_pairs([
        ("table_name", Value::from("Sales.Lines")),
        ("index_name", Value::from("IX_Lines_Sku")),
        ("user_seeks", Value::Int64(0)),
        ("user_scans", Value::Null),
        ("user_lookups", Value::Int64(0)),
        ("user_updates", Value::Int64(2_000)),
        ("size_mb", Value::Decimal("4.25".to_string())),
    ]);
    let parsed = IndexUsageRow::from_row(&row).unwrap();
    assert_eq!(parsed.user_scans, 0);
    assert_eq!(parsed.size_mb, 4.25);

    let records = review_index_usage(&[parsed], &AnalyzerConfig::default());
    assert_eq!(records[0].action.as_deref(), Some("DROP INDEX [IX_Lines_Sku] ON [Sales].[Lines];"));
}
