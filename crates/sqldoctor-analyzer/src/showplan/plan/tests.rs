//! Tests for the parsed plan model

use super::*;

#[test]
fn test_plan_parse_accessors() {
    let parsed = PlanParse::Parsed(ParsedPlan::new().with_statement_cost(1.5));
    assert!(parsed.is_parsed());
    assert_eq!(parsed.plan().map(|p| p.statement_cost), Some(1.5));
    assert!(parsed.no_data_reason().is_none());

    let none = PlanParse::NoData(NoDataReason::MissingNamespace);
    assert!(none.plan().is_none());
    assert_eq!(none.no_data_reason(), Some(&NoDataReason::MissingNamespace));
    assert!(none.into_plan().is_none());
}

#[test]
fn test_operator_is_scan() {
    assert!(PlanOperator::new("Clustered Index Scan", "Clustered Index Scan").is_scan());
    assert!(PlanOperator::new("Table Scan", "Table Scan").is_scan());
    assert!(!PlanOperator::new("Index Seek", "Index Seek").is_scan());
    assert!(!PlanOperator::new("Hash Match", "Inner Join").is_scan());
}

#[test]
fn test_tables_are_distinct_in_order() {
    let plan = ParsedPlan::new()
        .with_operator(PlanOperator::new("Hash Match", "Inner Join"))
        .with_operator(PlanOperator::new("Index Scan", "Index Scan").with_table("dbo.Orders"))
        .with_operator(PlanOperator::new("Index Seek", "Index Seek").with_table("dbo.Customers"))
        .with_operator(PlanOperator::new("Key Lookup", "Key Lookup").with_table("dbo.orders"));

    assert_eq!(plan.tables(), vec!["dbo.Orders", "dbo.Customers"]);
    assert_eq!(plan.scan_operators().count(), 1);
}

#[test]
fn test_columns_without_statistics_filter() {
    let plan = ParsedPlan::new()
        .with_warning(
            PlanWarning::new(WarningKind::ColumnsWithNoStatistics, "no stats", "")
                .with_column("Orders.Status"),
        )
        .with_warning(PlanWarning::new(WarningKind::SpillToTempDb, "spill", ""));

    let columns: Vec<_> = plan
        .columns_without_statistics()
        .filter_map(|w| w.column.as_deref())
        .collect();
    assert_eq!(columns, vec!["Orders.Status"]);
}

#[test]
fn test_identifier_decoration() {
    assert_eq!(strip_identifier_decoration(" [Order Date] "), "Order Date");
    assert_eq!(strip_identifier_decoration("\"Status\""), "Status");
    assert_eq!(qualified_table_name(Some("[dbo]"), "[Orders]"), "dbo.Orders");
    assert_eq!(qualified_table_name(None, "[Orders]"), "Orders");
    assert_eq!(qualified_table_name(Some(""), "Orders"), "Orders");
}

#[test]
fn test_no_data_reason_messages() {
    assert_eq!(
        NoDataReason::UnexpectedRoot("html".to_string()).to_string(),
        "Unexpected root element <html>, expected <ShowPlanXML>"
    );
    assert!(NoDataReason::Malformed("eof".into()).to_string().contains("eof"));
}

#[test]
fn test_warning_kind_display() {
    assert_eq!(WarningKind::MemoryGrant.to_string(), "MemoryGrant");
    assert_eq!(WarningKind::Other("SpatialGuess".into()).to_string(), "SpatialGuess");
}
