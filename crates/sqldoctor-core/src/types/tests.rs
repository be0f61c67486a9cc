//! Tests for values and rows

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_value_numeric_coercion() {
    assert_eq!(Value::Decimal("12.50".into()).as_f64(), Some(12.5));
    assert_eq!(Value::Decimal("12.50".into()).as_i64(), Some(12));
    assert_eq!(Value::Int32(7).as_f64(), Some(7.0));
    assert_eq!(Value::Null.as_i64(), None);
    assert_eq!(Value::Int16(1).as_bool(), Some(true));
}

#[test]
fn test_row_lookup_is_case_insensitive() {
    let row = Row::from_pairs([("ServerName", Value::from("SQL01")), ("Seeks", Value::Int64(5))]);
    assert_eq!(row.get_string("servername"), Some("SQL01".to_string()));
    assert_eq!(row.get_u64("SEEKS"), 5);
    assert_eq!(row.get_u64("missing"), 0);
}

#[test]
fn test_row_null_string_is_none() {
    let row = Row::from_pairs([("last_wait_type", Value::Null)]);
    assert_eq!(row.get_string("last_wait_type"), None);
}

#[test]
fn test_query_result_from_rows() {
    let result = QueryResult::from_rows(vec![Row::from_pairs([("a", 1i64), ("b", 2i64)])]);
    assert!(result.has_rows());
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.columns[1].name, "b");
    assert_eq!(result.columns[1].ordinal, 1);
}
