//! Plan capture batches and result-set handling
//!
//! With `SET STATISTICS XML ON` the server appends one extra result set per
//! statement: a single row whose only column is named [`SHOWPLAN_COLUMN`].
//! `SET SHOWPLAN_XML ON` returns only those result sets and executes nothing.

use sqldoctor_core::{Row, Value};

/// Column name SQL Server uses for ShowPlan XML result sets
pub const SHOWPLAN_COLUMN: &str = "Microsoft SQL Server 2005 XML Showplan";

pub(crate) const STATISTICS_XML_ON: &str = "SET STATISTICS XML ON";
pub(crate) const STATISTICS_XML_OFF: &str = "SET STATISTICS XML OFF";
pub(crate) const SHOWPLAN_XML_ON: &str = "SET SHOWPLAN_XML ON";
pub(crate) const SHOWPLAN_XML_OFF: &str = "SET SHOWPLAN_XML OFF";

/// Brackets an identifier for use in a batch, doubling any `]`
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.trim().replace(']', "]]"))
}

pub(crate) fn use_database(database: &str) -> String {
    format!("USE {}", quote_identifier(database))
}

fn plan_xml(set: &[Row]) -> Option<String> {
    let row = set.first()?;
    let is_plan = row
        .columns()
        .first()
        .is_some_and(|c| c.eq_ignore_ascii_case(SHOWPLAN_COLUMN));
    if !is_plan {
        return None;
    }
    match row.get(0)? {
        Value::String(xml) => Some(xml.clone()),
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Separates the query's rows from the plan documents in a batch's result sets
///
/// Returns the first non-plan result set and the plan of the last statement.
pub fn split_plan_result_sets(sets: Vec<Vec<Row>>) -> (Vec<Row>, Option<String>) {
    let mut data: Option<Vec<Row>> = None;
    let mut plan = None;

    for set in sets {
        match plan_xml(&set) {
            Some(xml) => plan = Some(xml),
            None if data.is_none() && !set.is_empty() => data = Some(set),
            None => {}
        }
    }

    (data.unwrap_or_default(), plan)
}
