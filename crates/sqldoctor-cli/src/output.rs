//! Printing tool responses

use anyhow::Result;
use clap::ValueEnum;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON envelope
    Json,
    /// Summary and list fields as tables
    Table,
}

pub fn print_response<T: Serialize>(response: &T, format: OutputFormat) -> Result<()> {
    let value = serde_json::to_value(response)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        OutputFormat::Table => {
            for (title, table) in render_tables(&value) {
                println!("{}\n{}\n", title, table);
            }
        }
    }
    Ok(())
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => {
            items.iter().map(cell).collect::<Vec<_>>().join(", ")
        }
        other => other.to_string(),
    }
}

/// Scalar fields of `object`, nested objects flattened one level as `parent.child`
fn scalar_fields(object: &Map<String, Value>) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    for (key, value) in object {
        match value {
            Value::Object(inner) => {
                for (inner_key, inner_value) in inner {
                    if !inner_value.is_object() && !is_record_list(inner_value) {
                        fields.push((format!("{}.{}", key, inner_key), cell(inner_value)));
                    }
                }
            }
            v if is_record_list(v) => {}
            v => fields.push((key.clone(), cell(v))),
        }
    }
    fields
}

fn is_record_list(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.first().is_some_and(Value::is_object))
}

fn record_table(records: &[Value]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for record in records.iter().filter_map(Value::as_object) {
        for (key, _) in scalar_fields(record) {
            if !columns.contains(&key) {
                columns.push(key);
            }
        }
    }

    let mut table = new_table();
    table.set_header(columns.clone());
    for record in records.iter().filter_map(Value::as_object) {
        let fields = scalar_fields(record);
        table.add_row(columns.iter().map(|column| {
            fields
                .iter()
                .find(|(key, _)| key == column)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        }));
    }
    table
}

/// A summary table of scalar fields, then one table per list of records
pub fn render_tables(value: &Value) -> Vec<(String, Table)> {
    let Some(object) = value.as_object() else {
        return Vec::new();
    };

    let mut tables = Vec::new();

    let mut summary = new_table();
    summary.set_header(vec!["field", "value"]);
    for (key, value) in scalar_fields(object) {
        summary.add_row(vec![key, value]);
    }
    tables.push(("summary".to_string(), summary));

    let nested = object.iter().flat_map(|(key, value)| match value {
        Value::Object(inner) => inner
            .iter()
            .map(|(inner_key, v)| (format!("{}.{}", key, inner_key), v))
            .collect::<Vec<_>>(),
        v => vec![(key.clone(), v)],
    });
    for (key, value) in nested {
        if let Some(records) = value.as_array().filter(|_| is_record_list(value)) {
            tables.push((key, record_table(records)));
        }
    }

    tables
}
