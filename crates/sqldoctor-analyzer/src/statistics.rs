//! Statistics health
//!
//! Turns per-table statistics rows (`sys.stats` with
//! `sys.dm_db_stats_properties`) into update urgency and maintenance
//! commands.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use sqldoctor_analyzer::{StatisticsRow, StatisticsSeverity, assess_statistics};
//! use sqldoctor_core::NullSink;
//!
//! let now = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let row = StatisticsRow::new("dbo.Orders", 1_000)
//!     .with_stat_name("IX_Orders_Date")
//!     .with_days_old(10)
//!     .with_modification_counter(550);
//!
//! let records = assess_statistics(&[row], now, &NullSink);
//! assert_eq!(records[0].severity, StatisticsSeverity::High);
//! ```

use crate::config::AnalyzerConfig;
use crate::indexes::{normalize_table_name, quote_table};
use crate::showplan::strip_identifier_decoration;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqldoctor_core::{DiagnosticEvent, DiagnosticSink, Row, Value};

/// Update urgency of a statistics object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatisticsSeverity {
    Ok,
    Warning,
    High,
}

impl StatisticsSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::High => "HIGH",
        }
    }
}

impl std::fmt::Display for StatisticsSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw statistics properties for one statistics object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRow {
    pub table: String,
    pub stat_name: Option<String>,
    /// `None` means the statistic was never updated
    pub last_updated: Option<NaiveDateTime>,
    /// Age reported directly by the server, preferred over `last_updated`
    pub days_old: Option<u64>,
    pub rows: u64,
    pub modification_counter: u64,
    /// Explicit percentage, preferred over `modification_counter / rows`
    pub modification_percent: Option<f64>,
}

impl StatisticsRow {
    pub fn new(table: impl Into<String>, rows: u64) -> Self {
        Self {
            table: table.into(),
            stat_name: None,
            last_updated: None,
            days_old: None,
            rows,
            modification_counter: 0,
            modification_percent: None,
        }
    }

    pub fn with_stat_name(mut self, name: impl Into<String>) -> Self {
        self.stat_name = Some(name.into());
        self
    }

    pub fn with_last_updated(mut self, at: NaiveDateTime) -> Self {
        self.last_updated = Some(at);
        self
    }

    pub fn with_days_old(mut self, days: u64) -> Self {
        self.days_old = Some(days);
        self
    }

    pub fn with_modification_counter(mut self, counter: u64) -> Self {
        self.modification_counter = counter;
        self
    }

    pub fn with_modification_percent(mut self, percent: f64) -> Self {
        self.modification_percent = Some(percent);
        self
    }

    /// Reads a statistics row; rows without a table name are skipped
    pub fn from_row(row: &Row) -> Option<Self> {
        let last_updated = match row.get_by_name("last_updated") {
            Some(Value::DateTime(at)) => Some(*at),
            Some(Value::DateTimeUtc(at)) => Some(at.naive_utc()),
            Some(Value::Date(day)) => day.and_hms_opt(0, 0, 0),
            Some(Value::String(text)) => {
                NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").ok()
            }
            _ => None,
        };
        Some(Self {
            table: row.get_string("table_name")?,
            stat_name: row.get_string("stat_name"),
            last_updated,
            days_old: row.get_i64("days_since_update").map(|d| d.max(0) as u64),
            rows: row.get_u64("rows"),
            modification_counter: row.get_u64("modification_counter"),
            modification_percent: row.get_f64("modification_percent"),
        })
    }

    /// Whole days since the last update, as of `now`
    pub fn days_since_update(&self, now: NaiveDateTime, config: &AnalyzerConfig) -> u64 {
        if let Some(days) = self.days_old {
            return days;
        }
        match self.last_updated {
            Some(at) => (now - at).num_days().max(0) as u64,
            None => config.never_updated_days,
        }
    }

    /// Share of rows modified since the last update, in percent
    pub fn modification_percent(&self) -> f64 {
        if let Some(percent) = self.modification_percent {
            return percent.max(0.0);
        }
        if self.rows == 0 {
            0.0
        } else {
            self.modification_counter as f64 / self.rows as f64 * 100.0
        }
    }
}

/// Assessed statistics object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRecord {
    pub table: String,
    pub stat_name: Option<String>,
    pub days_old: u64,
    pub modification_percent: f64,
    pub needs_update: bool,
    pub severity: StatisticsSeverity,
    pub recommendation: Option<String>,
}

/// Records for the requested tables plus the tables that had no statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsAssessment {
    pub records: Vec<StatisticsRecord>,
    pub skipped_tables: Vec<String>,
}

impl StatisticsAssessment {
    pub fn needing_update(&self) -> impl Iterator<Item = &StatisticsRecord> {
        self.records.iter().filter(|r| r.needs_update)
    }
}

fn update_command(table: &str, stat_name: Option<&str>, full_scan: bool) -> String {
    let mut command = format!("UPDATE STATISTICS {}", quote_table(&normalize_table_name(table)));
    if let Some(name) = stat_name {
        command.push_str(&format!(" [{}]", strip_identifier_decoration(name)));
    }
    if full_scan {
        command.push_str(" WITH FULLSCAN");
    }
    command.push(';');
    command
}

/// Assesses one row
pub fn assess_row(row: &StatisticsRow, now: NaiveDateTime, config: &AnalyzerConfig) -> StatisticsRecord {
    let days_old = row.days_since_update(now, config);
    let modification_percent = row.modification_percent();
    let needs_update = days_old > config.stale_stats_days
        || modification_percent > config.stale_stats_modification_percent;

    let severity = if modification_percent > config.critical_stats_modification_percent
        || days_old > config.critical_stats_days
    {
        StatisticsSeverity::High
    } else if needs_update {
        StatisticsSeverity::Warning
    } else {
        StatisticsSeverity::Ok
    };

    let recommendation = match severity {
        StatisticsSeverity::High => Some(update_command(&row.table, row.stat_name.as_deref(), true)),
        StatisticsSeverity::Warning => Some(update_command(&row.table, row.stat_name.as_deref(), false)),
        StatisticsSeverity::Ok => None,
    };

    StatisticsRecord {
        table: row.table.clone(),
        stat_name: row.stat_name.clone(),
        days_old,
        modification_percent,
        needs_update,
        severity,
        recommendation,
    }
}

/// Assesses every row using the default thresholds
pub fn assess_statistics(
    rows: &[StatisticsRow],
    now: NaiveDateTime,
    sink: &dyn DiagnosticSink,
) -> Vec<StatisticsRecord> {
    assess_statistics_with_config(rows, now, sink, &AnalyzerConfig::default())
}

pub fn assess_statistics_with_config(
    rows: &[StatisticsRow],
    now: NaiveDateTime,
    sink: &dyn DiagnosticSink,
    config: &AnalyzerConfig,
) -> Vec<StatisticsRecord> {
    let records: Vec<StatisticsRecord> = rows.iter().map(|row| assess_row(row, now, config)).collect();
    let stale = records.iter().filter(|r| r.needs_update).count();
    sink.emit(
        DiagnosticEvent::debug("statistics.assessed", "Assessed statistics")
            .with_field("count", records.len())
            .with_field("stale", stale),
    );
    records
}

fn same_table(requested: &str, reported: &str) -> bool {
    let normalize = |name: &str| {
        name.split('.')
            .map(strip_identifier_decoration)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
    };
    let requested = normalize(requested);
    let reported = normalize(reported);
    // An unqualified name matches any schema.
    match (requested.as_slice(), reported.as_slice()) {
        ([table], [.., other]) => table.eq_ignore_ascii_case(other),
        (a, b) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y)),
    }
}

/// Assesses the rows of the requested tables using the default thresholds
pub fn assess_tables(
    requested_tables: &[String],
    rows: &[StatisticsRow],
    now: NaiveDateTime,
    sink: &dyn DiagnosticSink,
) -> StatisticsAssessment {
    assess_tables_with_config(requested_tables, rows, now, sink, &AnalyzerConfig::default())
}

/// Requested tables with no statistics rows are reported and excluded
pub fn assess_tables_with_config(
    requested_tables: &[String],
    rows: &[StatisticsRow],
    now: NaiveDateTime,
    sink: &dyn DiagnosticSink,
    config: &AnalyzerConfig,
) -> StatisticsAssessment {
    let mut assessment = StatisticsAssessment::default();

    for table in requested_tables {
        let table_rows: Vec<StatisticsRow> = rows
            .iter()
            .filter(|row| same_table(table, &row.table))
            .cloned()
            .collect();

        if table_rows.is_empty() {
            sink.emit(
                DiagnosticEvent::warning("statistics.table_skipped", "No statistics found for table")
                    .with_field("table", table),
            );
            assessment.skipped_tables.push(table.clone());
            continue;
        }

        assessment
            .records
            .extend(assess_statistics_with_config(&table_rows, now, sink, config));
    }

    assessment
}

#[cfg(test)]
mod tests;
