//! Index usage review
//!
//! Flags indexes that cost writes without paying for themselves in reads.

use super::advisor::quote_table;
use crate::config::AnalyzerConfig;
use serde::{Deserialize, Serialize};
use sqldoctor_core::Row;

/// One row of `sys.dm_db_index_usage_stats` joined with index metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexUsageRow {
    pub table: String,
    pub index_name: String,
    pub user_seeks: u64,
    pub user_scans: u64,
    pub user_lookups: u64,
    pub user_updates: u64,
    pub size_mb: f64,
}

impl IndexUsageRow {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            table: row.get_string("table_name")?,
            index_name: row.get_string("index_name")?,
            user_seeks: row.get_u64("user_seeks"),
            user_scans: row.get_u64("user_scans"),
            user_lookups: row.get_u64("user_lookups"),
            user_updates: row.get_u64("user_updates"),
            size_mb: row.get_f64("size_mb").unwrap_or(0.0),
        })
    }

    pub fn total_reads(&self) -> u64 {
        self.user_seeks + self.user_scans + self.user_lookups
    }
}

/// Usage counters with an optional recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexUsageRecord {
    pub table: String,
    pub index_name: String,
    pub seeks: u64,
    pub scans: u64,
    pub lookups: u64,
    pub updates: u64,
    pub size_mb: f64,
    pub recommendation: Option<String>,
    /// Statement to apply, present only for drop candidates
    pub action: Option<String>,
}

impl IndexUsageRecord {
    pub fn is_drop_candidate(&self) -> bool {
        self.action.is_some()
    }
}

/// Reviews every index row, in input order
pub fn review_index_usage(rows: &[IndexUsageRow], config: &AnalyzerConfig) -> Vec<IndexUsageRecord> {
    rows.iter().map(|row| review_row(row, config)).collect()
}

fn review_row(row: &IndexUsageRow, config: &AnalyzerConfig) -> IndexUsageRecord {
    let reads = row.total_reads();
    let (recommendation, action) = if reads == 0 && row.user_updates > config.unused_index_min_updates {
        (
            Some(format!(
                "Index is never read but was updated {} times; consider dropping it",
                row.user_updates
            )),
            Some(format!(
                "DROP INDEX [{}] ON {};",
                row.index_name,
                quote_table(&row.table)
            )),
        )
    } else if reads < config.low_read_max_reads && row.user_updates > config.low_read_min_updates {
        (
            Some(format!(
                "Index is rarely read ({} reads vs {} updates); review whether it is needed",
                reads, row.user_updates
            )),
            None,
        )
    } else {
        (None, None)
    };

    IndexUsageRecord {
        table: row.table.clone(),
        index_name: row.index_name.clone(),
        seeks: row.user_seeks,
        scans: row.user_scans,
        lookups: row.user_lookups,
        updates: row.user_updates,
        size_mb: row.size_mb,
        recommendation,
        action,
    }
}

#[cfg(test)]
mod tests;
