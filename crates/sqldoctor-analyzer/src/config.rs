//! Analyzer thresholds
//!
//! Every heuristic cut-off used by the analyzer lives here so callers can
//! tune them from settings. The defaults are the documented contract; the
//! comparisons against them are strict unless a field says otherwise.

use serde::{Deserialize, Serialize};

/// Configuration for the diagnostic analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// CPU share of duration (percent) above which an execution is CPU bound
    pub cpu_bound_percent: f64,
    /// Physical/logical read ratio above which an execution is IO bound
    pub io_bound_read_ratio: f64,
    /// Duration (ms) above which an execution without reads is UNKNOWN
    pub unknown_duration_ms: u64,

    /// Estimated rows above which a scan operator adds to complexity
    pub large_scan_rows: f64,

    /// Number of DMV candidates kept after ranking
    pub dmv_top_n: usize,
    /// DMV impact score above which a candidate may be HIGH
    pub dmv_high_impact: f64,
    /// User seeks above which a high-impact DMV candidate is HIGH
    pub dmv_high_seeks: u64,
    /// DMV impact score above which a candidate is MEDIUM
    pub dmv_medium_impact: f64,
    /// Multiplier turning a plan impact percent into an impact score
    pub plan_impact_scale: f64,
    /// Plan impact percent at or above which a hint is CRITICAL
    pub plan_critical_percent: f64,
    /// Plan impact percent at or above which a hint is HIGH
    pub plan_high_percent: f64,
    /// Plan impact percent at or above which a hint is MEDIUM
    pub plan_medium_percent: f64,
    /// Include column count above which an index is flagged as wide
    pub wide_include_columns: usize,
    /// Key column count above which an index is flagged as wide
    pub wide_key_columns: usize,

    /// Updates above which an unread index is a drop candidate
    pub unused_index_min_updates: u64,
    /// Reads below which a heavily updated index is flagged for review
    pub low_read_max_reads: u64,
    /// Updates above which a rarely read index is flagged for review
    pub low_read_min_updates: u64,

    /// Days since update above which statistics are stale
    pub stale_stats_days: u64,
    /// Modification percent above which statistics are stale
    pub stale_stats_modification_percent: f64,
    /// Days since update above which stale statistics are HIGH
    pub critical_stats_days: u64,
    /// Modification percent above which stale statistics are HIGH
    pub critical_stats_modification_percent: f64,
    /// Age assigned to statistics that were never updated
    pub never_updated_days: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            cpu_bound_percent: 70.0,
            io_bound_read_ratio: 0.1,
            unknown_duration_ms: 1_000,
            large_scan_rows: 10_000.0,
            dmv_top_n: 20,
            dmv_high_impact: 100_000.0,
            dmv_high_seeks: 1_000,
            dmv_medium_impact: 10_000.0,
            plan_impact_scale: 1_000.0,
            plan_critical_percent: 90.0,
            plan_high_percent: 50.0,
            plan_medium_percent: 20.0,
            wide_include_columns: 5,
            wide_key_columns: 4,
            unused_index_min_updates: 100,
            low_read_max_reads: 10,
            low_read_min_updates: 1_000,
            stale_stats_days: 30,
            stale_stats_modification_percent: 20.0,
            critical_stats_days: 90,
            critical_stats_modification_percent: 50.0,
            never_updated_days: 9_999,
        }
    }
}

impl AnalyzerConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the CPU-bound threshold (percent of duration)
    pub fn with_cpu_bound_percent(mut self, percent: f64) -> Self {
        self.cpu_bound_percent = percent.max(0.0);
        self
    }

    /// Sets the physical/logical read ratio for IO-bound classification
    pub fn with_io_bound_read_ratio(mut self, ratio: f64) -> Self {
        self.io_bound_read_ratio = ratio.max(0.0);
        self
    }

    pub fn with_unknown_duration_ms(mut self, ms: u64) -> Self {
        self.unknown_duration_ms = ms;
        self
    }

    pub fn with_large_scan_rows(mut self, rows: f64) -> Self {
        self.large_scan_rows = rows;
        self
    }

    /// Sets how many DMV candidates survive ranking
    pub fn with_dmv_top_n(mut self, n: usize) -> Self {
        self.dmv_top_n = n;
        self
    }

    /// Sets the staleness thresholds for statistics
    pub fn with_stale_stats(mut self, days: u64, modification_percent: f64) -> Self {
        self.stale_stats_days = days;
        self.stale_stats_modification_percent = modification_percent;
        self
    }

    /// Sets the thresholds at which stale statistics become HIGH
    pub fn with_critical_stats(mut self, days: u64, modification_percent: f64) -> Self {
        self.critical_stats_days = days;
        self.critical_stats_modification_percent = modification_percent;
        self
    }
}

#[cfg(test)]
mod tests;
