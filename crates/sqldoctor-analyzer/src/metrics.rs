//! Execution metrics and bottleneck classification
//!
//! Combines the wall-clock time measured around a query with the runtime
//! counters of its actual plan. Counter-based values win whenever the plan
//! supplies them.

use crate::config::AnalyzerConfig;
use crate::showplan::ParsedPlan;
use serde::{Deserialize, Serialize};

/// Dominant resource constraint inferred for one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bottleneck {
    CpuBound,
    IoBound,
    MemoryBound,
    Unknown,
}

impl Bottleneck {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CpuBound => "CPU_BOUND",
            Self::IoBound => "IO_BOUND",
            Self::MemoryBound => "MEMORY_BOUND",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Short guidance for the classification
    pub fn description(&self) -> &'static str {
        match self {
            Self::CpuBound => {
                "Most of the elapsed time was spent on CPU; look for scalar functions, implicit conversions and large sorts or hashes"
            }
            Self::IoBound => {
                "A large share of reads came from disk; check missing indexes and buffer pool pressure"
            }
            Self::MemoryBound => {
                "Reads were served from cache but time was not spent on CPU; check waits, blocking and memory grants"
            }
            Self::Unknown => {
                "The query ran long without reporting reads; runtime counters were unavailable"
            }
        }
    }
}

impl std::fmt::Display for Bottleneck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource usage of a single execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    pub duration_ms: u64,
    pub cpu_time_ms: u64,
    pub logical_reads: u64,
    pub physical_reads: u64,
    pub read_ahead_reads: u64,
    pub lob_logical_reads: u64,
    pub row_count: u64,
    /// Optimizer's estimated statement cost
    pub estimated_cost: f64,
}

/// Metrics plus the derived classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub metrics: ExecutionMetrics,
    pub cpu_percentage: f64,
    pub bottleneck: Option<Bottleneck>,
}

/// Collects execution metrics using the default thresholds
pub fn collect_metrics(
    wall_clock_ms: u64,
    plan: Option<&ParsedPlan>,
    rows_returned: u64,
) -> MetricsReport {
    collect_metrics_with_config(wall_clock_ms, plan, rows_returned, &AnalyzerConfig::default())
}

/// Collects execution metrics
///
/// `wall_clock_ms` is always available and is used when the plan carries no
/// usable elapsed counter. `rows_returned` is the fallback row count.
pub fn collect_metrics_with_config(
    wall_clock_ms: u64,
    plan: Option<&ParsedPlan>,
    rows_returned: u64,
    config: &AnalyzerConfig,
) -> MetricsReport {
    let runtime = plan.and_then(|p| p.runtime);

    let duration_ms = match runtime {
        Some(counters) if counters.elapsed_ms > 0 => counters.elapsed_ms,
        _ => wall_clock_ms,
    };

    let metrics = ExecutionMetrics {
        duration_ms,
        cpu_time_ms: runtime.map(|c| c.cpu_ms).unwrap_or(0),
        logical_reads: runtime.map(|c| c.logical_reads).unwrap_or(0),
        physical_reads: runtime.map(|c| c.physical_reads).unwrap_or(0),
        read_ahead_reads: runtime.map(|c| c.read_ahead_reads).unwrap_or(0),
        lob_logical_reads: runtime.map(|c| c.lob_logical_reads).unwrap_or(0),
        row_count: runtime.map(|c| c.actual_rows).unwrap_or(rows_returned),
        estimated_cost: plan.map(|p| p.statement_cost).unwrap_or(0.0),
    };

    let cpu_percentage = cpu_percentage(metrics.cpu_time_ms, metrics.duration_ms);
    let bottleneck = classify_bottleneck(
        cpu_percentage,
        metrics.duration_ms,
        metrics.physical_reads,
        metrics.logical_reads,
        config,
    );

    MetricsReport {
        metrics,
        cpu_percentage,
        bottleneck,
    }
}

/// CPU time as a percentage of duration, 0 when duration is 0
pub fn cpu_percentage(cpu_time_ms: u64, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        0.0
    } else {
        cpu_time_ms as f64 / duration_ms as f64 * 100.0
    }
}

/// Classifies the dominant bottleneck
///
/// Reads drive the classification; without them only a long duration is
/// reported, as [`Bottleneck::Unknown`].
pub fn classify_bottleneck(
    cpu_percentage: f64,
    duration_ms: u64,
    physical_reads: u64,
    logical_reads: u64,
    config: &AnalyzerConfig,
) -> Option<Bottleneck> {
    if logical_reads > 0 {
        if cpu_percentage > config.cpu_bound_percent {
            Some(Bottleneck::CpuBound)
        } else if physical_reads as f64 > config.io_bound_read_ratio * logical_reads as f64 {
            Some(Bottleneck::IoBound)
        } else {
            Some(Bottleneck::MemoryBound)
        }
    } else if duration_ms > config.unknown_duration_ms {
        Some(Bottleneck::Unknown)
    } else {
        None
    }
}

#[cfg(test)]
mod tests;
