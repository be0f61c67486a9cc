//! Scheduler queue depth

use serde::{Deserialize, Serialize};
use sqldoctor_core::Row;

/// Aggregated scheduler load
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSummary {
    /// Typically the number of logical CPUs
    pub scheduler_count: u64,
    /// `floor(avg_runnable × scheduler_count)`
    pub total_runnable_tasks: u64,
    pub avg_runnable_per_scheduler: f64,
    pub avg_pending_disk_io: f64,
    pub cpu_pressure_detected: bool,
    pub interpretation: String,
}

impl SchedulerSummary {
    pub fn from_row(row: &Row) -> Self {
        Self::new(
            row.get_u64("scheduler_count"),
            row.get_f64("avg_runnable_tasks").unwrap_or_default(),
            row.get_f64("avg_pending_disk_io_count").unwrap_or_default(),
        )
    }

    pub fn new(scheduler_count: u64, avg_runnable: f64, avg_pending_io: f64) -> Self {
        let avg_runnable = avg_runnable.max(0.0);
        let avg_pending_io = avg_pending_io.max(0.0);
        Self {
            scheduler_count,
            total_runnable_tasks: (avg_runnable * scheduler_count as f64).floor() as u64,
            avg_runnable_per_scheduler: avg_runnable,
            avg_pending_disk_io: avg_pending_io,
            cpu_pressure_detected: avg_runnable > 0.0,
            interpretation: format!(
                "{} | {}",
                interpret_cpu_pressure(avg_runnable),
                interpret_io_pressure(avg_pending_io)
            ),
        }
    }
}

/// Reads the average runnable tasks per scheduler
pub fn interpret_cpu_pressure(avg_runnable: f64) -> String {
    if avg_runnable == 0.0 {
        "No CPU pressure detected (avg runnable: 0)".to_string()
    } else if avg_runnable <= 0.5 {
        format!("Minimal CPU pressure (avg runnable: {:.2})", avg_runnable)
    } else if avg_runnable <= 2.0 {
        format!("MILD CPU PRESSURE (avg runnable: {:.2})", avg_runnable)
    } else if avg_runnable <= 5.0 {
        format!(
            "MODERATE CPU PRESSURE (avg runnable: {:.2}) - Consider query optimization",
            avg_runnable
        )
    } else {
        format!(
            "CRITICAL CPU PRESSURE (avg runnable: {:.2}) - Immediate action needed!",
            avg_runnable
        )
    }
}

/// Reads the average pending disk IO per scheduler
pub fn interpret_io_pressure(avg_pending_io: f64) -> String {
    if avg_pending_io <= 1.0 {
        format!("Normal I/O activity (avg pending I/O: {:.2})", avg_pending_io)
    } else if avg_pending_io <= 5.0 {
        format!("MODERATE I/O PRESSURE (avg pending I/O: {:.2})", avg_pending_io)
    } else if avg_pending_io <= 10.0 {
        format!(
            "HIGH I/O PRESSURE (avg pending I/O: {:.2}) - Check disk performance",
            avg_pending_io
        )
    } else {
        format!(
            "CRITICAL I/O BOTTLENECK (avg pending I/O: {:.2}) - Check disk subsystem immediately!",
            avg_pending_io
        )
    }
}
