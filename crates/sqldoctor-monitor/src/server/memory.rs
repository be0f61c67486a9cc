//! Memory pressure assessment

use serde::{Deserialize, Serialize};
use sqldoctor_core::Row;

/// Page life expectancy below which the buffer pool is under severe pressure
pub const PLE_CRITICAL_SECONDS: i64 = 300;
pub const PLE_WARNING_SECONDS: i64 = 1_000;
/// Target minus total memory above which the server wants more memory
pub const PRESSURE_GAP_MB: i64 = 1_024;
pub const WATCH_GAP_MB: i64 = 512;

/// Raw counters from the performance-counter DMV
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryCounters {
    pub server_name: String,
    pub check_timestamp: String,
    pub ple_seconds: i64,
    pub memory_grants_pending: i64,
    pub target_memory_mb: i64,
    pub total_memory_mb: i64,
    pub max_server_memory_mb: i64,
    pub buffer_pool_committed_mb: i64,
    pub buffer_pool_target_mb: i64,
}

impl MemoryCounters {
    pub fn from_row(row: &Row) -> Self {
        let int = |name: &str| row.get_i64(name).unwrap_or_default();
        Self {
            server_name: row.get_string("server_name").unwrap_or_default(),
            check_timestamp: row.get_string("check_timestamp").unwrap_or_default(),
            ple_seconds: int("ple_seconds"),
            memory_grants_pending: int("memory_grants_pending"),
            target_memory_mb: int("target_memory_mb"),
            total_memory_mb: int("total_memory_mb"),
            max_server_memory_mb: int("max_server_memory_mb"),
            buffer_pool_committed_mb: int("buffer_pool_committed_mb"),
            buffer_pool_target_mb: int("buffer_pool_target_mb"),
        }
    }
}

/// Memory counters with their statuses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub server_name: String,
    pub check_timestamp: String,
    pub ple_seconds: i64,
    pub ple_minutes: i64,
    /// OK, WARNING or CRITICAL
    pub ple_status: String,
    pub memory_grants_pending: i64,
    /// OK or CRITICAL
    pub grants_status: String,
    pub target_memory_mb: i64,
    pub total_memory_mb: i64,
    pub memory_difference_mb: i64,
    /// OK, WATCH or UNDER_PRESSURE
    pub memory_pressure_status: String,
    pub max_server_memory_mb: i64,
    pub buffer_pool_committed_mb: i64,
    pub buffer_pool_target_mb: i64,
    pub overall_assessment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryReport {
    pub memory_stats: Option<MemoryStats>,
}

pub fn assess_memory(counters: MemoryCounters) -> MemoryStats {
    let ple = counters.ple_seconds;
    let grants = counters.memory_grants_pending;
    let gap = counters.target_memory_mb - counters.total_memory_mb;

    let ple_status = if ple < PLE_CRITICAL_SECONDS {
        "CRITICAL"
    } else if ple < PLE_WARNING_SECONDS {
        "WARNING"
    } else {
        "OK"
    };
    let grants_status = if grants > 0 { "CRITICAL" } else { "OK" };
    let memory_pressure_status = if gap > PRESSURE_GAP_MB {
        "UNDER_PRESSURE"
    } else if gap > WATCH_GAP_MB {
        "WATCH"
    } else {
        "OK"
    };
    let overall_assessment = if grants > 0 {
        "CRITICAL: Queries waiting for memory!"
    } else if ple < PLE_CRITICAL_SECONDS && gap > PRESSURE_GAP_MB {
        "CRITICAL: Low PLE and memory pressure detected"
    } else if ple < PLE_CRITICAL_SECONDS {
        "WARNING: Low Page Life Expectancy"
    } else if gap > PRESSURE_GAP_MB {
        "WARNING: SQL Server wants more memory"
    } else {
        "OK: Memory appears healthy"
    };

    MemoryStats {
        server_name: counters.server_name,
        check_timestamp: counters.check_timestamp,
        ple_seconds: ple,
        ple_minutes: ple / 60,
        ple_status: ple_status.to_string(),
        memory_grants_pending: grants,
        grants_status: grants_status.to_string(),
        target_memory_mb: counters.target_memory_mb,
        total_memory_mb: counters.total_memory_mb,
        memory_difference_mb: gap,
        memory_pressure_status: memory_pressure_status.to_string(),
        max_server_memory_mb: counters.max_server_memory_mb,
        buffer_pool_committed_mb: counters.buffer_pool_committed_mb,
        buffer_pool_target_mb: counters.buffer_pool_target_mb,
        overall_assessment: overall_assessment.to_string(),
    }
}
