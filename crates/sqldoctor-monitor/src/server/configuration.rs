//! Server configuration checks
//!
//! Assesses `max server memory (MB)`, `cost threshold for parallelism` and
//! `max degree of parallelism` against the host the instance runs on.

use serde::{Deserialize, Serialize};
use sqldoctor_core::Row;

/// `max server memory` value meaning "unlimited"
pub const UNLIMITED_MEMORY_MB: i64 = 2_147_483_647;
/// Buffer pool cap of Standard Edition
pub const STANDARD_EDITION_MEMORY_MB: i64 = 131_072;
/// Memory left to the OS in the suggested `max server memory`
pub const OS_RESERVE_MB: i64 = 4_096;
/// `SERVERPROPERTY('EngineEdition')` for Standard Edition
pub const ENGINE_EDITION_STANDARD: i64 = 2;

pub const MAX_SERVER_MEMORY: &str = "max server memory (MB)";
pub const COST_THRESHOLD: &str = "cost threshold for parallelism";
pub const MAX_DOP: &str = "max degree of parallelism";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigSeverity {
    Ok,
    Warning,
    Critical,
    Review,
    Consider,
}

impl ConfigSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Review => "REVIEW",
            Self::Consider => "CONSIDER",
        }
    }
}

impl std::fmt::Display for ConfigSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One assessed setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub name: String,
    pub value: i64,
    pub severity: ConfigSeverity,
    pub message: String,
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfigurations {
    pub configurations: Vec<ConfigItem>,
}

/// Host facts the assessment depends on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub physical_memory_mb: i64,
    pub engine_edition: i64,
    pub edition: String,
    pub cpu_count: i64,
    pub hyperthread_ratio: i64,
}

impl HostInfo {
    pub fn from_row(row: &Row) -> Self {
        Self {
            physical_memory_mb: row.get_i64("physical_memory_mb").unwrap_or_default(),
            engine_edition: row.get_i64("engine_edition").unwrap_or_default(),
            edition: row.get_string("edition").unwrap_or_default(),
            cpu_count: row.get_i64("cpu_count").unwrap_or_default(),
            hyperthread_ratio: row.get_i64("hyperthread_ratio").unwrap_or(1),
        }
    }

    pub fn is_standard_edition(&self) -> bool {
        self.engine_edition == ENGINE_EDITION_STANDARD
    }

    /// Physical cores, `cpu_count / hyperthread_ratio`
    pub fn physical_cpus(&self) -> i64 {
        if self.hyperthread_ratio > 0 {
            self.cpu_count / self.hyperthread_ratio
        } else {
            self.cpu_count
        }
    }
}

/// Assesses one configuration row
pub fn assess_configuration(name: &str, value: i64, host: &HostInfo) -> ConfigItem {
    let (severity, message, recommendation) = match name {
        MAX_SERVER_MEMORY => assess_max_server_memory(value, host),
        COST_THRESHOLD => assess_cost_threshold(value),
        MAX_DOP => assess_max_dop(value, host),
        _ => (
            ConfigSeverity::Review,
            format!("No built-in assessment [Current: {}]", value),
            None,
        ),
    };
    ConfigItem {
        name: name.to_string(),
        value,
        severity,
        message,
        recommendation,
    }
}

/// Assesses every row of the configuration query, in row order
pub fn assess_configuration_rows(rows: &[Row]) -> ServerConfigurations {
    let configurations = rows
        .iter()
        .filter_map(|row| {
            let name = row.get_string("name")?;
            let value = row.get_i64("value").unwrap_or_default();
            Some(assess_configuration(&name, value, &HostInfo::from_row(row)))
        })
        .collect();
    ServerConfigurations { configurations }
}

type Assessment = (ConfigSeverity, String, Option<String>);

fn assess_max_server_memory(value: i64, host: &HostInfo) -> Assessment {
    let physical = host.physical_memory_mb;
    let standard = host.is_standard_edition();
    let edition_cap = if standard { STANDARD_EDITION_MEMORY_MB } else { i64::MAX };
    let too_high = value as f64 > physical as f64 * 0.9;
    let too_low = (value as f64) < physical as f64 * 0.5 && value < edition_cap;

    if value == UNLIMITED_MEMORY_MB {
        let suggested = if standard {
            format!(
                "Set max memory to: {} MB (Standard Edition 128 GB limit)",
                STANDARD_EDITION_MEMORY_MB.min(physical - OS_RESERVE_MB)
            )
        } else {
            format!("Set max memory to: {} MB", physical - OS_RESERVE_MB)
        };
        return (
            ConfigSeverity::Critical,
            format!(
                "Unlimited (default) - should be set! [Server Memory: {} MB, Edition: {}]",
                physical, host.edition
            ),
            Some(suggested),
        );
    }
    if standard && value > STANDARD_EDITION_MEMORY_MB {
        return (
            ConfigSeverity::Critical,
            format!(
                "Exceeds Standard Edition 128 GB limit! [Configured: {} MB, Limit: {} MB]",
                value, STANDARD_EDITION_MEMORY_MB
            ),
            Some("Reduce to 131072 MB (128 GB - Standard Edition limit)".to_string()),
        );
    }

    // At the Standard cap the message wins over the ratio checks, the severity does not.
    let severity = if too_high || too_low {
        ConfigSeverity::Warning
    } else {
        ConfigSeverity::Ok
    };
    let message = if standard && value == STANDARD_EDITION_MEMORY_MB {
        format!("At Standard Edition limit [Configured: {} MB]", value)
    } else if too_high {
        format!(
            "Too high - leave memory for OS [Configured: {} MB, Server Total: {} MB]",
            value, physical
        )
    } else if too_low {
        format!(
            "Too low - SQL Server artificially limited [Configured: {} MB, Server Total: {} MB]",
            value, physical
        )
    } else {
        format!("Configured appropriately [Configured: {} MB]", value)
    };
    (severity, message, None)
}

fn assess_cost_threshold(value: i64) -> Assessment {
    match value {
        5 => (
            ConfigSeverity::Warning,
            format!("Default value too low for modern servers [Current: {}]", value),
            Some(
                "Recommend setting to 50: EXEC sp_configure 'cost threshold for parallelism', 50; RECONFIGURE;"
                    .to_string(),
            ),
        ),
        v if v < 25 => (
            ConfigSeverity::Consider,
            format!(
                "Consider increasing to 25-50 to reduce excessive parallelism [Current: {}]",
                v
            ),
            None,
        ),
        25..=50 => (
            ConfigSeverity::Ok,
            format!("Good starting point [Current: {}]", value),
            None,
        ),
        v => (
            ConfigSeverity::Ok,
            format!("Custom tuned [Current: {}]", v),
            None,
        ),
    }
}

fn assess_max_dop(value: i64, host: &HostInfo) -> Assessment {
    let physical = host.physical_cpus();
    match value {
        0 => (
            ConfigSeverity::Warning,
            format!(
                "Unlimited parallelism can cause CXPACKET waits [CPUs: {}, Physical: {}]",
                host.cpu_count, physical
            ),
            Some(format!(
                "Recommend setting to: {} (physical CPU count, max 8)",
                physical.min(8)
            )),
        ),
        1 => (
            ConfigSeverity::Warning,
            format!(
                "Parallelism disabled - multi-core not utilized [CPUs: {}]",
                host.cpu_count
            ),
            None,
        ),
        v if v > 8 => (
            ConfigSeverity::Consider,
            format!(
                "Values > 8 rarely help, often hurt [Current: {}, CPUs: {}]",
                v, host.cpu_count
            ),
            None,
        ),
        v if v == physical => (
            ConfigSeverity::Ok,
            format!(
                "Set to physical CPU count [Current: {}, Physical CPUs: {}]",
                v, physical
            ),
            None,
        ),
        v => (
            ConfigSeverity::Review,
            format!(
                "Check if optimal for workload [Current: {}, CPUs: {}, Physical: {}]",
                v, host.cpu_count, physical
            ),
            None,
        ),
    }
}
