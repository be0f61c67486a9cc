//! Unit tests for server snapshots

use super::*;
use sqldoctor_core::{Row, Value};

mod info_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_server_version_from_row() {
        let row = Row::from_pairs([
            ("Version", "Microsoft SQL Server 2019 (RTM) - 15.0.2000.5"),
            ("ServerName", "TESTSERVER"),
        ]);
        let version = ServerVersion::from_row(&row);
        assert_eq!(version.server_name, "TESTSERVER");
        assert!(version.version.contains("SQL Server 2019"));
    }

    #[test]
    fn test_database_list() {
        let rows = [
            Row::from_pairs([
                ("name", Value::from("master")),
                ("database_id", Value::Int32(1)),
                ("create_date", Value::from("2021-01-01 00:00:00")),
                ("state_desc", Value::from("ONLINE")),
                ("recovery_model_desc", Value::from("SIMPLE")),
                ("compatibility_level", Value::Int16(150)),
            ]),
            Row::from_pairs([("name", Value::from("tempdb")), ("database_id", Value::Int32(2))]),
        ];
        let list = DatabaseList::new(rows.iter().map(DatabaseInfo::from_row).collect());

        assert_eq!(list.count, 2);
        assert_eq!(list.databases[0].compatibility_level, 150);
        assert_eq!(list.databases[1].name, "tempdb");
        assert_eq!(list.databases[1].state_desc, "");
    }

    #[test]
    fn test_active_session_from_row() {
        let row = Row::from_pairs([
            ("sql_text", Value::from("SELECT * FROM Orders")),
            ("session_id", Value::Int16(57)),
            ("status", Value::from("suspended")),
            ("command", Value::from("SELECT")),
            ("cpu_seconds", Value::Decimal("1.5".into())),
            ("elapsed_seconds", Value::Decimal("12.0".into())),
            ("reads", Value::Int64(100)),
            ("logical_reads", Value::Int64(5_000)),
            ("wait_time", Value::Int32(250)),
            ("last_wait_type", Value::from("LCK_M_S")),
            ("blocking_session_id", Value::Int16(52)),
            ("dop", Value::Int32(1)),
            ("host_name", Value::Null),
        ]);
        let session = ActiveSession::from_row(&row);

        assert_eq!(session.session_id, 57);
        assert_eq!(session.cpu_seconds, 1.5);
        assert_eq!(session.logical_reads, 5_000);
        assert_eq!(session.host_name, None);
        assert!(session.is_blocked());

        let sessions = ActiveSessions::new(vec![session, ActiveSession::default()]);
        assert_eq!(sessions.count, 2);
        assert_eq!(sessions.blocked().count(), 1);
    }
}

mod scheduler_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_pressure() {
        let summary = SchedulerSummary::new(8, 0.0, 0.5);
        assert_eq!(summary.total_runnable_tasks, 0);
        assert!(!summary.cpu_pressure_detected);
        assert_eq!(
            summary.interpretation,
            "No CPU pressure detected (avg runnable: 0) | Normal I/O activity (avg pending I/O: 0.50)"
        );
    }

    #[test]
    fn test_pressure() {
        let summary = SchedulerSummary::new(4, 2.75, 6.0);
        assert_eq!(summary.total_runnable_tasks, 11);
        assert!(summary.cpu_pressure_detected);
        assert!(summary.interpretation.starts_with("MODERATE CPU PRESSURE (avg runnable: 2.75)"));
        assert!(summary.interpretation.contains("HIGH I/O PRESSURE (avg pending I/O: 6.00)"));
    }

    #[test]
    fn test_bands() {
        assert!(interpret_cpu_pressure(0.5).starts_with("Minimal"));
        assert!(interpret_cpu_pressure(2.0).starts_with("MILD"));
        assert!(interpret_cpu_pressure(5.01).starts_with("CRITICAL"));
        assert!(interpret_io_pressure(1.0).starts_with("Normal"));
        assert!(interpret_io_pressure(5.0).starts_with("MODERATE"));
        assert!(interpret_io_pressure(10.5).starts_with("CRITICAL"));
    }

    #[test]
    fn test_from_row() {
        let row = Row::from_pairs([
            ("scheduler_count", Value::Int32(16)),
            ("avg_runnable_tasks", Value::Decimal("0.250000".into())),
            ("avg_pending_disk_io_count", Value::Decimal("0.000000".into())),
        ]);
        let summary = SchedulerSummary::from_row(&row);
        assert_eq!(summary.scheduler_count, 16);
        assert_eq!(summary.total_runnable_tasks, 4);
        assert!(summary.interpretation.starts_with("Minimal CPU pressure"));
    }
}

mod configuration_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn host(physical_memory_mb: i64, engine_edition: i64) -> HostInfo {
        HostInfo {
            physical_memory_mb,
            engine_edition,
            edition: "Enterprise Edition (64-bit)".to_string(),
            cpu_count: 16,
            hyperthread_ratio: 2,
        }
    }

    #[test]
    fn test_unlimited_memory() {
        let item = assess_configuration(MAX_SERVER_MEMORY, UNLIMITED_MEMORY_MB, &host(65_536, 3));
        assert_eq!(item.severity, ConfigSeverity::Critical);
        assert!(item.message.starts_with("Unlimited (default) - should be set!"));
        assert_eq!(item.recommendation.as_deref(), Some("Set max memory to: 61440 MB"));
    }

    #[test]
    fn test_unlimited_memory_standard_edition_is_capped() {
        let item = assess_configuration(MAX_SERVER_MEMORY, UNLIMITED_MEMORY_MB, &host(262_144, 2));
        assert_eq!(
            item.recommendation.as_deref(),
            Some("Set max memory to: 131072 MB (Standard Edition 128 GB limit)")
        );
    }

    #[test]
    fn test_memory_over_standard_limit() {
        let item = assess_configuration(MAX_SERVER_MEMORY, 200_000, &host(262_144, 2));
        assert_eq!(item.severity, ConfigSeverity::Critical);
        assert!(item.recommendation.unwrap().starts_with("Reduce to 131072 MB"));
    }

    #[test]
    fn test_memory_too_high_and_too_low() {
        let high = assess_configuration(MAX_SERVER_MEMORY, 62_000, &host(65_536, 3));
        assert_eq!(high.severity, ConfigSeverity::Warning);
        assert!(high.message.starts_with("Too high"));

        let low = assess_configuration(MAX_SERVER_MEMORY, 16_000, &host(65_536, 3));
        assert_eq!(low.severity, ConfigSeverity::Warning);
        assert!(low.message.starts_with("Too low"));

        let ok = assess_configuration(MAX_SERVER_MEMORY, 57_344, &host(65_536, 3));
        assert_eq!(ok.severity, ConfigSeverity::Ok);
        assert_eq!(ok.message, "Configured appropriately [Configured: 57344 MB]");
        assert_eq!(ok.recommendation, None);
    }

    #[test]
    fn test_cost_threshold() {
        let host = host(0, 3);
        let default = assess_configuration(COST_THRESHOLD, 5, &host);
        assert_eq!(default.severity, ConfigSeverity::Warning);
        assert!(default.recommendation.unwrap().contains("sp_configure"));

        assert_eq!(assess_configuration(COST_THRESHOLD, 10, &host).severity, ConfigSeverity::Consider);
        assert_eq!(assess_configuration(COST_THRESHOLD, 50, &host).severity, ConfigSeverity::Ok);
        assert!(assess_configuration(COST_THRESHOLD, 75, &host).message.starts_with("Custom tuned"));
    }

    #[test]
    fn test_max_dop() {
        let host = host(0, 3);
        assert_eq!(host.physical_cpus(), 8);

        let unlimited = assess_configuration(MAX_DOP, 0, &host);
        assert_eq!(unlimited.severity, ConfigSeverity::Warning);
        assert_eq!(
            unlimited.recommendation.as_deref(),
            Some("Recommend setting to: 8 (physical CPU count, max 8)")
        );

        assert_eq!(assess_configuration(MAX_DOP, 1, &host).severity, ConfigSeverity::Warning);
        assert_eq!(assess_configuration(MAX_DOP, 16, &host).severity, ConfigSeverity::Consider);
        assert_eq!(assess_configuration(MAX_DOP, 8, &host).severity, ConfigSeverity::Ok);
        assert_eq!(assess_configuration(MAX_DOP, 4, &host).severity, ConfigSeverity::Review);
    }

    #[test]
    fn test_rows_and_serialization() {
        let rows = [Row::from_pairs([
            ("name", Value::from(MAX_DOP)),
            ("value", Value::Int64(0)),
            ("physical_memory_mb", Value::Int64(32_768)),
            ("engine_edition", Value::Int32(3)),
            ("edition", Value::from("Developer Edition (64-bit)")),
            ("cpu_count", Value::Int32(4)),
            ("hyperthread_ratio", Value::Int32(1)),
        ])];
        let configurations = assess_configuration_rows(&rows);
        assert_eq!(configurations.configurations.len(), 1);

        let json = serde_json::to_value(&configurations).unwrap();
        assert_eq!(json["configurations"][0]["severity"], "WARNING");
        assert_eq!(json["configurations"][0]["value"], 0);
    }
}

mod memory_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn counters(ple: i64, grants: i64, target: i64, total: i64) -> MemoryCounters {
        MemoryCounters {
            server_name: "SQL01".to_string(),
            ple_seconds: ple,
            memory_grants_pending: grants,
            target_memory_mb: target,
            total_memory_mb: total,
            ..Default::default()
        }
    }

    #[test]
    fn test_healthy() {
        let stats = assess_memory(counters(4_000, 0, 8_000, 8_000));
        assert_eq!(stats.ple_minutes, 66);
        assert_eq!(stats.ple_status, "OK");
        assert_eq!(stats.grants_status, "OK");
        assert_eq!(stats.memory_pressure_status, "OK");
        assert_eq!(stats.overall_assessment, "OK: Memory appears healthy");
    }

    #[test]
    fn test_grants_pending_dominates() {
        let stats = assess_memory(counters(100, 3, 10_000, 5_000));
        assert_eq!(stats.grants_status, "CRITICAL");
        assert_eq!(stats.overall_assessment, "CRITICAL: Queries waiting for memory!");
    }

    #[test]
    fn test_low_ple_with_pressure() {
        let stats = assess_memory(counters(120, 0, 10_000, 8_000));
        assert_eq!(stats.ple_status, "CRITICAL");
        assert_eq!(stats.memory_difference_mb, 2_000);
        assert_eq!(stats.memory_pressure_status, "UNDER_PRESSURE");
        assert_eq!(stats.overall_assessment, "CRITICAL: Low PLE and memory pressure detected");
    }

    #[test]
    fn test_watch_and_warning_bands() {
        let stats = assess_memory(counters(500, 0, 8_600, 8_000));
        assert_eq!(stats.ple_status, "WARNING");
        assert_eq!(stats.memory_pressure_status, "WATCH");
        assert_eq!(stats.overall_assessment, "OK: Memory appears healthy");

        let stats = assess_memory(counters(2_000, 0, 10_000, 8_000));
        assert_eq!(stats.overall_assessment, "WARNING: SQL Server wants more memory");
    }
}
