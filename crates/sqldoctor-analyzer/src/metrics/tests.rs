//! Tests for execution metrics

use super::*;
use crate::showplan::RuntimeCounters;

fn plan_with(runtime: RuntimeCounters) -> ParsedPlan {
    ParsedPlan::new().with_runtime(runtime).with_statement_cost(12.5)
}

mod classification_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classify(cpu: u64, duration: u64, physical: u64, logical: u64) -> Option<Bottleneck> {
        classify_bottleneck(
            cpu_percentage(cpu, duration),
            duration,
            physical,
            logical,
            &AnalyzerConfig::default(),
        )
    }

    #[test]
    fn test_cpu_bound() {
        assert_eq!(cpu_percentage(71, 100), 71.0);
        assert_eq!(classify(71, 100, 0, 10), Some(Bottleneck::CpuBound));
    }

    #[test]
    fn test_exactly_seventy_percent_is_not_cpu_bound() {
        assert_eq!(classify(70, 100, 0, 10), Some(Bottleneck::MemoryBound));
    }

    #[test]
    fn test_io_bound() {
        assert_eq!(classify(10, 100, 11, 100), Some(Bottleneck::IoBound));
    }

    #[test]
    fn test_exact_read_ratio_is_memory_bound() {
        assert_eq!(classify(10, 100, 10, 100), Some(Bottleneck::MemoryBound));
    }

    #[test]
    fn test_no_reads() {
        assert_eq!(classify(0, 1001, 0, 0), Some(Bottleneck::Unknown));
        assert_eq!(classify(0, 1000, 0, 0), None);
        assert_eq!(classify(900, 1000, 0, 0), None);
    }

    #[test]
    fn test_zero_duration() {
        assert_eq!(cpu_percentage(50, 0), 0.0);
        assert_eq!(classify(50, 0, 0, 5), Some(Bottleneck::MemoryBound));
    }

    #[test]
    fn test_custom_thresholds() {
        let config = AnalyzerConfig::new().with_cpu_bound_percent(50.0);
        assert_eq!(
            classify_bottleneck(60.0, 100, 0, 10, &config),
            Some(Bottleneck::CpuBound)
        );
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&Bottleneck::IoBound).unwrap();
        assert_eq!(json, "\"IO_BOUND\"");
        assert_eq!(Bottleneck::CpuBound.to_string(), "CPU_BOUND");
    }
}

mod collection_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_absent_plan_uses_wall_clock() {
        let report = collect_metrics(250, None, 42);

        assert_eq!(
            report.metrics,
            ExecutionMetrics {
                duration_ms: 250,
                row_count: 42,
                ..Default::default()
            }
        );
        assert_eq!(report.cpu_percentage, 0.0);
        assert_eq!(report.bottleneck, None);
    }

    #[test]
    fn test_absent_plan_long_running_is_unknown() {
        let report = collect_metrics(1500, None, 0);
        assert_eq!(report.bottleneck, Some(Bottleneck::Unknown));
        assert_eq!(report.metrics.estimated_cost, 0.0);
    }

    #[test]
    fn test_counters_preferred_over_wall_clock() {
        let plan = plan_with(RuntimeCounters {
            actual_rows: 7,
            elapsed_ms: 100,
            cpu_ms: 71,
            logical_reads: 500,
            physical_reads: 3,
            read_ahead_reads: 9,
            lob_logical_reads: 1,
        });
        let report = collect_metrics(140, Some(&plan), 99);

        assert_eq!(report.metrics.duration_ms, 100);
        assert_eq!(report.metrics.cpu_time_ms, 71);
        assert_eq!(report.metrics.row_count, 7);
        assert_eq!(report.metrics.read_ahead_reads, 9);
        assert_eq!(report.metrics.estimated_cost, 12.5);
        assert_eq!(report.cpu_percentage, 71.0);
        assert_eq!(report.bottleneck, Some(Bottleneck::CpuBound));
    }

    #[test]
    fn test_zero_elapsed_counter_falls_back_to_wall_clock() {
        let plan = plan_with(RuntimeCounters {
            cpu_ms: 20,
            logical_reads: 100,
            physical_reads: 50,
            ..Default::default()
        });
        let report = collect_metrics(200, Some(&plan), 0);

        assert_eq!(report.metrics.duration_ms, 200);
        assert_eq!(report.metrics.cpu_time_ms, 20);
        assert_eq!(report.cpu_percentage, 10.0);
        assert_eq!(report.bottleneck, Some(Bottleneck::IoBound));
    }

    #[test]
    fn test_plan_without_runtime_keeps_cost() {
        let plan = ParsedPlan::new().with_statement_cost(3.0);
        let report = collect_metrics(10, Some(&plan), 5);
        assert_eq!(report.metrics.estimated_cost, 3.0);
        assert_eq!(report.metrics.row_count, 5);
        assert_eq!(report.metrics.cpu_time_ms, 0);
    }
}
