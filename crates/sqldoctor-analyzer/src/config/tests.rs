//! Tests for analyzer configuration

use super::*;

#[test]
fn test_defaults_match_documented_thresholds() {
    let config = AnalyzerConfig::default();
    assert_eq!(config.cpu_bound_percent, 70.0);
    assert_eq!(config.io_bound_read_ratio, 0.1);
    assert_eq!(config.unknown_duration_ms, 1_000);
    assert_eq!(config.dmv_top_n, 20);
    assert_eq!(config.never_updated_days, 9_999);
}

#[test]
fn test_builder() {
    let config = AnalyzerConfig::new()
        .with_cpu_bound_percent(-5.0)
        .with_dmv_top_n(5)
        .with_stale_stats(7, 10.0)
        .with_critical_stats(14, 25.0);

    assert_eq!(config.cpu_bound_percent, 0.0);
    assert_eq!(config.dmv_top_n, 5);
    assert_eq!(config.stale_stats_days, 7);
    assert_eq!(config.critical_stats_modification_percent, 25.0);
}

#[test]
fn test_partial_deserialization_keeps_defaults() {
    let config: AnalyzerConfig =
        serde_json::from_str(r#"{"cpu_bound_percent": 80.0}"#).unwrap();
    assert_eq!(config.cpu_bound_percent, 80.0);
    assert_eq!(config.large_scan_rows, 10_000.0);
}
