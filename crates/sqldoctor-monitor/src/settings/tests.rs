//! Tests for settings loading

use super::*;
use std::collections::HashMap;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

mod toml_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = DoctorSettings::from_toml_str("").unwrap();
        assert_eq!(settings, DoctorSettings::default());
        assert_eq!(settings.query_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_sections() {
        let settings = DoctorSettings::from_toml_str(
            r#"
            query_timeout_secs = 5

            [connection]
            host = "db01"
            database = "Sales"

            [analyzer]
            dmv_top_n = 10
            stale_stats_days = 14
            "#,
        )
        .unwrap();

        assert_eq!(settings.query_timeout_secs, 5);
        assert_eq!(settings.connection.host, "db01");
        assert_eq!(settings.connection.port, 1433);
        assert_eq!(settings.connection.database.as_deref(), Some("Sales"));
        assert_eq!(settings.analyzer.dmv_top_n, 10);
        assert_eq!(settings.analyzer.stale_stats_days, 14);
        assert_eq!(settings.analyzer.cpu_bound_percent, 70.0);
    }

    #[test]
    fn test_invalid_toml() {
        let err = DoctorSettings::from_toml_str("query_timeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = DoctorSettings::load("/nonexistent/sqldoctor.toml").unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/sqldoctor.toml"));
    }
}

mod override_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_overrides_replace_file_values() {
        let settings = DoctorSettings::default()
            .with_overrides(env(&[
                (ENV_HOST, "prod-sql"),
                (ENV_PORT, "14330"),
                (ENV_USER, "doctor"),
                (ENV_PASSWORD, "s3cret"),
                (ENV_TRUST_CERT, "false"),
            ]))
            .unwrap();

        assert_eq!(settings.connection.host, "prod-sql");
        assert_eq!(settings.connection.port, 14330);
        assert_eq!(settings.connection.username.as_deref(), Some("doctor"));
        assert_eq!(settings.connection.password.as_deref(), Some("s3cret"));
        assert!(!settings.connection.trust_cert);
        assert_eq!(settings.connection.database.as_deref(), Some("master"));
    }

    #[test]
    fn test_no_overrides() {
        let settings = DoctorSettings::default().with_overrides(env(&[])).unwrap();
        assert_eq!(settings, DoctorSettings::default());
    }

    #[test]
    fn test_invalid_port() {
        let err = DoctorSettings::default()
            .with_overrides(env(&[(ENV_PORT, "sql")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for SQLDOCTOR_PORT: sql");
    }

    #[test]
    fn test_invalid_trust_cert() {
        let err = DoctorSettings::default()
            .with_overrides(env(&[(ENV_TRUST_CERT, "maybe")]))
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
    }
}
