//! Tests for connections

use super::*;
use pretty_assertions::assert_eq;
use crate::Row;

struct RowsOnly;

#[async_trait]
impl Connection for RowsOnly {
    fn driver_name(&self) -> &str {
        "rows-only"
    }

    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
        Ok(QueryResult::from_rows(vec![Row::from_pairs([("n", 1i64)])]))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn test_default_plan_capture_has_no_plan() {
    let conn = RowsOnly;
    let capture = conn
        .query_with_actual_plan("SELECT 1", Some("master"))
        .await
        .unwrap();
    assert_eq!(capture.result.row_count(), 1);
    assert!(capture.plan_xml.is_none());
    assert!(conn.estimated_plan("SELECT 1").await.unwrap().is_none());
}

#[test]
fn test_config_port_defaults() {
    let config = ConnectionConfig::new("db01").with_port(0);
    assert_eq!(config.get_port(), DEFAULT_PORT);
    assert_eq!(config.get_string("host"), Some("db01".to_string()));
    assert_eq!(config.get_string("database"), Some("master".to_string()));
}

#[test]
fn test_config_params_shadow_fields() {
    let config = ConnectionConfig::new("db01")
        .with_credentials("sa", "secret")
        .with_param("user", "monitor");
    assert_eq!(config.get_string("user"), Some("monitor".to_string()));
    assert_eq!(config.get_string("username"), Some("sa".to_string()));
}

mod session_guard_tests {
    use super::*;

    #[test]
    fn test_completed_exchange_keeps_connection_open() {
        let closed = AtomicBool::new(false);
        let guard = SessionGuard::new(&closed);
        guard.complete();
        assert!(!closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_interrupted_exchange_closes_connection() {
        let closed = AtomicBool::new(false);
        {
            let _guard = SessionGuard::new(&closed);
        }
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_future_closes_connection() {
        let closed = AtomicBool::new(false);
        let exchange = async {
            let guard = SessionGuard::new(&closed);
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
            guard.complete();
        };

        let outcome = tokio::time::timeout(std::time::Duration::from_secs(1), exchange).await;
        assert!(outcome.is_err());
        assert!(closed.load(Ordering::SeqCst));
    }
}
