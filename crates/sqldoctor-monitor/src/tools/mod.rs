//! Diagnostic tools
//!
//! [`DoctorTools`] binds a connection to the analyzer. Every public tool
//! method returns a [`ToolResponse`]: transport errors, timeouts and invalid
//! input become failure envelopes, never `Err`.

mod analysis;
mod snapshots;


pub use analysis::*;

use crate::envelope::ToolResponse;
use crate::settings::DoctorSettings;
use sqldoctor_analyzer::AnalyzerConfig;
use sqldoctor_core::{
    Connection, DiagnosticSink, DoctorError, Result, Row, TracingSink, Value,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single server round trip
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Message used when a snapshot query returns no rows
pub const NO_RESULTS: &str = "No results returned from query";

/// Message used when the connection can no longer be used
pub const CONNECTION_CLOSED: &str = "connection is closed; reconnect to continue";

/// Diagnostic tools over one connection
pub struct DoctorTools {
    conn: Arc<dyn Connection>,
    sink: Arc<dyn DiagnosticSink>,
    config: AnalyzerConfig,
    query_timeout: Duration,
}

impl DoctorTools {
    /// Creates tools with default thresholds, logging through `tracing`
    pub fn new(conn: Arc<dyn Connection>) -> Self {
        Self {
            conn,
            sink: Arc::new(TracingSink),
            config: AnalyzerConfig::default(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn from_settings(conn: Arc<dyn Connection>, settings: &DoctorSettings) -> Self {
        Self::new(conn)
            .with_config(settings.analyzer.clone())
            .with_query_timeout(settings.query_timeout())
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub fn connection(&self) -> &dyn Connection {
        self.conn.as_ref()
    }

    pub(crate) fn sink(&self) -> &dyn DiagnosticSink {
        self.sink.as_ref()
    }

    /// Runs `operation` under the query timeout
    ///
    /// A connection left closed by an earlier interrupted exchange is
    /// reported without running `operation`.
    pub(crate) async fn bounded<T, F>(&self, what: &str, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.conn.is_closed() {
            return Err(DoctorError::Connection(CONNECTION_CLOSED.to_string()));
        }
        match tokio::time::timeout(self.query_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(DoctorError::Timeout(format!(
                "{} did not complete within {}s",
                what,
                self.query_timeout.as_secs_f64()
            ))),
        }
    }

    pub(crate) async fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let result = self.bounded("query", self.conn.query(sql, params)).await?;
        tracing::debug!(rows = result.rows.len(), "diagnostic query returned");
        Ok(result.rows)
    }

    pub(crate) async fn fetch_first(&self, sql: &str) -> Result<Row> {
        self.fetch_rows(sql, &[])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::Other(NO_RESULTS.to_string()))
    }
}

/// Converts a tool outcome into its envelope, logging failures
pub(crate) fn respond<T: Default>(tool: &str, result: Result<T>) -> ToolResponse<T> {
    if let Err(e) = &result {
        tracing::error!(tool, error = %e, "tool failed");
    }
    ToolResponse::from(result)
}
