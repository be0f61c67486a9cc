//! Connection trait and connection configuration

use crate::{QueryResult, Result, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default SQL Server port
pub const DEFAULT_PORT: u16 = 1433;

/// Rows returned by a query executed with actual-plan capture enabled
#[derive(Debug, Clone)]
pub struct PlanCapture {
    /// The query's own result rows
    pub result: QueryResult,
    /// ShowPlan XML emitted by the server, when it produced one
    pub plan_xml: Option<String>,
}

impl PlanCapture {
    /// Wrap a result that came back without a plan
    pub fn without_plan(result: QueryResult) -> Self {
        Self {
            result,
            plan_xml: None,
        }
    }
}

/// Marks a connection closed unless [`SessionGuard::complete`] is reached
///
/// Held by drivers across exchanges that change session state or leave a
/// result stream open. If the future is dropped part-way through, for
/// example by a caller-side timeout, the session is in an unknown state and
/// the connection refuses further work.
#[must_use = "dropping the guard immediately marks the connection closed"]
pub struct SessionGuard<'a> {
    closed: &'a AtomicBool,
    completed: bool,
}

impl<'a> SessionGuard<'a> {
    pub fn new(closed: &'a AtomicBool) -> Self {
        Self {
            closed,
            completed: false,
        }
    }

    /// The exchange finished and the session is back in its initial state
    pub fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.closed.store(true, Ordering::SeqCst);
            tracing::warn!("exchange interrupted; connection marked closed");
        }
    }
}

/// A database connection
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "mssql")
    fn driver_name(&self) -> &str;

    /// Execute a query that returns rows
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Execute a query and capture the actual execution plan alongside its rows.
    ///
    /// When `database` is given the query runs in that database's context.
    /// Drivers that cannot capture plans fall back to a plain query.
    async fn query_with_actual_plan(
        &self,
        sql: &str,
        database: Option<&str>,
    ) -> Result<PlanCapture> {
        let _ = database;
        let result = self.query(sql, &[]).await?;
        Ok(PlanCapture::without_plan(result))
    }

    /// Compile a query without executing it and return the estimated plan XML
    async fn estimated_plan(&self, sql: &str) -> Result<Option<String>> {
        let _ = sql;
        Ok(None)
    }

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Host address
    pub host: String,
    /// Port number (0 for default)
    pub port: u16,
    /// Initial database
    pub database: Option<String>,
    /// Username for SQL authentication
    pub username: Option<String>,
    /// Password for SQL authentication
    pub password: Option<String>,
    /// Accept the server certificate without validation
    pub trust_cert: bool,
    /// Additional connection parameters
    pub params: HashMap<String, String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            database: Some("master".to_string()),
            username: None,
            password: None,
            trust_cert: true,
            params: HashMap::new(),
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration for the given host
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_trust_cert(mut self, trust: bool) -> Self {
        self.trust_cert = trust;
        self
    }

    /// Set a connection parameter
    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Get a string parameter, falling back to the known fields
    pub fn get_string(&self, key: &str) -> Option<String> {
        if let Some(val) = self.params.get(key) {
            return Some(val.clone());
        }
        match key {
            "host" => Some(self.host.clone()),
            "database" => self.database.clone(),
            "username" | "user" => self.username.clone(),
            "password" => self.password.clone(),
            _ => None,
        }
    }

    /// Get the effective port
    pub fn get_port(&self) -> u16 {
        if self.port > 0 { self.port } else { DEFAULT_PORT }
    }
}

#[cfg(test)]
mod tests;
