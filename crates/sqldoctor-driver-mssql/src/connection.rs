//! SQL Server connection implementation using tiberius

use crate::plan_capture::{
    SHOWPLAN_XML_OFF, SHOWPLAN_XML_ON, STATISTICS_XML_OFF, STATISTICS_XML_ON,
    split_plan_result_sets, use_database,
};
use crate::values::{convert_rows, values_to_tiberius_params};
use async_trait::async_trait;
use sqldoctor_core::{
    Connection, ConnectionConfig, DoctorError, PlanCapture, QueryResult, Result, Row,
    SessionGuard, Value,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

type TdsClient = Client<Compat<TcpStream>>;

/// SQL Server connection errors
#[derive(Debug, thiserror::Error)]
pub enum MssqlConnectionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MssqlConnectionError> for DoctorError {
    fn from(err: MssqlConnectionError) -> Self {
        match err {
            MssqlConnectionError::QueryFailed(message) => DoctorError::Query(message),
            MssqlConnectionError::ConnectionFailed(message) => DoctorError::Connection(message),
            other => DoctorError::Driver(other.to_string()),
        }
    }
}

fn query_failed(e: tiberius::error::Error) -> DoctorError {
    tracing::error!(error = %e, "query failed");
    MssqlConnectionError::QueryFailed(e.to_string()).into()
}

/// SQL Server connection using tiberius
pub struct MssqlConnection {
    client: Mutex<TdsClient>,
    closed: AtomicBool,
    database: Option<String>,
}

impl MssqlConnection {
    /// Connect to SQL Server with SQL authentication
    ///
    /// Without a username, Windows integrated authentication is used where
    /// the platform supports it.
    #[tracing::instrument(skip(password))]
    pub async fn connect(
        host: &str,
        port: u16,
        database: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
        trust_cert: bool,
    ) -> std::result::Result<Self, MssqlConnectionError> {
        tracing::debug!("connecting to SQL Server at {}:{}", host, port);

        let mut config = Config::new();
        config.host(host);
        config.port(port);
        config.application_name("sqldoctor");

        if let Some(db) = database {
            config.database(db);
        }

        if trust_cert {
            config.trust_cert();
        }

        config.encryption(EncryptionLevel::Required);

        match username {
            Some(user) => {
                config.authentication(AuthMethod::sql_server(user, password.unwrap_or_default()));
            }
            None => {
                #[cfg(windows)]
                {
                    config.authentication(AuthMethod::Integrated);
                }
                #[cfg(not(windows))]
                {
                    return Err(MssqlConnectionError::AuthenticationFailed(
                        "Windows authentication is only supported on Windows".to_string(),
                    ));
                }
            }
        }

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| MssqlConnectionError::ConnectionFailed(e.to_string()))?;
        tcp.set_nodelay(true)?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| MssqlConnectionError::ConnectionFailed(e.to_string()))?;

        tracing::info!(host, port, "connected to SQL Server");

        Ok(Self {
            client: Mutex::new(client),
            closed: AtomicBool::new(false),
            database: database.map(String::from),
        })
    }

    pub async fn from_config(
        config: &ConnectionConfig,
    ) -> std::result::Result<Self, MssqlConnectionError> {
        Self::connect(
            &config.host,
            config.get_port(),
            config.database.as_deref(),
            config.username.as_deref(),
            config.password.as_deref(),
            config.trust_cert,
        )
        .await
    }

    /// Initial database the connection was opened against
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn ensure_not_closed(&self) -> std::result::Result<(), MssqlConnectionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MssqlConnectionError::ConnectionClosed);
        }
        Ok(())
    }
}

/// Runs `sql` as a plain batch and converts every result set
async fn run_batch(client: &mut TdsClient, sql: &str) -> Result<Vec<Vec<Row>>> {
    let stream = client.simple_query(sql).await.map_err(query_failed)?;
    let sets = stream.into_results().await.map_err(query_failed)?;
    sets.into_iter().map(convert_rows).collect()
}

/// Runs a session `SET`/`USE` statement, logging instead of failing
async fn reset_session(client: &mut TdsClient, sql: &str) {
    if let Err(e) = run_batch(client, sql).await {
        tracing::warn!(error = %e, statement = sql, "failed to reset session option");
    }
}

#[async_trait]
impl Connection for MssqlConnection {
    fn driver_name(&self) -> &str {
        "mssql"
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.ensure_not_closed()?;
        let start = Instant::now();

        let mut client = self.client.lock().await;
        let guard = SessionGuard::new(&self.closed);

        let stream = if params.is_empty() {
            client.query(sql, &[]).await
        } else {
            let tiberius_params = values_to_tiberius_params(params);
            let param_refs: Vec<&dyn tiberius::ToSql> = tiberius_params
                .iter()
                .map(|p| p as &dyn tiberius::ToSql)
                .collect();
            client.query(sql, &param_refs[..]).await
        };

        let rows = match stream {
            Ok(stream) => stream.into_first_result().await,
            Err(e) => Err(e),
        };
        // A server-side error still leaves the stream fully consumed.
        guard.complete();
        let rows = rows.map_err(query_failed)?;
        let rows = convert_rows(rows)?;

        let execution_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            duration_ms = execution_time_ms,
            "query completed"
        );

        Ok(QueryResult {
            execution_time_ms,
            ..QueryResult::from_rows(rows)
        })
    }

    #[tracing::instrument(skip(self, sql), fields(sql_len = sql.len()))]
    async fn query_with_actual_plan(
        &self,
        sql: &str,
        database: Option<&str>,
    ) -> Result<PlanCapture> {
        self.ensure_not_closed()?;
        let start = Instant::now();

        let mut client = self.client.lock().await;
        let guard = SessionGuard::new(&self.closed);

        if let Some(db) = database {
            if let Err(e) = run_batch(&mut client, &use_database(db)).await {
                guard.complete();
                return Err(e);
            }
        }
        let outcome = match run_batch(&mut client, STATISTICS_XML_ON).await {
            Ok(_) => {
                let outcome = run_batch(&mut client, sql).await;
                reset_session(&mut client, STATISTICS_XML_OFF).await;
                outcome
            }
            Err(e) => Err(e),
        };
        if let (Some(_), Some(initial)) = (database, self.database.as_deref()) {
            reset_session(&mut client, &use_database(initial)).await;
        }
        guard.complete();

        let (rows, plan_xml) = split_plan_result_sets(outcome?);
        let execution_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            plan_captured = plan_xml.is_some(),
            duration_ms = execution_time_ms,
            "query with actual plan completed"
        );

        Ok(PlanCapture {
            result: QueryResult {
                execution_time_ms,
                ..QueryResult::from_rows(rows)
            },
            plan_xml,
        })
    }

    #[tracing::instrument(skip(self, sql), fields(sql_len = sql.len()))]
    async fn estimated_plan(&self, sql: &str) -> Result<Option<String>> {
        self.ensure_not_closed()?;

        let mut client = self.client.lock().await;
        let guard = SessionGuard::new(&self.closed);

        let outcome = match run_batch(&mut client, SHOWPLAN_XML_ON).await {
            Ok(_) => {
                let outcome = run_batch(&mut client, sql).await;
                reset_session(&mut client, SHOWPLAN_XML_OFF).await;
                outcome
            }
            Err(e) => Err(e),
        };
        guard.complete();

        let (_, plan_xml) = split_plan_result_sets(outcome?);
        tracing::debug!(plan_captured = plan_xml.is_some(), "estimated plan compiled");
        Ok(plan_xml)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!("SQL Server connection closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MssqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlConnection")
            .field("database", &self.database)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}
