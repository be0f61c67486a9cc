//! Instance, database and session listings

use serde::{Deserialize, Serialize};
use sqldoctor_core::Row;

/// `@@VERSION` and `@@SERVERNAME`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerVersion {
    pub version: String,
    pub server_name: String,
}

impl ServerVersion {
    pub fn from_row(row: &Row) -> Self {
        Self {
            version: row.get_string("Version").unwrap_or_default(),
            server_name: row.get_string("ServerName").unwrap_or_default(),
        }
    }
}

/// A database on the instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub database_id: i64,
    pub create_date: String,
    /// e.g. ONLINE, OFFLINE
    pub state_desc: String,
    /// SIMPLE, FULL or BULK_LOGGED
    pub recovery_model_desc: String,
    pub compatibility_level: i64,
}

impl DatabaseInfo {
    pub fn from_row(row: &Row) -> Self {
        Self {
            name: row.get_string("name").unwrap_or_default(),
            database_id: row.get_i64("database_id").unwrap_or_default(),
            create_date: row.get_string("create_date").unwrap_or_default(),
            state_desc: row.get_string("state_desc").unwrap_or_default(),
            recovery_model_desc: row.get_string("recovery_model_desc").unwrap_or_default(),
            compatibility_level: row.get_i64("compatibility_level").unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseList {
    pub databases: Vec<DatabaseInfo>,
    pub count: usize,
}

impl DatabaseList {
    pub fn new(databases: Vec<DatabaseInfo>) -> Self {
        Self {
            count: databases.len(),
            databases,
        }
    }
}

/// An executing request and the session that owns it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveSession {
    pub sql_text: String,
    pub session_id: i64,
    /// running, suspended, ...
    pub status: String,
    pub command: String,
    pub cpu_seconds: f64,
    pub elapsed_seconds: f64,
    pub reads: u64,
    pub logical_reads: u64,
    /// Current wait, in milliseconds
    pub wait_time: u64,
    pub last_wait_type: Option<String>,
    /// Zero or absent when the request is not blocked
    pub blocking_session_id: Option<i64>,
    pub connect_time: Option<String>,
    pub dop: u64,
    pub host_name: Option<String>,
    pub program_name: Option<String>,
    pub database_name: Option<String>,
    pub login_name: Option<String>,
}

impl ActiveSession {
    pub fn from_row(row: &Row) -> Self {
        Self {
            sql_text: row.get_string("sql_text").unwrap_or_default(),
            session_id: row.get_i64("session_id").unwrap_or_default(),
            status: row.get_string("status").unwrap_or_default(),
            command: row.get_string("command").unwrap_or_default(),
            cpu_seconds: row.get_f64("cpu_seconds").unwrap_or_default(),
            elapsed_seconds: row.get_f64("elapsed_seconds").unwrap_or_default(),
            reads: row.get_u64("reads"),
            logical_reads: row.get_u64("logical_reads"),
            wait_time: row.get_u64("wait_time"),
            last_wait_type: row.get_string("last_wait_type"),
            blocking_session_id: row.get_i64("blocking_session_id"),
            connect_time: row.get_string("connect_time"),
            dop: row.get_u64("dop"),
            host_name: row.get_string("host_name"),
            program_name: row.get_string("program_name"),
            database_name: row.get_string("database_name"),
            login_name: row.get_string("login_name"),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.blocking_session_id.is_some_and(|id| id > 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveSessions {
    pub sessions: Vec<ActiveSession>,
    pub count: usize,
}

impl ActiveSessions {
    pub fn new(sessions: Vec<ActiveSession>) -> Self {
        Self {
            count: sessions.len(),
            sessions,
        }
    }

    /// Sessions waiting on another session
    pub fn blocked(&self) -> impl Iterator<Item = &ActiveSession> {
        self.sessions.iter().filter(|s| s.is_blocked())
    }
}
