//! SQL Doctor Monitor - Diagnostic tools over a live SQL Server connection
//!
//! This crate provides the tool layer that sits between a `Connection` and the
//! pure analyzer:
//! - Server snapshots (version, databases, sessions, schedulers, configuration, memory)
//! - Query performance analysis with actual-plan capture
//! - Antipattern detection, index advice and statistics health checks
//! - Settings loading from TOML and the environment
//!
//! Every tool returns a [`ToolResponse`] envelope and never an `Err`.

pub mod envelope;
pub mod queries;
pub mod server;
pub mod settings;
pub mod tools;

pub use envelope::*;
pub use server::*;
pub use settings::*;
pub use tools::*;
