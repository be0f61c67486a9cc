//! SQL Doctor Core - Core abstractions shared by the analyzer, tools and drivers
//!
//! This crate provides the fundamental traits and types that all other
//! SQL Doctor crates depend on. It defines:
//!
//! - `Connection` - The query-execution capability implemented by drivers
//! - `DiagnosticSink` - Injected receiver for warning/info signals
//! - Common types like `Value`, `Row`, `QueryResult`, etc.

mod connection;
mod diagnostics;
mod error;
mod types;

pub use connection::*;
pub use diagnostics::*;
pub use error::*;
pub use types::*;
