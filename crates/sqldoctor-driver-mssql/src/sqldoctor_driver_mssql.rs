//! SQL Server driver for SQL Doctor
//!
//! Implements [`sqldoctor_core::Connection`] over tiberius, including actual
//! (`SET STATISTICS XML`) and estimated (`SET SHOWPLAN_XML`) plan capture.

mod connection;
mod plan_capture;
mod values;

#[cfg(test)]
mod connection_tests;
#[cfg(test)]
mod plan_capture_tests;
#[cfg(test)]
mod values_tests;

pub use connection::{MssqlConnection, MssqlConnectionError};
pub use plan_capture::{SHOWPLAN_COLUMN, quote_identifier, split_plan_result_sets};
