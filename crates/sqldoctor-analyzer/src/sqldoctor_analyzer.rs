//! SQL Doctor Analyzer - Diagnostic analysis engine for SQL Server telemetry
//!
//! This crate turns raw telemetry into structured, prioritized findings:
//! - Parsing ShowPlan XML into a typed plan (`showplan`)
//! - Execution metrics and bottleneck classification (`metrics`)
//! - Query antipattern detection and complexity scoring (`antipatterns`)
//! - Missing-index recommendations and index usage advice (`indexes`)
//! - Statistics freshness assessment (`statistics`)
//!
//! Every entry point is a synchronous, pure function of its inputs. Soft
//! warnings are reported through an injected [`sqldoctor_core::DiagnosticSink`].

pub mod antipatterns;
pub mod config;
pub mod indexes;
pub mod metrics;
pub mod showplan;
pub mod statistics;

pub use antipatterns::*;
pub use config::AnalyzerConfig;
pub use indexes::*;
pub use metrics::*;
pub use showplan::*;
pub use statistics::*;
