//! ShowPlan Module
//!
//! Typed model and parser for SQL Server ShowPlan XML documents.

pub mod parser;
pub mod plan;

pub use parser::{SHOWPLAN_NAMESPACE, parse_document, parse_showplan};
pub use plan::{
    MissingIndexHint, NoDataReason, ParallelismInfo, ParsedPlan, PlanOperator, PlanParse,
    PlanWarning, RuntimeCounters, WarningKind, qualified_table_name, strip_identifier_decoration,
};
