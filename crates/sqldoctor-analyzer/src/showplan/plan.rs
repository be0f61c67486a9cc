//! Parsed Plan Model - Typed view of a ShowPlan XML document
//!
//! Only the parts of the plan that feed the analyzer are kept: runtime
//! counters, plan warnings, costed operators, parallelism and the optimizer's
//! missing-index hints.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of parsing a plan document
///
/// A missing or unusable document is a valid outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PlanParse {
    /// The document was parsed
    Parsed(ParsedPlan),
    /// No usable plan was available
    NoData(NoDataReason),
}

impl PlanParse {
    /// Returns the parsed plan, if any
    pub fn plan(&self) -> Option<&ParsedPlan> {
        match self {
            Self::Parsed(plan) => Some(plan),
            Self::NoData(_) => None,
        }
    }

    /// Consumes the result, returning the parsed plan if any
    pub fn into_plan(self) -> Option<ParsedPlan> {
        match self {
            Self::Parsed(plan) => Some(plan),
            Self::NoData(_) => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    /// Returns why no plan is available, if that is the case
    pub fn no_data_reason(&self) -> Option<&NoDataReason> {
        match self {
            Self::Parsed(_) => None,
            Self::NoData(reason) => Some(reason),
        }
    }
}

/// Why a plan document produced no data
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", content = "message", rename_all = "snake_case")]
pub enum NoDataReason {
    #[error("No plan document supplied")]
    Absent,

    #[error("Malformed plan XML: {0}")]
    Malformed(String),

    #[error("Unexpected root element <{0}>, expected <ShowPlanXML>")]
    UnexpectedRoot(String),

    #[error("Root element is not in the ShowPlan namespace")]
    MissingNamespace,
}

/// Typed intermediate form of a ShowPlan document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedPlan {
    /// Actual execution counters (only present in actual plans)
    pub runtime: Option<RuntimeCounters>,
    /// Warnings raised by the optimizer or the executor
    pub warnings: Vec<PlanWarning>,
    /// Physical operators in document order (root first)
    pub operators: Vec<PlanOperator>,
    pub parallelism: ParallelismInfo,
    /// Optimizer missing-index hints
    pub missing_indexes: Vec<MissingIndexHint>,
    /// Estimated cost of the first statement, 0 if absent
    pub statement_cost: f64,
}

impl ParsedPlan {
    /// Creates an empty plan
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runtime(mut self, runtime: RuntimeCounters) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_warning(mut self, warning: PlanWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    pub fn with_operator(mut self, operator: PlanOperator) -> Self {
        self.operators.push(operator);
        self
    }

    pub fn with_missing_index(mut self, hint: MissingIndexHint) -> Self {
        self.missing_indexes.push(hint);
        self
    }

    pub fn with_statement_cost(mut self, cost: f64) -> Self {
        self.statement_cost = cost;
        self
    }

    /// Returns true if actual runtime counters are available
    pub fn has_runtime(&self) -> bool {
        self.runtime.is_some()
    }

    /// Returns all scan-classified operators
    pub fn scan_operators(&self) -> impl Iterator<Item = &PlanOperator> {
        self.operators.iter().filter(|op| op.is_scan())
    }

    /// Returns the warnings about columns without statistics
    pub fn columns_without_statistics(&self) -> impl Iterator<Item = &PlanWarning> {
        self.warnings
            .iter()
            .filter(|w| w.kind == WarningKind::ColumnsWithNoStatistics)
    }

    /// Returns the distinct tables touched by operators, in first-seen order
    pub fn tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = Vec::new();
        for table in self.operators.iter().filter_map(|op| op.table.as_ref()) {
            if !tables.iter().any(|t| t.eq_ignore_ascii_case(table)) {
                tables.push(table.clone());
            }
        }
        tables
    }
}

/// Actual execution counters aggregated over the plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeCounters {
    /// Rows produced by the root operator
    pub actual_rows: u64,
    pub elapsed_ms: u64,
    pub cpu_ms: u64,
    pub logical_reads: u64,
    pub physical_reads: u64,
    pub read_ahead_reads: u64,
    pub lob_logical_reads: u64,
}

/// Category of a plan warning
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    ColumnsWithNoStatistics,
    SpillToTempDb,
    NoJoinPredicate,
    PlanAffectingConvert,
    MemoryGrant,
    /// Any other warning element, by element name
    Other(String),
}

impl WarningKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ColumnsWithNoStatistics => "ColumnsWithNoStatistics",
            Self::SpillToTempDb => "SpillToTempDb",
            Self::NoJoinPredicate => "NoJoinPredicate",
            Self::PlanAffectingConvert => "PlanAffectingConvert",
            Self::MemoryGrant => "MemoryGrant",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A warning attached to the plan or one of its operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanWarning {
    pub kind: WarningKind,
    pub description: String,
    /// `table.column` for column-level warnings
    pub column: Option<String>,
    /// What the warning means for execution
    pub impact: String,
}

impl PlanWarning {
    pub fn new(kind: WarningKind, description: impl Into<String>, impact: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            column: None,
            impact: impact.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

/// A physical operator (`RelOp`) from the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOperator {
    pub physical_op: String,
    pub logical_op: String,
    /// Table the operator reads, as `schema.table`
    pub table: Option<String>,
    /// Estimated subtree cost
    pub estimated_cost: f64,
    /// Operator's own share of the statement cost, in percent
    pub cost_percent: f64,
    pub estimated_rows: f64,
    /// Actual rows summed over threads (actual plans only)
    pub actual_rows: Option<u64>,
}

impl PlanOperator {
    pub fn new(physical_op: impl Into<String>, logical_op: impl Into<String>) -> Self {
        Self {
            physical_op: physical_op.into(),
            logical_op: logical_op.into(),
            table: None,
            estimated_cost: 0.0,
            cost_percent: 0.0,
            estimated_rows: 0.0,
            actual_rows: None,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_estimated_rows(mut self, rows: f64) -> Self {
        self.estimated_rows = rows;
        self
    }

    pub fn with_cost(mut self, estimated_cost: f64, cost_percent: f64) -> Self {
        self.estimated_cost = estimated_cost;
        self.cost_percent = cost_percent;
        self
    }

    /// Returns true if the logical or physical operation is a scan
    pub fn is_scan(&self) -> bool {
        self.logical_op.contains("Scan") || self.physical_op.contains("Scan")
    }
}

/// Parallel execution details
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelismInfo {
    pub is_parallel: bool,
    pub degree: u32,
    /// Time spent in exchange waits (CXPACKET / CXCONSUMER)
    pub parallel_wait_ms: u64,
}

/// A missing-index hint emitted by the optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingIndexHint {
    /// `schema.table`, undecorated
    pub table: String,
    pub equality_columns: Vec<String>,
    pub inequality_columns: Vec<String>,
    pub include_columns: Vec<String>,
    /// Estimated improvement, in percent
    pub impact_percent: f64,
}

impl MissingIndexHint {
    pub fn new(table: impl Into<String>, impact_percent: f64) -> Self {
        Self {
            table: table.into(),
            equality_columns: Vec::new(),
            inequality_columns: Vec::new(),
            include_columns: Vec::new(),
            impact_percent,
        }
    }

    pub fn with_equality<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.equality_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_inequality<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inequality_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_include<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Removes bracket and double-quote decoration from an identifier
pub fn strip_identifier_decoration(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '[' | ']' | '"'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Builds `schema.table` (or just `table`) from possibly decorated parts
pub fn qualified_table_name(schema: Option<&str>, table: &str) -> String {
    let table = strip_identifier_decoration(table);
    match schema.map(strip_identifier_decoration) {
        Some(schema) if !schema.is_empty() => format!("{}.{}", schema, table),
        _ => table,
    }
}

#[cfg(test)]
mod tests;
