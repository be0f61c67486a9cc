//! ShowPlan XML Parser
//!
//! Parses the XML produced by `SET STATISTICS XML ON` (actual plans) or
//! `SET SHOWPLAN_XML ON` (estimated plans). All elements are matched by local
//! name inside the ShowPlan namespace.
//!
//! # Examples
//!
//! ```
//! use sqldoctor_analyzer::showplan::parse_showplan;
//! use sqldoctor_core::NullSink;
//!
//! let xml = r#"<ShowPlanXML xmlns="http://schemas.microsoft.com/sqlserver/2004/07/showplan">
//!   <BatchSequence><Batch><Statements>
//!     <StmtSimple StatementSubTreeCost="0.5">
//!       <QueryPlan DegreeOfParallelism="1">
//!         <RelOp PhysicalOp="Table Scan" LogicalOp="Table Scan" EstimateRows="20000"
//!                EstimatedTotalSubtreeCost="0.5">
//!           <TableScan><Object Schema="[dbo]" Table="[Orders]"/></TableScan>
//!         </RelOp>
//!       </QueryPlan>
//!     </StmtSimple>
//!   </Statements></Batch></BatchSequence>
//! </ShowPlanXML>"#;
//!
//! let parsed = parse_showplan(Some(xml), &NullSink);
//! let plan = parsed.plan().unwrap();
//! assert_eq!(plan.operators[0].table.as_deref(), Some("dbo.Orders"));
//! ```

use super::plan::{
    MissingIndexHint, NoDataReason, ParallelismInfo, ParsedPlan, PlanOperator, PlanParse,
    PlanWarning, RuntimeCounters, WarningKind, qualified_table_name, strip_identifier_decoration,
};
use roxmltree::{Document, Node};
use sqldoctor_core::{DiagnosticEvent, DiagnosticSink};

/// XML namespace of ShowPlan documents
pub const SHOWPLAN_NAMESPACE: &str = "http://schemas.microsoft.com/sqlserver/2004/07/showplan";

const ROOT_ELEMENT: &str = "ShowPlanXML";

/// Parses an optional ShowPlan document
///
/// Never fails: absent input, malformed XML, an unexpected root or a missing
/// namespace all produce [`PlanParse::NoData`]. Every case except absent input
/// also emits a warning to `sink`.
pub fn parse_showplan(xml: Option<&str>, sink: &dyn DiagnosticSink) -> PlanParse {
    let Some(text) = xml.filter(|s| !s.trim().is_empty()) else {
        sink.emit(DiagnosticEvent::debug("plan.absent", "No plan document supplied"));
        return PlanParse::NoData(NoDataReason::Absent);
    };

    match parse_document(text) {
        Ok(plan) => {
            sink.emit(
                DiagnosticEvent::debug("plan.parsed", "Parsed ShowPlan document")
                    .with_field("operators", plan.operators.len())
                    .with_field("warnings", plan.warnings.len())
                    .with_field("missing_indexes", plan.missing_indexes.len())
                    .with_field("has_runtime", plan.has_runtime()),
            );
            PlanParse::Parsed(plan)
        }
        Err(reason) => {
            sink.emit(
                DiagnosticEvent::warning("plan.no_data", reason.to_string())
                    .with_field("length", text.len()),
            );
            PlanParse::NoData(reason)
        }
    }
}

/// Parses a ShowPlan document, reporting why it is unusable on failure
pub fn parse_document(text: &str) -> Result<ParsedPlan, NoDataReason> {
    let doc = Document::parse(strip_declaration(text))
        .map_err(|e| NoDataReason::Malformed(e.to_string()))?;
    let root = doc.root_element();

    if root.tag_name().name() != ROOT_ELEMENT {
        return Err(NoDataReason::UnexpectedRoot(root.tag_name().name().to_string()));
    }
    if root.tag_name().namespace() != Some(SHOWPLAN_NAMESPACE) {
        return Err(NoDataReason::MissingNamespace);
    }

    let statement_cost = elements(root, "StmtSimple")
        .find_map(|stmt| attr_f64(stmt, "StatementSubTreeCost"))
        .unwrap_or(0.0);

    Ok(ParsedPlan {
        runtime: extract_runtime(root),
        warnings: extract_warnings(root),
        operators: extract_operators(root, statement_cost),
        parallelism: extract_parallelism(root),
        missing_indexes: extract_missing_indexes(root),
        statement_cost,
    })
}

/// Drops a leading `<?xml ...?>` declaration. Saved plans declare
/// `encoding="utf-16"` even after being decoded to UTF-8.
fn strip_declaration(text: &str) -> &str {
    let text = text.trim_start_matches('\u{feff}').trim();
    if text.starts_with("<?xml") {
        if let Some(end) = text.find("?>") {
            return text[end + 2..].trim_start();
        }
    }
    text
}

// ============================================================================
// Node helpers
// ============================================================================

fn is_element(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && node.tag_name().namespace() == Some(SHOWPLAN_NAMESPACE)
}

/// Descendant elements (including `node` itself) with the given local name
fn elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.descendants().filter(move |n| is_element(*n, name))
}

/// Direct child elements with the given local name
fn child_elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| is_element(*n, name))
}

/// The closest enclosing `RelOp`, excluding `node` itself
fn owning_relop<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    node.ancestors().skip(1).find(|n| is_element(*n, "RelOp"))
}

/// Descendants of `relop` that belong to it rather than to a nested operator
fn own_elements<'a, 'input: 'a>(
    relop: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    elements(relop, name).filter(move |n| *n != relop && owning_relop(*n) == Some(relop))
}

fn attr_f64(node: Node<'_, '_>, name: &str) -> Option<f64> {
    node.attribute(name)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn attr_u64(node: Node<'_, '_>, name: &str) -> Option<u64> {
    let raw = node.attribute(name)?.trim();
    raw.parse::<u64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.max(0.0) as u64))
}

fn attr_bool(node: Node<'_, '_>, name: &str) -> bool {
    matches!(node.attribute(name).map(str::trim), Some("true" | "1"))
}

// ============================================================================
// Runtime counters
// ============================================================================

fn thread_counters<'a, 'input: 'a>(
    relop: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    child_elements(relop, "RunTimeInformation")
        .flat_map(|info| child_elements(info, "RunTimeCountersPerThread"))
}

fn extract_runtime(root: Node<'_, '_>) -> Option<RuntimeCounters> {
    let mut counters = RuntimeCounters::default();
    let mut seen = false;

    for thread in elements(root, "RunTimeCountersPerThread") {
        seen = true;
        counters.logical_reads += attr_u64(thread, "ActualLogicalReads").unwrap_or(0);
        counters.physical_reads += attr_u64(thread, "ActualPhysicalReads").unwrap_or(0);
        counters.read_ahead_reads += attr_u64(thread, "ActualReadAheads").unwrap_or(0);
        counters.lob_logical_reads += attr_u64(thread, "ActualLobLogicalReads").unwrap_or(0);
        counters.elapsed_ms = counters
            .elapsed_ms
            .max(attr_u64(thread, "ActualElapsedms").unwrap_or(0));
    }

    // Row-mode operator CPU includes its children.
    let relops: Vec<_> = elements(root, "RelOp").collect();
    counters.cpu_ms = relops
        .iter()
        .map(|relop| {
            thread_counters(*relop)
                .map(|t| attr_u64(t, "ActualCPUms").unwrap_or(0))
                .sum::<u64>()
        })
        .max()
        .unwrap_or(0);
    counters.actual_rows = relops
        .first()
        .map(|root_op| {
            thread_counters(*root_op)
                .map(|t| attr_u64(t, "ActualRows").unwrap_or(0))
                .sum::<u64>()
        })
        .unwrap_or(0);

    if let Some(stats) = elements(root, "QueryTimeStats").next() {
        seen = true;
        if let Some(elapsed) = attr_u64(stats, "ElapsedTime") {
            counters.elapsed_ms = elapsed;
        }
        if let Some(cpu) = attr_u64(stats, "CpuTime") {
            counters.cpu_ms = cpu;
        }
    }

    seen.then_some(counters)
}

// ============================================================================
// Warnings
// ============================================================================

fn extract_warnings(root: Node<'_, '_>) -> Vec<PlanWarning> {
    let mut warnings = Vec::new();

    for block in elements(root, "Warnings") {
        if attr_bool(block, "NoJoinPredicate") {
            warnings.push(PlanWarning::new(
                WarningKind::NoJoinPredicate,
                "Join has no join predicate",
                "Produces a cartesian product; row counts grow multiplicatively",
            ));
        }

        for child in block.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "ColumnsWithNoStatistics" => {
                    for column_ref in elements(child, "ColumnReference") {
                        let column = column_reference_name(column_ref);
                        warnings.push(
                            PlanWarning::new(
                                WarningKind::ColumnsWithNoStatistics,
                                format!("Column {} has no statistics", column),
                                "Cardinality estimates for this column are guesses",
                            )
                            .with_column(column),
                        );
                    }
                }
                "SpillToTempDb" => {
                    let level = child.attribute("SpillLevel").unwrap_or("?");
                    warnings.push(PlanWarning::new(
                        WarningKind::SpillToTempDb,
                        format!("Operator spilled to tempdb (spill level {})", level),
                        "Sort or hash work exceeded its memory grant and used tempdb I/O",
                    ));
                }
                "PlanAffectingConvert" => {
                    let expression = child.attribute("Expression").unwrap_or_default();
                    let issue = child.attribute("ConvertIssue").unwrap_or("plan choice");
                    warnings.push(PlanWarning::new(
                        WarningKind::PlanAffectingConvert,
                        format!("Type conversion in expression {}", expression),
                        format!("May affect {}", issue),
                    ));
                }
                "MemoryGrantWarning" => {
                    let kind = child.attribute("GrantWarningKind").unwrap_or("Memory grant");
                    let requested = attr_u64(child, "RequestedMemory").unwrap_or(0);
                    let granted = attr_u64(child, "GrantedMemory").unwrap_or(0);
                    let used = attr_u64(child, "MaxUsedMemory").unwrap_or(0);
                    warnings.push(PlanWarning::new(
                        WarningKind::MemoryGrant,
                        format!(
                            "{}: requested {} KB, granted {} KB, used {} KB",
                            kind, requested, granted, used
                        ),
                        "Memory grant does not match actual usage",
                    ));
                }
                other => warnings.push(PlanWarning::new(
                    WarningKind::Other(other.to_string()),
                    other.to_string(),
                    "",
                )),
            }
        }
    }

    warnings
}

fn column_reference_name(node: Node<'_, '_>) -> String {
    let column = strip_identifier_decoration(node.attribute("Column").unwrap_or_default());
    match node.attribute("Table").map(strip_identifier_decoration) {
        Some(table) if !table.is_empty() => format!("{}.{}", table, column),
        _ => column,
    }
}

// ============================================================================
// Operators
// ============================================================================

fn extract_operators(root: Node<'_, '_>, statement_cost: f64) -> Vec<PlanOperator> {
    elements(root, "RelOp")
        .map(|relop| {
            let subtree_cost = attr_f64(relop, "EstimatedTotalSubtreeCost").unwrap_or(0.0);
            let children_cost: f64 = own_elements(relop, "RelOp")
                .filter_map(|child| attr_f64(child, "EstimatedTotalSubtreeCost"))
                .sum();
            let own_cost = (subtree_cost - children_cost).max(0.0);
            let cost_percent = if statement_cost > 0.0 {
                own_cost / statement_cost * 100.0
            } else {
                0.0
            };

            let table = own_elements(relop, "Object").next().and_then(|object| {
                object
                    .attribute("Table")
                    .map(|table| qualified_table_name(object.attribute("Schema"), table))
            });

            let mut threads = thread_counters(relop).peekable();
            let actual_rows = threads
                .peek()
                .is_some()
                .then(|| threads.map(|t| attr_u64(t, "ActualRows").unwrap_or(0)).sum::<u64>());

            PlanOperator {
                physical_op: relop.attribute("PhysicalOp").unwrap_or_default().to_string(),
                logical_op: relop.attribute("LogicalOp").unwrap_or_default().to_string(),
                table,
                estimated_cost: subtree_cost,
                cost_percent,
                estimated_rows: attr_f64(relop, "EstimateRows").unwrap_or(0.0),
                actual_rows,
            }
        })
        .collect()
}

// ============================================================================
// Parallelism
// ============================================================================

fn extract_parallelism(root: Node<'_, '_>) -> ParallelismInfo {
    let degree = elements(root, "QueryPlan")
        .find_map(|qp| attr_u64(qp, "DegreeOfParallelism"))
        .unwrap_or(0) as u32;
    let parallel_op = elements(root, "RelOp").any(|relop| attr_bool(relop, "Parallel"));
    let parallel_wait_ms = elements(root, "Wait")
        .filter(|wait| {
            wait.attribute("WaitType")
                .is_some_and(|t| t.starts_with("CXPACKET") || t.starts_with("CXCONSUMER"))
        })
        .map(|wait| attr_u64(wait, "WaitTimeMs").unwrap_or(0))
        .sum();

    ParallelismInfo {
        is_parallel: degree > 1 || parallel_op,
        degree,
        parallel_wait_ms,
    }
}

// ============================================================================
// Missing indexes
// ============================================================================

fn extract_missing_indexes(root: Node<'_, '_>) -> Vec<MissingIndexHint> {
    let mut hints = Vec::new();

    for group in elements(root, "MissingIndexGroup") {
        let impact = attr_f64(group, "Impact").unwrap_or(0.0);

        for index in elements(group, "MissingIndex") {
            let table = qualified_table_name(
                index.attribute("Schema"),
                index.attribute("Table").unwrap_or_default(),
            );
            let mut hint = MissingIndexHint::new(table, impact);

            for column_group in child_elements(index, "ColumnGroup") {
                let columns = child_elements(column_group, "Column")
                    .filter_map(|c| c.attribute("Name"))
                    .map(strip_identifier_decoration)
                    .filter(|c| !c.is_empty());
                match column_group.attribute("Usage") {
                    Some("EQUALITY") => hint.equality_columns.extend(columns),
                    Some("INEQUALITY") => hint.inequality_columns.extend(columns),
                    Some("INCLUDE") => hint.include_columns.extend(columns),
                    _ => {}
                }
            }

            hints.push(hint);
        }
    }

    hints
}
