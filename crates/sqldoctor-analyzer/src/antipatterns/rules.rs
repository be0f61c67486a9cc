//! Antipattern detection rules
//!
//! Each rule is an independent pure function over the query text (and the
//! parsed plan, when one is available). The detector runs them in the order
//! of [`RULES`]; none of them share state.

use super::finding::{AntipatternCategory, AntipatternFinding, RuleOutcome, Severity};
use super::text::{
    collapse_whitespace, fragment, mask_comments, mask_literals, mask_subqueries,
    matching_paren, subquery_ranges, truncate,
};
use crate::config::AnalyzerConfig;
use crate::showplan::{ParsedPlan, strip_identifier_decoration};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::LazyLock;

pub const SELECT_STAR_WEIGHT: f64 = 0.5;
pub const NON_SARGABLE_WEIGHT: f64 = 1.5;
pub const LEADING_WILDCARD_WEIGHT: f64 = 1.0;
pub const CORRELATED_SUBQUERY_WEIGHT: f64 = 2.0;
pub const AGGREGATE_IN_WHERE_WEIGHT: f64 = 1.0;
pub const MISSING_STATISTICS_WEIGHT: f64 = 1.5;
pub const LARGE_SCAN_WEIGHT: f64 = 0.5;

const MAX_LOCATION_CHARS: usize = 160;

/// Query text plus the masked views the rules match against
#[derive(Debug, Clone)]
pub struct QueryText<'a> {
    original: &'a str,
    /// Comments blanked; literals intact
    code: String,
    /// Comments and literal contents blanked
    bare: String,
}

impl<'a> QueryText<'a> {
    pub fn new(original: &'a str) -> Self {
        let code = mask_comments(original);
        let bare = mask_literals(&code);
        Self {
            original,
            code,
            bare,
        }
    }

    pub fn original(&self) -> &'a str {
        self.original
    }

    fn fragment(&self, range: Range<usize>) -> String {
        truncate(&fragment(self.original, &self.bare, range), MAX_LOCATION_CHARS)
    }
}

/// Signature shared by every rule
pub type Rule = fn(&QueryText<'_>, Option<&ParsedPlan>, &AnalyzerConfig) -> RuleOutcome;

/// All rules, in evaluation order
pub const RULES: [(&str, Rule); 7] = [
    ("select_star", select_star),
    ("non_sargable_predicates", non_sargable_predicates),
    ("leading_wildcard", leading_wildcard),
    ("correlated_subquery", correlated_subquery),
    ("aggregate_in_where", aggregate_in_where),
    ("missing_statistics", missing_statistics),
    ("large_scans", large_scans),
];

const IDENT: &str = r"(?:\[[^\]]+\]|[A-Za-z_#][A-Za-z0-9_#]*)";

static SELECT_STAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bSELECT\s+(?:(?:DISTINCT|ALL)\s+)?(?:TOP\s*\(?\s*\d+\s*\)?\s*(?:PERCENT\s+)?(?:WITH\s+TIES\s+)?)?\*\s*FROM\b",
    )
    .expect("valid regex")
});

const COMPARISON: &str =
    r"<>|!=|<=|>=|=|<|>|\bNOT\s+BETWEEN\b|\bBETWEEN\b|\bNOT\s+IN\b|\bIN\b|\bNOT\s+LIKE\b|\bLIKE\b";

const FUNCTION_CALL: &str =
    r"\b(?:[A-Za-z_][A-Za-z0-9_]*\.)?([A-Za-z_][A-Za-z0-9_]*)\s*\(((?:[^()]|\([^()]*\))*)\)";

static FUNCTION_LHS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i){}\s*(?:{})", FUNCTION_CALL, COMPARISON)).expect("valid regex")
});

static FUNCTION_RHS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)(?:{})\s*{}", COMPARISON, FUNCTION_CALL)).expect("valid regex")
});

static QUALIFIED_COLUMN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{}\s*\.\s*{}", IDENT, IDENT)).expect("valid regex")
});

static LEADING_WILDCARD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:NOT\s+)?LIKE\s*\(?\s*N?'[%_][^']*'\s*\)?").expect("valid regex")
});

static WHERE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bWHERE\b").expect("valid regex"));

static CLAUSE_END_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bGROUP\s+BY\b|\bHAVING\b|\bORDER\s+BY\b").expect("valid regex")
});

static AGGREGATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(COUNT|SUM|AVG|MIN|MAX)\s*\(").expect("valid regex")
});

/// `a.x = b.y`, with either qualifier optional
static EQUI_PREDICATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:({ident})\s*\.\s*)?{ident}\s*=\s*(?:({ident})\s*\.\s*)?{ident}",
        ident = IDENT
    ))
    .expect("valid regex")
});

static TABLE_SOURCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:FROM|JOIN|APPLY)\s+(?:{ident}\s*\.\s*){{0,2}}({ident})(?:\s+(?:AS\s+)?({ident}))?",
        ident = IDENT
    ))
    .expect("valid regex")
});

/// Words that look like a function call before `(` but are not
const NOT_FUNCTIONS: &[&str] = &[
    "IN", "EXISTS", "NOT", "AND", "OR", "SELECT", "WHERE", "ON", "VALUES", "ANY", "ALL", "SOME",
    "AS", "WHEN", "THEN", "ELSE", "CASE", "COUNT", "SUM", "AVG", "MIN", "MAX", "OVER", "BY",
];

const NOT_ALIASES: &[&str] = &[
    "WHERE", "INNER", "LEFT", "RIGHT", "FULL", "OUTER", "CROSS", "JOIN", "ON", "GROUP", "ORDER",
    "HAVING", "WITH", "UNION", "EXCEPT", "INTERSECT", "OPTION", "SELECT", "FROM", "AND", "OR",
    "APPLY", "PIVOT", "UNPIVOT",
];

fn is_keyword(word: &str, list: &[&str]) -> bool {
    list.iter().any(|k| k.eq_ignore_ascii_case(word))
}

// ============================================================================
// SELECT *
// ============================================================================

/// `SELECT * FROM`, once per query
pub fn select_star(
    query: &QueryText<'_>,
    _plan: Option<&ParsedPlan>,
    _config: &AnalyzerConfig,
) -> RuleOutcome {
    let Some(m) = SELECT_STAR_REGEX.find(&query.bare) else {
        return RuleOutcome::none();
    };
    RuleOutcome::single(
        AntipatternFinding::new(
            AntipatternCategory::SelectStar,
            Severity::Medium,
            query.fragment(m.range()),
            "SELECT * returns every column, including ones the caller does not use",
            "List only the columns the caller needs so narrower covering indexes can be used",
            "Extra I/O and network transfer; prevents covering-index plans",
        ),
        SELECT_STAR_WEIGHT,
    )
}

// ============================================================================
// Non-SARGable predicates
// ============================================================================

struct FunctionCall {
    name: String,
    column: String,
    range: Range<usize>,
}

/// Scans `text` for function calls matched by `regex` that wrap a qualified column
fn wrapped_column_calls(regex: &Regex, text: &str) -> Vec<(usize, FunctionCall)> {
    let mut calls = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let Some(caps) = regex.captures_at(text, pos) else {
            break;
        };
        let (Some(whole), Some(name), Some(args)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            break;
        };

        let column = QUALIFIED_COLUMN_REGEX.find(args.as_str());
        match column {
            Some(column) if !is_keyword(name.as_str(), NOT_FUNCTIONS) => {
                calls.push((
                    name.start(),
                    FunctionCall {
                        name: name.as_str().to_uppercase(),
                        column: collapse_whitespace(column.as_str()),
                        range: whole.range(),
                    },
                ));
                pos = whole.end();
            }
            // Keep looking inside the arguments.
            _ => pos = name.end(),
        }
    }

    calls
}

fn sargable_rewrite(function: &str) -> &'static str {
    match function {
        "YEAR" | "MONTH" | "DAY" | "DATEPART" | "DATEDIFF" | "EOMONTH" => {
            "Compare the raw column against a date range (col >= @start AND col < @end)"
        }
        "UPPER" | "LOWER" => {
            "Compare the raw column and rely on a case-insensitive collation instead of case folding"
        }
        "LTRIM" | "RTRIM" | "TRIM" => {
            "Store trimmed values or index a persisted computed column"
        }
        "CONVERT" | "CAST" | "TRY_CONVERT" | "TRY_CAST" => {
            "Convert the other operand to the column's type instead of converting the column"
        }
        "ISNULL" | "COALESCE" => "Rewrite as (col = @value OR col IS NULL)",
        "SUBSTRING" | "LEFT" => "Use LIKE 'prefix%' on the raw column or index a computed column",
        _ => {
            "Move the function to the other side of the comparison or index a persisted computed column"
        }
    }
}

/// A function wrapping a qualified column on either side of a comparison,
/// once per occurrence
pub fn non_sargable_predicates(
    query: &QueryText<'_>,
    _plan: Option<&ParsedPlan>,
    _config: &AnalyzerConfig,
) -> RuleOutcome {
    // Keyed by the function's position so both scans agree on order and
    // a call matched from both sides counts once.
    let mut calls: BTreeMap<usize, FunctionCall> = BTreeMap::new();
    for regex in [&*FUNCTION_LHS_REGEX, &*FUNCTION_RHS_REGEX] {
        for (start, call) in wrapped_column_calls(regex, &query.bare) {
            calls.entry(start).or_insert(call);
        }
    }

    let findings: Vec<_> = calls
        .into_values()
        .map(|call| {
            AntipatternFinding::new(
                AntipatternCategory::NonSargablePredicate,
                Severity::High,
                query.fragment(call.range),
                format!(
                    "{}() wraps column {} in a predicate, so an index on it cannot be seeked",
                    call.name, call.column
                ),
                sargable_rewrite(&call.name),
                "Forces a scan of every row instead of an index seek",
            )
        })
        .collect();

    RuleOutcome {
        score_delta: NON_SARGABLE_WEIGHT * findings.len() as f64,
        findings,
    }
}

// ============================================================================
// Leading wildcard
// ============================================================================

/// `LIKE` / `NOT LIKE` with a literal starting with `%` or `_`, once per query
pub fn leading_wildcard(
    query: &QueryText<'_>,
    _plan: Option<&ParsedPlan>,
    _config: &AnalyzerConfig,
) -> RuleOutcome {
    let Some(m) = LEADING_WILDCARD_REGEX.find(&query.code) else {
        return RuleOutcome::none();
    };
    RuleOutcome::single(
        AntipatternFinding::new(
            AntipatternCategory::LeadingWildcard,
            Severity::High,
            truncate(&collapse_whitespace(m.as_str()), MAX_LOCATION_CHARS),
            "Pattern starts with a wildcard, so no index range can be derived from it",
            "Anchor the pattern at the start, or use full-text search for substring matching",
            "Every row of the table or index is read and compared",
        ),
        LEADING_WILDCARD_WEIGHT,
    )
}

// ============================================================================
// Correlated subquery
// ============================================================================

fn normalize_qualifier(raw: &str) -> String {
    strip_identifier_decoration(raw).to_lowercase()
}

/// Table names and aliases introduced inside a subquery
fn inner_sources(subquery: &str) -> Vec<String> {
    let mut sources = Vec::new();
    let mut pos = 0;

    while let Some(caps) = TABLE_SOURCE_REGEX.captures_at(subquery, pos) {
        let Some(table) = caps.get(1) else {
            break;
        };
        sources.push(normalize_qualifier(table.as_str()));
        if let Some(alias) = caps.get(2).filter(|a| !is_keyword(a.as_str(), NOT_ALIASES)) {
            sources.push(normalize_qualifier(alias.as_str()));
        }
        // A rejected alias may be the next JOIN keyword.
        pos = table.end();
    }
    sources
}

/// Whether the predicate joins an inner column to an outer one
///
/// An unqualified column belongs to the subquery; a qualifier is outer when
/// the subquery does not introduce it.
fn is_correlated(caps: &Captures<'_>, sources: &[String]) -> bool {
    let left = caps.get(1).map(|m| normalize_qualifier(m.as_str()));
    let right = caps.get(2).map(|m| normalize_qualifier(m.as_str()));
    match (left, right) {
        (Some(left), Some(right)) => {
            if left == right {
                false
            } else if sources.is_empty() {
                true
            } else {
                sources.contains(&left) != sources.contains(&right)
            }
        }
        (Some(outer), None) | (None, Some(outer)) => {
            !sources.is_empty() && !sources.contains(&outer)
        }
        (None, None) => false,
    }
}

/// A parenthesized `SELECT` whose filter equates an outer column to an
/// inner one, once per query
pub fn correlated_subquery(
    query: &QueryText<'_>,
    _plan: Option<&ParsedPlan>,
    _config: &AnalyzerConfig,
) -> RuleOutcome {
    let text = &query.bare;

    for range in subquery_ranges(text) {
        let inner = &text[range.start + 1..range.end];
        let Some(where_kw) = WHERE_REGEX.find(inner) else {
            continue;
        };
        let sources = inner_sources(&inner[..where_kw.start()]);

        let filter_start = where_kw.end();
        let hit = EQUI_PREDICATE_REGEX
            .captures_iter(&inner[filter_start..])
            .find(|caps| is_correlated(caps, &sources));

        if let Some(caps) = hit {
            let predicate = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let end = range.start + 1 + filter_start + caps.get(0).map_or(0, |m| m.end());
            return RuleOutcome::single(
                AntipatternFinding::new(
                    AntipatternCategory::CorrelatedSubquery,
                    Severity::High,
                    query.fragment(range.start..end),
                    format!(
                        "Subquery is correlated with the outer query through {}",
                        collapse_whitespace(predicate)
                    ),
                    "Rewrite as a JOIN or CROSS APPLY against a pre-aggregated derived table",
                    "The subquery may be evaluated once per outer row",
                ),
                CORRELATED_SUBQUERY_WEIGHT,
            );
        }
    }

    RuleOutcome::none()
}

// ============================================================================
// Aggregate in WHERE
// ============================================================================

/// An aggregate function in a WHERE clause (outside nested subqueries),
/// once per query
pub fn aggregate_in_where(
    query: &QueryText<'_>,
    _plan: Option<&ParsedPlan>,
    _config: &AnalyzerConfig,
) -> RuleOutcome {
    let text = mask_subqueries(&query.bare);

    for where_kw in WHERE_REGEX.find_iter(&text) {
        let clause_start = where_kw.end();
        let clause_end = CLAUSE_END_REGEX
            .find_at(&text, clause_start)
            .map_or(text.len(), |m| m.start());
        let clause = &text[clause_start..clause_end];

        let Some(caps) = AGGREGATE_REGEX.captures(clause) else {
            continue;
        };
        let (Some(call), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let open = clause_start + call.end() - 1;
        let end = matching_paren(&text, open).map_or(clause_end, |close| close + 1);

        return RuleOutcome::single(
            AntipatternFinding::new(
                AntipatternCategory::ScalarUdf,
                Severity::Medium,
                query.fragment(clause_start + call.start()..end),
                format!(
                    "Aggregate {}() is evaluated in the WHERE clause",
                    name.as_str().to_uppercase()
                ),
                "Move aggregate conditions to HAVING, or pre-aggregate in a derived table and join to it",
                "Aggregation is repeated for every candidate row",
            ),
            AGGREGATE_IN_WHERE_WEIGHT,
        );
    }

    RuleOutcome::none()
}

// ============================================================================
// Plan-based rules
// ============================================================================

/// One finding per column the optimizer reported as lacking statistics
pub fn missing_statistics(
    _query: &QueryText<'_>,
    plan: Option<&ParsedPlan>,
    _config: &AnalyzerConfig,
) -> RuleOutcome {
    let Some(plan) = plan else {
        return RuleOutcome::none();
    };

    let findings: Vec<_> = plan
        .columns_without_statistics()
        .map(|warning| {
            let column = warning.column.as_deref().unwrap_or(&warning.description);
            AntipatternFinding::new(
                AntipatternCategory::MissingStatistics,
                Severity::High,
                column,
                format!("Column {} has no statistics", column),
                "Create statistics on the column or enable AUTO_CREATE_STATISTICS on the database",
                warning.impact.clone(),
            )
        })
        .collect();

    RuleOutcome {
        score_delta: MISSING_STATISTICS_WEIGHT * findings.len() as f64,
        findings,
    }
}

/// Adds to the score for each large scan; produces no findings
pub fn large_scans(
    _query: &QueryText<'_>,
    plan: Option<&ParsedPlan>,
    config: &AnalyzerConfig,
) -> RuleOutcome {
    let Some(plan) = plan else {
        return RuleOutcome::none();
    };
    let scans = plan
        .scan_operators()
        .filter(|op| op.estimated_rows > config.large_scan_rows)
        .count();
    RuleOutcome {
        findings: Vec::new(),
        score_delta: LARGE_SCAN_WEIGHT * scans as f64,
    }
}
