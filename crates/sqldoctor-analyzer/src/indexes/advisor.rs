//! Missing-index advisor
//!
//! Two independently normalized streams feed one list:
//!
//! - **DMV** candidates (`sys.dm_db_missing_index_*`), database-wide, ranked
//!   by `avg_total_user_cost × avg_user_impact × (seeks + scans)`.
//! - **Plan** hints from a single query's ShowPlan, scored as
//!   `impact_percent × 1000` so both streams share an order of magnitude.
//!
//! The DMV stream always precedes the plan stream. The same index suggested
//! by both appears twice; the streams are not deduplicated.

use crate::config::AnalyzerConfig;
use crate::showplan::{MissingIndexHint, ParsedPlan, strip_identifier_decoration};
use serde::{Deserialize, Serialize};
use sqldoctor_core::Row;

/// Priority of a missing-index recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl IndexPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl std::fmt::Display for IndexPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which stream a recommendation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexOrigin {
    Dmv,
    Plan,
}

/// A missing-index candidate row from the DMVs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmvIndexCandidate {
    pub table: String,
    /// Comma-separated, as reported by the DMV
    pub equality_columns: Option<String>,
    pub inequality_columns: Option<String>,
    pub included_columns: Option<String>,
    pub user_seeks: u64,
    pub user_scans: u64,
    pub avg_total_user_cost: f64,
    /// Estimated improvement, in percent
    pub avg_user_impact: f64,
}

impl DmvIndexCandidate {
    /// Reads a candidate from a DMV row; rows without a table name are skipped
    pub fn from_row(row: &Row) -> Option<Self> {
        let table = row.get_string("table_name")?;
        Some(Self {
            table,
            equality_columns: row.get_string("equality_columns"),
            inequality_columns: row.get_string("inequality_columns"),
            included_columns: row.get_string("included_columns"),
            user_seeks: row.get_u64("user_seeks"),
            user_scans: row.get_u64("user_scans"),
            avg_total_user_cost: row.get_f64("avg_total_user_cost").unwrap_or(0.0).max(0.0),
            avg_user_impact: row.get_f64("avg_user_impact").unwrap_or(0.0).max(0.0),
        })
    }

    /// `avg_total_user_cost × avg_user_impact × (seeks + scans)`
    pub fn impact_score(&self) -> f64 {
        self.avg_total_user_cost * self.avg_user_impact * (self.user_seeks + self.user_scans) as f64
    }
}

/// A normalized missing-index recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingIndexRecommendation {
    pub table: String,
    pub equality_columns: Vec<String>,
    pub inequality_columns: Vec<String>,
    pub include_columns: Vec<String>,
    pub impact_score: f64,
    pub priority: IndexPriority,
    pub create_statement: String,
    pub considerations: Vec<String>,
    pub origin: IndexOrigin,
}

impl MissingIndexRecommendation {
    /// Key columns in index order
    pub fn key_columns(&self) -> impl Iterator<Item = &String> {
        self.equality_columns.iter().chain(self.inequality_columns.iter())
    }
}

// ============================================================================
// Naming and statement synthesis
// ============================================================================

/// Reduces `[db].[schema].[table]` style names to `schema.table`
pub fn normalize_table_name(raw: &str) -> String {
    let parts: Vec<String> = raw
        .split('.')
        .map(strip_identifier_decoration)
        .filter(|p| !p.is_empty())
        .collect();
    let keep = parts.len().saturating_sub(2);
    parts[keep..].join(".")
}

/// Bracket-quotes `schema.table`, assuming `dbo` when no schema is given
pub fn quote_table(table: &str) -> String {
    match table.split_once('.') {
        Some((schema, name)) => format!("[{}].[{}]", schema, name),
        None => format!("[dbo].[{}]", table),
    }
}

fn quote_columns(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("[{}]", c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Splits a DMV column list, stripping decoration and dropping blanks
pub fn split_dmv_columns(list: Option<&str>) -> Vec<String> {
    list.map(|l| {
        l.split(',')
            .map(strip_identifier_decoration)
            .filter(|c| !c.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Equality, inequality and include columns
pub type ColumnGroups = (Vec<String>, Vec<String>, Vec<String>);

/// Makes the equality, inequality and include groups pairwise disjoint
///
/// A column keeps its first (most selective) role; repeats within a group
/// are dropped as well.
pub fn disjoint_column_groups(
    equality: Vec<String>,
    inequality: Vec<String>,
    include: Vec<String>,
) -> ColumnGroups {
    let mut seen: Vec<String> = Vec::new();
    let mut keep = |columns: Vec<String>| -> Vec<String> {
        columns
            .into_iter()
            .filter(|c| {
                let key = c.to_lowercase();
                if seen.contains(&key) {
                    false
                } else {
                    seen.push(key);
                    true
                }
            })
            .collect()
    };
    let equality = keep(equality);
    let inequality = keep(inequality);
    let include = keep(include);
    (equality, inequality, include)
}

/// `IX_<table>_<eq1>[_<eq2>]`, or the first inequality column when there is
/// no equality column
pub fn index_name(table: &str, equality: &[String], inequality: &[String]) -> String {
    let leading: Vec<&String> = if equality.is_empty() {
        inequality.iter().take(1).collect()
    } else {
        equality.iter().take(2).collect()
    };
    let mut name = format!("IX_{}", table.replace('.', "_"));
    for column in leading {
        name.push('_');
        name.push_str(column);
    }
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Synthesizes the CREATE INDEX statement
pub fn create_index_statement(
    table: &str,
    equality: &[String],
    inequality: &[String],
    include: &[String],
) -> String {
    let key: Vec<String> = equality.iter().chain(inequality).cloned().collect();
    if key.is_empty() {
        return format!("-- No key columns reported for {}", table);
    }
    let mut statement = format!(
        "CREATE NONCLUSTERED INDEX [{}] ON {} ({})",
        index_name(table, equality, inequality),
        quote_table(table),
        quote_columns(&key)
    );
    if !include.is_empty() {
        statement.push_str(&format!(" INCLUDE ({})", quote_columns(include)));
    }
    statement.push(';');
    statement
}

// ============================================================================
// Priorities and considerations
// ============================================================================

pub fn dmv_priority(impact_score: f64, user_seeks: u64, config: &AnalyzerConfig) -> IndexPriority {
    if impact_score > config.dmv_high_impact && user_seeks > config.dmv_high_seeks {
        IndexPriority::High
    } else if impact_score > config.dmv_medium_impact {
        IndexPriority::Medium
    } else {
        IndexPriority::Low
    }
}

pub fn plan_priority(impact_percent: f64, config: &AnalyzerConfig) -> IndexPriority {
    if impact_percent >= config.plan_critical_percent {
        IndexPriority::Critical
    } else if impact_percent >= config.plan_high_percent {
        IndexPriority::High
    } else if impact_percent >= config.plan_medium_percent {
        IndexPriority::Medium
    } else {
        IndexPriority::Low
    }
}

fn common_considerations(
    table: &str,
    key_columns: usize,
    include_columns: usize,
    config: &AnalyzerConfig,
) -> Vec<String> {
    let mut considerations = vec![
        "Test in a non-production environment first".to_string(),
        format!(
            "Check existing indexes on {} that could be extended instead",
            table
        ),
    ];
    if include_columns > config.wide_include_columns {
        considerations.push(format!(
            "Include list has {} columns; a wide index adds storage and write cost",
            include_columns
        ));
    }
    if key_columns > config.wide_key_columns {
        considerations.push(format!(
            "Key has {} columns; confirm every key column is selective",
            key_columns
        ));
    }
    considerations
}

// ============================================================================
// Streams
// ============================================================================

fn build_recommendation(
    table: String,
    (equality, inequality, include): ColumnGroups,
    impact_score: f64,
    priority: IndexPriority,
    origin: IndexOrigin,
    config: &AnalyzerConfig,
) -> MissingIndexRecommendation {
    let (equality, inequality, include) = disjoint_column_groups(equality, inequality, include);
    let create_statement = create_index_statement(&table, &equality, &inequality, &include);
    let considerations = common_considerations(
        &table,
        equality.len() + inequality.len(),
        include.len(),
        config,
    );
    MissingIndexRecommendation {
        table,
        equality_columns: equality,
        inequality_columns: inequality,
        include_columns: include,
        impact_score: impact_score.max(0.0),
        priority,
        create_statement,
        considerations,
        origin,
    }
}

/// Source A: ranks DMV candidates and keeps the top `dmv_top_n`
pub fn recommend_from_dmv(
    candidates: &[DmvIndexCandidate],
    config: &AnalyzerConfig,
) -> Vec<MissingIndexRecommendation> {
    let mut ranked: Vec<(f64, &DmvIndexCandidate)> =
        candidates.iter().map(|c| (c.impact_score(), c)).collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    ranked
        .into_iter()
        .take(config.dmv_top_n)
        .map(|(impact, candidate)| {
            let mut recommendation = build_recommendation(
                normalize_table_name(&candidate.table),
                (
                    split_dmv_columns(candidate.equality_columns.as_deref()),
                    split_dmv_columns(candidate.inequality_columns.as_deref()),
                    split_dmv_columns(candidate.included_columns.as_deref()),
                ),
                impact,
                dmv_priority(impact, candidate.user_seeks, config),
                IndexOrigin::Dmv,
                config,
            );
            if candidate.user_scans > candidate.user_seeks {
                recommendation.considerations.push(format!(
                    "Usage is scan-heavy ({} scans vs {} seeks); the index may not be selective enough",
                    candidate.user_scans, candidate.user_seeks
                ));
            }
            recommendation
        })
        .collect()
}

/// Source B: converts plan hints in document order
pub fn recommend_from_plan(
    hints: &[MissingIndexHint],
    config: &AnalyzerConfig,
) -> Vec<MissingIndexRecommendation> {
    hints
        .iter()
        .map(|hint| {
            let mut recommendation = build_recommendation(
                normalize_table_name(&hint.table),
                (
                    hint.equality_columns.clone(),
                    hint.inequality_columns.clone(),
                    hint.include_columns.clone(),
                ),
                hint.impact_percent * config.plan_impact_scale,
                plan_priority(hint.impact_percent, config),
                IndexOrigin::Plan,
                config,
            );
            recommendation.considerations.push(
                "Derived from a single query plan; confirm the workload benefits before creating"
                    .to_string(),
            );
            recommendation
        })
        .collect()
}

/// Merges both streams into one list, DMV first
#[derive(Debug, Clone, Default)]
pub struct MissingIndexAdvisor {
    config: AnalyzerConfig,
}

impl MissingIndexAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Recommendations from `candidates` followed by those from `plan`
    pub fn recommend(
        &self,
        candidates: &[DmvIndexCandidate],
        plan: Option<&ParsedPlan>,
    ) -> Vec<MissingIndexRecommendation> {
        let mut recommendations = recommend_from_dmv(candidates, &self.config);
        if let Some(plan) = plan {
            recommendations.extend(recommend_from_plan(&plan.missing_indexes, &self.config));
        }
        recommendations
    }
}

/// Merges DMV candidates and plan hints using the default thresholds
pub fn recommend_missing_indexes(
    candidates: &[DmvIndexCandidate],
    plan: Option<&ParsedPlan>,
) -> Vec<MissingIndexRecommendation> {
    MissingIndexAdvisor::new().recommend(candidates, plan)
}
