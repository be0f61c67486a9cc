//! Query analysis tools
//!
//! Each tool fetches what it needs from the server (plans, DMV rows) and
//! hands it to the analyzer.

use super::{DoctorTools, respond};
use crate::envelope::ToolResponse;
use crate::queries;
use serde::{Deserialize, Serialize};
use sqldoctor_analyzer::{
    AntipatternDetector, AntipatternReport, Bottleneck, DmvIndexCandidate, ExecutionMetrics,
    IndexUsageRecord, IndexUsageRow, MissingIndexAdvisor, MissingIndexRecommendation,
    ParallelismInfo, ParsedPlan, PlanParse, PlanWarning, StatisticsRecord, StatisticsRow,
    assess_tables_with_config, collect_metrics_with_config, parse_showplan, review_index_usage,
};
use sqldoctor_core::{DoctorError, Result, Value};
use std::time::Instant;

/// Result of running a query with actual-plan capture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAnalysis {
    pub database: Option<String>,
    pub rows_returned: u64,
    pub metrics: ExecutionMetrics,
    pub cpu_percentage: f64,
    pub bottleneck: Option<Bottleneck>,
    pub bottleneck_description: Option<String>,
    pub plan_available: bool,
    /// Why the plan could not be used, when it could not
    pub plan_issue: Option<String>,
    pub plan_warnings: Vec<PlanWarning>,
    pub parallelism: ParallelismInfo,
    pub missing_index_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AntipatternAnalysis {
    pub report: Option<AntipatternReport>,
    pub summary: String,
    /// Whether an estimated plan contributed findings
    pub plan_used: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexAdvice {
    /// DMV recommendations first, then plan recommendations
    pub recommendations: Vec<MissingIndexRecommendation>,
    pub usage: Vec<IndexUsageRecord>,
    pub drop_candidates: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsHealth {
    pub tables_checked: Vec<String>,
    pub records: Vec<StatisticsRecord>,
    /// Requested tables with no statistics
    pub skipped_tables: Vec<String>,
    pub needing_update: usize,
}

fn require_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(DoctorError::InvalidInput("Query text is required".to_string()))
    } else {
        Ok(trimmed)
    }
}

impl DoctorTools {
    /// Runs `query` with actual-plan capture and classifies its bottleneck
    #[tracing::instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn analyze_query_performance(
        &self,
        query: &str,
        database: Option<&str>,
    ) -> ToolResponse<PerformanceAnalysis> {
        respond(
            "analyze_query_performance",
            self.performance(query, database).await,
        )
    }

    /// Scans `query` for antipatterns, optionally with its estimated plan
    #[tracing::instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn detect_query_antipatterns(
        &self,
        query: &str,
        include_plan: bool,
    ) -> ToolResponse<AntipatternAnalysis> {
        respond(
            "detect_query_antipatterns",
            self.antipatterns(query, include_plan).await,
        )
    }

    /// Missing-index recommendations from the DMVs and, given a query, from
    /// its estimated plan; plus index usage review
    #[tracing::instrument(skip(self, query))]
    pub async fn recommend_missing_indexes(&self, query: Option<&str>) -> ToolResponse<IndexAdvice> {
        respond("recommend_missing_indexes", self.index_advice(query).await)
    }

    /// Statistics freshness for `tables`, or for the tables `query` reads
    #[tracing::instrument(skip(self, query))]
    pub async fn check_statistics_health(
        &self,
        tables: Option<Vec<String>>,
        query: Option<&str>,
    ) -> ToolResponse<StatisticsHealth> {
        respond("check_statistics_health", self.statistics(tables, query).await)
    }

    async fn estimated_plan(&self, query: &str) -> Result<PlanParse> {
        let xml = self
            .bounded("estimated plan", self.connection().estimated_plan(query))
            .await?;
        Ok(parse_showplan(xml.as_deref(), self.sink()))
    }

    async fn performance(&self, query: &str, database: Option<&str>) -> Result<PerformanceAnalysis> {
        let query = require_query(query)?;

        let started = Instant::now();
        let capture = self
            .bounded(
                "query execution",
                self.connection().query_with_actual_plan(query, database),
            )
            .await?;
        let wall_clock_ms = started.elapsed().as_millis() as u64;

        let rows_returned = capture.result.rows.len() as u64;
        let parsed = parse_showplan(capture.plan_xml.as_deref(), self.sink());
        let report =
            collect_metrics_with_config(wall_clock_ms, parsed.plan(), rows_returned, self.config());

        tracing::info!(
            duration_ms = report.metrics.duration_ms,
            cpu_ms = report.metrics.cpu_time_ms,
            bottleneck = ?report.bottleneck,
            "query analyzed"
        );

        let plan = parsed.plan();
        Ok(PerformanceAnalysis {
            database: database.map(str::to_string),
            rows_returned,
            metrics: report.metrics,
            cpu_percentage: report.cpu_percentage,
            bottleneck: report.bottleneck,
            bottleneck_description: report.bottleneck.map(|b| b.description().to_string()),
            plan_available: parsed.is_parsed(),
            plan_issue: parsed.no_data_reason().map(ToString::to_string),
            plan_warnings: plan.map(|p| p.warnings.clone()).unwrap_or_default(),
            parallelism: plan.map(|p| p.parallelism).unwrap_or_default(),
            missing_index_count: plan.map(|p| p.missing_indexes.len()).unwrap_or(0),
        })
    }

    async fn antipatterns(&self, query: &str, include_plan: bool) -> Result<AntipatternAnalysis> {
        let query = require_query(query)?;
        let parsed = if include_plan {
            Some(self.estimated_plan(query).await?)
        } else {
            None
        };
        let plan: Option<&ParsedPlan> = parsed.as_ref().and_then(PlanParse::plan);

        let report = AntipatternDetector::with_config(self.config().clone()).detect(query, plan);
        tracing::info!(
            findings = report.findings.len(),
            score = report.complexity_score,
            "antipattern scan complete"
        );
        Ok(AntipatternAnalysis {
            summary: report.summary(),
            report: Some(report),
            plan_used: plan.is_some(),
        })
    }

    async fn index_advice(&self, query: Option<&str>) -> Result<IndexAdvice> {
        let candidates: Vec<DmvIndexCandidate> = self
            .fetch_rows(queries::MISSING_INDEXES, &[])
            .await?
            .iter()
            .filter_map(DmvIndexCandidate::from_row)
            .collect();

        let parsed = match query.map(require_query).transpose()? {
            Some(query) => Some(self.estimated_plan(query).await?),
            None => None,
        };
        let plan = parsed.as_ref().and_then(PlanParse::plan);
        let recommendations =
            MissingIndexAdvisor::with_config(self.config().clone()).recommend(&candidates, plan);

        let usage_rows: Vec<IndexUsageRow> = self
            .fetch_rows(queries::INDEX_USAGE, &[])
            .await?
            .iter()
            .filter_map(IndexUsageRow::from_row)
            .collect();
        let usage = review_index_usage(&usage_rows, self.config());
        let drop_candidates = usage.iter().filter(|u| u.is_drop_candidate()).count();

        tracing::info!(
            recommendations = recommendations.len(),
            drop_candidates,
            "index advice complete"
        );
        Ok(IndexAdvice {
            recommendations,
            usage,
            drop_candidates,
        })
    }

    async fn statistics(
        &self,
        tables: Option<Vec<String>>,
        query: Option<&str>,
    ) -> Result<StatisticsHealth> {
        let requested: Vec<String> = tables
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let tables_checked = if !requested.is_empty() {
            requested
        } else if let Some(query) = query {
            let parsed = self.estimated_plan(require_query(query)?).await?;
            let tables = parsed.plan().map(ParsedPlan::tables).unwrap_or_default();
            if tables.is_empty() {
                return Err(DoctorError::InvalidInput(
                    "No tables could be derived from the query plan".to_string(),
                ));
            }
            tables
        } else {
            return Err(DoctorError::InvalidInput(
                "Provide a table list or a query to derive tables from".to_string(),
            ));
        };

        let mut rows = Vec::new();
        for table in &tables_checked {
            let fetched = self
                .fetch_rows(queries::TABLE_STATISTICS, &[Value::String(table.clone())])
                .await?;
            rows.extend(fetched.iter().filter_map(StatisticsRow::from_row));
        }

        let now = chrono::Utc::now().naive_utc();
        let assessment =
            assess_tables_with_config(&tables_checked, &rows, now, self.sink(), self.config());
        let needing_update = assessment.needing_update().count();

        tracing::info!(
            tables = tables_checked.len(),
            skipped = assessment.skipped_tables.len(),
            needing_update,
            "statistics health complete"
        );
        Ok(StatisticsHealth {
            tables_checked,
            records: assessment.records,
            skipped_tables: assessment.skipped_tables,
            needing_update,
        })
    }
}
