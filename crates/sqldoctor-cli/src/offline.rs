//! Analysis of saved plans and query text, without a server

use serde::Serialize;
use sqldoctor_analyzer::{
    AnalyzerConfig, AntipatternDetector, AntipatternReport, Bottleneck, ExecutionMetrics,
    MissingIndexAdvisor, MissingIndexRecommendation, ParallelismInfo, PlanOperator, PlanWarning,
    collect_metrics_with_config, parse_showplan,
};
use sqldoctor_core::DiagnosticSink;
use sqldoctor_monitor::AntipatternAnalysis;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanReport {
    pub plan_available: bool,
    pub plan_issue: Option<String>,
    pub metrics: ExecutionMetrics,
    pub cpu_percentage: f64,
    pub bottleneck: Option<Bottleneck>,
    pub warnings: Vec<PlanWarning>,
    pub parallelism: ParallelismInfo,
    pub tables: Vec<String>,
    /// Operators costing at least one percent of the statement
    pub costly_operators: Vec<PlanOperator>,
    pub index_recommendations: Vec<MissingIndexRecommendation>,
    pub antipatterns: Option<AntipatternReport>,
}

/// Parses `xml` and reports metrics, warnings and index hints; with `query`,
/// also runs antipattern detection against the plan
pub fn analyze_plan(
    xml: &str,
    query: Option<&str>,
    wall_clock_ms: u64,
    config: &AnalyzerConfig,
    sink: &dyn DiagnosticSink,
) -> PlanReport {
    let parsed = parse_showplan(Some(xml), sink);
    let plan = parsed.plan();
    let metrics = collect_metrics_with_config(wall_clock_ms, plan, 0, config);

    let mut costly_operators: Vec<PlanOperator> = plan
        .map(|p| p.operators.iter().filter(|op| op.cost_percent >= 1.0).cloned().collect())
        .unwrap_or_default();
    costly_operators.sort_by(|a, b| b.cost_percent.total_cmp(&a.cost_percent));

    let index_recommendations = plan
        .map(|p| MissingIndexAdvisor::with_config(config.clone()).recommend(&[], Some(p)))
        .unwrap_or_default();

    let antipatterns = query
        .filter(|q| !q.trim().is_empty())
        .map(|q| AntipatternDetector::with_config(config.clone()).detect(q, plan));

    PlanReport {
        plan_available: parsed.is_parsed(),
        plan_issue: parsed.no_data_reason().map(ToString::to_string),
        metrics: metrics.metrics,
        cpu_percentage: metrics.cpu_percentage,
        bottleneck: metrics.bottleneck,
        warnings: plan.map(|p| p.warnings.clone()).unwrap_or_default(),
        parallelism: plan.map(|p| p.parallelism).unwrap_or_default(),
        tables: plan.map(|p| p.tables()).unwrap_or_default(),
        costly_operators,
        index_recommendations,
        antipatterns,
    }
}

/// Text-only antipattern scan
pub fn analyze_query_text(query: &str, config: &AnalyzerConfig) -> AntipatternAnalysis {
    let report = AntipatternDetector::with_config(config.clone()).detect(query, None);
    AntipatternAnalysis {
        summary: report.summary(),
        report: Some(report),
        plan_used: false,
    }
}
