//! Index recommendations
//!
//! Missing-index suggestions from the DMVs and from plans, plus a review of
//! how existing indexes are used.

mod advisor;
mod usage;

pub use advisor::{
    ColumnGroups, DmvIndexCandidate, IndexOrigin, IndexPriority, MissingIndexAdvisor,
    MissingIndexRecommendation, create_index_statement, disjoint_column_groups, dmv_priority,
    index_name, normalize_table_name, plan_priority, quote_table, recommend_from_dmv,
    recommend_from_plan, recommend_missing_indexes, split_dmv_columns,
};
pub use usage::{IndexUsageRecord, IndexUsageRow, review_index_usage};
