//! Antipattern Detection Module
//!
//! Scans query text, and optionally a parsed plan, for constructs known to
//! defeat the optimizer:
//! - `SELECT *`
//! - functions wrapping indexed columns in predicates
//! - leading-wildcard `LIKE` patterns
//! - correlated subqueries
//! - aggregates in `WHERE`
//! - columns without statistics (plan only)
//!
//! # Example
//!
//! ```
//! use sqldoctor_analyzer::antipatterns::{detect_antipatterns, AntipatternCategory, RewritePriority};
//!
//! let report = detect_antipatterns("SELECT * FROM Orders WHERE Notes LIKE '%refund%'", None);
//! assert_eq!(report.findings[0].category(), AntipatternCategory::SelectStar);
//! assert_eq!(report.complexity_score, 2.5);
//! assert_eq!(report.rewrite_priority, RewritePriority::High);
//! ```

pub mod detector;
pub mod finding;
pub mod rules;
pub mod text;

pub use detector::{
    AntipatternDetector, BASE_COMPLEXITY, MAX_COMPLEXITY, detect_antipatterns,
    detect_antipatterns_with_config,
};
pub use finding::{
    AntipatternCategory, AntipatternFinding, AntipatternReport, RewritePriority, RuleOutcome,
    Severity,
};
pub use rules::{QueryText, RULES, Rule};
