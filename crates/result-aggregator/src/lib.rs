//! Result Aggregator
//!
//! Pure assembly of the final [`Report`] from the outputs of the earlier
//! pipeline stages, plus its wire JSON rendering.

pub mod aggregate;
pub mod model;

pub use aggregate::{aggregate, overall_success, summarize};
pub use model::{AiAnalysis, AutomationResults, Report, ReportSummary, TestStrategySection, WireReport};
