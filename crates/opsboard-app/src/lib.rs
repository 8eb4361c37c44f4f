//! Application layer for the operations dashboard.
//!
//! Free-text intake, board ordering, task/lead filtering and lead analytics,
//! plus the service façade and configuration shared by front ends.

pub mod analytics;
pub mod config;
pub mod filter;
pub mod intake;
pub mod leads;
pub mod ordering;
pub mod service;
pub mod store;

// Re-exports for convenience
pub use analytics::{
    AnalyticsWindow, DailyCount, LatencyUnit, LeadAnalytics, ResponseLatency, compute_analytics,
    compute_custom_analytics,
};
pub use config::ProjectConfig;
pub use filter::{
    AssigneeScope, LeadQuery, LeadQueryBuilder, LeadSort, LeadWindow, QueryBuildError, TaskQuery,
    TaskQueryBuilder, compare_tasks,
};
pub use intake::{IntakeParser, IntakeRequest, IntakeSettings, KeywordIntakeParser};
pub use leads::{LeadBook, StatusChange};
pub use ordering::{BoardLayout, DragOutcome, DragState, DropTarget, SortMode, TaskBoard, ViewMode};
pub use service::DashboardService;
pub use store::RecordStore;
