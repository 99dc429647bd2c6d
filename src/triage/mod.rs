//! Manual photo review.
//!
//! This module provides:
//! - Month partitioning of the library ([`months`])
//! - The keep/delete review state machine ([`session`])
//! - A line-driven review loop for terminals ([`run`])

pub mod months;
pub mod run;
pub mod session;

pub use months::{
    build_months, MonthCatalog, MonthSummary, SwipeAsset, SwipeMonth, UNKNOWN_MONTH_KEY,
    UNKNOWN_MONTH_TITLE,
};
pub use run::{run_triage, TriageCommand, TriageReport};
pub use session::{
    CommitOutcome, Decision, DeletionRequest, TriageSession, TriageState, NOTHING_PENDING_MESSAGE,
    PREVIEW_LIMIT,
};
