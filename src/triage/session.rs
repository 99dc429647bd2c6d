//! Keep/delete review of one month.
//!
//! # Overview
//!
//! A [`TriageSession`] walks a [`SwipeMonth`] one asset at a time. Each
//! decision is recorded in a ledger and pushed on an undo history. Nothing
//! is deleted until [`TriageSession::commit`] hands every asset marked
//! [`Decision::Delete`] to an [`AssetDeleter`] in one batch.
//!
//! # States
//!
//! - `Idle` until [`start`](TriageSession::start)
//! - `Reviewing { index }` while an undecided asset is current
//! - `Exhausted` once every asset has a decision
//! - `Deleting` between [`begin_commit`](TriageSession::begin_commit) and
//!   [`finish_commit`](TriageSession::finish_commit); decisions and undo are
//!   ignored here
//!
//! # Example
//!
//! ```
//! use photoprune::triage::{Decision, SwipeAsset, SwipeMonth, TriageSession};
//!
//! let month = SwipeMonth::new(
//!     "unknown",
//!     "Unknown",
//!     vec![SwipeAsset::new("a", None), SwipeAsset::new("b", None)],
//! );
//! let mut session = TriageSession::new(month);
//! session.start();
//!
//! session.decide(Decision::Delete);
//! assert_eq!(session.current().map(|a| a.id.as_str()), Some("b"));
//! assert_eq!(session.pending_deletion_count(), 1);
//!
//! session.undo();
//! assert_eq!(session.current().map(|a| a.id.as_str()), Some("a"));
//! assert_eq!(session.pending_deletion_count(), 0);
//! ```

use std::collections::HashMap;
use std::fmt;

use super::months::{MonthSummary, SwipeAsset, SwipeMonth};
use crate::actions::delete::DeleteError;
use crate::index::AssetId;
use crate::library::AssetDeleter;

/// Number of upcoming assets returned by [`TriageSession::preview`].
pub const PREVIEW_LIMIT: usize = 8;

/// Message shown when a commit finds nothing to delete.
pub const NOTHING_PENDING_MESSAGE: &str = "No photos marked for deletion.";

/// A review decision for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Keep the asset
    Keep,
    /// Mark the asset for deletion
    Delete,
}

/// Review progress of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageState {
    /// Not started
    Idle,
    /// Reviewing the asset at `index`
    Reviewing {
        /// Position of the current asset in the month
        index: usize,
    },
    /// Every asset has a decision
    Exhausted,
    /// A commit is waiting for the deleter
    Deleting,
}

impl TriageState {
    /// Check if a decision can be recorded in this state.
    #[must_use]
    pub fn is_reviewing(&self) -> bool {
        matches!(self, Self::Reviewing { .. })
    }
}

/// A batch handed out by [`TriageSession::begin_commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRequest {
    ids: Vec<AssetId>,
    resume: TriageState,
    current: Option<AssetId>,
}

impl DeletionRequest {
    /// Assets to delete, sorted.
    #[must_use]
    pub fn ids(&self) -> &[AssetId] {
        &self.ids
    }
}

/// Result of a commit.
#[derive(Debug)]
pub enum CommitOutcome {
    /// No asset was marked for deletion.
    NothingPending,
    /// Another commit has not finished yet.
    InProgress,
    /// The assets were deleted and removed from the month.
    Deleted {
        /// Number of deleted assets
        count: usize,
    },
    /// The deleter failed; the session is unchanged.
    Failed(DeleteError),
}

impl CommitOutcome {
    /// Check if the commit deleted anything.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted { .. })
    }

    /// User-facing description of the outcome.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::NothingPending => NOTHING_PENDING_MESSAGE.to_string(),
            Self::InProgress => "A deletion is already in progress.".to_string(),
            Self::Deleted { count } => format!("Deleted {} photos.", count),
            Self::Failed(err) => format!("Deletion failed: {}", err),
        }
    }
}

impl fmt::Display for CommitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Keep/delete review over one month.
#[derive(Debug, Clone)]
pub struct TriageSession {
    month: SwipeMonth,
    state: TriageState,
    ledger: HashMap<AssetId, Decision>,
    history: Vec<AssetId>,
    status: String,
}

impl TriageSession {
    /// Create an idle session over `month`.
    #[must_use]
    pub fn new(month: SwipeMonth) -> Self {
        Self {
            month,
            state: TriageState::Idle,
            ledger: HashMap::new(),
            history: Vec::new(),
            status: String::new(),
        }
    }

    /// Begin reviewing from the first asset with an empty ledger.
    pub fn start(&mut self) {
        if self.state == TriageState::Deleting {
            return;
        }
        self.ledger.clear();
        self.history.clear();
        self.status.clear();
        self.state = if self.month.is_empty() {
            TriageState::Exhausted
        } else {
            TriageState::Reviewing { index: 0 }
        };
    }

    /// Discard every decision and start over.
    pub fn restart(&mut self) {
        self.start();
    }

    /// The month under review.
    #[must_use]
    pub fn month(&self) -> &SwipeMonth {
        &self.month
    }

    /// Give the (possibly shrunk) month back.
    #[must_use]
    pub fn into_month(self) -> SwipeMonth {
        self.month
    }

    /// Current review state.
    #[must_use]
    pub fn state(&self) -> TriageState {
        self.state
    }

    /// The asset awaiting a decision.
    #[must_use]
    pub fn current(&self) -> Option<&SwipeAsset> {
        match self.state {
            TriageState::Reviewing { index } => self.month.assets.get(index),
            _ => None,
        }
    }

    /// Record a decision for the current asset and move to the next
    /// undecided one after it.
    pub fn decide(&mut self, decision: Decision) {
        let TriageState::Reviewing { index } = self.state else {
            return;
        };
        let Some(asset) = self.month.assets.get(index) else {
            return;
        };
        let id = asset.id.clone();
        self.ledger.insert(id.clone(), decision);
        self.history.push(id);

        self.state = match self.next_undecided_from(index + 1) {
            Some(next) => TriageState::Reviewing { index: next },
            None => TriageState::Exhausted,
        };
    }

    /// Revert the most recent decision and return to that asset.
    pub fn undo(&mut self) {
        if self.state == TriageState::Deleting {
            return;
        }
        let Some(last) = self.history.pop() else {
            return;
        };
        self.ledger.remove(&last);
        match self.month.position(&last) {
            Some(index) => self.state = TriageState::Reviewing { index },
            None => self.relocate(0),
        }
    }

    /// The decision recorded for `id`, if any.
    #[must_use]
    pub fn decision_for(&self, id: &AssetId) -> Option<Decision> {
        self.ledger.get(id).copied()
    }

    /// Assets marked for deletion, sorted.
    #[must_use]
    pub fn pending_deletions(&self) -> Vec<AssetId> {
        let mut ids: Vec<AssetId> = self
            .ledger
            .iter()
            .filter(|(_, d)| **d == Decision::Delete)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Number of assets marked for deletion.
    #[must_use]
    pub fn pending_deletion_count(&self) -> usize {
        self.ledger
            .values()
            .filter(|d| **d == Decision::Delete)
            .count()
    }

    /// Number of assets without a decision.
    #[must_use]
    pub fn undecided_count(&self) -> usize {
        self.month
            .assets
            .iter()
            .filter(|a| !self.ledger.contains_key(&a.id))
            .count()
    }

    /// Check if there is a decision to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Up to [`PREVIEW_LIMIT`] undecided assets after the current one.
    #[must_use]
    pub fn preview(&self) -> Vec<&SwipeAsset> {
        let TriageState::Reviewing { index } = self.state else {
            return Vec::new();
        };
        self.month
            .assets
            .iter()
            .skip(index + 1)
            .filter(|a| !self.ledger.contains_key(&a.id))
            .take(PREVIEW_LIMIT)
            .collect()
    }

    /// Summary row for the month list.
    #[must_use]
    pub fn summary(&self) -> MonthSummary {
        MonthSummary {
            key: self.month.key.clone(),
            title: self.month.title.clone(),
            total_count: self.month.len(),
            pending_deletion_count: self.pending_deletion_count(),
        }
    }

    /// Last status line, empty when there is nothing to report.
    #[must_use]
    pub fn status_message(&self) -> &str {
        &self.status
    }

    /// Delete every asset marked for deletion through `deleter`.
    ///
    /// On success the assets leave the month, the ledger and the undo
    /// history. On failure nothing changes except the status message.
    pub fn commit(&mut self, deleter: &dyn AssetDeleter) -> CommitOutcome {
        match self.begin_commit() {
            Ok(request) => {
                let result = deleter.delete_assets(request.ids());
                self.finish_commit(request, result)
            }
            Err(outcome) => outcome,
        }
    }

    /// First half of a commit: enter `Deleting` and hand out the batch.
    ///
    /// # Errors
    ///
    /// Returns [`CommitOutcome::NothingPending`] when no asset is marked and
    /// [`CommitOutcome::InProgress`] when a batch is already out.
    pub fn begin_commit(&mut self) -> Result<DeletionRequest, CommitOutcome> {
        if self.state == TriageState::Deleting {
            return Err(CommitOutcome::InProgress);
        }
        let ids = self.pending_deletions();
        if ids.is_empty() {
            self.status = NOTHING_PENDING_MESSAGE.to_string();
            return Err(CommitOutcome::NothingPending);
        }

        let request = DeletionRequest {
            current: self.current().map(|a| a.id.clone()),
            resume: self.state,
            ids,
        };
        self.status = format!("Deleting {} photos…", request.ids.len());
        self.state = TriageState::Deleting;
        log::debug!(
            "Committing {} deletion(s) in {}",
            request.ids.len(),
            self.month.key
        );
        Ok(request)
    }

    /// Second half of a commit: apply the deleter's result.
    pub fn finish_commit(
        &mut self,
        request: DeletionRequest,
        result: Result<(), DeleteError>,
    ) -> CommitOutcome {
        let outcome = match result {
            Ok(()) => {
                let count = request.ids.len();
                self.month.remove_assets(&request.ids);
                self.history.retain(|id| !request.ids.contains(id));
                self.ledger.retain(|id, _| !request.ids.contains(id));

                let anchor = request
                    .current
                    .as_ref()
                    .and_then(|id| self.month.position(id));
                match (request.resume, anchor) {
                    (TriageState::Idle, _) => self.state = TriageState::Idle,
                    (_, Some(index)) => self.state = TriageState::Reviewing { index },
                    (TriageState::Reviewing { index }, None) => self.relocate(index),
                    _ => self.relocate(0),
                }
                log::info!("Deleted {} asset(s) from {}", count, self.month.key);
                CommitOutcome::Deleted { count }
            }
            Err(err) => {
                log::warn!("Deletion failed in {}: {}", self.month.key, err);
                self.state = request.resume;
                CommitOutcome::Failed(err)
            }
        };
        self.status = outcome.message();
        outcome
    }

    fn next_undecided_from(&self, start: usize) -> Option<usize> {
        (start..self.month.len()).find(|&i| !self.ledger.contains_key(&self.month.assets[i].id))
    }

    /// Move to the first undecided asset at or after `index` (clamped), else
    /// the first undecided asset overall, else `Exhausted`.
    fn relocate(&mut self, index: usize) {
        let start = index.min(self.month.len().saturating_sub(1));
        let found = self
            .next_undecided_from(start)
            .or_else(|| self.next_undecided_from(0));
        self.state = match found {
            Some(index) => TriageState::Reviewing { index },
            None => TriageState::Exhausted,
        };
    }
}
