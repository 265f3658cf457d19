//! Selections (favourites) and the result of evaluating an item.

use chrono::{DateTime, Utc};

use super::{ApprovalRule, DecisionId, ItemId, SelectionId, Tally};

/// Frozen vote counts taken when the selection was created.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionSnapshot {
    pub approvals: u32,
    pub total_members: u32,
    pub rule: ApprovalRule,
    /// Present for threshold rules.
    pub ratio: Option<f64>,
}

impl SelectionSnapshot {
    pub fn capture(rule: ApprovalRule, tally: &Tally) -> Self {
        Self {
            approvals: tally.approvals,
            total_members: tally.total_members,
            rule,
            ratio: rule.snapshot_ratio(tally),
        }
    }

    pub fn approval_ratio(&self) -> f64 {
        if self.total_members == 0 {
            0.0
        } else {
            f64::from(self.approvals) / f64::from(self.total_members)
        }
    }
}

/// Selection record. At most one per (decision, item); never updated.
#[derive(Clone, Debug)]
pub struct Selection {
    pub id: SelectionId,
    pub decision_id: DecisionId,
    pub item_id: ItemId,
    pub snapshot: SelectionSnapshot,
    pub selected_at: DateTime<Utc>,
}

/// Outcome of evaluating one item against its decision's rule.
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub item_id: ItemId,
    pub tally: Tally,
    pub satisfied: bool,
    /// The item's selection, whether created now or earlier.
    pub selection: Option<Selection>,
    /// True only for the evaluation that inserted the selection.
    pub newly_selected: bool,
}
