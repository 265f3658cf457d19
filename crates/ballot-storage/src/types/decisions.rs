//! Decisions, their approval rule, and candidate items.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{DecisionId, GroupId, ItemId, ParseValueError, Tally};

/// Lifecycle of a decision. Only `Open` decisions accept votes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecisionStatus {
    Draft,
    Open,
    Closed,
    Archived,
}

impl FromStr for DecisionStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(DecisionStatus::Draft),
            "open" => Ok(DecisionStatus::Open),
            "closed" => Ok(DecisionStatus::Closed),
            "archived" => Ok(DecisionStatus::Archived),
            _ => Err(ParseValueError::new("decision status", s)),
        }
    }
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Draft => "draft",
            DecisionStatus::Open => "open",
            DecisionStatus::Closed => "closed",
            DecisionStatus::Archived => "archived",
        }
    }

    /// Decisions only move forward: draft -> open -> closed -> archived.
    pub fn can_move_to(&self, next: DecisionStatus) -> bool {
        matches!(
            (self, next),
            (DecisionStatus::Draft, DecisionStatus::Open)
                | (DecisionStatus::Open, DecisionStatus::Closed)
                | (DecisionStatus::Closed, DecisionStatus::Archived)
        )
    }

    pub fn accepts_votes(&self) -> bool {
        matches!(self, DecisionStatus::Open)
    }

    pub fn accepts_items(&self) -> bool {
        matches!(self, DecisionStatus::Draft | DecisionStatus::Open)
    }
}

/// Rule validation error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidRule {
    #[error("threshold must be in (0, 1], got {0}")]
    ThresholdOutOfRange(f64),
    #[error("threshold rule requires a value")]
    MissingThreshold,
    #[error("unknown rule kind: {0}")]
    UnknownKind(String),
}

/// Predicate deciding whether an item's approvals make it a favourite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ApprovalRule {
    /// Every confirmed member approves.
    Unanimous,
    /// `approvals / total_members >= value`, value in (0, 1].
    Threshold(f64),
}

impl ApprovalRule {
    pub fn threshold(value: f64) -> Result<Self, InvalidRule> {
        let rule = ApprovalRule::Threshold(value);
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> Result<(), InvalidRule> {
        match *self {
            ApprovalRule::Unanimous => Ok(()),
            // NaN fails both comparisons
            ApprovalRule::Threshold(v) if v > 0.0 && v <= 1.0 => Ok(()),
            ApprovalRule::Threshold(v) => Err(InvalidRule::ThresholdOutOfRange(v)),
        }
    }

    /// Rebuild a rule from its persisted columns.
    pub fn from_parts(kind: &str, value: Option<f64>) -> Result<Self, InvalidRule> {
        match kind {
            "unanimous" => Ok(ApprovalRule::Unanimous),
            "threshold" => {
                ApprovalRule::threshold(value.ok_or(InvalidRule::MissingThreshold)?)
            }
            other => Err(InvalidRule::UnknownKind(other.to_string())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApprovalRule::Unanimous => "unanimous",
            ApprovalRule::Threshold(_) => "threshold",
        }
    }

    pub fn threshold_value(&self) -> Option<f64> {
        match *self {
            ApprovalRule::Unanimous => None,
            ApprovalRule::Threshold(v) => Some(v),
        }
    }

    pub fn is_satisfied(&self, tally: &Tally) -> bool {
        if tally.total_members == 0 {
            return false;
        }
        match *self {
            ApprovalRule::Unanimous => tally.approvals == tally.total_members,
            ApprovalRule::Threshold(v) => tally.approval_ratio() >= v,
        }
    }

    /// Ratio recorded in a selection snapshot (threshold rules only).
    pub fn snapshot_ratio(&self, tally: &Tally) -> Option<f64> {
        match self {
            ApprovalRule::Unanimous => None,
            ApprovalRule::Threshold(_) => Some(tally.approval_ratio()),
        }
    }
}

/// Decision record
#[derive(Clone, Debug)]
pub struct Decision {
    pub id: DecisionId,
    pub group_id: GroupId,
    pub title: String,
    pub rule: ApprovalRule,
    pub status: DecisionStatus,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a decision
#[derive(Clone, Debug)]
pub struct CreateDecisionParams {
    pub group_id: GroupId,
    pub title: String,
    pub rule: ApprovalRule,
    pub status: DecisionStatus,
}

/// Candidate item within a decision
#[derive(Clone, Debug)]
pub struct Item {
    pub id: ItemId,
    pub decision_id: DecisionId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating an item
#[derive(Clone, Debug)]
pub struct CreateItemParams {
    pub decision_id: DecisionId,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(approvals: u32, total_members: u32) -> Tally {
        Tally {
            approvals,
            votes_cast: approvals,
            total_members,
        }
    }

    #[test]
    fn test_unanimous_requires_every_member() {
        let rule = ApprovalRule::Unanimous;
        assert!(!rule.is_satisfied(&tally(3, 4)));
        assert!(rule.is_satisfied(&tally(4, 4)));
    }

    #[test]
    fn test_empty_group_never_satisfies() {
        assert!(!ApprovalRule::Unanimous.is_satisfied(&tally(0, 0)));
        assert!(!ApprovalRule::Threshold(0.5).is_satisfied(&tally(0, 0)));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let rule = ApprovalRule::threshold(0.7).unwrap();
        assert!(!rule.is_satisfied(&tally(6, 10)));
        assert!(rule.is_satisfied(&tally(7, 10)));
        assert!(rule.is_satisfied(&tally(8, 10)));

        let half = ApprovalRule::threshold(0.5).unwrap();
        assert!(!half.is_satisfied(&tally(1, 4)));
        assert!(half.is_satisfied(&tally(2, 4)));
    }

    #[test]
    fn test_threshold_one_behaves_like_unanimous() {
        let rule = ApprovalRule::threshold(1.0).unwrap();
        assert!(!rule.is_satisfied(&tally(4, 5)));
        assert!(rule.is_satisfied(&tally(5, 5)));
    }

    #[test]
    fn test_threshold_range_validation() {
        assert!(ApprovalRule::threshold(0.0).is_err());
        assert!(ApprovalRule::threshold(-0.1).is_err());
        assert!(ApprovalRule::threshold(1.01).is_err());
        assert!(ApprovalRule::threshold(f64::NAN).is_err());
        assert!(ApprovalRule::threshold(f64::MIN_POSITIVE).is_ok());
        assert_eq!(
            ApprovalRule::threshold(2.0).unwrap_err(),
            InvalidRule::ThresholdOutOfRange(2.0)
        );
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(
            ApprovalRule::from_parts("unanimous", None).unwrap(),
            ApprovalRule::Unanimous
        );
        assert_eq!(
            ApprovalRule::from_parts("threshold", Some(0.25)).unwrap(),
            ApprovalRule::Threshold(0.25)
        );
        assert_eq!(
            ApprovalRule::from_parts("threshold", None).unwrap_err(),
            InvalidRule::MissingThreshold
        );
        assert!(matches!(
            ApprovalRule::from_parts("majority", None),
            Err(InvalidRule::UnknownKind(_))
        ));
    }

    #[test]
    fn test_snapshot_ratio_only_for_threshold() {
        assert_eq!(ApprovalRule::Unanimous.snapshot_ratio(&tally(4, 4)), None);
        assert_eq!(
            ApprovalRule::Threshold(0.5).snapshot_ratio(&tally(2, 4)),
            Some(0.5)
        );
    }

    #[test]
    fn test_decision_status_moves_forward_only() {
        use DecisionStatus::*;
        assert!(Draft.can_move_to(Open));
        assert!(Open.can_move_to(Closed));
        assert!(Closed.can_move_to(Archived));
        assert!(!Open.can_move_to(Draft));
        assert!(!Archived.can_move_to(Open));
        assert!(!Draft.can_move_to(Closed));
        assert!(!Open.can_move_to(Open));
    }

    #[test]
    fn test_decision_status_gates() {
        assert!(DecisionStatus::Open.accepts_votes());
        assert!(!DecisionStatus::Draft.accepts_votes());
        assert!(!DecisionStatus::Closed.accepts_votes());
        assert!(DecisionStatus::Draft.accepts_items());
        assert!(!DecisionStatus::Archived.accepts_items());
    }
}
