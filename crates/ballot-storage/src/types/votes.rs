//! Votes and the per-item tally derived from them.

use chrono::{DateTime, Utc};

use super::{ItemId, UserId, VoteId};

/// Lowest accepted rating.
pub const RATING_MIN: u8 = 1;
/// Highest accepted rating.
pub const RATING_MAX: u8 = 5;
/// A rating at or above this counts as an approval.
pub const APPROVAL_RATING_MIN: u8 = 4;

/// Vote record. One per (item, user); changing a vote updates this row.
#[derive(Clone, Debug)]
pub struct Vote {
    pub id: VoteId,
    pub item_id: ItemId,
    pub user_id: UserId,
    pub is_like: Option<bool>,
    pub rating: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vote {
    /// A like, or a rating of at least [`APPROVAL_RATING_MIN`]. Either signal is
    /// enough on its own.
    pub fn is_approval(&self) -> bool {
        self.is_like == Some(true) || self.rating.is_some_and(|r| r >= APPROVAL_RATING_MIN)
    }
}

/// Parameters for casting (or changing) a vote.
#[derive(Clone, Debug)]
pub struct CastVoteParams {
    pub item_id: ItemId,
    pub user_id: UserId,
    pub is_like: Option<bool>,
    pub rating: Option<u8>,
}

/// Vote counts for one item at evaluation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Tally {
    pub approvals: u32,
    /// Informational; the rules only look at approvals and members.
    pub votes_cast: u32,
    /// Confirmed members of the decision's group.
    pub total_members: u32,
}

impl Tally {
    pub fn approval_ratio(&self) -> f64 {
        if self.total_members == 0 {
            0.0
        } else {
            f64::from(self.approvals) / f64::from(self.total_members)
        }
    }
}
