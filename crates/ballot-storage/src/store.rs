//! The Store trait that backends implement.

use crate::types::*;
use crate::StoreError;

/// The storage trait `ballot-core` depends on.
///
/// Uniqueness of (group, user) memberships, (item, user) votes and
/// (decision, item) selections must be enforced by the backend's schema, not
/// by read-then-write checks: racing creates have exactly one winner and the
/// loser gets [`StoreError::AlreadyExists`].
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ───────────────────────────────────── Users ──────────────────────────────────────────

    /// Create a new user.
    async fn create_user(&self, params: &CreateUserParams) -> Result<User, StoreError>;

    /// Get user by ID.
    async fn get_user(&self, user_id: &UserId) -> Result<User, StoreError>;

    // ───────────────────────────────────── Groups ─────────────────────────────────────────

    /// Create a group and, atomically, the creator's confirmed admin membership.
    async fn create_group(
        &self,
        params: &CreateGroupParams,
    ) -> Result<(Group, GroupMembership), StoreError>;

    /// Get group by ID.
    async fn get_group(&self, group_id: &GroupId) -> Result<Group, StoreError>;

    // ─────────────────────────────────── Memberships ──────────────────────────────────────

    /// Create a pending membership. `AlreadyExists` if the pair already has a row,
    /// whatever its status.
    async fn create_membership(
        &self,
        params: &CreateMembershipParams,
    ) -> Result<GroupMembership, StoreError>;

    /// Get membership by ID.
    async fn get_membership(
        &self,
        membership_id: &MembershipId,
    ) -> Result<GroupMembership, StoreError>;

    /// Get the membership row for a (group, user) pair.
    async fn get_membership_for(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<GroupMembership, StoreError>;

    /// Apply a state machine edge as one conditional update.
    ///
    /// Only succeeds while the row still has `transition.from_status()` and the
    /// given type; otherwise `Conflict` (or `NotFound` if the row is gone).
    async fn transition_membership(
        &self,
        membership_id: &MembershipId,
        membership_type: MembershipType,
        transition: MembershipTransition,
    ) -> Result<GroupMembership, StoreError>;

    /// Remove a rejected membership of the given type. `Conflict` if the row is
    /// no longer rejected.
    async fn delete_membership(
        &self,
        membership_id: &MembershipId,
        membership_type: MembershipType,
    ) -> Result<(), StoreError>;

    /// Change the role of a confirmed membership, as one conditional write.
    ///
    /// Only applies while `acting_admin` is still a confirmed admin of the row's
    /// group and, when the row is an admin being demoted, while the group keeps
    /// another confirmed admin. Otherwise `Conflict` (or `NotFound` if the row
    /// is gone).
    async fn set_membership_role(
        &self,
        membership_id: &MembershipId,
        role: Role,
        acting_admin: &UserId,
    ) -> Result<GroupMembership, StoreError>;

    /// List memberships matching a filter, in creation order.
    async fn list_memberships(
        &self,
        filter: &MembershipFilter,
    ) -> Result<Vec<GroupMembership>, StoreError>;

    // ─────────────────────────────────── Decisions ────────────────────────────────────────

    /// Create a decision.
    async fn create_decision(&self, params: &CreateDecisionParams)
        -> Result<Decision, StoreError>;

    /// Get decision by ID.
    async fn get_decision(&self, decision_id: &DecisionId) -> Result<Decision, StoreError>;

    /// Move a decision from `from` to `to`. `Conflict` if it is no longer in `from`.
    async fn set_decision_status(
        &self,
        decision_id: &DecisionId,
        from: DecisionStatus,
        to: DecisionStatus,
    ) -> Result<Decision, StoreError>;

    // ───────────────────────────────────── Items ──────────────────────────────────────────

    /// Create an item within a decision.
    async fn create_item(&self, params: &CreateItemParams) -> Result<Item, StoreError>;

    /// Get item by ID.
    async fn get_item(&self, item_id: &ItemId) -> Result<Item, StoreError>;

    // ───────────────────────────────────── Votes ──────────────────────────────────────────

    /// Upsert the (item, user) vote and evaluate the item in the same transaction.
    ///
    /// Either both the vote and any resulting selection are committed, or neither is.
    async fn cast_vote(&self, params: &CastVoteParams) -> Result<(Vote, Evaluation), StoreError>;

    /// Evaluate an item without writing a vote.
    async fn evaluate_item(&self, item_id: &ItemId) -> Result<Evaluation, StoreError>;

    // ─────────────────────────────────── Selections ───────────────────────────────────────

    /// List all selections of a decision, in insertion order.
    async fn list_selections(&self, decision_id: &DecisionId)
        -> Result<Vec<Selection>, StoreError>;
}
