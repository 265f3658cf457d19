//! Votes, rule evaluation and favourites.
//!
//! A vote write and the evaluation of its item commit together in the store.
//! Votes on the same item are additionally serialized here so each evaluation
//! counts against a settled vote set.

use std::cmp::Ordering;
use std::sync::Arc;

use ballot_events::{EventBus, SelectionEvent};
use ballot_storage::{
    ApprovalRule, CastVoteParams, CreateDecisionParams, CreateItemParams, Decision, DecisionId,
    DecisionStatus, Evaluation, GroupId, Item, ItemId, Selection, Store, UserId, Vote,
    RATING_MAX, RATING_MIN,
};

use crate::error::CoreError;
use crate::locks::KeyedLocks;
use crate::membership::{require_admin, require_member};

/// What a member submits for an item. At least one field must be set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VotePayload {
    pub is_like: Option<bool>,
    pub rating: Option<u8>,
}

impl VotePayload {
    pub fn like() -> Self {
        Self {
            is_like: Some(true),
            rating: None,
        }
    }

    pub fn dislike() -> Self {
        Self {
            is_like: Some(false),
            rating: None,
        }
    }

    pub fn rating(rating: u8) -> Self {
        Self {
            is_like: None,
            rating: Some(rating),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.is_like.is_none() && self.rating.is_none() {
            return Err(CoreError::InvalidArgument(
                "a vote needs a like or a rating".into(),
            ));
        }
        if let Some(r) = self.rating {
            if !(RATING_MIN..=RATING_MAX).contains(&r) {
                return Err(CoreError::InvalidArgument(format!(
                    "rating must be between {RATING_MIN} and {RATING_MAX}, got {r}"
                )));
            }
        }
        Ok(())
    }
}

/// Ordering for [`ApprovalService::list_favourites`]. Both are descending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FavouriteSort {
    #[default]
    SelectedAt,
    ApprovalRatio,
}

/// Result of a vote: the stored vote and the evaluation it triggered.
#[derive(Clone, Debug)]
pub struct VoteOutcome {
    pub vote: Vote,
    pub evaluation: Evaluation,
}

pub struct ApprovalService<S: Store> {
    store: Arc<S>,
    events: Option<Arc<dyn EventBus>>,
    item_locks: KeyedLocks<ItemId>,
}

impl<S: Store> ApprovalService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            events: None,
            item_locks: KeyedLocks::new(),
        }
    }

    /// Publish a [`SelectionEvent`] for every newly created selection.
    pub fn with_events(mut self, events: Arc<dyn EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    // ───────────────────────────── Decisions ─────────────────────────────

    /// Create a draft decision. Only group admins can.
    pub async fn create_decision(
        &self,
        group_id: &GroupId,
        title: &str,
        rule: ApprovalRule,
        acting_admin: &UserId,
    ) -> Result<Decision, CoreError> {
        rule.validate()
            .map_err(|e| CoreError::InvalidArgument(e.to_string()))?;
        let title = non_empty_title(title)?;

        self.store
            .get_group(group_id)
            .await
            .map_err(CoreError::store("group"))?;
        require_admin(self.store.as_ref(), group_id, acting_admin).await?;

        let decision = self
            .store
            .create_decision(&CreateDecisionParams {
                group_id: group_id.clone(),
                title,
                rule,
                status: DecisionStatus::Draft,
            })
            .await
            .map_err(CoreError::store("decision"))?;

        tracing::info!(
            decision_id = %decision.id.0,
            group_id = %group_id.0,
            rule = rule.kind(),
            threshold = ?rule.threshold_value(),
            "Decision created"
        );
        Ok(decision)
    }

    /// Move a decision one step forward: draft -> open -> closed -> archived.
    pub async fn set_decision_status(
        &self,
        decision_id: &DecisionId,
        status: DecisionStatus,
        acting_admin: &UserId,
    ) -> Result<Decision, CoreError> {
        let decision = self.get_decision(decision_id).await?;
        require_admin(self.store.as_ref(), &decision.group_id, acting_admin).await?;

        if !decision.status.can_move_to(status) {
            return Err(CoreError::InvalidState(format!(
                "decision cannot move from {} to {}",
                decision.status.as_str(),
                status.as_str()
            )));
        }

        let updated = self
            .store
            .set_decision_status(decision_id, decision.status, status)
            .await
            .map_err(CoreError::store("decision"))?;

        tracing::info!(
            decision_id = %decision_id.0,
            from = decision.status.as_str(),
            to = status.as_str(),
            "Decision status changed"
        );
        Ok(updated)
    }

    /// Add a candidate item. Any confirmed member can, while the decision is draft or open.
    pub async fn add_item(
        &self,
        decision_id: &DecisionId,
        title: &str,
        actor: &UserId,
    ) -> Result<Item, CoreError> {
        let title = non_empty_title(title)?;
        let decision = self.get_decision(decision_id).await?;
        require_member(self.store.as_ref(), &decision.group_id, actor).await?;

        if !decision.status.accepts_items() {
            return Err(CoreError::InvalidState(format!(
                "items cannot be added to a {} decision",
                decision.status.as_str()
            )));
        }

        let item = self
            .store
            .create_item(&CreateItemParams {
                decision_id: decision_id.clone(),
                title,
            })
            .await
            .map_err(CoreError::store("item"))?;

        tracing::info!(item_id = %item.id.0, decision_id = %decision_id.0, "Item added");
        Ok(item)
    }

    // ───────────────────────────── Votes ─────────────────────────────

    /// Record (or change) `user_id`'s vote on an item and evaluate the item.
    ///
    /// The evaluation may create the item's selection; an existing selection is
    /// never removed, whatever the vote.
    pub async fn cast_vote(
        &self,
        item_id: &ItemId,
        user_id: &UserId,
        payload: VotePayload,
    ) -> Result<VoteOutcome, CoreError> {
        payload.validate()?;

        let item = self
            .store
            .get_item(item_id)
            .await
            .map_err(CoreError::store("item"))?;
        let decision = self.get_decision(&item.decision_id).await?;
        require_member(self.store.as_ref(), &decision.group_id, user_id).await?;

        if !decision.status.accepts_votes() {
            return Err(CoreError::InvalidState(format!(
                "votes are not accepted on a {} decision",
                decision.status.as_str()
            )));
        }

        let (vote, evaluation) = {
            let _guard = self.item_locks.lock(item_id).await;
            self.store
                .cast_vote(&CastVoteParams {
                    item_id: item_id.clone(),
                    user_id: user_id.clone(),
                    is_like: payload.is_like,
                    rating: payload.rating,
                })
                .await
                .map_err(CoreError::store("vote"))?
        };

        tracing::debug!(
            item_id = %item_id.0,
            user_id = %user_id.0,
            approvals = evaluation.tally.approvals,
            total_members = evaluation.tally.total_members,
            satisfied = evaluation.satisfied,
            "Vote recorded"
        );
        self.after_evaluation(&evaluation).await;

        Ok(VoteOutcome { vote, evaluation })
    }

    /// Evaluate an item without writing a vote.
    pub async fn reevaluate(&self, item_id: &ItemId) -> Result<Evaluation, CoreError> {
        let evaluation = {
            let _guard = self.item_locks.lock(item_id).await;
            self.store
                .evaluate_item(item_id)
                .await
                .map_err(CoreError::store("item"))?
        };

        tracing::debug!(
            item_id = %item_id.0,
            approvals = evaluation.tally.approvals,
            total_members = evaluation.tally.total_members,
            satisfied = evaluation.satisfied,
            "Item re-evaluated"
        );
        self.after_evaluation(&evaluation).await;

        Ok(evaluation)
    }

    async fn after_evaluation(&self, evaluation: &Evaluation) {
        if !evaluation.newly_selected {
            return;
        }
        let Some(selection) = &evaluation.selection else {
            return;
        };

        tracing::info!(
            selection_id = %selection.id.0,
            decision_id = %selection.decision_id.0,
            item_id = %selection.item_id.0,
            approvals = selection.snapshot.approvals,
            total_members = selection.snapshot.total_members,
            "Item selected as favourite"
        );

        if let Some(events) = &self.events {
            // The selection is committed; a lost notification is recoverable via list_favourites.
            if let Err(e) = events
                .publish(&selection.decision_id, SelectionEvent::from(selection))
                .await
            {
                tracing::warn!(
                    decision_id = %selection.decision_id.0,
                    item_id = %selection.item_id.0,
                    error = %e,
                    "Failed to publish selection event"
                );
            }
        }
    }

    // ───────────────────────────── Queries ─────────────────────────────

    pub async fn list_favourites(
        &self,
        decision_id: &DecisionId,
        sort: FavouriteSort,
    ) -> Result<Vec<Selection>, CoreError> {
        self.get_decision(decision_id).await?;

        let mut selections = self
            .store
            .list_selections(decision_id)
            .await
            .map_err(CoreError::store("selection"))?;

        sort_favourites(&mut selections, sort);
        Ok(selections)
    }

    async fn get_decision(&self, decision_id: &DecisionId) -> Result<Decision, CoreError> {
        self.store
            .get_decision(decision_id)
            .await
            .map_err(CoreError::store("decision"))
    }
}

fn sort_favourites(selections: &mut [Selection], sort: FavouriteSort) {
    match sort {
        FavouriteSort::SelectedAt => {
            selections.sort_by(|a, b| b.selected_at.cmp(&a.selected_at));
        }
        FavouriteSort::ApprovalRatio => selections.sort_by(|a, b| {
            match b
                .snapshot
                .approval_ratio()
                .total_cmp(&a.snapshot.approval_ratio())
            {
                Ordering::Equal => b.selected_at.cmp(&a.selected_at),
                other => other,
            }
        }),
    }
}

fn non_empty_title(title: &str) -> Result<String, CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidArgument("title must not be empty".into()));
    }
    Ok(trimmed.to_string())
}
