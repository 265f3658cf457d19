//! Invitation and join-request lifecycle.
//!
//! Every mutation is one conditional write in the store; the checks here
//! produce the typed error, the store's status/type guard closes the race.

use std::sync::Arc;

use ballot_storage::{
    CreateGroupParams, CreateMembershipParams, CreateUserParams, Group, GroupId, GroupMembership,
    MembershipFilter, MembershipId, MembershipStatus, MembershipTransition, MembershipType, Role,
    Store, User, UserId,
};

use crate::error::CoreError;

/// Invitee's answer to an invitation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvitationResponse {
    Accept,
    Reject,
}

impl InvitationResponse {
    fn transition(self) -> MembershipTransition {
        match self {
            InvitationResponse::Accept => MembershipTransition::Confirm,
            InvitationResponse::Reject => MembershipTransition::Reject,
        }
    }
}

/// Admin's answer to a join request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinRequestResponse {
    Approve,
    Reject,
}

impl JoinRequestResponse {
    fn transition(self) -> MembershipTransition {
        match self {
            JoinRequestResponse::Approve => MembershipTransition::Confirm,
            JoinRequestResponse::Reject => MembershipTransition::Reject,
        }
    }
}

/// Fails with `Forbidden` unless `user_id` is a confirmed admin of the group.
pub(crate) async fn require_admin<S: Store + ?Sized>(
    store: &S,
    group_id: &GroupId,
    user_id: &UserId,
) -> Result<GroupMembership, CoreError> {
    match store.get_membership_for(group_id, user_id).await {
        Ok(m) if m.is_confirmed_admin() => Ok(m),
        Ok(_) | Err(ballot_storage::StoreError::NotFound) => Err(CoreError::Forbidden(
            "requires a confirmed admin of the group".into(),
        )),
        Err(e) => Err(CoreError::store("membership")(e)),
    }
}

/// Fails with `Forbidden` unless `user_id` is a confirmed member of the group.
pub(crate) async fn require_member<S: Store + ?Sized>(
    store: &S,
    group_id: &GroupId,
    user_id: &UserId,
) -> Result<GroupMembership, CoreError> {
    match store.get_membership_for(group_id, user_id).await {
        Ok(m) if m.is_confirmed() => Ok(m),
        Ok(_) | Err(ballot_storage::StoreError::NotFound) => Err(CoreError::Forbidden(
            "requires a confirmed member of the group".into(),
        )),
        Err(e) => Err(CoreError::store("membership")(e)),
    }
}

pub struct MembershipService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> MembershipService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    // ───────────────────────────── Setup ─────────────────────────────

    pub async fn create_user(&self, display_name: &str) -> Result<User, CoreError> {
        let display_name = non_empty("display name", display_name)?;
        let user = self
            .store
            .create_user(&CreateUserParams { display_name })
            .await
            .map_err(CoreError::store("user"))?;
        tracing::info!(user_id = %user.id.0, "User created");
        Ok(user)
    }

    /// Create a group with `creator` as its first confirmed admin.
    pub async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
        creator: &UserId,
    ) -> Result<(Group, GroupMembership), CoreError> {
        let name = non_empty("group name", name)?;
        self.store
            .get_user(creator)
            .await
            .map_err(CoreError::store("user"))?;

        let (group, admin) = self
            .store
            .create_group(&CreateGroupParams {
                name,
                description: description.map(str::to_string),
                created_by: creator.clone(),
            })
            .await
            .map_err(CoreError::store("group"))?;

        tracing::info!(
            group_id = %group.id.0,
            user_id = %creator.0,
            "Group created"
        );
        Ok((group, admin))
    }

    // ───────────────────────────── Creation ─────────────────────────────

    pub async fn create_invitation(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        acting_admin: &UserId,
    ) -> Result<GroupMembership, CoreError> {
        self.ensure_group_and_user(group_id, user_id).await?;
        require_admin(self.store.as_ref(), group_id, acting_admin).await?;

        self.create_pending(group_id, user_id, MembershipType::Invitation)
            .await
    }

    pub async fn create_join_request(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<GroupMembership, CoreError> {
        self.ensure_group_and_user(group_id, user_id).await?;

        self.create_pending(group_id, user_id, MembershipType::Request)
            .await
    }

    async fn ensure_group_and_user(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<(), CoreError> {
        self.store
            .get_group(group_id)
            .await
            .map_err(CoreError::store("group"))?;
        self.store
            .get_user(user_id)
            .await
            .map_err(CoreError::store("user"))?;
        Ok(())
    }

    async fn create_pending(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        membership_type: MembershipType,
    ) -> Result<GroupMembership, CoreError> {
        // The (group, user) unique constraint is the only duplicate check.
        let membership = self
            .store
            .create_membership(&CreateMembershipParams {
                group_id: group_id.clone(),
                user_id: user_id.clone(),
                role: Role::Member,
                membership_type,
            })
            .await
            .map_err(|e| match e {
                ballot_storage::StoreError::AlreadyExists => CoreError::Conflict(
                    "user already has a membership row for this group".into(),
                ),
                other => CoreError::store("membership")(other),
            })?;

        tracing::info!(
            membership_id = %membership.id.0,
            group_id = %group_id.0,
            user_id = %user_id.0,
            membership_type = membership_type.as_str(),
            "Membership created"
        );
        Ok(membership)
    }

    // ───────────────────────────── Transitions ─────────────────────────────

    pub async fn respond_to_invitation(
        &self,
        membership_id: &MembershipId,
        response: InvitationResponse,
        user_id: &UserId,
    ) -> Result<GroupMembership, CoreError> {
        let membership = self.get(membership_id).await?;
        if &membership.user_id != user_id {
            return Err(CoreError::Forbidden(
                "only the invited user can respond to an invitation".into(),
            ));
        }
        self.apply(&membership, MembershipType::Invitation, response.transition())
            .await
    }

    pub async fn respond_to_join_request(
        &self,
        membership_id: &MembershipId,
        response: JoinRequestResponse,
        acting_admin: &UserId,
    ) -> Result<GroupMembership, CoreError> {
        let membership = self.get(membership_id).await?;
        require_admin(self.store.as_ref(), &membership.group_id, acting_admin).await?;
        self.apply(&membership, MembershipType::Request, response.transition())
            .await
    }

    /// Put a rejected invitation or request back to pending.
    pub async fn resend(
        &self,
        membership_id: &MembershipId,
        actor: &UserId,
    ) -> Result<GroupMembership, CoreError> {
        let membership = self.get(membership_id).await?;
        self.authorize_initiator(&membership, actor).await?;
        self.apply(
            &membership,
            membership.membership_type,
            MembershipTransition::Resend,
        )
        .await
    }

    /// Permanently remove a rejected invitation or request.
    pub async fn delete(&self, membership_id: &MembershipId, actor: &UserId) -> Result<(), CoreError> {
        let membership = self.get(membership_id).await?;
        self.authorize_initiator(&membership, actor).await?;

        if !membership.status.is_deletable() {
            return Err(CoreError::InvalidState(format!(
                "only rejected memberships can be deleted, this one is {}",
                membership.status.as_str()
            )));
        }

        self.store
            .delete_membership(membership_id, membership.membership_type)
            .await
            .map_err(CoreError::store("membership"))?;

        tracing::info!(
            membership_id = %membership_id.0,
            group_id = %membership.group_id.0,
            membership_type = membership.membership_type.as_str(),
            "Membership deleted"
        );
        Ok(())
    }

    /// Change the role of a confirmed member. The last admin cannot be demoted.
    pub async fn set_role(
        &self,
        membership_id: &MembershipId,
        role: Role,
        acting_admin: &UserId,
    ) -> Result<GroupMembership, CoreError> {
        let membership = self.get(membership_id).await?;
        require_admin(self.store.as_ref(), &membership.group_id, acting_admin).await?;

        if !membership.is_confirmed() {
            return Err(CoreError::InvalidState(
                "role can only be changed on a confirmed membership".into(),
            ));
        }
        if membership.role == role {
            return Ok(membership);
        }

        // The store re-checks the actor and the remaining admins in the write.
        let updated = match self
            .store
            .set_membership_role(membership_id, role, acting_admin)
            .await
        {
            Ok(updated) => updated,
            Err(ballot_storage::StoreError::Conflict) => {
                require_admin(self.store.as_ref(), &membership.group_id, acting_admin).await?;
                return Err(CoreError::InvalidState(
                    "cannot demote the last admin of a group".into(),
                ));
            }
            Err(e) => return Err(CoreError::store("membership")(e)),
        };

        tracing::info!(
            membership_id = %membership_id.0,
            group_id = %updated.group_id.0,
            role = role.as_str(),
            "Membership role changed"
        );
        Ok(updated)
    }

    async fn get(&self, membership_id: &MembershipId) -> Result<GroupMembership, CoreError> {
        self.store
            .get_membership(membership_id)
            .await
            .map_err(CoreError::store("membership"))
    }

    /// Invitations are managed by group admins, requests by the requesting user.
    async fn authorize_initiator(
        &self,
        membership: &GroupMembership,
        actor: &UserId,
    ) -> Result<(), CoreError> {
        match membership.membership_type {
            MembershipType::Invitation => {
                require_admin(self.store.as_ref(), &membership.group_id, actor).await?;
            }
            MembershipType::Request => {
                if &membership.user_id != actor {
                    return Err(CoreError::Forbidden(
                        "only the requesting user can manage a join request".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    async fn apply(
        &self,
        membership: &GroupMembership,
        expected_type: MembershipType,
        transition: MembershipTransition,
    ) -> Result<GroupMembership, CoreError> {
        if membership.membership_type != expected_type {
            return Err(CoreError::InvalidState(format!(
                "membership is a {}, not a {}",
                membership.membership_type.as_str(),
                expected_type.as_str()
            )));
        }
        if !membership.allows(transition) {
            return Err(CoreError::InvalidState(format!(
                "cannot {} a {} membership",
                transition.as_str(),
                membership.status.as_str()
            )));
        }

        let updated = self
            .store
            .transition_membership(&membership.id, expected_type, transition)
            .await
            .map_err(CoreError::store("membership"))?;

        tracing::info!(
            membership_id = %updated.id.0,
            group_id = %updated.group_id.0,
            user_id = %updated.user_id.0,
            transition = transition.as_str(),
            status = updated.status.as_str(),
            "Membership transitioned"
        );
        Ok(updated)
    }

    // ───────────────────────────── Queries ─────────────────────────────

    /// The user's own join requests, any status.
    pub async fn list_my_requests(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<GroupMembership>, CoreError> {
        self.list(MembershipFilter::for_user(user_id).membership_type(MembershipType::Request))
            .await
    }

    /// Invitations addressed to the user, any status.
    pub async fn list_my_invitations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<GroupMembership>, CoreError> {
        self.list(MembershipFilter::for_user(user_id).membership_type(MembershipType::Invitation))
            .await
    }

    pub async fn list_group_join_requests(
        &self,
        group_id: &GroupId,
        acting_admin: &UserId,
    ) -> Result<Vec<GroupMembership>, CoreError> {
        self.list_for_admin(
            group_id,
            acting_admin,
            MembershipType::Request,
            MembershipStatus::Pending,
        )
        .await
    }

    pub async fn list_group_rejected_requests(
        &self,
        group_id: &GroupId,
        acting_admin: &UserId,
    ) -> Result<Vec<GroupMembership>, CoreError> {
        self.list_for_admin(
            group_id,
            acting_admin,
            MembershipType::Request,
            MembershipStatus::Rejected,
        )
        .await
    }

    pub async fn list_group_invitations(
        &self,
        group_id: &GroupId,
        acting_admin: &UserId,
    ) -> Result<Vec<GroupMembership>, CoreError> {
        self.list_for_admin(
            group_id,
            acting_admin,
            MembershipType::Invitation,
            MembershipStatus::Pending,
        )
        .await
    }

    pub async fn list_group_rejected_invitations(
        &self,
        group_id: &GroupId,
        acting_admin: &UserId,
    ) -> Result<Vec<GroupMembership>, CoreError> {
        self.list_for_admin(
            group_id,
            acting_admin,
            MembershipType::Invitation,
            MembershipStatus::Rejected,
        )
        .await
    }

    /// Confirmed members; visible to confirmed members only.
    pub async fn list_group_members(
        &self,
        group_id: &GroupId,
        actor: &UserId,
    ) -> Result<Vec<GroupMembership>, CoreError> {
        self.store
            .get_group(group_id)
            .await
            .map_err(CoreError::store("group"))?;
        require_member(self.store.as_ref(), group_id, actor).await?;
        self.list(MembershipFilter::for_group(group_id).status(MembershipStatus::Confirmed))
            .await
    }

    async fn list_for_admin(
        &self,
        group_id: &GroupId,
        acting_admin: &UserId,
        membership_type: MembershipType,
        status: MembershipStatus,
    ) -> Result<Vec<GroupMembership>, CoreError> {
        self.store
            .get_group(group_id)
            .await
            .map_err(CoreError::store("group"))?;
        require_admin(self.store.as_ref(), group_id, acting_admin).await?;
        self.list(
            MembershipFilter::for_group(group_id)
                .membership_type(membership_type)
                .status(status),
        )
        .await
    }

    async fn list(&self, filter: MembershipFilter) -> Result<Vec<GroupMembership>, CoreError> {
        self.store
            .list_memberships(&filter)
            .await
            .map_err(CoreError::store("membership"))
    }
}

fn non_empty(what: &str, value: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(trimmed.to_string())
}
