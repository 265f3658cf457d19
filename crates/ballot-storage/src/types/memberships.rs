//! Group membership types and the invitation/request state machine.
//!
//! ```text
//! pending   --confirm-->  confirmed   (sets confirmed_at)
//! pending   --reject-->   rejected    (sets rejected_at)
//! rejected  --resend-->   pending     (refreshes invited_at, clears rejected_at)
//! rejected  --delete-->   <removed>
//! ```
//!
//! `confirmed` is terminal. Every row starts out `pending`.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::{GroupId, MembershipId, ParseValueError, UserId};

/// Role of a user within a group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Member,
}

impl FromStr for Role {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            _ => Err(ParseValueError::new("role", s)),
        }
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

/// Who initiated a membership. Immutable once the row exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MembershipType {
    /// Admin-initiated
    Invitation,
    /// User-initiated
    Request,
}

impl FromStr for MembershipType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invitation" => Ok(MembershipType::Invitation),
            "request" => Ok(MembershipType::Request),
            _ => Err(ParseValueError::new("membership type", s)),
        }
    }
}

impl MembershipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipType::Invitation => "invitation",
            MembershipType::Request => "request",
        }
    }
}

/// Membership status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MembershipStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl FromStr for MembershipStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MembershipStatus::Pending),
            "confirmed" => Ok(MembershipStatus::Confirmed),
            "rejected" => Ok(MembershipStatus::Rejected),
            _ => Err(ParseValueError::new("membership status", s)),
        }
    }
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Confirmed => "confirmed",
            MembershipStatus::Rejected => "rejected",
        }
    }

    /// Whether the row may be removed in this status.
    pub fn is_deletable(&self) -> bool {
        matches!(self, MembershipStatus::Rejected)
    }
}

/// A status-changing edge of the membership state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MembershipTransition {
    /// Accept an invitation / approve a join request.
    Confirm,
    /// Decline an invitation / reject a join request.
    Reject,
    /// Put a rejected row back to pending.
    Resend,
}

impl MembershipTransition {
    /// Status the row must be in for the transition to apply.
    pub fn from_status(&self) -> MembershipStatus {
        match self {
            MembershipTransition::Confirm | MembershipTransition::Reject => {
                MembershipStatus::Pending
            }
            MembershipTransition::Resend => MembershipStatus::Rejected,
        }
    }

    /// Status after the transition.
    pub fn to_status(&self) -> MembershipStatus {
        match self {
            MembershipTransition::Confirm => MembershipStatus::Confirmed,
            MembershipTransition::Reject => MembershipStatus::Rejected,
            MembershipTransition::Resend => MembershipStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipTransition::Confirm => "confirm",
            MembershipTransition::Reject => "reject",
            MembershipTransition::Resend => "resend",
        }
    }
}

/// Group membership record. Exactly one per (group, user).
#[derive(Clone, Debug)]
pub struct GroupMembership {
    pub id: MembershipId,
    pub group_id: GroupId,
    pub user_id: UserId,
    pub role: Role,
    pub membership_type: MembershipType,
    pub status: MembershipStatus,
    /// Invited (invitation) or requested (request) at; refreshed on resend.
    pub invited_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl GroupMembership {
    /// Confirmed admin of the row's group.
    pub fn is_confirmed_admin(&self) -> bool {
        self.status == MembershipStatus::Confirmed && self.role == Role::Admin
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == MembershipStatus::Confirmed
    }

    /// Whether `transition` is a legal edge from the row's current status.
    pub fn allows(&self, transition: MembershipTransition) -> bool {
        self.status == transition.from_status()
    }
}

/// Parameters for creating a pending membership
#[derive(Clone, Debug)]
pub struct CreateMembershipParams {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub role: Role,
    pub membership_type: MembershipType,
}

/// Filter for listing memberships. `None` fields match anything.
#[derive(Clone, Debug, Default)]
pub struct MembershipFilter {
    pub group_id: Option<GroupId>,
    pub user_id: Option<UserId>,
    pub membership_type: Option<MembershipType>,
    pub status: Option<MembershipStatus>,
    pub role: Option<Role>,
}

impl MembershipFilter {
    pub fn for_group(group_id: &GroupId) -> Self {
        Self {
            group_id: Some(group_id.clone()),
            ..Default::default()
        }
    }

    pub fn for_user(user_id: &UserId) -> Self {
        Self {
            user_id: Some(user_id.clone()),
            ..Default::default()
        }
    }

    pub fn membership_type(mut self, membership_type: MembershipType) -> Self {
        self.membership_type = Some(membership_type);
        self
    }

    pub fn status(mut self, status: MembershipStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}
