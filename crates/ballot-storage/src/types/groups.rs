//! Group types.

use chrono::{DateTime, Utc};

use super::{GroupId, UserId};

/// Group record
#[derive(Clone, Debug)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a group.
///
/// The creator becomes a confirmed admin of the new group in the same transaction.
#[derive(Clone, Debug)]
pub struct CreateGroupParams {
    pub name: String,
    pub description: Option<String>,
    pub created_by: UserId,
}
