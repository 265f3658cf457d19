//! Strongly-typed identifiers (avoid mixing UUIDs arbitrarily).

use uuid::Uuid;

/// User identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

/// Group identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(pub Uuid);

/// Group membership identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MembershipId(pub Uuid);

/// Decision identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DecisionId(pub Uuid);

/// Item (vote candidate) identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ItemId(pub Uuid);

/// Vote identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VoteId(pub Uuid);

/// Selection (favourite) identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SelectionId(pub Uuid);
