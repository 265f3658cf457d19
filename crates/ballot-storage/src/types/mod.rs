//! Type definitions for ballot storage.

mod decisions;
mod groups;
mod ids;
mod memberships;
mod selections;
mod users;
mod votes;

// Re-export all types from submodules
pub use decisions::*;
pub use groups::*;
pub use ids::*;
pub use memberships::*;
pub use selections::*;
pub use users::*;
pub use votes::*;

/// Error for text columns that don't map onto a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseValueError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseValueError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
