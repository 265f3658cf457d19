//! ballot-core - group membership lifecycle and approval evaluation.
//!
//! Two services sit on top of a [`ballot_storage::Store`]:
//!
//! - [`MembershipService`]: invitations and join requests through
//!   pending -> confirmed / rejected, resend and delete.
//! - [`ApprovalService`]: decisions, items and votes. Every vote re-evaluates
//!   its item and promotes it to a favourite (a `Selection`) exactly once when
//!   the decision's rule is first satisfied.
//!
//! ```ignore
//! let config = BallotConfig::from_env()?;
//! telemetry::init_tracing(&config);
//! let store = Arc::new(SqliteStore::open_with(&config.database_url, config.max_connections).await?);
//!
//! let members = MembershipService::new(store.clone());
//! let approvals = ApprovalService::new(store).with_events(Arc::new(MemoryEventBus::new()));
//! ```

pub mod approval;
pub mod config;
pub mod error;
mod locks;
pub mod membership;
pub mod telemetry;

pub use approval::{ApprovalService, FavouriteSort, VoteOutcome, VotePayload};
pub use config::{BallotConfig, ConfigError};
pub use error::{CoreError, ErrorKind};
pub use membership::{InvitationResponse, JoinRequestResponse, MembershipService};
