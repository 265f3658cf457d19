#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use ballot_core::{
    ApprovalService, BallotConfig, InvitationResponse, MembershipService, VotePayload,
};
use ballot_storage::{ApprovalRule, DecisionStatus, Group, Item, UserId};
use ballot_store_sqlite::SqliteStore;

pub struct Harness {
    pub store: Arc<SqliteStore>,
    pub members: MembershipService<SqliteStore>,
    pub approvals: ApprovalService<SqliteStore>,
}

/// A WAL database file, removed on drop.
pub struct FileDb {
    path: PathBuf,
}

impl FileDb {
    pub fn new() -> Self {
        Self {
            path: std::env::temp_dir().join(format!("ballot-core-{}.db", uuid::Uuid::new_v4())),
        }
    }

    pub fn url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }
}

impl Drop for FileDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(BallotConfig::in_memory()).await
    }

    /// Several pooled connections, so concurrent writes meet at the database.
    pub async fn on_file(db: &FileDb) -> Self {
        Self::with_config(BallotConfig {
            database_url: db.url(),
            max_connections: 4,
            ..BallotConfig::default()
        })
        .await
    }

    async fn with_config(config: BallotConfig) -> Self {
        ballot_core::telemetry::init_tracing(&config);

        let store = Arc::new(
            SqliteStore::open_with(&config.database_url, config.max_connections)
                .await
                .unwrap(),
        );
        Self {
            members: MembershipService::new(store.clone()),
            approvals: ApprovalService::new(store.clone()),
            store,
        }
    }

    pub fn with_approvals(mut self, approvals: ApprovalService<SqliteStore>) -> Self {
        self.approvals = approvals;
        self
    }

    pub async fn user(&self, name: &str) -> UserId {
        self.members.create_user(name).await.unwrap().id
    }

    /// A group whose creator is its only (admin) member.
    pub async fn group(&self, name: &str) -> (Group, UserId) {
        let admin = self.user(&format!("{name}-admin")).await;
        let (group, _) = self
            .members
            .create_group(name, None, &admin)
            .await
            .unwrap();
        (group, admin)
    }

    /// Invite and accept, returning the new confirmed member.
    pub async fn member(&self, group: &Group, admin: &UserId, name: &str) -> UserId {
        let user = self.user(name).await;
        let invite = self
            .members
            .create_invitation(&group.id, &user, admin)
            .await
            .unwrap();
        self.members
            .respond_to_invitation(&invite.id, InvitationResponse::Accept, &user)
            .await
            .unwrap();
        user
    }

    /// A group with `size` confirmed members; the admin is the first.
    pub async fn group_of(&self, size: usize) -> (Group, Vec<UserId>) {
        let (group, admin) = self.group("crew").await;
        let mut users = vec![admin.clone()];
        for i in 1..size {
            users.push(self.member(&group, &admin, &format!("member-{i}")).await);
        }
        (group, users)
    }

    /// An open decision with one item.
    pub async fn open_item(&self, group: &Group, admin: &UserId, rule: ApprovalRule) -> Item {
        let decision = self
            .approvals
            .create_decision(&group.id, "what next", rule, admin)
            .await
            .unwrap();
        self.approvals
            .set_decision_status(&decision.id, DecisionStatus::Open, admin)
            .await
            .unwrap();
        self.approvals
            .add_item(&decision.id, "candidate", admin)
            .await
            .unwrap()
    }

    pub async fn like(&self, item: &Item, user: &UserId) -> bool {
        self.approvals
            .cast_vote(&item.id, user, VotePayload::like())
            .await
            .unwrap()
            .evaluation
            .newly_selected
    }
}
