use std::str::FromStr;
use std::time::Duration;

use ballot_storage::{
    ApprovalRule, CastVoteParams, CreateDecisionParams, CreateGroupParams, CreateItemParams,
    CreateMembershipParams, CreateUserParams, Decision, DecisionId, DecisionStatus, Evaluation,
    Group, GroupId, GroupMembership, Item, ItemId, MembershipFilter, MembershipId,
    MembershipStatus, MembershipTransition, MembershipType, Role, Selection, SelectionId,
    SelectionSnapshot, Store, StoreError, Tally, User, UserId, Vote, VoteId,
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Pool size used by [`SqliteStore::open`].
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MEMBERSHIP_COLUMNS: &str =
    "id, group_id, user_id, role, membership_type, status, invited_at, confirmed_at, rejected_at";
const DECISION_COLUMNS: &str = "id, group_id, title, rule_kind, rule_threshold, status, created_at";
const VOTE_COLUMNS: &str = "id, item_id, user_id, is_like, rating, created_at, updated_at";
const SELECTION_COLUMNS: &str = "id, decision_id, item_id, approvals, total_members, rule_kind, \
     rule_threshold, ratio, selected_at";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        Self::open_with(url, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Open (creating if missing) and migrate. In-memory databases are pinned to a
    /// single, never-recycled connection since each connection would otherwise get
    /// its own empty database.
    pub async fn open_with(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(backend)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(backend)?;

        MIGRATOR.run(&pool).await.map_err(backend)?;

        Ok(Self { pool })
    }

    async fn fetch_membership(
        conn: &mut SqliteConnection,
        membership_id: &MembershipId,
    ) -> Result<Option<GroupMembership>, StoreError> {
        let sql = format!("SELECT {MEMBERSHIP_COLUMNS} FROM group_memberships WHERE id = ?");
        sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(membership_id.0.to_string())
            .fetch_optional(&mut *conn)
            .await
            .map_err(backend)?
            .map(MembershipRow::into_membership)
            .transpose()
    }

    /// Distinguish "row is gone" from "row is in the wrong state" after a
    /// conditional write matched nothing.
    async fn missing_or_conflict(&self, membership_id: &MembershipId) -> StoreError {
        let mut conn = match self.pool.acquire().await {
            Ok(conn) => conn,
            Err(e) => return backend(e),
        };
        match Self::fetch_membership(&mut conn, membership_id).await {
            Ok(Some(_)) => StoreError::Conflict,
            Ok(None) => StoreError::NotFound,
            Err(e) => e,
        }
    }
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    // ───────────────────────────── Users ─────────────────────────────

    async fn create_user(&self, params: &CreateUserParams) -> Result<User, StoreError> {
        let user = User {
            id: UserId(Uuid::now_v7()),
            display_name: params.display_name.clone(),
            created_at: Utc::now(),
        };
        sqlx::query("INSERT INTO users(id, display_name, created_at) VALUES(?, ?, ?)")
            .bind(user.id.0.to_string())
            .bind(&user.display_name)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_write_err)?;
        Ok(user)
    }

    async fn get_user(&self, user_id: &UserId) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, (String, String, DateTime<Utc>)>(
            "SELECT id, display_name, created_at FROM users WHERE id = ?",
        )
        .bind(user_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?;

        Ok(User {
            id: UserId(parse_uuid(&row.0)?),
            display_name: row.1,
            created_at: row.2,
        })
    }

    // ───────────────────────────── Groups ─────────────────────────────

    async fn create_group(
        &self,
        params: &CreateGroupParams,
    ) -> Result<(Group, GroupMembership), StoreError> {
        let now = Utc::now();
        let group = Group {
            id: GroupId(Uuid::now_v7()),
            name: params.name.clone(),
            description: params.description.clone(),
            created_at: now,
        };
        let admin = GroupMembership {
            id: MembershipId(Uuid::now_v7()),
            group_id: group.id.clone(),
            user_id: params.created_by.clone(),
            role: Role::Admin,
            membership_type: MembershipType::Invitation,
            status: MembershipStatus::Confirmed,
            invited_at: now,
            confirmed_at: Some(now),
            rejected_at: None,
        };

        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query("INSERT INTO member_groups(id, name, description, created_at) VALUES(?, ?, ?, ?)")
            .bind(group.id.0.to_string())
            .bind(&group.name)
            .bind(&group.description)
            .bind(group.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_write_err)?;

        sqlx::query(
            "INSERT INTO group_memberships(id, group_id, user_id, role, membership_type, status, invited_at, confirmed_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(admin.id.0.to_string())
        .bind(admin.group_id.0.to_string())
        .bind(admin.user_id.0.to_string())
        .bind(admin.role.as_str())
        .bind(admin.membership_type.as_str())
        .bind(admin.status.as_str())
        .bind(admin.invited_at)
        .bind(admin.confirmed_at)
        .execute(&mut *tx)
        .await
        .map_err(map_write_err)?;

        tx.commit().await.map_err(backend)?;

        Ok((group, admin))
    }

    async fn get_group(&self, group_id: &GroupId) -> Result<Group, StoreError> {
        let row = sqlx::query_as::<_, (String, String, Option<String>, DateTime<Utc>)>(
            "SELECT id, name, description, created_at FROM member_groups WHERE id = ?",
        )
        .bind(group_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?;

        Ok(Group {
            id: GroupId(parse_uuid(&row.0)?),
            name: row.1,
            description: row.2,
            created_at: row.3,
        })
    }

    // ───────────────────────────── Memberships ─────────────────────────────

    async fn create_membership(
        &self,
        params: &CreateMembershipParams,
    ) -> Result<GroupMembership, StoreError> {
        let membership = GroupMembership {
            id: MembershipId(Uuid::now_v7()),
            group_id: params.group_id.clone(),
            user_id: params.user_id.clone(),
            role: params.role,
            membership_type: params.membership_type,
            status: MembershipStatus::Pending,
            invited_at: Utc::now(),
            confirmed_at: None,
            rejected_at: None,
        };

        // UNIQUE(group_id, user_id) decides races between concurrent creates.
        sqlx::query(
            "INSERT INTO group_memberships(id, group_id, user_id, role, membership_type, status, invited_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(membership.id.0.to_string())
        .bind(membership.group_id.0.to_string())
        .bind(membership.user_id.0.to_string())
        .bind(membership.role.as_str())
        .bind(membership.membership_type.as_str())
        .bind(membership.status.as_str())
        .bind(membership.invited_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        Ok(membership)
    }

    async fn get_membership(
        &self,
        membership_id: &MembershipId,
    ) -> Result<GroupMembership, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        Self::fetch_membership(&mut conn, membership_id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn get_membership_for(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<GroupMembership, StoreError> {
        let sql = format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM group_memberships WHERE group_id = ? AND user_id = ?"
        );
        sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(group_id.0.to_string())
            .bind(user_id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?
            .into_membership()
    }

    async fn transition_membership(
        &self,
        membership_id: &MembershipId,
        membership_type: MembershipType,
        transition: MembershipTransition,
    ) -> Result<GroupMembership, StoreError> {
        let set_clause = match transition {
            MembershipTransition::Confirm => "status = ?, confirmed_at = ?",
            MembershipTransition::Reject => "status = ?, rejected_at = ?",
            MembershipTransition::Resend => "status = ?, invited_at = ?, rejected_at = NULL",
        };
        let sql = format!(
            "UPDATE group_memberships SET {set_clause}
              WHERE id = ? AND status = ? AND membership_type = ?
              RETURNING {MEMBERSHIP_COLUMNS}"
        );

        let row = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(transition.to_status().as_str())
            .bind(Utc::now())
            .bind(membership_id.0.to_string())
            .bind(transition.from_status().as_str())
            .bind(membership_type.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => row.into_membership(),
            None => Err(self.missing_or_conflict(membership_id).await),
        }
    }

    async fn delete_membership(
        &self,
        membership_id: &MembershipId,
        membership_type: MembershipType,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "DELETE FROM group_memberships WHERE id = ? AND status = ? AND membership_type = ?",
        )
        .bind(membership_id.0.to_string())
        .bind(MembershipStatus::Rejected.as_str())
        .bind(membership_type.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_conflict(membership_id).await);
        }
        Ok(())
    }

    async fn set_membership_role(
        &self,
        membership_id: &MembershipId,
        role: Role,
        acting_admin: &UserId,
    ) -> Result<GroupMembership, StoreError> {
        // The actor check and the admin count are read by the same statement
        // that writes, so two demotions cannot both see a second admin.
        let sql = format!(
            "UPDATE group_memberships SET role = ?1
              WHERE id = ?2 AND status = ?3
                AND EXISTS (SELECT 1 FROM group_memberships a
                             WHERE a.group_id = group_memberships.group_id
                               AND a.user_id = ?4 AND a.role = ?5 AND a.status = ?3)
                AND (role = ?1 OR role <> ?5
                     OR (SELECT COUNT(*) FROM group_memberships c
                          WHERE c.group_id = group_memberships.group_id
                            AND c.role = ?5 AND c.status = ?3) > 1)
              RETURNING {MEMBERSHIP_COLUMNS}"
        );
        let row = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(role.as_str())
            .bind(membership_id.0.to_string())
            .bind(MembershipStatus::Confirmed.as_str())
            .bind(acting_admin.0.to_string())
            .bind(Role::Admin.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => row.into_membership(),
            None => Err(self.missing_or_conflict(membership_id).await),
        }
    }

    async fn list_memberships(
        &self,
        filter: &MembershipFilter,
    ) -> Result<Vec<GroupMembership>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM group_memberships WHERE 1 = 1"
        ));
        if let Some(group_id) = &filter.group_id {
            qb.push(" AND group_id = ").push_bind(group_id.0.to_string());
        }
        if let Some(user_id) = &filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id.0.to_string());
        }
        if let Some(membership_type) = filter.membership_type {
            qb.push(" AND membership_type = ")
                .push_bind(membership_type.as_str());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(role) = filter.role {
            qb.push(" AND role = ").push_bind(role.as_str());
        }
        qb.push(" ORDER BY rowid");

        let rows = qb
            .build_query_as::<MembershipRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.into_iter().map(MembershipRow::into_membership).collect()
    }

    // ───────────────────────────── Decisions ─────────────────────────────

    async fn create_decision(
        &self,
        params: &CreateDecisionParams,
    ) -> Result<Decision, StoreError> {
        let decision = Decision {
            id: DecisionId(Uuid::now_v7()),
            group_id: params.group_id.clone(),
            title: params.title.clone(),
            rule: params.rule,
            status: params.status,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO decisions(id, group_id, title, rule_kind, rule_threshold, status, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(decision.id.0.to_string())
        .bind(decision.group_id.0.to_string())
        .bind(&decision.title)
        .bind(decision.rule.kind())
        .bind(decision.rule.threshold_value())
        .bind(decision.status.as_str())
        .bind(decision.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        Ok(decision)
    }

    async fn get_decision(&self, decision_id: &DecisionId) -> Result<Decision, StoreError> {
        let sql = format!("SELECT {DECISION_COLUMNS} FROM decisions WHERE id = ?");
        sqlx::query_as::<_, DecisionRow>(&sql)
            .bind(decision_id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?
            .into_decision()
    }

    async fn set_decision_status(
        &self,
        decision_id: &DecisionId,
        from: DecisionStatus,
        to: DecisionStatus,
    ) -> Result<Decision, StoreError> {
        let sql = format!(
            "UPDATE decisions SET status = ? WHERE id = ? AND status = ? RETURNING {DECISION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DecisionRow>(&sql)
            .bind(to.as_str())
            .bind(decision_id.0.to_string())
            .bind(from.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => row.into_decision(),
            None => match self.get_decision(decision_id).await {
                Ok(_) => Err(StoreError::Conflict),
                Err(e) => Err(e),
            },
        }
    }

    // ───────────────────────────── Items ─────────────────────────────

    async fn create_item(&self, params: &CreateItemParams) -> Result<Item, StoreError> {
        let item = Item {
            id: ItemId(Uuid::now_v7()),
            decision_id: params.decision_id.clone(),
            title: params.title.clone(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO items(id, decision_id, title, created_at) VALUES(?, ?, ?, ?)")
            .bind(item.id.0.to_string())
            .bind(item.decision_id.0.to_string())
            .bind(&item.title)
            .bind(item.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_write_err)?;

        Ok(item)
    }

    async fn get_item(&self, item_id: &ItemId) -> Result<Item, StoreError> {
        let row = sqlx::query_as::<_, (String, String, String, DateTime<Utc>)>(
            "SELECT id, decision_id, title, created_at FROM items WHERE id = ?",
        )
        .bind(item_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?;

        Ok(Item {
            id: ItemId(parse_uuid(&row.0)?),
            decision_id: DecisionId(parse_uuid(&row.1)?),
            title: row.2,
            created_at: row.3,
        })
    }

    // ───────────────────────────── Votes ─────────────────────────────

    async fn cast_vote(&self, params: &CastVoteParams) -> Result<(Vote, Evaluation), StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Write first so the transaction holds the write lock before it counts.
        let sql = format!(
            "INSERT INTO votes(id, item_id, user_id, is_like, rating, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(item_id, user_id)
             DO UPDATE SET is_like = excluded.is_like,
                           rating = excluded.rating,
                           updated_at = excluded.updated_at
             RETURNING {VOTE_COLUMNS}"
        );
        let vote = sqlx::query_as::<_, VoteRow>(&sql)
            .bind(Uuid::now_v7().to_string())
            .bind(params.item_id.0.to_string())
            .bind(params.user_id.0.to_string())
            .bind(params.is_like)
            .bind(params.rating.map(i64::from))
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_err)?
            .into_vote()?;

        let evaluation = evaluate_in(&mut tx, &params.item_id, now).await?;

        tx.commit().await.map_err(backend)?;

        Ok((vote, evaluation))
    }

    async fn evaluate_item(&self, item_id: &ItemId) -> Result<Evaluation, StoreError> {
        // Reads before it may insert: take the write lock up front.
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(backend)?;
        let evaluation = evaluate_in(&mut tx, item_id, Utc::now()).await?;
        tx.commit().await.map_err(backend)?;
        Ok(evaluation)
    }

    // ───────────────────────────── Selections ─────────────────────────────

    async fn list_selections(
        &self,
        decision_id: &DecisionId,
    ) -> Result<Vec<Selection>, StoreError> {
        let sql = format!(
            "SELECT {SELECTION_COLUMNS} FROM selections WHERE decision_id = ? ORDER BY rowid"
        );
        let rows = sqlx::query_as::<_, SelectionRow>(&sql)
            .bind(decision_id.0.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.into_iter().map(SelectionRow::into_selection).collect()
    }
}

// ───────────────────────────── Evaluation ─────────────────────────────

async fn count_confirmed(conn: &mut SqliteConnection, group_id: &str) -> Result<u32, StoreError> {
    let (count,) = sqlx::query_as::<_, (i64,)>(
        "SELECT COUNT(*) FROM group_memberships WHERE group_id = ? AND status = ?",
    )
    .bind(group_id)
    .bind(MembershipStatus::Confirmed.as_str())
    .fetch_one(&mut *conn)
    .await
    .map_err(backend)?;

    to_u32(count)
}

/// Count, compare against the rule, and insert the selection at most once.
/// Runs on the caller's transaction.
async fn evaluate_in(
    conn: &mut SqliteConnection,
    item_id: &ItemId,
    now: DateTime<Utc>,
) -> Result<Evaluation, StoreError> {
    let item = item_id.0.to_string();

    let (decision_id, group_id, rule_kind, rule_threshold) =
        sqlx::query_as::<_, (String, String, String, Option<f64>)>(
            "SELECT d.id, d.group_id, d.rule_kind, d.rule_threshold
               FROM items i
               JOIN decisions d ON d.id = i.decision_id
              WHERE i.id = ?",
        )
        .bind(&item)
        .fetch_optional(&mut *conn)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?;

    let rule = ApprovalRule::from_parts(&rule_kind, rule_threshold).map_err(backend)?;
    let total_members = count_confirmed(&mut *conn, &group_id).await?;

    // Only confirmed members' votes can approve, so approvals never exceed total.
    let sql = format!(
        "SELECT {VOTE_COLUMNS} FROM votes v
          WHERE v.item_id = ?
            AND EXISTS (SELECT 1 FROM group_memberships m
                         WHERE m.user_id = v.user_id AND m.group_id = ? AND m.status = ?)"
    );
    let member_votes = sqlx::query_as::<_, VoteRow>(&sql)
        .bind(&item)
        .bind(&group_id)
        .bind(MembershipStatus::Confirmed.as_str())
        .fetch_all(&mut *conn)
        .await
        .map_err(backend)?
        .into_iter()
        .map(VoteRow::into_vote)
        .collect::<Result<Vec<_>, _>>()?;
    let approvals = member_votes.iter().filter(|v| v.is_approval()).count();

    let (votes_cast,) =
        sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM votes WHERE item_id = ?")
            .bind(&item)
            .fetch_one(&mut *conn)
            .await
            .map_err(backend)?;

    let tally = Tally {
        approvals: u32::try_from(approvals).map_err(backend)?,
        votes_cast: to_u32(votes_cast)?,
        total_members,
    };
    let satisfied = rule.is_satisfied(&tally);

    let mut newly_selected = false;
    if satisfied {
        let snapshot = SelectionSnapshot::capture(rule, &tally);
        // UNIQUE(decision_id, item_id): an existing selection keeps its snapshot.
        let result = sqlx::query(
            "INSERT INTO selections(id, decision_id, item_id, approvals, total_members,
                                    rule_kind, rule_threshold, ratio, selected_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(decision_id, item_id) DO NOTHING",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(&decision_id)
        .bind(&item)
        .bind(i64::from(snapshot.approvals))
        .bind(i64::from(snapshot.total_members))
        .bind(snapshot.rule.kind())
        .bind(snapshot.rule.threshold_value())
        .bind(snapshot.ratio)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(backend)?;
        newly_selected = result.rows_affected() == 1;
    }

    let sql = format!(
        "SELECT {SELECTION_COLUMNS} FROM selections WHERE decision_id = ? AND item_id = ?"
    );
    let selection = sqlx::query_as::<_, SelectionRow>(&sql)
        .bind(&decision_id)
        .bind(&item)
        .fetch_optional(&mut *conn)
        .await
        .map_err(backend)?
        .map(SelectionRow::into_selection)
        .transpose()?;

    Ok(Evaluation {
        item_id: item_id.clone(),
        tally,
        satisfied,
        selection,
        newly_selected,
    })
}

// ───────────────────────────── Rows ─────────────────────────────

#[derive(sqlx::FromRow)]
struct MembershipRow {
    id: String,
    group_id: String,
    user_id: String,
    role: String,
    membership_type: String,
    status: String,
    invited_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
}

impl MembershipRow {
    fn into_membership(self) -> Result<GroupMembership, StoreError> {
        Ok(GroupMembership {
            id: MembershipId(parse_uuid(&self.id)?),
            group_id: GroupId(parse_uuid(&self.group_id)?),
            user_id: UserId(parse_uuid(&self.user_id)?),
            role: self.role.parse().map_err(backend)?,
            membership_type: self.membership_type.parse().map_err(backend)?,
            status: self.status.parse().map_err(backend)?,
            invited_at: self.invited_at,
            confirmed_at: self.confirmed_at,
            rejected_at: self.rejected_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DecisionRow {
    id: String,
    group_id: String,
    title: String,
    rule_kind: String,
    rule_threshold: Option<f64>,
    status: String,
    created_at: DateTime<Utc>,
}

impl DecisionRow {
    fn into_decision(self) -> Result<Decision, StoreError> {
        Ok(Decision {
            id: DecisionId(parse_uuid(&self.id)?),
            group_id: GroupId(parse_uuid(&self.group_id)?),
            title: self.title,
            rule: ApprovalRule::from_parts(&self.rule_kind, self.rule_threshold)
                .map_err(backend)?,
            status: self.status.parse().map_err(backend)?,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VoteRow {
    id: String,
    item_id: String,
    user_id: String,
    is_like: Option<bool>,
    rating: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VoteRow {
    fn into_vote(self) -> Result<Vote, StoreError> {
        let rating = self
            .rating
            .map(u8::try_from)
            .transpose()
            .map_err(backend)?;
        Ok(Vote {
            id: VoteId(parse_uuid(&self.id)?),
            item_id: ItemId(parse_uuid(&self.item_id)?),
            user_id: UserId(parse_uuid(&self.user_id)?),
            is_like: self.is_like,
            rating,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SelectionRow {
    id: String,
    decision_id: String,
    item_id: String,
    approvals: i64,
    total_members: i64,
    rule_kind: String,
    rule_threshold: Option<f64>,
    ratio: Option<f64>,
    selected_at: DateTime<Utc>,
}

impl SelectionRow {
    fn into_selection(self) -> Result<Selection, StoreError> {
        Ok(Selection {
            id: SelectionId(parse_uuid(&self.id)?),
            decision_id: DecisionId(parse_uuid(&self.decision_id)?),
            item_id: ItemId(parse_uuid(&self.item_id)?),
            snapshot: SelectionSnapshot {
                approvals: to_u32(self.approvals)?,
                total_members: to_u32(self.total_members)?,
                rule: ApprovalRule::from_parts(&self.rule_kind, self.rule_threshold)
                    .map_err(backend)?,
                ratio: self.ratio,
            },
            selected_at: self.selected_at,
        })
    }
}

// ───────────────────────────── Helpers ─────────────────────────────

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Unique violations become `AlreadyExists`, dangling references `NotFound`.
fn map_write_err(e: sqlx::Error) -> StoreError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return StoreError::AlreadyExists;
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound;
        }
    }
    backend(e)
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(backend)
}

fn to_u32(n: i64) -> Result<u32, StoreError> {
    u32::try_from(n).map_err(backend)
}
