mod common;

use std::sync::Arc;

use ballot_core::{
    ApprovalService, CoreError, ErrorKind, FavouriteSort, InvitationResponse, MembershipService,
    VotePayload,
};
use ballot_storage::{
    ApprovalRule, Group, GroupMembership, MembershipFilter, MembershipStatus, Role, Store, UserId,
};
use ballot_store_sqlite::SqliteStore;
use common::{FileDb, Harness};
use futures::future::join_all;
use tokio::task::JoinHandle;

async fn settle<T>(handles: Vec<JoinHandle<Result<T, CoreError>>>) -> (usize, Vec<ErrorKind>) {
    let mut ok = 0;
    let mut errors = Vec::new();
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => ok += 1,
            Err(e) => errors.push(e.kind()),
        }
    }
    (ok, errors)
}

async fn row_of(h: &Harness, group: &Group, user: &UserId) -> GroupMembership {
    h.store.get_membership_for(&group.id, user).await.unwrap()
}

#[tokio::test]
async fn racing_invitations_and_requests_have_one_winner() {
    let db = FileDb::new();
    let h = Arc::new(Harness::on_file(&db).await);
    let (group, admin) = h.group("climbers").await;
    let u = h.user("u").await;

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let (h, group_id, u, admin) = (h.clone(), group.id.clone(), u.clone(), admin.clone());
            tokio::spawn(async move {
                if i % 2 == 0 {
                    h.members.create_invitation(&group_id, &u, &admin).await
                } else {
                    h.members.create_join_request(&group_id, &u).await
                }
            })
        })
        .collect();

    let (ok, errors) = settle(handles).await;
    assert_eq!(ok, 1);
    assert_eq!(errors, vec![ErrorKind::Conflict; 7]);

    let rows = h
        .store
        .list_memberships(&MembershipFilter::for_group(&group.id).status(MembershipStatus::Pending))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, u);
}

#[tokio::test]
async fn racing_accepts_and_declines_apply_once() {
    let db = FileDb::new();
    let h = Arc::new(Harness::on_file(&db).await);
    let (group, admin) = h.group("chess").await;
    let u = h.user("u").await;
    let invite = h
        .members
        .create_invitation(&group.id, &u, &admin)
        .await
        .unwrap();

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let (h, id, u) = (h.clone(), invite.id.clone(), u.clone());
            let response = if i % 2 == 0 {
                InvitationResponse::Accept
            } else {
                InvitationResponse::Reject
            };
            tokio::spawn(async move { h.members.respond_to_invitation(&id, response, &u).await })
        })
        .collect();

    let (ok, errors) = settle(handles).await;
    assert_eq!(ok, 1);
    assert_eq!(errors, vec![ErrorKind::InvalidState; 5]);

    let row = h.store.get_membership(&invite.id).await.unwrap();
    assert_ne!(row.status, MembershipStatus::Pending);
}

#[tokio::test]
async fn mutual_demotions_across_services_leave_one_admin() {
    let db = FileDb::new();
    let h = Harness::on_file(&db).await;
    let left = Arc::new(MembershipService::new(h.store.clone()));
    let right = Arc::new(MembershipService::new(h.store.clone()));

    for round in 0..10 {
        let (group, a) = h.group(&format!("council-{round}")).await;
        let b = h.member(&group, &a, "b").await;
        let a_row = row_of(&h, &group, &a).await;
        let b_row = row_of(&h, &group, &b).await;
        h.members.set_role(&b_row.id, Role::Admin, &a).await.unwrap();

        let first = {
            let (svc, id, by) = (left.clone(), b_row.id.clone(), a.clone());
            tokio::spawn(async move { svc.set_role(&id, Role::Member, &by).await })
        };
        let second = {
            let (svc, id, by) = (right.clone(), a_row.id.clone(), b.clone());
            tokio::spawn(async move { svc.set_role(&id, Role::Member, &by).await })
        };

        let (ok, errors) = settle(vec![first, second]).await;
        assert_eq!(ok, 1, "round {round}");
        assert!(
            matches!(errors[..], [ErrorKind::Forbidden] | [ErrorKind::InvalidState]),
            "round {round}: {errors:?}"
        );

        let admins = h
            .store
            .list_memberships(
                &MembershipFilter::for_group(&group.id)
                    .status(MembershipStatus::Confirmed)
                    .role(Role::Admin),
            )
            .await
            .unwrap();
        assert_eq!(admins.len(), 1, "round {round}");
    }
}

#[tokio::test]
async fn concurrent_votes_create_one_selection() {
    let h = Harness::new().await;
    let (group, users) = h.group_of(6).await;
    let item = h
        .open_item(&group, &users[0], ApprovalRule::Threshold(0.5))
        .await;

    let results = join_all(
        users
            .iter()
            .map(|u| h.approvals.cast_vote(&item.id, u, VotePayload::like())),
    )
    .await;

    let newly = results
        .into_iter()
        .map(|r| r.unwrap().evaluation.newly_selected)
        .filter(|n| *n)
        .count();
    assert_eq!(newly, 1);

    let favourites = h
        .approvals
        .list_favourites(&item.decision_id, FavouriteSort::SelectedAt)
        .await
        .unwrap();
    assert_eq!(favourites.len(), 1);
    assert_eq!(favourites[0].snapshot.approvals, 3);
}

#[tokio::test]
async fn concurrent_votes_across_services_on_file_database() {
    let db = FileDb::new();
    let h = Harness::on_file(&db).await;
    let (group, users) = h.group_of(8).await;
    let item = h
        .open_item(&group, &users[0], ApprovalRule::Unanimous)
        .await;

    // Two services share no item lock, so only the store keeps this exactly-once.
    let services: [Arc<ApprovalService<SqliteStore>>; 2] = [
        Arc::new(ApprovalService::new(h.store.clone())),
        Arc::new(ApprovalService::new(h.store.clone())),
    ];

    let handles: Vec<_> = users
        .into_iter()
        .enumerate()
        .map(|(i, u)| {
            let approvals = services[i % 2].clone();
            let item_id = item.id.clone();
            tokio::spawn(async move {
                approvals
                    .cast_vote(&item_id, &u, VotePayload::rating(5))
                    .await
                    .map(|o| o.evaluation.newly_selected)
            })
        })
        .collect();

    let mut newly = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            newly += 1;
        }
    }
    assert_eq!(newly, 1);

    let favourites = h
        .approvals
        .list_favourites(&item.decision_id, FavouriteSort::SelectedAt)
        .await
        .unwrap();
    assert_eq!(favourites.len(), 1);
    assert_eq!(favourites[0].snapshot.approvals, 8);
}
