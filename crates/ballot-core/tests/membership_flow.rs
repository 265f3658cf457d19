mod common;

use ballot_core::{ErrorKind, InvitationResponse, JoinRequestResponse};
use ballot_storage::{GroupId, MembershipId, MembershipStatus, MembershipType, Role, UserId};
use common::Harness;
use uuid::Uuid;

#[tokio::test]
async fn join_request_reject_resend_approve() {
    let h = Harness::new().await;
    let (group, admin) = h.group("hikers").await;
    let u = h.user("u").await;

    let request = h.members.create_join_request(&group.id, &u).await.unwrap();
    assert_eq!(request.status, MembershipStatus::Pending);
    assert_eq!(request.membership_type, MembershipType::Request);
    assert_eq!(request.role, Role::Member);

    let rejected = h
        .members
        .respond_to_join_request(&request.id, JoinRequestResponse::Reject, &admin)
        .await
        .unwrap();
    assert_eq!(rejected.status, MembershipStatus::Rejected);
    assert!(rejected.rejected_at.is_some());

    let resent = h.members.resend(&request.id, &u).await.unwrap();
    assert_eq!(resent.status, MembershipStatus::Pending);
    assert!(resent.rejected_at.is_none());
    assert!(resent.invited_at >= request.invited_at);

    let approved = h
        .members
        .respond_to_join_request(&request.id, JoinRequestResponse::Approve, &admin)
        .await
        .unwrap();
    assert_eq!(approved.status, MembershipStatus::Confirmed);
    assert!(approved.confirmed_at.is_some());

    let err = h
        .members
        .create_join_request(&group.id, &u)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn invitation_accept_and_decline() {
    let h = Harness::new().await;
    let (group, admin) = h.group("readers").await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;

    let to_alice = h
        .members
        .create_invitation(&group.id, &alice, &admin)
        .await
        .unwrap();
    let to_bob = h
        .members
        .create_invitation(&group.id, &bob, &admin)
        .await
        .unwrap();

    // only the invitee may answer
    let err = h
        .members
        .respond_to_invitation(&to_alice.id, InvitationResponse::Accept, &bob)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let accepted = h
        .members
        .respond_to_invitation(&to_alice.id, InvitationResponse::Accept, &alice)
        .await
        .unwrap();
    assert_eq!(accepted.status, MembershipStatus::Confirmed);

    let declined = h
        .members
        .respond_to_invitation(&to_bob.id, InvitationResponse::Reject, &bob)
        .await
        .unwrap();
    assert_eq!(declined.status, MembershipStatus::Rejected);

    let rejected = h
        .members
        .list_group_rejected_invitations(&group.id, &admin)
        .await
        .unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].user_id, bob);

    let members = h
        .members
        .list_group_members(&group.id, &alice)
        .await
        .unwrap();
    let ids: Vec<&UserId> = members.iter().map(|m| &m.user_id).collect();
    assert_eq!(ids, vec![&admin, &alice]);
}

#[tokio::test]
async fn only_confirmed_admins_invite() {
    let h = Harness::new().await;
    let (group, admin) = h.group("runners").await;
    let member = h.member(&group, &admin, "member").await;
    let target = h.user("target").await;
    let stranger = h.user("stranger").await;

    for actor in [&member, &stranger] {
        let err = h
            .members
            .create_invitation(&group.id, &target, actor)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    let err = h
        .members
        .create_invitation(&GroupId(Uuid::new_v4()), &target, &admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h
        .members
        .create_invitation(&group.id, &UserId(Uuid::new_v4()), &admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn existing_row_blocks_any_new_membership() {
    let h = Harness::new().await;
    let (group, admin) = h.group("bakers").await;
    let u = h.user("u").await;

    let invite = h
        .members
        .create_invitation(&group.id, &u, &admin)
        .await
        .unwrap();

    let err = h
        .members
        .create_join_request(&group.id, &u)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    h.members
        .respond_to_invitation(&invite.id, InvitationResponse::Reject, &u)
        .await
        .unwrap();

    // a rejected row still occupies the pair
    let err = h
        .members
        .create_invitation(&group.id, &u, &admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // until it is deleted
    h.members.delete(&invite.id, &admin).await.unwrap();
    let again = h.members.create_join_request(&group.id, &u).await.unwrap();
    assert_eq!(again.membership_type, MembershipType::Request);
}

#[tokio::test]
async fn no_transition_leaves_confirmed() {
    let h = Harness::new().await;
    let (group, admin) = h.group("rowers").await;
    let u = h.user("u").await;

    let request = h.members.create_join_request(&group.id, &u).await.unwrap();
    h.members
        .respond_to_join_request(&request.id, JoinRequestResponse::Approve, &admin)
        .await
        .unwrap();

    for response in [JoinRequestResponse::Approve, JoinRequestResponse::Reject] {
        let err = h
            .members
            .respond_to_join_request(&request.id, response, &admin)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
    let err = h.members.resend(&request.id, &u).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    let err = h.members.delete(&request.id, &u).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let row = h
        .members
        .list_my_requests(&u)
        .await
        .unwrap()
        .pop()
        .unwrap();
    assert_eq!(row.status, MembershipStatus::Confirmed);
}

#[tokio::test]
async fn pending_rows_cannot_be_resent_or_deleted() {
    let h = Harness::new().await;
    let (group, admin) = h.group("divers").await;
    let u = h.user("u").await;

    let invite = h
        .members
        .create_invitation(&group.id, &u, &admin)
        .await
        .unwrap();

    let err = h.members.resend(&invite.id, &admin).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    let err = h.members.delete(&invite.id, &admin).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn responses_check_membership_type() {
    let h = Harness::new().await;
    let (group, admin) = h.group("skaters").await;
    let u = h.user("u").await;

    let request = h.members.create_join_request(&group.id, &u).await.unwrap();
    let err = h
        .members
        .respond_to_invitation(&request.id, InvitationResponse::Accept, &u)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let v = h.user("v").await;
    let invite = h
        .members
        .create_invitation(&group.id, &v, &admin)
        .await
        .unwrap();
    let err = h
        .members
        .respond_to_join_request(&invite.id, JoinRequestResponse::Approve, &admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn resend_and_delete_authorization_split() {
    let h = Harness::new().await;
    let (group, admin) = h.group("painters").await;
    let requester = h.user("requester").await;
    let invitee = h.user("invitee").await;

    let request = h
        .members
        .create_join_request(&group.id, &requester)
        .await
        .unwrap();
    h.members
        .respond_to_join_request(&request.id, JoinRequestResponse::Reject, &admin)
        .await
        .unwrap();

    let invite = h
        .members
        .create_invitation(&group.id, &invitee, &admin)
        .await
        .unwrap();
    h.members
        .respond_to_invitation(&invite.id, InvitationResponse::Reject, &invitee)
        .await
        .unwrap();

    // requests belong to the requester, invitations to the admins
    let err = h.members.resend(&request.id, &admin).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = h.members.resend(&invite.id, &invitee).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = h.members.delete(&invite.id, &invitee).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let resent = h.members.resend(&invite.id, &admin).await.unwrap();
    assert_eq!(resent.status, MembershipStatus::Pending);
    assert!(resent.rejected_at.is_none());

    h.members.delete(&request.id, &requester).await.unwrap();
    assert!(h.members.list_my_requests(&requester).await.unwrap().is_empty());

    let err = h.members.delete(&request.id, &requester).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn repeated_reject_resend_cycles_reset_cleanly() {
    let h = Harness::new().await;
    let (group, admin) = h.group("gardeners").await;
    let u = h.user("u").await;

    let request = h.members.create_join_request(&group.id, &u).await.unwrap();
    let mut last_invited_at = request.invited_at;
    for _ in 0..3 {
        h.members
            .respond_to_join_request(&request.id, JoinRequestResponse::Reject, &admin)
            .await
            .unwrap();
        let resent = h.members.resend(&request.id, &u).await.unwrap();
        assert_eq!(resent.status, MembershipStatus::Pending);
        assert!(resent.rejected_at.is_none());
        assert!(resent.confirmed_at.is_none());
        assert!(resent.invited_at >= last_invited_at);
        last_invited_at = resent.invited_at;
    }
}

#[tokio::test]
async fn my_lists_are_scoped_to_user_and_type() {
    let h = Harness::new().await;
    let (g1, admin1) = h.group("one").await;
    let (g2, admin2) = h.group("two").await;
    let (g3, _) = h.group("three").await;
    let a = h.user("a").await;
    let b = h.user("b").await;

    h.members.create_join_request(&g1.id, &a).await.unwrap();
    h.members.create_join_request(&g3.id, &a).await.unwrap();
    h.members.create_invitation(&g2.id, &a, &admin2).await.unwrap();
    h.members.create_join_request(&g2.id, &b).await.unwrap();
    h.members.create_invitation(&g1.id, &b, &admin1).await.unwrap();

    let requests = h.members.list_my_requests(&a).await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests
        .iter()
        .all(|m| m.user_id == a && m.membership_type == MembershipType::Request));

    let invitations = h.members.list_my_invitations(&a).await.unwrap();
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].group_id, g2.id);

    let b_requests = h.members.list_my_requests(&b).await.unwrap();
    assert_eq!(b_requests.len(), 1);
    assert_eq!(b_requests[0].group_id, g2.id);
}

#[tokio::test]
async fn admin_queue_queries_require_admin() {
    let h = Harness::new().await;
    let (group, admin) = h.group("cyclists").await;
    let member = h.member(&group, &admin, "member").await;
    let u = h.user("u").await;
    let v = h.user("v").await;

    h.members.create_join_request(&group.id, &u).await.unwrap();
    let v_req = h.members.create_join_request(&group.id, &v).await.unwrap();
    h.members
        .respond_to_join_request(&v_req.id, JoinRequestResponse::Reject, &admin)
        .await
        .unwrap();

    let pending = h
        .members
        .list_group_join_requests(&group.id, &admin)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].user_id, u);

    let rejected = h
        .members
        .list_group_rejected_requests(&group.id, &admin)
        .await
        .unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].user_id, v);

    assert!(h
        .members
        .list_group_invitations(&group.id, &admin)
        .await
        .unwrap()
        .is_empty());

    let err = h
        .members
        .list_group_join_requests(&group.id, &member)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = h
        .members
        .list_group_members(&group.id, &u)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn last_admin_cannot_be_demoted() {
    let h = Harness::new().await;
    let (group, admin) = h.group("sailors").await;
    let bob = h.member(&group, &admin, "bob").await;

    let members = h.members.list_group_members(&group.id, &admin).await.unwrap();
    let admin_row = members.iter().find(|m| m.user_id == admin).unwrap().id.clone();
    let bob_row = members.iter().find(|m| m.user_id == bob).unwrap().id.clone();

    let err = h
        .members
        .set_role(&admin_row, Role::Member, &admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let err = h
        .members
        .set_role(&bob_row, Role::Admin, &bob)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let promoted = h
        .members
        .set_role(&bob_row, Role::Admin, &admin)
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::Admin);

    let demoted = h
        .members
        .set_role(&admin_row, Role::Member, &bob)
        .await
        .unwrap();
    assert_eq!(demoted.role, Role::Member);

    // the former admin lost their powers
    let err = h
        .members
        .list_group_join_requests(&group.id, &admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn unknown_membership_is_not_found() {
    let h = Harness::new().await;
    let u = h.user("u").await;
    let missing = MembershipId(Uuid::new_v4());

    let err = h.members.resend(&missing, &u).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = h
        .members
        .respond_to_invitation(&missing, InvitationResponse::Accept, &u)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
