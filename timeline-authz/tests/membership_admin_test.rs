//! Membership administration integration tests.

mod common;

use common::TestApp;
use timeline_authz::{
    models::{NewMember, OrgRole, Principal},
    services::AuthzStore,
    AuthzError,
};
use uuid::Uuid;

#[tokio::test]
async fn org_admin_promotes_viewer() {
    let app = TestApp::spawn();
    let admin = Uuid::new_v4();
    let org = app.approved_org(admin).await;
    let viewer = Uuid::new_v4();
    let membership = app.add_member(viewer, &org, OrgRole::OrgViewer).await;

    let updated = app
        .services
        .members
        .update_member_role(membership.membership_id, OrgRole::OrgEditor, &Principal::user(admin))
        .await
        .unwrap();
    assert_eq!(updated.role, OrgRole::OrgEditor);

    let ctx = app.context(Principal::user(viewer)).await;
    assert_eq!(ctx.snapshot().role_in(org.organization_id), Some(OrgRole::OrgEditor));
}

#[tokio::test]
async fn members_cannot_promote_themselves() {
    let app = TestApp::spawn();
    let org = app.approved_org(Uuid::new_v4()).await;
    let editor = Uuid::new_v4();
    let membership = app.add_member(editor, &org, OrgRole::OrgEditor).await;

    let err = app
        .services
        .members
        .update_member_role(membership.membership_id, OrgRole::OrgAdmin, &Principal::user(editor))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotAuthorized(_)));
}

#[tokio::test]
async fn admins_of_other_organizations_have_no_say() {
    let app = TestApp::spawn();
    let org = app.approved_org(Uuid::new_v4()).await;
    let outsider = Uuid::new_v4();
    app.approved_org(outsider).await;
    let membership = app.add_member(Uuid::new_v4(), &org, OrgRole::OrgViewer).await;

    let err = app
        .services
        .members
        .remove_member(membership.membership_id, &Principal::user(outsider))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotAuthorized(_)));
}

#[tokio::test]
async fn members_can_leave() {
    let app = TestApp::spawn();
    let org = app.approved_org(Uuid::new_v4()).await;
    let viewer = Uuid::new_v4();
    let membership = app.add_member(viewer, &org, OrgRole::OrgViewer).await;

    app.services
        .members
        .remove_member(membership.membership_id, &Principal::user(viewer))
        .await
        .unwrap();

    let members = app.store.list_memberships(org.organization_id).await.unwrap();
    assert!(members.iter().all(|m| m.user_id != viewer));
}

#[tokio::test]
async fn anonymous_removal_requires_authentication() {
    let app = TestApp::spawn();
    let org = app.approved_org(Uuid::new_v4()).await;
    let membership = app.add_member(Uuid::new_v4(), &org, OrgRole::OrgViewer).await;

    let err = app
        .services
        .members
        .remove_member(membership.membership_id, &Principal::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotAuthenticated));
}

#[tokio::test]
async fn super_admin_adds_member_to_approved_org() {
    let app = TestApp::spawn();
    let org = app.approved_org(Uuid::new_v4()).await;
    let user = Uuid::new_v4();

    app.services
        .members
        .add_member(
            org.organization_id,
            NewMember {
                user_id: user,
                role: OrgRole::OrgEditor,
            },
            &Principal::super_admin(Uuid::new_v4()),
        )
        .await
        .unwrap();

    let listed = app
        .services
        .members
        .list_members(org.organization_id, &Principal::user(user))
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn strangers_cannot_list_members() {
    let app = TestApp::spawn();
    let org = app.approved_org(Uuid::new_v4()).await;

    let err = app
        .services
        .members
        .list_members(org.organization_id, &Principal::user(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotAuthorized(_)));

    // Unknown organizations look the same to non-admins.
    let err = app
        .services
        .members
        .list_members(Uuid::new_v4(), &Principal::user(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotAuthorized(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn demotion_and_removal_by_the_demoted_admin_serialize() {
    for _ in 0..25 {
        let app = TestApp::spawn();
        let first = Uuid::new_v4();
        let org = app.approved_org(first).await;
        let first_membership = app
            .store
            .list_memberships(org.organization_id)
            .await
            .unwrap()
            .into_iter()
            .find(|m| m.user_id == first)
            .expect("Creator membership missing");
        let second = Uuid::new_v4();
        let second_membership = app.add_member(second, &org, OrgRole::OrgAdmin).await;

        let members = app.services.members.clone();
        let demotion = tokio::spawn(async move {
            members
                .update_member_role(
                    first_membership.membership_id,
                    OrgRole::OrgViewer,
                    &Principal::user(second),
                )
                .await
        });
        let members = app.services.members.clone();
        let removal = tokio::spawn(async move {
            members
                .remove_member(second_membership.membership_id, &Principal::user(first))
                .await
        });
        let demotion = demotion.await.unwrap();
        let removal = removal.await.unwrap();

        let remaining = app
            .store
            .list_memberships(org.organization_id)
            .await
            .unwrap();
        match (demotion, removal) {
            // Demoted first: the viewer can no longer remove anyone.
            (Ok(demoted), Err(AuthzError::NotAuthorized(_))) => {
                assert_eq!(demoted.role, OrgRole::OrgViewer);
                assert_eq!(remaining.len(), 2);
            }
            // Removed first: the demoting admin is no longer a member.
            (Err(AuthzError::NotAuthorized(_)), Ok(())) => {
                assert_eq!(remaining.len(), 1);
                assert_eq!(remaining[0].user_id, first);
                assert_eq!(remaining[0].role, OrgRole::OrgAdmin);
            }
            other => panic!("Expected exactly one change to apply, got {other:?}"),
        }
    }
}
