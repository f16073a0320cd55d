//! Topic and event guard integration tests.

mod common;

use common::TestApp;
use timeline_authz::{
    models::{NewEvent, NewTopic, Operation, OrgRole, Principal},
    AuthzError, DenyReason,
};
use uuid::Uuid;

#[tokio::test]
async fn editor_writes_private_org_topic() {
    let app = TestApp::spawn();
    let org = app.approved_org(Uuid::new_v4()).await;
    let editor = Uuid::new_v4();
    app.add_member(editor, &org, OrgRole::OrgEditor).await;
    let topic = app.org_topic(&org, false).await;

    let ctx = app.context(Principal::user(editor)).await;
    app.services
        .topics
        .authorize_topic(&ctx, topic.topic_id, Operation::Update)
        .await
        .unwrap();

    let event = app
        .services
        .topics
        .create_event(
            &ctx,
            topic.topic_id,
            NewEvent {
                title: "Founding".to_string(),
            },
        )
        .await
        .unwrap();
    app.services
        .topics
        .authorize_event(&ctx, event.event_id, Operation::Delete)
        .await
        .unwrap();
}

#[tokio::test]
async fn viewer_reads_but_cannot_write() {
    let app = TestApp::spawn();
    let org = app.approved_org(Uuid::new_v4()).await;
    let viewer = Uuid::new_v4();
    app.add_member(viewer, &org, OrgRole::OrgViewer).await;
    let topic = app.org_topic(&org, false).await;
    let ctx = app.context(Principal::user(viewer)).await;

    app.services
        .topics
        .authorize_topic(&ctx, topic.topic_id, Operation::Read)
        .await
        .unwrap();

    let err = app
        .services
        .topics
        .create_event(
            &ctx,
            topic.topic_id,
            NewEvent {
                title: "Not allowed".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.deny_reason(), Some(DenyReason::InsufficientRole));
}

#[tokio::test]
async fn public_org_topic_is_read_only_for_outsiders() {
    let app = TestApp::spawn();
    let org = app.approved_org(Uuid::new_v4()).await;
    let topic = app.org_topic(&org, true).await;
    let ctx = app.context(Principal::anonymous()).await;

    app.services
        .topics
        .authorize_topic(&ctx, topic.topic_id, Operation::Read)
        .await
        .unwrap();

    let err = app
        .services
        .topics
        .authorize_topic(&ctx, topic.topic_id, Operation::Update)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotAuthenticated));
}

#[tokio::test]
async fn private_legacy_topic_belongs_to_owner() {
    let app = TestApp::spawn();
    let owner = Uuid::new_v4();
    let topic = app.legacy_topic(owner, false).await;

    let stranger = app.context(Principal::user(Uuid::new_v4())).await;
    let err = app
        .services
        .topics
        .authorize_topic(&stranger, topic.topic_id, Operation::Read)
        .await
        .unwrap_err();
    assert_eq!(err.deny_reason(), Some(DenyReason::NotOwner));

    let ctx = app.context(Principal::user(owner)).await;
    app.services
        .topics
        .authorize_topic(&ctx, topic.topic_id, Operation::Delete)
        .await
        .unwrap();
}

#[tokio::test]
async fn readable_topics_filters_listing() {
    let app = TestApp::spawn();
    let user = Uuid::new_v4();
    let org = app.approved_org(Uuid::new_v4()).await;
    app.add_member(user, &org, OrgRole::OrgViewer).await;
    let other_org = app.approved_org(Uuid::new_v4()).await;

    let visible = vec![
        app.org_topic(&org, false).await,
        app.legacy_topic(user, false).await,
        app.legacy_topic(Uuid::new_v4(), true).await,
    ];
    let hidden = vec![
        app.org_topic(&other_org, false).await,
        app.legacy_topic(Uuid::new_v4(), false).await,
    ];

    let ctx = app.context(Principal::user(user)).await;
    let all = visible.iter().chain(hidden.iter()).cloned();
    let readable = app.services.topics.readable_topics(&ctx, all);
    assert_eq!(readable, visible);
}

#[tokio::test]
async fn organization_topic_creation_needs_editor() {
    let app = TestApp::spawn();
    let org = app.approved_org(Uuid::new_v4()).await;
    let viewer = Uuid::new_v4();
    app.add_member(viewer, &org, OrgRole::OrgViewer).await;
    let req = NewTopic {
        organization_id: Some(org.organization_id),
        title: "Exhibits".to_string(),
        is_public: true,
    };

    let ctx = app.context(Principal::user(viewer)).await;
    let err = app
        .services
        .topics
        .create_topic(&ctx, req.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotAuthorized(_)));

    let admin_ctx = app.context(Principal::user(org.created_by_user_id)).await;
    let topic = app
        .services
        .topics
        .create_topic(&admin_ctx, req)
        .await
        .unwrap();
    assert_eq!(topic.created_by_user_id, org.created_by_user_id);
}

#[tokio::test]
async fn missing_event_is_only_reported_to_super_admins() {
    let app = TestApp::spawn();

    let ctx = app.context(Principal::user(Uuid::new_v4())).await;
    let err = app
        .services
        .topics
        .authorize_event(&ctx, Uuid::new_v4(), Operation::Read)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotAuthorized(_)));

    let admin = app.context(Principal::super_admin(Uuid::new_v4())).await;
    let err = app
        .services
        .topics
        .authorize_event(&admin, Uuid::new_v4(), Operation::Read)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotFound("Event")));
}
