//! Topic and event guards.
//!
//! Loads the resource, builds its descriptor and asks the evaluator. Event
//! descriptors embed their parent topic, so the evaluator never fetches.

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use super::context::RequestContext;
use super::error::AuthzResult;
use super::store::AuthzStore;
use crate::models::{
    Event, EventDescriptor, NewEvent, NewTopic, Operation, ResourceDescriptor, Topic,
};

#[derive(Clone)]
pub struct TopicGuard {
    store: Arc<dyn AuthzStore>,
}

impl TopicGuard {
    pub fn new(store: Arc<dyn AuthzStore>) -> Self {
        Self { store }
    }

    /// Load a topic and check `op` on it.
    pub async fn authorize_topic(
        &self,
        ctx: &RequestContext,
        topic_id: Uuid,
        op: Operation,
    ) -> AuthzResult<Topic> {
        let topic = self
            .store
            .find_topic(topic_id)
            .await?
            .ok_or_else(|| ctx.missing("Topic"))?;
        ctx.authorize(&ResourceDescriptor::Topic(topic.descriptor()), op)?;
        Ok(topic)
    }

    /// Load an event with its parent topic and check `op` on it.
    pub async fn authorize_event(
        &self,
        ctx: &RequestContext,
        event_id: Uuid,
        op: Operation,
    ) -> AuthzResult<Event> {
        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or_else(|| ctx.missing("Event"))?;
        let topic = self.store.find_topic(event.topic_id).await?.ok_or_else(|| {
            tracing::error!(
                event_id = %event_id,
                topic_id = %event.topic_id,
                "Event without topic"
            );
            ctx.missing("Event")
        })?;
        ctx.authorize(&ResourceDescriptor::Event(event.descriptor(&topic)), op)?;
        Ok(event)
    }

    /// Create a topic owned by the requesting principal.
    pub async fn create_topic(&self, ctx: &RequestContext, req: NewTopic) -> AuthzResult<Topic> {
        req.validate()?;
        ctx.authorize(&ResourceDescriptor::Topic(req.descriptor()), Operation::Create)?;
        let owner = ctx.principal().require_authenticated()?;

        let topic = Topic::new(
            req.organization_id,
            req.title.trim().to_string(),
            req.is_public,
            owner,
        );
        self.store.insert_topic(&topic).await?;

        tracing::info!(
            topic_id = %topic.topic_id,
            organization_id = ?topic.organization_id,
            created_by = %owner,
            "Topic created"
        );

        Ok(topic)
    }

    /// Add an event to a topic the principal may update.
    pub async fn create_event(
        &self,
        ctx: &RequestContext,
        topic_id: Uuid,
        req: NewEvent,
    ) -> AuthzResult<Event> {
        req.validate()?;
        let topic = self
            .store
            .find_topic(topic_id)
            .await?
            .ok_or_else(|| ctx.missing("Topic"))?;
        let resource = ResourceDescriptor::Event(EventDescriptor {
            event_id: None,
            topic: topic.descriptor(),
        });
        ctx.authorize(&resource, Operation::Create)?;

        let event = Event::new(topic.topic_id, req.title.trim().to_string());
        self.store.insert_event(&event).await?;

        tracing::debug!(event_id = %event.event_id, topic_id = %topic_id, "Event created");

        Ok(event)
    }

    /// Keep the topics the principal may read.
    pub fn readable_topics(
        &self,
        ctx: &RequestContext,
        topics: impl IntoIterator<Item = Topic>,
    ) -> Vec<Topic> {
        topics
            .into_iter()
            .filter(|topic| {
                ctx.decide(&ResourceDescriptor::Topic(topic.descriptor()), Operation::Read)
                    .is_allowed()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Principal;
    use crate::services::{AuthzError, MemoryStore};

    #[tokio::test]
    async fn test_missing_topic_reads_as_denied() {
        let store = MemoryStore::new();
        let guard = TopicGuard::new(Arc::new(store.clone()));
        let ctx = RequestContext::load(&store, Principal::user(Uuid::new_v4()))
            .await
            .unwrap();

        let err = guard
            .authorize_topic(&ctx, Uuid::new_v4(), Operation::Read)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::NotAuthorized(_)));
    }

    #[tokio::test]
    async fn test_owner_creates_event_in_private_topic() {
        let store = MemoryStore::new();
        let guard = TopicGuard::new(Arc::new(store.clone()));
        let owner = Uuid::new_v4();
        let ctx = RequestContext::load(&store, Principal::user(owner)).await.unwrap();

        let topic = guard
            .create_topic(
                &ctx,
                NewTopic {
                    organization_id: None,
                    title: "Diary".to_string(),
                    is_public: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(topic.created_by_user_id, owner);

        let event = guard
            .create_event(
                &ctx,
                topic.topic_id,
                NewEvent {
                    title: "First entry".to_string(),
                },
            )
            .await
            .unwrap();

        let read = guard
            .authorize_event(&ctx, event.event_id, Operation::Read)
            .await
            .unwrap();
        assert_eq!(read.topic_id, topic.topic_id);
    }

    #[tokio::test]
    async fn test_anonymous_cannot_create_topic() {
        let store = MemoryStore::new();
        let guard = TopicGuard::new(Arc::new(store.clone()));
        let ctx = RequestContext::load(&store, Principal::anonymous()).await.unwrap();

        let err = guard
            .create_topic(
                &ctx,
                NewTopic {
                    organization_id: None,
                    title: "Drive-by".to_string(),
                    is_public: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::NotAuthenticated));
    }
}
