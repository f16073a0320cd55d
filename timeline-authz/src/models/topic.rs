//! Topic and event models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::resource::{EventDescriptor, TopicDescriptor};

/// A timeline topic.
///
/// With `organization_id` set the topic is organization-scoped and membership
/// roles govern access. Without it the topic is a legacy/private topic
/// governed by `is_public` and `created_by_user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub topic_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub title: String,
    pub is_public: bool,
    pub created_by_user_id: Uuid,
    pub created_utc: DateTime<Utc>,
}

impl Topic {
    pub fn new(
        organization_id: Option<Uuid>,
        title: String,
        is_public: bool,
        created_by_user_id: Uuid,
    ) -> Self {
        Self {
            topic_id: Uuid::new_v4(),
            organization_id,
            title,
            is_public,
            created_by_user_id,
            created_utc: Utc::now(),
        }
    }

    pub fn descriptor(&self) -> TopicDescriptor {
        TopicDescriptor {
            organization_id: self.organization_id,
            is_public: self.is_public,
            created_by_user_id: Some(self.created_by_user_id),
        }
    }
}

/// Request to create a topic. The owner is always the requesting principal.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTopic {
    pub organization_id: Option<Uuid>,
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[serde(default)]
    pub is_public: bool,
}

impl NewTopic {
    /// Descriptor of the topic this request would create.
    pub fn descriptor(&self) -> TopicDescriptor {
        TopicDescriptor {
            organization_id: self.organization_id,
            is_public: self.is_public,
            created_by_user_id: None,
        }
    }
}

/// A timeline event. Events carry no permissions of their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,
    pub topic_id: Uuid,
    pub title: String,
    pub created_utc: DateTime<Utc>,
}

impl Event {
    pub fn new(topic_id: Uuid, title: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            topic_id,
            title,
            created_utc: Utc::now(),
        }
    }

    /// Descriptor for this event under its (already loaded) parent topic.
    pub fn descriptor(&self, parent: &Topic) -> EventDescriptor {
        EventDescriptor {
            event_id: Some(self.event_id),
            topic: parent.descriptor(),
        }
    }
}

/// Request to add an event to a topic.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewEvent {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
}
