//! Organization model - tenant containers with a one-shot review lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::resource::OrganizationDescriptor;

/// Organization review status.
///
/// `Pending` moves to `Approved` or `Rejected` exactly once; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationStatus {
    Pending,
    Approved,
    Rejected,
}

impl OrganizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationStatus::Pending => "pending",
            OrganizationStatus::Approved => "approved",
            OrganizationStatus::Rejected => "rejected",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: OrganizationStatus) -> bool {
        match (self, next) {
            (OrganizationStatus::Pending, OrganizationStatus::Approved)
            | (OrganizationStatus::Pending, OrganizationStatus::Rejected) => true,
            (OrganizationStatus::Pending, OrganizationStatus::Pending)
            | (OrganizationStatus::Approved, _)
            | (OrganizationStatus::Rejected, _) => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            OrganizationStatus::Pending => false,
            OrganizationStatus::Approved | OrganizationStatus::Rejected => true,
        }
    }
}

impl std::fmt::Display for OrganizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrganizationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrganizationStatus::Pending),
            "approved" => Ok(OrganizationStatus::Approved),
            "rejected" => Ok(OrganizationStatus::Rejected),
            _ => Err(format!("Invalid organization status: {}", s)),
        }
    }
}

/// Organization entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub organization_id: Uuid,
    pub name: String,
    pub status: OrganizationStatus,
    pub created_by_user_id: Uuid,
    pub created_utc: DateTime<Utc>,
    pub reviewed_utc: Option<DateTime<Utc>>,
}

impl Organization {
    /// Create a newly registered organization awaiting review.
    pub fn new(name: String, created_by_user_id: Uuid) -> Self {
        Self {
            organization_id: Uuid::new_v4(),
            name,
            status: OrganizationStatus::Pending,
            created_by_user_id,
            created_utc: Utc::now(),
            reviewed_utc: None,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == OrganizationStatus::Approved
    }

    pub fn descriptor(&self) -> OrganizationDescriptor {
        OrganizationDescriptor {
            organization_id: self.organization_id,
            created_by_user_id: self.created_by_user_id,
        }
    }
}

/// Request to register an organization.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewOrganization {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}
