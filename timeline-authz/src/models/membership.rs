//! Membership model and the request-scoped membership snapshot.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::organization::OrganizationStatus;

/// Role a user holds inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    OrgAdmin,
    OrgEditor,
    OrgViewer,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::OrgAdmin => "org_admin",
            OrgRole::OrgEditor => "org_editor",
            OrgRole::OrgViewer => "org_viewer",
        }
    }

    /// Whether the role may create, update and delete organization topics.
    pub fn can_edit_content(&self) -> bool {
        match self {
            OrgRole::OrgAdmin | OrgRole::OrgEditor => true,
            OrgRole::OrgViewer => false,
        }
    }

    /// Whether the role may add, re-role and remove members.
    pub fn can_manage_members(&self) -> bool {
        match self {
            OrgRole::OrgAdmin => true,
            OrgRole::OrgEditor | OrgRole::OrgViewer => false,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            OrgRole::OrgAdmin => 2,
            OrgRole::OrgEditor => 1,
            OrgRole::OrgViewer => 0,
        }
    }
}

impl std::fmt::Display for OrgRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrgRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "org_admin" => Ok(OrgRole::OrgAdmin),
            "org_editor" => Ok(OrgRole::OrgEditor),
            "org_viewer" => Ok(OrgRole::OrgViewer),
            _ => Err(format!("Invalid organization role: {}", s)),
        }
    }
}

/// Membership entity binding a user to an organization with a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub membership_id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: OrgRole,
    pub created_utc: DateTime<Utc>,
}

impl Membership {
    pub fn new(user_id: Uuid, organization_id: Uuid, role: OrgRole) -> Self {
        Self {
            membership_id: Uuid::new_v4(),
            user_id,
            organization_id,
            role,
            created_utc: Utc::now(),
        }
    }
}

/// Request to add a member to an organization.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NewMember {
    pub user_id: Uuid,
    pub role: OrgRole,
}

/// A membership joined with its organization's status, as read by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipRecord {
    pub organization_id: Uuid,
    pub role: OrgRole,
    pub organization_status: OrganizationStatus,
}

/// Immutable capture of a user's effective memberships.
///
/// Only memberships of `Approved` organizations are kept; a membership in a
/// pending or rejected organization is indistinguishable from no membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipSnapshot {
    user_id: Option<Uuid>,
    grants: HashMap<Uuid, OrgRole>,
}

impl MembershipSnapshot {
    /// Snapshot for an anonymous caller; holds no memberships.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build a snapshot from store records, dropping non-approved organizations.
    pub fn from_records(
        user_id: Uuid,
        records: impl IntoIterator<Item = MembershipRecord>,
    ) -> Self {
        let mut grants: HashMap<Uuid, OrgRole> = HashMap::new();
        for record in records {
            if record.organization_status != OrganizationStatus::Approved {
                continue;
            }
            grants
                .entry(record.organization_id)
                .and_modify(|role| {
                    if record.role.rank() > role.rank() {
                        *role = record.role;
                    }
                })
                .or_insert(record.role);
        }
        Self {
            user_id: Some(user_id),
            grants,
        }
    }

    /// User the snapshot was captured for; `None` for anonymous callers.
    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn role_in(&self, organization_id: Uuid) -> Option<OrgRole> {
        self.grants.get(&organization_id).copied()
    }

    pub fn is_member_of(&self, organization_id: Uuid) -> bool {
        self.grants.contains_key(&organization_id)
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(org: Uuid, role: OrgRole, status: OrganizationStatus) -> MembershipRecord {
        MembershipRecord {
            organization_id: org,
            role,
            organization_status: status,
        }
    }

    #[test]
    fn test_snapshot_drops_unapproved_organizations() {
        let user = Uuid::new_v4();
        let approved = Uuid::new_v4();
        let pending = Uuid::new_v4();
        let rejected = Uuid::new_v4();

        let snapshot = MembershipSnapshot::from_records(
            user,
            [
                record(approved, OrgRole::OrgViewer, OrganizationStatus::Approved),
                record(pending, OrgRole::OrgAdmin, OrganizationStatus::Pending),
                record(rejected, OrgRole::OrgAdmin, OrganizationStatus::Rejected),
            ],
        );

        assert_eq!(snapshot.user_id(), Some(user));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.role_in(approved), Some(OrgRole::OrgViewer));
        assert!(!snapshot.is_member_of(pending));
        assert!(!snapshot.is_member_of(rejected));
    }

    #[test]
    fn test_snapshot_keeps_strongest_role_for_duplicate_rows() {
        let org = Uuid::new_v4();
        let snapshot = MembershipSnapshot::from_records(
            Uuid::new_v4(),
            [
                record(org, OrgRole::OrgViewer, OrganizationStatus::Approved),
                record(org, OrgRole::OrgEditor, OrganizationStatus::Approved),
                record(org, OrgRole::OrgViewer, OrganizationStatus::Approved),
            ],
        );
        assert_eq!(snapshot.role_in(org), Some(OrgRole::OrgEditor));
    }

    #[test]
    fn test_role_capabilities() {
        assert!(OrgRole::OrgAdmin.can_edit_content());
        assert!(OrgRole::OrgEditor.can_edit_content());
        assert!(!OrgRole::OrgViewer.can_edit_content());

        assert!(OrgRole::OrgAdmin.can_manage_members());
        assert!(!OrgRole::OrgEditor.can_manage_members());
        assert!(!OrgRole::OrgViewer.can_manage_members());
    }

    #[test]
    fn test_role_codes() {
        assert_eq!("org_editor".parse::<OrgRole>().unwrap(), OrgRole::OrgEditor);
        assert_eq!(OrgRole::OrgAdmin.to_string(), "org_admin");
        assert!("owner".parse::<OrgRole>().is_err());
    }

    #[test]
    fn test_anonymous_snapshot_is_empty() {
        let snapshot = MembershipSnapshot::anonymous();
        assert!(snapshot.user_id().is_none());
        assert!(snapshot.is_empty());
    }
}
