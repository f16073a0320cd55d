//! Principal model - the authenticated (or anonymous) actor of a request.

use uuid::Uuid;

use crate::services::AuthzError;

/// The actor a request is evaluated for.
///
/// Built once per request by the principal resolver and never persisted. An
/// anonymous principal has no user id and is never a super-admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Principal {
    user_id: Option<Uuid>,
    is_super_admin: bool,
}

impl Principal {
    /// An authenticated principal.
    pub fn new(user_id: Uuid, is_super_admin: bool) -> Self {
        Self {
            user_id: Some(user_id),
            is_super_admin,
        }
    }

    /// An authenticated, non-privileged user.
    pub fn user(user_id: Uuid) -> Self {
        Self::new(user_id, false)
    }

    /// An authenticated super-admin.
    pub fn super_admin(user_id: Uuid) -> Self {
        Self::new(user_id, true)
    }

    /// A caller without a resolvable identity.
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            is_super_admin: false,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn is_super_admin(&self) -> bool {
        self.is_super_admin
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }

    /// Check whether this principal is the given user.
    pub fn is_user(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id)
    }

    /// Return the user id, or `NotAuthenticated` for anonymous callers.
    pub fn require_authenticated(&self) -> Result<Uuid, AuthzError> {
        self.user_id.ok_or(AuthzError::NotAuthenticated)
    }
}
