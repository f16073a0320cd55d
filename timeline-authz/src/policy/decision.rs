//! Decision values returned by the policy evaluator.

/// Why a request was denied.
///
/// Reasons are for logs and tests only; callers render every deny the same
/// way so that probers learn nothing about membership structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    /// No rule allows this combination of resource and operation.
    NoMatchingRule,
    /// The principal has no effective membership in the organization.
    NotAMember,
    /// The principal's role in the organization is too weak.
    InsufficientRole,
    /// The principal does not own the legacy topic.
    NotOwner,
    /// Legacy public topics are read-only for everyone but super-admins.
    PublicTopicReadOnly,
    /// Anonymous principals never write.
    AnonymousWrite,
    /// Only super-admins may perform this operation.
    SuperAdminOnly,
    /// The membership snapshot was captured for a different user.
    SnapshotMismatch,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NoMatchingRule => "no matching rule",
            DenyReason::NotAMember => "not a member of the organization",
            DenyReason::InsufficientRole => "organization role does not permit this operation",
            DenyReason::NotOwner => "not the owner of the topic",
            DenyReason::PublicTopicReadOnly => "public legacy topics are read-only",
            DenyReason::AnonymousWrite => "anonymous principals cannot write",
            DenyReason::SuperAdminOnly => "super-admin only",
            DenyReason::SnapshotMismatch => "membership snapshot does not belong to the principal",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn is_denied(&self) -> bool {
        !self.is_allowed()
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(*reason),
        }
    }

    /// `Allow` when `allowed` holds, otherwise `Deny(reason)`.
    pub fn allow_if(allowed: bool, reason: DenyReason) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny(reason)
        }
    }

    /// First allow wins; otherwise keep the first deny.
    pub fn or_else(self, other: impl FnOnce() -> Decision) -> Self {
        match self {
            Decision::Allow => Decision::Allow,
            Decision::Deny(reason) => match other() {
                Decision::Allow => Decision::Allow,
                Decision::Deny(_) => Decision::Deny(reason),
            },
        }
    }
}
