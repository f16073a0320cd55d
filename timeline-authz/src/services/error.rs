use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::OrganizationStatus;
use crate::policy::DenyReason;

pub type AuthzResult<T> = Result<T, AuthzError>;

#[derive(Error, Debug)]
pub enum AuthzError {
    #[error("Authentication required")]
    NotAuthenticated,

    /// The reason is kept for logs; it is never rendered to the caller.
    #[error("Access denied")]
    NotAuthorized(DenyReason),

    #[error("Organization {organization_id} is {status}; transition not allowed")]
    InvalidState {
        organization_id: Uuid,
        status: OrganizationStatus,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuthzError {
    /// Deny reason for `NotAuthorized`, if any.
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            AuthzError::NotAuthorized(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotAuthenticated => {
                AppError::Unauthorized(anyhow::anyhow!("Authentication required"))
            }
            AuthzError::InvalidToken(_) => {
                AppError::Unauthorized(anyhow::anyhow!("Authentication required"))
            }
            AuthzError::NotAuthorized(_) => AppError::Forbidden(anyhow::anyhow!("Access denied")),
            AuthzError::InvalidState { .. } => {
                AppError::Conflict(anyhow::anyhow!("Organization is not awaiting review"))
            }
            AuthzError::NotFound(what) => AppError::NotFound(anyhow::anyhow!("{} not found", what)),
            AuthzError::Conflict(e) => AppError::Conflict(anyhow::anyhow!(e)),
            AuthzError::MalformedRequest(e) => AppError::BadRequest(anyhow::anyhow!(e)),
            AuthzError::Validation(e) => AppError::ValidationError(e),
            AuthzError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            AuthzError::Internal(e) => AppError::InternalError(e),
        }
    }
}
