//! Error taxonomy for the core
//!
//! Every failure here is recoverable and reported to the immediate caller.
//! The authorization guard itself never errors; [`CoreError::AuthorizationDenied`]
//! is only produced when a caller asks for a mutation to be enforced.

use thiserror::Error;
use uuid::Uuid;

use crate::capability::{Action, ResourceKind};
use crate::roles::Role;

/// Rejections produced by the lifecycle validator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("field '{0}' cannot be changed")]
    ImmutableField(&'static str),
    #[error("invalid {field} value: '{value}'")]
    InvalidEnumValue { field: &'static str, value: String },
}

/// Opaque failure from the persistence collaborator
#[derive(Debug, Error)]
pub enum StoreError {
    /// File is locked by another process
    #[error("file is locked by another user/process")]
    FileLocked,
    #[error("requirement not found: {0}")]
    RequirementNotFound(Uuid),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by [`crate::service::RequirementService`]
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{} may not {action} {resource}", role_label(.role))]
    AuthorizationDenied {
        role: Option<Role>,
        action: Action,
        resource: ResourceKind,
    },
    #[error("requirement not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;

fn role_label(role: &Option<Role>) -> &'static str {
    role.map(Role::display_name).unwrap_or("an anonymous user")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_variants() {
        let errors: Vec<CoreError> = vec![
            CoreError::AuthorizationDenied {
                role: Some(Role::Tester),
                action: Action::Edit,
                resource: ResourceKind::Requirement,
            },
            CoreError::NotFound("REQ-404".to_string()),
            ValidationError::EmptyTitle.into(),
            ValidationError::ImmutableField("id").into(),
            ValidationError::InvalidEnumValue {
                field: "status",
                value: "done".to_string(),
            }
            .into(),
            StoreError::FileLocked.into(),
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }

    #[test]
    fn test_denial_message_names_role_and_resource() {
        let err = CoreError::AuthorizationDenied {
            role: Some(Role::Tester),
            action: Action::Create,
            resource: ResourceKind::Requirement,
        };
        assert_eq!(err.to_string(), "Tester may not create requirement");

        let anon = CoreError::AuthorizationDenied {
            role: None,
            action: Action::View,
            resource: ResourceKind::Requirement,
        };
        assert_eq!(anon.to_string(), "an anonymous user may not view requirement");
    }

    #[test]
    fn test_store_error_is_propagated_verbatim() {
        let err: CoreError = StoreError::from(anyhow::anyhow!("disk full")).into();
        assert_eq!(err.to_string(), "disk full");
    }
}
