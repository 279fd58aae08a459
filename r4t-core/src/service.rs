//! Requirement workflow: guard, then validator, then store.
//!
//! Every caller that reads or changes requirements goes through
//! [`RequirementService`] so the capability matrix and the lifecycle rules
//! are applied the same way from the CLI, tests, or any other front end.

use log::{info, warn};

use crate::capability::{Action, ResourceKind};
use crate::db::DatabaseBackend;
use crate::error::{CoreError, CoreResult};
use crate::filter::{apply_filters, FilterState};
use crate::guard::authorize;
use crate::models::{Requirement, RequirementInput, RequirementListing, RequirementPatch};
use crate::session::{IdentityProvider, Session};
use crate::validation::{validate_create, validate_update};

pub struct RequirementService {
    backend: Box<dyn DatabaseBackend>,
}

impl RequirementService {
    pub fn new(backend: Box<dyn DatabaseBackend>) -> Self {
        Self { backend }
    }

    /// The underlying store, for user management and maintenance commands
    pub fn backend(&self) -> &dyn DatabaseBackend {
        self.backend.as_ref()
    }

    /// Lists requirements newest first, narrowed by `filter`
    pub fn list<I: IdentityProvider + ?Sized>(
        &self,
        identity: &I,
        filter: &FilterState,
    ) -> CoreResult<Vec<RequirementListing>> {
        authorize(identity.current_role(), Action::View, ResourceKind::Requirement)?;
        let listings = self.backend.list_requirements()?;
        Ok(apply_filters(&listings, filter))
    }

    /// Looks up one requirement by UUID or `REQ-NNN` id
    pub fn get<I: IdentityProvider + ?Sized>(&self, identity: &I, key: &str) -> CoreResult<Requirement> {
        authorize(identity.current_role(), Action::View, ResourceKind::Requirement)?;
        self.find(key)
    }

    pub fn create<I: IdentityProvider + ?Sized>(
        &self,
        identity: &I,
        input: RequirementInput,
    ) -> CoreResult<Requirement> {
        let session = require_session(identity, Action::Create)?;
        authorize(Some(session.role), Action::Create, ResourceKind::Requirement)?;

        let new = validate_create(input, session.user_id).map_err(|e| {
            warn!("create rejected for {}: {}", session.user_id, e);
            e
        })?;
        let requirement = self.backend.insert_requirement(new)?;
        info!(
            "{} created {} '{}'",
            session.user_id,
            requirement.display_id(),
            requirement.title
        );
        Ok(requirement)
    }

    pub fn update<I: IdentityProvider + ?Sized>(
        &self,
        identity: &I,
        key: &str,
        patch: RequirementPatch,
    ) -> CoreResult<Requirement> {
        let session = require_session(identity, Action::Edit)?;
        authorize(Some(session.role), Action::Edit, ResourceKind::Requirement)?;

        let existing = self.find(key)?;
        let merged = validate_update(&existing, patch).map_err(|e| {
            warn!("update of {} rejected: {}", existing.display_id(), e);
            e
        })?;
        let updated = self.backend.update_requirement(&merged)?;
        info!("{} updated {}", session.user_id, updated.display_id());
        Ok(updated)
    }

    fn find(&self, key: &str) -> CoreResult<Requirement> {
        self.backend
            .find_requirement(key)?
            .ok_or_else(|| CoreError::NotFound(key.to_string()))
    }
}

/// Mutations need a signed-in user, who becomes the author
fn require_session<I: IdentityProvider + ?Sized>(identity: &I, action: Action) -> CoreResult<Session> {
    identity.current_session().ok_or(CoreError::AuthorizationDenied {
        role: None,
        action,
        resource: ResourceKind::Requirement,
    })
}
