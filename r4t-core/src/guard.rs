//! Authorization guard
//!
//! [`can_perform`] is the one permission check every caller uses, whether it is
//! deciding to render a control or about to accept a mutation. It is a pure
//! function of its arguments and the static [`CapabilityMatrix`].

use log::debug;

use crate::capability::{Action, CapabilityMatrix, ResourceKind, Route};
use crate::error::{CoreError, CoreResult};
use crate::roles::Role;

/// Whether `role` may perform `action` on `resource`
///
/// An absent role (unauthenticated, or profile not loaded yet) is denied
/// everything.
pub fn can_perform(role: Option<Role>, action: Action, resource: ResourceKind) -> bool {
    match role {
        Some(role) => CapabilityMatrix.allows(role, resource, action),
        None => false,
    }
}

/// Like [`can_perform`], but turns a denial into [`CoreError::AuthorizationDenied`]
pub fn authorize(role: Option<Role>, action: Action, resource: ResourceKind) -> CoreResult<()> {
    if can_perform(role, action, resource) {
        Ok(())
    } else {
        debug!("denied {} on {} for {:?}", action, resource, role);
        Err(CoreError::AuthorizationDenied {
            role,
            action,
            resource,
        })
    }
}

/// Navigation entries `role` may see, in menu order
pub fn visible_routes(role: Option<Role>) -> Vec<Route> {
    Route::all()
        .into_iter()
        .filter(|route| can_perform(role, Action::View, ResourceKind::Navigation(*route)))
        .collect()
}
