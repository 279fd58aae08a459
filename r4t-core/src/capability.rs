//! Capability matrix
//!
//! The single table mapping `(resource kind, action)` to the roles allowed to
//! perform it. Navigation entries, requirement mutations and the test-case and
//! test-run controls all read from [`GRANTS`]; nothing else in the crate
//! carries permission literals.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::roles::Role;
use crate::roles::Role::{RequirementsEngineer, TestCaseCreator, TestManager, Tester};

/// Something a caller may want to do with a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "view" => Ok(Action::View),
            "create" => Ok(Action::Create),
            "edit" => Ok(Action::Edit),
            _ => Err(format!("unknown action: {}", s)),
        }
    }
}

/// Top-level navigation destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    Dashboard,
    Requirements,
    TestCases,
    TestRuns,
    MyTests,
}

impl Route {
    /// All routes in menu order
    pub const fn all() -> [Route; 5] {
        [
            Route::Dashboard,
            Route::Requirements,
            Route::TestCases,
            Route::TestRuns,
            Route::MyTests,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Route::Dashboard => "dashboard",
            Route::Requirements => "requirements",
            Route::TestCases => "test-cases",
            Route::TestRuns => "test-runs",
            Route::MyTests => "my-tests",
        }
    }

    /// URL path the presentation layer mounts this route on
    pub fn path(self) -> &'static str {
        match self {
            Route::Dashboard => "/",
            Route::Requirements => "/requirements",
            Route::TestCases => "/test-cases",
            Route::TestRuns => "/test-runs",
            Route::MyTests => "/my-tests",
        }
    }

    /// Menu label
    pub fn label(self) -> &'static str {
        match self {
            Route::Dashboard => "Dashboard",
            Route::Requirements => "Requirements",
            Route::TestCases => "Test Cases",
            Route::TestRuns => "Test Runs",
            Route::MyTests => "My Tests",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('/').to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "" | "dashboard" => Ok(Route::Dashboard),
            "requirements" => Ok(Route::Requirements),
            "test-cases" => Ok(Route::TestCases),
            "test-runs" => Ok(Route::TestRuns),
            "my-tests" => Ok(Route::MyTests),
            _ => Err(format!("unknown route: {}", s)),
        }
    }
}

/// The kind of thing an action targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Navigation(Route),
    Requirement,
    TestCase,
    TestRun,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Navigation(route) => write!(f, "navigation:{}", route),
            ResourceKind::Requirement => f.write_str("requirement"),
            ResourceKind::TestCase => f.write_str("test_case"),
            ResourceKind::TestRun => f.write_str("test_run"),
        }
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    /// Accepts `requirement`, `test_case`, `test_run` or `navigation:<route>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(route) = s.strip_prefix("navigation:") {
            return route.parse().map(ResourceKind::Navigation);
        }
        match s.to_lowercase().replace('-', "_").as_str() {
            "requirement" | "requirements" => Ok(ResourceKind::Requirement),
            "test_case" | "test_cases" => Ok(ResourceKind::TestCase),
            "test_run" | "test_runs" => Ok(ResourceKind::TestRun),
            _ => Err(format!("unknown resource: {}", s)),
        }
    }
}

const ALL_ROLES: &[Role] = &[RequirementsEngineer, TestManager, TestCaseCreator, Tester];
const REQUIREMENT_READERS: &[Role] = &[RequirementsEngineer, TestManager, TestCaseCreator];
const TEST_CASE_READERS: &[Role] = &[TestCaseCreator, TestManager, Tester];
const TEST_CASE_AUTHORS: &[Role] = &[TestCaseCreator, TestManager];
const TEST_RUN_READERS: &[Role] = &[TestManager, Tester];

/// Every grant in the system. A `(resource, action)` pair absent from this
/// table is denied to all roles.
pub const GRANTS: &[(ResourceKind, Action, &[Role])] = &[
    (ResourceKind::Navigation(Route::Dashboard), Action::View, ALL_ROLES),
    (ResourceKind::Navigation(Route::Requirements), Action::View, REQUIREMENT_READERS),
    (ResourceKind::Navigation(Route::TestCases), Action::View, TEST_CASE_READERS),
    (ResourceKind::Navigation(Route::TestRuns), Action::View, TEST_RUN_READERS),
    (ResourceKind::Navigation(Route::MyTests), Action::View, &[Tester]),
    (ResourceKind::Requirement, Action::View, REQUIREMENT_READERS),
    (ResourceKind::Requirement, Action::Create, &[RequirementsEngineer]),
    (ResourceKind::Requirement, Action::Edit, &[RequirementsEngineer]),
    (ResourceKind::TestCase, Action::View, TEST_CASE_READERS),
    (ResourceKind::TestCase, Action::Create, TEST_CASE_AUTHORS),
    (ResourceKind::TestCase, Action::Edit, TEST_CASE_AUTHORS),
    (ResourceKind::TestRun, Action::View, TEST_RUN_READERS),
    (ResourceKind::TestRun, Action::Create, &[TestManager]),
    (ResourceKind::TestRun, Action::Edit, &[TestManager]),
];

/// Read-only view over [`GRANTS`]
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityMatrix;

impl CapabilityMatrix {
    /// Roles allowed to perform `action` on `resource`
    pub fn allowed_roles(self, resource: ResourceKind, action: Action) -> &'static [Role] {
        GRANTS
            .iter()
            .find(|(r, a, _)| *r == resource && *a == action)
            .map(|(_, _, roles)| *roles)
            .unwrap_or(&[])
    }

    pub fn allows(self, role: Role, resource: ResourceKind, action: Action) -> bool {
        self.allowed_roles(resource, action).contains(&role)
    }

    /// Every `(resource, action)` pair granted to `role`
    pub fn grants_for(self, role: Role) -> Vec<(ResourceKind, Action)> {
        GRANTS
            .iter()
            .filter(|(_, _, roles)| roles.contains(&role))
            .map(|(resource, action, _)| (*resource, *action))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_no_duplicate_grants() {
        let mut seen = HashSet::new();
        for (resource, action, _) in GRANTS {
            assert!(seen.insert((*resource, *action)), "duplicate grant for {} {}", action, resource);
        }
    }

    #[test]
    fn test_every_route_has_a_view_grant() {
        let matrix = CapabilityMatrix;
        for route in Route::all() {
            assert!(!matrix
                .allowed_roles(ResourceKind::Navigation(route), Action::View)
                .is_empty());
        }
    }

    #[test]
    fn test_navigation_is_view_only() {
        let matrix = CapabilityMatrix;
        for route in Route::all() {
            for action in [Action::Create, Action::Edit] {
                assert!(matrix
                    .allowed_roles(ResourceKind::Navigation(route), action)
                    .is_empty());
            }
        }
    }

    #[test]
    fn test_resource_kind_parse_and_display() {
        let nav: ResourceKind = "navigation:test-runs".parse().unwrap();
        assert_eq!(nav, ResourceKind::Navigation(Route::TestRuns));
        assert_eq!(nav.to_string(), "navigation:test-runs");
        assert_eq!("requirement".parse::<ResourceKind>(), Ok(ResourceKind::Requirement));
        assert_eq!("test-case".parse::<ResourceKind>(), Ok(ResourceKind::TestCase));
        assert!("navigation:admin".parse::<ResourceKind>().is_err());
        assert!("invoice".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_route_parses_paths() {
        assert_eq!("/".parse::<Route>(), Ok(Route::Dashboard));
        assert_eq!("/my-tests".parse::<Route>(), Ok(Route::MyTests));
        assert_eq!("test_cases".parse::<Route>(), Ok(Route::TestCases));
        for route in Route::all() {
            assert_eq!(route.path().parse::<Route>(), Ok(route));
        }
    }

    #[test]
    fn test_grants_for_tester() {
        let grants = CapabilityMatrix.grants_for(Role::Tester);
        assert!(grants.contains(&(ResourceKind::Navigation(Route::MyTests), Action::View)));
        assert!(!grants.contains(&(ResourceKind::Requirement, Action::View)));
        assert!(!grants.iter().any(|(_, action)| *action != Action::View));
    }
}
