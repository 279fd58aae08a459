//! Role registry
//!
//! The closed set of actor categories. Every permission decision in the crate
//! is keyed by [`Role`]; there are no dynamic roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four fixed actor categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    RequirementsEngineer,
    TestManager,
    TestCaseCreator,
    Tester,
}

impl Role {
    /// All roles, in the order they are presented to users
    pub const fn all() -> [Role; 4] {
        [
            Role::RequirementsEngineer,
            Role::TestManager,
            Role::TestCaseCreator,
            Role::Tester,
        ]
    }

    /// Stable identifier used in storage and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            Role::RequirementsEngineer => "requirements_engineer",
            Role::TestManager => "test_manager",
            Role::TestCaseCreator => "test_case_creator",
            Role::Tester => "tester",
        }
    }

    /// Human-readable label
    pub fn display_name(self) -> &'static str {
        match self {
            Role::RequirementsEngineer => "Requirements Engineer",
            Role::TestManager => "Test Manager",
            Role::TestCaseCreator => "Test Case Creator",
            Role::Tester => "Tester",
        }
    }

    /// What a member of this role is expected to do, as shown on the dashboard
    pub fn responsibilities(self) -> &'static [&'static str] {
        match self {
            Role::RequirementsEngineer => &[
                "Create and manage requirements",
                "Monitor requirement quality",
                "Coordinate with stakeholders",
            ],
            Role::TestManager => &[
                "Create and manage test runs",
                "Assign test cases to testers",
                "Monitor test status",
                "Create test cases",
            ],
            Role::TestCaseCreator => &[
                "Create test cases for requirements",
                "Define test steps",
                "Maintain test case quality",
            ],
            Role::Tester => &[
                "Execute assigned tests",
                "Record test results",
                "Document defects",
            ],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error returned when a string does not name a known role
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "requirements_engineer" => Ok(Role::RequirementsEngineer),
            "test_manager" => Ok(Role::TestManager),
            "test_case_creator" => Ok(Role::TestCaseCreator),
            "tester" => Ok(Role::Tester),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Label for a raw role identifier, falling back to the identifier itself
///
/// For presentation code that still holds roles as strings (for example, values
/// read from an older profile table).
pub fn display_role_id(raw: &str) -> String {
    raw.parse::<Role>()
        .map(|role| role.display_name().to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_list_is_closed() {
        let roles = Role::all();
        assert_eq!(roles.len(), 4);
        let unique: std::collections::HashSet<_> = roles.iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_role_identifier_roundtrip() {
        for role in Role::all() {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert_eq!("Test-Manager".parse::<Role>(), Ok(Role::TestManager));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Role::RequirementsEngineer.display_name(), "Requirements Engineer");
        assert_eq!(Role::TestManager.to_string(), "Test Manager");
        assert_eq!(Role::TestCaseCreator.display_name(), "Test Case Creator");
        assert_eq!(Role::Tester.display_name(), "Tester");
    }

    #[test]
    fn test_display_role_id_falls_back_to_raw() {
        assert_eq!(display_role_id("tester"), "Tester");
        assert_eq!(display_role_id("auditor"), "auditor");
    }

    #[test]
    fn test_role_serializes_snake_case() {
        let yaml = serde_yaml::to_string(&Role::TestCaseCreator).unwrap();
        assert_eq!(yaml.trim(), "test_case_creator");
        let role: Role = serde_yaml::from_str("requirements_engineer").unwrap();
        assert_eq!(role, Role::RequirementsEngineer);
    }

    #[test]
    fn test_every_role_has_responsibilities() {
        for role in Role::all() {
            assert!(!role.responsibilities().is_empty());
        }
    }
}
