use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::roles::Role;

/// Lifecycle status of a requirement
///
/// Any status may be set from any other; there is no enforced ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    Draft,
    Approved,
    Implemented,
    Tested,
}

impl RequirementStatus {
    pub const fn all() -> [RequirementStatus; 4] {
        [
            RequirementStatus::Draft,
            RequirementStatus::Approved,
            RequirementStatus::Implemented,
            RequirementStatus::Tested,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequirementStatus::Draft => "draft",
            RequirementStatus::Approved => "approved",
            RequirementStatus::Implemented => "implemented",
            RequirementStatus::Tested => "tested",
        }
    }
}

impl Default for RequirementStatus {
    fn default() -> Self {
        RequirementStatus::Draft
    }
}

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementStatus::Draft => write!(f, "Draft"),
            RequirementStatus::Approved => write!(f, "Approved"),
            RequirementStatus::Implemented => write!(f, "Implemented"),
            RequirementStatus::Tested => write!(f, "Tested"),
        }
    }
}

impl FromStr for RequirementStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(RequirementStatus::Draft),
            "approved" => Ok(RequirementStatus::Approved),
            "implemented" => Ok(RequirementStatus::Implemented),
            "tested" => Ok(RequirementStatus::Tested),
            _ => Err(ValidationError::InvalidEnumValue {
                field: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// Priority level of a requirement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RequirementPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl RequirementPriority {
    /// Most urgent first, the order filter menus list them in
    pub const fn all() -> [RequirementPriority; 4] {
        [
            RequirementPriority::Critical,
            RequirementPriority::High,
            RequirementPriority::Medium,
            RequirementPriority::Low,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequirementPriority::Low => "low",
            RequirementPriority::Medium => "medium",
            RequirementPriority::High => "high",
            RequirementPriority::Critical => "critical",
        }
    }
}

impl Default for RequirementPriority {
    fn default() -> Self {
        RequirementPriority::Medium
    }
}

impl fmt::Display for RequirementPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementPriority::Low => write!(f, "Low"),
            RequirementPriority::Medium => write!(f, "Medium"),
            RequirementPriority::High => write!(f, "High"),
            RequirementPriority::Critical => write!(f, "Critical"),
        }
    }
}

impl FromStr for RequirementPriority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(RequirementPriority::Low),
            "medium" => Ok(RequirementPriority::Medium),
            "high" => Ok(RequirementPriority::High),
            "critical" => Ok(RequirementPriority::Critical),
            _ => Err(ValidationError::InvalidEnumValue {
                field: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// A tracked requirement as persisted by the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirement {
    /// Unique identifier, assigned by the store
    pub id: Uuid,

    /// Human-friendly identifier (e.g., "REQ-001"), assigned by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_id: Option<String>,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub status: RequirementStatus,

    pub priority: RequirementPriority,

    /// Authoring user; set once at creation
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Requirement {
    /// Identifier to show users: the REQ-ID when assigned, otherwise the UUID
    pub fn display_id(&self) -> String {
        self.spec_id
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Raw creation request, as submitted by a form or an API client
///
/// `status` and `priority` are kept as strings so that the validator, not the
/// transport, decides whether they are legal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequirementInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

impl RequirementInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Raw update request
///
/// `id`, `spec_id`, `created_by` and the timestamps exist only so that
/// attempts to change them can be detected and rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequirementPatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "specId")]
    pub spec_id: Option<String>,
    #[serde(default, alias = "createdBy")]
    pub created_by: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// `Some("")` clears the description
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

impl RequirementPatch {
    /// First store-assigned field the patch tries to set, if any
    pub fn immutable_field(&self) -> Option<&'static str> {
        [
            ("id", &self.id),
            ("spec_id", &self.spec_id),
            ("created_by", &self.created_by),
            ("created_at", &self.created_at),
            ("updated_at", &self.updated_at),
        ]
        .into_iter()
        .find(|(_, value)| value.is_some())
        .map(|(field, _)| field)
    }

    pub fn is_empty(&self) -> bool {
        self.immutable_field().is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
    }
}

/// Validated fields of a requirement that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequirement {
    pub title: String,
    pub description: Option<String>,
    pub status: RequirementStatus,
    pub priority: RequirementPriority,
    pub created_by: Uuid,
}

/// A user profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(full_name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: full_name.into(),
            email: email.into(),
            role,
            created_at: Utc::now(),
        }
    }

    pub fn author(&self) -> Author {
        Author {
            full_name: self.full_name.clone(),
            email: self.email.clone(),
        }
    }

    /// Two-letter initials for avatars
    pub fn initials(&self) -> String {
        let initials: String = self
            .full_name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .take(2)
            .collect();
        if initials.is_empty() {
            "U".to_string()
        } else {
            initials
        }
    }
}

/// Minimal author projection joined onto listed requirements
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub full_name: String,
    pub email: String,
}

impl Author {
    pub fn label(&self) -> &str {
        if !self.full_name.is_empty() {
            &self.full_name
        } else if !self.email.is_empty() {
            &self.email
        } else {
            "Unknown"
        }
    }
}

/// A requirement together with its author, as returned by list queries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequirementListing {
    #[serde(flatten)]
    pub requirement: Requirement,
    #[serde(default)]
    pub author: Option<Author>,
}

impl RequirementListing {
    pub fn author_label(&self) -> &str {
        self.author.as_ref().map(Author::label).unwrap_or("Unknown")
    }
}

/// Everything the file-based stores persist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequirementsStore {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default = "default_next_spec_number")]
    pub next_spec_number: u32,
}

/// Default value for next_spec_number
fn default_next_spec_number() -> u32 {
    1
}

impl Default for RequirementsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RequirementsStore {
    /// Creates an empty requirements store
    pub fn new() -> Self {
        Self {
            name: String::new(),
            requirements: Vec::new(),
            users: Vec::new(),
            next_spec_number: 1,
        }
    }

    /// Gets a requirement by ID
    pub fn get_requirement_by_id(&self, id: &Uuid) -> Option<&Requirement> {
        self.requirements.iter().find(|r| r.id == *id)
    }

    /// Gets a mutable reference to a requirement by ID
    pub fn get_requirement_by_id_mut(&mut self, id: &Uuid) -> Option<&mut Requirement> {
        self.requirements.iter_mut().find(|r| r.id == *id)
    }

    /// Gets a requirement by REQ-ID (case-insensitive)
    pub fn get_requirement_by_spec_id(&self, spec_id: &str) -> Option<&Requirement> {
        self.requirements.iter().find(|r| {
            r.spec_id
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(spec_id))
        })
    }

    /// Resolves either a UUID or a REQ-ID
    pub fn find_requirement(&self, key: &str) -> Option<&Requirement> {
        match Uuid::parse_str(key) {
            Ok(id) => self.get_requirement_by_id(&id),
            Err(_) => self.get_requirement_by_spec_id(key),
        }
    }

    /// Gets the next REQ-ID that would be assigned
    pub fn peek_next_spec_id(&self) -> String {
        format_spec_id(self.next_spec_number)
    }

    /// Stores a validated requirement, assigning its id, REQ-ID and timestamps
    pub fn insert_requirement(&mut self, new: NewRequirement) -> Requirement {
        let now = Utc::now();
        let requirement = Requirement {
            id: Uuid::new_v4(),
            spec_id: Some(format_spec_id(self.next_spec_number)),
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        self.next_spec_number += 1;
        self.requirements.push(requirement.clone());
        requirement
    }

    /// Replaces the mutable fields of a stored requirement and stamps `updated_at`
    ///
    /// Returns `None` if no requirement has that id. Identity and authorship of
    /// the stored record are never overwritten.
    pub fn update_requirement(&mut self, requirement: &Requirement) -> Option<Requirement> {
        let stored = self.get_requirement_by_id_mut(&requirement.id)?;
        stored.title = requirement.title.clone();
        stored.description = requirement.description.clone();
        stored.status = requirement.status;
        stored.priority = requirement.priority;
        stored.updated_at = Utc::now();
        Some(stored.clone())
    }

    /// All requirements, newest first, joined with their authors
    pub fn listings(&self) -> Vec<RequirementListing> {
        let mut listings: Vec<RequirementListing> = self
            .requirements
            .iter()
            .map(|r| RequirementListing {
                requirement: r.clone(),
                author: self.get_user(&r.created_by).map(User::author),
            })
            .collect();
        // Stable sort; requirements created in the same instant keep the later one first
        listings.reverse();
        listings.sort_by(|a, b| b.requirement.created_at.cmp(&a.requirement.created_at));
        listings
    }

    /// Gets a user by ID
    pub fn get_user(&self, id: &Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == *id)
    }

    /// Finds a user by UUID or email (case-insensitive)
    pub fn find_user(&self, login: &str) -> Option<&User> {
        match Uuid::parse_str(login) {
            Ok(id) => self.get_user(&id),
            Err(_) => self
                .users
                .iter()
                .find(|u| u.email.eq_ignore_ascii_case(login.trim())),
        }
    }

    /// Validates that all REQ-IDs are unique
    pub fn validate_unique_spec_ids(&self) -> anyhow::Result<()> {
        use std::collections::HashSet;
        let mut seen = HashSet::new();

        for req in &self.requirements {
            if let Some(spec_id) = &req.spec_id {
                if !seen.insert(spec_id.to_uppercase()) {
                    anyhow::bail!("Duplicate REQ-ID found: {}", spec_id);
                }
            }
        }

        Ok(())
    }

    /// Checks what the backends require of a whole store before it is
    /// written wholesale: non-empty titles, unique REQ-IDs and unique emails
    /// ignoring case
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(req) = self.requirements.iter().find(|r| r.title.trim().is_empty()) {
            anyhow::bail!("Requirement {} has an empty title", req.display_id());
        }
        self.validate_unique_spec_ids()?;

        let mut emails = std::collections::HashSet::new();
        for user in &self.users {
            if !emails.insert(user.email.to_lowercase()) {
                anyhow::bail!("Duplicate user email found: {}", user.email);
            }
        }

        Ok(())
    }
}

fn format_spec_id(number: u32) -> String {
    format!("REQ-{:03}", number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_requirement(title: &str, author: Uuid) -> NewRequirement {
        NewRequirement {
            title: title.to_string(),
            description: None,
            status: RequirementStatus::Draft,
            priority: RequirementPriority::Medium,
            created_by: author,
        }
    }

    #[test]
    fn test_insert_assigns_ids_and_timestamps() {
        let mut store = RequirementsStore::new();
        let author = Uuid::new_v4();

        let first = store.insert_requirement(new_requirement("First", author));
        let second = store.insert_requirement(new_requirement("Second", author));

        assert_eq!(first.spec_id.as_deref(), Some("REQ-001"));
        assert_eq!(second.spec_id.as_deref(), Some("REQ-002"));
        assert_ne!(first.id, second.id);
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(first.created_by, author);
        assert_eq!(store.peek_next_spec_id(), "REQ-003");
    }

    #[test]
    fn test_find_requirement_by_uuid_or_spec_id() {
        let mut store = RequirementsStore::new();
        let req = store.insert_requirement(new_requirement("Login", Uuid::new_v4()));

        assert_eq!(store.find_requirement(&req.id.to_string()).map(|r| r.id), Some(req.id));
        assert_eq!(store.find_requirement("req-001").map(|r| r.id), Some(req.id));
        assert!(store.find_requirement("REQ-999").is_none());
    }

    #[test]
    fn test_update_keeps_identity_and_author() {
        let mut store = RequirementsStore::new();
        let author = Uuid::new_v4();
        let original = store.insert_requirement(new_requirement("Login", author));

        let mut changed = original.clone();
        changed.title = "Login v2".to_string();
        changed.status = RequirementStatus::Tested;
        changed.created_by = Uuid::new_v4();

        let stored = store.update_requirement(&changed).unwrap();
        assert_eq!(stored.title, "Login v2");
        assert_eq!(stored.status, RequirementStatus::Tested);
        assert_eq!(stored.created_by, author);
        assert_eq!(stored.spec_id, original.spec_id);
        assert!(stored.updated_at >= original.updated_at);

        let mut missing = original;
        missing.id = Uuid::new_v4();
        assert!(store.update_requirement(&missing).is_none());
    }

    #[test]
    fn test_listings_are_newest_first_with_author() {
        let mut store = RequirementsStore::new();
        let user = User::new("Ada Lovelace", "ada@example.com", Role::RequirementsEngineer);
        store.users.push(user.clone());

        let older = store.insert_requirement(new_requirement("Older", user.id));
        let newer = store.insert_requirement(new_requirement("Newer", Uuid::new_v4()));
        store.requirements[0].created_at = Utc::now() - Duration::hours(1);

        let listings = store.listings();
        assert_eq!(listings[0].requirement.id, newer.id);
        assert_eq!(listings[1].requirement.id, older.id);
        assert_eq!(listings[1].author_label(), "Ada Lovelace");
        assert_eq!(listings[0].author_label(), "Unknown");
    }

    #[test]
    fn test_listings_tie_keeps_latest_insert_first() {
        let mut store = RequirementsStore::new();
        let author = Uuid::new_v4();
        let a = store.insert_requirement(new_requirement("A", author));
        let b = store.insert_requirement(new_requirement("B", author));
        let stamp = Utc::now();
        for req in &mut store.requirements {
            req.created_at = stamp;
        }

        let ids: Vec<Uuid> = store.listings().iter().map(|l| l.requirement.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn test_find_user_by_email_or_id() {
        let mut store = RequirementsStore::new();
        let user = User::new("Grace Hopper", "grace@example.com", Role::Tester);
        store.users.push(user.clone());

        assert_eq!(store.find_user("GRACE@example.com").map(|u| u.id), Some(user.id));
        assert_eq!(store.find_user(&user.id.to_string()).map(|u| u.id), Some(user.id));
        assert!(store.find_user("nobody@example.com").is_none());
    }

    #[test]
    fn test_validate_unique_spec_ids_duplicate() {
        let mut store = RequirementsStore::new();
        let author = Uuid::new_v4();
        store.insert_requirement(new_requirement("R1", author));
        store.insert_requirement(new_requirement("R2", author));
        assert!(store.validate_unique_spec_ids().is_ok());

        store.requirements[1].spec_id = Some("REQ-001".into());
        let result = store.validate_unique_spec_ids();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Duplicate REQ-ID"));
    }

    #[test]
    fn test_validate_whole_store() {
        let mut store = RequirementsStore::new();
        store.insert_requirement(new_requirement("Login", Uuid::new_v4()));
        store.users.push(User::new("A", "a@x.com", Role::Tester));
        assert!(store.validate().is_ok());

        let mut blank = store.clone();
        blank.requirements[0].title = "   ".to_string();
        assert!(blank.validate().unwrap_err().to_string().contains("empty title"));

        let mut twins = store.clone();
        twins.users.push(User::new("B", "A@X.com", Role::TestManager));
        assert!(twins.validate().unwrap_err().to_string().contains("A@X.com"));
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Approved".parse::<RequirementStatus>(), Ok(RequirementStatus::Approved));
        assert_eq!("critical".parse::<RequirementPriority>(), Ok(RequirementPriority::Critical));
        assert_eq!(
            "done".parse::<RequirementStatus>(),
            Err(ValidationError::InvalidEnumValue {
                field: "status",
                value: "done".to_string()
            })
        );
        assert!("urgent".parse::<RequirementPriority>().is_err());
    }

    #[test]
    fn test_initials() {
        let user = User::new("ada king lovelace", "ada@example.com", Role::Tester);
        assert_eq!(user.initials(), "AK");
        let anonymous = User::new("", "x@example.com", Role::Tester);
        assert_eq!(anonymous.initials(), "U");
    }

    #[test]
    fn test_patch_accepts_camel_case_created_by() {
        let patch: RequirementPatch =
            serde_json::from_str(r#"{"createdBy": "someone-else", "title": "x"}"#).unwrap();
        assert_eq!(patch.created_by.as_deref(), Some("someone-else"));
        assert!(!patch.is_empty());
        assert!(RequirementPatch::default().is_empty());
    }
}
