//! Database abstraction traits
//!
//! This module defines the persistence collaborator every storage backend
//! implements. There is deliberately no delete operation: requirements are
//! never removed.

use std::path::Path;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{NewRequirement, Requirement, RequirementListing, RequirementsStore, User};

/// Types of database backends available
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// YAML file storage (single file)
    Yaml,
    /// SQLite database storage
    Sqlite,
}

impl BackendType {
    /// Infers the backend from a file extension, defaulting to YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("db") | Some("sqlite") | Some("sqlite3") => BackendType::Sqlite,
            _ => BackendType::Yaml,
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Yaml => write!(f, "YAML"),
            BackendType::Sqlite => write!(f, "SQLite"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(BackendType::Yaml),
            "sqlite" | "sqlite3" | "db" => Ok(BackendType::Sqlite),
            _ => Err(format!("unknown backend type: {}", s)),
        }
    }
}

/// Core trait for database backends
///
/// - `load()` and `save()` work with the full `RequirementsStore`
/// - the per-record operations default to load/modify/save and may be
///   overridden with something more efficient
///
/// Writes are last-write-wins; there is no optimistic-concurrency token.
pub trait DatabaseBackend: Send + Sync {
    /// Returns the backend type
    fn backend_type(&self) -> BackendType;

    /// Returns the path to the database file
    fn path(&self) -> &Path;

    // =========================================================================
    // Full Store Operations
    // =========================================================================

    /// Loads the entire requirements store from the database
    fn load(&self) -> StoreResult<RequirementsStore>;

    /// Saves the entire requirements store to the database
    fn save(&self, store: &RequirementsStore) -> StoreResult<()>;

    /// Performs an atomic update operation
    /// Default implementation loads, applies changes, and saves
    fn update_atomically<F>(&self, update_fn: F) -> StoreResult<RequirementsStore>
    where
        F: FnOnce(&mut RequirementsStore),
        Self: Sized,
    {
        let mut store = self.load()?;
        update_fn(&mut store);
        self.save(&store)?;
        Ok(store)
    }

    // =========================================================================
    // Requirement Operations
    // =========================================================================

    /// Lists all requirements, newest first, joined with their authors
    fn list_requirements(&self) -> StoreResult<Vec<RequirementListing>> {
        Ok(self.load()?.listings())
    }

    /// Gets a requirement by its UUID
    fn get_requirement(&self, id: &Uuid) -> StoreResult<Option<Requirement>> {
        Ok(self.load()?.get_requirement_by_id(id).cloned())
    }

    /// Gets a requirement by UUID or REQ-ID
    fn find_requirement(&self, key: &str) -> StoreResult<Option<Requirement>> {
        Ok(self.load()?.find_requirement(key).cloned())
    }

    /// Stores a validated requirement and returns it with id, REQ-ID and
    /// timestamps assigned
    fn insert_requirement(&self, new: NewRequirement) -> StoreResult<Requirement> {
        let mut store = self.load()?;
        let requirement = store.insert_requirement(new);
        self.save(&store)?;
        Ok(requirement)
    }

    /// Writes the mutable fields of an existing requirement
    fn update_requirement(&self, requirement: &Requirement) -> StoreResult<Requirement> {
        let mut store = self.load()?;
        let updated = store
            .update_requirement(requirement)
            .ok_or(StoreError::RequirementNotFound(requirement.id))?;
        self.save(&store)?;
        Ok(updated)
    }

    // =========================================================================
    // User Operations
    // =========================================================================

    /// Gets a user by UUID
    fn get_user(&self, id: &Uuid) -> StoreResult<Option<User>> {
        Ok(self.load()?.get_user(id).cloned())
    }

    /// Gets a user by UUID or email
    fn find_user(&self, login: &str) -> StoreResult<Option<User>> {
        Ok(self.load()?.find_user(login).cloned())
    }

    /// Lists all users
    fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.load()?.users)
    }

    /// Adds a new user; emails are unique
    fn add_user(&self, user: User) -> StoreResult<User> {
        let mut store = self.load()?;
        if store.find_user(&user.email).is_some() {
            return Err(anyhow::anyhow!("A user with email {} already exists", user.email).into());
        }
        store.users.push(user.clone());
        self.save(&store)?;
        Ok(user)
    }

    // =========================================================================
    // Metadata Operations
    // =========================================================================

    /// Gets the database name
    fn get_name(&self) -> StoreResult<String> {
        Ok(self.load()?.name)
    }

    /// Sets the database name
    fn set_name(&self, name: &str) -> StoreResult<()> {
        let mut store = self.load()?;
        store.name = name.to_string();
        self.save(&store)
    }

    // =========================================================================
    // Utility Operations
    // =========================================================================

    /// Returns true if the database file exists
    fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Creates the database with default/empty data if it doesn't exist
    fn create_if_not_exists(&self) -> StoreResult<()> {
        if !self.exists() {
            self.save(&RequirementsStore::new())?;
        }
        Ok(())
    }

    /// Returns statistics about the database
    fn stats(&self) -> StoreResult<DatabaseStats> {
        let store = self.load()?;
        Ok(DatabaseStats {
            requirement_count: store.requirements.len(),
            user_count: store.users.len(),
            backend_type: self.backend_type(),
        })
    }
}

/// Statistics about a database
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub requirement_count: usize,
    pub user_count: usize,
    pub backend_type: BackendType,
}
