//! YAML file storage backend
//!
//! This backend stores all data in a single YAML file, using [`Storage`]
//! for file locking. Mutations run as read-modify-write under the exclusive
//! lock so that two processes never interleave their writes.

use std::path::{Path, PathBuf};

use super::traits::{BackendType, DatabaseBackend};
use crate::error::{StoreError, StoreResult};
use crate::models::{NewRequirement, Requirement, RequirementsStore, User};
use crate::storage::Storage;

/// YAML file backend implementation
pub struct YamlBackend {
    storage: Storage,
    path: PathBuf,
}

impl YamlBackend {
    /// Creates a new YAML backend for the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            storage: Storage::new(&path),
            path,
        }
    }
}

impl DatabaseBackend for YamlBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Yaml
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoreResult<RequirementsStore> {
        self.storage.load()
    }

    fn save(&self, store: &RequirementsStore) -> StoreResult<()> {
        self.storage.save(store)
    }

    fn update_atomically<F>(&self, update_fn: F) -> StoreResult<RequirementsStore>
    where
        F: FnOnce(&mut RequirementsStore),
    {
        self.storage.update_atomically(update_fn)
    }

    fn insert_requirement(&self, new: NewRequirement) -> StoreResult<Requirement> {
        let mut inserted = None;
        self.update_atomically(|store| {
            inserted = Some(store.insert_requirement(new));
        })?;
        inserted.ok_or_else(|| anyhow::anyhow!("insert did not run").into())
    }

    fn update_requirement(&self, requirement: &Requirement) -> StoreResult<Requirement> {
        let mut updated = None;
        self.update_atomically(|store| {
            updated = store.update_requirement(requirement);
        })?;
        updated.ok_or(StoreError::RequirementNotFound(requirement.id))
    }

    fn add_user(&self, user: User) -> StoreResult<User> {
        let mut duplicate = false;
        self.update_atomically(|store| {
            duplicate = store.find_user(&user.email).is_some();
            if !duplicate {
                store.users.push(user.clone());
            }
        })?;
        if duplicate {
            return Err(anyhow::anyhow!("A user with email {} already exists", user.email).into());
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequirementPriority, RequirementStatus};
    use crate::roles::Role;
    use chrono::{Duration, Utc};
    use tempfile::{NamedTempFile, TempDir};
    use uuid::Uuid;

    fn new_requirement(title: &str, created_by: Uuid) -> NewRequirement {
        NewRequirement {
            title: title.to_string(),
            description: Some(format!("{} description", title)),
            status: RequirementStatus::Draft,
            priority: RequirementPriority::High,
            created_by,
        }
    }

    #[test]
    fn test_yaml_backend_create_and_load() {
        // Use a path that doesn't exist yet
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.yaml");
        let backend = YamlBackend::new(&file_path);

        backend.create_if_not_exists().unwrap();

        let store = backend.load().unwrap();
        assert!(store.requirements.is_empty());
        assert!(store.users.is_empty());
    }

    #[test]
    fn test_yaml_backend_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let backend = YamlBackend::new(temp_file.path());

        let mut store = RequirementsStore::new();
        store.name = "Test DB".to_string();

        backend.save(&store).unwrap();

        let loaded = backend.load().unwrap();
        assert_eq!(loaded.name, "Test DB");
    }

    #[test]
    fn test_yaml_backend_requirement_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let backend = YamlBackend::new(temp_dir.path().join("reqs.yaml"));
        let author = User::new("Ada Lovelace", "ada@example.com", Role::RequirementsEngineer);
        backend.add_user(author.clone()).unwrap();

        let req = backend.insert_requirement(new_requirement("Login", author.id)).unwrap();
        assert_eq!(req.spec_id.as_deref(), Some("REQ-001"));

        let mut changed = req.clone();
        changed.status = RequirementStatus::Approved;
        let updated = backend.update_requirement(&changed).unwrap();
        assert_eq!(updated.status, RequirementStatus::Approved);

        let found = backend.find_requirement("REQ-001").unwrap().unwrap();
        assert_eq!(found.status, RequirementStatus::Approved);

        let listings = backend.list_requirements().unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].author_label(), "Ada Lovelace");
    }

    #[test]
    fn test_yaml_backend_lists_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let backend = YamlBackend::new(temp_dir.path().join("reqs.yaml"));
        let author = Uuid::new_v4();

        backend.insert_requirement(new_requirement("Old", author)).unwrap();
        backend.insert_requirement(new_requirement("New", author)).unwrap();
        backend
            .update_atomically(|store| {
                store.requirements[0].created_at = Utc::now() - Duration::days(1);
            })
            .unwrap();

        let titles: Vec<String> = backend
            .list_requirements()
            .unwrap()
            .into_iter()
            .map(|l| l.requirement.title)
            .collect();
        assert_eq!(titles, vec!["New", "Old"]);
    }

    #[test]
    fn test_yaml_backend_update_missing_requirement() {
        let temp_dir = TempDir::new().unwrap();
        let backend = YamlBackend::new(temp_dir.path().join("reqs.yaml"));
        let req = backend.insert_requirement(new_requirement("Login", Uuid::new_v4())).unwrap();

        let mut ghost = req;
        ghost.id = Uuid::new_v4();
        assert!(matches!(
            backend.update_requirement(&ghost),
            Err(StoreError::RequirementNotFound(id)) if id == ghost.id
        ));
    }

    #[test]
    fn test_yaml_backend_rejects_duplicate_email() {
        let temp_dir = TempDir::new().unwrap();
        let backend = YamlBackend::new(temp_dir.path().join("reqs.yaml"));

        backend.add_user(User::new("A", "same@example.com", Role::Tester)).unwrap();
        assert!(backend.add_user(User::new("B", "SAME@example.com", Role::TestManager)).is_err());
        assert_eq!(backend.list_users().unwrap().len(), 1);
    }
}
