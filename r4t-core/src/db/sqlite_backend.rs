//! SQLite database storage backend
//!
//! This backend stores requirements and user profiles in a SQLite database
//! file, providing better concurrent access and query performance than the
//! YAML file.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::traits::{BackendType, DatabaseBackend};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Author, NewRequirement, Requirement, RequirementListing, RequirementsStore, User,
};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

const REQUIREMENT_COLUMNS: &str = "r.id, r.spec_id, r.title, r.description, r.status, r.priority,
     r.created_by, r.created_at, r.updated_at";

/// Raw requirement row, converted outside the rusqlite closure so that parse
/// errors surface as store errors instead of being swallowed
type RequirementRow = (
    String,
    Option<String>,
    String,
    Option<String>,
    String,
    String,
    String,
    String,
    String,
);

/// SQLite backend implementation
pub struct SqliteBackend {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Creates a new SQLite backend
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open SQLite database {:?}", path))?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let backend = Self {
            path,
            conn: Mutex::new(conn),
        };

        backend.init_schema()?;
        Ok(backend)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("SQLite connection mutex poisoned"))
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        let current_version: i32 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .unwrap_or(0);

        if current_version == 0 {
            debug!("creating schema v{} in {:?}", SCHEMA_VERSION, self.path);
            conn.execute_batch(include_str!("schema.sql"))?;
        } else if current_version < SCHEMA_VERSION {
            anyhow::bail!(
                "Database schema version {} is outdated, expected {}",
                current_version,
                SCHEMA_VERSION
            );
        }

        Ok(())
    }

    fn format_time(time: &DateTime<Utc>) -> String {
        // Fixed width, so lexical order in SQL equals chronological order
        time.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    fn parse_time(s: &str) -> Result<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("Invalid timestamp in database: {}", s))?
            .with_timezone(&Utc))
    }

    fn parse_uuid(s: &str) -> Result<Uuid> {
        Uuid::parse_str(s).with_context(|| format!("Invalid UUID in database: {}", s))
    }

    fn read_requirement_row(row: &Row<'_>) -> rusqlite::Result<RequirementRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
        ))
    }

    fn requirement_from_row(raw: RequirementRow) -> Result<Requirement> {
        let (id, spec_id, title, description, status, priority, created_by, created_at, updated_at) =
            raw;
        Ok(Requirement {
            id: Self::parse_uuid(&id)?,
            spec_id,
            title,
            description,
            status: status.parse()?,
            priority: priority.parse()?,
            created_by: Self::parse_uuid(&created_by)?,
            created_at: Self::parse_time(&created_at)?,
            updated_at: Self::parse_time(&updated_at)?,
        })
    }

    /// Load requirements from database, in insertion order
    fn load_requirements(conn: &Connection) -> Result<Vec<Requirement>> {
        let sql = format!(
            "SELECT {} FROM requirements r ORDER BY r.created_at, r.rowid",
            REQUIREMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::read_requirement_row)?;

        let mut requirements = Vec::new();
        for row in rows {
            requirements.push(Self::requirement_from_row(row?)?);
        }
        Ok(requirements)
    }

    fn query_requirement(conn: &Connection, where_clause: &str, key: &str) -> Result<Option<Requirement>> {
        let sql = format!(
            "SELECT {} FROM requirements r WHERE {} LIMIT 1",
            REQUIREMENT_COLUMNS, where_clause
        );
        let raw = conn
            .query_row(&sql, [key], Self::read_requirement_row)
            .optional()?;
        raw.map(Self::requirement_from_row).transpose()
    }

    fn user_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    }

    fn user_from_raw(raw: (String, String, String, String, String)) -> Result<User> {
        let (id, full_name, email, role, created_at) = raw;
        Ok(User {
            id: Self::parse_uuid(&id)?,
            full_name,
            email,
            role: role.parse()?,
            created_at: Self::parse_time(&created_at)?,
        })
    }

    /// Load users from database
    fn load_users(conn: &Connection) -> Result<Vec<User>> {
        let mut stmt = conn.prepare(
            "SELECT id, full_name, email, role, created_at FROM users ORDER BY created_at, rowid",
        )?;
        let rows = stmt.query_map([], Self::user_from_row)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(Self::user_from_raw(row?)?);
        }
        Ok(users)
    }

    fn query_user(conn: &Connection, where_clause: &str, key: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT id, full_name, email, role, created_at FROM users WHERE {} LIMIT 1",
            where_clause
        );
        let raw = conn.query_row(&sql, [key], Self::user_from_row).optional()?;
        raw.map(Self::user_from_raw).transpose()
    }

    /// Load metadata from database
    fn load_metadata(conn: &Connection) -> Result<(String, u32)> {
        let row = conn
            .query_row(
                "SELECT name, next_spec_number FROM metadata WHERE id = 1",
                [],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)),
            )
            .optional()?;
        Ok(row.unwrap_or_else(|| (String::new(), 1)))
    }

    fn save_metadata(conn: &Connection, name: &str, next_spec_number: u32) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO metadata (id, name, next_spec_number) VALUES (1, ?1, ?2)",
            params![name, next_spec_number],
        )?;
        Ok(())
    }

    /// Insert a requirement row; an id or REQ-ID clash is an error
    fn insert_requirement_row(conn: &Connection, req: &Requirement) -> Result<()> {
        conn.execute(
            "INSERT INTO requirements
             (id, spec_id, title, description, status, priority, created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                req.id.to_string(),
                req.spec_id,
                req.title,
                req.description,
                req.status.as_str(),
                req.priority.as_str(),
                req.created_by.to_string(),
                Self::format_time(&req.created_at),
                Self::format_time(&req.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Insert a user row; an id or email clash is an error
    fn insert_user_row(conn: &Connection, user: &User) -> Result<()> {
        conn.execute(
            "INSERT INTO users (id, full_name, email, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.full_name,
                user.email,
                user.role.as_str(),
                Self::format_time(&user.created_at),
            ],
        )
        .with_context(|| format!("Failed to store user {}", user.email))?;
        Ok(())
    }

    /// Takes the next REQ number and advances the counter
    fn take_spec_number(conn: &Connection) -> Result<u32> {
        let (name, next) = Self::load_metadata(conn)?;
        Self::save_metadata(conn, &name, next + 1)?;
        Ok(next)
    }
}

impl DatabaseBackend for SqliteBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Sqlite
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoreResult<RequirementsStore> {
        let conn = self.conn()?;
        let (name, next_spec_number) = Self::load_metadata(&conn)?;
        Ok(RequirementsStore {
            name,
            requirements: Self::load_requirements(&conn)?,
            users: Self::load_users(&conn)?,
            next_spec_number,
        })
    }

    fn save(&self, store: &RequirementsStore) -> StoreResult<()> {
        store.validate()?;
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        tx.execute("DELETE FROM requirements", []).context("Failed to clear requirements")?;
        tx.execute("DELETE FROM users", []).context("Failed to clear users")?;
        Self::save_metadata(&tx, &store.name, store.next_spec_number)?;
        for user in &store.users {
            Self::insert_user_row(&tx, user)?;
        }
        for req in &store.requirements {
            Self::insert_requirement_row(&tx, req)?;
        }

        tx.commit().context("Failed to commit transaction")?;
        Ok(())
    }

    fn list_requirements(&self) -> StoreResult<Vec<RequirementListing>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {}, u.full_name, u.email
             FROM requirements r LEFT JOIN users u ON u.id = r.created_by
             ORDER BY r.created_at DESC, r.rowid DESC",
            REQUIREMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).context("Failed to prepare listing query")?;
        let rows = stmt
            .query_map([], |row| {
                let requirement = Self::read_requirement_row(row)?;
                let full_name: Option<String> = row.get(9)?;
                let email: Option<String> = row.get(10)?;
                Ok((requirement, full_name, email))
            })
            .context("Failed to list requirements")?;

        let mut listings = Vec::new();
        for row in rows {
            let (raw, full_name, email) = row.context("Failed to read requirement row")?;
            let author = match (full_name, email) {
                (Some(full_name), Some(email)) => Some(Author { full_name, email }),
                _ => None,
            };
            listings.push(RequirementListing {
                requirement: Self::requirement_from_row(raw)?,
                author,
            });
        }
        Ok(listings)
    }

    fn get_requirement(&self, id: &Uuid) -> StoreResult<Option<Requirement>> {
        let conn = self.conn()?;
        Ok(Self::query_requirement(&conn, "r.id = ?1", &id.to_string())?)
    }

    fn find_requirement(&self, key: &str) -> StoreResult<Option<Requirement>> {
        let conn = self.conn()?;
        let found = match Uuid::parse_str(key) {
            Ok(id) => Self::query_requirement(&conn, "r.id = ?1", &id.to_string())?,
            Err(_) => Self::query_requirement(&conn, "r.spec_id = ?1 COLLATE NOCASE", key.trim())?,
        };
        Ok(found)
    }

    fn insert_requirement(&self, new: NewRequirement) -> StoreResult<Requirement> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let number = Self::take_spec_number(&tx)?;
        let now = Utc::now();
        let requirement = Requirement {
            id: Uuid::new_v4(),
            spec_id: Some(format!("REQ-{:03}", number)),
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        Self::insert_requirement_row(&tx, &requirement)?;

        tx.commit().context("Failed to commit transaction")?;
        Ok(requirement)
    }

    fn update_requirement(&self, requirement: &Requirement) -> StoreResult<Requirement> {
        let conn = self.conn()?;
        let now = Utc::now();
        let rows_affected = conn
            .execute(
                "UPDATE requirements
                 SET title = ?1, description = ?2, status = ?3, priority = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    requirement.title,
                    requirement.description,
                    requirement.status.as_str(),
                    requirement.priority.as_str(),
                    Self::format_time(&now),
                    requirement.id.to_string(),
                ],
            )
            .context("Failed to update requirement")?;
        if rows_affected == 0 {
            return Err(StoreError::RequirementNotFound(requirement.id));
        }

        Self::query_requirement(&conn, "r.id = ?1", &requirement.id.to_string())?
            .ok_or(StoreError::RequirementNotFound(requirement.id))
    }

    fn get_user(&self, id: &Uuid) -> StoreResult<Option<User>> {
        let conn = self.conn()?;
        Ok(Self::query_user(&conn, "id = ?1", &id.to_string())?)
    }

    fn find_user(&self, login: &str) -> StoreResult<Option<User>> {
        let conn = self.conn()?;
        let found = match Uuid::parse_str(login) {
            Ok(id) => Self::query_user(&conn, "id = ?1", &id.to_string())?,
            Err(_) => Self::query_user(&conn, "email = ?1 COLLATE NOCASE", login.trim())?,
        };
        Ok(found)
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        let conn = self.conn()?;
        Ok(Self::load_users(&conn)?)
    }

    fn add_user(&self, user: User) -> StoreResult<User> {
        let conn = self.conn()?;
        if Self::query_user(&conn, "email = ?1 COLLATE NOCASE", &user.email)?.is_some() {
            return Err(anyhow::anyhow!("A user with email {} already exists", user.email).into());
        }
        Self::insert_user_row(&conn, &user)?;
        Ok(user)
    }

    fn get_name(&self) -> StoreResult<String> {
        let conn = self.conn()?;
        Ok(Self::load_metadata(&conn)?.0)
    }

    fn set_name(&self, name: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let (_, next) = Self::load_metadata(&conn)?;
        Self::save_metadata(&conn, name, next)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequirementPriority, RequirementStatus};
    use crate::roles::Role;
    use tempfile::NamedTempFile;

    fn new_requirement(title: &str, created_by: Uuid) -> NewRequirement {
        NewRequirement {
            title: title.to_string(),
            description: None,
            status: RequirementStatus::Draft,
            priority: RequirementPriority::Medium,
            created_by,
        }
    }

    #[test]
    fn test_sqlite_backend_create_and_load() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let backend = SqliteBackend::new(temp_file.path()).unwrap();

        backend.create_if_not_exists().unwrap();

        let store = backend.load().unwrap();
        assert!(store.requirements.is_empty());
        assert!(store.users.is_empty());
        assert_eq!(store.next_spec_number, 1);
    }

    #[test]
    fn test_sqlite_backend_save_and_load() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let backend = SqliteBackend::new(temp_file.path()).unwrap();

        let mut store = RequirementsStore::new();
        store.name = "Test DB".to_string();
        let user = User::new("Ada Lovelace", "ada@example.com", Role::RequirementsEngineer);
        store.users.push(user.clone());
        store.insert_requirement(new_requirement("Login", user.id));

        backend.save(&store).unwrap();

        let loaded = backend.load().unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_sqlite_backend_save_rejects_case_twin_emails() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let backend = SqliteBackend::new(temp_file.path()).unwrap();
        let mut original = RequirementsStore::new();
        original.users.push(User::new("Kept", "kept@example.com", Role::Tester));
        backend.save(&original).unwrap();

        let mut store = RequirementsStore::new();
        store.users.push(User::new("Lower", "a@x.com", Role::Tester));
        store.users.push(User::new("Upper", "A@X.com", Role::TestManager));
        assert!(backend.save(&store).is_err());

        // The failed save leaves the previous contents in place
        assert_eq!(backend.load().unwrap(), original);
    }

    #[test]
    fn test_sqlite_backend_insert_row_conflict_is_error() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let backend = SqliteBackend::new(temp_file.path()).unwrap();
        let conn = backend.conn().unwrap();
        SqliteBackend::insert_user_row(&conn, &User::new("Lower", "a@x.com", Role::Tester)).unwrap();

        let twin = User::new("Upper", "A@X.com", Role::TestManager);
        assert!(SqliteBackend::insert_user_row(&conn, &twin).is_err());
        assert_eq!(SqliteBackend::load_users(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_sqlite_backend_requirement_lifecycle() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let backend = SqliteBackend::new(temp_file.path()).unwrap();
        let author = backend
            .add_user(User::new("Ada Lovelace", "ada@example.com", Role::RequirementsEngineer))
            .unwrap();

        let first = backend.insert_requirement(new_requirement("Login", author.id)).unwrap();
        let second = backend.insert_requirement(new_requirement("Export", Uuid::new_v4())).unwrap();
        assert_eq!(first.spec_id.as_deref(), Some("REQ-001"));
        assert_eq!(second.spec_id.as_deref(), Some("REQ-002"));

        let loaded = backend.get_requirement(&first.id).unwrap().unwrap();
        assert_eq!(loaded, first);
        assert_eq!(backend.find_requirement("req-002").unwrap().map(|r| r.id), Some(second.id));

        let mut changed = first.clone();
        changed.status = RequirementStatus::Tested;
        changed.description = Some("Now with details".to_string());
        let updated = backend.update_requirement(&changed).unwrap();
        assert_eq!(updated.status, RequirementStatus::Tested);
        assert_eq!(updated.created_at, first.created_at);
        assert!(updated.updated_at >= first.updated_at);

        let listings = backend.list_requirements().unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].requirement.id, second.id);
        assert_eq!(listings[0].author, None);
        assert_eq!(listings[1].author_label(), "Ada Lovelace");
    }

    #[test]
    fn test_sqlite_backend_update_missing_requirement() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let backend = SqliteBackend::new(temp_file.path()).unwrap();
        let req = backend.insert_requirement(new_requirement("Login", Uuid::new_v4())).unwrap();

        let mut ghost = req;
        ghost.id = Uuid::new_v4();
        assert!(matches!(
            backend.update_requirement(&ghost),
            Err(StoreError::RequirementNotFound(_))
        ));
    }

    #[test]
    fn test_sqlite_backend_users() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let backend = SqliteBackend::new(temp_file.path()).unwrap();
        let user = backend.add_user(User::new("Grace", "grace@example.com", Role::Tester)).unwrap();

        assert_eq!(backend.find_user("GRACE@example.com").unwrap().map(|u| u.id), Some(user.id));
        assert_eq!(backend.get_user(&user.id).unwrap().map(|u| u.role), Some(Role::Tester));
        assert!(backend.add_user(User::new("Other", "grace@example.com", Role::TestManager)).is_err());
        assert_eq!(backend.list_users().unwrap().len(), 1);
    }

    #[test]
    fn test_sqlite_backend_reopen_keeps_data() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        {
            let backend = SqliteBackend::new(temp_file.path()).unwrap();
            backend.set_name("Release 1.0").unwrap();
            backend.insert_requirement(new_requirement("Login", Uuid::new_v4())).unwrap();
        }
        let backend = SqliteBackend::new(temp_file.path()).unwrap();
        assert_eq!(backend.get_name().unwrap(), "Release 1.0");
        assert_eq!(backend.stats().unwrap().requirement_count, 1);
        let next = backend.insert_requirement(new_requirement("Export", Uuid::new_v4())).unwrap();
        assert_eq!(next.spec_id.as_deref(), Some("REQ-002"));
    }
}
