//! Persistence for requirements and user profiles
//!
//! Storage backends sit behind the [`DatabaseBackend`] trait so callers work
//! the same against a shared YAML file or a SQLite database.

mod migration;
mod sqlite_backend;
mod traits;
mod yaml_backend;

pub use migration::{copy_store, export_to_json, import_from_json, TransferCounts};
pub use sqlite_backend::SqliteBackend;
pub use traits::{BackendType, DatabaseBackend, DatabaseStats};
pub use yaml_backend::YamlBackend;

use log::debug;
use std::path::Path;

use crate::error::StoreResult;

/// Creates a database backend based on the file extension or explicit type
pub fn create_backend(
    path: &Path,
    backend_type: Option<BackendType>,
) -> StoreResult<Box<dyn DatabaseBackend>> {
    let bt = backend_type.unwrap_or_else(|| BackendType::from_path(path));
    debug!("opening {} store at {:?}", bt, path);

    match bt {
        BackendType::Yaml => Ok(Box::new(YamlBackend::new(path))),
        BackendType::Sqlite => Ok(Box::new(SqliteBackend::new(path)?)),
    }
}
