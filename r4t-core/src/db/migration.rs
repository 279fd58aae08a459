//! Moving stores between backends, and JSON export/import for backups.

use anyhow::Context;
use log::info;
use std::path::Path;

use super::traits::DatabaseBackend;
use crate::error::StoreResult;
use crate::models::RequirementsStore;

/// What a migration or import copied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCounts {
    pub requirements: usize,
    pub users: usize,
}

impl TransferCounts {
    fn of(store: &RequirementsStore) -> Self {
        Self {
            requirements: store.requirements.len(),
            users: store.users.len(),
        }
    }
}

/// Copies the whole store from one backend into another, replacing the
/// target's contents. A store that fails [`RequirementsStore::validate`] is
/// rejected before anything is written.
pub fn copy_store(
    source: &dyn DatabaseBackend,
    target: &dyn DatabaseBackend,
) -> StoreResult<TransferCounts> {
    let store = source
        .load()
        .with_context(|| format!("Failed to load {:?}", source.path()))?;
    store.validate()?;
    target
        .save(&store)
        .with_context(|| format!("Failed to write {:?}", target.path()))?;

    let counts = TransferCounts::of(&store);
    info!(
        "copied {} requirements and {} users from {} {:?} to {} {:?}",
        counts.requirements,
        counts.users,
        source.backend_type(),
        source.path(),
        target.backend_type(),
        target.path()
    );
    Ok(counts)
}

/// Writes a backend's full contents to a pretty-printed JSON file
pub fn export_to_json<P: AsRef<Path>>(
    backend: &dyn DatabaseBackend,
    json_path: P,
) -> StoreResult<TransferCounts> {
    let json_path = json_path.as_ref();
    let store = backend.load()?;
    let json = serde_json::to_string_pretty(&store).context("Failed to serialize to JSON")?;
    std::fs::write(json_path, json)
        .with_context(|| format!("Failed to write JSON file {:?}", json_path))?;
    Ok(TransferCounts::of(&store))
}

/// Replaces a backend's contents with a JSON export, after the same checks as
/// [`copy_store`]
pub fn import_from_json<P: AsRef<Path>>(
    json_path: P,
    backend: &dyn DatabaseBackend,
) -> StoreResult<TransferCounts> {
    let json_path = json_path.as_ref();
    let json = std::fs::read_to_string(json_path)
        .with_context(|| format!("Failed to read JSON file {:?}", json_path))?;
    let store: RequirementsStore = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse JSON from {:?}", json_path))?;
    store.validate()?;

    backend.save(&store)?;
    Ok(TransferCounts::of(&store))
}
