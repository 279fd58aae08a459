use anyhow::Context;
use fs2::FileExt;
use log::{debug, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{StoreError, StoreResult};
use crate::models::RequirementsStore;

/// How long to wait for another process to release the lock
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const LOCK_RETRY: Duration = Duration::from_millis(100);

/// Handles saving and loading requirements from a YAML file, with advisory
/// file locking so that several users can share one file
pub struct Storage {
    file_path: PathBuf,
    lock_file_path: PathBuf,
}

impl Storage {
    /// Creates a new Storage instance
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        let lock_file_path = file_path.with_extension("yaml.lock");
        Self {
            file_path,
            lock_file_path,
        }
    }

    /// Acquire an exclusive lock on the file for writing
    /// Returns the lock file handle which must be held during the operation
    fn acquire_write_lock(&self) -> StoreResult<File> {
        if let Some(parent) = self.lock_file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let mut lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to create lock file: {:?}", self.lock_file_path))?;

        wait_for_lock(&lock_file, |f| FileExt::try_lock_exclusive(f), &self.lock_file_path)?;

        // Lock holder info, for debugging stuck locks
        let _ = writeln!(
            lock_file,
            "Locked by PID {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );

        Ok(lock_file)
    }

    /// Acquire a shared lock on the file for reading
    fn acquire_read_lock(&self) -> StoreResult<Option<File>> {
        if !self.lock_file_path.exists() {
            return Ok(None);
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to open lock file: {:?}", self.lock_file_path))?;

        wait_for_lock(&lock_file, |f| FileExt::try_lock_shared(f), &self.lock_file_path)?;
        Ok(Some(lock_file))
    }

    /// Loads requirements from the YAML file, creating an empty one if missing
    pub fn load(&self) -> StoreResult<RequirementsStore> {
        if !self.file_path.exists() {
            debug!("{:?} does not exist, creating an empty store", self.file_path);
            let default_store = RequirementsStore::new();
            self.save(&default_store)?;
            return Ok(default_store);
        }

        let _lock = self.acquire_read_lock()?;
        let store = self.read_store()?;
        store.validate_unique_spec_ids()?;
        Ok(store)
    }

    /// Saves requirements to the YAML file with file locking
    pub fn save(&self, store: &RequirementsStore) -> StoreResult<()> {
        let _lock = self.acquire_write_lock()?;
        self.write_store(store)
        // Lock is released when _lock is dropped
    }

    /// Perform an atomic update operation with proper locking
    /// This reloads the file, applies changes, and saves while holding the
    /// exclusive lock throughout
    pub fn update_atomically<F>(&self, update_fn: F) -> StoreResult<RequirementsStore>
    where
        F: FnOnce(&mut RequirementsStore),
    {
        let _lock = self.acquire_write_lock()?;

        let mut store = if self.file_path.exists() {
            self.read_store()?
        } else {
            RequirementsStore::new()
        };

        update_fn(&mut store);
        self.write_store(&store)?;
        Ok(store)
    }

    fn read_store(&self) -> StoreResult<RequirementsStore> {
        let file = File::open(&self.file_path)
            .with_context(|| format!("Failed to open file: {:?}", self.file_path))?;
        let reader = BufReader::new(file);
        let store = serde_yaml::from_reader(reader)
            .with_context(|| format!("Failed to parse YAML from {:?}", self.file_path))?;
        Ok(store)
    }

    fn write_store(&self, store: &RequirementsStore) -> StoreResult<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        let yaml = serde_yaml::to_string(store).context("Failed to serialize store")?;
        fs::write(&self.file_path, yaml)
            .with_context(|| format!("Failed to write {:?}", self.file_path))?;
        debug!(
            "wrote {} requirements to {:?}",
            store.requirements.len(),
            self.file_path
        );
        Ok(())
    }
}

/// Retries `try_lock` until it succeeds or [`LOCK_TIMEOUT`] passes
fn wait_for_lock<F>(file: &File, try_lock: F, lock_path: &Path) -> StoreResult<()>
where
    F: Fn(&File) -> std::io::Result<()>,
{
    let start = Instant::now();
    loop {
        match try_lock(file) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if start.elapsed() > LOCK_TIMEOUT {
                    warn!("timed out waiting for lock on {:?}", lock_path);
                    return Err(StoreError::FileLocked);
                }
                std::thread::sleep(LOCK_RETRY);
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to acquire lock on {:?}", lock_path))
                    .into())
            }
        }
    }
}
