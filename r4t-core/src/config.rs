use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Store file used when nothing else selects one
pub const DEFAULT_DATABASE_FILE: &str = "requirements.yaml";

/// A named requirements database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Path to the YAML file or SQLite database
    pub path: String,
    #[serde(default)]
    pub description: String,
}

/// User configuration: known projects and defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub projects: BTreeMap<String, Project>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,
    /// Email or UUID of the user to act as when none is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_user: Option<String>,
}

impl Config {
    /// Loads the configuration, returning an empty one if the file is missing
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Save the configuration to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content).with_context(|| format!("Failed to write config to {:?}", path))
    }

    pub fn get_project(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    /// Registers a new project or updates an existing one
    pub fn register_project(&mut self, name: &str, path: &str, description: &str) {
        self.projects.insert(
            name.to_string(),
            Project {
                path: path.to_string(),
                description: description.to_string(),
            },
        );
    }

    /// Sets a project as the default
    pub fn set_default_project(&mut self, name: &str) -> Result<()> {
        if !self.projects.contains_key(name) {
            anyhow::bail!("Project '{}' not found in config", name);
        }
        self.default_project = Some(name.to_string());
        Ok(())
    }

    /// Gets the default project if set and still registered
    pub fn get_default_project(&self) -> Option<(&str, &Project)> {
        let name = self.default_project.as_deref()?;
        self.projects.get(name).map(|project| (name, project))
    }

    /// Picks the database to open.
    ///
    /// In order: an explicit path, a named project, the only registered
    /// project, the default project, then `requirements.yaml` in the current
    /// directory. `R4T_DB` and `R4T_PROJECT` arrive through the first two.
    pub fn determine_database_path(
        &self,
        db: Option<&Path>,
        project: Option<&str>,
    ) -> Result<PathBuf> {
        if let Some(path) = db {
            return Ok(path.to_path_buf());
        }

        if let Some(name) = project {
            return match self.get_project(name) {
                Some(project) => Ok(PathBuf::from(&project.path)),
                None => anyhow::bail!("Project '{}' not found in config", name),
            };
        }

        if self.projects.len() == 1 {
            if let Some(project) = self.projects.values().next() {
                return Ok(PathBuf::from(&project.path));
            }
        }

        if let Some((_, project)) = self.get_default_project() {
            return Ok(PathBuf::from(&project.path));
        }

        Ok(PathBuf::from(DEFAULT_DATABASE_FILE))
    }
}

/// Gets the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("R4T_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    let config_dir = dirs::config_dir().context("Failed to determine config directory")?;
    Ok(config_dir.join("r4t").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn two_projects() -> Config {
        let mut config = Config::default();
        config.register_project("alpha", "/data/alpha.yaml", "First");
        config.register_project("beta", "/data/beta.db", "Second");
        config
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(temp_dir.path().join("none.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("r4t").join("config.yaml");

        let mut config = two_projects();
        config.set_default_project("beta").unwrap();
        config.default_user = Some("ada@example.com".to_string());
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_set_default_requires_known_project() {
        let mut config = two_projects();
        assert!(config.set_default_project("gamma").is_err());
        assert_eq!(config.default_project, None);
    }

    #[test]
    fn test_determine_database_path_order() {
        let mut config = two_projects();
        config.set_default_project("alpha").unwrap();

        let explicit = config
            .determine_database_path(Some(Path::new("mine.db")), Some("beta"))
            .unwrap();
        assert_eq!(explicit, PathBuf::from("mine.db"));

        let named = config.determine_database_path(None, Some("beta")).unwrap();
        assert_eq!(named, PathBuf::from("/data/beta.db"));

        let default = config.determine_database_path(None, None).unwrap();
        assert_eq!(default, PathBuf::from("/data/alpha.yaml"));

        assert!(config.determine_database_path(None, Some("gamma")).is_err());
    }

    #[test]
    fn test_determine_database_path_fallbacks() {
        let mut single = Config::default();
        single.register_project("only", "/data/only.yaml", "");
        assert_eq!(
            single.determine_database_path(None, None).unwrap(),
            PathBuf::from("/data/only.yaml")
        );

        // Several projects and no default: fall back to the local file
        assert_eq!(
            two_projects().determine_database_path(None, None).unwrap(),
            PathBuf::from(DEFAULT_DATABASE_FILE)
        );
    }
}
