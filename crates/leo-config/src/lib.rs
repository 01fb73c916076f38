pub mod error;

pub use error::*;

use leo_cloud::Aliases;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "LEO_CONFIG_PATH";

const CANDIDATES: &[&str] = &["leo.yaml", ".leo.yaml"];
const DEFAULT_PUBLIC_KEYS: &[&str] = &[".ssh/id_ed25519.pub", ".ssh/id_rsa.pub"];

/// User settings shared by every command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Friendly region name or native provider location
    pub region: String,
    /// Tags applied to every created object
    pub tags: BTreeMap<String, String>,
    /// Public key installed on the machines; `~` expands to the home directory
    pub ssh_public_key: Option<PathBuf>,
    pub timeouts: Timeouts,
    /// Merged over the provider's built-in aliases
    pub aliases: Aliases,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: "us-west".to_string(),
            tags: BTreeMap::new(),
            ssh_public_key: None,
            timeouts: Timeouts::default(),
            aliases: Aliases::default(),
        }
    }
}

/// Per-operation deadlines, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub create: u64,
    pub read: u64,
    pub delete: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: 15 * 60,
            read: 3 * 60,
            delete: 15 * 60,
        }
    }
}

impl Timeouts {
    pub fn create_timeout(&self) -> Duration {
        Duration::from_secs(self.create)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read)
    }

    pub fn delete_timeout(&self) -> Duration {
        Duration::from_secs(self.delete)
    }
}

impl Config {
    /// Load the configuration file found by [`find_config_file`], or the
    /// defaults when there is none
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match find_config_file(explicit)? {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Configured public key path, or the first default key that exists
    pub fn public_key_path(&self) -> Option<PathBuf> {
        let home = dirs::home_dir();

        if let Some(path) = &self.ssh_public_key {
            return Some(match (path.strip_prefix("~"), &home) {
                (Ok(rest), Some(home)) => home.join(rest),
                _ => path.clone(),
            });
        }

        let home = home?;
        DEFAULT_PUBLIC_KEYS
            .iter()
            .map(|key| home.join(key))
            .find(|path| path.exists())
    }
}

/// `~/.config/leo/config.yaml` (platform equivalent)
pub fn global_config_file() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("leo")
        .join("config.yaml"))
}

/// Locate the configuration file
///
/// Lookup order:
/// 1. `explicit`, then the `LEO_CONFIG_PATH` environment variable; either
///    must exist when given
/// 2. current directory: `leo.yaml`, `.leo.yaml`
/// 3. `./.leo/config.yaml`
/// 4. the global file from [`global_config_file`]
pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    let requested = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
    if let Some(path) = requested {
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::ConfigFileNotFound(path));
    }

    let current_dir = std::env::current_dir()?;
    for filename in CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    let project = current_dir.join(".leo").join("config.yaml");
    if project.exists() {
        return Ok(Some(project));
    }

    if let Ok(global) = global_config_file() {
        if global.exists() {
            return Ok(Some(global));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    /// Run `f` inside `dir` with no `LEO_CONFIG_PATH` and an empty config home
    fn in_dir<T>(dir: &Path, f: impl FnOnce() -> T) -> T {
        let home = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();

        let result = temp_env::with_vars(
            [
                (CONFIG_PATH_ENV, None),
                ("HOME", Some(home.path().as_os_str())),
                ("XDG_CONFIG_HOME", Some(home.path().as_os_str())),
            ],
            f,
        );

        std::env::set_current_dir(original_dir).unwrap();
        result
    }

    #[test]
    #[serial]
    fn test_defaults_without_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = in_dir(temp_dir.path(), || Config::load(None)).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.region, "us-west");
        assert_eq!(config.timeouts.read_timeout(), Duration::from_secs(180));
    }

    #[test]
    #[serial]
    fn test_find_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("leo.yaml"), "region: eu-west\n").unwrap();

        let path = in_dir(temp_dir.path(), || find_config_file(None))
            .unwrap()
            .unwrap();
        assert!(path.ends_with("leo.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project = temp_dir.path().join(".leo");
        fs::create_dir(&project).unwrap();
        fs::write(project.join("config.yaml"), "region: eu-west\n").unwrap();

        let path = in_dir(temp_dir.path(), || find_config_file(None))
            .unwrap()
            .unwrap();
        assert!(path.ends_with(".leo/config.yaml"));
    }

    #[test]
    #[serial]
    fn test_env_var_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "region: eu-north\n").unwrap();

        let config = temp_env::with_var(CONFIG_PATH_ENV, Some(&config_path), || {
            Config::load(None)
        })
        .unwrap();
        assert_eq!(config.region, "eu-north");
    }

    #[test]
    #[serial]
    fn test_explicit_path_must_exist() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.yaml");

        let result = Config::load(Some(missing.as_path()));
        assert!(matches!(result, Err(ConfigError::ConfigFileNotFound(path)) if path == missing));
    }

    #[test]
    fn test_parse_full_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("leo.yaml");
        fs::write(
            &path,
            r#"
region: eastus
tags:
  team: ml
ssh_public_key: /keys/id.pub
timeouts:
  create: 600
aliases:
  machines:
    m: Standard_D8s_v3
  images:
    debian: admin@Debian:debian-11:11:latest
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.region, "eastus");
        assert_eq!(config.tags["team"], "ml");
        assert_eq!(config.public_key_path(), Some(PathBuf::from("/keys/id.pub")));
        assert_eq!(config.timeouts.create_timeout(), Duration::from_secs(600));
        assert_eq!(config.timeouts.delete, Timeouts::default().delete);
        assert_eq!(config.aliases.resolve_machine("m"), "Standard_D8s_v3");
        assert_eq!(
            config.aliases.resolve_image("debian"),
            "admin@Debian:debian-11:11:latest"
        );
    }

    #[test]
    fn test_invalid_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("leo.yaml");
        fs::write(&path, "timeouts: soon\n").unwrap();

        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_empty_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("leo.yaml");
        fs::write(&path, "\n").unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), Config::default());
    }

    #[test]
    #[serial]
    fn test_public_key_tilde_expansion() {
        let home = tempfile::tempdir().unwrap();
        let config = Config {
            ssh_public_key: Some(PathBuf::from("~/.ssh/work.pub")),
            ..Default::default()
        };

        let path = temp_env::with_var("HOME", Some(home.path()), || config.public_key_path());
        assert_eq!(path, Some(home.path().join(".ssh/work.pub")));
    }
}
