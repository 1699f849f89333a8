//! Configuration loading for lessongate.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.lessongate/config.toml`)
//! 3. User config (`~/.lessongate/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The system runs with sensible defaults
//! when no config exists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{DegradedAccessPolicy, VALID_POLICIES};
use crate::error::{LessonGateError, Result};

/// Main configuration struct for lessongate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Progress store connection.
    pub store: StoreConfig,
    /// Access check behaviour.
    pub access: AccessConfig,
    /// Lives defaults.
    pub lives: LivesConfig,
    /// Topic catalog.
    pub catalog: CatalogConfig,
}

/// Progress store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Store backend: "file" or "http".
    pub backend: String,
    /// User id for the file store.
    pub user: String,
    /// Directory of the file store (defaults to `<home>/data`).
    pub data_dir: Option<PathBuf>,
    /// Base URL of the remote store.
    pub base_url: String,
    /// Bearer token issued by the auth service.
    pub token: Option<String>,
    /// Request timeout for the remote store.
    pub timeout_seconds: u64,
}

/// Valid values for the store backend field.
pub const VALID_BACKENDS: &[&str] = &["file", "http"];

/// Minimum valid timeout_seconds value.
pub const MIN_TIMEOUT_SECONDS: u64 = 1;

impl StoreConfig {
    /// Check if a backend value is valid.
    pub fn is_valid_backend(value: &str) -> bool {
        VALID_BACKENDS.contains(&value)
    }

    /// Check if a timeout value is valid.
    pub fn is_valid_timeout_seconds(value: u64) -> bool {
        value >= MIN_TIMEOUT_SECONDS
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "file".to_string(),
            user: "local".to_string(),
            data_dir: None,
            base_url: "http://localhost:8000".to_string(),
            token: None,
            timeout_seconds: 10,
        }
    }
}

/// Access check configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AccessConfig {
    /// What to do when the progress read fails for lesson > 1.
    pub degraded_policy: DegradedAccessPolicy,
}

/// Lives configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LivesConfig {
    /// Maximum for a newly created balance in the local store.
    pub default_max: u32,
}

/// Minimum valid lives maximum.
pub const MIN_MAX_LIVES: u32 = 1;

impl LivesConfig {
    /// Check if a lives maximum is valid (must be >= 1).
    pub fn is_valid_max(value: u32) -> bool {
        value >= MIN_MAX_LIVES
    }
}

impl Default for LivesConfig {
    fn default() -> Self {
        Self { default_max: 3 }
    }
}

/// Topic catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Lesson count per topic slug.
    pub topics: BTreeMap<String, u32>,
    /// Lessons with written content per topic slug (all when absent).
    pub authored: BTreeMap<String, u32>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            topics: BTreeMap::from([("rent".to_string(), 11)]),
            authored: BTreeMap::from([("rent".to_string(), 2)]),
        }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.lessongate/config.toml` in cwd or an ancestor)
    /// 3. User config (`~/.lessongate/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `<home>/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = lessongate_home()?;
        Self::load_optional(&home.join("config.toml"))
    }

    /// Load project config from the nearest `.lessongate/config.toml`.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let path = project_dir(cwd).join("config.toml");
        Self::load_optional(&path)
    }

    /// Load a config file if it exists; a broken file is reported and skipped.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| LessonGateError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| LessonGateError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // LESSONGATE_STORE_BACKEND
        if let Ok(val) = env::var("LESSONGATE_STORE_BACKEND") {
            if StoreConfig::is_valid_backend(&val) {
                self.store.backend = val;
            } else {
                tracing::warn!(
                    "Invalid LESSONGATE_STORE_BACKEND value '{}'. Valid values: {:?}. Using '{}'.",
                    val,
                    VALID_BACKENDS,
                    self.store.backend
                );
            }
        }

        // LESSONGATE_USER
        if let Ok(val) = env::var("LESSONGATE_USER") {
            if !val.is_empty() {
                self.store.user = val;
            }
        }

        // LESSONGATE_DATA_DIR
        if let Ok(val) = env::var("LESSONGATE_DATA_DIR") {
            if !val.is_empty() {
                self.store.data_dir = Some(PathBuf::from(val));
            }
        }

        // LESSONGATE_BASE_URL
        if let Ok(val) = env::var("LESSONGATE_BASE_URL") {
            if !val.is_empty() {
                self.store.base_url = val;
            }
        }

        // LESSONGATE_TOKEN
        if let Ok(val) = env::var("LESSONGATE_TOKEN") {
            self.store.token = (!val.is_empty()).then_some(val);
        }

        // LESSONGATE_TIMEOUT_SECONDS
        if let Ok(val) = env::var("LESSONGATE_TIMEOUT_SECONDS") {
            match val.parse::<u64>() {
                Ok(n) if StoreConfig::is_valid_timeout_seconds(n) => self.store.timeout_seconds = n,
                _ => tracing::warn!(
                    "Invalid LESSONGATE_TIMEOUT_SECONDS value '{}'. Must be >= {}. Using '{}'.",
                    val,
                    MIN_TIMEOUT_SECONDS,
                    self.store.timeout_seconds
                ),
            }
        }

        // LESSONGATE_DEGRADED_POLICY
        if let Ok(val) = env::var("LESSONGATE_DEGRADED_POLICY") {
            match DegradedAccessPolicy::parse(&val) {
                Some(policy) => self.access.degraded_policy = policy,
                None => tracing::warn!(
                    "Invalid LESSONGATE_DEGRADED_POLICY '{}'. Valid values: {:?}. Using '{}'.",
                    val,
                    VALID_POLICIES,
                    self.access.degraded_policy
                ),
            }
        }

        // LESSONGATE_DEFAULT_MAX_LIVES
        if let Ok(val) = env::var("LESSONGATE_DEFAULT_MAX_LIVES") {
            match val.parse::<u32>() {
                Ok(n) if LivesConfig::is_valid_max(n) => self.lives.default_max = n,
                _ => tracing::warn!(
                    "Invalid LESSONGATE_DEFAULT_MAX_LIVES value '{}'. Must be >= {}. Using '{}'.",
                    val,
                    MIN_MAX_LIVES,
                    self.lives.default_max
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence field by field: every value in
    /// `other` that differs from the default replaces the value in `self`,
    /// and catalog entries are merged additively.
    ///
    /// # Limitation
    ///
    /// A higher layer cannot set a field back to its default once a lower
    /// layer changed it, because "unset" and "explicitly default" look the
    /// same after deserialization.
    fn merge(mut self, other: Config) -> Self {
        let default_store = StoreConfig::default();
        if other.store.backend != default_store.backend {
            self.store.backend = other.store.backend;
        }
        if other.store.user != default_store.user {
            self.store.user = other.store.user;
        }
        if other.store.data_dir.is_some() {
            self.store.data_dir = other.store.data_dir;
        }
        if other.store.base_url != default_store.base_url {
            self.store.base_url = other.store.base_url;
        }
        if other.store.token.is_some() {
            self.store.token = other.store.token;
        }
        if other.store.timeout_seconds != default_store.timeout_seconds {
            self.store.timeout_seconds = other.store.timeout_seconds;
        }

        if other.access.degraded_policy != DegradedAccessPolicy::default() {
            self.access.degraded_policy = other.access.degraded_policy;
        }

        if other.lives.default_max != LivesConfig::default().default_max {
            self.lives.default_max = other.lives.default_max;
        }

        for (slug, lessons) in other.catalog.topics {
            self.catalog.topics.insert(slug, lessons);
        }
        for (slug, authored) in other.catalog.authored {
            self.catalog.authored.insert(slug, authored);
        }

        self
    }

    /// Directory of the file store.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.store
            .data_dir
            .clone()
            .or_else(|| lessongate_home().map(|h| h.join("data")))
    }
}

/// Get the lessongate home directory.
///
/// `LESSONGATE_HOME` if set and non-empty, otherwise `~/.lessongate`.
pub fn lessongate_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("LESSONGATE_HOME") {
        if home.is_empty() {
            tracing::warn!("LESSONGATE_HOME is empty, using default");
        } else {
            return Some(PathBuf::from(home));
        }
    }

    dirs::home_dir().map(|home| home.join(".lessongate"))
}

/// Find the project `.lessongate` directory for a working directory.
///
/// The nearest ancestor (or `cwd` itself) holding a `.lessongate/` directory
/// wins; without one, `cwd/.lessongate` is returned.
pub fn project_dir(cwd: &Path) -> PathBuf {
    for ancestor in cwd.ancestors() {
        let candidate = ancestor.join(".lessongate");
        if candidate.is_dir() {
            return candidate;
        }
    }
    cwd.join(".lessongate")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "LESSONGATE_STORE_BACKEND",
        "LESSONGATE_USER",
        "LESSONGATE_DATA_DIR",
        "LESSONGATE_BASE_URL",
        "LESSONGATE_TOKEN",
        "LESSONGATE_TIMEOUT_SECONDS",
        "LESSONGATE_DEGRADED_POLICY",
        "LESSONGATE_DEFAULT_MAX_LIVES",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    /// Point LESSONGATE_HOME at an empty directory so user config is absent.
    fn isolated_home() -> TempDir {
        let home = TempDir::new().unwrap();
        env::set_var("LESSONGATE_HOME", home.path());
        home
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.store.backend, "file");
        assert_eq!(config.store.user, "local");
        assert!(config.store.data_dir.is_none());
        assert_eq!(config.store.base_url, "http://localhost:8000");
        assert!(config.store.token.is_none());
        assert_eq!(config.store.timeout_seconds, 10);

        assert_eq!(
            config.access.degraded_policy,
            DegradedAccessPolicy::Permissive
        );
        assert_eq!(config.lives.default_max, 3);

        assert_eq!(config.catalog.topics.get("rent"), Some(&11));
        assert_eq!(config.catalog.authored.get("rent"), Some(&2));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let toml_content = r#"
[store]
backend = "http"
base_url = "https://learn.example.com"

[access]
degraded_policy = "strict"

[catalog.topics]
taxes = 4
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(config.store.backend, "http");
        assert_eq!(config.store.base_url, "https://learn.example.com");
        assert_eq!(config.access.degraded_policy, DegradedAccessPolicy::Strict);
        assert_eq!(config.catalog.topics.get("taxes"), Some(&4));
        assert_eq!(config.lives.default_max, 3);
    }

    #[test]
    fn test_load_from_file_missing() {
        assert!(Config::load_from_file(Path::new("/nonexistent/config.toml")).is_err());
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "this is not valid toml [[[").unwrap();
        assert!(Config::load_from_file(&config_path).is_err());
    }

    #[test]
    fn test_load_from_file_invalid_policy() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[access]\ndegraded_policy = \"lenient\"\n").unwrap();
        assert!(Config::load_from_file(&config_path).is_err());
    }

    #[test]
    #[serial]
    fn test_project_config_precedence() {
        clear_env();
        let _home = isolated_home();
        let dir = TempDir::new().unwrap();
        let project = dir.path().join(".lessongate");
        fs::create_dir_all(&project).unwrap();
        fs::write(
            project.join("config.toml"),
            "[lives]\ndefault_max = 5\n[catalog.topics]\ntaxes = 4\n",
        )
        .unwrap();

        let config = Config::load_from_cwd(dir.path());

        assert_eq!(config.lives.default_max, 5);
        // Catalog merges additively with the defaults
        assert_eq!(config.catalog.topics.get("rent"), Some(&11));
        assert_eq!(config.catalog.topics.get("taxes"), Some(&4));

        env::remove_var("LESSONGATE_HOME");
    }

    #[test]
    #[serial]
    fn test_project_config_found_from_subdirectory() {
        clear_env();
        let _home = isolated_home();
        let dir = TempDir::new().unwrap();
        let project = dir.path().join(".lessongate");
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("config.toml"), "[store]\nuser = \"ana\"\n").unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::load_from_cwd(&nested);
        assert_eq!(config.store.user, "ana");

        env::remove_var("LESSONGATE_HOME");
    }

    #[test]
    #[serial]
    fn test_user_config_below_project_config() {
        clear_env();
        let home = isolated_home();
        fs::write(
            home.path().join("config.toml"),
            "[store]\nuser = \"from-user\"\nbase_url = \"http://user.example\"\n",
        )
        .unwrap();

        let dir = TempDir::new().unwrap();
        let project = dir.path().join(".lessongate");
        fs::create_dir_all(&project).unwrap();
        fs::write(
            project.join("config.toml"),
            "[store]\nuser = \"from-project\"\n",
        )
        .unwrap();

        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.store.user, "from-project");
        assert_eq!(config.store.base_url, "http://user.example");

        env::remove_var("LESSONGATE_HOME");
    }

    #[test]
    #[serial]
    fn test_env_var_precedence() {
        clear_env();
        let _home = isolated_home();
        let dir = TempDir::new().unwrap();
        let project = dir.path().join(".lessongate");
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("config.toml"), "[lives]\ndefault_max = 5\n").unwrap();

        env::set_var("LESSONGATE_DEFAULT_MAX_LIVES", "7");

        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.lives.default_max, 7);

        clear_env();
        env::remove_var("LESSONGATE_HOME");
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        clear_env();
        let _home = isolated_home();
        env::set_var("LESSONGATE_STORE_BACKEND", "http");
        env::set_var("LESSONGATE_USER", "learner-9");
        env::set_var("LESSONGATE_DATA_DIR", "/tmp/lessongate-data");
        env::set_var("LESSONGATE_BASE_URL", "https://api.example.com");
        env::set_var("LESSONGATE_TOKEN", "abc");
        env::set_var("LESSONGATE_TIMEOUT_SECONDS", "30");
        env::set_var("LESSONGATE_DEGRADED_POLICY", "open");

        let dir = TempDir::new().unwrap();
        let config = Config::load_from_cwd(dir.path());

        assert_eq!(config.store.backend, "http");
        assert_eq!(config.store.user, "learner-9");
        assert_eq!(
            config.store.data_dir,
            Some(PathBuf::from("/tmp/lessongate-data"))
        );
        assert_eq!(config.store.base_url, "https://api.example.com");
        assert_eq!(config.store.token.as_deref(), Some("abc"));
        assert_eq!(config.store.timeout_seconds, 30);
        assert_eq!(config.access.degraded_policy, DegradedAccessPolicy::Open);

        clear_env();
        env::remove_var("LESSONGATE_HOME");
    }

    #[test]
    #[serial]
    fn test_env_var_invalid_values_ignored() {
        clear_env();
        let _home = isolated_home();
        env::set_var("LESSONGATE_STORE_BACKEND", "ftp");
        env::set_var("LESSONGATE_TIMEOUT_SECONDS", "0");
        env::set_var("LESSONGATE_DEGRADED_POLICY", "lenient");
        env::set_var("LESSONGATE_DEFAULT_MAX_LIVES", "zero");

        let dir = TempDir::new().unwrap();
        let config = Config::load_from_cwd(dir.path());

        assert_eq!(config.store.backend, "file");
        assert_eq!(config.store.timeout_seconds, 10);
        assert_eq!(
            config.access.degraded_policy,
            DegradedAccessPolicy::Permissive
        );
        assert_eq!(config.lives.default_max, 3);

        clear_env();
        env::remove_var("LESSONGATE_HOME");
    }

    #[test]
    #[serial]
    fn test_env_var_zero_max_lives_ignored() {
        clear_env();
        let _home = isolated_home();
        env::set_var("LESSONGATE_DEFAULT_MAX_LIVES", "0");

        let dir = TempDir::new().unwrap();
        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.lives.default_max, 3);

        clear_env();
        env::remove_var("LESSONGATE_HOME");
    }

    #[test]
    #[serial]
    fn test_broken_project_config_falls_back_to_defaults() {
        clear_env();
        let _home = isolated_home();
        let dir = TempDir::new().unwrap();
        let project = dir.path().join(".lessongate");
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("config.toml"), "[[[").unwrap();

        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config, Config::default());

        env::remove_var("LESSONGATE_HOME");
    }

    #[test]
    #[serial]
    fn test_lessongate_home_with_env() {
        env::set_var("LESSONGATE_HOME", "/custom/home");
        assert_eq!(lessongate_home(), Some(PathBuf::from("/custom/home")));
        env::remove_var("LESSONGATE_HOME");
    }

    #[test]
    #[serial]
    fn test_lessongate_home_empty_env() {
        env::set_var("LESSONGATE_HOME", "");
        let home = lessongate_home();
        if let Some(path) = home {
            assert!(path.ends_with(".lessongate"));
        }
        env::remove_var("LESSONGATE_HOME");
    }

    #[test]
    #[serial]
    fn test_data_dir_defaults_under_home() {
        clear_env();
        env::set_var("LESSONGATE_HOME", "/custom/home");
        let config = Config::default();
        assert_eq!(config.data_dir(), Some(PathBuf::from("/custom/home/data")));

        let mut config = Config::default();
        config.store.data_dir = Some(PathBuf::from("/elsewhere"));
        assert_eq!(config.data_dir(), Some(PathBuf::from("/elsewhere")));
        env::remove_var("LESSONGATE_HOME");
    }

    #[test]
    fn test_merge_keeps_lower_layer_values() {
        let mut lower = Config::default();
        lower.store.base_url = "http://lower".to_string();
        lower.store.token = Some("t".to_string());

        let mut upper = Config::default();
        upper.store.user = "upper".to_string();

        let merged = lower.merge(upper);
        assert_eq!(merged.store.base_url, "http://lower");
        assert_eq!(merged.store.token.as_deref(), Some("t"));
        assert_eq!(merged.store.user, "upper");
    }

    #[test]
    fn test_full_toml_roundtrip() {
        let mut config = Config::default();
        config.store.backend = "http".to_string();
        config.store.token = Some("abc".to_string());
        config.access.degraded_policy = DegradedAccessPolicy::Strict;
        config.catalog.topics.insert("taxes".to_string(), 4);

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validators() {
        assert!(StoreConfig::is_valid_backend("file"));
        assert!(StoreConfig::is_valid_backend("http"));
        assert!(!StoreConfig::is_valid_backend("sqlite"));
        assert!(!StoreConfig::is_valid_timeout_seconds(0));
        assert!(StoreConfig::is_valid_timeout_seconds(1));
        assert!(!LivesConfig::is_valid_max(0));
        assert!(LivesConfig::is_valid_max(3));
    }
}
