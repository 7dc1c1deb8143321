use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::paths;
use crate::rules::FolderRule;

/// Locations tried, in order, when no config path is given.
pub const DEFAULT_LOCATIONS: &[&str] = &["elements.toml", "config/default.toml"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub vault: VaultConfig,
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub moves: MoveConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

/// Routing rules, fallback folder and ignore list for one classification
/// pass. Read-only while a pass runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationConfig {
    pub default_folder: String,
    #[serde(default)]
    pub ignored_path_prefixes: Vec<String>,
    #[serde(default)]
    pub rules: Vec<FolderRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    #[default]
    Fail,
    Rename,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveConfig {
    #[serde(default = "default_true")]
    pub create_missing_folders: bool,
    #[serde(default)]
    pub conflict: ConflictPolicy,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_journal_path")]
    pub path: String,
}

fn default_root() -> String {
    ".".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    1
}

fn default_journal_path() -> String {
    ".elements/journal.db".to_string()
}

impl Default for VaultConfig {
    fn default() -> Self {
        VaultConfig {
            root: default_root(),
            exclude: vec![".obsidian/**".to_string(), ".trash/**".to_string()],
            extensions: default_extensions(),
        }
    }
}

impl Default for MoveConfig {
    fn default() -> Self {
        MoveConfig {
            create_missing_folders: true,
            conflict: ConflictPolicy::Fail,
            concurrency: default_concurrency(),
            dry_run: false,
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        JournalConfig {
            enabled: true,
            path: default_journal_path(),
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        ClassificationConfig {
            default_folder: "/02 Concepts".to_string(),
            ignored_path_prefixes: vec!["/10 Files".to_string()],
            rules: vec![
                FolderRule::new("Concept", "/02 Concepts", "concept"),
                FolderRule::new("Person", "/03 People", "person"),
                FolderRule::new("Meeting", "/04 Meetings", "meeting"),
                FolderRule::new("Institutions", "/04 Institutions", "institutions"),
                FolderRule::new("Projects", "/05 Projects", "project"),
                FolderRule::new("PrivateMeetings", "/07 Private/1-1s", "meeting/1-1"),
            ],
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            vault: VaultConfig::default(),
            classification: ClassificationConfig::default(),
            moves: MoveConfig::default(),
            journal: JournalConfig::default(),
        }
    }
}

impl ClassificationConfig {
    pub fn new(rules: Vec<FolderRule>, default_folder: &str, ignored_path_prefixes: Vec<String>) -> Self {
        ClassificationConfig {
            default_folder: default_folder.to_string(),
            ignored_path_prefixes,
            rules,
        }
        .normalized()
    }

    /// Normalizes every path and tag. Blank ignore prefixes are dropped, since
    /// they would match every note.
    pub fn normalized(self) -> Self {
        ClassificationConfig {
            default_folder: paths::normalize(&self.default_folder),
            ignored_path_prefixes: self
                .ignored_path_prefixes
                .iter()
                .filter(|p| !p.trim().is_empty())
                .map(|p| paths::normalize(p))
                .collect(),
            rules: self.rules.into_iter().map(FolderRule::normalized).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_folder.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "classification.default_folder must not be empty".into(),
            ));
        }
        for (idx, rule) in self.rules.iter().enumerate() {
            if rule.tag.trim().trim_start_matches('#').is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "classification.rules[{idx}] ({}) has an empty tag",
                    rule.concept_type
                )));
            }
            if rule.folder.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "classification.rules[{idx}] ({}) has an empty folder",
                    rule.concept_type
                )));
            }
        }
        Ok(())
    }
}

impl FromStr for ConflictPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(ConflictPolicy::Fail),
            "rename" => Ok(ConflictPolicy::Rename),
            other => Err(ConfigError::Invalid(format!(
                "unknown conflict policy {other:?} (expected fail or rename)"
            ))),
        }
    }
}

impl AppConfig {
    /// Validates and normalizes a freshly deserialized config.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.classification.validate()?;
        self.classification = self.classification.normalized();
        if self.moves.concurrency == 0 {
            self.moves.concurrency = 1;
        }
        Ok(self)
    }

    /// Journal database location; relative paths resolve against the vault.
    pub fn journal_path(&self, vault_root: &Path) -> PathBuf {
        let path = PathBuf::from(&self.journal.path);
        if path.is_absolute() {
            path
        } else {
            vault_root.join(path)
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Loads the configuration from `path`, or from the first of
/// [`DEFAULT_LOCATIONS`] that exists. `ELEMENTS_*` environment variables
/// override file values (`ELEMENTS_MOVES__DRY_RUN=true`).
pub fn load(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let source = match path {
        Some(p) => PathBuf::from(p),
        None => DEFAULT_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
            .ok_or_else(|| ConfigError::Missing(DEFAULT_LOCATIONS.join(", ")))?,
    };
    if !source.is_file() {
        return Err(ConfigError::Missing(source.display().to_string()));
    }

    let settings = config::Config::builder()
        .add_source(config::File::from(source.as_path()))
        .add_source(
            config::Environment::with_prefix("ELEMENTS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    let cfg: AppConfig = settings
        .try_deserialize()
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    cfg.validated()
}
