//! Configuration loading: category table, organization defaults and exclusion filters.
//!
//! Configuration is read from a TOML file. Every section is optional; an
//! empty file yields the built-in defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [organize]
//! by_type = true
//! by_date = true
//! hidden_prefix = "."
//! catch_all = "Others"
//!
//! [[categories]]
//! name = "Images"
//! extensions = ["jpg", "png"]
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db"]
//! extensions = ["part"]
//! patterns = ["*.tmp"]
//! regex = ['^~\$']
//! ```
//!
//! When `[[categories]]` is present it replaces the built-in table entirely,
//! and lookups follow the order the categories are listed in.

use crate::file_category::{Category, CategoryTable, DEFAULT_CATCH_ALL};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".smartsortrc.toml";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("IO error reading configuration {}: {}", .path.display(), .reason)]
    IoError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Invalid category name '{0}': must be non-empty and contain no path separators")]
    InvalidCategoryName(String),

    #[error("Category '{0}' is defined more than once")]
    DuplicateCategory(String),

    #[error("Hidden-file prefix must not be empty")]
    EmptyHiddenPrefix,

    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub organize: OrganizeSettings,

    /// Ordered category list. `None` means the built-in table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<CategoryConfig>>,

    pub filters: FilterRules,
}

/// Default organization behavior, overridable from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeSettings {
    pub by_type: bool,
    pub by_date: bool,
    /// Entries whose name starts with this prefix are never moved.
    pub hidden_prefix: String,
    pub catch_all: String,
}

impl Default for OrganizeSettings {
    fn default() -> Self {
        Self {
            by_type: true,
            by_date: true,
            hidden_prefix: ".".to_string(),
            catch_all: DEFAULT_CATCH_ALL.to_string(),
        }
    }
}

/// One `[[categories]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Filter rules section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,
}

/// Rules for excluding files from organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., "Thumbs.db", "desktop.ini").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the file name (e.g., "*.tmp").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude (e.g., "part", "crdownload").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

impl AppConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.smartsortrc.toml` in the current directory
    /// 3. Look for `~/.config/smartsort/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly provided file is missing, or if any
    /// file that is found cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("smartsort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        log::debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        log::info!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Builds the category table, validating names.
    ///
    /// Overlapping extensions are accepted (first category wins) and logged
    /// as warnings.
    pub fn category_table(&self) -> Result<CategoryTable, ConfigError> {
        validate_dir_name(&self.organize.catch_all)?;

        let Some(categories) = &self.categories else {
            let mut table = CategoryTable::new(self.organize.catch_all.clone());
            for category in CategoryTable::default().categories() {
                table.push(category.clone());
            }
            return Ok(table);
        };

        let mut seen = HashSet::new();
        let mut table = CategoryTable::new(self.organize.catch_all.clone());
        for category in categories {
            validate_dir_name(&category.name)?;
            if !seen.insert(category.name.as_str()) {
                return Err(ConfigError::DuplicateCategory(category.name.clone()));
            }
            table.push(Category::new(category.name.clone(), &category.extensions));
        }

        for overlap in table.overlaps() {
            log::warn!(
                "Extension '{}' is listed in both '{}' and '{}'; '{}' wins",
                overlap.extension,
                overlap.winner,
                overlap.shadowed,
                overlap.winner
            );
        }

        Ok(table)
    }

    /// The hidden-file prefix, validated.
    pub fn hidden_prefix(&self) -> Result<&str, ConfigError> {
        if self.organize.hidden_prefix.is_empty() {
            return Err(ConfigError::EmptyHiddenPrefix);
        }
        Ok(&self.organize.hidden_prefix)
    }

    /// Compile the exclusion rules into matchers.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// Category names become directory names, so they must be a single path segment.
fn validate_dir_name(name: &str) -> Result<(), ConfigError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(ConfigError::InvalidCategoryName(name.to_string()));
    }
    Ok(())
}

/// Compiled exclusion rules.
///
/// Patterns are parsed once up front so that matching each entry only walks
/// the rule lists.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilters {
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
}

impl CompiledFilters {
    /// Create compiled filters from filter rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex patterns are invalid.
    pub fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = rules
            .exclude
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| crate::file_category::normalize_extension(ext))
                .collect(),
            exclude_patterns,
            exclude_regexes,
        })
    }

    /// Returns true if a file name is matched by any exclusion rule.
    ///
    /// Checks run in order: exact name, extension, glob, regex.
    pub fn is_excluded(&self, file_name: &str) -> bool {
        if self.exclude_filenames.contains(file_name) {
            return true;
        }

        if let Some(ext) = Path::new(file_name).extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return true;
            }
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches(file_name))
        {
            return true;
        }

        self.exclude_regexes
            .iter()
            .any(|regex| regex.is_match(file_name))
    }
}
