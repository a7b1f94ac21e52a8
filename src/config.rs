use crate::domain::{RefPattern, RefType, Rule};
use crate::engine::ResolveOptions;
use crate::error::{GitVersioningError, Result};
use crate::git::GitSituation;
use crate::matcher::MatchOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_FILE_NAME: &str = "gitversioning.toml";

/// Represents the complete configuration for git-versioning.
///
/// Contains the ordered ref rules, the commit fallback and describe settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Let tag rules match while a branch is checked out
    #[serde(default)]
    pub consider_tags_on_branches: bool,

    /// Tags eligible for `${describe.*}`, whole-string regex
    #[serde(default)]
    pub describe_tag_pattern: Option<String>,

    #[serde(default)]
    pub first_parent: Option<bool>,

    /// Maximum number of commits the describe walk visits
    #[serde(default)]
    pub describe_max_depth: Option<usize>,

    /// Ref rules in order of precedence
    #[serde(default)]
    pub refs: Vec<RefConfig>,

    /// Commit fallback used when no ref rule matches
    #[serde(default)]
    pub rev: Option<RevConfig>,
}

/// One `[[refs]]` entry
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RefConfig {
    #[serde(rename = "type")]
    pub ref_type: RefType,

    #[serde(default)]
    pub pattern: Option<String>,

    pub version: String,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    #[serde(default)]
    pub describe_tag_pattern: Option<String>,

    #[serde(default)]
    pub first_parent: Option<bool>,
}

/// The `[rev]` table
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RevConfig {
    pub version: String,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            consider_tags_on_branches: false,
            describe_tag_pattern: None,
            first_parent: None,
            describe_max_depth: None,
            refs: vec![
                RefConfig {
                    ref_type: RefType::Branch,
                    pattern: None,
                    version: "${branch}-SNAPSHOT".to_string(),
                    properties: BTreeMap::new(),
                    describe_tag_pattern: None,
                    first_parent: None,
                },
                RefConfig {
                    ref_type: RefType::Tag,
                    pattern: Some("v?(?<version>.+)".to_string()),
                    version: "${version}".to_string(),
                    properties: BTreeMap::new(),
                    describe_tag_pattern: None,
                    first_parent: None,
                },
            ],
            rev: Some(RevConfig {
                version: "${commit}".to_string(),
                properties: BTreeMap::new(),
            }),
        }
    }
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Config> {
        Ok(toml::from_str(content)?)
    }

    /// Build the ordered rule list
    ///
    /// # Errors
    /// * `Config` - if a pattern is not a valid regex
    pub fn rules(&self) -> Result<Vec<Rule>> {
        self.refs
            .iter()
            .enumerate()
            .map(|(index, entry)| -> Result<Rule> {
                let mut rule = Rule::new(entry.ref_type, entry.version.as_str());
                rule.properties = entry.properties.clone();
                rule.pattern = compile(entry.pattern.as_deref(), index)?;
                rule.describe_tag_pattern = compile(entry.describe_tag_pattern.as_deref(), index)?;
                rule.first_parent = entry.first_parent;
                Ok(rule)
            })
            .collect()
    }

    /// The `[rev]` fallback as a commit rule, if configured
    pub fn commit_fallback(&self) -> Option<Rule> {
        self.rev.as_ref().map(|rev| {
            let mut rule = Rule::commit(rev.version.as_str());
            rule.properties = rev.properties.clone();
            rule
        })
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            consider_tags_on_branches: self.consider_tags_on_branches,
        }
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            consider_tags_on_branches: self.consider_tags_on_branches,
            ..ResolveOptions::default()
        }
    }

    /// Apply the global describe settings to `situation`
    ///
    /// Rule-level overrides are applied later, during resolution.
    pub fn apply_describe_settings(&self, situation: &mut GitSituation) -> Result<()> {
        if let Some(pattern) = &self.describe_tag_pattern {
            let pattern = RefPattern::new(pattern).map_err(|e| {
                GitVersioningError::config(format!(
                    "Invalid describe_tag_pattern '{}': {}",
                    pattern, e
                ))
            })?;
            situation.set_describe_tag_pattern(Some(pattern))?;
        }
        if let Some(first_parent) = self.first_parent {
            situation.set_first_parent(first_parent)?;
        }
        situation.set_describe_max_depth(self.describe_max_depth)?;
        Ok(())
    }
}

fn compile(pattern: Option<&str>, index: usize) -> Result<Option<RefPattern>> {
    pattern
        .map(|pattern| {
            RefPattern::new(pattern).map_err(|e| {
                GitVersioningError::config(format!(
                    "Invalid pattern '{}' in refs[{}]: {}",
                    pattern, index, e
                ))
            })
        })
        .transpose()
}

/// Candidate configuration files, in search order
fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(".").join(CONFIG_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join(CONFIG_FILE_NAME));
    }
    candidates
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitversioning.toml` in current directory
/// 3. `gitversioning.toml` in user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    if let Some(path) = config_path {
        return read_config(Path::new(path));
    }

    match config_candidates().into_iter().find(|path| path.exists()) {
        Some(path) => read_config(&path),
        None => {
            debug!("no configuration file found, using defaults");
            Ok(Config::default())
        }
    }
}

fn read_config(path: &Path) -> Result<Config> {
    debug!(path = %path.display(), "loading configuration");
    let content = fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| GitVersioningError::config(format!("{}: {}", path.display(), e)))
}
