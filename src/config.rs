//! The category catalog.
//!
//! The catalog ships inside the binary as YAML and is parsed once at startup.
//! Nothing in the engine mutates a [`Category`] after it has been loaded.

use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;

use crate::error::ConfigError;

const EMBEDDED_CATALOG: &str = include_str!("catalog.yaml");

/// How careful the user should be before cleaning a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Safety {
    Safe,
    Moderate,
    Risky,
}

impl fmt::Display for Safety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Safe => "safe",
            Self::Moderate => "moderate",
            Self::Risky => "risky",
        })
    }
}

/// How the items of a category are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Moved to the Trash.
    Trash,
    /// Removed from disk with no way back.
    Permanent,
    /// The target cleans up after itself (prune commands and the like).
    Builtin,
    /// Report only; the user follows the category guide.
    Manual,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Trash => "trash",
            Self::Permanent => "permanent",
            Self::Builtin => "builtin",
            Self::Manual => "manual",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
}

/// Static descriptor of one cleanup topic.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub group: String,
    pub safety: Safety,
    pub method: Method,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub guide: Option<String>,
    /// Glob patterns; `~` expands to the home directory.
    #[serde(default)]
    pub paths: Vec<String>,
    /// External tool that must be on PATH for the category to be available.
    #[serde(default)]
    pub check_cmd: Option<String>,
    #[serde(default)]
    pub days_old: Option<u32>,
}

impl Category {
    /// Minimal descriptor, mostly useful for tests and ad-hoc targets.
    pub fn new(id: impl Into<String>, name: impl Into<String>, method: Method) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group: String::new(),
            safety: Safety::Safe,
            method,
            note: None,
            guide: None,
            paths: Vec::new(),
            check_cmd: None,
            days_old: None,
        }
    }

    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_days_old(mut self, days: u32) -> Self {
        self.days_old = Some(days);
        self
    }
}

/// The full catalog: groups plus categories in display order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Config {
    /// Load the catalog compiled into the binary.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_yaml(EMBEDDED_CATALOG)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            what: "catalog".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let groups: HashSet<&str> = self.groups.iter().map(|g| g.id.as_str()).collect();
        let mut seen = HashSet::new();

        for cat in &self.categories {
            if !seen.insert(cat.id.as_str()) {
                return Err(ConfigError::DuplicateCategory(cat.id.clone()));
            }
            if !groups.is_empty() && !groups.contains(cat.group.as_str()) {
                return Err(ConfigError::UnknownGroup {
                    category: cat.id.clone(),
                    group: cat.group.clone(),
                });
            }
            if cat.method == Method::Manual && cat.guide.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::MissingGuide(cat.id.clone()));
            }
        }
        Ok(())
    }
}
