//! Per-user settings that survive between runs: excluded items and the
//! categories the non-interactive runner cleans.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::utils;

const APP_DIR: &str = "mac-sweep";
const FILE_NAME: &str = "config.yaml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    /// Category id to paths the user never wants cleaned for that category.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub excluded_paths: BTreeMap<String, Vec<PathBuf>>,

    /// Category ids cleaned by `--clean` when none are given on the command line.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_targets: Vec<String>,

    #[serde(skip)]
    path: PathBuf,
}

impl UserConfig {
    /// `$HOME/.config/mac-sweep/config.yaml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(utils::home_dir()?.join(".config").join(APP_DIR).join(FILE_NAME))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path()?)
    }

    /// A missing file is an empty config; a malformed one is an error.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No user config at {}", path.display());
                return Ok(Self::empty(path));
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        if text.trim().is_empty() {
            return Ok(Self::empty(path));
        }
        let mut config: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            what: path.display().to_string(),
            source,
        })?;
        config.path = path;
        Ok(config)
    }

    fn empty(path: PathBuf) -> Self {
        Self {
            path,
            ..Self::default()
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the config, creating its directory (0755) and file (0644).
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(dir) = self.path.parent() {
            create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let text = serde_yaml::to_string(self).map_err(ConfigError::Serialize)?;
        fs::write(&self.path, text)
            .and_then(|()| set_file_mode(&self.path))
            .map_err(|source| ConfigError::Io {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!("Saved user config to {}", self.path.display());
        Ok(())
    }

    /// Replace the exclusions of `category_id`. An empty list removes the entry.
    pub fn set_excluded_paths<I, P>(&mut self, category_id: &str, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        paths.sort();
        paths.dedup();
        if paths.is_empty() {
            self.excluded_paths.remove(category_id);
        } else {
            self.excluded_paths.insert(category_id.to_string(), paths);
        }
    }

    pub fn is_excluded(&self, category_id: &str, path: &Path) -> bool {
        self.excluded_paths
            .get(category_id)
            .is_some_and(|paths| paths.iter().any(|p| p == path))
    }

    /// The exclusions in the shape the job planner takes.
    pub fn excluded_paths_map(&self) -> HashMap<String, HashSet<PathBuf>> {
        self.excluded_paths
            .iter()
            .map(|(id, paths)| (id.clone(), paths.iter().cloned().collect()))
            .collect()
    }
}

#[cfg(unix)]
fn create_dir_all(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o755).create(dir)
}

#[cfg(not(unix))]
fn create_dir_all(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn set_file_mode(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path) -> io::Result<()> {
    Ok(())
}
