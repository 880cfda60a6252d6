//! Build and dependency caches inside the user's own projects.
//!
//! A directory only counts when its parent looks like a project root for the
//! matching tool (a `node_modules` next to a `package.json`, a `target` next
//! to a `Cargo.toml`, ...). Cache directories are never descended into, and
//! toolchain installs at the top of the home directory are skipped entirely.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::Category;
use crate::error::ScanError;
use crate::platform::Platform;
use crate::target::{BuiltinCleaner, Target};
use crate::types::{CleanResult, CleanableItem, ScanResult};
use crate::utils;

use super::{days_ago, trash_items};

/// Bounds the cost of pathological trees.
pub const MAX_DEPTH: usize = 8;

/// Projects touched within this many days are left alone.
pub const DEFAULT_STALE_DAYS: u32 = 7;

/// A cache directory name and the files that mark its parent as a project.
#[derive(Debug)]
pub struct CacheRule {
    pub dir: &'static str,
    pub markers: &'static [&'static str],
    pub tool: &'static str,
}

const PYTHON_MARKERS: &[&str] = &[
    "pyproject.toml",
    "requirements.txt",
    "setup.py",
    "setup.cfg",
    "Pipfile",
];

const GRADLE_MARKERS: &[&str] = &[
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "settings.gradle.kts",
];

/// Rules sharing a directory name are tried in order; the first marker hit wins.
pub const CACHE_RULES: &[CacheRule] = &[
    CacheRule { dir: "node_modules", markers: &["package.json"], tool: "Node.js" },
    CacheRule { dir: ".next", markers: &["package.json"], tool: "Next.js" },
    CacheRule { dir: ".venv", markers: PYTHON_MARKERS, tool: "Python" },
    CacheRule { dir: "venv", markers: PYTHON_MARKERS, tool: "Python" },
    CacheRule { dir: ".tox", markers: &["tox.ini", "pyproject.toml", "setup.py", "setup.cfg"], tool: "tox" },
    CacheRule { dir: ".mypy_cache", markers: PYTHON_MARKERS, tool: "mypy" },
    CacheRule { dir: ".pytest_cache", markers: PYTHON_MARKERS, tool: "pytest" },
    CacheRule { dir: "target", markers: &["Cargo.toml"], tool: "Cargo" },
    CacheRule { dir: "target", markers: &["pom.xml"], tool: "Maven" },
    CacheRule { dir: ".gradle", markers: GRADLE_MARKERS, tool: "Gradle" },
];

/// Names skipped directly under the walk root: platform folders, toolchain
/// installs, editor plugin stores and generic caches.
const SKIP_TOP_LEVEL: &[&str] = &[
    "Library",
    "Applications",
    "Movies",
    "Music",
    "Pictures",
    "Public",
    ".Trash",
    ".cache",
    ".local",
    ".nvm",
    ".npm",
    ".yarn",
    ".pnpm-store",
    ".cargo",
    ".rustup",
    ".gradle",
    ".m2",
    ".pyenv",
    ".rbenv",
    ".docker",
    ".vscode",
    ".cursor",
    "go",
];

fn is_cache_name(name: &str) -> bool {
    CACHE_RULES.iter().any(|rule| rule.dir == name)
}

/// The rule whose marker sits next to `dir`, if any.
pub fn matching_rule(dir: &Path, name: &str) -> Option<&'static CacheRule> {
    let parent = dir.parent()?;
    CACHE_RULES
        .iter()
        .filter(|rule| rule.dir == name)
        .find(|rule| rule.markers.iter().any(|m| parent.join(m).is_file()))
}

pub struct ProjectCacheTarget {
    category: Category,
    platform: Platform,
    root: PathBuf,
    stale_days: u32,
    workers: usize,
}

impl ProjectCacheTarget {
    /// Walks the home directory; `days_old` from the catalog is the staleness threshold.
    pub fn new(category: Category, platform: Platform) -> Self {
        let stale_days = category.days_old.unwrap_or(DEFAULT_STALE_DAYS);
        Self {
            root: platform.home.clone(),
            category,
            platform,
            stale_days,
            workers: num_cpus::get(),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Zero disables the staleness filter.
    pub fn with_stale_days(mut self, days: u32) -> Self {
        self.stale_days = days;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Cache directories with a valid marker, outermost only.
    fn find_caches(&self) -> Vec<(PathBuf, &'static CacheRule)> {
        let mut found = Vec::new();
        let mut walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(MAX_DEPTH)
            .follow_links(false)
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!("Walk error: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if (entry.depth() == 1 && SKIP_TOP_LEVEL.contains(&&*name)) || name == ".git" {
                walker.skip_current_dir();
                continue;
            }
            if !is_cache_name(&name) {
                continue;
            }

            // Whether or not it belongs to a project, never walk inside a cache.
            walker.skip_current_dir();
            match matching_rule(entry.path(), &name) {
                Some(rule) => found.push((entry.path().to_path_buf(), rule)),
                None => tracing::trace!("No project marker next to {}", entry.path().display()),
            }
        }
        found
    }

    fn measure(found: &[(PathBuf, &'static CacheRule)]) -> Vec<CleanableItem> {
        found
            .par_iter()
            .map(|(path, rule)| {
                let (size, file_count) = utils::size_and_count(path);
                let mut item = CleanableItem::new(path.clone(), size);
                item.file_count = file_count;
                item.is_directory = true;
                item.modified_at = modified(path);
                item.name = display_name(path);
                tracing::trace!("{} cache {} is {size} bytes", rule.tool, path.display());
                item
            })
            .collect()
    }
}

fn modified(path: &Path) -> SystemTime {
    path.metadata()
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// `project/cache_dir`, which reads better than the bare cache name.
fn display_name(path: &Path) -> String {
    let file = path.file_name().map(|n| n.to_string_lossy().into_owned());
    let parent = path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned());
    match (parent, file) {
        (Some(parent), Some(file)) => format!("{parent}/{file}"),
        (None, Some(file)) => file,
        _ => path.display().to_string(),
    }
}

impl Target for ProjectCacheTarget {
    fn category(&self) -> &Category {
        &self.category
    }

    fn is_available(&self) -> bool {
        self.root.is_dir()
    }

    fn scan(&self) -> Result<ScanResult, ScanError> {
        if let Err(source) = std::fs::read_dir(&self.root) {
            return Err(ScanError::Unreadable {
                path: self.root.clone(),
                source,
            });
        }

        let mut found = self.find_caches();
        if self.stale_days > 0 {
            let cutoff = days_ago(self.stale_days);
            found.retain(|(path, _)| modified(path) < cutoff);
        }

        let mut items = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
        {
            Ok(pool) => pool.install(|| Self::measure(&found)),
            Err(e) => {
                tracing::warn!("Could not start size workers, using the shared pool: {e}");
                Self::measure(&found)
            }
        };
        items.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::debug!("Found {} stale project caches under {}", items.len(), self.root.display());
        Ok(ScanResult::new(self.category.clone(), items))
    }

    fn as_builtin(&self) -> Option<&dyn BuiltinCleaner> {
        Some(self)
    }
}

impl BuiltinCleaner for ProjectCacheTarget {
    fn clean(&self, items: &[CleanableItem]) -> CleanResult {
        trash_items(self.platform.trash.as_ref(), &self.category, items)
    }
}
