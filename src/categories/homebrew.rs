use std::path::PathBuf;
use std::time::Duration;

use crate::config::Category;
use crate::error::{PlatformError, ScanError};
use crate::platform::{self, Platform};
use crate::target::{BuiltinCleaner, Target};
use crate::types::{CleanResult, CleanableItem, ItemError, ScanResult};

use super::path::item_for;
use super::trash_items;

const QUERY_TIMEOUT: Duration = Duration::from_secs(30);
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(600);

pub struct HomebrewTarget {
    category: Category,
    platform: Platform,
}

impl HomebrewTarget {
    pub fn new(category: Category, platform: Platform) -> Self {
        Self { category, platform }
    }

    /// Ask brew where its download cache lives.
    fn cache_dir(&self) -> Result<PathBuf, PlatformError> {
        let output =
            platform::run_checked(self.platform.runner.as_ref(), "brew", &["--cache"], QUERY_TIMEOUT)?;
        Ok(PathBuf::from(output.stdout.trim()))
    }
}

impl Target for HomebrewTarget {
    fn category(&self) -> &Category {
        &self.category
    }

    fn is_available(&self) -> bool {
        self.platform.runner.exists("brew")
    }

    fn scan(&self) -> Result<ScanResult, ScanError> {
        let cache = self.cache_dir()?;
        if cache.as_os_str().is_empty() {
            return Err(ScanError::Output {
                tool: "brew",
                message: "empty cache path".to_string(),
            });
        }

        let meta = std::fs::metadata(&cache).map_err(|source| ScanError::Unreadable {
            path: cache.clone(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(ScanError::Output {
                tool: "brew",
                message: format!("{} is not a directory", cache.display()),
            });
        }

        let items = item_for(&cache)
            .map(|mut item| {
                item.name = "Homebrew Cache".to_string();
                vec![item]
            })
            .unwrap_or_default();
        Ok(ScanResult::new(self.category.clone(), items))
    }

    fn as_builtin(&self) -> Option<&dyn BuiltinCleaner> {
        Some(self)
    }
}

impl BuiltinCleaner for HomebrewTarget {
    fn clean(&self, items: &[CleanableItem]) -> CleanResult {
        if let Err(e) = platform::run_checked(
            self.platform.runner.as_ref(),
            "brew",
            &["cleanup", "--prune=all", "-s"],
            CLEANUP_TIMEOUT,
        ) {
            tracing::warn!("brew cleanup failed, trashing the cache anyway: {e}");
        }

        let cache = match self.cache_dir() {
            Ok(cache) => cache,
            Err(e) => {
                return CleanResult::with_error(
                    self.category.clone(),
                    ItemError::job(format!("cannot locate Homebrew cache: {e}")),
                )
            }
        };

        let (inside, foreign): (Vec<CleanableItem>, Vec<CleanableItem>) = items
            .iter()
            .cloned()
            .partition(|item| item.path.starts_with(&cache));

        let mut result = trash_items(self.platform.trash.as_ref(), &self.category, &inside);
        for item in foreign {
            result.errors.push(ItemError::for_path(
                item.path,
                "outside the Homebrew cache, refusing to touch it",
            ));
        }
        result
    }
}
