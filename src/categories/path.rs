use std::collections::HashSet;
use std::path::Path;
use std::time::SystemTime;

use crate::config::Category;
use crate::error::ScanError;
use crate::platform::{self, Platform};
use crate::target::Target;
use crate::types::{CleanableItem, ScanResult};
use crate::utils;

use super::days_ago;

/// Scans the glob patterns of a category. The workhorse behind most of the catalog.
pub struct PathTarget {
    category: Category,
    platform: Platform,
}

impl PathTarget {
    pub fn new(category: Category, platform: Platform) -> Self {
        Self { category, platform }
    }

    pub(crate) fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Every existing, non-protected match of the category patterns, filtered by
    /// `days_old` when set. Per-entry failures are skipped, not reported.
    pub(crate) fn collect_items(&self) -> Result<Vec<CleanableItem>, ScanError> {
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for pattern in &self.category.paths {
            for path in utils::expand_pattern(pattern, &self.platform.home)? {
                if !seen.insert(path.clone()) {
                    continue;
                }
                if platform::is_sip_protected(&path) {
                    tracing::debug!("Skipping SIP-protected {}", path.display());
                    continue;
                }
                if let Some(item) = item_for(&path) {
                    items.push(item);
                }
            }
        }

        if let Some(days) = self.category.days_old.filter(|d| *d > 0) {
            let cutoff = days_ago(days);
            items.retain(|item| item.modified_at < cutoff);
        }
        Ok(items)
    }
}

/// Stat `path` into an item. `None` when it vanished or cannot be read.
pub(crate) fn item_for(path: &Path) -> Option<CleanableItem> {
    let meta = match path.symlink_metadata() {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!("Cannot stat {}: {e}", path.display());
            return None;
        }
    };
    let (size, file_count) = utils::size_and_count(path);

    let mut item = CleanableItem::new(path, size);
    item.file_count = file_count;
    item.is_directory = meta.is_dir();
    item.modified_at = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    Some(item)
}

impl Target for PathTarget {
    fn category(&self) -> &Category {
        &self.category
    }

    fn is_available(&self) -> bool {
        if let Some(cmd) = &self.category.check_cmd {
            return self.platform.runner.exists(cmd);
        }
        self.category.paths.iter().any(|pattern| {
            utils::expand_pattern(pattern, &self.platform.home)
                .map(|found| !found.is_empty())
                .unwrap_or(false)
        })
    }

    fn scan(&self) -> Result<ScanResult, ScanError> {
        let items = self.collect_items()?;
        let mut result = ScanResult::new(self.category.clone(), items);
        result.sort_largest_first();
        tracing::debug!(
            "{}: {} items, {} bytes",
            self.category.id,
            result.items.len(),
            result.total_size
        );
        Ok(result)
    }
}
