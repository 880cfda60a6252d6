use crate::config::Category;
use crate::error::ScanError;
use crate::platform::Platform;
use crate::target::{BuiltinCleaner, Target};
use crate::types::{CleanResult, CleanableItem, ScanResult};

use super::path::PathTarget;
use super::{days_ago, trash_items};

/// Used when the catalog entry has no `days_old`.
pub const DEFAULT_DAYS_OLD: u32 = 30;

/// Files in the download folders nobody touched for a while.
pub struct OldDownloadsTarget {
    inner: PathTarget,
    days_old: u32,
}

impl OldDownloadsTarget {
    pub fn new(category: Category, platform: Platform) -> Self {
        let days_old = category
            .days_old
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_DAYS_OLD);
        Self {
            inner: PathTarget::new(category, platform),
            days_old,
        }
    }
}

impl Target for OldDownloadsTarget {
    fn category(&self) -> &Category {
        self.inner.category()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn scan(&self) -> Result<ScanResult, ScanError> {
        let cutoff = days_ago(self.days_old);
        let mut items = self.inner.collect_items()?;
        items.retain(|item| item.modified_at < cutoff);

        let mut result = ScanResult::new(self.category().clone(), items);
        result.sort_largest_first();
        Ok(result)
    }

    fn as_builtin(&self) -> Option<&dyn BuiltinCleaner> {
        Some(self)
    }
}

impl BuiltinCleaner for OldDownloadsTarget {
    fn clean(&self, items: &[CleanableItem]) -> CleanResult {
        trash_items(
            self.inner.platform().trash.as_ref(),
            self.category(),
            items,
        )
    }
}
