//! Values that flow between targets, the executor and the caller.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::config::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemStatus {
    #[default]
    Available,
    /// Some process holds a file open underneath this item.
    ProcessLocked,
}

/// One candidate unit for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanableItem {
    /// Absolute path, or a synthetic `docker:<type>` path.
    pub path: PathBuf,
    pub size: u64,
    pub file_count: u64,
    pub name: String,
    pub is_directory: bool,
    pub modified_at: SystemTime,
    pub status: ItemStatus,
}

impl CleanableItem {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            size,
            file_count: 1,
            name,
            is_directory: false,
            modified_at: SystemTime::UNIX_EPOCH,
            status: ItemStatus::Available,
        }
    }
}

/// Output of scanning one category.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub category: Category,
    pub items: Vec<CleanableItem>,
    pub total_size: u64,
    pub total_file_count: u64,
    pub error: Option<String>,
}

impl ScanResult {
    /// Build a result whose totals are derived from `items`.
    pub fn new(category: Category, items: Vec<CleanableItem>) -> Self {
        let total_size = items.iter().fold(0u64, |acc, i| acc.saturating_add(i.size));
        let total_file_count = items
            .iter()
            .fold(0u64, |acc, i| acc.saturating_add(i.file_count));
        Self {
            category,
            items,
            total_size,
            total_file_count,
            error: None,
        }
    }

    pub fn failed(category: Category, error: impl Into<String>) -> Self {
        let mut result = Self::new(category, Vec::new());
        result.error = Some(error.into());
        result
    }

    /// Docker reports resource counts rather than files in `file_count`.
    pub fn counts_files(&self) -> bool {
        !self
            .items
            .iter()
            .any(|i| i.path.to_str().is_some_and(|p| p.starts_with("docker:")))
    }

    /// Largest first, ties broken by path so the order is stable.
    pub fn sort_largest_first(&mut self) {
        self.items
            .sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
    }
}

/// One failed path, or a job-level failure when `path` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    pub path: Option<PathBuf>,
    pub reason: String,
}

impl ItemError {
    pub fn for_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            reason: reason.into(),
        }
    }

    pub fn job(reason: impl Into<String>) -> Self {
        Self {
            path: None,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

/// Output of cleaning one category.
#[derive(Debug, Clone)]
pub struct CleanResult {
    pub category: Category,
    pub cleaned_items: usize,
    pub skipped_items: usize,
    /// Items skipped by path (SIP-protected). Manual skips have no entries here.
    pub skipped_paths: Vec<PathBuf>,
    pub freed_space: u64,
    pub errors: Vec<ItemError>,
}

impl CleanResult {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            cleaned_items: 0,
            skipped_items: 0,
            skipped_paths: Vec::new(),
            freed_space: 0,
            errors: Vec::new(),
        }
    }

    pub fn with_error(category: Category, error: ItemError) -> Self {
        let mut result = Self::new(category);
        result.errors.push(error);
        result
    }

    pub fn merge(&mut self, other: CleanResult) {
        self.cleaned_items += other.cleaned_items;
        self.skipped_items += other.skipped_items;
        self.skipped_paths.extend(other.skipped_paths);
        self.freed_space += other.freed_space;
        self.errors.extend(other.errors);
    }

    pub fn error_for(&self, path: &std::path::Path) -> Option<&ItemError> {
        self.errors.iter().find(|e| e.path.as_deref() == Some(path))
    }
}

/// Aggregate of a whole clean run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub freed_space: u64,
    pub cleaned_items: usize,
    pub failed_items: usize,
    pub results: Vec<CleanResult>,
    pub duration: Duration,
}

impl Report {
    pub fn from_results(results: Vec<CleanResult>, duration: Duration) -> Self {
        Self {
            freed_space: results.iter().map(|r| r.freed_space).sum(),
            cleaned_items: results.iter().map(|r| r.cleaned_items).sum(),
            failed_items: results.iter().map(|r| r.errors.len()).sum(),
            results,
            duration,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.failed_items > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Method;

    fn cat() -> Category {
        Category::new("cat1", "Test", Method::Trash)
    }

    #[test]
    fn scan_result_totals_match_items() {
        let mut a = CleanableItem::new("/a", 100);
        a.file_count = 4;
        let b = CleanableItem::new("/b", 250);
        let result = ScanResult::new(cat(), vec![a, b]);
        assert_eq!(result.total_size, 350);
        assert_eq!(result.total_file_count, 5);
    }

    #[test]
    fn docker_results_do_not_count_files() {
        let docker = ScanResult::new(cat(), vec![CleanableItem::new("docker:images", 10)]);
        assert!(!docker.counts_files());

        let files = ScanResult::new(cat(), vec![CleanableItem::new("/docker/images", 10)]);
        assert!(files.counts_files());
    }

    #[test]
    fn totals_saturate_instead_of_overflowing() {
        let result = ScanResult::new(
            cat(),
            vec![CleanableItem::new("/a", u64::MAX), CleanableItem::new("/b", 5)],
        );
        assert_eq!(result.total_size, u64::MAX);
    }

    #[test]
    fn merge_sums_counters_and_concatenates_errors() {
        let mut left = CleanResult::new(cat());
        left.cleaned_items = 2;
        left.freed_space = 300;
        left.errors.push(ItemError::for_path("/x", "busy"));

        let mut right = CleanResult::new(cat());
        right.cleaned_items = 1;
        right.skipped_items = 1;
        right.freed_space = 50;
        right.errors.push(ItemError::job("boom"));

        left.merge(right);
        assert_eq!(left.cleaned_items, 3);
        assert_eq!(left.skipped_items, 1);
        assert_eq!(left.freed_space, 350);
        assert_eq!(left.errors.len(), 2);
    }

    #[test]
    fn item_error_display_uses_path_prefix() {
        assert_eq!(ItemError::for_path("/a/b", "busy").to_string(), "/a/b: busy");
        assert_eq!(ItemError::job("unsupported method: manual").to_string(), "unsupported method: manual");
    }

    #[test]
    fn largest_first_sort_is_stable_on_ties() {
        let mut result = ScanResult::new(
            cat(),
            vec![
                CleanableItem::new("/b", 10),
                CleanableItem::new("/a", 10),
                CleanableItem::new("/c", 99),
            ],
        );
        result.sort_largest_first();
        let paths: Vec<_> = result.items.iter().map(|i| i.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/c"), PathBuf::from("/a"), PathBuf::from("/b")]);
    }
}
