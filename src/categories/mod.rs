pub mod docker;
pub mod homebrew;
pub mod old_downloads;
pub mod path;
pub mod project_cache;
pub mod system_cache;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub use docker::DockerTarget;
pub use homebrew::HomebrewTarget;
pub use old_downloads::OldDownloadsTarget;
pub use path::PathTarget;
pub use project_cache::ProjectCacheTarget;
pub use system_cache::SystemCacheTarget;

use crate::config::Category;
use crate::platform::Trash;
use crate::types::{CleanResult, CleanableItem, ItemError};

/// Now minus `days` whole days.
pub(crate) fn days_ago(days: u32) -> SystemTime {
    SystemTime::now()
        .checked_sub(Duration::from_secs(u64::from(days) * 86_400))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Move `items` to the Trash in one request and account for the outcome.
pub fn trash_items(trash: &dyn Trash, category: &Category, items: &[CleanableItem]) -> CleanResult {
    let mut result = CleanResult::new(category.clone());
    if items.is_empty() {
        return result;
    }

    let paths: Vec<PathBuf> = items.iter().map(|i| i.path.clone()).collect();
    let outcome = trash.move_to_trash(&paths);
    let succeeded: HashSet<&Path> = outcome.succeeded.iter().map(PathBuf::as_path).collect();

    for item in items {
        if succeeded.contains(item.path.as_path()) {
            result.cleaned_items += 1;
            result.freed_space += item.size;
        } else {
            let reason = outcome
                .failed
                .get(&item.path)
                .cloned()
                .unwrap_or_else(|| "not moved to Trash".to_string());
            result.errors.push(ItemError::for_path(&item.path, reason));
        }
    }

    tracing::debug!(
        "{}: trashed {} of {} items",
        category.id,
        result.cleaned_items,
        items.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Method;
    use crate::platform::testing::StubTrash;

    #[test]
    fn trash_items_accounts_for_each_path() {
        let trash = StubTrash::failing("/b", "busy");
        let cat = Category::new("c", "C", Method::Trash);
        let items = vec![
            CleanableItem::new("/a", 100),
            CleanableItem::new("/b", 200),
            CleanableItem::new("/c", 300),
        ];

        let result = trash_items(&trash, &cat, &items);
        assert_eq!(result.cleaned_items, 2);
        assert_eq!(result.freed_space, 400);
        assert_eq!(result.errors, vec![ItemError::for_path("/b", "busy")]);
        assert_eq!(trash.requests().len(), 1);
    }

    #[test]
    fn empty_input_makes_no_request() {
        let trash = StubTrash::default();
        let result = trash_items(&trash, &Category::new("c", "C", Method::Trash), &[]);
        assert_eq!(result.cleaned_items, 0);
        assert!(trash.requests().is_empty());
    }

    #[test]
    fn days_ago_moves_backwards() {
        assert!(days_ago(1) < SystemTime::now());
        assert!(days_ago(0) <= SystemTime::now());
    }
}
