use std::sync::Arc;

use crate::categories::trash_items;
use crate::config::{Category, Method};
use crate::platform::{self, Trash};
use crate::registry::Registry;
use crate::types::{CleanResult, CleanableItem, ItemError};
use crate::utils;

/// Runs one category's cleanup with the strategy its `method` names.
pub struct Executor {
    registry: Arc<Registry>,
    trash: Arc<dyn Trash>,
}

impl Executor {
    pub fn new(registry: Arc<Registry>, trash: Arc<dyn Trash>) -> Self {
        Self { registry, trash }
    }

    pub fn clean(&self, category: &Category, items: &[CleanableItem]) -> CleanResult {
        match category.method {
            Method::Trash => self.trash(category, items),
            Method::Permanent => Self::remove(category, items),
            Method::Builtin => self.builtin(category, items),
            Method::Manual => {
                let mut result = CleanResult::new(category.clone());
                result.skipped_items = items.len();
                result
            }
        }
    }

    fn trash(&self, category: &Category, items: &[CleanableItem]) -> CleanResult {
        let (allowed, protected) = split_protected(items);
        let mut result = trash_items(self.trash.as_ref(), category, &allowed);
        record_protected(&mut result, &protected);
        result
    }

    fn remove(category: &Category, items: &[CleanableItem]) -> CleanResult {
        let (allowed, protected) = split_protected(items);
        let mut result = CleanResult::new(category.clone());
        record_protected(&mut result, &protected);

        for item in &allowed {
            match utils::safe_remove(&item.path) {
                Ok(_) => {
                    result.cleaned_items += 1;
                    result.freed_space += item.size;
                }
                Err(e) => {
                    tracing::debug!("Failed to remove {}: {e}", item.path.display());
                    result.errors.push(ItemError::for_path(&item.path, e.to_string()));
                }
            }
        }
        result
    }

    fn builtin(&self, category: &Category, items: &[CleanableItem]) -> CleanResult {
        match self.registry.get(&category.id).and_then(|t| t.as_builtin()) {
            Some(cleaner) => cleaner.clean(items),
            None => CleanResult::with_error(
                category.clone(),
                ItemError::job(format!("no builtin cleaner registered for {}", category.id)),
            ),
        }
    }
}

fn split_protected(items: &[CleanableItem]) -> (Vec<CleanableItem>, Vec<CleanableItem>) {
    items
        .iter()
        .cloned()
        .partition(|item| !platform::is_sip_protected(&item.path))
}

fn record_protected(result: &mut CleanResult, protected: &[CleanableItem]) {
    for item in protected {
        tracing::warn!("Skipping SIP-protected {}", item.path.display());
        result.skipped_paths.push(item.path.clone());
    }
    result.skipped_items += protected.len();
}
