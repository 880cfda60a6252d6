use std::path::{Path, PathBuf};

use crate::config::Category;
use crate::error::ScanError;
use crate::platform::{self, Platform};
use crate::target::Target;
use crate::types::{ItemStatus, ScanResult};
use crate::utils;

use super::path::PathTarget;

/// `~/Library/Caches` minus everything another category already claims,
/// with items in use by a running process flagged.
pub struct SystemCacheTarget {
    inner: PathTarget,
    /// Canonical prefixes, each ending in `/`.
    excludes: Vec<String>,
}

impl SystemCacheTarget {
    /// `other_patterns` are the path patterns of every other category.
    pub fn new(category: Category, platform: Platform, other_patterns: &[String]) -> Self {
        let excludes = other_patterns
            .iter()
            .map(|pattern| {
                let base = utils::expand_tilde(utils::pattern_base(pattern), &platform.home);
                with_trailing_slash(&base)
            })
            .collect();
        Self {
            inner: PathTarget::new(category, platform),
            excludes,
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let candidate = with_trailing_slash(path);
        self.excludes.iter().any(|prefix| candidate.starts_with(prefix.as_str()))
    }

    fn lock_base(&self) -> Option<PathBuf> {
        let pattern = self.inner.category().paths.first()?;
        Some(utils::expand_tilde(
            utils::pattern_base(pattern),
            &self.inner.platform().home,
        ))
    }
}

fn with_trailing_slash(path: &Path) -> String {
    let mut text = path.to_string_lossy().into_owned();
    if !text.ends_with('/') {
        text.push('/');
    }
    text
}

impl Target for SystemCacheTarget {
    fn category(&self) -> &Category {
        self.inner.category()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn scan(&self) -> Result<ScanResult, ScanError> {
        let mut items = self.inner.collect_items()?;
        items.retain(|item| !self.is_excluded(&item.path));

        if let Some(base) = self.lock_base() {
            match platform::detect_locked(self.inner.platform().runner.as_ref(), &base) {
                Ok(locked) => {
                    for item in items.iter_mut().filter(|i| locked.contains(&i.path)) {
                        item.status = ItemStatus::ProcessLocked;
                    }
                }
                Err(e) => tracing::warn!("Lock detection under {} failed: {e}", base.display()),
            }
        }

        let mut result = ScanResult::new(self.category().clone(), items);
        result.sort_largest_first();
        Ok(result)
    }
}
