//! Turns scan results into clean jobs and runs them one after another.
//!
//! Progress is reported through [`CleanCallbacks`]. Within a job the event
//! order is fixed per method:
//!
//! - builtin: one progress event with an empty item name, no item events
//! - trash: per batch, a progress event, one item event per item, then a
//!   closing progress event
//! - permanent: a progress event then an item event, per item
//!
//! A category-done event closes every job.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{Category, Method};
use crate::executor::Executor;
use crate::types::{CleanResult, CleanableItem, ItemError, ItemStatus, Report, ScanResult};

/// Items handed to the Trash in one request.
pub const TRASH_BATCH_SIZE: usize = 50;

const SIP_REASON: &str = "protected by System Integrity Protection";

/// One category and the items to clean for it.
#[derive(Debug, Clone)]
pub struct CleanJob {
    pub category: Category,
    pub items: Vec<CleanableItem>,
}

/// Build the jobs for the selected categories.
///
/// With a non-empty `order` the jobs follow it and ids missing from it are
/// ignored; otherwise they follow the selection map. Manual categories,
/// locked items, excluded items and jobs left with nothing to do are dropped.
pub fn prepare_jobs(
    results: &HashMap<String, ScanResult>,
    selected: &BTreeMap<String, bool>,
    excluded: &HashMap<String, HashSet<PathBuf>>,
    order: &[String],
) -> Vec<CleanJob> {
    let ids: Vec<&String> = if order.is_empty() {
        selected.keys().collect()
    } else {
        order.iter().collect()
    };

    let mut seen = HashSet::new();
    let mut jobs = Vec::new();
    for id in ids {
        if !selected.get(id).copied().unwrap_or(false) || !seen.insert(id) {
            continue;
        }
        let Some(result) = results.get(id) else {
            continue;
        };
        if result.category.method == Method::Manual {
            continue;
        }

        let excluded_here = excluded.get(id);
        let items: Vec<CleanableItem> = result
            .items
            .iter()
            .filter(|item| item.status != ItemStatus::ProcessLocked)
            .filter(|item| !excluded_here.is_some_and(|set| set.contains(&item.path)))
            .cloned()
            .collect();
        if items.is_empty() {
            continue;
        }
        jobs.push(CleanJob {
            category: result.category.clone(),
            items,
        });
    }
    jobs
}

#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub category: &'a str,
    /// Name of the item being worked on; empty for builtin jobs.
    pub item: &'a str,
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ItemDone<'a> {
    pub path: &'a Path,
    pub name: &'a str,
    pub size: u64,
    pub success: bool,
    pub error: Option<&'a str>,
}

#[derive(Debug, Clone, Copy)]
pub struct CategoryDone<'a> {
    pub category: &'a str,
    pub freed_space: u64,
    pub cleaned_items: usize,
    pub error_count: usize,
}

/// Progress hooks. Each one is optional; `None` means not interested.
#[derive(Default)]
pub struct CleanCallbacks<'a> {
    pub on_progress: Option<Box<dyn FnMut(&Progress<'_>) + 'a>>,
    pub on_item_done: Option<Box<dyn FnMut(&ItemDone<'_>) + 'a>>,
    pub on_category_done: Option<Box<dyn FnMut(&CategoryDone<'_>) + 'a>>,
}

impl<'a> CleanCallbacks<'a> {
    pub fn on_progress(mut self, f: impl FnMut(&Progress<'_>) + 'a) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn on_item_done(mut self, f: impl FnMut(&ItemDone<'_>) + 'a) -> Self {
        self.on_item_done = Some(Box::new(f));
        self
    }

    pub fn on_category_done(mut self, f: impl FnMut(&CategoryDone<'_>) + 'a) -> Self {
        self.on_category_done = Some(Box::new(f));
        self
    }

    fn progress(&mut self, event: Progress<'_>) {
        if let Some(f) = self.on_progress.as_mut() {
            f(&event);
        }
    }

    fn item_done(&mut self, event: ItemDone<'_>) {
        if let Some(f) = self.on_item_done.as_mut() {
            f(&event);
        }
    }

    fn category_done(&mut self, event: CategoryDone<'_>) {
        if let Some(f) = self.on_category_done.as_mut() {
            f(&event);
        }
    }
}

/// The item-level outcome of `path` inside `result`.
fn item_outcome<'r>(result: &'r CleanResult, path: &Path) -> (bool, Option<&'r str>) {
    if let Some(error) = result.error_for(path) {
        (false, Some(error.reason.as_str()))
    } else if result.skipped_paths.iter().any(|p| p == path) {
        (false, Some(SIP_REASON))
    } else if let Some(error) = result.errors.iter().find(|e| e.path.is_none()) {
        (false, Some(error.reason.as_str()))
    } else {
        (true, None)
    }
}

/// Runs clean jobs sequentially through an [`Executor`].
pub struct CleanService {
    executor: Executor,
}

impl CleanService {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub fn clean(&self, jobs: &[CleanJob], callbacks: &mut CleanCallbacks<'_>) -> Report {
        let started = Instant::now();
        let total: usize = jobs.iter().map(|j| j.items.len()).sum();
        let mut current = 0;
        let mut results = Vec::with_capacity(jobs.len());

        for job in jobs {
            let category = &job.category;
            tracing::info!(
                "Cleaning {} ({} items, {})",
                category.id,
                job.items.len(),
                category.method
            );
            let result = match category.method {
                Method::Builtin => self.run_builtin(job, &mut current, total, callbacks),
                Method::Trash => self.run_trash(job, &mut current, total, callbacks),
                Method::Permanent => self.run_permanent(job, &mut current, total, callbacks),
                Method::Manual => CleanResult::with_error(
                    category.clone(),
                    ItemError::job(format!("unsupported method: {}", category.method)),
                ),
            };

            tracing::info!(
                "{}: cleaned {}, freed {} bytes, {} errors",
                category.id,
                result.cleaned_items,
                result.freed_space,
                result.errors.len()
            );
            callbacks.category_done(CategoryDone {
                category: &category.name,
                freed_space: result.freed_space,
                cleaned_items: result.cleaned_items,
                error_count: result.errors.len(),
            });
            results.push(result);
        }

        Report::from_results(results, started.elapsed())
    }

    fn run_builtin(
        &self,
        job: &CleanJob,
        current: &mut usize,
        total: usize,
        callbacks: &mut CleanCallbacks<'_>,
    ) -> CleanResult {
        callbacks.progress(Progress {
            category: &job.category.name,
            item: "",
            current: *current,
            total,
        });
        let result = self.executor.clean(&job.category, &job.items);
        *current += job.items.len();
        result
    }

    fn run_trash(
        &self,
        job: &CleanJob,
        current: &mut usize,
        total: usize,
        callbacks: &mut CleanCallbacks<'_>,
    ) -> CleanResult {
        let mut result = CleanResult::new(job.category.clone());
        for batch in job.items.chunks(TRASH_BATCH_SIZE) {
            let (Some(first), Some(last)) = (batch.first(), batch.last()) else {
                continue;
            };
            callbacks.progress(Progress {
                category: &job.category.name,
                item: &first.name,
                current: *current,
                total,
            });

            let outcome = self.executor.clean(&job.category, batch);
            for item in batch {
                let (success, error) = item_outcome(&outcome, &item.path);
                callbacks.item_done(ItemDone {
                    path: &item.path,
                    name: &item.name,
                    size: item.size,
                    success,
                    error,
                });
            }

            *current += batch.len();
            callbacks.progress(Progress {
                category: &job.category.name,
                item: &last.name,
                current: *current,
                total,
            });
            result.merge(outcome);
        }
        result
    }

    fn run_permanent(
        &self,
        job: &CleanJob,
        current: &mut usize,
        total: usize,
        callbacks: &mut CleanCallbacks<'_>,
    ) -> CleanResult {
        let mut result = CleanResult::new(job.category.clone());
        for item in &job.items {
            *current += 1;
            callbacks.progress(Progress {
                category: &job.category.name,
                item: &item.name,
                current: *current,
                total,
            });

            let outcome = self.executor.clean(&job.category, std::slice::from_ref(item));
            let (success, error) = item_outcome(&outcome, &item.path);
            callbacks.item_done(ItemDone {
                path: &item.path,
                name: &item.name,
                size: item.size,
                success,
                error,
            });
            result.merge(outcome);
        }
        result
    }
}
