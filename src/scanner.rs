use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::registry::Registry;
use crate::target::Target;
use crate::types::ScanResult;

/// Reported once per finished target.
#[derive(Debug, Clone)]
pub struct ScanEvent<'a> {
    pub category_id: &'a str,
    pub category_name: &'a str,
    pub completed: usize,
    pub total: usize,
    pub error: Option<&'a str>,
}

/// Aggregated output of one scan pass.
#[derive(Debug, Default)]
pub struct ScanSummary {
    pub results: HashMap<String, ScanResult>,
    /// `(category id, message)` for every target whose scan failed.
    pub errors: Vec<(String, String)>,
    pub total_size: u64,
    pub total_items: usize,
}

impl ScanSummary {
    fn record(&mut self, result: ScanResult) {
        let id = result.category.id.clone();
        if let Some(error) = &result.error {
            self.errors.push((id.clone(), error.clone()));
        }
        self.total_size = self.total_size.saturating_add(result.total_size);
        self.total_items += result.items.len();
        self.results.insert(id, result);
    }
}

/// Poisoning is ignored so a finished result is never dropped.
fn lock(summary: &Mutex<ScanSummary>) -> MutexGuard<'_, ScanSummary> {
    summary.lock().unwrap_or_else(PoisonError::into_inner)
}

fn scan_one(target: &dyn Target) -> ScanResult {
    let category = target.category();
    tracing::debug!("Scanning {}", category.id);
    match target.scan() {
        Ok(result) => {
            tracing::debug!(
                "{}: {} items, {} bytes",
                category.id,
                result.items.len(),
                result.total_size
            );
            result
        }
        Err(e) => {
            tracing::warn!("Scan of {} failed: {e}", category.id);
            ScanResult::failed(category.clone(), e.to_string())
        }
    }
}

/// Scan every target in parallel. One failing target never fails the pass.
///
/// `on_done` runs on whichever worker finished the target, in completion order.
pub fn scan_targets(
    targets: &[&dyn Target],
    on_done: impl Fn(&ScanEvent<'_>) + Send + Sync,
) -> ScanSummary {
    let total = targets.len();
    let completed = AtomicUsize::new(0);
    let summary = Mutex::new(ScanSummary::default());

    targets.par_iter().for_each(|target| {
        let result = scan_one(*target);
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        on_done(&ScanEvent {
            category_id: &result.category.id,
            category_name: &result.category.name,
            completed: done,
            total,
            error: result.error.as_deref(),
        });
        lock(&summary).record(result);
    });

    summary.into_inner().unwrap_or_else(PoisonError::into_inner)
}

/// Scan only the targets that report themselves available.
pub fn scan_available(
    registry: &Registry,
    on_done: impl Fn(&ScanEvent<'_>) + Send + Sync,
) -> ScanSummary {
    let targets = registry.available();
    tracing::info!("Scanning {} available targets", targets.len());
    scan_targets(&targets, on_done)
}

/// Scan the available targets among `ids`, or every available target when `ids` is empty.
/// Unknown ids are ignored.
pub fn scan_selected(
    registry: &Registry,
    ids: &[String],
    on_done: impl Fn(&ScanEvent<'_>) + Send + Sync,
) -> ScanSummary {
    if ids.is_empty() {
        return scan_available(registry, on_done);
    }
    let targets: Vec<&dyn Target> = registry
        .available()
        .into_iter()
        .filter(|t| ids.iter().any(|id| *id == t.category().id))
        .collect();
    tracing::info!("Scanning {} selected targets", targets.len());
    scan_targets(&targets, on_done)
}
