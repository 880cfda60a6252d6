//! Non-interactive cleaning: pick categories, scan them, plan and clean.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, Method, Safety};
use crate::error::RunnerError;
use crate::executor::Executor;
use crate::platform::{FinderTrash, SystemRunner, Trash};
use crate::registry::Registry;
use crate::scanner;
use crate::service::{prepare_jobs, CleanCallbacks, CleanJob, CleanService};
use crate::target::Target;
use crate::types::{CleanResult, Report, ScanResult};
use crate::user_config::UserConfig;

/// What a run produced. Warnings never make the run fail.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub warnings: Vec<String>,
    pub dry_run: bool,
}

#[derive(Default)]
pub struct RunnerBuilder {
    config: Option<Config>,
    registry: Option<Arc<Registry>>,
    user_config: Option<UserConfig>,
    trash: Option<Arc<dyn Trash>>,
    targets: Vec<String>,
}

impl RunnerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn user_config(mut self, user_config: UserConfig) -> Self {
        self.user_config = Some(user_config);
        self
    }

    /// Where trash-method items go. Defaults to Finder.
    pub fn trash(mut self, trash: Arc<dyn Trash>) -> Self {
        self.trash = Some(trash);
        self
    }

    /// Category ids that replace the user config's `selected_targets`.
    pub fn targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<Runner, RunnerError> {
        let config = self.config.ok_or(RunnerError::MissingConfig)?;
        let registry = self.registry.ok_or(RunnerError::MissingRegistry)?;
        let user_config = self.user_config.ok_or(RunnerError::MissingUserConfig)?;
        let trash = self
            .trash
            .unwrap_or_else(|| Arc::new(FinderTrash::new(Arc::new(SystemRunner))));
        Ok(Runner {
            config,
            registry,
            user_config,
            trash,
            targets: self.targets,
        })
    }
}

pub struct Runner {
    config: Config,
    registry: Arc<Registry>,
    user_config: UserConfig,
    trash: Arc<dyn Trash>,
    targets: Vec<String>,
}

impl Runner {
    pub fn builder() -> RunnerBuilder {
        RunnerBuilder::new()
    }

    /// Ids to clean, in the order they were asked for.
    fn selection(&self) -> Vec<&str> {
        let source = if self.targets.is_empty() {
            &self.user_config.selected_targets
        } else {
            &self.targets
        };
        let mut seen = HashSet::new();
        source
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Selected ids the runner may clean on its own, plus why the rest were dropped.
    fn eligible(&self, warnings: &mut Vec<String>) -> Result<Vec<&str>, RunnerError> {
        let selection = self.selection();
        if selection.is_empty() {
            return Err(RunnerError::NoSelection);
        }

        let mut eligible = Vec::new();
        for id in selection {
            let Some(category) = self.config.category(id) else {
                warnings.push(format!("Unknown target '{id}', skipping"));
                continue;
            };
            if category.safety == Safety::Risky {
                warnings.push(format!("Skipping {id}: risky targets are never cleaned automatically"));
                continue;
            }
            if category.method == Method::Manual {
                warnings.push(format!("Skipping {id}: requires manual cleanup"));
                continue;
            }
            eligible.push(id);
        }

        if eligible.is_empty() {
            return Err(RunnerError::NoEligibleTargets);
        }
        Ok(eligible)
    }

    pub fn run(
        &self,
        dry_run: bool,
        callbacks: &mut CleanCallbacks<'_>,
    ) -> Result<RunOutcome, RunnerError> {
        let started = Instant::now();
        let mut warnings = Vec::new();
        let eligible = self.eligible(&mut warnings)?;

        let mut targets: Vec<&dyn Target> = Vec::new();
        for id in &eligible {
            match self.registry.get(id) {
                Some(target) if target.is_available() => targets.push(target),
                Some(_) => warnings.push(format!("{id} is not available on this system")),
                None => warnings.push(format!("No target registered for {id}")),
            }
        }

        let summary = scanner::scan_targets(&targets, |_| {});
        let mut results: HashMap<String, ScanResult> = HashMap::new();
        let mut order = Vec::new();
        for id in &eligible {
            let Some(result) = summary.results.get(*id) else {
                continue;
            };
            if let Some(error) = &result.error {
                warnings.push(format!("Scan of {id} failed: {error}"));
                continue;
            }
            results.insert(id.to_string(), result.clone());
            order.push(id.to_string());
        }

        let selected: BTreeMap<String, bool> = order.iter().map(|id| (id.clone(), true)).collect();
        let jobs = prepare_jobs(
            &results,
            &selected,
            &self.user_config.excluded_paths_map(),
            &order,
        );
        tracing::info!("Planned {} jobs ({})", jobs.len(), if dry_run { "dry run" } else { "clean" });

        let mut report = if dry_run {
            dry_run_report(&jobs)
        } else {
            let executor = Executor::new(self.registry.clone(), self.trash.clone());
            CleanService::new(executor).clean(&jobs, callbacks)
        };
        report.duration = started.elapsed();

        Ok(RunOutcome {
            report,
            warnings,
            dry_run,
        })
    }
}

/// What a clean of `jobs` would free, computed without touching anything.
fn dry_run_report(jobs: &[CleanJob]) -> Report {
    let results = jobs
        .iter()
        .map(|job| {
            let mut result = CleanResult::new(job.category.clone());
            result.cleaned_items = job.items.len();
            result.freed_space = job.items.iter().map(|i| i.size).sum();
            result
        })
        .collect();
    Report::from_results(results, Default::default())
}
