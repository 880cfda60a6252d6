use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use mac_sweep::executor::Executor;
use mac_sweep::platform::{Trash, TrashOutcome};
use mac_sweep::service::{prepare_jobs, CleanCallbacks, CleanJob, CleanService};
use mac_sweep::{
    BuiltinCleaner, Category, CleanResult, CleanableItem, ItemStatus, Method, Registry, Report,
    ScanError, ScanResult, Target,
};

/// Trash that fails for the listed paths and records every request.
#[derive(Default)]
struct FakeTrash {
    fail: BTreeMap<PathBuf, String>,
    requests: Mutex<Vec<Vec<PathBuf>>>,
}

impl Trash for FakeTrash {
    fn move_to_trash(&self, paths: &[PathBuf]) -> TrashOutcome {
        self.requests.lock().unwrap().push(paths.to_vec());
        let mut outcome = TrashOutcome::default();
        for path in paths {
            match self.fail.get(path) {
                Some(reason) => {
                    outcome.failed.insert(path.clone(), reason.clone());
                }
                None => outcome.succeeded.push(path.clone()),
            }
        }
        outcome
    }
}

/// Builtin target that reports a fixed cleanup result.
struct Fixed {
    category: Category,
    result: CleanResult,
}

impl Target for Fixed {
    fn category(&self) -> &Category {
        &self.category
    }

    fn is_available(&self) -> bool {
        true
    }

    fn scan(&self) -> Result<ScanResult, ScanError> {
        Ok(ScanResult::new(self.category.clone(), Vec::new()))
    }

    fn as_builtin(&self) -> Option<&dyn BuiltinCleaner> {
        Some(self)
    }
}

impl BuiltinCleaner for Fixed {
    fn clean(&self, _items: &[CleanableItem]) -> CleanResult {
        self.result.clone()
    }
}

#[derive(Debug, Default)]
struct Events {
    progress: Vec<(String, usize, usize)>,
    items: Vec<(PathBuf, bool, Option<String>)>,
    categories: Vec<(String, u64, usize, usize)>,
}

fn run(registry: Registry, trash: FakeTrash, jobs: &[CleanJob]) -> (Report, Events) {
    let service = CleanService::new(Executor::new(Arc::new(registry), Arc::new(trash)));
    let events = RefCell::new(Events::default());
    let mut callbacks = CleanCallbacks::default()
        .on_progress(|p| {
            events
                .borrow_mut()
                .progress
                .push((p.item.to_string(), p.current, p.total))
        })
        .on_item_done(|d| {
            events
                .borrow_mut()
                .items
                .push((d.path.to_path_buf(), d.success, d.error.map(str::to_string)))
        })
        .on_category_done(|c| {
            events.borrow_mut().categories.push((
                c.category.to_string(),
                c.freed_space,
                c.cleaned_items,
                c.error_count,
            ))
        });
    let report = service.clean(jobs, &mut callbacks);
    drop(callbacks);
    (report, events.into_inner())
}

fn abc_job(method: Method) -> Vec<CleanJob> {
    vec![CleanJob {
        category: Category::new("cat1", "Test", method),
        items: vec![
            CleanableItem::new("/a", 100),
            CleanableItem::new("/b", 200),
            CleanableItem::new("/c", 300),
        ],
    }]
}

#[test]
fn trash_batch_progress_shape() {
    let (report, events) = run(Registry::new(), FakeTrash::default(), &abc_job(Method::Trash));

    assert_eq!(events.progress.len(), 2);
    assert_eq!(events.progress[0], ("a".to_string(), 0, 3));
    assert_eq!(events.progress[1], ("c".to_string(), 3, 3));
    assert_eq!(events.items.len(), 3);
    assert!(events.items.iter().all(|(_, ok, _)| *ok));
    assert_eq!(events.categories, vec![("Test".to_string(), 600, 3, 0)]);

    assert_eq!(report.freed_space, 600);
    assert_eq!(report.cleaned_items, 3);
    assert_eq!(report.failed_items, 0);
}

#[test]
fn trash_partial_failure() {
    let mut trash = FakeTrash::default();
    trash.fail.insert(PathBuf::from("/b"), "busy".to_string());
    let (report, events) = run(Registry::new(), trash, &abc_job(Method::Trash));

    assert_eq!(
        events.items,
        vec![
            (PathBuf::from("/a"), true, None),
            (PathBuf::from("/b"), false, Some("busy".to_string())),
            (PathBuf::from("/c"), true, None),
        ]
    );
    assert_eq!(report.cleaned_items, 2);
    assert_eq!(report.failed_items, 1);
    assert_eq!(report.freed_space, 400);
    assert_eq!(report.results[0].errors[0].to_string(), "/b: busy");
}

#[test]
fn permanent_is_one_by_one() {
    let jobs = vec![CleanJob {
        category: Category::new("perm", "Perm", Method::Permanent),
        items: ["/p1", "/p2", "/p3"]
            .iter()
            .map(|p| CleanableItem::new(format!("/nonexistent-mac-sweep-test{p}"), 10))
            .collect(),
    }];
    let (report, events) = run(Registry::new(), FakeTrash::default(), &jobs);

    let currents: Vec<(usize, usize)> = events.progress.iter().map(|(_, c, t)| (*c, *t)).collect();
    assert_eq!(currents, vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(events.items.len(), 3);
    assert!(events.items.iter().all(|(_, ok, err)| !ok && err.is_some()));
    assert_eq!(events.categories, vec![("Perm".to_string(), 0, 0, 3)]);
    assert_eq!(report.failed_items, 3);
}

#[test]
fn builtin_is_a_single_call() {
    let category = Category::new("bi", "Builtin", Method::Builtin);
    let mut canned = CleanResult::new(category.clone());
    canned.cleaned_items = 3;
    canned.freed_space = 300;
    let mut registry = Registry::new();
    registry.register(Box::new(Fixed {
        category: category.clone(),
        result: canned,
    }));

    let jobs = vec![CleanJob {
        category,
        items: vec![
            CleanableItem::new("/x", 1),
            CleanableItem::new("/y", 1),
            CleanableItem::new("/z", 1),
        ],
    }];
    let (report, events) = run(registry, FakeTrash::default(), &jobs);

    assert_eq!(events.progress, vec![(String::new(), 0, 3)]);
    assert!(events.items.is_empty());
    assert_eq!(events.categories, vec![("Builtin".to_string(), 300, 3, 0)]);
    assert_eq!(report.cleaned_items, 3);
    assert_eq!(report.freed_space, 300);
    assert_eq!(report.failed_items, 0);
}

#[test]
fn exclusion_and_locked_filtering() {
    let mut locked = CleanableItem::new("/y", 1);
    locked.status = ItemStatus::ProcessLocked;
    let mut results = HashMap::new();
    results.insert(
        "cat1".to_string(),
        ScanResult::new(
            Category::new("cat1", "Test", Method::Trash),
            vec![CleanableItem::new("/x", 1), locked, CleanableItem::new("/z", 1)],
        ),
    );
    let selected = BTreeMap::from([("cat1".to_string(), true)]);

    let excluded = HashMap::from([("cat1".to_string(), HashSet::from([PathBuf::from("/x")]))]);
    let jobs = prepare_jobs(&results, &selected, &excluded, &[]);
    assert_eq!(jobs.len(), 1);
    let paths: Vec<PathBuf> = jobs[0].items.iter().map(|i| i.path.clone()).collect();
    assert_eq!(paths, vec![PathBuf::from("/z")]);

    let excluded = HashMap::from([(
        "cat1".to_string(),
        HashSet::from([PathBuf::from("/x"), PathBuf::from("/z")]),
    )]);
    assert!(prepare_jobs(&results, &selected, &excluded, &[]).is_empty());
}

#[test]
fn events_of_one_job_precede_the_next() {
    let mut jobs = abc_job(Method::Trash);
    jobs.push(CleanJob {
        category: Category::new("cat2", "Second", Method::Trash),
        items: vec![CleanableItem::new("/d", 5)],
    });
    let (report, events) = run(Registry::new(), FakeTrash::default(), &jobs);

    let currents: Vec<usize> = events.progress.iter().map(|(_, c, _)| *c).collect();
    assert_eq!(currents, vec![0, 3, 3, 4]);
    assert!(events.progress.iter().all(|(_, c, t)| c <= t && *t == 4));
    assert_eq!(events.categories.len(), 2);
    assert_eq!(report.freed_space, 605);
}
