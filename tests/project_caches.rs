use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mac_sweep::categories::ProjectCacheTarget;
use mac_sweep::platform::{CommandOutput, CommandRunner, Platform, Trash, TrashOutcome};
use mac_sweep::{Category, Method, PlatformError, Target};
use tempfile::TempDir;

struct NoCommands;

impl CommandRunner for NoCommands {
    fn exists(&self, _program: &str) -> bool {
        false
    }

    fn run(&self, _program: &str, _args: &[&str], _timeout: Duration) -> Result<CommandOutput, PlatformError> {
        Err(PlatformError::Unsupported("Running commands"))
    }
}

struct NoTrash;

impl Trash for NoTrash {
    fn move_to_trash(&self, paths: &[PathBuf]) -> TrashOutcome {
        TrashOutcome {
            succeeded: Vec::new(),
            failed: paths.iter().map(|p| (p.clone(), "disabled".to_string())).collect(),
        }
    }
}

fn write(path: &Path, bytes: usize) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, vec![0u8; bytes]).unwrap();
}

fn scan(root: &Path) -> Vec<String> {
    let platform = Platform {
        runner: Arc::new(NoCommands),
        trash: Arc::new(NoTrash),
        home: root.to_path_buf(),
    };
    let target = ProjectCacheTarget::new(
        Category::new("project-caches", "Project Caches", Method::Builtin),
        platform,
    )
    .with_stale_days(0);
    target.scan().unwrap().items.into_iter().map(|i| i.name).collect()
}

#[test]
fn only_caches_next_to_a_marker_are_reported() {
    let root = TempDir::new().unwrap();
    write(&root.path().join("myapp/package.json"), 2);
    write(&root.path().join("myapp/node_modules/left-pad/index.js"), 64);
    write(&root.path().join("orphan/node_modules/thing/index.js"), 64);

    assert_eq!(scan(root.path()), vec!["myapp/node_modules"]);
}

#[test]
fn caches_below_the_depth_limit_are_not_reported() {
    let root = TempDir::new().unwrap();
    write(&root.path().join("myapp/package.json"), 2);
    write(&root.path().join("myapp/node_modules/left-pad/index.js"), 64);
    let deep = root.path().join("a/b/c/d/e/f/g/h/proj");
    write(&deep.join("package.json"), 2);
    write(&deep.join("node_modules/x/index.js"), 64);

    assert_eq!(scan(root.path()), vec!["myapp/node_modules"]);
}
