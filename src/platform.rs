//! Thin wrappers over macOS facilities.
//!
//! Everything that shells out goes through [`CommandRunner`] and everything
//! that trashes goes through [`Trash`], so tests can swap both for in-process
//! stubs.

use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::error::{ConfigError, PlatformError};
use crate::utils;

/// Finder can be slow to answer for large batches.
pub const TRASH_TIMEOUT: Duration = Duration::from_secs(30);
pub const LOCK_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Prefixes of the sealed system volume.
const SIP_PROTECTED: &[&str] = &["/System", "/usr", "/bin", "/sbin"];
const SIP_EXCEPTIONS: &[&str] = &["/usr/local"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandRunner: Send + Sync {
    /// Whether `program` resolves on PATH.
    fn exists(&self, program: &str) -> bool;

    /// Run to completion or until `timeout`, capturing output.
    fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, PlatformError>;
}

/// Like [`CommandRunner::run`] but a non-zero exit is an error.
pub fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, PlatformError> {
    let output = runner.run(program, args, timeout)?;
    if output.success() {
        Ok(output)
    } else {
        Err(PlatformError::Failed {
            program: program.to_string(),
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// Runs real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

impl CommandRunner for SystemRunner {
    fn exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, PlatformError> {
        tracing::debug!("Running {program} {}", args.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| PlatformError::Spawn {
                program: program.to_string(),
                source,
            })?;

        // Drain both pipes while waiting so a chatty child cannot block on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PlatformError::Timeout {
                    program: program.to_string(),
                    timeout,
                });
            }
            Err(source) => {
                let _ = child.kill();
                return Err(PlatformError::Spawn {
                    program: program.to_string(),
                    source,
                });
            }
        };

        Ok(CommandOutput {
            code: status.code(),
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        })
    }
}

/// Result of one batch trash request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrashOutcome {
    pub succeeded: Vec<PathBuf>,
    pub failed: BTreeMap<PathBuf, String>,
}

pub trait Trash: Send + Sync {
    fn move_to_trash(&self, paths: &[PathBuf]) -> TrashOutcome;
}

/// Moves paths to the user's Trash through Finder, so "Put Back" keeps working.
pub struct FinderTrash {
    runner: Arc<dyn CommandRunner>,
}

impl FinderTrash {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    #[cfg(target_os = "macos")]
    fn request(&self, paths: &[&Path]) -> Result<(), PlatformError> {
        let files: Vec<String> = paths
            .iter()
            .map(|p| format!("POSIX file \"{}\"", applescript_escape(&p.to_string_lossy())))
            .collect();
        let script = format!(
            "tell application \"Finder\" to delete {{{}}}",
            files.join(", ")
        );
        run_checked(self.runner.as_ref(), "osascript", &["-e", &script], TRASH_TIMEOUT)?;
        Ok(())
    }

    #[cfg(not(target_os = "macos"))]
    fn request(&self, _paths: &[&Path]) -> Result<(), PlatformError> {
        let _ = &self.runner;
        Err(PlatformError::Unsupported("Moving to Trash"))
    }
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn applescript_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Trash for FinderTrash {
    fn move_to_trash(&self, paths: &[PathBuf]) -> TrashOutcome {
        let mut outcome = TrashOutcome::default();
        let mut pending: Vec<&Path> = Vec::new();
        for path in paths {
            if path.symlink_metadata().is_err() {
                outcome
                    .failed
                    .insert(path.clone(), "no such file or directory".to_string());
            } else {
                pending.push(path);
            }
        }
        if pending.is_empty() {
            return outcome;
        }

        match self.request(&pending) {
            Ok(()) => {
                // Finder can report success while leaving some items in place.
                let (gone, left): (Vec<&Path>, Vec<&Path>) = pending
                    .into_iter()
                    .partition(|p| p.symlink_metadata().is_err());
                outcome.succeeded.extend(gone.into_iter().map(Path::to_path_buf));
                pending = left;
            }
            Err(e) => {
                tracing::warn!("Batch trash of {} paths failed, retrying one by one: {e}", pending.len());
            }
        }

        for path in pending {
            match self.request(&[path]) {
                Ok(()) => outcome.succeeded.push(path.to_path_buf()),
                Err(e) => {
                    outcome.failed.insert(path.to_path_buf(), e.to_string());
                }
            }
        }
        outcome
    }
}

/// Whether `path` sits on the SIP-protected system volume.
pub fn is_sip_protected(path: &Path) -> bool {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if SIP_EXCEPTIONS.iter().any(|e| resolved.starts_with(e)) {
        return false;
    }
    SIP_PROTECTED.iter().any(|p| resolved.starts_with(p))
}

/// Top-level children of `base` that some process has a file open under.
///
/// `lsof` exits with 1 both when nothing is open and when it could not stat
/// some files, so output is trusted whenever there is any.
pub fn detect_locked(
    runner: &dyn CommandRunner,
    base: &Path,
) -> Result<HashSet<PathBuf>, PlatformError> {
    let base_arg = base.to_string_lossy();
    let output = runner.run("lsof", &["-nP", "-F", "n", "+D", &base_arg], LOCK_CHECK_TIMEOUT)?;
    if !output.success() && output.stdout.trim().is_empty() {
        if output.code == Some(1) {
            return Ok(HashSet::new());
        }
        return Err(PlatformError::Failed {
            program: "lsof".to_string(),
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(parse_lsof_paths(&output.stdout, base))
}

/// Map `n<path>` records from `lsof -F n` to the child of `base` they live under.
pub fn parse_lsof_paths(stdout: &str, base: &Path) -> HashSet<PathBuf> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix('n'))
        .filter_map(|open| {
            let relative = Path::new(open).strip_prefix(base).ok()?;
            let first = relative.components().next()?;
            Some(base.join(first))
        })
        .collect()
}

/// Show `path` in Finder: directories are opened, files are selected.
pub fn reveal_in_finder(runner: &dyn CommandRunner, path: &Path) -> Result<(), PlatformError> {
    let arg = path.to_string_lossy();
    if path.is_dir() {
        run_checked(runner, "open", &[&arg], OPEN_TIMEOUT)?;
    } else {
        run_checked(runner, "open", &["-R", &arg], OPEN_TIMEOUT)?;
    }
    Ok(())
}

/// Best-effort probe: reading a TCC-protected folder fails without Full Disk Access.
pub fn has_full_disk_access(home: &Path) -> bool {
    for probe in ["Library/Safari", "Library/Mail"] {
        match std::fs::read_dir(home.join(probe)) {
            Ok(_) => return true,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => return false,
            Err(_) => continue,
        }
    }
    true
}

/// Bytes available to unprivileged users on the volume holding `path`.
#[cfg(unix)]
pub fn free_space(path: &Path) -> Option<u64> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).ok()?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();
    let ret = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if ret != 0 {
        return None;
    }
    let stat = unsafe { stat.assume_init() };
    Some(stat.f_bavail as u64 * stat.f_frsize as u64)
}

#[cfg(not(unix))]
pub fn free_space(_path: &Path) -> Option<u64> {
    None
}

/// The injectable OS seams plus the home directory everything is relative to.
#[derive(Clone)]
pub struct Platform {
    pub runner: Arc<dyn CommandRunner>,
    pub trash: Arc<dyn Trash>,
    pub home: PathBuf,
}

impl Platform {
    pub fn system() -> Result<Self, ConfigError> {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
        Ok(Self {
            trash: Arc::new(FinderTrash::new(runner.clone())),
            runner,
            home: utils::home_dir()?,
        })
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").field("home", &self.home).finish_non_exhaustive()
    }
}
