//! Error types for each layer of the engine.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Problems with the embedded catalog or the user config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize user config: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Duplicate category id '{0}'")]
    DuplicateCategory(String),

    #[error("Category '{category}' references unknown group '{group}'")]
    UnknownGroup { category: String, group: String },

    #[error("Manual category '{0}' has no guide")]
    MissingGuide(String),

    #[error("No builtin target registered for category '{0}'")]
    UnknownBuiltin(String),
}

/// Failures talking to the operating system or an external tool.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}s", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with status {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

/// A whole target's scan could not produce meaningful output.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid path pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("Unexpected output from {tool}: {message}")]
    Output { tool: &'static str, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Reasons the non-interactive runner refuses to start.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("No targets selected")]
    NoSelection,

    #[error("None of the selected targets can be cleaned automatically")]
    NoEligibleTargets,

    #[error("Runner has no catalog config")]
    MissingConfig,

    #[error("Runner has no target registry")]
    MissingRegistry,

    #[error("Runner has no user config")]
    MissingUserConfig,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
