//! Scan and clean reclaimable disk space on macOS.
//!
//! Each catalog [`Category`](config::Category) gets a [`Target`](target::Target)
//! in the [`Registry`](registry::Registry). Targets are scanned in parallel,
//! the results are planned into [`CleanJob`](service::CleanJob)s and the jobs
//! run one at a time through the [`CleanService`](service::CleanService).

pub mod categories;
pub mod config;
pub mod error;
pub mod executor;
pub mod platform;
pub mod registry;
pub mod runner;
pub mod scanner;
pub mod service;
pub mod target;
pub mod types;
pub mod user_config;
pub mod utils;

pub use config::{Category, Config, Method, Safety};
pub use error::{ConfigError, PlatformError, RunnerError, ScanError};
pub use registry::{default_registry, Registry};
pub use runner::{RunOutcome, Runner};
pub use target::{BuiltinCleaner, Target};
pub use types::{CleanResult, CleanableItem, ItemError, ItemStatus, Report, ScanResult};
pub use user_config::UserConfig;
