use crate::config::Category;
use crate::error::ScanError;
use crate::types::{CleanResult, CleanableItem, ScanResult};

/// The trait every category target implements.
pub trait Target: Send + Sync {
    /// The catalog entry this target scans for.
    fn category(&self) -> &Category;

    /// Whether scanning makes sense right now (tool installed, paths present).
    fn is_available(&self) -> bool;

    /// Find what could be cleaned. Never deletes anything.
    fn scan(&self) -> Result<ScanResult, ScanError>;

    /// Targets of `Method::Builtin` categories clean up after themselves.
    fn as_builtin(&self) -> Option<&dyn BuiltinCleaner> {
        None
    }
}

/// Cleanup that Trash semantics do not cover, such as pruning a daemon.
pub trait BuiltinCleaner: Send + Sync {
    fn clean(&self, items: &[CleanableItem]) -> CleanResult;
}
