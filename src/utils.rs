use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ConfigError, ScanError};

/// Home directory of the current user.
pub fn home_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::NoHomeDir)
}

/// Replace a leading `~` with `home`.
pub fn expand_tilde(pattern: &str, home: &Path) -> PathBuf {
    if pattern == "~" {
        home.to_path_buf()
    } else if let Some(rest) = pattern.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(pattern)
    }
}

/// Expand one catalog pattern (`~`, `*`, `**`) into the paths that exist now.
/// Unreadable matches are dropped.
pub fn expand_pattern(pattern: &str, home: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let expanded = expand_tilde(pattern, home);
    let text = expanded.to_string_lossy();
    let paths = glob::glob(&text).map_err(|e| ScanError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    Ok(paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::debug!("Skipping unreadable match of {pattern}: {e}");
                None
            }
        })
        .collect())
}

/// The fixed prefix of a pattern: trailing `/**`, `/*` and `*` removed.
pub fn pattern_base(pattern: &str) -> &str {
    let mut base = pattern;
    loop {
        let trimmed = base
            .strip_suffix("/**")
            .or_else(|| base.strip_suffix("/*"))
            .or_else(|| base.strip_suffix('*'))
            .unwrap_or(base);
        if trimmed == base {
            return base.trim_end_matches('/');
        }
        base = trimmed;
    }
}

/// Total bytes and file count under `path`. Files count as one.
/// Symlinks are not followed.
pub fn size_and_count(path: &Path) -> (u64, u64) {
    let meta = match path.symlink_metadata() {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!("Cannot stat {}: {e}", path.display());
            return (0, 0);
        }
    };
    if !meta.is_dir() {
        return (meta.len(), 1);
    }

    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
        .filter_map(|e| e.metadata().ok())
        .fold((0, 0), |(size, count), m| (size + m.len(), count + 1))
}

/// Remove a file or directory for good. Returns bytes freed on success.
pub fn safe_remove(path: &Path) -> Result<u64, std::io::Error> {
    let meta = path.symlink_metadata()?;
    let (size, _) = size_and_count(path);
    if meta.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else {
        std::fs::remove_file(path)?;
    }
    Ok(size)
}

/// Format byte count as human-readable string.
pub fn format_size(bytes: u64) -> String {
    if bytes >= 1_099_511_627_776 {
        format!("{:.2} TB", bytes as f64 / 1_099_511_627_776.0)
    } else if bytes >= 1_073_741_824 {
        format!("{:.2} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.2} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1_024 {
        format!("{:.2} KB", bytes as f64 / 1_024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// Shorten a path for display by replacing home dir with ~.
pub fn display_path(path: &Path) -> String {
    match home_dir() {
        Ok(home) => match path.strip_prefix(&home) {
            Ok(relative) => format!("~/{}", relative.display()),
            Err(_) => path.display().to_string(),
        },
        Err(_) => path.display().to_string(),
    }
}
