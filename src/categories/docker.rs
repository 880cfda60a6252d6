use std::path::Path;
use std::time::{Duration, SystemTime};

use serde::Deserialize;

use crate::config::Category;
use crate::error::ScanError;
use crate::platform::{self, Platform};
use crate::target::{BuiltinCleaner, Target};
use crate::types::{CleanResult, CleanableItem, ItemError, ScanResult};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const DF_TIMEOUT: Duration = Duration::from_secs(60);
const PRUNE_TIMEOUT: Duration = Duration::from_secs(600);

/// One line of `docker system df --format '{{json .}}'`.
#[derive(Debug, Deserialize)]
struct DfRow {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "TotalCount", default)]
    total_count: serde_json::Value,
    #[serde(rename = "Reclaimable", default)]
    reclaimable: String,
}

/// Reclaims space from the Docker daemon with its own prune commands.
pub struct DockerTarget {
    category: Category,
    platform: Platform,
}

impl DockerTarget {
    pub fn new(category: Category, platform: Platform) -> Self {
        Self { category, platform }
    }

    fn prune_args(path: &Path) -> Option<&'static [&'static str]> {
        match path.to_str()? {
            "docker:images" => Some(&["image", "prune", "-af"][..]),
            "docker:containers" => Some(&["container", "prune", "-f"][..]),
            "docker:local volumes" => Some(&["volume", "prune", "-af"][..]),
            "docker:build cache" => Some(&["builder", "prune", "-af"][..]),
            _ => None,
        }
    }
}

/// Parse docker's human sizes such as `1.2GB (45%)` into bytes. Unknown input is 0.
pub fn parse_docker_size(text: &str) -> u64 {
    let text = match text.find(" (") {
        Some(idx) => &text[..idx],
        None => text,
    };
    let upper = text.trim().to_uppercase();

    const UNITS: &[(&str, f64)] = &[
        ("TB", 1_099_511_627_776.0),
        ("GB", 1_073_741_824.0),
        ("MB", 1_048_576.0),
        ("KB", 1_024.0),
        ("B", 1.0),
    ];
    for (suffix, multiplier) in UNITS {
        if let Some(number) = upper.strip_suffix(suffix) {
            let bytes = match number.trim().parse::<f64>() {
                Ok(n) => n * multiplier,
                Err(_) => return 0,
            };
            // `as` saturates, so anything out of range is treated as garbage.
            return if bytes.is_finite() && bytes >= 0.0 && bytes < u64::MAX as f64 {
                bytes as u64
            } else {
                0
            };
        }
    }
    0
}

fn count_of(value: &serde_json::Value) -> u64 {
    match value {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn item_for_row(row: &DfRow) -> Option<CleanableItem> {
    let reclaimable = parse_docker_size(&row.reclaimable);
    if reclaimable == 0 {
        return None;
    }
    let key = row.kind.to_lowercase();
    let mut item = CleanableItem::new(format!("docker:{key}"), reclaimable);
    item.name = if key == "local volumes" {
        format!("{} (may contain data)", row.kind)
    } else {
        row.kind.clone()
    };
    item.file_count = count_of(&row.total_count);
    item.modified_at = SystemTime::now();
    Some(item)
}

impl Target for DockerTarget {
    fn category(&self) -> &Category {
        &self.category
    }

    fn is_available(&self) -> bool {
        if !self.platform.runner.exists("docker") {
            return false;
        }
        match platform::run_checked(
            self.platform.runner.as_ref(),
            "docker",
            &["version"],
            PROBE_TIMEOUT,
        ) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Docker daemon not reachable: {e}");
                false
            }
        }
    }

    fn scan(&self) -> Result<ScanResult, ScanError> {
        let output = platform::run_checked(
            self.platform.runner.as_ref(),
            "docker",
            &["system", "df", "--format", "{{json .}}"],
            DF_TIMEOUT,
        )?;

        let mut items = Vec::new();
        for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
            let row: DfRow = serde_json::from_str(line).map_err(|e| ScanError::Output {
                tool: "docker",
                message: e.to_string(),
            })?;
            if let Some(item) = item_for_row(&row) {
                items.push(item);
            }
        }

        let mut result = ScanResult::new(self.category.clone(), items);
        result.sort_largest_first();
        Ok(result)
    }

    fn as_builtin(&self) -> Option<&dyn BuiltinCleaner> {
        Some(self)
    }
}

impl BuiltinCleaner for DockerTarget {
    fn clean(&self, items: &[CleanableItem]) -> CleanResult {
        let mut result = CleanResult::new(self.category.clone());
        for item in items {
            let Some(args) = Self::prune_args(&item.path) else {
                result
                    .errors
                    .push(ItemError::for_path(&item.path, "unknown docker resource type"));
                continue;
            };
            match platform::run_checked(self.platform.runner.as_ref(), "docker", args, PRUNE_TIMEOUT) {
                Ok(_) => {
                    result.cleaned_items += 1;
                    result.freed_space += item.size;
                }
                Err(e) => result.errors.push(ItemError::for_path(&item.path, e.to_string())),
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Method;
    use crate::platform::testing::{exit, ok, platform, StubRunner, StubTrash};
    use std::path::PathBuf;
    use std::sync::Arc;

    const DF: &str = r#"{"Active":"2","Reclaimable":"1.5GB (60%)","Size":"2.5GB","TotalCount":"7","Type":"Images"}
{"Active":"0","Reclaimable":"0B (0%)","Size":"0B","TotalCount":"0","Type":"Containers"}
{"Active":"1","Reclaimable":"512MB (50%)","Size":"1GB","TotalCount":"3","Type":"Local Volumes"}
{"Active":"0","Reclaimable":"20kB","Size":"20kB","TotalCount":"4","Type":"Build Cache"}
"#;

    fn category() -> Category {
        Category::new("docker", "Docker", Method::Builtin)
    }

    #[test]
    fn parses_docker_sizes() {
        assert_eq!(parse_docker_size("0B"), 0);
        assert_eq!(parse_docker_size("512B"), 512);
        assert_eq!(parse_docker_size("20kB"), 20 * 1024);
        assert_eq!(parse_docker_size("1.5GB (60%)"), 1_610_612_736);
        assert_eq!(parse_docker_size("2TB"), 2 * 1_099_511_627_776);
        assert_eq!(parse_docker_size("garbage"), 0);
        assert_eq!(parse_docker_size(""), 0);
        assert_eq!(parse_docker_size("infB"), 0);
        assert_eq!(parse_docker_size("NaNGB"), 0);
        assert_eq!(parse_docker_size("1e30TB"), 0);
        assert_eq!(parse_docker_size("-1MB"), 0);
    }

    #[test]
    fn parse_round_trips_within_one_percent() {
        let units = [("B", 1.0), ("KB", 1024.0), ("MB", 1048576.0), ("GB", 1073741824.0), ("TB", 1099511627776.0)];
        for n in [0.1, 1.0, 2.5, 10.0, 333.3, 1000.0, 10000.0] {
            for (suffix, mult) in units {
                let expected = n * mult;
                let parsed = parse_docker_size(&format!("{n}{suffix}")) as f64;
                if expected >= 100.0 {
                    assert!((parsed - expected).abs() / expected <= 0.01, "{n}{suffix}");
                } else {
                    assert!((parsed - expected).abs() <= 1.0, "{n}{suffix}");
                }
            }
        }
    }

    #[test]
    fn scan_emits_one_item_per_reclaimable_type() {
        let runner = StubRunner::new().on("docker", |args| match args {
            ["system", "df", ..] => ok(DF),
            _ => exit(1, ""),
        });
        let target = DockerTarget::new(category(), platform(runner, StubTrash::default(), Path::new("/")));
        let result = target.scan().unwrap();

        let paths: Vec<PathBuf> = result.items.iter().map(|i| i.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("docker:images"),
                PathBuf::from("docker:local volumes"),
                PathBuf::from("docker:build cache"),
            ]
        );
        assert_eq!(result.items[0].file_count, 7);
        assert_eq!(result.items[1].name, "Local Volumes (may contain data)");
        assert!(!result.counts_files());
    }

    #[test]
    fn unavailable_when_daemon_probe_fails() {
        let runner = StubRunner::new().on("docker", |_| exit(1, "Cannot connect to the Docker daemon"));
        let target = DockerTarget::new(category(), platform(runner, StubTrash::default(), Path::new("/")));
        assert!(!target.is_available());

        let target = DockerTarget::new(
            category(),
            platform(StubRunner::new(), StubTrash::default(), Path::new("/")),
        );
        assert!(!target.is_available());
    }

    #[test]
    fn clean_runs_matching_prune_and_credits_prior_size() {
        let runner = Arc::new(StubRunner::new().on("docker", |args| match args {
            ["volume", ..] => exit(1, "volume in use"),
            _ => ok(""),
        }));
        let target = DockerTarget::new(
            category(),
            Platform {
                runner: runner.clone(),
                trash: Arc::new(StubTrash::default()),
                home: PathBuf::from("/"),
            },
        );

        let items = vec![
            CleanableItem::new("docker:images", 1000),
            CleanableItem::new("docker:local volumes", 500),
            CleanableItem::new("docker:build cache", 20),
            CleanableItem::new("docker:networks", 1),
        ];
        let result = target.clean(&items);

        assert_eq!(result.cleaned_items, 2);
        assert_eq!(result.freed_space, 1020);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(
            runner.calls(),
            vec![
                "docker image prune -af",
                "docker volume prune -af",
                "docker builder prune -af",
            ]
        );
    }
}
