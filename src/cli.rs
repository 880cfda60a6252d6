use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser)]
#[command(
    name = "mac-sweep",
    about = "A macOS cleanup tool: find and remove caches, build artifacts and stale downloads",
    version,
    disable_version_flag = true
)]
pub struct Cli {
    /// Category ids to scan or clean. When cleaning they override `selected_targets` in the config file
    pub targets: Vec<String>,

    /// Clean the selected categories
    #[arg(long)]
    pub clean: bool,

    /// Show what --clean would free without touching anything
    #[arg(long)]
    pub dry_run: bool,

    /// List every category in the catalog
    #[arg(long)]
    pub list: bool,

    /// Open the location of a category in Finder
    #[arg(long, value_name = "ID")]
    pub reveal: Option<String>,

    /// User config file (default: ~/.config/mac-sweep/config.yaml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long)]
    pub verbose: bool,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_targets_and_flags() {
        let cli = Cli::try_parse_from(["mac-sweep", "npm-cache", "docker", "--dry-run", "--config", "/tmp/c.yaml"]).unwrap();
        assert_eq!(cli.targets, vec!["npm-cache", "docker"]);
        assert!(cli.dry_run);
        assert!(!cli.clean);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yaml")));
    }

    #[test]
    fn short_v_prints_version() {
        let err = Cli::try_parse_from(["mac-sweep", "-v"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
