mod cli;
mod output;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use mac_sweep::platform::{self, Platform};
use mac_sweep::registry::{default_registry, Registry};
use mac_sweep::service::CleanCallbacks;
use mac_sweep::{scanner, utils, Config, Runner, UserConfig};

/// Some items could not be cleaned.
const EXIT_PARTIAL: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = Config::load().context("Failed to load the category catalog")?;
    let platform = Platform::system()?;
    let registry = Arc::new(
        default_registry(&config, &platform).context("Failed to build the target registry")?,
    );

    if cli.list {
        output::print_catalog(&config, &registry);
        return Ok(ExitCode::SUCCESS);
    }
    if let Some(id) = &cli.reveal {
        reveal(&config, &platform, id)?;
        return Ok(ExitCode::SUCCESS);
    }

    output::print_banner();
    if !platform::has_full_disk_access(&platform.home) {
        output::print_warning(
            "Full Disk Access is not granted; some caches will be skipped. \
             Grant it in System Settings > Privacy & Security.",
        );
    }

    if cli.dry_run || cli.clean {
        return clean(cli, config, registry, &platform);
    }

    for id in cli.targets.iter().filter(|id| config.category(id).is_none()) {
        output::print_warning(&format!("Unknown target '{id}', skipping"));
    }
    let summary = scanner::scan_selected(&registry, &cli.targets, |event| {
        tracing::debug!(
            "[{}/{}] scanned {}",
            event.completed,
            event.total,
            event.category_name
        );
    });
    output::print_scan_table(&config, &summary);
    Ok(ExitCode::SUCCESS)
}

fn clean(cli: &Cli, config: Config, registry: Arc<Registry>, platform: &Platform) -> Result<ExitCode> {
    let user_config = match &cli.config {
        Some(path) => UserConfig::load_from(path),
        None => UserConfig::load(),
    }
    .context("Failed to load user config")?;

    let runner = Runner::builder()
        .config(config)
        .registry(registry)
        .user_config(user_config)
        .trash(platform.trash.clone())
        .targets(cli.targets.iter().cloned())
        .build()?;

    // --dry-run wins over --clean.
    if cli.dry_run {
        let outcome = runner.run(true, &mut CleanCallbacks::default())?;
        output::print_report(&outcome);
        output::print_dry_run_footer();
        return Ok(ExitCode::SUCCESS);
    }

    let before = platform::free_space(&platform.home);
    output::print_free_space("Free space before", before);
    println!();

    let mut callbacks = CleanCallbacks::default()
        .on_item_done(|done| {
            if !done.success {
                output::print_item_failed(done);
            }
        })
        .on_category_done(output::print_category_done);
    let outcome = runner.run(false, &mut callbacks)?;

    output::print_report(&outcome);
    output::print_clean_complete(outcome.report.freed_space);
    output::print_free_space("Free space after", platform::free_space(&platform.home));

    if outcome.report.has_errors() {
        Ok(ExitCode::from(EXIT_PARTIAL))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Open the first existing location of a category in Finder.
fn reveal(config: &Config, platform: &Platform, id: &str) -> Result<()> {
    let Some(category) = config.category(id) else {
        bail!("Unknown category '{id}'");
    };

    for pattern in &category.paths {
        let base = utils::expand_tilde(utils::pattern_base(pattern), &platform.home);
        if base.exists() {
            platform::reveal_in_finder(platform.runner.as_ref(), &base)
                .with_context(|| format!("Failed to open {}", base.display()))?;
            output::print_info(&format!("Opened {}", utils::display_path(&base)));
            return Ok(());
        }
    }
    bail!("Nothing to reveal for '{id}'")
}
