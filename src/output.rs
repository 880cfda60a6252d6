use colored::Colorize;

use mac_sweep::registry::Registry;
use mac_sweep::runner::RunOutcome;
use mac_sweep::scanner::ScanSummary;
use mac_sweep::service::{CategoryDone, ItemDone};
use mac_sweep::utils::{display_path, format_size};
use mac_sweep::{Config, Safety};

pub fn print_banner() {
    println!(
        "{}",
        format!("mac-sweep v{}", env!("CARGO_PKG_VERSION"))
            .bold()
            .cyan()
    );
    println!();
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "Warning:".red().bold(), msg.red());
}

pub fn print_info(msg: &str) {
    println!("{} {}", "Info:".cyan().bold(), msg);
}

pub fn print_separator() {
    println!("  {}", "─".repeat(60).dimmed());
}

fn safety_label(safety: Safety) -> String {
    match safety {
        Safety::Safe => safety.to_string().green().to_string(),
        Safety::Moderate => safety.to_string().yellow().to_string(),
        Safety::Risky => safety.to_string().red().to_string(),
    }
}

pub fn print_catalog(config: &Config, registry: &Registry) {
    println!("{}", "=== Categories ===".bold().white());
    for group in &config.groups {
        println!("{}", group.name.bold());
        for cat in config.categories.iter().filter(|c| c.group == group.id) {
            let available = registry.get(&cat.id).is_some_and(|t| t.is_available());
            println!(
                "  {:<22} {:<28} {:<18} {:<10} {}",
                cat.id,
                cat.name,
                safety_label(cat.safety),
                cat.method.to_string(),
                if available {
                    "available".green()
                } else {
                    "not found".dimmed()
                }
            );
        }
    }
    println!();
}

/// Scan results in catalog order, followed by scan errors.
pub fn print_scan_table(config: &Config, summary: &ScanSummary) {
    println!("{}", "=== Scan ===".bold().white());
    println!(
        "  {:<28} {:>12} {:>8} {:>10}",
        "Category".bold(),
        "Size".bold(),
        "Items".bold(),
        "Files".bold()
    );
    print_separator();

    let mut total_files = 0u64;
    for cat in &config.categories {
        let Some(result) = summary.results.get(&cat.id) else {
            continue;
        };
        if result.error.is_some() || result.items.is_empty() {
            continue;
        }
        // Docker counts resources, not files.
        let files = if result.counts_files() {
            total_files += result.total_file_count;
            result.total_file_count.to_string()
        } else {
            "-".to_string()
        };
        println!(
            "  {:<28} {:>12} {:>8} {:>10}",
            cat.name,
            format_size(result.total_size).yellow(),
            result.items.len(),
            files.dimmed()
        );
    }

    print_separator();
    println!(
        "  {:<28} {:>12} {:>8} {:>10}",
        "Total reclaimable:".bold(),
        format_size(summary.total_size).green().bold(),
        summary.total_items,
        total_files
    );
    println!();

    for (id, error) in &summary.errors {
        print_warning(&format!("{id}: {error}"));
    }
}

pub fn print_item_failed(done: &ItemDone<'_>) {
    println!(
        "  {} {}: {}",
        "Failed".red().bold(),
        display_path(done.path).dimmed(),
        done.error.unwrap_or("unknown error").red()
    );
}

pub fn print_category_done(done: &CategoryDone<'_>) {
    let status = if done.error_count == 0 {
        "✓".green()
    } else {
        "!".yellow()
    };
    println!(
        "  {} {:<28} {:>12} {:>6} items  {}",
        status,
        done.category,
        format_size(done.freed_space).green(),
        done.cleaned_items,
        if done.error_count == 0 {
            String::new()
        } else {
            format!("{} errors", done.error_count).red().to_string()
        }
    );
}

pub fn print_report(outcome: &RunOutcome) {
    let report = &outcome.report;
    let heading = if outcome.dry_run {
        "=== Dry run ==="
    } else {
        "=== Summary ==="
    };
    println!();
    println!("{}", heading.bold().white());
    for result in &report.results {
        println!(
            "  {:<30} {:>12} {:>6} items",
            result.category.name,
            format_size(result.freed_space).green(),
            result.cleaned_items
        );
        for error in &result.errors {
            println!("    {} {}", "-".red(), error.to_string().red());
        }
    }
    print_separator();

    let verb = if outcome.dry_run { "Would free:" } else { "Freed:" };
    println!(
        "  {:<30} {}",
        verb.bold(),
        format_size(report.freed_space).green().bold()
    );
    println!(
        "  {:<30} {} cleaned, {} failed in {:.1}s",
        "Items:".bold(),
        report.cleaned_items,
        report.failed_items,
        report.duration.as_secs_f64()
    );
    println!();

    for warning in &outcome.warnings {
        print_warning(warning);
    }
}

pub fn print_dry_run_footer() {
    println!(
        "{}",
        "This was a dry run. Run `mac-sweep --clean` to clean."
            .yellow()
            .bold()
    );
}

pub fn print_free_space(label: &str, bytes: Option<u64>) {
    match bytes {
        Some(bytes) => println!("{} {}", format!("{label}:").bold(), format_size(bytes).cyan()),
        None => println!("{} {}", format!("{label}:").bold(), "unknown".dimmed()),
    }
}

pub fn print_clean_complete(freed: u64) {
    println!(
        "{} {}",
        "Cleaned!".green().bold(),
        format!("{} freed.", format_size(freed)).green()
    );
}
