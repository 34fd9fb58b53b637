mod checksum;
mod cli;
mod comparison;
mod config;
mod filter;
mod manifest;
mod report;
mod store;

use anyhow::Context;
use checksum::ChecksumEngine;
use cli::{Cli, Command};
use comparison::ManifestComparison;
use config::Config;
use filter::PathFilter;
use manifest::Manifest;
use report::ComparisonReport;
use std::fmt as stdfmt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use store::ManifestStore;
use tracing::{Event, Level, Subscriber, error, info};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

struct BitrotExitCode;

impl BitrotExitCode {
    /// Exit code used when corruption was flagged or a required manifest
    /// does not exist.
    fn unclean() -> ExitCode {
        ExitCode::from(1)
    }

    /// Exit code used for other errors (I/O errors, invalid arguments, etc.).
    fn any_error() -> ExitCode {
        ExitCode::from(255)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let store_root = match resolve_store_root(cli.store) {
        Ok(store_root) => store_root,
        Err(err) => {
            error!("{err}");
            return BitrotExitCode::any_error();
        }
    };
    let store = ManifestStore::new(store_root);

    let config = match Config::load(store.root(), &cli.exclude) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return BitrotExitCode::any_error();
        }
    };

    let result: anyhow::Result<ExitCode> = match cli.command {
        Command::Generate { path } => handle_generate(&store, &config, &path),
        Command::Validate { path } => handle_validate(&store, &config, &path),
        Command::Compare { old, new } => handle_compare(&config, &old, &new),
        Command::CompareLatest { old, new } => handle_compare_latest(&store, &old, &new),
        Command::List {} => handle_list(&store),
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(err) => {
            error!("{err}");
            BitrotExitCode::any_error()
        }
    }
}

/// Store root precedence: --store (or BITROT_STORE), then ~/.bitrot.
fn resolve_store_root(flag: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(store_root) = flag {
        return Ok(store_root);
    }

    let home = dirs::home_dir()
        .context("Could not determine a home directory for the manifest store")?;
    Ok(home.join(".bitrot"))
}

fn handle_generate(
    store: &ManifestStore,
    config: &Config,
    path: &Path,
) -> anyhow::Result<ExitCode> {
    let filter = PathFilter::new(config.excluded_names.iter().cloned());
    let engine = ChecksumEngine::with_buffer_size(config.buffer_size);

    let manifest = Manifest::build(path, &filter, &engine)?;
    let previous = store.latest_manifest_for(&manifest.path)?;

    let mut exit_code = ExitCode::SUCCESS;
    if let Some(previous) = previous {
        info!(
            "Comparing to previous manifest from {}",
            previous.created_at.format(store::TIMESTAMP_FORMAT)
        );
        let comparison = ManifestComparison::between(&previous, &manifest);
        print!("{}", ComparisonReport::new(&comparison));
        exit_code = corruption_failure(&comparison).unwrap_or(ExitCode::SUCCESS);
    }

    // The fresh manifest is stored even when the comparison flagged paths,
    // so the next run compares against current reality.
    let manifest_path = store.add_manifest(&manifest)?;
    info!("Wrote manifest to {}", manifest_path.display());

    Ok(exit_code)
}

fn handle_validate(
    store: &ManifestStore,
    config: &Config,
    path: &Path,
) -> anyhow::Result<ExitCode> {
    let filter = PathFilter::new(config.excluded_names.iter().cloned());
    let engine = ChecksumEngine::with_buffer_size(config.buffer_size);

    let manifest = Manifest::build(path, &filter, &engine)?;

    let Some(previous) = store.latest_manifest_for(&manifest.path)? else {
        error!("No previous manifest to validate for {}", manifest.path);
        return Ok(BitrotExitCode::unclean());
    };

    let comparison = ManifestComparison::between(&previous, &manifest);
    print!("{}", ComparisonReport::new(&comparison));

    if let Some(exit_code) = corruption_failure(&comparison) {
        return Ok(exit_code);
    }

    if comparison.is_unchanged() {
        info!("Validated manifest for {}", manifest.path);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_compare(config: &Config, old: &Path, new: &Path) -> anyhow::Result<ExitCode> {
    let filter = PathFilter::new(config.excluded_names.iter().cloned());
    let engine = ChecksumEngine::with_buffer_size(config.buffer_size);

    let old_manifest = Manifest::build(old, &filter, &engine)?;
    let new_manifest = Manifest::build(new, &filter, &engine)?;

    Ok(report_copy_verdict(&old_manifest, &new_manifest))
}

fn handle_compare_latest(
    store: &ManifestStore,
    old: &Path,
    new: &Path,
) -> anyhow::Result<ExitCode> {
    let old_path = absolute_path_string(old)?;
    let Some(old_manifest) = store.latest_manifest_for(&old_path)? else {
        error!("No existing manifest for {}", old_path);
        return Ok(BitrotExitCode::unclean());
    };

    let new_path = absolute_path_string(new)?;
    let Some(new_manifest) = store.latest_manifest_for(&new_path)? else {
        error!("No existing manifest for {}", new_path);
        return Ok(BitrotExitCode::unclean());
    };

    Ok(report_copy_verdict(&old_manifest, &new_manifest))
}

fn handle_list(store: &ManifestStore) -> anyhow::Result<ExitCode> {
    let entries = store.list()?;

    if entries.is_empty() {
        info!("No manifests stored in {}", store.root().display());
        return Ok(ExitCode::SUCCESS);
    }

    for entry in entries {
        println!("{}", entry.path);
        println!("    id: {}", entry.id);
        println!("    manifests: {}", entry.manifests.len());
    }

    Ok(ExitCode::SUCCESS)
}

/// Prints the comparison of two manifests that are expected to describe
/// identical trees and turns the outcome into an exit code. The copy is
/// affirmed only when the comparison is fully unchanged.
fn report_copy_verdict(old: &Manifest, new: &Manifest) -> ExitCode {
    let comparison = ManifestComparison::between(old, new);
    print!("{}", ComparisonReport::new(&comparison));

    if let Some(exit_code) = corruption_failure(&comparison) {
        return exit_code;
    }

    if comparison.is_unchanged() {
        info!(
            "Successfully validated {} as a copy of {}",
            new.path, old.path
        );
    }
    ExitCode::SUCCESS
}

/// The failure exit code when the comparison flagged paths, with the error
/// logged; `None` when nothing was flagged.
fn corruption_failure(comparison: &ManifestComparison) -> Option<ExitCode> {
    if !comparison.has_flagged() {
        return None;
    }

    error!(
        "{} file(s) flagged for possible corruption",
        comparison.flagged_paths.len()
    );
    Some(BitrotExitCode::unclean())
}

/// Canonical form of a user-supplied path, as the string used to key the
/// manifest store. A directory that no longer exists is resolved lexically
/// instead, so its stored manifests stay reachable after deletion.
fn absolute_path_string(path: &Path) -> anyhow::Result<String> {
    let absolute = match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => std::path::absolute(path)
            .with_context(|| format!("Failed to resolve {}", path.display()))?,
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to resolve {}", path.display()));
        }
    };
    let as_str = absolute
        .to_str()
        .with_context(|| format!("Path is not valid Unicode: {}", absolute.display()))?;
    Ok(as_str.to_string())
}

fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn init_tracing(verbose: u8) {
    // An explicit -v beats RUST_LOG; the environment only fills in when no
    // flag was given.
    let filter = if verbose > 0 {
        EnvFilter::new(default_log_level(verbose))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_log_level(0)))
    };

    let fmt_layer = tracing_fmt::layer()
        .event_format(LevelPrefixFormatter)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Writes one `LEVEL: message` line per event, with no timestamps or
/// targets, so stderr stays grep-friendly.
struct LevelPrefixFormatter;

impl<S, N> FormatEvent<S, N> for LevelPrefixFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        match *event.metadata().level() {
            Level::DEBUG => writer.write_str("DEBUG: ")?,
            Level::INFO => writer.write_str("INFO: ")?,
            Level::WARN => writer.write_str("WARN: ")?,
            Level::ERROR => writer.write_str("ERROR: ")?,
            _ => {}
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
