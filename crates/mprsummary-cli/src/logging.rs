// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! File-only tracing setup. The terminal belongs to the widget, so nothing is
//! written to stdout; each launch gets its own timestamped file and old files
//! are pruned to a fixed count.

use anyhow::{Context, Result, anyhow};
use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::config::APP_NAME;

const MAX_LOG_FILES: usize = 10;
const LOG_DIR_ENV: &str = "MPRSUMMARY_LOG_DIR";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. Later calls are no-ops. Returns the path of
/// this launch's log file.
pub fn init(log_dir: &Path) -> Result<PathBuf> {
    let log_file_name = format_log_file_name(now_local_or_utc())?;
    let log_path = log_dir.join(&log_file_name);
    if LOG_GUARD.get().is_some() {
        return Ok(log_path);
    }

    fs::create_dir_all(log_dir)
        .with_context(|| format!("create log directory {}", log_dir.display()))?;
    ensure_file_exists(&log_path)?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(rolling::never(log_dir, &log_file_name));
    prune_old_logs(log_dir, MAX_LOG_FILES)?;

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_timer(build_timer())
        .with_writer(file_writer);
    let subscriber = Registry::default().with(build_env_filter()).with(file_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|error| anyhow!("install global tracing subscriber: {error}"))?;
    let _ = LOG_GUARD.set(guard);

    tracing::info!(path = %log_path.display(), "logging initialized");
    Ok(log_path)
}

/// `MPRSUMMARY_LOG_DIR` if set, else `<data dir>/mprsummary/logs`.
pub fn default_log_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(LOG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory for logs; set {LOG_DIR_ENV}")
    })?;
    Ok(data_dir.join(APP_NAME).join("logs"))
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("create log file {}", path.display()))?;
    Ok(())
}

fn prune_old_logs(dir: &Path, max_files: usize) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("read log directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
        .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("log"))
        .map(|entry| {
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.path())
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|(modified, _)| *modified);
    let excess = entries.len().saturating_sub(max_files);
    for (_, path) in entries.into_iter().take(excess) {
        fs::remove_file(&path)
            .with_context(|| format!("remove old log file {}", path.display()))?;
    }
    Ok(())
}

fn format_log_file_name(now: OffsetDateTime) -> Result<String> {
    const NAME_FORMAT: &[BorrowedFormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let name = now.format(NAME_FORMAT).context("format log file name")?;
    Ok(format!("{APP_NAME}_{name}.log"))
}

fn build_timer() -> fmt::time::OffsetTime<BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::{ensure_file_exists, format_log_file_name, prune_old_logs};
    use anyhow::Result;
    use std::fs;
    use std::thread;
    use std::time::Duration;
    use time::OffsetDateTime;

    #[test]
    fn log_file_name_has_prefix_and_timestamp() -> Result<()> {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000)?;
        assert_eq!(
            format_log_file_name(fixed)?,
            "mprsummary_2023-11-14_22-13-20.log"
        );
        Ok(())
    }

    #[test]
    fn prune_keeps_newest_log_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for index in 0..12 {
            ensure_file_exists(&dir.path().join(format!("mprsummary_{index}.log")))?;
            thread::sleep(Duration::from_millis(10));
        }
        fs::write(dir.path().join("notes.txt"), "keep")?;

        prune_old_logs(dir.path(), 10)?;

        let mut remaining = fs::read_dir(dir.path())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        remaining.sort();
        assert_eq!(remaining.len(), 11);
        assert!(remaining.contains(&"notes.txt".to_owned()));
        assert!(!remaining.contains(&"mprsummary_0.log".to_owned()));
        assert!(!remaining.contains(&"mprsummary_1.log".to_owned()));
        assert!(remaining.contains(&"mprsummary_11.log".to_owned()));
        Ok(())
    }
}
