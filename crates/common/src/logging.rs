// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Tracing subscribers for the vartree binaries and tests
//!
//! Interactive output goes to stderr so that rendered trees on stdout can be
//! piped. With `--log-file` a second, more verbose layer writes a daily
//! rotated file under `$TMPDIR/vartree-logs/<component>/`. `RUST_LOG`
//! overrides the default level of every layer.

use std::{io, path::PathBuf, sync::Once};

use eyre::{Result, WrapErr};
use tracing::Level;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Directory name under the system temp folder that holds log files
pub const LOG_ROOT: &str = "vartree-logs";

static TEST_SUBSCRIBER: Once = Once::new();

/// Install the global subscriber for `component`
///
/// Fails if a global subscriber is already set.
///
/// ```rust,no_run
/// fn main() -> eyre::Result<()> {
///     vartree_common::logging::init_logging("vartree", false)?;
///     tracing::info!("ready");
///     Ok(())
/// }
/// ```
pub fn init_logging(component: &str, to_file: bool) -> Result<()> {
    let stderr = fmt::layer()
        .with_timer(LocalTime::rfc_3339())
        .with_writer(io::stderr)
        .with_filter(level_filter(Level::INFO));

    let Some(dir) = to_file.then(|| log_dir(component)).transpose()? else {
        tracing_subscriber::registry()
            .with(stderr)
            .try_init()
            .wrap_err("tracing subscriber already installed")?;
        tracing::debug!(component, "stderr logging enabled");
        return Ok(());
    };

    let (writer, guard) = non_blocking(rolling::daily(&dir, format!("{component}.log")));
    // Flushed on drop; the writer must outlive every span in the process
    std::mem::forget(guard);

    let file = fmt::layer()
        .with_timer(LocalTime::rfc_3339())
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(level_filter(Level::DEBUG));

    tracing_subscriber::registry()
        .with(stderr)
        .with(file)
        .try_init()
        .wrap_err("tracing subscriber already installed")?;
    tracing::info!(component, dir = %dir.display(), "file logging enabled");
    Ok(())
}

/// Install a compact test-writer subscriber once per process
///
/// Safe to call from every test. `level` defaults to INFO; a subscriber
/// installed by someone else first is left in place.
pub fn ensure_test_logging(level: Option<Level>) {
    TEST_SUBSCRIBER.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(level_filter(level.unwrap_or(Level::INFO)))
            .with_target(false)
            .with_test_writer()
            .compact()
            .try_init();
    });
}

fn log_dir(component: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(LOG_ROOT).join(component);
    std::fs::create_dir_all(&dir)
        .wrap_err_with(|| format!("cannot create log directory {}", dir.display()))?;
    Ok(dir)
}

fn level_filter(default: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default.as_str()))
}
