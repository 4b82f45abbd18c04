//! Logger installation for the binaries.
//!
//! The library only talks to the `log` facade. `RUST_LOG` always wins over
//! the configured console filter. An optional log file receives every record
//! at debug and above, whatever the console shows.

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Logger, Target, WriteStyle};
use log::{LevelFilter, Log, Metadata, Record};

/// Install the console logger with `default_filter` unless `RUST_LOG` is set,
/// plus a debug-level file logger when `log_file` is given.
///
/// The file is appended to and its parent directories are created. Calling
/// this when a logger is already installed is not an error.
pub fn init(default_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let console = Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .build();

    let file = match log_file {
        Some(path) => Some(file_logger(path)?),
        None => None,
    };

    let max_level = file
        .as_ref()
        .map_or(console.filter(), |file| console.filter().max(file.filter()));
    if log::set_boxed_logger(Box::new(Split { console, file })).is_ok() {
        log::set_max_level(max_level);
    } else {
        log::debug!("logger already installed");
    }
    Ok(())
}

fn file_logger(path: &Path) -> Result<Logger> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    Ok(Builder::new()
        .filter_level(LevelFilter::Debug)
        .target(Target::Pipe(Box::new(file)))
        .write_style(WriteStyle::Never)
        .format_timestamp_millis()
        .build())
}

/// Console output plus an optional file, each with its own filter.
struct Split {
    console: Logger,
    file: Option<Logger>,
}

impl Log for Split {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata)
            || self.file.as_ref().is_some_and(|file| file.enabled(metadata))
    }

    fn log(&self, record: &Record) {
        self.console.log(record);
        if let Some(file) = &self.file {
            file.log(record);
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Some(file) = &self.file {
            file.flush();
        }
    }
}
