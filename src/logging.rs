//! Logger setup for the demo binary.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Maps the count of `-v` flags to a level filter.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn target_for(log_output: Option<&Path>) -> Target {
    let Some(log_path) = log_output else {
        return Target::Stderr;
    };
    match File::create(log_path) {
        Ok(file) => Target::Pipe(Box::new(file) as Box<dyn Write + Send>),
        Err(err) => {
            eprintln!(
                "Could not create log file at {}: {}. Logging to stderr.",
                log_path.display(),
                err
            );
            Target::Stderr
        }
    }
}

/// Installs the global logger. `RUST_LOG` is read first, the verbosity then
/// overrides its default level.
pub fn setup_logger(verbosity: u8, log_output: Option<&Path>) {
    Builder::from_default_env()
        .format_timestamp(None)
        .filter_level(level_for(verbosity))
        .target(target_for(log_output))
        .init();
}
