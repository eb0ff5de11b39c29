//! Minimal stderr backend for the `log` facade.
//!
//! The level comes from the command line (`-v`, `-vv`, `-vvv`) or, when no
//! flag is given, from the `VIRTMEM_LOG` environment variable.

use std::io::{self, IsTerminal, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};

pub const LOG_ENV: &str = "VIRTMEM_LOG";

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut stderr = io::stderr().lock();
        let line = format!("[{:>5}][{}] {}", record.level(), record.target(), record.args());
        let _ = if stderr.is_terminal() {
            writeln!(stderr, "\u{1B}[{}m{}\u{1B}[0m", level_to_color_code(record.level()), line)
        } else {
            writeln!(stderr, "{}", line)
        };
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

fn level_to_color_code(level: Level) -> u8 {
    match level {
        Level::Error => 31,
        Level::Warn => 93,
        Level::Info => 34,
        Level::Debug => 32,
        Level::Trace => 90,
    }
}

/// Map a `-v` count to a level filter; zero defers to the environment.
pub fn level_from_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => level_from_env(std::env::var(LOG_ENV).ok().as_deref()),
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn level_from_env(value: Option<&str>) -> LevelFilter {
    match value.map(str::to_ascii_lowercase).as_deref() {
        Some("off") => LevelFilter::Off,
        Some("error") => LevelFilter::Error,
        Some("info") => LevelFilter::Info,
        Some("debug") => LevelFilter::Debug,
        Some("trace") => LevelFilter::Trace,
        _ => LevelFilter::Warn,
    }
}

/// Install the stderr logger. Calling it twice keeps the first logger but
/// still updates the level.
pub fn init(level: LevelFilter) {
    static LOGGER: StderrLogger = StderrLogger;
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_verbosity_flags() {
        assert_eq!(level_from_verbosity(1), LevelFilter::Info);
        assert_eq!(level_from_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_from_verbosity(3), LevelFilter::Trace);
        assert_eq!(level_from_verbosity(9), LevelFilter::Trace);
    }

    #[test]
    fn test_level_from_env() {
        assert_eq!(level_from_env(None), LevelFilter::Warn);
        assert_eq!(level_from_env(Some("DEBUG")), LevelFilter::Debug);
        assert_eq!(level_from_env(Some("off")), LevelFilter::Off);
        assert_eq!(level_from_env(Some("bogus")), LevelFilter::Warn);
    }
}
