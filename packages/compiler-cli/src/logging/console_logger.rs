// Console Logger
//
// Logger that writes `[LEVEL] message` lines to stderr.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::str::FromStr;

/// Console logger.
pub struct ConsoleLogger {
    level: LevelFilter,
}

impl ConsoleLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Install as the global logger. Fails when a logger is already set.
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(ConsoleLogger::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    pub fn format(record: &Record) -> String {
        format!("[{}] {}", record.level(), record.args())
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", Self::format(record));
        }
    }

    fn flush(&self) {}
}

/// Level from `--log-level`, else from the number of `-v` flags.
pub fn level_from_args(verbose: u8, log_level: Option<&str>) -> Result<LevelFilter, String> {
    if let Some(name) = log_level {
        return LevelFilter::from_str(name).map_err(|_| format!("unknown log level '{}'", name));
    }
    Ok(match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    })
}
