use chrono::Utc;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Environment variable selecting the maximum level (`error` .. `trace`).
pub const LOG_LEVEL_ENV: &str = "TOUCHDOWN_LOG";

/// Coloured, timestamped console backend for the `log` facade.
pub struct ConsoleLogger {
    level: LevelFilter,
}

impl ConsoleLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    fn colour(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[35m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[33m",
            Level::Trace => "\x1b[36m",
        }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        println!(
            "{}[{:<5}][{}]\x1b[0m {}",
            Self::colour(record.level()),
            record.level(),
            Utc::now().format("%H:%M:%S%.3f"),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Parse a level name; unknown names fall back to `info`.
pub fn level_from_str(name: &str) -> LevelFilter {
    name.trim().parse().unwrap_or(LevelFilter::Info)
}

/// Install the console logger at the level named by `TOUCHDOWN_LOG` (default `info`).
pub fn init() -> Result<(), SetLoggerError> {
    let level = std::env::var(LOG_LEVEL_ENV)
        .map(|name| level_from_str(&name))
        .unwrap_or(LevelFilter::Info);
    log::set_boxed_logger(Box::new(ConsoleLogger::new(level)))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("debug", LevelFilter::Debug ; "lower case")]
    #[test_case("WARN", LevelFilter::Warn ; "upper case")]
    #[test_case(" trace ", LevelFilter::Trace ; "padded")]
    #[test_case("loud", LevelFilter::Info ; "unknown")]
    fn parses_level_names(name: &str, expected: LevelFilter) {
        assert_eq!(level_from_str(name), expected);
    }

    #[test]
    fn filters_by_level() {
        let logger = ConsoleLogger::new(LevelFilter::Warn);
        let warn = Metadata::builder().level(Level::Warn).build();
        let info = Metadata::builder().level(Level::Info).build();
        assert!(logger.enabled(&warn));
        assert!(!logger.enabled(&info));
    }
}
