use core::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicUsize, Ordering},
};

use log::{LevelFilter, Metadata, Record};

use super::FileWriter;

const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

static LOGGER: FenvLogger = FenvLogger::new();

/// Installs the stderr logger with `level` as its filter.
pub fn init(level: LevelFilter) {
    LOGGER.set_filter(level);
    if log::set_logger(&LOGGER).is_err() {
        log::error!("Logger already initialized");
    }
    log::set_max_level(level);
}

/// Parses a level such as the value of `FENV_LOG_LEVEL`, falling back to the
/// default filter for anything unrecognised.
pub fn level_from_str(level: Option<&str>) -> LevelFilter {
    level
        .and_then(|level| LevelFilter::from_str(level.trim()).ok())
        .unwrap_or(DEFAULT_LOG_LEVEL)
}

/// Line oriented logger writing straight to file descriptor 2.
#[derive(Debug)]
pub struct FenvLogger {
    // LevelFilter as usize
    filter: AtomicUsize,
}

impl FenvLogger {
    pub const fn new() -> Self {
        Self {
            filter: AtomicUsize::new(DEFAULT_LOG_LEVEL as usize),
        }
    }

    pub fn set_filter(&self, filter: LevelFilter) {
        self.filter.store(filter as usize, Ordering::Relaxed);
    }

    pub fn filter(&self) -> LevelFilter {
        match self.filter.load(Ordering::Relaxed) {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Info,
            4 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn write_record<W: fmt::Write + ?Sized>(record: &Record, writer: &mut W) -> fmt::Result {
        let target = record.module_path().unwrap_or(record.target());
        let level = record.level();
        let message = record.args();
        let line = &LineFmt(record.line());
        writeln!(writer, "[{target}{line} {level}] {message}")
    }
}

impl Default for FenvLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl log::Log for FenvLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = Self::write_record(record, &mut FileWriter::new(2));
        }
    }

    fn flush(&self) {}
}

struct LineFmt(Option<u32>);
impl fmt::Display for LineFmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(line) = self.0 {
            write!(f, ":{line}")
        } else {
            write!(f, "")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn parses_levels() {
        assert_eq!(level_from_str(Some("trace")), LevelFilter::Trace);
        assert_eq!(level_from_str(Some(" WARN ")), LevelFilter::Warn);
        assert_eq!(level_from_str(Some("loud")), DEFAULT_LOG_LEVEL);
        assert_eq!(level_from_str(None), DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn filter_round_trips_through_atomic() {
        let logger = FenvLogger::new();
        assert_eq!(logger.filter(), LevelFilter::Info);
        logger.set_filter(LevelFilter::Debug);
        assert_eq!(logger.filter(), LevelFilter::Debug);
        logger.set_filter(LevelFilter::Off);
        assert_eq!(logger.filter(), LevelFilter::Off);
    }

    #[test]
    fn record_format() {
        let mut out = String::new();
        FenvLogger::write_record(
            &Record::builder()
                .args(format_args!("fesetround(3)"))
                .level(Level::Trace)
                .module_path(Some("armfenv::header::fenv"))
                .line(Some(42))
                .build(),
            &mut out,
        )
        .unwrap();
        assert_eq!(out, "[armfenv::header::fenv:42 TRACE] fesetround(3)\n");
    }
}
