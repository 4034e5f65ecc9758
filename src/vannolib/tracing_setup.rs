use crate::cfg::{get_log_folder, LogCfg, LogLevel};
use backtrace::Backtrace;
use std::{cell::RefCell, io};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{writer::MakeWriterExt, Layer},
    prelude::*,
};

thread_local! {
    pub static BACKTRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Logs to stdout and to a daily rolling file `<file_prefix>.<date>` in the log folder. Keep the
/// returned guard alive, dropping it stops flushing to the file.
/// # Panics
/// In case tracing cannot be setup properly.
pub fn tracing_setup(log_cfg: &LogCfg) -> WorkerGuard {
    let level = Level::from(log_cfg.level);
    let file_appender = tracing_appender::rolling::daily(get_log_folder(), &log_cfg.file_prefix);
    let (file_appender, guard_flush_file) = tracing_appender::non_blocking(file_appender);
    let file_appender = Layer::new()
        .with_writer(file_appender.with_max_level(level))
        .with_line_number(true)
        .compact()
        .with_ansi(false)
        .with_file(true);
    #[cfg(feature = "print_debug")]
    let level = level.max(Level::DEBUG);
    let stdout = Layer::new()
        .with_writer(io::stdout.with_max_level(level))
        .with_file(true)
        .with_line_number(true);
    tracing_subscriber::registry()
        .with(file_appender)
        .with(stdout)
        .init();
    std::panic::set_hook(Box::new(|_| {
        let trace = Backtrace::new();
        BACKTRACE.with(move |b| b.borrow_mut().replace(trace));
    }));
    guard_flush_file
}

use std::sync::Once;
static INIT: Once = Once::new();

pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .init();
    });
}

#[test]
fn test_log_levels() {
    assert_eq!(Level::from(LogCfg::default().level), Level::INFO);
    assert_eq!(Level::from(LogLevel::Debug), Level::DEBUG);
    assert!(Level::from(LogLevel::Trace) > Level::from(LogLevel::Error));
}
