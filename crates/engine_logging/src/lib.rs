#![deny(missing_docs)]
//! Shared logging utilities for the title probe workspace.
//!
//! This crate provides:
//! - the [`LogSink`] seam the fetch engine writes its records to,
//! - [`ScraperLogger`], a caller-owned file/console sink with python-style
//!   record templates,
//! - [`MemorySink`] for tests and embedding,
//! - the `engine_*` macros over the global `log` facade, used for plumbing
//!   messages emitted before any sink exists.

mod format;
mod sink;

pub use format::{level_name, parse_level_name, LogFormat};
pub use sink::{LogSink, MemorySink, ScraperLogger, ScraperLoggerBuilder};

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
