//! Logger construction for the title-probe binary.
//!
//! Two layers: a `simplelog` terminal logger behind the global `log` facade
//! for start-up plumbing (config warnings), and the caller-owned
//! [`ScraperLogger`] built from the configuration, which the fetch engine
//! writes to.

use engine_logging::{engine_warn, LogFormat, ScraperLogger};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, ConfigBuilder, TermLogger, TerminalMode};

use crate::config::LoggingSettings;

pub const LOGGER_NAME: &str = "scraper";

/// Installs the terminal logger used before the configured logger exists.
///
/// Only warnings pass until [`apply_configured_level`] runs, so config
/// problems are reported before the configured level is known.
pub fn initialize_bootstrap() {
    // The terminal logger accepts everything; the facade's max level filters.
    let _ = TermLogger::init(
        LevelFilter::Trace,
        build_config(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
    log::set_max_level(LevelFilter::Warn);
}

/// Lets start-up messages through at the configured level.
pub fn apply_configured_level(settings: &LoggingSettings) {
    log::set_max_level(settings.level_filter());
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

/// Builds the engine's log sink. If the log file cannot be opened the
/// logger keeps only its console target.
pub fn build_scraper_logger(settings: &LoggingSettings) -> ScraperLogger {
    let mut builder = ScraperLogger::builder(LOGGER_NAME)
        .level(settings.level_filter())
        .file(&settings.file_path, LogFormat::parse(&settings.file_log_format))
        .max_file_bytes(settings.max_file_bytes());
    if settings.console_output {
        builder = builder.console(LogFormat::parse(&settings.console_log_format));
    }

    let (logger, err) = builder.build_degrading();
    if let Some(err) = err {
        engine_warn!(
            "Could not open log file {:?}: {}",
            settings.file_path,
            err
        );
    }
    logger
}
