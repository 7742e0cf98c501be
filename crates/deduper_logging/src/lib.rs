#![deny(missing_docs)]
//! Shared logging utilities for the deduper workspace.
//!
//! This crate provides the `deduper_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every line is tagged
//! with [`PREFIX`] so output from the content-side pipeline is easy to grep
//! out of a mixed log.

/// Tag prepended to every message emitted through the macros below.
pub const PREFIX: &str = "[Deduper]";

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! deduper_trace {
    ($($arg:tt)*) => {{
        log::trace!("{} {}", $crate::PREFIX, format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! deduper_info {
    ($($arg:tt)*) => {{
        log::info!("{} {}", $crate::PREFIX, format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! deduper_debug {
    ($($arg:tt)*) => {{
        log::debug!("{} {}", $crate::PREFIX, format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! deduper_warn {
    ($($arg:tt)*) => {{
        log::warn!("{} {}", $crate::PREFIX, format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! deduper_error {
    ($($arg:tt)*) => {{
        log::error!("{} {}", $crate::PREFIX, format_args!($($arg)*));
    }};
}

/// Environment variable overriding the test log level (`trace`, `debug`, ...).
pub const TEST_LEVEL_VAR: &str = "DEDUPER_TEST_LOG";

/// Initializes a terminal logger for use in tests.
///
/// Defaults to `debug`; [`TEST_LEVEL_VAR`] overrides it. Calling this again,
/// or after another logger was installed, does nothing.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, TermLogger, TerminalMode};

    let level = test_level(std::env::var(TEST_LEVEL_VAR).ok().as_deref());
    let config = ConfigBuilder::new()
        .set_target_level(log::LevelFilter::Off)
        .build();

    // Another test may have installed the logger already.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn test_level(requested: Option<&str>) -> log::LevelFilter {
    requested
        .and_then(|value| value.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Debug)
}
