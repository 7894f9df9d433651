//! Nova Engine - process-wide services shared by the core and its backends
//!
//! The only process-wide state is the logger. Frame pacing state is owned by
//! `FrameLoop` and never global.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global logger state (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<LoggerState>> = OnceLock::new();

/// Active logger and its minimum severity
struct LoggerState {
    logger: Box<dyn Logger>,
    level: LogSeverity,
}

fn logger_state() -> &'static RwLock<LoggerState> {
    LOGGER.get_or_init(|| {
        RwLock::new(LoggerState {
            logger: Box::new(DefaultLogger),
            level: LogSeverity::default_level(),
        })
    })
}

// ===== PUBLIC API =====

/// Engine-level services (logging)
///
/// # Example
///
/// ```no_run
/// use nova_renderer::nova::{Engine, log::{Logger, LogEntry, LogSeverity}};
///
/// struct FileLogger;
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
///
/// Engine::set_logger(FileLogger);
/// Engine::set_log_level(LogSeverity::Trace);
/// ```
pub struct Engine;

impl Engine {
    /// Set a custom logger
    ///
    /// Replace the default logger with a custom implementation (file logger, test capture, etc.)
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        if let Ok(mut state) = logger_state().write() {
            state.logger = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger) and the profile's default level
    pub fn reset_logger() {
        if let Ok(mut state) = logger_state().write() {
            state.logger = Box::new(DefaultLogger);
            state.level = LogSeverity::default_level();
        }
    }

    /// Set the minimum severity forwarded to the logger
    pub fn set_log_level(level: LogSeverity) {
        if let Ok(mut state) = logger_state().write() {
            state.level = level;
        }
    }

    /// Current minimum severity
    pub fn log_level() -> LogSeverity {
        logger_state()
            .read()
            .map(|state| state.level)
            .unwrap_or_else(|_| LogSeverity::default_level())
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    ///
    /// # Arguments
    ///
    /// * `severity` - Log severity level
    /// * `source` - Source module (e.g., "nova::FrameLoop")
    /// * `message` - Log message
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        Self::dispatch(severity, source, message, None, None);
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by engine_error!, engine_err! and engine_bail! to include source location.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        Self::dispatch(severity, source, message, Some(file), Some(line));
    }

    fn dispatch(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: Option<&'static str>,
        line: Option<u32>,
    ) {
        if let Ok(state) = logger_state().read() {
            if severity < state.level {
                return;
            }
            state.logger.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file,
                line,
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
