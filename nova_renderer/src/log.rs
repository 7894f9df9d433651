//! Renderer log stream
//!
//! Every component reports through the `engine_*!` macros, tagged with a source
//! such as `nova::FrameLoop` or `nova::vulkan::validation`. Entries go to the
//! logger installed in `Engine`; the default one prints colored lines, sending
//! warnings and errors to stderr. Errors carry the file and line they were
//! raised at.

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Sink for renderer log entries
///
/// Install one with `Engine::set_logger` to redirect output, e.g. to count
/// recreations or capture lines in tests.
///
/// # Example
///
/// ```no_run
/// use nova_renderer::nova::log::{Logger, LogEntry, LogSeverity};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// /// Counts warnings raised by the frame loop (timeout retries and the like)
/// struct FrameWarnings(AtomicUsize);
///
/// impl Logger for FrameWarnings {
///     fn log(&self, entry: &LogEntry) {
///         if entry.severity == LogSeverity::Warn && entry.source == "nova::FrameLoop" {
///             self.0.fetch_add(1, Ordering::Relaxed);
///         }
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

/// One log line before formatting
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,

    /// Wall-clock time the entry was raised
    pub timestamp: SystemTime,

    /// Component tag (`nova::FrameLoop`, `nova::vulkan`, `nova::demo`, ...)
    pub source: String,

    pub message: String,

    /// Raising file, set for `engine_error!`/`engine_err!` entries only
    pub file: Option<&'static str>,

    /// Raising line, set together with `file`
    pub line: Option<u32>,
}

/// Log severity levels, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Per-frame detail (stage transitions, skipped frames)
    Trace,

    /// Recoverable events (out-of-date surfaces, rebuilt command buffers)
    Debug,

    /// Lifecycle (device selection, swapchain creation, recreation, shutdown)
    Info,

    /// Degraded but continuing (timeout retries, failed idle waits)
    Warn,

    /// Failures that stop the frame loop or a backend call
    Error,
}

impl LogSeverity {
    /// Debug in debug builds, Info in release builds
    pub fn default_level() -> Self {
        if cfg!(debug_assertions) {
            LogSeverity::Debug
        } else {
            LogSeverity::Info
        }
    }
}

/// Console logger: `[time] [LEVEL] [source] message`, plus ` (file:line)` on errors

pub struct DefaultLogger;

impl DefaultLogger {
    /// One console line, without the trailing newline
    pub fn format_entry(entry: &LogEntry) -> String {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let severity_str = match entry.severity {
            LogSeverity::Trace => "TRACE".bright_black(),
            LogSeverity::Debug => "DEBUG".cyan(),
            LogSeverity::Info => "INFO ".green(),
            LogSeverity::Warn => "WARN ".yellow(),
            LogSeverity::Error => "ERROR".red().bold(),
        };

        let source = entry.source.bright_blue();

        if let (Some(file), Some(line)) = (entry.file, entry.line) {
            format!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity_str, source, entry.message, file, line
            )
        } else {
            format!(
                "[{}] [{}] [{}] {}",
                timestamp, severity_str, source, entry.message
            )
        }
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let line = Self::format_entry(entry);
        if entry.severity >= LogSeverity::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

// ===== LOGGING MACROS =====

/// Per-frame detail
///
/// ```no_run
/// nova_renderer::engine_trace!("nova::FrameLoop", "Frame on slot {} rendered image {}", 0, 2);
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::nova::Engine::log(
            $crate::nova::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Recoverable event
#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::nova::Engine::log(
            $crate::nova::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Lifecycle event
///
/// ```no_run
/// nova_renderer::engine_info!("nova::FrameLoop", "Recreating swapchain at {}x{}", 1280, 720);
/// ```
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::nova::Engine::log(
            $crate::nova::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Degraded but continuing
#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::nova::Engine::log(
            $crate::nova::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Failure, recorded with the raising file and line
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::nova::Engine::log_detailed(
            $crate::nova::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// `engine_error!` that also evaluates to `Error::BackendError` with the same text
///
/// Meant for `map_err` on backend calls:
///
/// ```no_run
/// use nova_renderer::nova::Error;
/// let err: Error = nova_renderer::engine_err!("nova::vulkan", "Failed to create framebuffer for image {}", 1);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::nova::Engine::log_detailed(
            $crate::nova::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::nova::Error::BackendError(message)
    }};
}

/// Early `return Err(..)` form of `engine_err!`
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
