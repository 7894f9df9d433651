/// Renderer configuration and validation-layer settings

use std::time::Duration;
use glam::Vec4;
use crate::error::{Error, Result};

/// Validation layer message severity filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything including verbose and info
    All,
}

/// Preferred presentation mode
///
/// FIFO is always available and is used when the preferred mode is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentMode {
    /// Triple-buffered, no tearing, latest image wins
    Mailbox,
    /// V-sync queue
    Fifo,
    /// No synchronization with the display (may tear)
    Immediate,
}

/// Validation message counters collected by the debug messenger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    /// Total number of messages across all severities
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }

    /// True if any error-severity message was reported
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Window title
    pub window_title: String,
    /// Initial window width in pixels
    pub window_width: u32,
    /// Initial window height in pixels
    pub window_height: u32,
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Validation message filter
    pub debug_severity: DebugSeverity,
    /// Number of frame slots (frames the CPU may run ahead of the GPU)
    pub max_frames_in_flight: usize,
    /// Bound on every CPU wait for a retired marker (`None` waits forever)
    pub fence_timeout: Option<Duration>,
    /// Retry a timed-out wait once (with a warning) before failing
    pub retry_on_timeout: bool,
    /// Preferred presentation mode
    pub present_mode: PresentMode,
    /// Color the render pass clears every image to
    pub clear_color: Vec4,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Nova Application".to_string(),
            app_version: (1, 0, 0),
            window_title: "Nova".to_string(),
            window_width: 800,
            window_height: 600,
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            max_frames_in_flight: 2,
            fence_timeout: Some(Duration::from_secs(10)),
            retry_on_timeout: true,
            present_mode: PresentMode::Mailbox,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

impl Config {
    /// Check the configuration before any GPU object is created
    pub fn validate(&self) -> Result<()> {
        if self.max_frames_in_flight == 0 {
            return Err(Error::InitializationFailed(
                "max_frames_in_flight must be at least 1".to_string(),
            ));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(Error::InitializationFailed(format!(
                "Invalid window size {}x{}",
                self.window_width, self.window_height
            )));
        }
        if let Some(timeout) = self.fence_timeout {
            if timeout.is_zero() {
                return Err(Error::InitializationFailed(
                    "fence_timeout must be non-zero (use None to wait forever)".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
