//! Error types for the Nova renderer
//!
//! This module defines the error taxonomy used by the frame pacing core and
//! its backends: recoverable surface conditions, fatal device/surface loss,
//! submission failures, timeouts, and generic backend failures.

use std::fmt;

/// Result type for Nova renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Nova renderer errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Surface properties no longer match the swapchain (recreate required)
    SurfaceOutOfDate,

    /// Swapchain still works but no longer matches the surface exactly
    SurfaceSuboptimal,

    /// Presentation surface is gone (fatal)
    SurfaceLost,

    /// Logical device is gone (fatal)
    DeviceLost,

    /// GPU queue submission failed (fatal for the current frame)
    SubmissionFailed(String),

    /// A CPU wait on a GPU completion marker did not finish in time
    Timeout(String),

    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of host or device memory
    OutOfMemory,

    /// Invalid resource or argument (handle, index, configuration value)
    InvalidResource(String),

    /// Initialization failed (device, swapchain, subsystems)
    InitializationFailed(String),
}

impl Error {
    /// Whether the frame loop can recover by rebuilding the swapchain
    ///
    /// Only out-of-date and suboptimal surfaces are recoverable; everything
    /// else stops the loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::SurfaceOutOfDate | Error::SurfaceSuboptimal)
    }

    /// Whether this error means the GPU context itself is unusable
    pub fn is_device_fatal(&self) -> bool {
        matches!(self, Error::SurfaceLost | Error::DeviceLost)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SurfaceOutOfDate => write!(f, "Surface out of date"),
            Error::SurfaceSuboptimal => write!(f, "Surface suboptimal"),
            Error::SurfaceLost => write!(f, "Surface lost"),
            Error::DeviceLost => write!(f, "Device lost"),
            Error::SubmissionFailed(msg) => write!(f, "Submission failed: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
