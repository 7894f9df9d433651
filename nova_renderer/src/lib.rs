/*!
# Nova Renderer

Core traits and types for the Nova frame-pacing renderer.

This crate is platform-agnostic. It owns the frame synchronization and
presentation pipeline and talks to the GPU only through trait objects that a
backend (see `nova_renderer_vulkan`) implements.

## Architecture

- **GraphicsDevice**: semaphores, fences, queue submission, device-idle wait
- **Swapchain**: presentable image set (acquire, present, recreate)
- **CommandRecorder**: one prerecorded unit of work per presentable image
- **WindowHost**: shutdown check, event polling, framebuffer size
- **FrameLoop**: drives `SlotWait → ImageAcquire → ImageClaim → Submit → Present → Advance`
  over a fixed pool of frame slots
*/

// Internal modules
mod error;
mod engine;
mod config;
pub mod log;
pub mod device;
pub mod frame;

// Main nova namespace module
pub mod nova {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine logging hub
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::{Config, DebugSeverity, PresentMode, ValidationStats};

    // Frame loop driver
    pub use crate::frame::FrameLoop;

    // Logging sub-module (types only; engine_* macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Collaborator traits and handle types
    pub mod device {
        pub use crate::device::*;
    }

    // Frame pacing types
    pub mod frame {
        pub use crate::frame::*;
    }
}

// Re-export math library at crate root
pub use glam;
