/// Device module - collaborator traits the frame loop drives

// Module declarations
pub mod handles;
pub mod graphics_device;
pub mod swapchain;
pub mod command_recorder;
pub mod window;

// Re-export everything
pub use handles::*;
pub use graphics_device::*;
pub use swapchain::*;
pub use command_recorder::*;
pub use window::*;

// Mock device, swapchain, recorder and window for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
