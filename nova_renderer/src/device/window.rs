/// WindowHost trait - the frame loop's view of the OS window

use crate::device::Extent2D;

/// Window services needed by the frame loop
pub trait WindowHost {
    /// True once the user asked to close the window
    fn should_close(&self) -> bool;

    /// Process pending OS events without blocking
    fn poll_events(&mut self);

    /// Current framebuffer size in pixels (zero while minimized)
    fn framebuffer_size(&self) -> Extent2D;

    /// Return and clear the "window was resized" notification
    fn take_resized(&mut self) -> bool {
        false
    }
}
