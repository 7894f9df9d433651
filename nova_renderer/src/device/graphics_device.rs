/// GraphicsDevice trait - synchronization primitives and queue submission

use std::time::Duration;
use bitflags::bitflags;
use crate::error::Result;
use crate::device::{SemaphoreHandle, FenceHandle, CommandBufferHandle};

bitflags! {
    /// Pipeline stages a submission waits at
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStages: u32 {
        /// Where the first write to a presentable image happens
        const COLOR_ATTACHMENT_OUTPUT = 1 << 0;
    }
}

/// One queue submission
///
/// Waits on `wait_semaphore` at `wait_stage`, signals `signal_semaphore` when the
/// work finishes and signals `fence` once everything in the batch has retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitInfo {
    /// Work to execute
    pub command_buffer: CommandBufferHandle,
    /// Presentable image the work renders into (used for diagnostics only)
    pub image_index: u32,
    /// Semaphore raised by the presentation engine when the image is usable
    pub wait_semaphore: SemaphoreHandle,
    /// Stage at which the wait applies
    pub wait_stage: PipelineStages,
    /// Semaphore raised when the work finishes (consumed by present)
    pub signal_semaphore: SemaphoreHandle,
    /// Marker signaled when the submission retires
    pub fence: FenceHandle,
}

/// GPU device interface used by the frame loop
///
/// Implemented by backend-specific devices (e.g., VulkanDevice). All calls are
/// made from the single thread that drives the frame loop.
pub trait GraphicsDevice: Send + Sync {
    /// Create a binary semaphore
    fn create_semaphore(&self) -> Result<SemaphoreHandle>;

    /// Destroy a semaphore (must not be in use by the GPU)
    fn destroy_semaphore(&self, semaphore: SemaphoreHandle);

    /// Create a fence
    ///
    /// # Arguments
    ///
    /// * `signaled` - Create the fence in the signaled state
    fn create_fence(&self, signaled: bool) -> Result<FenceHandle>;

    /// Destroy a fence (must not be pending)
    fn destroy_fence(&self, fence: FenceHandle);

    /// Block until the fence is signaled
    ///
    /// # Arguments
    ///
    /// * `fence` - Fence to wait on
    /// * `timeout` - Upper bound on the wait (`None` waits forever)
    ///
    /// # Errors
    ///
    /// `Error::Timeout` if the bound expires, `Error::DeviceLost` if the device is lost
    fn wait_for_fence(&self, fence: FenceHandle, timeout: Option<Duration>) -> Result<()>;

    /// Return a fence to the unsignaled state
    fn reset_fence(&self, fence: FenceHandle) -> Result<()>;

    /// Signal a fence through an empty queue submission
    ///
    /// Used to re-arm a marker that was reset for work that never got submitted.
    fn signal_fence(&self, fence: FenceHandle) -> Result<()>;

    /// Non-blocking fence status query
    fn is_fence_signaled(&self, fence: FenceHandle) -> Result<bool>;

    /// Submit one batch of work to the graphics queue
    fn submit(&self, info: &SubmitInfo) -> Result<()>;

    /// Block until the device has finished all submitted work
    fn wait_idle(&self) -> Result<()>;
}
