/// Submission coordinator - one GPU submission and one presentation per frame

use crate::error::{Error, Result};
use crate::device::{
    GraphicsDevice, Swapchain, SubmitInfo, PipelineStages, CommandBufferHandle, PresentStatus,
};
use crate::frame::FrameSlot;
use crate::engine_error;

/// Wires a slot's synchronization primitives into submit and present
#[derive(Debug, Default)]
pub struct SubmissionCoordinator {
    submissions: u64,
}

impl SubmissionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit `work` rendering into `image_index`
    ///
    /// Waits on `slot.acquire_signal` at color-attachment output, signals
    /// `slot.complete_signal`, and has the GPU signal `slot.retired_marker` on
    /// completion. Any failure becomes `Error::SubmissionFailed`.
    pub fn submit(
        &mut self,
        device: &dyn GraphicsDevice,
        slot: &FrameSlot,
        image_index: u32,
        work: CommandBufferHandle,
    ) -> Result<()> {
        let info = SubmitInfo {
            command_buffer: work,
            image_index,
            wait_semaphore: slot.acquire_signal,
            wait_stage: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: slot.complete_signal,
            fence: slot.retired_marker,
        };

        device.submit(&info).map_err(|e| {
            engine_error!(
                "nova::FrameLoop",
                "Submission for slot {} / image {} failed: {}",
                slot.index, image_index, e
            );
            match e {
                Error::SubmissionFailed(msg) => Error::SubmissionFailed(msg),
                other => Error::SubmissionFailed(other.to_string()),
            }
        })?;

        self.submissions += 1;
        Ok(())
    }

    /// Hand `image_index` to the presentation engine once the slot's work is done
    pub fn present(
        &self,
        swapchain: &mut dyn Swapchain,
        slot: &FrameSlot,
        image_index: u32,
    ) -> Result<PresentStatus> {
        swapchain.present(image_index, slot.complete_signal)
    }

    /// Successful submissions so far
    pub fn submissions(&self) -> u64 {
        self.submissions
    }
}

#[cfg(test)]
#[path = "submission_tests.rs"]
mod tests;
