/// Frame loop driver - per-iteration orchestration of the frame slot ring
///
/// Every iteration walks `SlotWait → ImageAcquire → ImageClaim → Submit →
/// Present → Advance`. The order never changes; an out-of-date acquisition
/// short-circuits to `Advance` after rebuilding the image set.

use std::sync::Arc;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::device::{GraphicsDevice, Swapchain, CommandRecorder, WindowHost, Extent2D, PresentStatus};
use crate::frame::{FrameSlotPool, ImagesInFlight, SubmissionCoordinator, WaitPolicy};
use crate::{engine_debug, engine_error, engine_info, engine_trace, engine_warn};

// ============================================================================
// Stage trace and reports
// ============================================================================

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStage {
    Idle,
    /// Recreation path (device idle, recorder teardown, swapchain rebuild)
    Recreate,
    SlotWait,
    ImageAcquire,
    ImageClaim,
    Submit,
    Present,
    Advance,
}

const MAX_TRACE: usize = 8;

/// Stages visited during one iteration, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTrace {
    stages: [FrameStage; MAX_TRACE],
    len: usize,
}

impl StageTrace {
    fn new() -> Self {
        Self { stages: [FrameStage::Idle; MAX_TRACE], len: 0 }
    }

    fn push(&mut self, stage: FrameStage) {
        debug_assert!(self.len < MAX_TRACE, "stage trace overflow");
        if self.len < MAX_TRACE {
            self.stages[self.len] = stage;
            self.len += 1;
        }
    }

    pub fn as_slice(&self) -> &[FrameStage] {
        &self.stages[..self.len]
    }

    /// Number of times `stage` was entered
    pub fn count(&self, stage: FrameStage) -> usize {
        self.as_slice().iter().filter(|s| **s == stage).count()
    }
}

/// How an iteration ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Submitted and presented
    Presented,
    /// Presented, but the surface no longer matches; recreation is pending
    Suboptimal,
    /// Submitted, but presentation reported the surface out of date; recreation is pending
    PresentOutOfDate,
    /// The surface was out of date at acquisition or during a rebuild; nothing was submitted
    SkippedOutOfDate,
    /// Framebuffer has a zero dimension; nothing was touched
    SkippedMinimized,
}

/// Outcome of one `draw_frame` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Slot index used by the iteration
    pub frame_index: usize,
    /// Acquired image, if acquisition succeeded
    pub image_index: Option<u32>,
    pub status: FrameStatus,
    pub trace: StageTrace,
}

/// Frame loop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub iterations: u64,
    pub frames_presented: u64,
    pub frames_skipped: u64,
    pub recreations: u64,
    pub submissions: u64,
}

// ============================================================================
// Frame context
// ============================================================================

/// Mutable pacing state owned by the driver
pub struct FrameContext {
    /// Slot used by the next iteration, in `[0, N)`
    pub current_frame: usize,
    pub pool: FrameSlotPool,
    pub images_in_flight: ImagesInFlight,
    /// Recreation requested by a suboptimal/out-of-date result or a resize
    pub needs_recreate: bool,
}

// ============================================================================
// Frame loop
// ============================================================================

/// Frame loop driver
///
/// Owns the swapchain, the command recorder and all pacing state. Fields drop
/// in declaration order after `Drop::drop` has released the slot pool and the
/// recorder's resources, so the swapchain goes before the device.
pub struct FrameLoop {
    context: FrameContext,
    coordinator: SubmissionCoordinator,
    stats: FrameStats,
    policy: WaitPolicy,
    recorder: Box<dyn CommandRecorder>,
    swapchain: Box<dyn Swapchain>,
    device: Arc<dyn GraphicsDevice>,
}

impl FrameLoop {
    /// Build the loop: validate `config`, record per-image work, create N slots
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        swapchain: Box<dyn Swapchain>,
        mut recorder: Box<dyn CommandRecorder>,
        config: &Config,
    ) -> Result<Self> {
        config.validate()?;

        recorder.build(swapchain.images(), swapchain.extent(), swapchain.format())?;

        let pool = match FrameSlotPool::new(device.as_ref(), config.max_frames_in_flight) {
            Ok(pool) => pool,
            Err(e) => {
                recorder.destroy();
                return Err(e);
            }
        };
        let images_in_flight = ImagesInFlight::new(swapchain.image_count());

        engine_info!(
            "nova::FrameLoop",
            "Frame loop ready: {} frames in flight, {} presentable images ({}x{})",
            pool.len(),
            swapchain.image_count(),
            swapchain.extent().width,
            swapchain.extent().height
        );

        Ok(Self {
            context: FrameContext {
                current_frame: 0,
                pool,
                images_in_flight,
                needs_recreate: false,
            },
            coordinator: SubmissionCoordinator::new(),
            stats: FrameStats::default(),
            policy: WaitPolicy {
                timeout: config.fence_timeout,
                retry_once: config.retry_on_timeout,
            },
            recorder,
            swapchain,
            device,
        })
    }

    /// Run until the window asks to close
    ///
    /// Polls events, forwards resize notifications and draws one frame per
    /// iteration. On a fatal error the device is drained and the error returned.
    /// On normal exit the device is drained before returning the counters.
    pub fn run(&mut self, window: &mut dyn WindowHost) -> Result<FrameStats> {
        while !window.should_close() {
            window.poll_events();
            if window.take_resized() {
                self.request_recreate();
            }

            if let Err(e) = self.draw_frame(window.framebuffer_size()) {
                if e.is_device_fatal() {
                    engine_error!("nova::FrameLoop", "GPU context lost, frame loop stopped: {}", e);
                } else {
                    engine_error!("nova::FrameLoop", "Frame loop stopped: {}", e);
                }
                if let Err(idle) = self.device.wait_idle() {
                    engine_warn!("nova::FrameLoop", "Device idle wait after failure also failed: {}", idle);
                }
                return Err(e);
            }
        }

        self.device.wait_idle()?;
        engine_info!(
            "nova::FrameLoop",
            "Frame loop finished: {} presented, {} skipped, {} recreations",
            self.stats.frames_presented,
            self.stats.frames_skipped,
            self.stats.recreations
        );
        Ok(self.stats)
    }

    /// Run one iteration of the state machine
    ///
    /// # Arguments
    ///
    /// * `framebuffer` - Current window framebuffer size (used for recreation)
    ///
    /// # Errors
    ///
    /// Only fatal errors are returned; out-of-date and suboptimal results are
    /// absorbed by the recreation path, including when the rebuild itself
    /// reports them.
    pub fn draw_frame(&mut self, framebuffer: Extent2D) -> Result<FrameReport> {
        let mut trace = StageTrace::new();
        trace.push(FrameStage::Idle);
        self.stats.iterations += 1;

        let frame_index = self.context.current_frame;

        if framebuffer.is_empty() {
            engine_trace!("nova::FrameLoop", "Framebuffer is {}x{}, skipping frame", framebuffer.width, framebuffer.height);
            self.stats.frames_skipped += 1;
            return Ok(FrameReport {
                frame_index,
                image_index: None,
                status: FrameStatus::SkippedMinimized,
                trace,
            });
        }

        if self.context.needs_recreate {
            trace.push(FrameStage::Recreate);
            if !self.try_recreate(framebuffer)? {
                // Nothing consumed; the same slot retries next iteration
                self.stats.frames_skipped += 1;
                return Ok(FrameReport {
                    frame_index,
                    image_index: None,
                    status: FrameStatus::SkippedOutOfDate,
                    trace,
                });
            }
        }

        // SlotWait
        trace.push(FrameStage::SlotWait);
        let slot = self.context.pool.wait_and_reset(self.device.as_ref(), frame_index, self.policy)?;

        // ImageAcquire
        trace.push(FrameStage::ImageAcquire);
        let acquired = match self.swapchain.acquire_next_image(slot.acquire_signal) {
            Ok(acquired) => acquired,
            Err(e) if e.is_recoverable() => {
                engine_debug!("nova::FrameLoop", "Acquire on slot {} reported {}, rebuilding", frame_index, e);
                // The marker was reset for work that will never be submitted
                self.context.pool.rearm(self.device.as_ref(), frame_index)?;
                trace.push(FrameStage::Recreate);
                self.try_recreate(framebuffer)?;
                self.advance(&mut trace);
                self.stats.frames_skipped += 1;
                return Ok(FrameReport {
                    frame_index,
                    image_index: None,
                    status: FrameStatus::SkippedOutOfDate,
                    trace,
                });
            }
            Err(e) => {
                engine_error!("nova::FrameLoop", "Failed to acquire image on slot {}: {}", frame_index, e);
                return Err(e);
            }
        };
        let image_index = acquired.image_index;
        if acquired.suboptimal {
            self.context.needs_recreate = true;
        }

        // ImageClaim
        trace.push(FrameStage::ImageClaim);
        self.context.images_in_flight.claim(
            self.device.as_ref(),
            image_index,
            slot.retired_marker,
            self.policy,
        )?;

        // Submit
        trace.push(FrameStage::Submit);
        let work = self.recorder.commands(image_index)?;
        self.coordinator.submit(self.device.as_ref(), &slot, image_index, work)?;
        self.stats.submissions = self.coordinator.submissions();

        // Present
        trace.push(FrameStage::Present);
        let status = match self.coordinator.present(self.swapchain.as_mut(), &slot, image_index) {
            Ok(PresentStatus::Optimal) if !acquired.suboptimal => FrameStatus::Presented,
            Ok(_) | Err(Error::SurfaceSuboptimal) => {
                self.context.needs_recreate = true;
                FrameStatus::Suboptimal
            }
            Err(Error::SurfaceOutOfDate) => {
                self.context.needs_recreate = true;
                FrameStatus::PresentOutOfDate
            }
            Err(e) => {
                engine_error!("nova::FrameLoop", "Failed to present image {}: {}", image_index, e);
                return Err(e);
            }
        };
        if status != FrameStatus::PresentOutOfDate {
            self.stats.frames_presented += 1;
        }

        engine_trace!("nova::FrameLoop", "Frame on slot {} rendered image {} ({:?})", frame_index, image_index, status);
        self.advance(&mut trace);

        Ok(FrameReport {
            frame_index,
            image_index: Some(image_index),
            status,
            trace,
        })
    }

    /// Schedule a rebuild of the image set for the next iteration
    pub fn request_recreate(&mut self) {
        self.context.needs_recreate = true;
    }

    fn advance(&mut self, trace: &mut StageTrace) {
        trace.push(FrameStage::Advance);
        self.context.current_frame = (self.context.current_frame + 1) % self.context.pool.len();
    }

    /// Rebuild swapchain-dependent state, treating a surface that changes again
    /// mid-rebuild as a retry on the next iteration
    ///
    /// Returns whether the image set was rebuilt. `needs_recreate` stays set
    /// until it is.
    fn try_recreate(&mut self, size: Extent2D) -> Result<bool> {
        match self.recreate(size) {
            Ok(()) => Ok(true),
            Err(e) if e.is_recoverable() => {
                engine_warn!("nova::FrameLoop", "Swapchain recreation reported {}, retrying next frame", e);
                Ok(false)
            }
            Err(e) => {
                engine_error!("nova::FrameLoop", "Swapchain recreation failed: {}", e);
                Err(e)
            }
        }
    }

    /// Rebuild swapchain-dependent state at `size`
    fn recreate(&mut self, size: Extent2D) -> Result<()> {
        engine_info!("nova::FrameLoop", "Recreating swapchain at {}x{}", size.width, size.height);
        self.context.needs_recreate = true;

        self.device.wait_idle()?;
        self.recorder.destroy();
        self.swapchain.recreate(size.width, size.height)?;
        self.recorder.build(self.swapchain.images(), self.swapchain.extent(), self.swapchain.format())?;
        self.context.images_in_flight.reset(self.swapchain.image_count());

        self.context.needs_recreate = false;
        self.stats.recreations += 1;
        Ok(())
    }

    pub fn current_frame(&self) -> usize {
        self.context.current_frame
    }

    pub fn frames_in_flight(&self) -> usize {
        self.context.pool.len()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn context(&self) -> &FrameContext {
        &self.context
    }

    pub fn swapchain(&self) -> &dyn Swapchain {
        self.swapchain.as_ref()
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            engine_warn!("nova::FrameLoop", "Device idle wait during shutdown failed: {}", e);
        }
        self.context.pool.destroy(self.device.as_ref());
        self.recorder.destroy();
    }
}

#[cfg(test)]
#[path = "frame_loop_tests.rs"]
mod tests;
