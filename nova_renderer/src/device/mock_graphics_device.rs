/// Mock collaborators for unit tests (no GPU required)
///
/// The mock device models a single in-order queue: submitted work stays pending
/// until `complete_next`/`complete_all` retires it, or until a CPU wait on one of
/// its fences auto-completes everything queued up to that fence. All mocks can
/// share one `EventLog` so tests can assert cross-component ordering.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::device::{
    GraphicsDevice, Swapchain, CommandRecorder, WindowHost, SubmitInfo,
    SemaphoreHandle, FenceHandle, CommandBufferHandle, ImageHandle, ImageViewHandle,
    Extent2D, PresentableImage, AcquiredImage, PresentStatus, SurfaceFormat,
};
use crate::error::{Error, Result};

// ============================================================================
// Event log
// ============================================================================

/// Observable call made on a mock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEvent {
    WaitFence(FenceHandle),
    ResetFence(FenceHandle),
    SignalFence(FenceHandle),
    Acquire { image_index: Option<u32> },
    Submit { image_index: u32, fence: FenceHandle, wait: SemaphoreHandle, signal: SemaphoreHandle },
    Present { image_index: u32, wait: SemaphoreHandle },
    Recreate { width: u32, height: u32 },
    RecorderBuild { image_count: usize },
    RecorderDestroy,
    WaitIdle,
}

/// Event log shared between mocks
pub type EventLog = Arc<Mutex<Vec<MockEvent>>>;

pub fn new_event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

// ============================================================================
// Mock Graphics Device
// ============================================================================

/// State of a mock fence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFenceState {
    Signaled,
    Unsignaled,
    /// Attached to a submission that has not retired yet
    Pending,
}

#[derive(Debug, Clone, Copy)]
struct PendingWork {
    fence: FenceHandle,
    image_index: u32,
}

struct DeviceState {
    next_handle: u64,
    semaphores: HashSet<SemaphoreHandle>,
    fences: HashMap<FenceHandle, MockFenceState>,
    pending: VecDeque<PendingWork>,
    auto_complete: bool,
    submit_failure: Option<Error>,
    submissions: usize,
    max_outstanding: usize,
    aliasing_violations: usize,
}

pub struct MockGraphicsDevice {
    state: Mutex<DeviceState>,
    events: EventLog,
}

impl MockGraphicsDevice {
    /// Device whose CPU waits auto-complete pending work
    pub fn new(events: EventLog) -> Self {
        Self {
            state: Mutex::new(DeviceState {
                next_handle: 1,
                semaphores: HashSet::new(),
                fences: HashMap::new(),
                pending: VecDeque::new(),
                auto_complete: true,
                submit_failure: None,
                submissions: 0,
                max_outstanding: 0,
                aliasing_violations: 0,
            }),
            events,
        }
    }

    /// Device that never completes work on its own (waits on pending fences time out)
    pub fn never_completing(events: EventLog) -> Self {
        let device = Self::new(events);
        device.set_auto_complete(false);
        device
    }

    pub fn set_auto_complete(&self, enabled: bool) {
        self.state.lock().unwrap().auto_complete = enabled;
    }

    /// Make the next `submit` fail with `error`
    pub fn fail_next_submit(&self, error: Error) {
        self.state.lock().unwrap().submit_failure = Some(error);
    }

    /// Retire the oldest pending submission; false if the queue is empty
    pub fn complete_next(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.pending.pop_front() {
            Some(work) => {
                state.fences.insert(work.fence, MockFenceState::Signaled);
                true
            }
            None => false,
        }
    }

    /// Retire every pending submission
    pub fn complete_all(&self) {
        while self.complete_next() {}
    }

    pub fn submissions(&self) -> usize {
        self.state.lock().unwrap().submissions
    }

    /// Highest number of simultaneously pending submissions observed
    pub fn max_outstanding(&self) -> usize {
        self.state.lock().unwrap().max_outstanding
    }

    /// Submissions that targeted an image with unretired work
    pub fn aliasing_violations(&self) -> usize {
        self.state.lock().unwrap().aliasing_violations
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    pub fn live_semaphore_count(&self) -> usize {
        self.state.lock().unwrap().semaphores.len()
    }

    pub fn live_fence_count(&self) -> usize {
        self.state.lock().unwrap().fences.len()
    }

    pub fn fence_state(&self, fence: FenceHandle) -> Option<MockFenceState> {
        self.state.lock().unwrap().fences.get(&fence).copied()
    }

    fn record(&self, event: MockEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_semaphore(&self) -> Result<SemaphoreHandle> {
        let mut state = self.state.lock().unwrap();
        let handle = SemaphoreHandle::from_raw(state.next_handle);
        state.next_handle += 1;
        state.semaphores.insert(handle);
        Ok(handle)
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        self.state.lock().unwrap().semaphores.remove(&semaphore);
    }

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle> {
        let mut state = self.state.lock().unwrap();
        let handle = FenceHandle::from_raw(state.next_handle);
        state.next_handle += 1;
        let initial = if signaled { MockFenceState::Signaled } else { MockFenceState::Unsignaled };
        state.fences.insert(handle, initial);
        Ok(handle)
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        self.state.lock().unwrap().fences.remove(&fence);
    }

    fn wait_for_fence(&self, fence: FenceHandle, _timeout: Option<Duration>) -> Result<()> {
        self.record(MockEvent::WaitFence(fence));
        let mut state = self.state.lock().unwrap();
        match state.fences.get(&fence).copied() {
            None => Err(Error::InvalidResource(format!("unknown fence {:?}", fence))),
            Some(MockFenceState::Signaled) => Ok(()),
            Some(MockFenceState::Unsignaled) => {
                Err(Error::Timeout(format!("fence {:?} has no pending work", fence)))
            }
            Some(MockFenceState::Pending) => {
                if !state.auto_complete {
                    return Err(Error::Timeout(format!("fence {:?} never retired", fence)));
                }
                while let Some(work) = state.pending.pop_front() {
                    state.fences.insert(work.fence, MockFenceState::Signaled);
                    if work.fence == fence {
                        break;
                    }
                }
                Ok(())
            }
        }
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<()> {
        self.record(MockEvent::ResetFence(fence));
        let mut state = self.state.lock().unwrap();
        match state.fences.get(&fence).copied() {
            None => Err(Error::InvalidResource(format!("unknown fence {:?}", fence))),
            Some(MockFenceState::Pending) => {
                Err(Error::InvalidResource(format!("reset of pending fence {:?}", fence)))
            }
            Some(_) => {
                state.fences.insert(fence, MockFenceState::Unsignaled);
                Ok(())
            }
        }
    }

    fn signal_fence(&self, fence: FenceHandle) -> Result<()> {
        self.record(MockEvent::SignalFence(fence));
        let mut state = self.state.lock().unwrap();
        match state.fences.get(&fence).copied() {
            Some(MockFenceState::Unsignaled) => {
                // Empty submission retires immediately
                state.fences.insert(fence, MockFenceState::Signaled);
                Ok(())
            }
            Some(other) => {
                Err(Error::InvalidResource(format!("signal of {:?} fence {:?}", other, fence)))
            }
            None => Err(Error::InvalidResource(format!("unknown fence {:?}", fence))),
        }
    }

    fn is_fence_signaled(&self, fence: FenceHandle) -> Result<bool> {
        let state = self.state.lock().unwrap();
        match state.fences.get(&fence) {
            Some(fence_state) => Ok(*fence_state == MockFenceState::Signaled),
            None => Err(Error::InvalidResource(format!("unknown fence {:?}", fence))),
        }
    }

    fn submit(&self, info: &SubmitInfo) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.submit_failure.take() {
            return Err(error);
        }
        if state.fences.get(&info.fence) != Some(&MockFenceState::Unsignaled) {
            return Err(Error::InvalidResource(format!(
                "submit with fence {:?} not unsignaled", info.fence
            )));
        }
        if !state.semaphores.contains(&info.wait_semaphore)
            || !state.semaphores.contains(&info.signal_semaphore)
        {
            return Err(Error::InvalidResource("submit with destroyed semaphore".to_string()));
        }

        if state.pending.iter().any(|work| work.image_index == info.image_index) {
            state.aliasing_violations += 1;
        }
        state.pending.push_back(PendingWork { fence: info.fence, image_index: info.image_index });
        state.fences.insert(info.fence, MockFenceState::Pending);
        state.submissions += 1;
        state.max_outstanding = state.max_outstanding.max(state.pending.len());
        drop(state);

        self.record(MockEvent::Submit {
            image_index: info.image_index,
            fence: info.fence,
            wait: info.wait_semaphore,
            signal: info.signal_semaphore,
        });
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.record(MockEvent::WaitIdle);
        self.complete_all();
        Ok(())
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

/// Scriptable swapchain behavior, shared with the test after the swapchain is boxed
#[derive(Debug, Default)]
pub struct SwapchainScript {
    /// Result for the n-th acquire call (0-based); other calls go round-robin
    pub acquire_results: HashMap<usize, Result<AcquiredImage>>,
    /// Result for the n-th present call (0-based); other calls succeed
    pub present_results: HashMap<usize, Result<PresentStatus>>,
    /// Error returned by the next recreate
    pub recreate_failure: Option<Error>,
    /// Image count of the next successful recreate (unchanged when `None`)
    pub next_image_count: Option<usize>,
    pub acquire_calls: usize,
    pub present_calls: usize,
    pub recreate_count: usize,
    /// Image views alive right now
    pub live_views: usize,
    next_image: u32,
}

pub struct MockSwapchain {
    images: Vec<PresentableImage>,
    extent: Extent2D,
    format: SurfaceFormat,
    next_handle: u64,
    script: Arc<Mutex<SwapchainScript>>,
    events: EventLog,
}

impl MockSwapchain {
    pub fn new(image_count: usize, extent: Extent2D, events: EventLog) -> Self {
        let mut swapchain = Self {
            images: Vec::new(),
            extent,
            format: SurfaceFormat::B8G8R8A8_UNORM,
            next_handle: 1000,
            script: Arc::new(Mutex::new(SwapchainScript::default())),
            events,
        };
        swapchain.build_images(image_count);
        swapchain
    }

    /// Handle for scripting results and reading counters
    pub fn script(&self) -> Arc<Mutex<SwapchainScript>> {
        self.script.clone()
    }

    fn build_images(&mut self, image_count: usize) {
        self.images = (0..image_count as u32)
            .map(|index| {
                let image = ImageHandle::from_raw(self.next_handle);
                let view = ImageViewHandle::from_raw(self.next_handle + 1);
                self.next_handle += 2;
                PresentableImage { index, image, view }
            })
            .collect();
        let mut script = self.script.lock().unwrap();
        script.live_views = image_count;
        script.next_image = 0;
    }
}

impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self, _signal: SemaphoreHandle) -> Result<AcquiredImage> {
        let mut script = self.script.lock().unwrap();
        let call = script.acquire_calls;
        script.acquire_calls += 1;

        let result = match script.acquire_results.remove(&call) {
            Some(result) => result,
            None => {
                let image_index = script.next_image;
                script.next_image = (image_index + 1) % self.images.len() as u32;
                Ok(AcquiredImage { image_index, suboptimal: false })
            }
        };
        drop(script);

        self.events.lock().unwrap().push(MockEvent::Acquire {
            image_index: result.as_ref().ok().map(|acquired| acquired.image_index),
        });
        result
    }

    fn present(&mut self, image_index: u32, wait_on: SemaphoreHandle) -> Result<PresentStatus> {
        let mut script = self.script.lock().unwrap();
        let call = script.present_calls;
        script.present_calls += 1;
        let result = script.present_results.remove(&call).unwrap_or(Ok(PresentStatus::Optimal));
        drop(script);

        self.events.lock().unwrap().push(MockEvent::Present { image_index, wait: wait_on });
        result
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.events.lock().unwrap().push(MockEvent::Recreate { width, height });
        let image_count = {
            let mut script = self.script.lock().unwrap();
            if let Some(error) = script.recreate_failure.take() {
                return Err(error);
            }
            script.recreate_count += 1;
            script.live_views = 0;
            script.next_image_count.take().unwrap_or(self.images.len())
        };
        self.extent = Extent2D::new(width, height);
        self.build_images(image_count);
        Ok(())
    }

    fn images(&self) -> &[PresentableImage] {
        &self.images
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> SurfaceFormat {
        self.format
    }
}

// ============================================================================
// Mock Command Recorder
// ============================================================================

/// Counters shared with the test after the recorder is boxed
#[derive(Debug, Default)]
pub struct RecorderCounters {
    pub build_count: usize,
    pub destroy_count: usize,
    /// Command buffers alive right now
    pub live_command_buffers: usize,
    pub last_extent: Extent2D,
}

pub struct MockCommandRecorder {
    command_buffers: Vec<CommandBufferHandle>,
    next_handle: u64,
    counters: Arc<Mutex<RecorderCounters>>,
    events: EventLog,
}

impl MockCommandRecorder {
    pub fn new(events: EventLog) -> Self {
        Self {
            command_buffers: Vec::new(),
            next_handle: 5000,
            counters: Arc::new(Mutex::new(RecorderCounters::default())),
            events,
        }
    }

    pub fn counters(&self) -> Arc<Mutex<RecorderCounters>> {
        self.counters.clone()
    }
}

impl CommandRecorder for MockCommandRecorder {
    fn build(&mut self, images: &[PresentableImage], extent: Extent2D, _format: SurfaceFormat) -> Result<()> {
        self.command_buffers = images
            .iter()
            .map(|_| {
                let handle = CommandBufferHandle::from_raw(self.next_handle);
                self.next_handle += 1;
                handle
            })
            .collect();

        let mut counters = self.counters.lock().unwrap();
        counters.build_count += 1;
        counters.live_command_buffers += images.len();
        counters.last_extent = extent;
        drop(counters);

        self.events.lock().unwrap().push(MockEvent::RecorderBuild { image_count: images.len() });
        Ok(())
    }

    fn commands(&self, image_index: u32) -> Result<CommandBufferHandle> {
        self.command_buffers
            .get(image_index as usize)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("no commands for image {}", image_index)))
    }

    fn destroy(&mut self) {
        if self.command_buffers.is_empty() {
            return;
        }
        let mut counters = self.counters.lock().unwrap();
        counters.destroy_count += 1;
        counters.live_command_buffers -= self.command_buffers.len();
        drop(counters);
        self.command_buffers.clear();

        self.events.lock().unwrap().push(MockEvent::RecorderDestroy);
    }
}

// ============================================================================
// Mock Window
// ============================================================================

/// Window that closes after a fixed number of polls
pub struct MockWindow {
    pub size: Extent2D,
    pub close_after_polls: usize,
    pub polls: usize,
    pub resized: bool,
    /// Size change applied on the n-th poll (1-based), raising the resize flag
    pub size_changes: HashMap<usize, Extent2D>,
}

impl MockWindow {
    pub fn new(size: Extent2D, close_after_polls: usize) -> Self {
        Self {
            size,
            close_after_polls,
            polls: 0,
            resized: false,
            size_changes: HashMap::new(),
        }
    }
}

impl WindowHost for MockWindow {
    fn should_close(&self) -> bool {
        self.polls >= self.close_after_polls
    }

    fn poll_events(&mut self) {
        self.polls += 1;
        if let Some(size) = self.size_changes.get(&self.polls) {
            self.size = *size;
            self.resized = true;
        }
    }

    fn framebuffer_size(&self) -> Extent2D {
        self.size
    }

    fn take_resized(&mut self) -> bool {
        std::mem::take(&mut self.resized)
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
