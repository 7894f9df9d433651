/// Frame slot pool - the fixed ring of frame-in-flight contexts

use std::time::Duration;
use crate::error::{Error, Result};
use crate::device::{GraphicsDevice, SemaphoreHandle, FenceHandle};
use crate::{engine_debug, engine_error, engine_warn};

/// Timeout and retry policy for CPU waits on retired markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// `None` waits forever
    pub timeout: Option<Duration>,
    /// Retry a timed-out wait once before failing
    pub retry_once: bool,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(10)),
            retry_once: true,
        }
    }
}

/// Wait for a marker under `policy`, retrying a timeout at most once
pub(crate) fn wait_for_marker(
    device: &dyn GraphicsDevice,
    fence: FenceHandle,
    policy: WaitPolicy,
    what: &str,
) -> Result<()> {
    match device.wait_for_fence(fence, policy.timeout) {
        Err(Error::Timeout(reason)) if policy.retry_once => {
            engine_warn!("nova::FrameLoop", "Wait for {} timed out ({}), retrying once", what, reason);
            device.wait_for_fence(fence, policy.timeout).map_err(|e| {
                engine_error!("nova::FrameLoop", "Wait for {} failed after retry: {}", what, e);
                e
            })
        }
        Err(e) => {
            engine_error!("nova::FrameLoop", "Wait for {} failed: {}", what, e);
            Err(e)
        }
        Ok(()) => Ok(()),
    }
}

/// One frame-in-flight context
///
/// The three primitives are created once, reused every N frames and destroyed
/// once. At most one submission per slot is outstanding at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    pub index: usize,
    /// Raised by the presentation engine when the acquired image is usable
    pub acquire_signal: SemaphoreHandle,
    /// Raised when the slot's rendering finishes; consumed by present
    pub complete_signal: SemaphoreHandle,
    /// Signaled when all GPU work submitted for the slot has retired
    pub retired_marker: FenceHandle,
}

/// Fixed ring of N frame slots
pub struct FrameSlotPool {
    slots: Vec<FrameSlot>,
}

impl FrameSlotPool {
    /// Create `count` slots with signaled markers
    ///
    /// On failure every primitive created so far is destroyed before returning.
    pub fn new(device: &dyn GraphicsDevice, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(Error::InitializationFailed("frame slot pool needs at least one slot".to_string()));
        }

        let mut pool = Self { slots: Vec::with_capacity(count) };
        for index in 0..count {
            match Self::create_slot(device, index) {
                Ok(slot) => pool.slots.push(slot),
                Err(e) => {
                    engine_error!("nova::FrameLoop", "Failed to create frame slot {}: {}", index, e);
                    pool.destroy(device);
                    return Err(e);
                }
            }
        }

        engine_debug!("nova::FrameLoop", "Created {} frame slots", count);
        Ok(pool)
    }

    fn create_slot(device: &dyn GraphicsDevice, index: usize) -> Result<FrameSlot> {
        let acquire_signal = device.create_semaphore()?;
        let complete_signal = match device.create_semaphore() {
            Ok(semaphore) => semaphore,
            Err(e) => {
                device.destroy_semaphore(acquire_signal);
                return Err(e);
            }
        };
        let retired_marker = match device.create_fence(true) {
            Ok(fence) => fence,
            Err(e) => {
                device.destroy_semaphore(complete_signal);
                device.destroy_semaphore(acquire_signal);
                return Err(e);
            }
        };
        Ok(FrameSlot { index, acquire_signal, complete_signal, retired_marker })
    }

    /// Block until slot `index` has retired, then reset its marker
    pub fn wait_and_reset(&self, device: &dyn GraphicsDevice, index: usize, policy: WaitPolicy) -> Result<FrameSlot> {
        let slot = self.slot(index)?;
        wait_for_marker(device, slot.retired_marker, policy, &format!("frame slot {}", index))?;
        device.reset_fence(slot.retired_marker)?;
        Ok(slot)
    }

    /// Re-signal the marker of a slot whose iteration ended before submission
    pub fn rearm(&self, device: &dyn GraphicsDevice, index: usize) -> Result<()> {
        let slot = self.slot(index)?;
        device.signal_fence(slot.retired_marker)
    }

    pub fn slot(&self, index: usize) -> Result<FrameSlot> {
        self.slots
            .get(index)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("frame slot {} out of range", index)))
    }

    pub fn slots(&self) -> &[FrameSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Destroy every primitive in reverse creation order
    ///
    /// The caller guarantees the device is idle.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        for slot in self.slots.drain(..).rev() {
            device.destroy_fence(slot.retired_marker);
            device.destroy_semaphore(slot.complete_signal);
            device.destroy_semaphore(slot.acquire_signal);
        }
    }
}

#[cfg(test)]
#[path = "frame_slot_tests.rs"]
mod tests;
