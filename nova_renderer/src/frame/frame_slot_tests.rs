//! Unit tests for frame_slot.rs

use crate::device::mock_graphics_device::*;
use crate::device::{GraphicsDevice, SubmitInfo, PipelineStages, CommandBufferHandle};
use crate::frame::{FrameSlotPool, WaitPolicy};
use crate::error::Error;
use std::time::Duration;

fn submit_for(device: &MockGraphicsDevice, pool: &FrameSlotPool, index: usize, image_index: u32) {
    let slot = pool.slot(index).unwrap();
    device
        .submit(&SubmitInfo {
            command_buffer: CommandBufferHandle::from_raw(1),
            image_index,
            wait_semaphore: slot.acquire_signal,
            wait_stage: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: slot.complete_signal,
            fence: slot.retired_marker,
        })
        .unwrap();
}

// ============================================================================
// CREATION
// ============================================================================

#[test]
fn test_pool_creates_signaled_markers() {
    let device = MockGraphicsDevice::new(new_event_log());
    let pool = FrameSlotPool::new(&device, 3).unwrap();

    assert_eq!(pool.len(), 3);
    assert_eq!(device.live_semaphore_count(), 6);
    assert_eq!(device.live_fence_count(), 3);
    for (i, slot) in pool.slots().iter().enumerate() {
        assert_eq!(slot.index, i);
        assert_ne!(slot.acquire_signal, slot.complete_signal);
        assert!(device.is_fence_signaled(slot.retired_marker).unwrap());
    }
}

#[test]
fn test_pool_rejects_zero_slots() {
    let device = MockGraphicsDevice::new(new_event_log());
    assert!(matches!(FrameSlotPool::new(&device, 0), Err(Error::InitializationFailed(_))));
    assert_eq!(device.live_fence_count(), 0);
}

#[test]
fn test_slot_out_of_range() {
    let device = MockGraphicsDevice::new(new_event_log());
    let pool = FrameSlotPool::new(&device, 2).unwrap();
    assert!(matches!(pool.slot(2), Err(Error::InvalidResource(_))));
}

// ============================================================================
// WAIT / RESET / REARM
// ============================================================================

#[test]
fn test_first_wait_returns_immediately() {
    let events = new_event_log();
    let device = MockGraphicsDevice::never_completing(events.clone());
    let pool = FrameSlotPool::new(&device, 2).unwrap();

    let slot = pool.wait_and_reset(&device, 0, WaitPolicy::default()).unwrap();

    assert_eq!(slot.index, 0);
    assert!(!device.is_fence_signaled(slot.retired_marker).unwrap());
    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        vec![MockEvent::WaitFence(slot.retired_marker), MockEvent::ResetFence(slot.retired_marker)]
    );
}

#[test]
fn test_wait_blocks_on_pending_work_until_retired() {
    let device = MockGraphicsDevice::new(new_event_log());
    let pool = FrameSlotPool::new(&device, 1).unwrap();

    pool.wait_and_reset(&device, 0, WaitPolicy::default()).unwrap();
    submit_for(&device, &pool, 0, 0);
    assert_eq!(device.pending_count(), 1);

    // Auto-completion retires the work during the wait
    pool.wait_and_reset(&device, 0, WaitPolicy::default()).unwrap();
    assert_eq!(device.pending_count(), 0);
}

#[test]
fn test_wait_times_out_after_single_retry() {
    let events = new_event_log();
    let device = MockGraphicsDevice::never_completing(events.clone());
    let pool = FrameSlotPool::new(&device, 1).unwrap();
    pool.wait_and_reset(&device, 0, WaitPolicy::default()).unwrap();
    submit_for(&device, &pool, 0, 0);
    events.lock().unwrap().clear();

    let policy = WaitPolicy { timeout: Some(Duration::from_millis(5)), retry_once: true };
    let result = pool.wait_and_reset(&device, 0, policy);

    assert!(matches!(result, Err(Error::Timeout(_))));
    let waits = events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, MockEvent::WaitFence(_)))
        .count();
    assert_eq!(waits, 2);
    // The marker was not reset: the slot is not reused
    assert_eq!(device.fence_state(pool.slot(0).unwrap().retired_marker), Some(MockFenceState::Pending));
}

#[test]
fn test_wait_without_retry_fails_on_first_timeout() {
    let events = new_event_log();
    let device = MockGraphicsDevice::never_completing(events.clone());
    let pool = FrameSlotPool::new(&device, 1).unwrap();
    pool.wait_and_reset(&device, 0, WaitPolicy::default()).unwrap();
    submit_for(&device, &pool, 0, 0);
    events.lock().unwrap().clear();

    let policy = WaitPolicy { timeout: Some(Duration::from_millis(5)), retry_once: false };
    assert!(pool.wait_and_reset(&device, 0, policy).is_err());
    assert_eq!(events.lock().unwrap().len(), 1);
}

#[test]
fn test_rearm_restores_signaled_marker() {
    let device = MockGraphicsDevice::never_completing(new_event_log());
    let pool = FrameSlotPool::new(&device, 2).unwrap();

    let slot = pool.wait_and_reset(&device, 1, WaitPolicy::default()).unwrap();
    pool.rearm(&device, 1).unwrap();

    assert!(device.is_fence_signaled(slot.retired_marker).unwrap());
    // The next wait on the same slot does not hang
    assert!(pool.wait_and_reset(&device, 1, WaitPolicy::default()).is_ok());
}

// ============================================================================
// DESTRUCTION
// ============================================================================

#[test]
fn test_destroy_releases_everything() {
    let device = MockGraphicsDevice::new(new_event_log());
    let mut pool = FrameSlotPool::new(&device, 4).unwrap();

    pool.destroy(&device);

    assert!(pool.is_empty());
    assert_eq!(device.live_semaphore_count(), 0);
    assert_eq!(device.live_fence_count(), 0);
}
