/// Unit tests for MockGraphicsDevice and the other mock collaborators.
///
/// The frame loop tests rely on these semantics, so they are pinned down here.

use crate::device::mock_graphics_device::*;
use crate::device::{
    GraphicsDevice, Swapchain, CommandRecorder, WindowHost, SubmitInfo, PipelineStages,
    CommandBufferHandle, Extent2D, AcquiredImage, PresentStatus,
};
use crate::error::Error;

fn submit_info(device: &MockGraphicsDevice, image_index: u32) -> SubmitInfo {
    SubmitInfo {
        command_buffer: CommandBufferHandle::from_raw(77),
        image_index,
        wait_semaphore: device.create_semaphore().unwrap(),
        wait_stage: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
        signal_semaphore: device.create_semaphore().unwrap(),
        fence: device.create_fence(false).unwrap(),
    }
}

// ============================================================================
// MockGraphicsDevice Tests
// ============================================================================

#[test]
fn test_fence_creation_state() {
    let device = MockGraphicsDevice::new(new_event_log());
    let signaled = device.create_fence(true).unwrap();
    let unsignaled = device.create_fence(false).unwrap();

    assert_ne!(signaled, unsignaled);
    assert!(device.is_fence_signaled(signaled).unwrap());
    assert!(!device.is_fence_signaled(unsignaled).unwrap());
    assert_eq!(device.live_fence_count(), 2);

    device.destroy_fence(signaled);
    device.destroy_fence(unsignaled);
    assert_eq!(device.live_fence_count(), 0);
}

#[test]
fn test_semaphore_lifecycle() {
    let device = MockGraphicsDevice::new(new_event_log());
    let a = device.create_semaphore().unwrap();
    let b = device.create_semaphore().unwrap();
    assert_ne!(a, b);
    assert_eq!(device.live_semaphore_count(), 2);

    device.destroy_semaphore(a);
    assert_eq!(device.live_semaphore_count(), 1);
}

#[test]
fn test_submit_marks_fence_pending() {
    let device = MockGraphicsDevice::new(new_event_log());
    let info = submit_info(&device, 0);

    device.submit(&info).unwrap();

    assert_eq!(device.fence_state(info.fence), Some(MockFenceState::Pending));
    assert_eq!(device.pending_count(), 1);
    assert_eq!(device.submissions(), 1);
    assert_eq!(device.max_outstanding(), 1);
}

#[test]
fn test_submit_requires_unsignaled_fence() {
    let device = MockGraphicsDevice::new(new_event_log());
    let mut info = submit_info(&device, 0);
    info.fence = device.create_fence(true).unwrap();

    assert!(matches!(device.submit(&info), Err(Error::InvalidResource(_))));
    assert_eq!(device.submissions(), 0);
}

#[test]
fn test_wait_auto_completes_in_order() {
    let device = MockGraphicsDevice::new(new_event_log());
    let first = submit_info(&device, 0);
    let second = submit_info(&device, 1);
    let third = submit_info(&device, 2);
    device.submit(&first).unwrap();
    device.submit(&second).unwrap();
    device.submit(&third).unwrap();
    assert_eq!(device.max_outstanding(), 3);

    device.wait_for_fence(second.fence, None).unwrap();

    assert!(device.is_fence_signaled(first.fence).unwrap());
    assert!(device.is_fence_signaled(second.fence).unwrap());
    assert!(!device.is_fence_signaled(third.fence).unwrap());
    assert_eq!(device.pending_count(), 1);
}

#[test]
fn test_wait_times_out_without_auto_complete() {
    let device = MockGraphicsDevice::never_completing(new_event_log());
    let info = submit_info(&device, 0);
    device.submit(&info).unwrap();

    let result = device.wait_for_fence(info.fence, Some(std::time::Duration::from_millis(1)));
    assert!(matches!(result, Err(Error::Timeout(_))));
    assert_eq!(device.pending_count(), 1);
}

#[test]
fn test_wait_on_unsignaled_fence_without_work_times_out() {
    let device = MockGraphicsDevice::new(new_event_log());
    let fence = device.create_fence(false).unwrap();
    assert!(matches!(device.wait_for_fence(fence, None), Err(Error::Timeout(_))));
}

#[test]
fn test_complete_next_and_all() {
    let device = MockGraphicsDevice::never_completing(new_event_log());
    let first = submit_info(&device, 0);
    let second = submit_info(&device, 1);
    device.submit(&first).unwrap();
    device.submit(&second).unwrap();

    assert!(device.complete_next());
    assert!(device.is_fence_signaled(first.fence).unwrap());
    assert!(!device.is_fence_signaled(second.fence).unwrap());

    device.complete_all();
    assert!(device.is_fence_signaled(second.fence).unwrap());
    assert!(!device.complete_next());
}

#[test]
fn test_reset_pending_fence_is_rejected() {
    let device = MockGraphicsDevice::never_completing(new_event_log());
    let info = submit_info(&device, 0);
    device.submit(&info).unwrap();

    assert!(device.reset_fence(info.fence).is_err());
}

#[test]
fn test_signal_fence_rearms() {
    let device = MockGraphicsDevice::new(new_event_log());
    let fence = device.create_fence(true).unwrap();
    device.reset_fence(fence).unwrap();
    assert!(!device.is_fence_signaled(fence).unwrap());

    device.signal_fence(fence).unwrap();
    assert!(device.is_fence_signaled(fence).unwrap());

    // Already signaled: a second signal is a usage error
    assert!(device.signal_fence(fence).is_err());
}

#[test]
fn test_aliasing_violation_detected() {
    let device = MockGraphicsDevice::never_completing(new_event_log());
    device.submit(&submit_info(&device, 0)).unwrap();
    device.submit(&submit_info(&device, 0)).unwrap();

    assert_eq!(device.aliasing_violations(), 1);
}

#[test]
fn test_scripted_submit_failure() {
    let device = MockGraphicsDevice::new(new_event_log());
    device.fail_next_submit(Error::DeviceLost);

    assert_eq!(device.submit(&submit_info(&device, 0)), Err(Error::DeviceLost));
    assert!(device.submit(&submit_info(&device, 0)).is_ok());
}

#[test]
fn test_wait_idle_drains_queue_and_logs() {
    let events = new_event_log();
    let device = MockGraphicsDevice::never_completing(events.clone());
    device.submit(&submit_info(&device, 0)).unwrap();

    device.wait_idle().unwrap();

    assert_eq!(device.pending_count(), 0);
    assert_eq!(events.lock().unwrap().last(), Some(&MockEvent::WaitIdle));
}

// ============================================================================
// MockSwapchain Tests
// ============================================================================

#[test]
fn test_swapchain_round_robin_acquire() {
    let events = new_event_log();
    let device = MockGraphicsDevice::new(events.clone());
    let signal = device.create_semaphore().unwrap();
    let mut swapchain = MockSwapchain::new(3, Extent2D::new(800, 600), events);

    let indices: Vec<u32> = (0..5)
        .map(|_| swapchain.acquire_next_image(signal).unwrap().image_index)
        .collect();

    assert_eq!(indices, vec![0, 1, 2, 0, 1]);
    assert_eq!(swapchain.image_count(), 3);
    assert_eq!(swapchain.script().lock().unwrap().acquire_calls, 5);
}

#[test]
fn test_swapchain_scripted_acquire() {
    let events = new_event_log();
    let device = MockGraphicsDevice::new(events.clone());
    let signal = device.create_semaphore().unwrap();
    let mut swapchain = MockSwapchain::new(2, Extent2D::new(800, 600), events);
    {
        let script = swapchain.script();
        let mut script = script.lock().unwrap();
        script.acquire_results.insert(1, Err(Error::SurfaceOutOfDate));
        script.acquire_results.insert(2, Ok(AcquiredImage { image_index: 1, suboptimal: true }));
    }

    assert_eq!(swapchain.acquire_next_image(signal).unwrap().image_index, 0);
    assert_eq!(swapchain.acquire_next_image(signal), Err(Error::SurfaceOutOfDate));
    assert!(swapchain.acquire_next_image(signal).unwrap().suboptimal);
}

#[test]
fn test_swapchain_scripted_present() {
    let events = new_event_log();
    let device = MockGraphicsDevice::new(events.clone());
    let wait = device.create_semaphore().unwrap();
    let mut swapchain = MockSwapchain::new(2, Extent2D::new(800, 600), events);
    swapchain.script().lock().unwrap().present_results.insert(0, Ok(PresentStatus::Suboptimal));

    assert_eq!(swapchain.present(0, wait), Ok(PresentStatus::Suboptimal));
    assert_eq!(swapchain.present(1, wait), Ok(PresentStatus::Optimal));
}

#[test]
fn test_swapchain_recreate_replaces_images() {
    let mut swapchain = MockSwapchain::new(2, Extent2D::new(800, 600), new_event_log());
    let old_images = swapchain.images().to_vec();

    swapchain.recreate(1024, 768).unwrap();

    assert_eq!(swapchain.extent(), Extent2D::new(1024, 768));
    assert_eq!(swapchain.image_count(), 2);
    assert_ne!(swapchain.images()[0].image, old_images[0].image);
    let script = swapchain.script();
    let script = script.lock().unwrap();
    assert_eq!(script.recreate_count, 1);
    assert_eq!(script.live_views, 2);
}

// ============================================================================
// MockCommandRecorder Tests
// ============================================================================

#[test]
fn test_recorder_build_and_destroy() {
    let events = new_event_log();
    let swapchain = MockSwapchain::new(3, Extent2D::new(800, 600), events.clone());
    let mut recorder = MockCommandRecorder::new(events);

    assert!(recorder.commands(0).is_err());

    recorder.build(swapchain.images(), swapchain.extent(), swapchain.format()).unwrap();
    assert!(recorder.commands(2).is_ok());
    assert!(recorder.commands(3).is_err());
    assert_eq!(recorder.counters().lock().unwrap().live_command_buffers, 3);

    recorder.destroy();
    recorder.destroy();
    let counters = recorder.counters();
    let counters = counters.lock().unwrap();
    assert_eq!(counters.live_command_buffers, 0);
    assert_eq!(counters.destroy_count, 1);
}

// ============================================================================
// MockWindow Tests
// ============================================================================

#[test]
fn test_window_closes_after_polls() {
    let mut window = MockWindow::new(Extent2D::new(800, 600), 2);
    assert!(!window.should_close());
    window.poll_events();
    assert!(!window.should_close());
    window.poll_events();
    assert!(window.should_close());
}

#[test]
fn test_window_size_change_raises_resize_flag() {
    let mut window = MockWindow::new(Extent2D::new(800, 600), 10);
    window.size_changes.insert(1, Extent2D::new(0, 0));

    window.poll_events();
    assert!(window.framebuffer_size().is_empty());
    assert!(window.take_resized());
    assert!(!window.take_resized());
}
