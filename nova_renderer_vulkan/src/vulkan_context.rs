/// VulkanContext - instance, surface, device and queues shared by every Vulkan object
///
/// Held through `Arc` by the device, the swapchain and the command recorder, so
/// it is destroyed only after all of them are gone.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use nova_renderer::nova::Error;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Queue family indices selected for the physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// Distinct family indices (one entry when graphics and present match)
    pub fn unique(&self) -> Vec<u32> {
        if self.graphics == self.present {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Shared Vulkan state
pub struct VulkanContext {
    /// Keeps the Vulkan library loaded
    pub(crate) _entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) surface: vk::SurfaceKHR,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,
    pub(crate) queue_families: QueueFamilies,
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) present_queue: vk::Queue,
    /// Released before the device in `Drop`
    allocator: ManuallyDrop<Mutex<Allocator>>,
    /// Queue access must be externally synchronized
    queue_lock: Mutex<()>,
}

impl VulkanContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
        surface_loader: ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        queue_families: QueueFamilies,
        allocator: Allocator,
    ) -> Self {
        let graphics_queue = unsafe { device.get_device_queue(queue_families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(queue_families.present, 0) };
        Self {
            _entry: entry,
            instance,
            debug_utils,
            surface_loader,
            surface,
            physical_device,
            device,
            queue_families,
            graphics_queue,
            present_queue,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            queue_lock: Mutex::new(()),
        }
    }

    /// Serialize access to the graphics and present queues
    pub(crate) fn lock_queues(&self) -> MutexGuard<'_, ()> {
        self.queue_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// GPU memory allocator for buffers
    pub(crate) fn allocator(&self) -> MutexGuard<'_, Allocator> {
        self.allocator.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Logical device
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue_families(&self) -> QueueFamilies {
        self.queue_families
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            // Allocations are gone by now; the allocator frees its blocks here
            ManuallyDrop::drop(&mut self.allocator);
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);

            // No callbacks once the messenger starts going away
            crate::debug::cleanup_debug_config();
            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

/// Map a failed Vulkan call to the engine error taxonomy
pub(crate) fn vk_error(result: vk::Result, what: &str) -> Error {
    match result {
        vk::Result::ERROR_OUT_OF_DATE_KHR => Error::SurfaceOutOfDate,
        vk::Result::SUBOPTIMAL_KHR => Error::SurfaceSuboptimal,
        vk::Result::ERROR_SURFACE_LOST_KHR => Error::SurfaceLost,
        vk::Result::ERROR_DEVICE_LOST => Error::DeviceLost,
        vk::Result::TIMEOUT => Error::Timeout(what.to_string()),
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => Error::OutOfMemory,
        other => Error::BackendError(format!("{}: {:?}", what, other)),
    }
}

/// Fence wait bound in nanoseconds (`None` waits forever)
pub(crate) fn timeout_to_nanos(timeout: Option<Duration>) -> u64 {
    match timeout {
        Some(duration) => u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX),
        None => u64::MAX,
    }
}

#[cfg(test)]
#[path = "vulkan_context_tests.rs"]
mod tests;
