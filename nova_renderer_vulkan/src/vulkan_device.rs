/// VulkanDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Owns instance/surface/device creation. Everything created here ends up in a
/// shared `VulkanContext` that the swapchain and the command recorder also hold.

use nova_renderer::nova::{Config, Error, Result};
use nova_renderer::nova::device::{
    GraphicsDevice, SubmitInfo, PipelineStages, SemaphoreHandle, FenceHandle,
};
use nova_renderer::{engine_debug, engine_error, engine_info, engine_warn};
use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{CStr, CString};
use std::sync::Arc;
use std::time::Duration;

use crate::vulkan_context::{vk_error, timeout_to_nanos, QueueFamilies, VulkanContext};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Objects created so far during `VulkanDevice::new`, destroyed in reverse
/// order if a later step fails
#[derive(Default)]
struct PartialInit {
    device: Option<ash::Device>,
    instance: Option<ash::Instance>,
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface: Option<(ash::khr::surface::Instance, vk::SurfaceKHR)>,
}

impl Drop for PartialInit {
    fn drop(&mut self) {
        unsafe {
            if let Some(device) = self.device.take() {
                device.destroy_device(None);
            }
            if let Some((surface_loader, surface)) = self.surface.take() {
                surface_loader.destroy_surface(surface, None);
            }
            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                crate::debug::cleanup_debug_config();
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            if let Some(instance) = self.instance.take() {
                instance.destroy_instance(None);
            }
        }
    }
}

/// Vulkan graphics device
pub struct VulkanDevice {
    context: Arc<VulkanContext>,
}

impl VulkanDevice {
    /// Create the Vulkan instance, surface and logical device for a window
    ///
    /// # Arguments
    ///
    /// * `window` - Window to present to
    /// * `config` - Application identity, validation settings
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` if the library, the validation layer or a
    /// suitable GPU is missing, or any creation step fails
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: &Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_error(format!("Failed to load Vulkan library: {:?}", e)))?;

            if config.enable_validation && !Self::validation_layer_available(&entry)? {
                return Err(init_error(format!(
                    "Validation layer {:?} requested but not available",
                    VALIDATION_LAYER
                )));
            }

            let display_handle = window.display_handle()
                .map_err(|e| init_error(format!("Failed to get display handle: {}", e)))?;
            let window_handle = window.window_handle()
                .map_err(|e| init_error(format!("Failed to get window handle: {}", e)))?;

            let mut partial = PartialInit::default();

            // Instance
            let app_name = CString::new(config.app_name.as_str())
                .map_err(|e| init_error(format!("Invalid application name: {}", e)))?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Nova")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_0);

            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| init_error(format!("Failed to get required extensions: {}", e)))?
                .to_vec();
            if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names = if config.enable_validation {
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);
            let instance = entry.create_instance(&create_info, None)
                .map_err(|e| init_error(format!("Failed to create Vulkan instance: {:?}", e)))?;
            partial.instance = Some(instance.clone());

            // Debug messenger
            if config.enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                crate::debug::init_debug_config(config.debug_severity);
                let messenger = debug_utils
                    .create_debug_utils_messenger(&crate::debug::messenger_create_info(config.debug_severity), None)
                    .map_err(|e| {
                        crate::debug::cleanup_debug_config();
                        init_error(format!("Failed to create debug messenger: {:?}", e))
                    })?;
                partial.debug_utils = Some((debug_utils, messenger));
            }

            // Surface
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| init_error(format!("Failed to create surface: {:?}", e)))?;
            partial.surface = Some((surface_loader.clone(), surface));

            // Physical device and queue families
            let (physical_device, queue_families) =
                Self::pick_physical_device(&instance, &surface_loader, surface)?;

            // Logical device
            let queue_priorities = [1.0];
            let queue_create_infos: Vec<_> = queue_families
                .unique()
                .into_iter()
                .map(|family| {
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(family)
                        .queue_priorities(&queue_priorities)
                })
                .collect();
            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names);
            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_error(format!("Failed to create logical device: {:?}", e)))?;
            partial.device = Some(device.clone());

            // Vertex memory
            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_error(format!("Failed to create GPU allocator: {:?}", e)))?;

            // Ownership moves to the context from here on
            let debug_utils = partial.debug_utils.take();
            partial.device = None;
            partial.surface = None;
            partial.instance = None;

            let context = VulkanContext::new(
                entry,
                instance,
                debug_utils,
                surface_loader,
                surface,
                physical_device,
                device,
                queue_families,
                allocator,
            );

            engine_info!("nova::vulkan", "Vulkan device ready (graphics family {}, present family {}, validation {})",
                queue_families.graphics, queue_families.present, config.enable_validation);

            Ok(Self { context: Arc::new(context) })
        }
    }

    /// Shared Vulkan state (for building the swapchain and the command recorder)
    pub fn context(&self) -> &Arc<VulkanContext> {
        &self.context
    }

    fn validation_layer_available(entry: &ash::Entry) -> Result<bool> {
        let layers = unsafe { entry.enumerate_instance_layer_properties() }
            .map_err(|e| init_error(format!("Failed to enumerate instance layers: {:?}", e)))?;
        Ok(layers
            .iter()
            .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER)))
    }

    /// First physical device that can render and present to `surface`
    fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
        let physical_devices = unsafe { instance.enumerate_physical_devices() }
            .map_err(|e| init_error(format!("Failed to enumerate physical devices: {:?}", e)))?;

        for physical_device in physical_devices {
            let name = unsafe { instance.get_physical_device_properties(physical_device) }
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string());

            match Self::check_physical_device(instance, surface_loader, surface, physical_device) {
                Some(queue_families) => {
                    engine_info!("nova::vulkan", "Selected GPU: {}", name);
                    return Ok((physical_device, queue_families));
                }
                None => engine_debug!("nova::vulkan", "Skipping unsuitable GPU: {}", name),
            }
        }

        Err(init_error("No suitable Vulkan GPU found".to_string()))
    }

    fn check_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        physical_device: vk::PhysicalDevice,
    ) -> Option<QueueFamilies> {
        unsafe {
            let families = instance.get_physical_device_queue_family_properties(physical_device);
            let queue_flags: Vec<vk::QueueFlags> = families.iter().map(|f| f.queue_flags).collect();
            let present_support: Vec<bool> = (0..families.len() as u32)
                .map(|i| {
                    surface_loader
                        .get_physical_device_surface_support(physical_device, i, surface)
                        .unwrap_or(false)
                })
                .collect();
            let queue_families = select_queue_families(&queue_flags, &present_support)?;

            let extensions = instance.enumerate_device_extension_properties(physical_device).ok()?;
            let has_swapchain = extensions
                .iter()
                .any(|ext| ext.extension_name_as_c_str().is_ok_and(|name| name == ash::khr::swapchain::NAME));
            if !has_swapchain {
                return None;
            }

            let formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .ok()?;
            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .ok()?;
            if formats.is_empty() || present_modes.is_empty() {
                return None;
            }

            Some(queue_families)
        }
    }

    fn device_error(result: vk::Result, what: &str) -> Error {
        engine_error!("nova::vulkan", "{} failed: {:?}", what, result);
        vk_error(result, what)
    }
}

impl GraphicsDevice for VulkanDevice {
    fn create_semaphore(&self) -> Result<SemaphoreHandle> {
        let create_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { self.context.device.create_semaphore(&create_info, None) }
            .map_err(|e| Self::device_error(e, "vkCreateSemaphore"))?;
        Ok(SemaphoreHandle::from_raw(semaphore.as_raw()))
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        unsafe {
            self.context.device.destroy_semaphore(vk::Semaphore::from_raw(semaphore.as_raw()), None);
        }
    }

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle> {
        let flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { self.context.device.create_fence(&create_info, None) }
            .map_err(|e| Self::device_error(e, "vkCreateFence"))?;
        Ok(FenceHandle::from_raw(fence.as_raw()))
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        unsafe {
            self.context.device.destroy_fence(vk::Fence::from_raw(fence.as_raw()), None);
        }
    }

    fn wait_for_fence(&self, fence: FenceHandle, timeout: Option<Duration>) -> Result<()> {
        let fences = [vk::Fence::from_raw(fence.as_raw())];
        unsafe { self.context.device.wait_for_fences(&fences, true, timeout_to_nanos(timeout)) }
            .map_err(|e| match e {
                // The caller decides whether a timeout is fatal
                vk::Result::TIMEOUT => vk_error(e, &format!("{:?}", fence)),
                other => Self::device_error(other, "vkWaitForFences"),
            })
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<()> {
        let fences = [vk::Fence::from_raw(fence.as_raw())];
        unsafe { self.context.device.reset_fences(&fences) }
            .map_err(|e| Self::device_error(e, "vkResetFences"))
    }

    fn signal_fence(&self, fence: FenceHandle) -> Result<()> {
        let _queues = self.context.lock_queues();
        unsafe {
            self.context.device.queue_submit(
                self.context.graphics_queue,
                &[],
                vk::Fence::from_raw(fence.as_raw()),
            )
        }
        .map_err(|e| Self::device_error(e, "vkQueueSubmit (fence signal)"))
    }

    fn is_fence_signaled(&self, fence: FenceHandle) -> Result<bool> {
        unsafe { self.context.device.get_fence_status(vk::Fence::from_raw(fence.as_raw())) }
            .map_err(|e| Self::device_error(e, "vkGetFenceStatus"))
    }

    fn submit(&self, info: &SubmitInfo) -> Result<()> {
        let wait_semaphores = [vk::Semaphore::from_raw(info.wait_semaphore.as_raw())];
        let wait_stages = [pipeline_stages_to_vk(info.wait_stage)];
        let command_buffers = [vk::CommandBuffer::from_raw(info.command_buffer.as_raw())];
        let signal_semaphores = [vk::Semaphore::from_raw(info.signal_semaphore.as_raw())];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        let _queues = self.context.lock_queues();
        unsafe {
            self.context.device.queue_submit(
                self.context.graphics_queue,
                &[submit_info],
                vk::Fence::from_raw(info.fence.as_raw()),
            )
        }
        .map_err(|e| {
            engine_error!("nova::vulkan", "vkQueueSubmit failed for image {}: {:?}", info.image_index, e);
            vk_error(e, "vkQueueSubmit")
        })
    }

    fn wait_idle(&self) -> Result<()> {
        let _queues = self.context.lock_queues();
        unsafe { self.context.device.device_wait_idle() }.map_err(|e| {
            engine_warn!("nova::vulkan", "vkDeviceWaitIdle failed: {:?}", e);
            vk_error(e, "vkDeviceWaitIdle")
        })
    }
}

fn init_error(message: String) -> Error {
    engine_error!("nova::vulkan", "{}", message);
    Error::InitializationFailed(message)
}

/// Pick graphics and present families from per-family capabilities
///
/// The graphics family is preferred for presentation when it supports it.
pub(crate) fn select_queue_families(queue_flags: &[vk::QueueFlags], present_support: &[bool]) -> Option<QueueFamilies> {
    let graphics = queue_flags
        .iter()
        .position(|flags| flags.contains(vk::QueueFlags::GRAPHICS))? as u32;
    let supports_present = |i: usize| present_support.get(i).copied().unwrap_or(false);
    let present = if supports_present(graphics as usize) {
        graphics
    } else {
        (0..queue_flags.len()).find(|&i| supports_present(i))? as u32
    };
    Some(QueueFamilies { graphics, present })
}

pub(crate) fn pipeline_stages_to_vk(stages: PipelineStages) -> vk::PipelineStageFlags {
    let mut flags = vk::PipelineStageFlags::empty();
    if stages.contains(PipelineStages::COLOR_ATTACHMENT_OUTPUT) {
        flags |= vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
    }
    flags
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
