/// Swapchain - Vulkan implementation of the Swapchain trait

use nova_renderer::nova::{Error, PresentMode, Result};
use nova_renderer::nova::device::{
    Swapchain, AcquiredImage, PresentStatus, PresentableImage, SurfaceFormat,
    Extent2D, ImageHandle, ImageViewHandle, SemaphoreHandle,
};
use nova_renderer::{engine_debug, engine_error, engine_info};
use ash::vk;
use ash::vk::Handle;
use std::sync::Arc;

use crate::vulkan_context::{vk_error, VulkanContext};

/// Resources of one swapchain generation
struct SwapchainImages {
    swapchain: vk::SwapchainKHR,
    images: Vec<PresentableImage>,
    views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
}

/// Vulkan swapchain implementation
///
/// Owns the presentable images and their views. Recreation builds a new
/// generation from the old one and only then releases the old resources.
pub struct VulkanSwapchain {
    context: Arc<VulkanContext>,
    swapchain_loader: ash::khr::swapchain::Device,
    current: SwapchainImages,
    present_mode: PresentMode,
}

impl VulkanSwapchain {
    /// Create a new swapchain
    ///
    /// # Arguments
    ///
    /// * `context` - Shared Vulkan state (device, surface, queues)
    /// * `width` - Framebuffer width, used when the surface leaves the extent to us
    /// * `height` - Framebuffer height
    /// * `present_mode` - Preferred presentation mode (FIFO if unavailable)
    pub fn new(context: Arc<VulkanContext>, width: u32, height: u32, present_mode: PresentMode) -> Result<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(&context.instance, &context.device);
        let current = Self::build(&context, &swapchain_loader, width, height, present_mode, vk::SwapchainKHR::null())?;

        engine_info!("nova::vulkan", "Swapchain created: {} images, {}x{}, {:?}",
            current.images.len(), current.extent.width, current.extent.height, current.format);

        Ok(Self { context, swapchain_loader, current, present_mode })
    }

    fn build(
        context: &VulkanContext,
        swapchain_loader: &ash::khr::swapchain::Device,
        width: u32,
        height: u32,
        present_mode: PresentMode,
        old_swapchain: vk::SwapchainKHR,
    ) -> Result<SwapchainImages> {
        unsafe {
            let surface_loader = &context.surface_loader;
            let capabilities = surface_loader
                .get_physical_device_surface_capabilities(context.physical_device, context.surface)
                .map_err(|e| swapchain_error(e, "Failed to get surface capabilities"))?;
            let formats = surface_loader
                .get_physical_device_surface_formats(context.physical_device, context.surface)
                .map_err(|e| swapchain_error(e, "Failed to query surface formats"))?;
            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(context.physical_device, context.surface)
                .map_err(|e| swapchain_error(e, "Failed to query present modes"))?;

            let surface_format = choose_surface_format(&formats).ok_or_else(|| {
                engine_error!("nova::vulkan", "No supported surface format among {} candidates", formats.len());
                Error::InitializationFailed("No supported surface format".to_string())
            })?;
            let extent = choose_extent(&capabilities, width, height);

            let families = context.queue_families.unique();
            let (sharing_mode, family_indices): (vk::SharingMode, &[u32]) = if families.len() > 1 {
                (vk::SharingMode::CONCURRENT, &families)
            } else {
                (vk::SharingMode::EXCLUSIVE, &[])
            };

            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(context.surface)
                .min_image_count(choose_image_count(&capabilities))
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .image_sharing_mode(sharing_mode)
                .queue_family_indices(family_indices)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(choose_present_mode(&present_modes, present_mode))
                .clipped(true)
                .old_swapchain(old_swapchain);

            let swapchain = swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| swapchain_error(e, "Failed to create swapchain"))?;

            let vk_images = match swapchain_loader.get_swapchain_images(swapchain) {
                Ok(images) => images,
                Err(e) => {
                    swapchain_loader.destroy_swapchain(swapchain, None);
                    return Err(swapchain_error(e, "Failed to get swapchain images"));
                }
            };

            let mut views = Vec::with_capacity(vk_images.len());
            for &image in &vk_images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                match context.device.create_image_view(&view_info, None) {
                    Ok(view) => views.push(view),
                    Err(e) => {
                        for &view in &views {
                            context.device.destroy_image_view(view, None);
                        }
                        swapchain_loader.destroy_swapchain(swapchain, None);
                        return Err(swapchain_error(e, "Failed to create swapchain image view"));
                    }
                }
            }

            let images = vk_images
                .iter()
                .zip(&views)
                .enumerate()
                .map(|(index, (image, view))| PresentableImage {
                    index: index as u32,
                    image: ImageHandle::from_raw(image.as_raw()),
                    view: ImageViewHandle::from_raw(view.as_raw()),
                })
                .collect();

            Ok(SwapchainImages { swapchain, images, views, format: surface_format.format, extent })
        }
    }

    fn release(&self, generation: &SwapchainImages) {
        unsafe {
            for &view in &generation.views {
                self.context.device.destroy_image_view(view, None);
            }
            self.swapchain_loader.destroy_swapchain(generation.swapchain, None);
        }
    }
}

impl Swapchain for VulkanSwapchain {
    fn acquire_next_image(&mut self, signal: SemaphoreHandle) -> Result<AcquiredImage> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.current.swapchain,
                u64::MAX,
                vk::Semaphore::from_raw(signal.as_raw()),
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, suboptimal)) => Ok(AcquiredImage { image_index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_debug!("nova::vulkan", "Swapchain out of date during acquire");
                Err(Error::SurfaceOutOfDate)
            }
            Err(e) => {
                engine_error!("nova::vulkan", "Failed to acquire next swapchain image: {:?}", e);
                Err(vk_error(e, "vkAcquireNextImageKHR"))
            }
        }
    }

    fn present(&mut self, image_index: u32, wait_on: SemaphoreHandle) -> Result<PresentStatus> {
        let swapchains = [self.current.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [vk::Semaphore::from_raw(wait_on.as_raw())];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = {
            let _queues = self.context.lock_queues();
            unsafe { self.swapchain_loader.queue_present(self.context.present_queue, &present_info) }
        };

        match result {
            Ok(false) => Ok(PresentStatus::Optimal),
            Ok(true) => Ok(PresentStatus::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_debug!("nova::vulkan", "Swapchain out of date during present");
                Err(Error::SurfaceOutOfDate)
            }
            Err(e) => {
                engine_error!("nova::vulkan", "Failed to present swapchain image {}: {:?}", image_index, e);
                Err(vk_error(e, "vkQueuePresentKHR"))
            }
        }
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        let next = Self::build(
            &self.context,
            &self.swapchain_loader,
            width,
            height,
            self.present_mode,
            self.current.swapchain,
        )?;
        let old = std::mem::replace(&mut self.current, next);
        self.release(&old);

        engine_debug!("nova::vulkan", "Swapchain rebuilt: {} images, {}x{}",
            self.current.images.len(), self.current.extent.width, self.current.extent.height);
        Ok(())
    }

    fn images(&self) -> &[PresentableImage] {
        &self.current.images
    }

    fn extent(&self) -> Extent2D {
        Extent2D::new(self.current.extent.width, self.current.extent.height)
    }

    fn format(&self) -> SurfaceFormat {
        surface_format_from_vk(self.current.format).unwrap_or(SurfaceFormat::B8G8R8A8_UNORM)
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        unsafe {
            let _queues = self.context.lock_queues();
            self.context.device.device_wait_idle().ok();
        }
        self.release(&self.current);
    }
}

fn swapchain_error(result: vk::Result, what: &str) -> Error {
    engine_error!("nova::vulkan", "{}: {:?}", what, result);
    match result {
        vk::Result::ERROR_SURFACE_LOST_KHR => Error::SurfaceLost,
        vk::Result::ERROR_DEVICE_LOST => Error::DeviceLost,
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => Error::OutOfMemory,
        other => Error::InitializationFailed(format!("{}: {:?}", what, other)),
    }
}

/// Prefer B8G8R8A8_UNORM with sRGB non-linear color space, else the first supported format
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| f.format == vk::Format::B8G8R8A8_UNORM && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| formats.iter().find(|f| surface_format_from_vk(f.format).is_some()))
        .copied()
}

/// Preferred mode when the surface supports it, FIFO otherwise (always available)
pub(crate) fn choose_present_mode(available: &[vk::PresentModeKHR], preferred: PresentMode) -> vk::PresentModeKHR {
    let wanted = match preferred {
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
    };
    if available.contains(&wanted) {
        wanted
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Surface's current extent, or the framebuffer size clamped to the supported range
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
            height: height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
        }
    }
}

/// One more than the minimum, bounded by the maximum (0 = no maximum)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        image_count.min(capabilities.max_image_count)
    } else {
        image_count
    }
}

pub(crate) fn surface_format_from_vk(format: vk::Format) -> Option<SurfaceFormat> {
    match format {
        vk::Format::B8G8R8A8_UNORM => Some(SurfaceFormat::B8G8R8A8_UNORM),
        vk::Format::B8G8R8A8_SRGB => Some(SurfaceFormat::B8G8R8A8_SRGB),
        vk::Format::R8G8B8A8_UNORM => Some(SurfaceFormat::R8G8B8A8_UNORM),
        vk::Format::R8G8B8A8_SRGB => Some(SurfaceFormat::R8G8B8A8_SRGB),
        _ => None,
    }
}

pub(crate) fn surface_format_to_vk(format: SurfaceFormat) -> vk::Format {
    match format {
        SurfaceFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        SurfaceFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        SurfaceFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        SurfaceFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
