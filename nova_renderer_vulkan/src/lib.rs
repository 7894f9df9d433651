/*!
# Nova Renderer - Vulkan Backend

Vulkan implementation of the Nova collaborator traits, using the Ash library
for Vulkan bindings.

- `VulkanDevice`: instance, surface, logical device, semaphores, fences, queue submission
- `VulkanSwapchain`: presentable image set with out-of-date/suboptimal reporting
- `VulkanCommandRecorder`: one prerecorded pass per presentable image that clears
  and draws a colored triangle from a vertex buffer

# Example

```no_run
use nova_renderer::nova::Config;
use nova_renderer::nova::device::Extent2D;
# fn run<W: raw_window_handle::HasDisplayHandle + raw_window_handle::HasWindowHandle>(window: &W) -> nova_renderer::nova::Result<()> {
let config = Config::default();
let _frame_loop = nova_renderer_vulkan::create_frame_loop(window, Extent2D::new(800, 600), &config)?;
# Ok(())
# }
```
*/

mod vulkan_context;
mod vulkan_device;
mod vulkan_swapchain;
mod vulkan_recorder;
mod vulkan_buffer;
mod vulkan_shader;
mod vulkan_pipeline;
mod debug;

pub use vulkan_context::{VulkanContext, QueueFamilies};
pub use vulkan_device::VulkanDevice;
pub use vulkan_swapchain::VulkanSwapchain;
pub use vulkan_recorder::VulkanCommandRecorder;
pub use vulkan_buffer::VertexBuffer;
pub use vulkan_pipeline::{Vertex, TRIANGLE_VERTICES};

// Re-export debug utilities
pub use debug::{get_validation_stats, print_validation_stats_report};

use nova_renderer::nova::{Config, FrameLoop, Result};
use nova_renderer::nova::device::Extent2D;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

/// Build a frame loop backed by Vulkan for a window
///
/// # Arguments
///
/// * `window` - Window to present to
/// * `framebuffer` - Current framebuffer size in pixels
/// * `config` - Renderer configuration
pub fn create_frame_loop<W: HasDisplayHandle + HasWindowHandle>(
    window: &W,
    framebuffer: Extent2D,
    config: &Config,
) -> Result<FrameLoop> {
    config.validate()?;

    let device = VulkanDevice::new(window, config)?;
    let context = Arc::clone(device.context());
    let swapchain = VulkanSwapchain::new(
        Arc::clone(&context),
        framebuffer.width,
        framebuffer.height,
        config.present_mode,
    )?;
    let recorder = VulkanCommandRecorder::new(context, config.clear_color)?;

    FrameLoop::new(Arc::new(device), Box::new(swapchain), Box::new(recorder), config)
}
