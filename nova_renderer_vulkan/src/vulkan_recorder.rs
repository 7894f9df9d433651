/// CommandRecorder - Vulkan implementation of the CommandRecorder trait
///
/// Records one render pass per presentable image, once per swapchain generation:
/// clear, bind the triangle pipeline and vertex buffer, draw. The render pass,
/// the pipeline (whose viewport follows the extent) and the framebuffers are
/// rebuilt with every generation; shaders and vertex data live as long as the
/// recorder.

use nova_renderer::nova::{Error, Result};
use nova_renderer::nova::device::{
    CommandRecorder, CommandBufferHandle, Extent2D, PresentableImage, SurfaceFormat,
};
use nova_renderer::glam::Vec4;
use nova_renderer::{engine_debug, engine_err, engine_error};
use ash::vk;
use ash::vk::Handle;
use std::sync::Arc;

use crate::vulkan_buffer::VertexBuffer;
use crate::vulkan_context::VulkanContext;
use crate::vulkan_pipeline::{TrianglePipeline, TRIANGLE_VERTICES};
use crate::vulkan_shader::{ShaderModule, TRIANGLE_FRAG_SPV, TRIANGLE_VERT_SPV};
use crate::vulkan_swapchain::surface_format_to_vk;

/// Vulkan command recorder
pub struct VulkanCommandRecorder {
    context: Arc<VulkanContext>,
    command_pool: vk::CommandPool,
    clear_color: Vec4,
    vertex_shader: ShaderModule,
    fragment_shader: ShaderModule,
    vertex_buffer: VertexBuffer,
    render_pass: vk::RenderPass,
    pipeline: Option<TrianglePipeline>,
    framebuffers: Vec<vk::Framebuffer>,
    command_buffers: Vec<vk::CommandBuffer>,
}

impl VulkanCommandRecorder {
    /// Create a recorder: shader modules, the triangle's vertex buffer and a
    /// command pool on the graphics family
    ///
    /// # Arguments
    ///
    /// * `context` - Shared Vulkan state
    /// * `clear_color` - RGBA color every image is cleared to before the draw
    pub fn new(context: Arc<VulkanContext>, clear_color: Vec4) -> Result<Self> {
        let vertex_shader = ShaderModule::new(&context, TRIANGLE_VERT_SPV, vk::ShaderStageFlags::VERTEX)?;
        let fragment_shader = ShaderModule::new(&context, TRIANGLE_FRAG_SPV, vk::ShaderStageFlags::FRAGMENT)?;
        let vertex_buffer = VertexBuffer::new(
            Arc::clone(&context),
            bytemuck::cast_slice(&TRIANGLE_VERTICES),
            TRIANGLE_VERTICES.len() as u32,
        )?;

        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(context.queue_families.graphics);

        let command_pool = unsafe { context.device.create_command_pool(&pool_info, None) }
            .map_err(|e| {
                engine_error!("nova::vulkan", "Failed to create command pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
            })?;

        Ok(Self {
            context,
            command_pool,
            clear_color,
            vertex_shader,
            fragment_shader,
            vertex_buffer,
            render_pass: vk::RenderPass::null(),
            pipeline: None,
            framebuffers: Vec::new(),
            command_buffers: Vec::new(),
        })
    }

    fn create_render_pass(&self, format: vk::Format) -> Result<vk::RenderPass> {
        let attachments = [vk::AttachmentDescription::default()
            .format(format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)];

        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)];

        // Layout transition waits for the acquire semaphore at this stage
        let dependencies = [vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        unsafe { self.context.device.create_render_pass(&create_info, None) }
            .map_err(|e| engine_err!("nova::vulkan", "Failed to create render pass: {:?}", e))
    }

    fn record(
        &self,
        command_buffer: vk::CommandBuffer,
        framebuffer: vk::Framebuffer,
        pipeline: vk::Pipeline,
        extent: Extent2D,
    ) -> Result<()> {
        let device = &self.context.device;
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue { float32: self.clear_color.to_array() },
        }];
        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D { width: extent.width, height: extent.height },
            })
            .clear_values(&clear_values);

        unsafe {
            device
                .begin_command_buffer(command_buffer, &vk::CommandBufferBeginInfo::default())
                .map_err(|e| engine_err!("nova::vulkan", "Failed to begin command buffer: {:?}", e))?;
            device.cmd_begin_render_pass(command_buffer, &render_pass_info, vk::SubpassContents::INLINE);
            device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline);
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[self.vertex_buffer.buffer], &[0]);
            device.cmd_draw(command_buffer, self.vertex_buffer.vertex_count(), 1, 0, 0);
            device.cmd_end_render_pass(command_buffer);
            device
                .end_command_buffer(command_buffer)
                .map_err(|e| engine_err!("nova::vulkan", "Failed to end command buffer: {:?}", e))
        }
    }

    fn try_build(&mut self, images: &[PresentableImage], extent: Extent2D, format: SurfaceFormat) -> Result<()> {
        self.render_pass = self.create_render_pass(surface_format_to_vk(format))?;
        let pipeline = TrianglePipeline::create(
            &self.context.device,
            self.render_pass,
            extent,
            &self.vertex_shader,
            &self.fragment_shader,
        )?;
        let pipeline = self.pipeline.insert(pipeline).pipeline;

        for image in images {
            let attachments = [vk::ImageView::from_raw(image.view.as_raw())];
            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(self.render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);
            let framebuffer = unsafe { self.context.device.create_framebuffer(&framebuffer_info, None) }
                .map_err(|e| engine_err!("nova::vulkan", "Failed to create framebuffer for image {}: {:?}", image.index, e))?;
            self.framebuffers.push(framebuffer);
        }

        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(images.len() as u32);
        self.command_buffers = unsafe { self.context.device.allocate_command_buffers(&allocate_info) }
            .map_err(|e| engine_err!("nova::vulkan", "Failed to allocate command buffers: {:?}", e))?;

        for (&command_buffer, &framebuffer) in self.command_buffers.iter().zip(&self.framebuffers) {
            self.record(command_buffer, framebuffer, pipeline, extent)?;
        }
        Ok(())
    }
}

impl CommandRecorder for VulkanCommandRecorder {
    fn build(&mut self, images: &[PresentableImage], extent: Extent2D, format: SurfaceFormat) -> Result<()> {
        self.destroy();
        if let Err(e) = self.try_build(images, extent, format) {
            self.destroy();
            return Err(e);
        }

        engine_debug!("nova::vulkan", "Recorded {} command buffers at {}x{}",
            self.command_buffers.len(), extent.width, extent.height);
        Ok(())
    }

    fn commands(&self, image_index: u32) -> Result<CommandBufferHandle> {
        self.command_buffers
            .get(image_index as usize)
            .map(|command_buffer| CommandBufferHandle::from_raw(command_buffer.as_raw()))
            .ok_or_else(|| {
                engine_error!("nova::vulkan", "No command buffer recorded for image {} ({} recorded)",
                    image_index, self.command_buffers.len());
                Error::InvalidResource(format!("No command buffer for image {}", image_index))
            })
    }

    fn destroy(&mut self) {
        unsafe {
            let device = &self.context.device;
            if !self.command_buffers.is_empty() {
                device.free_command_buffers(self.command_pool, &self.command_buffers);
                self.command_buffers.clear();
            }
            for framebuffer in self.framebuffers.drain(..) {
                device.destroy_framebuffer(framebuffer, None);
            }
            if let Some(pipeline) = self.pipeline.take() {
                pipeline.destroy(device);
            }
            if self.render_pass != vk::RenderPass::null() {
                device.destroy_render_pass(self.render_pass, None);
                self.render_pass = vk::RenderPass::null();
            }
        }
    }
}

impl Drop for VulkanCommandRecorder {
    fn drop(&mut self) {
        unsafe {
            let _queues = self.context.lock_queues();
            self.context.device.device_wait_idle().ok();
        }
        self.destroy();
        unsafe {
            self.context.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
