/// Triangle pipeline - vertex layout and graphics pipeline for the per-image draw
///
/// Viewport and scissor are baked into the pipeline, so it belongs to one
/// swapchain generation and is rebuilt together with the framebuffers.

use nova_renderer::nova::{Error, Result};
use nova_renderer::nova::device::Extent2D;
use nova_renderer::{engine_debug, engine_err};
use ash::vk;
use bytemuck::{Pod, Zeroable};

use crate::vulkan_shader::ShaderModule;

/// Interleaved vertex: 2D position in clip space, RGB color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 3],
}

impl Vertex {
    pub const fn new(position: [f32; 2], color: [f32; 3]) -> Self {
        Self { position, color }
    }

    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        [
            vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, position) as u32,
            },
            vk::VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, color) as u32,
            },
        ]
    }
}

/// Red, green and blue corners, clockwise on screen (Vulkan's y axis points down)
pub const TRIANGLE_VERTICES: [Vertex; 3] = [
    Vertex::new([0.0, -0.5], [1.0, 0.0, 0.0]),
    Vertex::new([0.5, 0.5], [0.0, 1.0, 0.0]),
    Vertex::new([-0.5, 0.5], [0.0, 0.0, 1.0]),
];

/// Viewport and scissor covering the whole extent
pub(crate) fn viewport_and_scissor(extent: Extent2D) -> (vk::Viewport, vk::Rect2D) {
    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    };
    let scissor = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: vk::Extent2D { width: extent.width, height: extent.height },
    };
    (viewport, scissor)
}

/// Graphics pipeline and its (empty) layout
pub(crate) struct TrianglePipeline {
    pub(crate) layout: vk::PipelineLayout,
    pub(crate) pipeline: vk::Pipeline,
}

impl TrianglePipeline {
    /// Build the pipeline for `render_pass` at `extent`
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` if the vertex shader does not read exactly
    /// the locations `Vertex` provides, `Error::BackendError` if Vulkan fails
    pub(crate) fn create(
        device: &ash::Device,
        render_pass: vk::RenderPass,
        extent: Extent2D,
        vertex_shader: &ShaderModule,
        fragment_shader: &ShaderModule,
    ) -> Result<Self> {
        let attributes = Vertex::attribute_descriptions();
        let provided: Vec<u32> = attributes.iter().map(|a| a.location).collect();
        if vertex_shader.input_locations != provided {
            return Err(Error::InitializationFailed(format!(
                "Vertex shader reads locations {:?}, vertex layout provides {:?}",
                vertex_shader.input_locations, provided
            )));
        }

        let stages = [vertex_shader.stage_info(), fragment_shader.stage_info()];

        let bindings = [Vertex::binding_description()];
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let (viewport, scissor) = viewport_and_scissor(extent);
        let viewports = [viewport];
        let scissors = [scissor];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let layout = unsafe { device.create_pipeline_layout(&vk::PipelineLayoutCreateInfo::default(), None) }
            .map_err(|e| engine_err!("nova::vulkan", "Failed to create pipeline layout: {:?}", e))?;

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&create_info), None)
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(engine_err!("nova::vulkan", "Failed to create graphics pipeline: {:?}", e));
            }
        };

        engine_debug!("nova::vulkan", "Triangle pipeline built with {}x{} viewport", extent.width, extent.height);
        Ok(Self { layout, pipeline })
    }

    pub(crate) fn destroy(self, device: &ash::Device) {
        unsafe {
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
