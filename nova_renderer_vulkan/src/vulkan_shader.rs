/// ShaderModule - SPIR-V modules for the triangle pipeline

use nova_renderer::nova::Result;
use nova_renderer::{engine_bail, engine_err};
use ash::vk;
use std::ffi::CStr;
use std::io::Cursor;

use crate::vulkan_context::VulkanContext;

/// Vertex stage: position and color in, color out
pub(crate) const TRIANGLE_VERT_SPV: &[u8] = include_bytes!("../shaders/triangle.vert.spv");
/// Fragment stage: interpolated color out
pub(crate) const TRIANGLE_FRAG_SPV: &[u8] = include_bytes!("../shaders/triangle.frag.spv");

pub(crate) const ENTRY_POINT: &CStr = c"main";

/// Vulkan shader module
pub struct ShaderModule {
    pub(crate) module: vk::ShaderModule,
    pub(crate) stage: vk::ShaderStageFlags,
    /// Vertex input locations the module reads (empty for non-vertex stages)
    pub(crate) input_locations: Vec<u32>,
    device: ash::Device,
}

impl ShaderModule {
    /// Create a module from SPIR-V bytes
    pub fn new(context: &VulkanContext, spirv: &[u8], stage: vk::ShaderStageFlags) -> Result<Self> {
        let code = decode_spirv(spirv)?;
        let input_locations = if stage == vk::ShaderStageFlags::VERTEX {
            reflect_input_locations(&code)?
        } else {
            Vec::new()
        };

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe { context.device.create_shader_module(&create_info, None) }
            .map_err(|e| engine_err!("nova::vulkan", "Failed to create {:?} shader module: {:?}", stage, e))?;

        Ok(Self { module, stage, input_locations, device: context.device.clone() })
    }

    pub(crate) fn stage_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage)
            .module(self.module)
            .name(ENTRY_POINT)
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Decode SPIR-V bytes into aligned words, checking the magic number
pub(crate) fn decode_spirv(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        engine_bail!("nova::vulkan", "SPIR-V code not 4-byte aligned (size: {} bytes)", bytes.len());
    }
    ash::util::read_spv(&mut Cursor::new(bytes))
        .map_err(|e| engine_err!("nova::vulkan", "Invalid SPIR-V module: {}", e))
}

/// Sorted input locations declared by the module's entry points
pub(crate) fn reflect_input_locations(code: &[u32]) -> Result<Vec<u32>> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(code)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| engine_err!("nova::vulkan", "SPIR-V reflection failed: {:?}", e))?;

    let mut locations: Vec<u32> = entry_points
        .iter()
        .flat_map(|entry_point| entry_point.vars.iter())
        .filter_map(|var| match var {
            spirq::var::Variable::Input { location, .. } => Some(location.loc()),
            _ => None,
        })
        .collect();
    locations.sort_unstable();
    locations.dedup();
    Ok(locations)
}

#[cfg(test)]
#[path = "vulkan_shader_tests.rs"]
mod tests;
